//! Reference driver for the routing engines: an in-memory network that
//! owns one engine per node, carries encoded messages between neighbors
//! and applies link changes.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, VecDeque};
use std::fmt;
use std::str::FromStr;
use tracing::{debug, info, warn};

use crate::algorithms::{shortest_path_tree, ShortestPath};
use crate::error::SimulationError;
use crate::network::Topology;
use crate::protocol::{Engine, EngineKind, ProtocolMessage, RouteEntry, RoutingTable, TopologyQuery, Transport};
use crate::types::{Cost, NodeId};

/// Which in-flight message is delivered next.
///
/// Messages on one (sender, receiver) channel always arrive in the order
/// they were sent: distance-vector and path-vector treat the last message
/// from a neighbor as authoritative. Across channels no order is promised,
/// and the variants below exercise the extremes. Every order delivers each
/// message within a bounded number of steps.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeliveryOrder {
    /// Oldest message first.
    #[default]
    Fifo,
    /// Newest first, in rounds. A round is everything in flight when the
    /// previous round ran out; its channels are served newest first, each
    /// giving up its oldest message. Traffic sent meanwhile waits for the
    /// next round.
    Lifo,
    /// Oldest channel first, but only its newest message is delivered and
    /// the older ones on that channel are dropped.
    Coalesced,
}

impl fmt::Display for DeliveryOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeliveryOrder::Fifo => f.write_str("fifo"),
            DeliveryOrder::Lifo => f.write_str("lifo"),
            DeliveryOrder::Coalesced => f.write_str("coalesced"),
        }
    }
}

impl FromStr for DeliveryOrder {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "fifo" => Ok(DeliveryOrder::Fifo),
            "lifo" => Ok(DeliveryOrder::Lifo),
            "coalesced" => Ok(DeliveryOrder::Coalesced),
            other => Err(format!("unknown delivery order '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SimulationStats {
    pub messages_sent: usize,
    pub messages_delivered: usize,
    pub bytes_sent: usize,
    pub messages_coalesced: usize,
    pub route_installs: usize,
    pub link_changes: usize,
}

#[derive(Debug, Clone)]
struct Envelope {
    from: NodeId,
    to: NodeId,
    payload: Vec<u8>,
}

type Channel = (NodeId, NodeId);

/// In-flight messages, one FIFO per channel, plus the global send order.
#[derive(Debug, Default)]
struct InFlight {
    next_seq: u64,
    len: usize,
    channels: BTreeMap<Channel, VecDeque<(u64, Envelope)>>,
    /// One `(seq, channel)` per send, oldest first. Entries for messages
    /// that were coalesced away are skipped when they reach the front.
    arrivals: VecDeque<(u64, Channel)>,
    /// Channels still to be served in the current LIFO round, newest last.
    round: Vec<Channel>,
}

impl InFlight {
    fn len(&self) -> usize {
        self.len
    }

    fn is_empty(&self) -> bool {
        self.len == 0
    }

    fn push(&mut self, envelope: Envelope) {
        let channel = (envelope.from, envelope.to);
        let seq = self.next_seq;
        self.next_seq += 1;
        self.channels.entry(channel).or_default().push_back((seq, envelope));
        self.arrivals.push_back((seq, channel));
        self.len += 1;
    }

    /// Queued envelopes in send order.
    fn iter(&self) -> impl Iterator<Item = &Envelope> {
        let mut queued: Vec<_> = self.channels.values().flatten().collect();
        queued.sort_by_key(|(seq, _)| *seq);
        queued.into_iter().map(|(_, envelope)| envelope)
    }

    fn oldest_channel(&mut self) -> Option<Channel> {
        while let Some(&(seq, channel)) = self.arrivals.front() {
            let live = self
                .channels
                .get(&channel)
                .and_then(VecDeque::front)
                .is_some_and(|(front, _)| *front == seq);
            if live {
                return Some(channel);
            }
            self.arrivals.pop_front();
        }
        None
    }

    fn pop_front_of(&mut self, channel: Channel) -> Option<Envelope> {
        let queue = self.channels.get_mut(&channel)?;
        let (_, envelope) = queue.pop_front()?;
        if queue.is_empty() {
            self.channels.remove(&channel);
        }
        self.len -= 1;
        Some(envelope)
    }

    fn pop_oldest(&mut self) -> Option<Envelope> {
        let channel = self.oldest_channel()?;
        self.arrivals.pop_front();
        self.pop_front_of(channel)
    }

    fn pop_lifo(&mut self) -> Option<Envelope> {
        if self.round.is_empty() {
            self.round.extend(self.arrivals.drain(..).map(|(_, channel)| channel));
        }
        let channel = self.round.pop()?;
        self.pop_front_of(channel)
    }

    /// Newest message of the oldest channel, and how many older ones it superseded.
    fn pop_coalesced(&mut self) -> Option<(Envelope, usize)> {
        let channel = self.oldest_channel()?;
        self.arrivals.pop_front();
        let queue = self.channels.remove(&channel)?;
        let superseded = queue.len() - 1;
        self.len -= queue.len();
        let (_, latest) = queue.into_iter().next_back()?;
        Some((latest, superseded))
    }
}

#[derive(Debug)]
struct NodeSlot {
    engine: Engine,
    routes: RoutingTable,
}

/// The context a single handler call runs against.
struct NodeHandle<'a> {
    me: NodeId,
    topology: &'a Topology,
    routes: &'a mut RoutingTable,
    installs: &'a mut usize,
    outbox: &'a mut Vec<(NodeId, ProtocolMessage)>,
}

impl TopologyQuery for NodeHandle<'_> {
    fn nodes(&self) -> Vec<NodeId> {
        self.topology.nodes()
    }

    fn current_node(&self) -> NodeId {
        self.me
    }

    fn link_cost(&self, neighbor: NodeId) -> Cost {
        self.topology.link_cost(self.me, neighbor)
    }
}

impl Transport for NodeHandle<'_> {
    fn set_route(&mut self, destination: NodeId, next_hop: Option<NodeId>, cost: Cost) {
        *self.installs += 1;
        self.routes.install(RouteEntry::new(destination, next_hop, cost));
    }

    fn send(&mut self, neighbor: NodeId, message: ProtocolMessage) {
        self.outbox.push((neighbor, message));
    }
}

pub struct Simulation {
    kind: EngineKind,
    order: DeliveryOrder,
    topology: Topology,
    nodes: BTreeMap<NodeId, NodeSlot>,
    queue: InFlight,
    stats: SimulationStats,
}

impl Simulation {
    /// Initialize one engine per node, then report every existing link to
    /// both of its endpoints, lowest link first.
    pub fn new(topology: Topology, kind: EngineKind, order: DeliveryOrder) -> Result<Self, SimulationError> {
        let mut nodes = BTreeMap::new();
        for me in topology.nodes() {
            let mut routes = RoutingTable::new();
            let mut installs = 0;
            let mut outbox = Vec::new();
            let handle = NodeHandle {
                me,
                topology: &topology,
                routes: &mut routes,
                installs: &mut installs,
                outbox: &mut outbox,
            };
            let engine = Engine::initialize(kind, &handle);
            nodes.insert(me, NodeSlot { engine, routes });
        }

        let mut simulation = Self {
            kind,
            order,
            topology,
            nodes,
            queue: InFlight::default(),
            stats: SimulationStats::default(),
        };

        let links: Vec<_> = simulation.topology.links().collect();
        info!(engine = %kind, nodes = simulation.nodes.len(), links = links.len(), "starting simulation");
        for (a, b, cost) in links {
            simulation.notify_link(a, b, cost)?;
        }

        Ok(simulation)
    }

    pub fn kind(&self) -> EngineKind {
        self.kind
    }

    pub fn topology(&self) -> &Topology {
        &self.topology
    }

    pub fn stats(&self) -> SimulationStats {
        self.stats
    }

    pub fn pending(&self) -> usize {
        self.queue.len()
    }

    pub fn routes(&self, node: NodeId) -> Option<&RoutingTable> {
        self.nodes.get(&node).map(|slot| &slot.routes)
    }

    pub fn engine(&self, node: NodeId) -> Option<&Engine> {
        self.nodes.get(&node).map(|slot| &slot.engine)
    }

    /// Decoded copies of every message still in flight, in queue order.
    pub fn in_flight(&self) -> Result<Vec<(NodeId, NodeId, ProtocolMessage)>, SimulationError> {
        self.queue
            .iter()
            .map(|envelope| {
                let message = ProtocolMessage::deserialize(&envelope.payload)?;
                Ok((envelope.from, envelope.to, message))
            })
            .collect()
    }

    /// Change the a–b link and tell both endpoints.
    pub fn set_link_cost(&mut self, a: NodeId, b: NodeId, cost: Cost) -> Result<(), SimulationError> {
        let previous = self.topology.set_link_cost(a, b, cost)?;
        info!(%a, %b, %previous, %cost, "link cost changed");
        self.stats.link_changes += 1;
        self.notify_link(a, b, cost)
    }

    fn notify_link(&mut self, a: NodeId, b: NodeId, cost: Cost) -> Result<(), SimulationError> {
        self.dispatch(a, |engine, ctx| engine.on_link_change(ctx, b, cost))?;
        self.dispatch(b, |engine, ctx| engine.on_link_change(ctx, a, cost))
    }

    /// Deliver one message. Returns `false` once nothing is in flight.
    pub fn step(&mut self) -> Result<bool, SimulationError> {
        let Some(envelope) = self.next_envelope() else {
            return Ok(false);
        };

        let message = ProtocolMessage::deserialize(&envelope.payload)?;
        debug!(from = %envelope.from, to = %envelope.to, bytes = envelope.payload.len(), "delivering");
        self.stats.messages_delivered += 1;
        self.dispatch(envelope.to, |engine, ctx| engine.on_receive(ctx, envelope.from, &message))?;
        Ok(true)
    }

    fn next_envelope(&mut self) -> Option<Envelope> {
        match self.order {
            DeliveryOrder::Fifo => self.queue.pop_oldest(),
            DeliveryOrder::Lifo => self.queue.pop_lifo(),
            DeliveryOrder::Coalesced => {
                let (latest, superseded) = self.queue.pop_coalesced()?;
                self.stats.messages_coalesced += superseded;
                Some(latest)
            }
        }
    }

    /// Queue `message` as if `from` had sent it to `to`.
    pub fn inject(&mut self, from: NodeId, to: NodeId, message: &ProtocolMessage) -> Result<(), SimulationError> {
        if !self.nodes.contains_key(&from) {
            return Err(SimulationError::UnknownNode(from));
        }
        self.enqueue(from, to, message)
    }

    /// Deliver messages until none are left, at most `max_deliveries` of them.
    pub fn run(&mut self, max_deliveries: usize) -> Result<usize, SimulationError> {
        let mut delivered = 0;
        while delivered < max_deliveries {
            if !self.step()? {
                info!(delivered, "converged");
                return Ok(delivered);
            }
            delivered += 1;
        }

        if self.queue.is_empty() {
            return Ok(delivered);
        }
        warn!(delivered, pending = self.queue.len(), "delivery budget exhausted");
        Err(SimulationError::NotConverged {
            delivered,
            pending: self.queue.len(),
        })
    }

    /// Shortest-path costs from `source` over the true topology.
    pub fn shortest_paths(&self, source: NodeId) -> BTreeMap<NodeId, ShortestPath> {
        let nodes = self.topology.nodes();
        shortest_path_tree(
            source,
            &nodes,
            |node| self.topology.link_cost(source, node),
            |from, to| self.topology.link_cost(from, to),
        )
    }

    /// Check every installed route against the true shortest-path costs.
    ///
    /// Equal-cost alternatives are accepted: a next hop is correct when it
    /// is a live neighbor lying on some shortest path.
    pub fn verify_routes(&self) -> Result<(), SimulationError> {
        let mut distances: BTreeMap<NodeId, BTreeMap<NodeId, ShortestPath>> = BTreeMap::new();
        for node in self.topology.nodes() {
            distances.insert(node, self.shortest_paths(node));
        }
        let true_cost = |from: NodeId, to: NodeId| -> Cost {
            if from == to {
                return Cost::ZERO;
            }
            distances[&from][&to].cost
        };

        for (&node, slot) in &self.nodes {
            for (&destination, expected) in &distances[&node] {
                let actual = slot.routes.cost(destination);
                if actual != expected.cost {
                    return Err(SimulationError::WrongCost {
                        node,
                        destination,
                        expected: expected.cost,
                        actual,
                    });
                }

                let next_hop = slot.routes.next_hop(destination);
                let consistent = match next_hop {
                    None => expected.cost.is_infinite(),
                    Some(hop) => {
                        let link = self.topology.link_cost(node, hop);
                        link.is_finite() && link + true_cost(hop, destination) == expected.cost
                    }
                };
                if !consistent {
                    return Err(SimulationError::WrongNextHop {
                        node,
                        destination,
                        next_hop,
                    });
                }
            }
        }
        Ok(())
    }

    fn dispatch<F>(&mut self, node: NodeId, handler: F) -> Result<(), SimulationError>
    where
        F: FnOnce(&mut Engine, &mut NodeHandle<'_>),
    {
        let slot = self
            .nodes
            .get_mut(&node)
            .ok_or(SimulationError::UnknownNode(node))?;
        let NodeSlot { engine, routes } = slot;

        let mut outbox = Vec::new();
        let mut handle = NodeHandle {
            me: node,
            topology: &self.topology,
            routes,
            installs: &mut self.stats.route_installs,
            outbox: &mut outbox,
        };
        handler(engine, &mut handle);

        for (to, message) in outbox {
            self.enqueue(node, to, &message)?;
        }
        Ok(())
    }

    fn enqueue(&mut self, from: NodeId, to: NodeId, message: &ProtocolMessage) -> Result<(), SimulationError> {
        if self.topology.link_cost(from, to).is_infinite() {
            return Err(SimulationError::NotANeighbor { from, to });
        }
        let payload = message.serialize()?;
        self.stats.messages_sent += 1;
        self.stats.bytes_sent += payload.len();
        self.queue.push(Envelope { from, to, payload });
        Ok(())
    }
}
