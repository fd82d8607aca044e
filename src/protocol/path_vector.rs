//! Path-vector routing: distance vectors that carry the full path behind
//! each entry, so a node can refuse any path that already runs through it.
//! Loop freedom comes from that check alone, for cycles of any length,
//! and advertisements are therefore never poisoned.

use log::{debug, trace};
use std::collections::BTreeMap;

use super::{NodeContext, PathVectorMessage, ProtocolMessage, RoutingEngine};
use crate::algorithms::best_candidate;
use crate::types::{Cost, NodeId};

#[derive(Debug, Clone)]
pub struct PathVectorEngine {
    me: NodeId,
    dist: BTreeMap<NodeId, BTreeMap<NodeId, Cost>>,
    /// `paths[x][y]` runs from `x` to `y` inclusive. An empty or missing
    /// path means `x` has no route to `y`.
    paths: BTreeMap<NodeId, BTreeMap<NodeId, Vec<NodeId>>>,
}

impl PathVectorEngine {
    pub fn distance(&self, from: NodeId, to: NodeId) -> Cost {
        self.dist
            .get(&from)
            .and_then(|row| row.get(&to))
            .copied()
            .unwrap_or(Cost::INFINITY)
    }

    pub fn path(&self, from: NodeId, to: NodeId) -> &[NodeId] {
        self.paths
            .get(&from)
            .and_then(|row| row.get(&to))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn distance_to(&self, destination: NodeId) -> Cost {
        self.distance(self.me, destination)
    }

    pub fn path_to(&self, destination: NodeId) -> &[NodeId] {
        self.path(self.me, destination)
    }

    pub fn next_hop(&self, destination: NodeId) -> Option<NodeId> {
        self.path_to(destination).get(1).copied()
    }

    /// A neighbor's path is usable only if it exists and does not pass through us.
    pub fn is_valid_path(&self, path: &[NodeId]) -> bool {
        !path.is_empty() && !path.contains(&self.me)
    }

    /// Our own distances and paths, as sent to every neighbor.
    pub fn advertisement(&self) -> PathVectorMessage {
        PathVectorMessage {
            distances: self.dist.get(&self.me).cloned().unwrap_or_default(),
            paths: self.paths.get(&self.me).cloned().unwrap_or_default(),
        }
    }

    fn recompute<C: NodeContext + ?Sized>(&mut self, ctx: &mut C) -> bool {
        let nodes = ctx.nodes();
        let neighbors: Vec<(NodeId, Cost)> = ctx
            .neighbors()
            .into_iter()
            .map(|neighbor| (neighbor, ctx.link_cost(neighbor)))
            .collect();

        let mut changed = false;
        for &destination in nodes.iter().filter(|&&node| node != self.me) {
            let best = best_candidate(
                &neighbors,
                |via| self.distance(via, destination),
                |via| self.is_valid_path(self.path(via, destination)),
            );

            let (cost, path) = match best {
                Some(candidate) => {
                    let mut path = Vec::with_capacity(self.path(candidate.neighbor, destination).len() + 1);
                    path.push(self.me);
                    path.extend_from_slice(self.path(candidate.neighbor, destination));
                    (candidate.cost, path)
                }
                None => (Cost::INFINITY, Vec::new()),
            };

            if cost == self.distance_to(destination) && path.as_slice() == self.path_to(destination) {
                continue;
            }

            let next_hop = best.map(|candidate| candidate.neighbor);
            debug!("{}: route to {} now {:?} cost {}", self.me, destination, path, cost);
            self.dist.entry(self.me).or_default().insert(destination, cost);
            let own_paths = self.paths.entry(self.me).or_default();
            if path.is_empty() {
                own_paths.remove(&destination);
            } else {
                own_paths.insert(destination, path);
            }
            ctx.set_route(destination, next_hop, cost);
            changed = true;
        }

        if changed {
            self.advertise(ctx);
        }
        changed
    }

    fn advertise<C: NodeContext + ?Sized>(&self, ctx: &mut C) {
        let message = self.advertisement();
        for neighbor in ctx.neighbors() {
            trace!("{}: advertising paths to {}", self.me, neighbor);
            ctx.send(neighbor, ProtocolMessage::PathVector(message.clone()));
        }
    }
}

impl RoutingEngine for PathVectorEngine {
    /// Every node trivially reaches itself over the one-node path `[x]`, so
    /// a neighbor's row is usable for the neighbor itself before it has
    /// advertised anything. Splicing that row gives `[me, neighbor]`.
    fn initialize<C: NodeContext + ?Sized>(ctx: &C) -> Self {
        let nodes = ctx.nodes();
        let mut dist = BTreeMap::new();
        let mut paths = BTreeMap::new();

        for &x in &nodes {
            let row: BTreeMap<NodeId, Cost> = nodes
                .iter()
                .map(|&y| (y, if x == y { Cost::ZERO } else { Cost::INFINITY }))
                .collect();
            dist.insert(x, row);
            paths.insert(x, BTreeMap::from([(x, vec![x])]));
        }

        Self {
            me: ctx.current_node(),
            dist,
            paths,
        }
    }

    fn on_link_change<C: NodeContext + ?Sized>(&mut self, ctx: &mut C, neighbor: NodeId, cost: Cost) {
        debug!("{}: link to {} now costs {}", self.me, neighbor, cost);
        if cost.is_infinite() {
            // Forget the neighbor's tables; it only knows itself again.
            if let Some(row) = self.dist.get_mut(&neighbor) {
                for (&destination, entry) in row.iter_mut() {
                    *entry = if destination == neighbor { Cost::ZERO } else { Cost::INFINITY };
                }
            }
            self.paths.insert(neighbor, BTreeMap::from([(neighbor, vec![neighbor])]));
        }

        if !self.recompute(ctx) && cost.is_finite() {
            ctx.send(neighbor, ProtocolMessage::PathVector(self.advertisement()));
        }
    }

    fn on_receive<C: NodeContext + ?Sized>(&mut self, ctx: &mut C, sender: NodeId, message: &ProtocolMessage) {
        let ProtocolMessage::PathVector(update) = message else {
            panic!(
                "{}: path-vector engine got a {} message from {}",
                self.me,
                message.kind_name(),
                sender
            );
        };
        assert!(
            sender != self.me && self.dist.contains_key(&sender),
            "{}: path vector from unknown sender {}",
            self.me,
            sender
        );

        // Last message wins; there is no versioning.
        self.dist.insert(sender, update.distances.clone());
        self.paths.insert(sender, update.paths.clone());
        self.recompute(ctx);
    }
}
