//! Distance-vector routing: Bellman-Ford over the neighbors' advertised
//! vectors, with reverse poisoning toward the chosen next hop.
//!
//! Poison reverse only stops two-node loops. A cycle of three or more nodes
//! can still count to infinity after a failure; costs saturate at
//! `Cost::INFINITY`, which bounds the count.

use log::{debug, trace};
use std::collections::BTreeMap;

use super::{DistanceVectorMessage, NodeContext, ProtocolMessage, RoutingEngine};
use crate::algorithms::best_candidate;
use crate::types::{Cost, NodeId};

#[derive(Debug, Clone)]
pub struct DistanceVectorEngine {
    me: NodeId,
    /// `dist[x][y]`: row `me` is our own vector, other rows are the last
    /// vector each neighbor sent us.
    dist: BTreeMap<NodeId, BTreeMap<NodeId, Cost>>,
    next_hop: BTreeMap<NodeId, Option<NodeId>>,
}

impl DistanceVectorEngine {
    pub fn distance(&self, from: NodeId, to: NodeId) -> Cost {
        match self.dist.get(&from).and_then(|row| row.get(&to)) {
            Some(&cost) => cost,
            None if from == to => Cost::ZERO,
            None => Cost::INFINITY,
        }
    }

    pub fn distance_to(&self, destination: NodeId) -> Cost {
        self.distance(self.me, destination)
    }

    pub fn next_hop(&self, destination: NodeId) -> Option<NodeId> {
        self.next_hop.get(&destination).copied().flatten()
    }

    /// Our vector as `neighbor` should see it: every destination routed
    /// through `neighbor` reads `INFINITY`.
    pub fn advertisement_for(&self, neighbor: NodeId) -> DistanceVectorMessage {
        let mut distances = self.dist.get(&self.me).cloned().unwrap_or_default();
        for (destination, hop) in &self.next_hop {
            if *hop == Some(neighbor) {
                distances.insert(*destination, Cost::INFINITY);
            }
        }
        DistanceVectorMessage { distances }
    }

    /// Returns whether any route changed; changes are advertised to every
    /// neighbor.
    fn recompute<C: NodeContext + ?Sized>(&mut self, ctx: &mut C) -> bool {
        let nodes = ctx.nodes();
        let neighbors: Vec<(NodeId, Cost)> = ctx
            .neighbors()
            .into_iter()
            .map(|neighbor| (neighbor, ctx.link_cost(neighbor)))
            .collect();

        let mut changed = false;
        for &destination in nodes.iter().filter(|&&node| node != self.me) {
            let best = best_candidate(&neighbors, |via| self.distance(via, destination), |_| true);
            let (cost, hop) = match best {
                Some(candidate) => (candidate.cost, Some(candidate.neighbor)),
                None => (Cost::INFINITY, None),
            };

            if cost == self.distance_to(destination) && hop == self.next_hop(destination) {
                continue;
            }

            debug!("{}: route to {} now {:?} cost {}", self.me, destination, hop, cost);
            self.dist.entry(self.me).or_default().insert(destination, cost);
            self.next_hop.insert(destination, hop);
            ctx.set_route(destination, hop, cost);
            changed = true;
        }

        if changed {
            self.advertise(ctx);
        }
        changed
    }

    fn advertise<C: NodeContext + ?Sized>(&self, ctx: &mut C) {
        for neighbor in ctx.neighbors() {
            let message = self.advertisement_for(neighbor);
            trace!("{}: advertising vector to {}", self.me, neighbor);
            ctx.send(neighbor, ProtocolMessage::DistanceVector(message));
        }
    }
}

impl RoutingEngine for DistanceVectorEngine {
    fn initialize<C: NodeContext + ?Sized>(ctx: &C) -> Self {
        let me = ctx.current_node();
        let nodes = ctx.nodes();
        let dist = nodes
            .iter()
            .map(|&x| {
                let row = nodes
                    .iter()
                    .map(|&y| (y, if x == y { Cost::ZERO } else { Cost::INFINITY }))
                    .collect();
                (x, row)
            })
            .collect();
        let next_hop = nodes.iter().map(|&node| (node, None)).collect();

        Self { me, dist, next_hop }
    }

    fn on_link_change<C: NodeContext + ?Sized>(&mut self, ctx: &mut C, neighbor: NodeId, cost: Cost) {
        debug!("{}: link to {} now costs {}", self.me, neighbor, cost);
        if cost.is_infinite() {
            // Whatever the neighbor last told us is stale once the link is gone.
            if let Some(row) = self.dist.get_mut(&neighbor) {
                for (&destination, entry) in row.iter_mut() {
                    *entry = if destination == neighbor { Cost::ZERO } else { Cost::INFINITY };
                }
            }
        }

        // A live link always carries our current vector, even when no route moved.
        if !self.recompute(ctx) && cost.is_finite() {
            ctx.send(neighbor, ProtocolMessage::DistanceVector(self.advertisement_for(neighbor)));
        }
    }

    fn on_receive<C: NodeContext + ?Sized>(&mut self, ctx: &mut C, sender: NodeId, message: &ProtocolMessage) {
        let ProtocolMessage::DistanceVector(vector) = message else {
            panic!(
                "{}: distance-vector engine got a {} message from {}",
                self.me,
                message.kind_name(),
                sender
            );
        };
        assert!(
            sender != self.me && self.dist.contains_key(&sender),
            "{}: vector from unknown sender {}",
            self.me,
            sender
        );

        self.dist.insert(sender, vector.distances.clone());
        self.recompute(ctx);
    }
}
