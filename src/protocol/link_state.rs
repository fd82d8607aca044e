//! Link-state routing: every node floods its whole database and runs
//! Dijkstra over the replicated records.

use log::{debug, trace};
use std::collections::BTreeMap;

use super::{LinkStateMessage, LinkStateRecord, NodeContext, ProtocolMessage, RoutingEngine};
use crate::algorithms::shortest_path_tree;
use crate::types::{Cost, NodeId};

#[derive(Debug, Clone)]
pub struct LinkStateEngine {
    me: NodeId,
    /// One record per originating node. A stored record is only ever
    /// replaced by one with a strictly greater version.
    database: BTreeMap<NodeId, LinkStateRecord>,
}

impl LinkStateEngine {
    pub fn record(&self, origin: NodeId) -> Option<&LinkStateRecord> {
        self.database.get(&origin)
    }

    pub fn version_of(&self, origin: NodeId) -> Option<u64> {
        self.database.get(&origin).map(|record| record.version)
    }

    fn advertised_cost(&self, from: NodeId, to: NodeId) -> Cost {
        self.database
            .get(&from)
            .map(|record| record.cost_to(to))
            .unwrap_or(Cost::INFINITY)
    }

    fn recompute<C: NodeContext + ?Sized>(&self, ctx: &mut C) {
        let nodes = ctx.nodes();
        let tree = shortest_path_tree(
            self.me,
            &nodes,
            |node| ctx.link_cost(node),
            |from, to| self.advertised_cost(from, to),
        );

        // Installed on every pass, changed or not.
        for (destination, path) in tree {
            trace!("{}: route to {} via {:?} cost {}", self.me, destination, path.next_hop, path.cost);
            ctx.set_route(destination, path.next_hop, path.cost);
        }
    }

    fn flood<C: NodeContext + ?Sized>(&self, ctx: &mut C) {
        let message = LinkStateMessage {
            records: self.database.values().cloned().collect(),
        };
        for neighbor in ctx.neighbors() {
            ctx.send(neighbor, ProtocolMessage::LinkState(message.clone()));
        }
    }
}

impl RoutingEngine for LinkStateEngine {
    fn initialize<C: NodeContext + ?Sized>(ctx: &C) -> Self {
        let nodes = ctx.nodes();
        let database = nodes
            .iter()
            .map(|&origin| (origin, LinkStateRecord::new(origin, &nodes)))
            .collect();

        Self {
            me: ctx.current_node(),
            database,
        }
    }

    fn on_link_change<C: NodeContext + ?Sized>(&mut self, ctx: &mut C, neighbor: NodeId, cost: Cost) {
        let me = self.me;
        let own = self
            .database
            .entry(me)
            .or_insert_with(|| LinkStateRecord::new(me, &[me]));
        own.link_costs.insert(neighbor, cost);
        own.version += 1;
        debug!("{}: link to {} now costs {}, own record at version {}", me, neighbor, cost, own.version);

        self.recompute(ctx);
        self.flood(ctx);
    }

    fn on_receive<C: NodeContext + ?Sized>(&mut self, ctx: &mut C, sender: NodeId, message: &ProtocolMessage) {
        let ProtocolMessage::LinkState(update) = message else {
            panic!(
                "{}: link-state engine got a {} message from {}",
                self.me,
                message.kind_name(),
                sender
            );
        };
        assert!(
            sender != self.me && self.database.contains_key(&sender),
            "{}: link-state update from unknown sender {}",
            self.me,
            sender
        );

        let mut changed = false;
        for incoming in &update.records {
            let Some(stored) = self.database.get_mut(&incoming.origin) else {
                panic!("{}: record for unknown node {} from {}", self.me, incoming.origin, sender);
            };
            if incoming.version > stored.version {
                debug!(
                    "{}: record of {} advanced {} -> {} (from {})",
                    self.me, incoming.origin, stored.version, incoming.version, sender
                );
                *stored = incoming.clone();
                changed = true;
            }
        }

        if changed {
            self.recompute(ctx);
            self.flood(ctx);
        } else {
            trace!("{}: nothing new from {}", self.me, sender);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::testing::MockContext;

    fn n(id: u32) -> NodeId {
        NodeId(id)
    }

    fn record(origin: u32, version: u64, links: &[(u32, u32)]) -> LinkStateRecord {
        let mut link_costs: BTreeMap<NodeId, Cost> = BTreeMap::new();
        link_costs.insert(n(origin), Cost::ZERO);
        for &(to, cost) in links {
            link_costs.insert(n(to), Cost(cost));
        }
        LinkStateRecord {
            origin: n(origin),
            version,
            link_costs,
        }
    }

    fn update(records: Vec<LinkStateRecord>) -> ProtocolMessage {
        ProtocolMessage::LinkState(LinkStateMessage { records })
    }

    #[test]
    fn link_change_bumps_version_and_floods_whole_database() {
        let mut ctx = MockContext::new(0, 3).link(1, 4).link(2, 1);
        let mut engine = LinkStateEngine::initialize(&ctx);
        engine.on_link_change(&mut ctx, n(1), Cost(4));
        engine.on_link_change(&mut ctx, n(2), Cost(1));

        assert_eq!(engine.version_of(n(0)), Some(2));
        assert_eq!(engine.record(n(0)).unwrap().cost_to(n(1)), Cost(4));
        let sent = ctx.take_sent();
        assert_eq!(sent.len(), 4);
        for (_, message) in &sent {
            let ProtocolMessage::LinkState(flood) = message else { panic!("wrong message") };
            assert_eq!(flood.records.len(), 3);
        }
    }

    #[test]
    fn newer_record_reroutes_and_refloods() {
        let mut ctx = MockContext::new(0, 3).link(1, 4).link(2, 1);
        let mut engine = LinkStateEngine::initialize(&ctx);
        engine.on_link_change(&mut ctx, n(1), Cost(4));
        engine.on_link_change(&mut ctx, n(2), Cost(1));
        assert_eq!(ctx.routes.next_hop(n(1)), Some(n(1)));
        ctx.take_sent();

        engine.on_receive(&mut ctx, n(2), &update(vec![record(2, 1, &[(0, 1), (1, 1)])]));
        assert_eq!(ctx.routes.next_hop(n(1)), Some(n(2)));
        assert_eq!(ctx.routes.cost(n(1)), Cost(2));
        assert_eq!(ctx.take_sent().len(), 2);
    }

    #[test]
    fn stale_or_replayed_records_are_ignored() {
        let mut ctx = MockContext::new(0, 3).link(2, 1);
        let mut engine = LinkStateEngine::initialize(&ctx);
        engine.on_link_change(&mut ctx, n(2), Cost(1));
        engine.on_receive(&mut ctx, n(2), &update(vec![record(2, 3, &[(0, 1), (1, 1)])]));
        ctx.take_sent();
        let installs = ctx.installs;

        engine.on_receive(&mut ctx, n(2), &update(vec![record(2, 3, &[(0, 1)])]));
        engine.on_receive(&mut ctx, n(2), &update(vec![record(2, 2, &[(0, 1)])]));

        assert_eq!(engine.version_of(n(2)), Some(3));
        assert_eq!(engine.record(n(2)).unwrap().cost_to(n(1)), Cost(1));
        assert!(ctx.sent.is_empty());
        assert_eq!(ctx.installs, installs);
    }

    #[test]
    fn every_destination_is_installed_each_pass() {
        let mut ctx = MockContext::new(0, 4).link(1, 1);
        let mut engine = LinkStateEngine::initialize(&ctx);
        engine.on_link_change(&mut ctx, n(1), Cost(1));
        assert_eq!(ctx.installs, 3);
        assert_eq!(ctx.routes.next_hop(n(3)), None);
        assert_eq!(ctx.routes.cost(n(3)), Cost::INFINITY);

        engine.on_link_change(&mut ctx, n(1), Cost(1));
        assert_eq!(ctx.installs, 6);
    }

    #[test]
    fn relaxation_uses_the_relay_record_not_the_reverse_one() {
        // 1 claims a link to 2, but 2 has not advertised anything yet.
        let mut ctx = MockContext::new(0, 3).link(1, 1);
        let mut engine = LinkStateEngine::initialize(&ctx);
        engine.on_link_change(&mut ctx, n(1), Cost(1));
        engine.on_receive(&mut ctx, n(1), &update(vec![record(1, 1, &[(0, 1), (2, 3)])]));
        assert_eq!(ctx.routes.next_hop(n(2)), Some(n(1)));
        assert_eq!(ctx.routes.cost(n(2)), Cost(4));
    }

    #[test]
    #[should_panic(expected = "record for unknown node")]
    fn unknown_origin_is_an_invariant_violation() {
        let mut ctx = MockContext::new(0, 2).link(1, 1);
        let mut engine = LinkStateEngine::initialize(&ctx);
        engine.on_receive(&mut ctx, n(1), &update(vec![record(9, 1, &[])]));
    }

    #[test]
    #[should_panic(expected = "link-state update from unknown sender")]
    fn update_from_unknown_sender_is_an_invariant_violation() {
        let mut ctx = MockContext::new(0, 2).link(1, 1);
        let mut engine = LinkStateEngine::initialize(&ctx);
        engine.on_receive(&mut ctx, n(7), &update(vec![record(1, 1, &[(0, 1)])]));
    }

    #[test]
    #[should_panic(expected = "link-state update from unknown sender")]
    fn update_from_self_is_an_invariant_violation() {
        let mut ctx = MockContext::new(0, 2).link(1, 1);
        let mut engine = LinkStateEngine::initialize(&ctx);
        engine.on_receive(&mut ctx, n(0), &update(vec![record(1, 1, &[(0, 1)])]));
    }
}
