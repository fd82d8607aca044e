mod common;

use common::*;
use routing_sim::protocol::{DistanceVectorMessage, LinkStateMessage, LinkStateRecord, PathVectorMessage};
use routing_sim::{Cost, Engine, EngineKind, NodeId, ProtocolMessage, Simulation, Topology};
use std::collections::BTreeMap;

const A: u32 = 0;
const B: u32 = 1;
const C: u32 = 2;
const D: u32 = 3;

#[test]
fn ring_of_four_agrees_on_tie_break() {
    init_logging();
    for order in ORDERS {
        let mut choices = Vec::new();
        for kind in EngineKind::ALL {
            let sim = converged(Topology::ring(4, Cost(1)), kind, order);
            let routes = sim.routes(n(A)).unwrap();
            assert_eq!(routes.cost(n(C)), Cost(2), "{} / {}", kind, order);
            choices.push(routes.next_hop(n(C)));
        }
        // Equal-cost paths through B and D: the lower id wins everywhere.
        assert!(choices.iter().all(|&hop| hop == Some(n(B))), "{}: {:?}", order, choices);
    }
}

#[test]
fn mesh_link_failure_reconverges_through_an_intermediate() {
    init_logging();
    for kind in EngineKind::ALL {
        for order in ORDERS {
            let mut sim = converged(Topology::full_mesh(4, Cost(1)), kind, order);
            assert_eq!(sim.routes(n(A)).unwrap().next_hop(n(B)), Some(n(B)));

            sim.set_link_cost(n(A), n(B), Cost::INFINITY).unwrap();
            sim.run(BUDGET).unwrap();
            sim.verify_routes().unwrap();

            for (from, to) in [(A, B), (B, A)] {
                let routes = sim.routes(n(from)).unwrap();
                assert_eq!(routes.cost(n(to)), Cost(2), "{} / {}", kind, order);
                let hop = routes.next_hop(n(to)).unwrap();
                assert!(hop == n(C) || hop == n(D), "{} / {}: via {}", kind, order, hop);
            }
            // Untouched pairs keep their direct links.
            assert_eq!(sim.routes(n(C)).unwrap().next_hop(n(D)), Some(n(D)));
        }
    }
}

type RouteSnapshot = BTreeMap<(NodeId, NodeId), (Option<NodeId>, Cost)>;

fn route_snapshot(sim: &Simulation) -> RouteSnapshot {
    let mut snapshot = BTreeMap::new();
    for node in sim.topology().nodes() {
        for route in sim.routes(node).unwrap().iter() {
            snapshot.insert((node, route.destination), (route.next_hop, route.cost));
        }
    }
    snapshot
}

#[test]
fn mesh_link_failure_settles_without_oscillation() {
    init_logging();
    for kind in EngineKind::ALL {
        for order in ORDERS {
            let mut sim = converged(Topology::full_mesh(4, Cost(1)), kind, order);
            let mut last = route_snapshot(&sim);
            let mut changes: BTreeMap<(NodeId, NodeId), usize> = BTreeMap::new();
            let mut record = |sim: &Simulation, last: &mut RouteSnapshot| {
                let now = route_snapshot(sim);
                for (key, entry) in &now {
                    if last.get(key) != Some(entry) {
                        *changes.entry(*key).or_default() += 1;
                    }
                }
                *last = now;
            };

            sim.set_link_cost(n(A), n(B), Cost::INFINITY).unwrap();
            record(&sim, &mut last);
            let mut delivered = 0;
            while sim.step().unwrap() {
                record(&sim, &mut last);
                delivered += 1;
                assert!(delivered < BUDGET, "{} / {}: no quiescence", kind, order);
            }

            for (&(node, destination), &count) in &changes {
                assert_eq!(count, 1, "{} / {}: route {} -> {} changed {} times", kind, order, node, destination, count);
            }
            assert_eq!(last[&(n(A), n(B))], (Some(n(C)), Cost(2)), "{} / {}", kind, order);
            sim.verify_routes().unwrap();
        }
    }
}

#[test]
fn link_state_reflood_carries_newer_version() {
    init_logging();
    let mut sim = converged(Topology::full_mesh(4, Cost(1)), EngineKind::LinkState, ORDERS[0]);
    let Some(Engine::LinkState(engine)) = sim.engine(n(A)) else {
        panic!("expected a link-state engine");
    };
    let before = engine.version_of(n(A)).unwrap();

    sim.set_link_cost(n(A), n(B), Cost::INFINITY).unwrap();
    let floods: Vec<_> = sim
        .in_flight()
        .unwrap()
        .into_iter()
        .filter(|(from, _, _)| *from == n(A))
        .collect();
    assert_eq!(floods.len(), 2, "A floods only to its remaining neighbors");
    for (_, to, message) in &floods {
        assert_ne!(*to, n(B));
        let ProtocolMessage::LinkState(update) = message else {
            panic!("expected a link-state flood");
        };
        let own = update.records.iter().find(|r| r.origin == n(A)).unwrap();
        assert!(own.version > before);
        assert_eq!(own.cost_to(n(B)), Cost::INFINITY);
    }

    sim.run(BUDGET).unwrap();
    for node in [B, C, D] {
        let Some(Engine::LinkState(engine)) = sim.engine(n(node)) else {
            panic!("expected a link-state engine");
        };
        assert_eq!(engine.version_of(n(A)), Some(before + 1));
    }
}

#[test]
fn replayed_link_state_is_ignored() {
    init_logging();
    let mut sim = converged(Topology::ring(4, Cost(1)), EngineKind::LinkState, ORDERS[0]);
    let nodes: Vec<_> = (0..4).map(n).collect();
    let stale = ProtocolMessage::LinkState(LinkStateMessage {
        records: vec![LinkStateRecord {
            origin: n(B),
            version: 0,
            link_costs: nodes.iter().map(|&node| (node, Cost(1))).collect(),
        }],
    });
    let before = sim.routes(n(A)).unwrap().clone();
    let sent = sim.stats().messages_sent;

    sim.inject(n(B), n(A), &stale).unwrap();
    assert_eq!(sim.run(BUDGET).unwrap(), 1);
    assert_eq!(sim.stats().messages_sent, sent + 1);
    assert_eq!(sim.routes(n(A)).unwrap(), &before);
}

#[test]
fn redelivered_vectors_trigger_no_rebroadcast() {
    init_logging();
    for kind in [EngineKind::DistanceVector, EngineKind::PathVector] {
        let mut sim = converged(Topology::ring(4, Cost(1)), kind, ORDERS[0]);
        let before = sim.routes(n(A)).unwrap().clone();

        // What B currently advertises to A, sent a second time.
        let replay = match sim.engine(n(B)).unwrap() {
            Engine::DistanceVector(engine) => {
                ProtocolMessage::DistanceVector(engine.advertisement_for(n(A)))
            }
            Engine::PathVector(engine) => ProtocolMessage::PathVector(engine.advertisement()),
            Engine::LinkState(_) => unreachable!(),
        };

        let sent = sim.stats().messages_sent;
        sim.inject(n(B), n(A), &replay).unwrap();
        assert_eq!(sim.run(BUDGET).unwrap(), 1, "{}", kind);
        assert_eq!(sim.stats().messages_sent, sent + 1, "{}", kind);
        assert_eq!(sim.routes(n(A)).unwrap(), &before, "{}", kind);
    }
}

#[test]
fn distance_vector_poisons_only_toward_the_next_hop() {
    init_logging();
    // A - B - C plus a spur D hanging off A: B reaches D through A.
    let links = [(A, B, 1), (B, C, 1), (A, D, 1)];
    let sim = converged(topology(4, &links), EngineKind::DistanceVector, ORDERS[0]);
    let Some(Engine::DistanceVector(b)) = sim.engine(n(B)) else {
        panic!("expected a distance-vector engine");
    };

    assert_eq!(b.next_hop(n(D)), Some(n(A)));
    assert_eq!(b.advertisement_for(n(A)).distances[&n(D)], Cost::INFINITY);
    assert_eq!(b.advertisement_for(n(C)).distances[&n(D)], Cost(2));
}

#[test]
fn path_vector_never_installs_a_path_through_itself() {
    init_logging();
    let links = [(A, B, 1), (B, C, 1), (C, D, 1), (D, A, 1), (A, C, 5)];
    for order in ORDERS {
        let mut sim = converged(topology(4, &links), EngineKind::PathVector, order);
        sim.set_link_cost(n(B), n(C), Cost::INFINITY).unwrap();
        sim.run(BUDGET).unwrap();
        sim.verify_routes().unwrap();

        for node in (0..4).map(n) {
            let Some(Engine::PathVector(engine)) = sim.engine(node) else {
                panic!("expected a path-vector engine");
            };
            for destination in (0..4).map(n).filter(|&d| d != node) {
                let path = engine.path_to(destination);
                if path.is_empty() {
                    continue;
                }
                assert_eq!(path[0], node);
                assert_eq!(*path.last().unwrap(), destination);
                assert!(!path[1..].contains(&node), "{}: {:?}", order, path);
            }
        }
    }
}

#[test]
fn path_vector_rejects_cheap_looping_advertisement() {
    init_logging();
    let mut sim = converged(Topology::ring(4, Cost(1)), EngineKind::PathVector, ORDERS[0]);
    // B falsely offers C at cost 0 over a path that runs back through A.
    let distances = BTreeMap::from([(n(B), Cost::ZERO), (n(C), Cost::ZERO)]);
    let paths = BTreeMap::from([(n(B), vec![n(B)]), (n(C), vec![n(B), n(A), n(C)])]);
    sim.inject(n(B), n(A), &ProtocolMessage::PathVector(PathVectorMessage { distances, paths }))
        .unwrap();
    sim.run(BUDGET).unwrap();

    let routes = sim.routes(n(A)).unwrap();
    assert_eq!(routes.next_hop(n(C)), Some(n(D)));
    assert_eq!(routes.cost(n(C)), Cost(2));
}

#[test]
fn distance_vector_wire_format() {
    let message = ProtocolMessage::DistanceVector(DistanceVectorMessage {
        distances: BTreeMap::from([(n(A), Cost(0)), (n(B), Cost::INFINITY)]),
    });
    let bytes = message.serialize().unwrap();
    assert_eq!(
        String::from_utf8(bytes).unwrap(),
        r#"{"distance_vector":{"distances":{"0":0,"1":4294967295}}}"#
    );
}
