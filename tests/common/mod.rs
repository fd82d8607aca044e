#![allow(dead_code)]

use routing_sim::{Cost, DeliveryOrder, EngineKind, NodeId, Simulation, Topology};

pub const BUDGET: usize = 200_000;

pub const ORDERS: [DeliveryOrder; 3] = [DeliveryOrder::Fifo, DeliveryOrder::Lifo, DeliveryOrder::Coalesced];

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

pub fn n(id: u32) -> NodeId {
    NodeId(id)
}

pub fn topology(node_count: u32, links: &[(u32, u32, u32)]) -> Topology {
    let mut topology = Topology::with_nodes((0..node_count).map(NodeId));
    for &(a, b, cost) in links {
        topology.set_link_cost(n(a), n(b), Cost(cost)).unwrap();
    }
    topology
}

/// Build a simulation and run it to quiescence.
pub fn converged(topology: Topology, kind: EngineKind, order: DeliveryOrder) -> Simulation {
    let mut sim = Simulation::new(topology, kind, order).unwrap();
    sim.run(BUDGET)
        .unwrap_or_else(|e| panic!("{} / {}: {}", kind, order, e));
    sim
}
