pub mod distance_vector;
pub mod link_state;
pub mod messages;
pub mod path_vector;
pub mod routing_table;

pub use distance_vector::DistanceVectorEngine;
pub use link_state::LinkStateEngine;
pub use messages::*;
pub use path_vector::PathVectorEngine;
pub use routing_table::*;

use crate::types::{Cost, NodeId};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Read-only view of the network a node is allowed to see.
pub trait TopologyQuery {
    /// Every node in the network, in ascending id order.
    fn nodes(&self) -> Vec<NodeId>;

    /// Id of the node whose handler is currently running.
    fn current_node(&self) -> NodeId;

    /// Current cost of the direct link to `neighbor`, `INFINITY` if there is none.
    fn link_cost(&self, neighbor: NodeId) -> Cost;

    /// Nodes with a usable direct link, ascending.
    fn neighbors(&self) -> Vec<NodeId> {
        let me = self.current_node();
        self.nodes()
            .into_iter()
            .filter(|&node| node != me && self.link_cost(node).is_finite())
            .collect()
    }
}

/// Outbound side of a node: route installation and message sending.
pub trait Transport {
    /// Install or overwrite the route to `destination`. May be called redundantly.
    fn set_route(&mut self, destination: NodeId, next_hop: Option<NodeId>, cost: Cost);

    /// Hand `message` to the transport for delivery to a direct neighbor.
    fn send(&mut self, neighbor: NodeId, message: ProtocolMessage);
}

/// Everything a handler needs from its environment for one call.
pub trait NodeContext: TopologyQuery + Transport {}

impl<T: TopologyQuery + Transport + ?Sized> NodeContext for T {}

/// Callback surface shared by all routing engines.
///
/// Handlers run to completion and are never invoked concurrently for the
/// same node. Received payloads are only borrowed for the duration of the call.
pub trait RoutingEngine: Sized {
    fn initialize<C: NodeContext + ?Sized>(ctx: &C) -> Self;

    fn on_link_change<C: NodeContext + ?Sized>(&mut self, ctx: &mut C, neighbor: NodeId, cost: Cost);

    fn on_receive<C: NodeContext + ?Sized>(&mut self, ctx: &mut C, sender: NodeId, message: &ProtocolMessage);
}

/// Routing algorithm selected when a node is configured.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EngineKind {
    DistanceVector,
    LinkState,
    PathVector,
}

impl EngineKind {
    pub const ALL: [EngineKind; 3] = [
        EngineKind::DistanceVector,
        EngineKind::LinkState,
        EngineKind::PathVector,
    ];
}

impl fmt::Display for EngineKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            EngineKind::DistanceVector => "distance-vector",
            EngineKind::LinkState => "link-state",
            EngineKind::PathVector => "path-vector",
        };
        f.write_str(name)
    }
}

impl FromStr for EngineKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "distance-vector" | "dv" => Ok(EngineKind::DistanceVector),
            "link-state" | "ls" => Ok(EngineKind::LinkState),
            "path-vector" | "pv" => Ok(EngineKind::PathVector),
            other => Err(format!("unknown engine '{}'", other)),
        }
    }
}

/// Per-node engine state, one variant per algorithm.
#[derive(Debug, Clone)]
pub enum Engine {
    DistanceVector(DistanceVectorEngine),
    LinkState(LinkStateEngine),
    PathVector(PathVectorEngine),
}

impl Engine {
    pub fn initialize<C: NodeContext + ?Sized>(kind: EngineKind, ctx: &C) -> Self {
        match kind {
            EngineKind::DistanceVector => Engine::DistanceVector(DistanceVectorEngine::initialize(ctx)),
            EngineKind::LinkState => Engine::LinkState(LinkStateEngine::initialize(ctx)),
            EngineKind::PathVector => Engine::PathVector(PathVectorEngine::initialize(ctx)),
        }
    }

    pub fn kind(&self) -> EngineKind {
        match self {
            Engine::DistanceVector(_) => EngineKind::DistanceVector,
            Engine::LinkState(_) => EngineKind::LinkState,
            Engine::PathVector(_) => EngineKind::PathVector,
        }
    }

    pub fn on_link_change<C: NodeContext + ?Sized>(&mut self, ctx: &mut C, neighbor: NodeId, cost: Cost) {
        match self {
            Engine::DistanceVector(engine) => engine.on_link_change(ctx, neighbor, cost),
            Engine::LinkState(engine) => engine.on_link_change(ctx, neighbor, cost),
            Engine::PathVector(engine) => engine.on_link_change(ctx, neighbor, cost),
        }
    }

    pub fn on_receive<C: NodeContext + ?Sized>(&mut self, ctx: &mut C, sender: NodeId, message: &ProtocolMessage) {
        match self {
            Engine::DistanceVector(engine) => engine.on_receive(ctx, sender, message),
            Engine::LinkState(engine) => engine.on_receive(ctx, sender, message),
            Engine::PathVector(engine) => engine.on_receive(ctx, sender, message),
        }
    }
}
