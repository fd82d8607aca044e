use crate::protocol::MessageError;
use crate::types::{Cost, NodeId};

/// Failures of the simulation harness. The routing engines themselves never
/// return errors: unreachable destinations are plain data.
#[derive(Debug, thiserror::Error)]
pub enum SimulationError {
    #[error("unknown node {0}")]
    UnknownNode(NodeId),

    #[error("link from {0} to itself")]
    SelfLoop(NodeId),

    #[error("{from} tried to send to {to}, which is not a direct neighbor")]
    NotANeighbor { from: NodeId, to: NodeId },

    #[error("no convergence after {delivered} deliveries ({pending} messages still in flight)")]
    NotConverged { delivered: usize, pending: usize },

    #[error("{node}: route to {destination} has cost {actual}, shortest path costs {expected}")]
    WrongCost {
        node: NodeId,
        destination: NodeId,
        expected: Cost,
        actual: Cost,
    },

    #[error("{node}: route to {destination} uses {next_hop:?}, which is not on a shortest path")]
    WrongNextHop {
        node: NodeId,
        destination: NodeId,
        next_hop: Option<NodeId>,
    },

    #[error(transparent)]
    Message(#[from] MessageError),
}
