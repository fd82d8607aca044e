//! Distance-vector, link-state and path-vector routing engines for nodes of
//! a simulated network, plus an in-memory harness that drives them.

pub mod algorithms;
pub mod config;
pub mod error;
pub mod network;
pub mod protocol;
pub mod simulation;
pub mod types;

pub use config::{LinkConfig, SimulationConfig};
pub use error::SimulationError;
pub use network::Topology;
pub use protocol::{
    Engine, EngineKind, NodeContext, ProtocolMessage, RouteEntry, RoutingEngine, RoutingTable, TopologyQuery,
    Transport,
};
pub use simulation::{DeliveryOrder, Simulation, SimulationStats};
pub use types::{Cost, NodeId};
