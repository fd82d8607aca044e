use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use crate::types::{Cost, NodeId};

/// Every payload a routing engine can put on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProtocolMessage {
    DistanceVector(DistanceVectorMessage),
    LinkState(LinkStateMessage),
    PathVector(PathVectorMessage),
}

/// A node's distance vector, possibly poisoned for the receiving neighbor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DistanceVectorMessage {
    pub distances: BTreeMap<NodeId, Cost>,
}

/// One originating node's view of its own links.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkStateRecord {
    pub origin: NodeId,
    pub version: u64,
    pub link_costs: BTreeMap<NodeId, Cost>,
}

/// The sender's entire link-state database.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkStateMessage {
    pub records: Vec<LinkStateRecord>,
}

/// Distance vector plus the explicit path behind every entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PathVectorMessage {
    pub distances: BTreeMap<NodeId, Cost>,
    pub paths: BTreeMap<NodeId, Vec<NodeId>>,
}

#[derive(Debug, thiserror::Error)]
pub enum MessageError {
    #[error("malformed routing message: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("empty routing message")]
    Empty,
}

impl ProtocolMessage {
    pub fn serialize(&self) -> Result<Vec<u8>, MessageError> {
        Ok(serde_json::to_vec(self)?)
    }

    pub fn deserialize(data: &[u8]) -> Result<Self, MessageError> {
        if data.is_empty() {
            return Err(MessageError::Empty);
        }
        Ok(serde_json::from_slice(data)?)
    }

    pub fn kind_name(&self) -> &'static str {
        match self {
            ProtocolMessage::DistanceVector(_) => "distance-vector",
            ProtocolMessage::LinkState(_) => "link-state",
            ProtocolMessage::PathVector(_) => "path-vector",
        }
    }
}

impl LinkStateRecord {
    /// Fresh record: cost 0 to the origin itself and no known links.
    pub fn new(origin: NodeId, nodes: &[NodeId]) -> Self {
        let link_costs = nodes
            .iter()
            .map(|&node| (node, if node == origin { Cost::ZERO } else { Cost::INFINITY }))
            .collect();
        Self {
            origin,
            version: 0,
            link_costs,
        }
    }

    pub fn cost_to(&self, node: NodeId) -> Cost {
        self.link_costs.get(&node).copied().unwrap_or(Cost::INFINITY)
    }
}
