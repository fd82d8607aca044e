use std::collections::{BTreeMap, BTreeSet};
use crate::error::SimulationError;
use crate::types::{Cost, NodeId};

/// Undirected graph of nodes and link costs. An absent link costs `INFINITY`.
#[derive(Debug, Clone, Default)]
pub struct Topology {
    nodes: BTreeSet<NodeId>,
    links: BTreeMap<(NodeId, NodeId), Cost>,
}

fn link_key(a: NodeId, b: NodeId) -> (NodeId, NodeId) {
    if a <= b { (a, b) } else { (b, a) }
}

impl Topology {
    pub fn with_nodes(nodes: impl IntoIterator<Item = NodeId>) -> Self {
        Self {
            nodes: nodes.into_iter().collect(),
            links: BTreeMap::new(),
        }
    }

    /// Nodes `0..count` connected in a cycle, every link costing `cost`.
    pub fn ring(count: u32, cost: Cost) -> Self {
        let mut topology = Self::with_nodes((0..count).map(NodeId));
        for i in 0..count {
            let j = (i + 1) % count;
            if i != j {
                topology.links.insert(link_key(NodeId(i), NodeId(j)), cost);
            }
        }
        topology
    }

    /// Nodes `0..count`, every pair directly linked at `cost`.
    pub fn full_mesh(count: u32, cost: Cost) -> Self {
        let mut topology = Self::with_nodes((0..count).map(NodeId));
        for i in 0..count {
            for j in (i + 1)..count {
                topology.links.insert((NodeId(i), NodeId(j)), cost);
            }
        }
        topology
    }

    pub fn add_node(&mut self, node: NodeId) {
        self.nodes.insert(node);
    }

    pub fn contains(&self, node: NodeId) -> bool {
        self.nodes.contains(&node)
    }

    /// All nodes, ascending.
    pub fn nodes(&self) -> Vec<NodeId> {
        self.nodes.iter().copied().collect()
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Set the cost of the a–b link; `INFINITY` takes the link down.
    /// Returns the previous cost.
    pub fn set_link_cost(&mut self, a: NodeId, b: NodeId, cost: Cost) -> Result<Cost, SimulationError> {
        if a == b {
            return Err(SimulationError::SelfLoop(a));
        }
        for node in [a, b] {
            if !self.contains(node) {
                return Err(SimulationError::UnknownNode(node));
            }
        }

        let key = link_key(a, b);
        let previous = if cost.is_finite() {
            self.links.insert(key, cost)
        } else {
            self.links.remove(&key)
        };
        Ok(previous.unwrap_or(Cost::INFINITY))
    }

    pub fn link_cost(&self, a: NodeId, b: NodeId) -> Cost {
        self.links.get(&link_key(a, b)).copied().unwrap_or(Cost::INFINITY)
    }

    pub fn neighbors(&self, node: NodeId) -> Vec<NodeId> {
        self.links
            .keys()
            .filter_map(|&(a, b)| {
                if a == node {
                    Some(b)
                } else if b == node {
                    Some(a)
                } else {
                    None
                }
            })
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    /// Every live link as `(low id, high id, cost)`, ascending.
    pub fn links(&self) -> impl Iterator<Item = (NodeId, NodeId, Cost)> + '_ {
        self.links.iter().map(|(&(a, b), &cost)| (a, b, cost))
    }

    pub fn link_count(&self) -> usize {
        self.links.len()
    }
}
