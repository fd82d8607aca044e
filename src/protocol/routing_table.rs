use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use crate::types::{Cost, NodeId};

/// A single installed route. `next_hop == None` means unreachable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteEntry {
    pub destination: NodeId,
    pub next_hop: Option<NodeId>,
    pub cost: Cost,
}

impl RouteEntry {
    pub fn new(destination: NodeId, next_hop: Option<NodeId>, cost: Cost) -> Self {
        Self {
            destination,
            next_hop,
            cost,
        }
    }

    pub fn is_reachable(&self) -> bool {
        self.next_hop.is_some() && self.cost.is_finite()
    }
}

impl fmt::Display for RouteEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.next_hop {
            Some(hop) => write!(f, "{} via {} cost {}", self.destination, hop, self.cost),
            None => write!(f, "{} unreachable", self.destination),
        }
    }
}

/// Routes installed on one node, keyed by destination.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoutingTable {
    entries: BTreeMap<NodeId, RouteEntry>,
}

impl RoutingTable {
    pub fn new() -> Self {
        Self {
            entries: BTreeMap::new(),
        }
    }

    /// Install or overwrite; returns true if the stored entry changed.
    pub fn install(&mut self, entry: RouteEntry) -> bool {
        self.entries.insert(entry.destination, entry) != Some(entry)
    }

    pub fn get_route(&self, destination: NodeId) -> Option<&RouteEntry> {
        self.entries.get(&destination)
    }

    pub fn next_hop(&self, destination: NodeId) -> Option<NodeId> {
        self.entries.get(&destination).and_then(|entry| entry.next_hop)
    }

    pub fn cost(&self, destination: NodeId) -> Cost {
        self.entries
            .get(&destination)
            .map(|entry| entry.cost)
            .unwrap_or(Cost::INFINITY)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &RouteEntry> {
        self.entries.values()
    }

    /// Only the entries that currently lead somewhere.
    pub fn reachable(&self) -> impl Iterator<Item = &RouteEntry> {
        self.entries.values().filter(|entry| entry.is_reachable())
    }
}
