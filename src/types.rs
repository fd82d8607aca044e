use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::Add;

/// Identifier of a node in the simulated network.
///
/// Ids come from a bounded set enumerated by the topology. Their ordering
/// is only used to break ties deterministically.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(pub u32);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "n{}", self.0)
    }
}

impl From<u32> for NodeId {
    fn from(id: u32) -> Self {
        NodeId(id)
    }
}

/// Scalar link or path cost with an absorbing `INFINITY`.
///
/// Addition saturates: `INFINITY + x == INFINITY`, and two finite costs
/// whose sum would overflow also yield `INFINITY`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Cost(pub u32);

impl Cost {
    pub const ZERO: Cost = Cost(0);
    pub const INFINITY: Cost = Cost(u32::MAX);

    pub fn is_finite(self) -> bool {
        self != Cost::INFINITY
    }

    pub fn is_infinite(self) -> bool {
        self == Cost::INFINITY
    }
}

impl Add for Cost {
    type Output = Cost;

    fn add(self, rhs: Cost) -> Cost {
        if self.is_infinite() || rhs.is_infinite() {
            return Cost::INFINITY;
        }
        // u32::MAX itself is the sentinel, so a checked sum landing on it saturates too.
        match self.0.checked_add(rhs.0) {
            Some(sum) => Cost(sum),
            None => Cost::INFINITY,
        }
    }
}

impl From<u32> for Cost {
    fn from(value: u32) -> Self {
        Cost(value)
    }
}

impl fmt::Display for Cost {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_infinite() {
            write!(f, "inf")
        } else {
            write!(f, "{}", self.0)
        }
    }
}
