use std::cmp::Reverse;
use std::collections::{BTreeMap, BTreeSet, BinaryHeap};
use crate::types::{Cost, NodeId};

/// Outcome of the shortest-path computation for one destination.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShortestPath {
    pub cost: Cost,
    pub next_hop: Option<NodeId>,
}

impl ShortestPath {
    pub const UNREACHABLE: ShortestPath = ShortestPath {
        cost: Cost::INFINITY,
        next_hop: None,
    };
}

/// Dijkstra from `source` over `nodes`.
///
/// Tentative distances start at `direct(node)`, the cost of the source's own
/// link to that node, and a directly reached node is its own next hop. Once a
/// node is settled its neighbors are relaxed with `link(settled, other)` and
/// inherit the settled node's next hop. The heap orders on
/// `(distance, NodeId)`, so equal distances settle lowest id first.
///
/// Every node except `source` appears in the result; those never reached
/// are `ShortestPath::UNREACHABLE`.
pub fn shortest_path_tree<D, L>(source: NodeId, nodes: &[NodeId], direct: D, link: L) -> BTreeMap<NodeId, ShortestPath>
where
    D: Fn(NodeId) -> Cost,
    L: Fn(NodeId, NodeId) -> Cost,
{
    let mut tentative: BTreeMap<NodeId, ShortestPath> = BTreeMap::new();
    let mut heap = BinaryHeap::new();

    for &node in nodes.iter().filter(|&&node| node != source) {
        let cost = direct(node);
        if cost.is_finite() {
            tentative.insert(node, ShortestPath { cost, next_hop: Some(node) });
            heap.push(Reverse((cost, node)));
        } else {
            tentative.insert(node, ShortestPath::UNREACHABLE);
        }
    }

    let mut settled: BTreeSet<NodeId> = BTreeSet::new();

    while let Some(Reverse((cost, node))) = heap.pop() {
        if settled.contains(&node) || cost > tentative[&node].cost {
            continue;
        }
        settled.insert(node);
        let next_hop = tentative[&node].next_hop;

        for (&other, entry) in tentative.iter_mut() {
            if settled.contains(&other) {
                continue;
            }
            let candidate = cost + link(node, other);
            if candidate < entry.cost {
                *entry = ShortestPath { cost: candidate, next_hop };
                heap.push(Reverse((candidate, other)));
            }
        }
    }

    tentative
}
