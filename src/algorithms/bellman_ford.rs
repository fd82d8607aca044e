use crate::types::{Cost, NodeId};

/// The neighbor selected for one destination and the resulting cost.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Candidate {
    pub neighbor: NodeId,
    pub cost: Cost,
}

/// One Bellman-Ford relaxation step for a single destination.
///
/// `neighbors` holds `(neighbor, link cost)` pairs in ascending id order.
/// The total is `link cost + advertised(neighbor)`; the strict minimum wins,
/// so on equal cost the lowest id seen first is kept. Neighbors for which
/// `admissible` returns false are skipped whatever their cost. Returns
/// `None` when no neighbor offers a finite total.
pub fn best_candidate<A, P>(neighbors: &[(NodeId, Cost)], advertised: A, admissible: P) -> Option<Candidate>
where
    A: Fn(NodeId) -> Cost,
    P: Fn(NodeId) -> bool,
{
    let mut best: Option<Candidate> = None;
    let mut min = Cost::INFINITY;

    for &(neighbor, link_cost) in neighbors {
        if link_cost.is_infinite() {
            continue;
        }
        let total = link_cost + advertised(neighbor);
        if total < min && admissible(neighbor) {
            min = total;
            best = Some(Candidate { neighbor, cost: total });
        }
    }

    best
}
