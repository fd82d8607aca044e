pub mod bellman_ford;
pub mod dijkstra;

pub use bellman_ford::{best_candidate, Candidate};
pub use dijkstra::{shortest_path_tree, ShortestPath};
