//! Route search over the compact graph.

mod astar;
mod instructions;
mod matrix;
mod novelty;
mod result;
mod to_geojson;

pub use astar::shortest_path;
pub use instructions::{generate_instructions, NavigationStep, TurnDirection};
pub use matrix::{distance_matrix, one_to_many};
pub use novelty::novelty_route;
pub use result::{compute_novelty, path_edges, EdgeKey, RouteResult};
