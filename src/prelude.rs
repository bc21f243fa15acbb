//! Convenience re-exports for typical consumers.

pub use crate::{DEFAULT_MAX_OVERHEAD, DEFAULT_MIN_NOVELTY};

// The graph container and its spatial snap
pub use crate::model::CompactGraph;

// Route search
pub use crate::routing::{
    distance_matrix, generate_instructions, novelty_route, one_to_many, shortest_path,
};
pub use crate::routing::{
    compute_novelty, path_edges, EdgeKey, NavigationStep, RouteResult, TurnDirection,
};

// Core scalar types
pub use crate::{NodeIndex, OsmNodeId, WalkedEdges};

// Assembling graphs offline
pub use crate::loading::{write_graph, GraphBuilder};
