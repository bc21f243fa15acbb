//! Pedestrian routing over a memory-mapped street network, with a
//! novelty-seeking route search that prefers streets the walker has not
//! covered before.
//!
//! The graph is a Compressed-Sparse-Row container produced by an offline
//! pipeline and mapped read-only at load; nearest-node snapping runs over a
//! cached KD-tree; routes come from A* with a haversine heuristic. The
//! novelty search penalizes previously walked edges and binary-searches the
//! penalty factor against a distance-overhead budget.
//!
//! ```no_run
//! use geo::Point;
//! use stray::prelude::*;
//!
//! # fn main() -> Result<(), stray::Error> {
//! let graph = CompactGraph::load("data/walk_graph.bin")?;
//! let (src, _) = graph.find_nearest_node(Point::new(-122.4010, 37.7946));
//! let (tgt, _) = graph.find_nearest_node(Point::new(-122.4194, 37.7793));
//!
//! let walked = WalkedEdges::default();
//! let route = novelty_route(
//!     &graph,
//!     graph.node_id(src),
//!     graph.node_id(tgt),
//!     &walked,
//!     DEFAULT_MIN_NOVELTY,
//!     DEFAULT_MAX_OVERHEAD,
//! )?;
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod geometry;
pub mod loading;
pub mod model;
pub mod prelude;
pub mod routing;
pub mod spatial;

pub use error::Error;
pub use model::CompactGraph;
pub use routing::{
    distance_matrix, generate_instructions, novelty_route, one_to_many, shortest_path,
    EdgeKey, NavigationStep, RouteResult, TurnDirection,
};

/// External (OSM) node identifier carried in the graph file. Opaque to the
/// core; never used for array indexing.
pub type OsmNodeId = i64;

/// Dense internal node index assigned at load time.
pub type NodeIndex = u32;

/// Set of canonically keyed edges the walker has already covered. Owned by
/// the caller; the core only probes membership.
pub type WalkedEdges = hashbrown::HashSet<EdgeKey>;

/// Default minimum fraction of novel edges a route should contain.
pub const DEFAULT_MIN_NOVELTY: f64 = 0.3;

/// Default maximum distance overhead over the shortest path.
pub const DEFAULT_MAX_OVERHEAD: f64 = 0.25;
