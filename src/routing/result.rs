//! Route result types and the novelty/overhead bookkeeping.

use serde::Serialize;

use crate::routing::instructions::{generate_instructions, NavigationStep};
use crate::{CompactGraph, Error, OsmNodeId, WalkedEdges};

/// Canonical key for an undirected edge: the smaller external id first, so
/// both traversal directions hash to the same entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct EdgeKey {
    pub start: OsmNodeId,
    pub end: OsmNodeId,
}

impl EdgeKey {
    pub fn new(a: OsmNodeId, b: OsmNodeId) -> Self {
        if a <= b {
            Self { start: a, end: b }
        } else {
            Self { start: b, end: a }
        }
    }
}

/// A computed route with its novelty statistics.
#[derive(Debug, Clone, Serialize)]
pub struct RouteResult {
    /// External node ids in walking order.
    pub path: Vec<OsmNodeId>,
    /// Canonical keys of the traversed edges, in path order.
    pub edges: Vec<EdgeKey>,
    /// True geographic length of the route in meters.
    pub distance: f64,
    /// Length of the shortest path between the same endpoints.
    pub shortest_distance: f64,
    /// Fraction of edges not present in the walked history, in `[0, 1]`.
    pub novelty: f64,
    /// `(distance - shortest_distance) / shortest_distance`.
    pub overhead: f64,
    /// Turn-by-turn steps; present only when the graph carries street
    /// metadata.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instructions: Option<Vec<NavigationStep>>,
}

/// Edge keys of consecutive node pairs along a path.
pub fn path_edges(path: &[OsmNodeId]) -> Vec<EdgeKey> {
    path.windows(2).map(|w| EdgeKey::new(w[0], w[1])).collect()
}

/// Fraction of edges absent from the walked set. An edgeless path is fully
/// novel by definition.
pub fn compute_novelty(edges: &[EdgeKey], walked: &WalkedEdges) -> f64 {
    if edges.is_empty() {
        return 1.0;
    }
    let novel = edges.iter().filter(|e| !walked.contains(*e)).count();
    novel as f64 / edges.len() as f64
}

/// Packages a route, computing its statistics against the walked history.
/// Instructions are attached when the graph has street metadata.
pub(crate) fn build_result(
    graph: &CompactGraph,
    path: Vec<OsmNodeId>,
    distance: f64,
    shortest_distance: f64,
    walked: &WalkedEdges,
) -> Result<RouteResult, Error> {
    let edges = path_edges(&path);
    let novelty = compute_novelty(&edges, walked);
    let overhead = if shortest_distance > 0.0 {
        (distance - shortest_distance) / shortest_distance
    } else {
        0.0
    };
    let instructions = generate_instructions(graph, &path)?;

    Ok(RouteResult {
        path,
        edges,
        distance,
        shortest_distance,
        novelty,
        overhead,
        instructions,
    })
}
