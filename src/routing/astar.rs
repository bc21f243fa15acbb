//! A* shortest-path search over the CSR adjacency.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use crate::geometry::haversine;
use crate::routing::EdgeKey;
use crate::{CompactGraph, Error, NodeIndex, OsmNodeId, WalkedEdges};

const NO_PARENT: i32 = -1;

#[derive(Debug, Copy, Clone, PartialEq)]
struct SearchState {
    f: f32,
    g: f32,
    counter: u64,
    node: NodeIndex,
}

impl Eq for SearchState {}

impl Ord for SearchState {
    fn cmp(&self, other: &Self) -> Ordering {
        // Min-heap in (f, g, counter) order (reversed from the std max-heap).
        // The insertion counter breaks remaining ties deterministically.
        other
            .f
            .total_cmp(&self.f)
            .then_with(|| other.g.total_cmp(&self.g))
            .then_with(|| other.counter.cmp(&self.counter))
    }
}

impl PartialOrd for SearchState {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Shortest path between two external node ids.
///
/// Returns the path as external ids together with its length in meters, or
/// `None` when the endpoints lie in different components. Unknown ids are an
/// error. `source == target` short-circuits to a single-node path.
pub fn shortest_path(
    graph: &CompactGraph,
    source: OsmNodeId,
    target: OsmNodeId,
) -> Result<Option<(Vec<OsmNodeId>, f64)>, Error> {
    if source == target {
        graph.index_of(source)?;
        return Ok(Some((vec![source], 0.0)));
    }
    let src = graph.index_of(source)?;
    let tgt = graph.index_of(target)?;

    Ok(astar_indices(graph, src, tgt, None).map(|indices| finish_path(graph, &indices)))
}

/// Unpenalized shortest path between two internal indices.
pub(crate) fn plain_path(
    graph: &CompactGraph,
    src: NodeIndex,
    tgt: NodeIndex,
) -> Option<(Vec<OsmNodeId>, f64)> {
    if src == tgt {
        return Some((vec![graph.node_id(src)], 0.0));
    }
    astar_indices(graph, src, tgt, None).map(|indices| finish_path(graph, &indices))
}

/// A* with a multiplicative penalty on edges in the walked set. The reported
/// distance is always the unpenalized sum.
pub(crate) fn penalized_path(
    graph: &CompactGraph,
    src: NodeIndex,
    tgt: NodeIndex,
    walked: &WalkedEdges,
    penalty: f64,
) -> Option<(Vec<OsmNodeId>, f64)> {
    if src == tgt {
        return Some((vec![graph.node_id(src)], 0.0));
    }
    astar_indices(graph, src, tgt, Some((walked, penalty)))
        .map(|indices| finish_path(graph, &indices))
}

/// Core A* over internal indices. With `penalty` the relaxation cost of a
/// walked edge is scaled; the caller re-sums the true length afterwards.
fn astar_indices(
    graph: &CompactGraph,
    src: NodeIndex,
    tgt: NodeIndex,
    penalty: Option<(&WalkedEdges, f64)>,
) -> Option<Vec<NodeIndex>> {
    let num_nodes = graph.num_nodes();
    let (target_lat, target_lon) = graph.node_coords(tgt);

    let mut g_score = vec![f32::INFINITY; num_nodes];
    let mut came_from = vec![NO_PARENT; num_nodes];
    g_score[src as usize] = 0.0;

    let (src_lat, src_lon) = graph.node_coords(src);
    let mut counter: u64 = 0;
    let mut open = BinaryHeap::new();
    open.push(SearchState {
        f: haversine(src_lat, src_lon, target_lat, target_lon) as f32,
        g: 0.0,
        counter,
        node: src,
    });

    while let Some(SearchState { g, node, .. }) = open.pop() {
        if node == tgt {
            return Some(reconstruct(&came_from, src, tgt));
        }

        // Stale entry left behind by a later, cheaper relaxation.
        if g > g_score[node as usize] {
            continue;
        }

        let node_id = graph.node_id(node);
        let (targets, weights) = graph.neighbors(node);
        for (&t, &w) in targets.iter().zip(weights) {
            let neighbor = t as NodeIndex;
            let effective = match penalty {
                Some((walked, factor))
                    if walked.contains(&EdgeKey::new(node_id, graph.node_id(neighbor))) =>
                {
                    w * factor as f32
                }
                _ => w,
            };

            let tentative = g + effective;
            if tentative < g_score[neighbor as usize] {
                g_score[neighbor as usize] = tentative;
                came_from[neighbor as usize] = node as i32;

                let (nlat, nlon) = graph.node_coords(neighbor);
                let h = haversine(nlat, nlon, target_lat, target_lon) as f32;
                counter += 1;
                open.push(SearchState {
                    f: tentative + h,
                    g: tentative,
                    counter,
                    node: neighbor,
                });
            }
        }
    }

    None
}

fn reconstruct(came_from: &[i32], src: NodeIndex, tgt: NodeIndex) -> Vec<NodeIndex> {
    let mut path = vec![tgt];
    let mut current = tgt;
    while current != src {
        let parent = came_from[current as usize];
        debug_assert_ne!(parent, NO_PARENT);
        current = parent as NodeIndex;
        path.push(current);
    }
    path.reverse();
    path
}

fn finish_path(graph: &CompactGraph, indices: &[NodeIndex]) -> (Vec<OsmNodeId>, f64) {
    let ids = indices.iter().map(|&i| graph.node_id(i)).collect();
    (ids, path_distance(graph, indices))
}

/// Sum of edge weights along a path of internal indices.
pub(crate) fn path_distance(graph: &CompactGraph, indices: &[NodeIndex]) -> f64 {
    let mut total = 0.0;
    for pair in indices.windows(2) {
        let (targets, weights) = graph.neighbors(pair[0]);
        let j = targets
            .iter()
            .position(|&t| t == pair[1] as i32)
            .expect("consecutive path nodes must be adjacent");
        total += weights[j] as f64;
    }
    total
}
