//! Bulk distance queries: one-to-many Dijkstra and an origins-by-
//! destinations matrix.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use hashbrown::HashMap;
use rayon::prelude::*;

use crate::{CompactGraph, Error, NodeIndex, OsmNodeId};

#[derive(Copy, Clone, PartialEq)]
struct State {
    cost: f32,
    node: NodeIndex,
}

impl Eq for State {}

impl Ord for State {
    fn cmp(&self, other: &Self) -> Ordering {
        // Min-heap by cost (reversed from the std max-heap).
        other
            .cost
            .total_cmp(&self.cost)
            .then_with(|| other.node.cmp(&self.node))
    }
}

impl PartialOrd for State {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Walking distances in meters from one source to many targets, by plain
/// Dijkstra over the CSR. The search stops as soon as every requested
/// target has settled; unreachable targets come back as `None`.
pub fn one_to_many(
    graph: &CompactGraph,
    source: OsmNodeId,
    targets: &[OsmNodeId],
) -> Result<Vec<Option<f64>>, Error> {
    let src = graph.index_of(source)?;

    // Several requested targets may share a graph node.
    let mut wanted: HashMap<NodeIndex, Vec<usize>> = HashMap::with_capacity(targets.len());
    for (pos, &id) in targets.iter().enumerate() {
        wanted.entry(graph.index_of(id)?).or_default().push(pos);
    }

    let mut results: Vec<Option<f64>> = vec![None; targets.len()];
    let mut dist = vec![f32::INFINITY; graph.num_nodes()];
    dist[src as usize] = 0.0;

    let mut heap = BinaryHeap::new();
    heap.push(State {
        cost: 0.0,
        node: src,
    });

    while let Some(State { cost, node }) = heap.pop() {
        if cost > dist[node as usize] {
            continue;
        }

        if let Some(positions) = wanted.remove(&node) {
            for pos in positions {
                results[pos] = Some(cost as f64);
            }
            if wanted.is_empty() {
                break;
            }
        }

        let (neighbor_targets, weights) = graph.neighbors(node);
        for (&t, &w) in neighbor_targets.iter().zip(weights) {
            let next = t as NodeIndex;
            let next_cost = cost + w;
            if next_cost < dist[next as usize] {
                dist[next as usize] = next_cost;
                heap.push(State {
                    cost: next_cost,
                    node: next,
                });
            }
        }
    }

    Ok(results)
}

/// Distance matrix between origin and destination node ids, one Dijkstra
/// per origin fanned out with rayon.
///
/// Callers snapping coordinates should warm the spatial index first so the
/// parallel queries never contend on the lazy build.
pub fn distance_matrix(
    graph: &CompactGraph,
    origins: &[OsmNodeId],
    destinations: &[OsmNodeId],
) -> Result<Vec<Vec<Option<f64>>>, Error> {
    origins
        .par_iter()
        .map(|&origin| one_to_many(graph, origin, destinations))
        .collect()
}
