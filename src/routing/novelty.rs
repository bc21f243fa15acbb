//! Novelty-seeking route search.
//!
//! The driver works in phases: a shortest-path baseline, an exponential
//! sweep to bracket a penalty factor at which enough unwalked edges appear,
//! a binary search over the factor balancing novelty against the distance
//! budget, a fixed fallback ladder, and finally a geometric via-waypoint
//! detour when the budget would otherwise go unused. The thresholds below
//! are tuned empirically and interact; change them together or not at all.

use geo::Point;
use log::debug;

use crate::geometry::METERS_PER_DEGREE;
use crate::routing::astar::{penalized_path, plain_path, shortest_path};
use crate::routing::result::{build_result, compute_novelty, path_edges, RouteResult};
use crate::{CompactGraph, Error, NodeIndex, OsmNodeId, WalkedEdges};

/// A short-circuit on the baseline only applies below this overhead budget;
/// a larger budget signals the user wants a longer walk.
const SHORT_CIRCUIT_MAX_OVERHEAD: f64 = 0.30;

/// Penalty sweep bounds and the bisection depth.
const EXPANSION_ROUNDS: usize = 5;
const EXPANSION_CEILING: f64 = 100.0;
const BISECTION_ROUNDS: usize = 10;

/// Fallback penalty ladder when the bisection never satisfies novelty.
const FALLBACK_PENALTIES: [f64; 5] = [1.5, 2.0, 3.0, 5.0, 8.0];

/// Via-waypoint lengthening fires while the best route uses less than this
/// share of the allowed total distance.
const VIA_TRIGGER: f64 = 0.85;
const VIA_OFFSET_SCALES: [f64; 11] = [0.1, 0.2, 0.3, 0.4, 0.5, 0.6, 0.7, 0.8, 0.9, 1.0, 1.15];

#[derive(Debug, Clone)]
struct Candidate {
    path: Vec<OsmNodeId>,
    distance: f64,
    novelty: f64,
    overhead: f64,
}

impl Candidate {
    fn evaluate(
        path: Vec<OsmNodeId>,
        distance: f64,
        shortest_distance: f64,
        walked: &WalkedEdges,
    ) -> Self {
        let novelty = compute_novelty(&path_edges(&path), walked);
        let overhead = if shortest_distance > 0.0 {
            (distance - shortest_distance) / shortest_distance
        } else {
            0.0
        };
        Self {
            path,
            distance,
            novelty,
            overhead,
        }
    }
}

/// Whether `cand` beats the running best under the dominance rule:
/// over-budget candidates never win; meeting the novelty threshold beats
/// not meeting it; among routes meeting both constraints the longer detour
/// wins (use the budget); otherwise higher novelty wins.
fn improves(best: &Candidate, cand: &Candidate, min_novelty: f64, max_overhead: f64) -> bool {
    if cand.overhead > max_overhead {
        return false;
    }
    match (cand.novelty >= min_novelty, best.novelty >= min_novelty) {
        (true, false) => true,
        (false, true) => false,
        (true, true) => cand.overhead > best.overhead,
        (false, false) => cand.novelty > best.novelty,
    }
}

/// Finds a route from `source` to `target` that favors edges absent from
/// `walked`, lengthening the shortest path by at most `max_overhead`.
///
/// With an empty history the shortest path is returned unchanged. `None`
/// means the endpoints are not connected at all.
pub fn novelty_route(
    graph: &CompactGraph,
    source: OsmNodeId,
    target: OsmNodeId,
    walked: &WalkedEdges,
    min_novelty: f64,
    max_overhead: f64,
) -> Result<Option<RouteResult>, Error> {
    let Some((base_path, base_dist)) = shortest_path(graph, source, target)? else {
        return Ok(None);
    };
    let baseline = Candidate::evaluate(base_path, base_dist, base_dist, walked);

    // A baseline that is already novel enough wins outright, unless the
    // budget is generous; then the later phases should spend it.
    if baseline.novelty >= min_novelty && max_overhead < SHORT_CIRCUIT_MAX_OVERHEAD {
        return finish(graph, baseline, base_dist, walked);
    }
    // Penalties cannot change anything without history.
    if walked.is_empty() {
        return finish(graph, baseline, base_dist, walked);
    }

    let src = graph.index_of(source)?;
    let tgt = graph.index_of(target)?;
    let mut best = baseline;

    // Bracket a penalty at which the novelty threshold is satisfiable.
    let lo_penalty = 1.0_f64;
    let mut hi_penalty = 10.0_f64;
    for _ in 0..EXPANSION_ROUNDS {
        let Some((path, dist)) = penalized_path(graph, src, tgt, walked, hi_penalty) else {
            break;
        };
        let cand = Candidate::evaluate(path, dist, base_dist, walked);
        if cand.novelty >= min_novelty {
            break;
        }
        hi_penalty *= 2.0;
        if hi_penalty > EXPANSION_CEILING {
            break;
        }
    }

    // Bisect the factor, keeping the dominant candidate seen along the way.
    let mut lo = lo_penalty;
    let mut hi = hi_penalty;
    for _ in 0..BISECTION_ROUNDS {
        let mid = (lo + hi) / 2.0;
        let Some((path, dist)) = penalized_path(graph, src, tgt, walked, mid) else {
            hi = mid;
            continue;
        };
        let cand = Candidate::evaluate(path, dist, base_dist, walked);
        let (novelty, overhead) = (cand.novelty, cand.overhead);
        if improves(&best, &cand, min_novelty, max_overhead) {
            best = cand;
        }

        if novelty < min_novelty {
            lo = mid;
        } else if overhead > max_overhead {
            hi = mid;
        } else {
            // Both constraints hold; push further in search of more diversion.
            lo = mid;
        }
    }

    if best.novelty < min_novelty {
        for penalty in FALLBACK_PENALTIES {
            let Some((path, dist)) = penalized_path(graph, src, tgt, walked, penalty) else {
                continue;
            };
            let cand = Candidate::evaluate(path, dist, base_dist, walked);
            if improves(&best, &cand, min_novelty, max_overhead) {
                best = cand;
            }
        }
    }

    if best.distance < VIA_TRIGGER * base_dist * (1.0 + max_overhead) {
        lengthen_via_waypoint(
            graph,
            src,
            tgt,
            base_dist,
            max_overhead,
            walked,
            &mut best,
        );
    }

    finish(graph, best, base_dist, walked)
}

fn finish(
    graph: &CompactGraph,
    candidate: Candidate,
    shortest_distance: f64,
    walked: &WalkedEdges,
) -> Result<Option<RouteResult>, Error> {
    build_result(
        graph,
        candidate.path,
        candidate.distance,
        shortest_distance,
        walked,
    )
    .map(Some)
}

/// Tries to spend the remaining budget by routing through a waypoint offset
/// perpendicular to the source-target line. The ideal offset comes from
/// triangle geometry: a detour through a point at height `h` above the
/// midpoint is about `sqrt(d0^2 + 4h^2)` long.
fn lengthen_via_waypoint(
    graph: &CompactGraph,
    src: NodeIndex,
    tgt: NodeIndex,
    base_dist: f64,
    max_overhead: f64,
    walked: &WalkedEdges,
    best: &mut Candidate,
) {
    let source_id = graph.node_id(src);
    let target_id = graph.node_id(tgt);
    let (src_lat, src_lon) = graph.node_coords(src);
    let (tgt_lat, tgt_lon) = graph.node_coords(tgt);

    let mid_lat = (src_lat + tgt_lat) / 2.0;
    let mid_lon = (src_lon + tgt_lon) / 2.0;
    let cos_mid = mid_lat.to_radians().cos();

    // Perpendicular unit vector in the equirectangular plane.
    let dx = tgt_lat - src_lat;
    let dy = (tgt_lon - src_lon) * cos_mid;
    let norm = (dx * dx + dy * dy).sqrt();
    if norm == 0.0 {
        return;
    }
    let (perp_lat, perp_lon) = (-dy / norm, dx / norm);

    let target_total = base_dist * (1.0 + max_overhead);
    let h_ideal = if target_total > base_dist {
        (target_total * target_total - base_dist * base_dist).sqrt() / 2.0
    } else {
        0.3 * base_dist
    };

    for scale in VIA_OFFSET_SCALES {
        for sign in [1.0, -1.0] {
            let offset = h_ideal * scale * sign;
            let wp_lat = mid_lat + perp_lat * offset / METERS_PER_DEGREE;
            let wp_lon = mid_lon + perp_lon * offset / (METERS_PER_DEGREE * cos_mid);

            let (wp, _snap) = graph.find_nearest_node(Point::new(wp_lon, wp_lat));
            let wp_id = graph.node_id(wp);
            if wp_id == source_id || wp_id == target_id {
                continue;
            }

            let Some((mut path, out_dist)) = plain_path(graph, src, wp) else {
                continue;
            };
            let Some((back, back_dist)) = plain_path(graph, wp, tgt) else {
                continue;
            };

            let distance = out_dist + back_dist;
            let overhead = if base_dist > 0.0 {
                (distance - base_dist) / base_dist
            } else {
                0.0
            };
            if overhead <= max_overhead && overhead > best.overhead {
                debug!(
                    "via-waypoint {wp_id} (scale {scale}, sign {sign}): \
                     overhead {overhead:.3} over {} m",
                    base_dist as i64
                );
                path.extend_from_slice(&back[1..]);
                *best = Candidate::evaluate(path, distance, base_dist, walked);
            }
        }
    }
}
