//! Turn-by-turn instruction synthesis.
//!
//! Consecutive edges sharing an effective street name collapse into one
//! step; turns are classified from the change in bearing between groups.

use serde::Serialize;

use crate::geometry::{bearing, compass_direction, haversine, normalize_turn_angle};
use crate::{CompactGraph, Error, NodeIndex, OsmNodeId};

/// Classified maneuver of a navigation step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TurnDirection {
    Start,
    Straight,
    SlightLeft,
    SlightRight,
    Left,
    Right,
    SharpLeft,
    SharpRight,
    UTurn,
    Arrive,
}

/// One human-readable step of a route.
#[derive(Debug, Clone, Serialize)]
pub struct NavigationStep {
    /// Rendered instruction, e.g. `"Turn left onto Market Street"`.
    pub instruction: String,
    /// Raw street name, when the underlying way is named.
    pub street_name: Option<String>,
    /// Street name or highway-class fallback used in the instruction.
    pub street_description: String,
    /// Length of the step in meters; 0 for the arrive step.
    pub distance: f64,
    pub turn_direction: TurnDirection,
    /// Signed turn angle in degrees; negative turns left.
    pub turn_angle: f64,
    pub start_lat: f64,
    pub start_lon: f64,
}

/// Spoken description of a highway class when the way has no name.
fn highway_description(highway: &str) -> &'static str {
    match highway {
        "footway" => "footpath",
        "path" => "path",
        "pedestrian" => "pedestrian way",
        "steps" => "steps",
        "cycleway" => "cycleway",
        "service" => "service road",
        "track" => "track",
        _ => "road",
    }
}

fn classify_turn(angle: f64) -> TurnDirection {
    let left = angle < 0.0;
    match angle.abs() {
        a if a < 15.0 => TurnDirection::Straight,
        a if a < 45.0 => {
            if left {
                TurnDirection::SlightLeft
            } else {
                TurnDirection::SlightRight
            }
        }
        a if a < 120.0 => {
            if left {
                TurnDirection::Left
            } else {
                TurnDirection::Right
            }
        }
        a if a < 160.0 => {
            if left {
                TurnDirection::SharpLeft
            } else {
                TurnDirection::SharpRight
            }
        }
        _ => TurnDirection::UTurn,
    }
}

fn turn_prefix(direction: TurnDirection) -> &'static str {
    match direction {
        TurnDirection::Start => "Head",
        TurnDirection::Straight => "Continue",
        TurnDirection::SlightLeft => "Turn slight left",
        TurnDirection::SlightRight => "Turn slight right",
        TurnDirection::Left => "Turn left",
        TurnDirection::Right => "Turn right",
        TurnDirection::SharpLeft => "Turn sharp left",
        TurnDirection::SharpRight => "Turn sharp right",
        TurnDirection::UTurn => "Make a U-turn",
        TurnDirection::Arrive => "Arrive",
    }
}

struct DecoratedEdge {
    bearing: f64,
    distance: f64,
    name: Option<String>,
    effective_name: String,
    start_idx: usize,
}

struct StepGroup {
    effective_name: String,
    street_name: Option<String>,
    total_distance: f64,
    entry_bearing: f64,
    exit_bearing: f64,
    start_idx: usize,
}

/// Generates grouped turn-by-turn steps for a path of external node ids.
///
/// Absent when the graph has no street metadata (v1) or the path is shorter
/// than two nodes. Unknown ids in the path are an error.
pub fn generate_instructions(
    graph: &CompactGraph,
    path: &[OsmNodeId],
) -> Result<Option<Vec<NavigationStep>>, Error> {
    if !graph.has_street_metadata() || path.len() < 2 {
        return Ok(None);
    }

    let indices: Vec<NodeIndex> = path
        .iter()
        .map(|&id| graph.index_of(id))
        .collect::<Result<_, _>>()?;

    let edges = decorate_edges(graph, &indices);
    let groups = group_edges(edges);

    let mut steps = Vec::with_capacity(groups.len() + 1);
    for (i, group) in groups.iter().enumerate() {
        let (lat, lon) = graph.node_coords(indices[group.start_idx]);

        let (instruction, turn_direction, turn_angle) = if i == 0 {
            let compass = compass_direction(group.entry_bearing);
            (
                format!("Head {compass} on {}", group.effective_name),
                TurnDirection::Start,
                0.0,
            )
        } else {
            let angle = normalize_turn_angle(group.entry_bearing - groups[i - 1].exit_bearing);
            let direction = classify_turn(angle);
            let prefix = turn_prefix(direction);
            let instruction = if direction == TurnDirection::Straight {
                format!("{prefix} on {}", group.effective_name)
            } else {
                format!("{prefix} onto {}", group.effective_name)
            };
            (instruction, direction, angle)
        };

        steps.push(NavigationStep {
            instruction,
            street_name: group.street_name.clone(),
            street_description: group.effective_name.clone(),
            distance: group.total_distance,
            turn_direction,
            turn_angle,
            start_lat: lat,
            start_lon: lon,
        });
    }

    let (last_lat, last_lon) = graph.node_coords(*indices.last().unwrap());
    steps.push(NavigationStep {
        instruction: "Arrive at destination".to_owned(),
        street_name: None,
        street_description: String::new(),
        distance: 0.0,
        turn_direction: TurnDirection::Arrive,
        turn_angle: 0.0,
        start_lat: last_lat,
        start_lon: last_lon,
    });

    Ok(Some(steps))
}

fn decorate_edges(graph: &CompactGraph, indices: &[NodeIndex]) -> Vec<DecoratedEdge> {
    let mut edges = Vec::with_capacity(indices.len() - 1);
    let mut previous_bearing = 0.0;

    for (i, pair) in indices.windows(2).enumerate() {
        let (u, v) = (pair[0], pair[1]);
        let (lat1, lon1) = graph.node_coords(u);
        let (lat2, lon2) = graph.node_coords(v);

        let distance = haversine(lat1, lon1, lat2, lon2);
        // A zero-length edge has no direction of its own; carry the
        // previous heading so grouping stays stable.
        let edge_bearing = if distance > 0.0 {
            bearing(lat1, lon1, lat2, lon2)
        } else {
            previous_bearing
        };
        previous_bearing = edge_bearing;

        let name = graph.edge_name(u, v).map(str::to_owned);
        let effective_name = match (&name, graph.edge_highway(u, v)) {
            (Some(name), _) => name.clone(),
            (None, Some(highway)) => highway_description(highway).to_owned(),
            (None, None) => "road".to_owned(),
        };

        edges.push(DecoratedEdge {
            bearing: edge_bearing,
            distance,
            name,
            effective_name,
            start_idx: i,
        });
    }
    edges
}

fn group_edges(edges: Vec<DecoratedEdge>) -> Vec<StepGroup> {
    let mut groups: Vec<StepGroup> = Vec::new();
    for edge in edges {
        match groups.last_mut() {
            Some(group) if group.effective_name == edge.effective_name => {
                group.total_distance += edge.distance;
                group.exit_bearing = edge.bearing;
            }
            _ => groups.push(StepGroup {
                effective_name: edge.effective_name,
                street_name: edge.name,
                total_distance: edge.distance,
                entry_bearing: edge.bearing,
                exit_bearing: edge.bearing,
                start_idx: edge.start_idx,
            }),
        }
    }
    groups
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loading::{write_graph, GraphBuilder};

    fn load_built(builder: GraphBuilder, with_metadata: bool) -> (tempfile::TempDir, CompactGraph) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("graph.bin");
        write_graph(&path, &builder.build(), with_metadata).unwrap();
        (dir, CompactGraph::load(&path).unwrap())
    }

    /// A named street running straight north, then a named street east.
    fn corner_builder() -> GraphBuilder {
        let mut builder = GraphBuilder::new();
        builder.add_node(1, 37.7700, -122.4100);
        builder.add_node(2, 37.7710, -122.4100);
        builder.add_node(3, 37.7720, -122.4100);
        builder.add_node(4, 37.7720, -122.4080);
        builder.add_edge(1, 2, "Sanchez Street", "residential");
        builder.add_edge(2, 3, "Sanchez Street", "residential");
        builder.add_edge(3, 4, "Duboce Avenue", "residential");
        builder
    }

    #[test]
    fn single_street_is_start_plus_arrive() {
        let (_dir, graph) = load_built(corner_builder(), true);
        let steps = generate_instructions(&graph, &[1, 2, 3]).unwrap().unwrap();

        assert_eq!(steps.len(), 2);
        assert_eq!(steps[0].turn_direction, TurnDirection::Start);
        assert_eq!(steps[0].instruction, "Head north on Sanchez Street");
        assert_eq!(steps[0].street_name.as_deref(), Some("Sanchez Street"));
        assert_eq!(steps[1].turn_direction, TurnDirection::Arrive);
        assert_eq!(steps[1].instruction, "Arrive at destination");
        assert_eq!(steps[1].distance, 0.0);
    }

    #[test]
    fn right_angle_turn_is_classified() {
        let (_dir, graph) = load_built(corner_builder(), true);
        let steps = generate_instructions(&graph, &[1, 2, 3, 4]).unwrap().unwrap();

        assert_eq!(steps.len(), 3);
        assert_eq!(steps[1].turn_direction, TurnDirection::Right);
        assert!(steps[1].instruction.starts_with("Turn right onto Duboce"));
        assert!((45.0..120.0).contains(&steps[1].turn_angle.abs()));
    }

    #[test]
    fn step_distances_sum_to_path_length() {
        let (_dir, graph) = load_built(corner_builder(), true);
        let steps = generate_instructions(&graph, &[1, 2, 3, 4]).unwrap().unwrap();

        let total: f64 = steps.iter().map(|s| s.distance).sum();
        let mut expected = 0.0;
        for pair in [[1i64, 2], [2, 3], [3, 4]] {
            let u = graph.index_of(pair[0]).unwrap();
            let v = graph.index_of(pair[1]).unwrap();
            let (lat1, lon1) = graph.node_coords(u);
            let (lat2, lon2) = graph.node_coords(v);
            expected += haversine(lat1, lon1, lat2, lon2);
        }
        assert!((total - expected).abs() < 1.0);
    }

    #[test]
    fn unnamed_ways_fall_back_to_highway_description() {
        let mut builder = GraphBuilder::new();
        builder.add_node(1, 37.7700, -122.4100);
        builder.add_node(2, 37.7710, -122.4100);
        builder.add_node(3, 37.7710, -122.4090);
        builder.add_edge(1, 2, "", "steps");
        builder.add_edge(2, 3, "", "tertiary_link");
        let (_dir, graph) = load_built(builder, true);

        let steps = generate_instructions(&graph, &[1, 2, 3]).unwrap().unwrap();
        assert_eq!(steps[0].street_description, "steps");
        assert_eq!(steps[0].street_name, None);
        assert_eq!(steps[1].street_description, "road");
    }

    #[test]
    fn absent_for_v1_graphs_and_short_paths() {
        let (_dir, graph) = load_built(corner_builder(), false);
        assert!(generate_instructions(&graph, &[1, 2, 3]).unwrap().is_none());

        let (_dir2, v2) = load_built(corner_builder(), true);
        assert!(generate_instructions(&v2, &[1]).unwrap().is_none());
        assert!(generate_instructions(&v2, &[]).unwrap().is_none());
    }

    #[test]
    fn turn_classification_boundaries() {
        assert_eq!(classify_turn(0.0), TurnDirection::Straight);
        assert_eq!(classify_turn(14.9), TurnDirection::Straight);
        assert_eq!(classify_turn(-20.0), TurnDirection::SlightLeft);
        assert_eq!(classify_turn(44.9), TurnDirection::SlightRight);
        assert_eq!(classify_turn(-90.0), TurnDirection::Left);
        assert_eq!(classify_turn(119.9), TurnDirection::Right);
        assert_eq!(classify_turn(-140.0), TurnDirection::SharpLeft);
        assert_eq!(classify_turn(159.9), TurnDirection::SharpRight);
        assert_eq!(classify_turn(170.0), TurnDirection::UTurn);
        assert_eq!(classify_turn(-179.0), TurnDirection::UTurn);
    }

    #[test]
    fn serializes_turn_direction_snake_case() {
        let json = serde_json::to_string(&TurnDirection::SlightLeft).unwrap();
        assert_eq!(json, "\"slight_left\"");
        let json = serde_json::to_string(&TurnDirection::UTurn).unwrap();
        assert_eq!(json, "\"u_turn\"");
    }
}
