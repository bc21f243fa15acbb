//! End-to-end routing scenarios over generated street grids.

use geo::Point;
use stray::geometry::haversine;
use stray::prelude::*;

/// Builds a `rows` x `cols` street grid. Rows run east-west as lettered
/// streets, columns north-south as numbered avenues; spacing is ~111 m in
/// both directions. Node id = `row * 100 + col`.
fn grid(rows: i64, cols: i64) -> GraphBuilder {
    let mut builder = GraphBuilder::new();
    for r in 0..rows {
        for c in 0..cols {
            builder.add_node(
                r * 100 + c,
                37.7700 + r as f32 * 0.001,
                -122.4100 + c as f32 * 0.001_27,
            );
        }
    }
    let street = |r: i64| format!("{} Street", (b'A' + r as u8) as char);
    for r in 0..rows {
        for c in 0..cols {
            if c + 1 < cols {
                builder.add_edge(r * 100 + c, r * 100 + c + 1, &street(r), "residential");
            }
            if r + 1 < rows {
                builder.add_edge(
                    r * 100 + c,
                    (r + 1) * 100 + c,
                    &format!("Avenue {}", c + 1),
                    "residential",
                );
            }
        }
    }
    builder
}

fn load(builder: GraphBuilder, with_metadata: bool) -> (tempfile::TempDir, CompactGraph) {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("walk_graph.bin");
    write_graph(&path, &builder.build(), with_metadata).unwrap();
    (dir, CompactGraph::load(&path).unwrap())
}

#[test]
fn single_named_street_yields_start_and_arrive() {
    let (_dir, graph) = load(grid(6, 6), true);

    // Four blocks east along C Street, well under 2 km.
    let route = novelty_route(&graph, 200, 204, &WalkedEdges::default(), 0.3, 0.25)
        .unwrap()
        .unwrap();
    let steps = route.instructions.unwrap();

    assert_eq!(steps.len(), 2);
    assert_eq!(steps[0].turn_direction, TurnDirection::Start);
    assert_eq!(steps[0].street_description, "C Street");
    assert_eq!(steps[1].turn_direction, TurnDirection::Arrive);
    assert_eq!(steps[1].distance, 0.0);
}

#[test]
fn right_angle_at_an_intersection_yields_three_steps() {
    let (_dir, graph) = load(grid(6, 6), true);

    // North along Avenue 1, then east along D Street.
    let path = vec![0, 100, 200, 300, 301, 302];
    let steps = generate_instructions(&graph, &path).unwrap().unwrap();

    assert_eq!(steps.len(), 3);
    let turn = &steps[1];
    assert!(
        turn.turn_direction == TurnDirection::Right || turn.turn_direction == TurnDirection::Left,
        "got {:?}",
        turn.turn_direction
    );
    assert!((45.0..=120.0).contains(&turn.turn_angle.abs()));
}

#[test]
fn walking_the_shortest_path_changes_the_next_route() {
    let (_dir, graph) = load(grid(6, 6), true);

    let (base_path, base_dist) = shortest_path(&graph, 0, 505).unwrap().unwrap();
    let walked: WalkedEdges = path_edges(&base_path).into_iter().collect();

    let route = novelty_route(&graph, 0, 505, &walked, 0.3, 0.25)
        .unwrap()
        .unwrap();

    // The grid offers equal-length alternatives, so the router must find a
    // mostly-novel route without blowing the budget.
    assert_ne!(route.path, base_path);
    assert!(route.novelty >= 0.3, "novelty {}", route.novelty);
    assert!(route.overhead <= 0.25 + 1e-9, "overhead {}", route.overhead);
    assert!(route.distance >= base_dist - 1.0);
}

#[test]
fn empty_history_reproduces_the_shortest_path_exactly() {
    let (_dir, graph) = load(grid(6, 6), true);

    let (base_path, base_dist) = shortest_path(&graph, 0, 505).unwrap().unwrap();
    let route = novelty_route(&graph, 0, 505, &WalkedEdges::default(), 0.3, 0.25)
        .unwrap()
        .unwrap();

    assert_eq!(route.path, base_path);
    assert!((route.distance - base_dist).abs() < 1e-9);
    assert_eq!(route.novelty, 1.0);
    assert_eq!(route.overhead, 0.0);
}

#[test]
fn generous_budget_triggers_via_waypoint_lengthening() {
    let (_dir, graph) = load(grid(6, 6), true);

    // History on a far-away block: the baseline is fully novel, so the
    // penalty phases leave it untouched and only the via-waypoint phase can
    // spend the budget.
    let mut walked = WalkedEdges::default();
    walked.insert(EdgeKey::new(500, 501));

    let (_, base_dist) = shortest_path(&graph, 200, 205).unwrap().unwrap();
    let route = novelty_route(&graph, 200, 205, &walked, 0.3, 0.5)
        .unwrap()
        .unwrap();

    assert!(route.distance >= base_dist);
    assert!(route.distance <= 1.5 * base_dist + 1.0);
    // The lengthening fired: the walk is measurably longer than the
    // baseline while staying inside the budget.
    assert!(route.overhead > 0.05, "overhead {}", route.overhead);
    assert!(route.overhead <= 0.5 + 1e-9);
}

#[test]
fn v1_graphs_produce_routes_without_instructions() {
    let (_dir, graph) = load(grid(4, 4), false);

    let route = novelty_route(&graph, 0, 303, &WalkedEdges::default(), 0.3, 0.25)
        .unwrap()
        .unwrap();
    assert!(route.instructions.is_none());
    assert!(generate_instructions(&graph, &route.path).unwrap().is_none());
}

#[test]
fn snapping_is_stable_and_minimizes_haversine() {
    let (_dir, graph) = load(grid(6, 6), true);

    let probe = Point::new(-122.4093, 37.7716);
    let (idx, dist) = graph.find_nearest_node(probe);

    // Brute force over every node must agree.
    let mut best = (0u32, f64::INFINITY);
    for i in 0..graph.num_nodes() as u32 {
        let (lat, lon) = graph.node_coords(i);
        let d = haversine(probe.y(), probe.x(), lat, lon);
        if d < best.1 {
            best = (i, d);
        }
    }
    assert_eq!(idx, best.0);
    assert!((dist - best.1).abs() < 1e-9);

    // And repeated snaps return the identical answer.
    for _ in 0..3 {
        assert_eq!(graph.find_nearest_node(probe), (idx, dist));
    }
}

#[test]
fn warmed_graph_serves_parallel_queries() {
    let (_dir, graph) = load(grid(6, 6), true);
    graph.warm_spatial_index();

    let reference = shortest_path(&graph, 0, 505).unwrap().unwrap();
    std::thread::scope(|scope| {
        for _ in 0..4 {
            scope.spawn(|| {
                let got = shortest_path(&graph, 0, 505).unwrap().unwrap();
                assert_eq!(got, reference);

                let (idx, _) = graph.find_nearest_node(Point::new(-122.4060, 37.7730));
                assert!(idx < graph.num_nodes() as u32);
            });
        }
    });
}

#[test]
fn distance_matrix_agrees_with_single_queries() {
    let (_dir, graph) = load(grid(5, 5), true);
    graph.warm_spatial_index();

    let ids = [0i64, 204, 402, 404];
    let matrix = distance_matrix(&graph, &ids, &ids).unwrap();

    for (i, &from) in ids.iter().enumerate() {
        for (j, &to) in ids.iter().enumerate() {
            let (_, expected) = shortest_path(&graph, from, to).unwrap().unwrap();
            let got = matrix[i][j].unwrap();
            assert!(
                (got - expected).abs() < 0.01,
                "{from}->{to}: {got} vs {expected}"
            );
        }
    }
}

#[test]
fn instruction_distances_sum_to_route_distance() {
    let (_dir, graph) = load(grid(6, 6), true);

    let route = novelty_route(&graph, 0, 505, &WalkedEdges::default(), 0.3, 0.25)
        .unwrap()
        .unwrap();
    let steps = route.instructions.unwrap();

    let total: f64 = steps.iter().map(|s| s.distance).sum();
    assert!((total - route.distance).abs() < 1.0);
    assert_eq!(steps.last().unwrap().turn_direction, TurnDirection::Arrive);
}
