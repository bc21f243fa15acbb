//! GeoJSON rendering of route results.

use geo::{LineString, Point};
use geojson::{Feature, FeatureCollection, Geometry};
use serde_json::json;

use crate::routing::RouteResult;
use crate::{CompactGraph, Error};

impl RouteResult {
    /// Renders the route as a `FeatureCollection`: one LineString feature
    /// carrying the route statistics, plus one Point feature per navigation
    /// step when instructions are present.
    ///
    /// # Panics
    /// Panics if the assembled JSON is not a valid GeoJSON feature, which
    /// cannot happen for paths that resolve against the graph.
    pub fn to_geojson(&self, graph: &CompactGraph) -> Result<FeatureCollection, Error> {
        let mut coords = Vec::with_capacity(self.path.len());
        for &id in &self.path {
            let (lat, lon) = graph.node_coords(graph.index_of(id)?);
            coords.push((lon, lat));
        }
        let line: LineString<f64> = coords.into();

        let value = json!({
            "type": "Feature",
            "geometry": Geometry::new((&line).into()),
            "properties": {
                "distance": self.distance,
                "shortest_distance": self.shortest_distance,
                "novelty": self.novelty,
                "overhead": self.overhead,
            }
        });
        let mut features = vec![Feature::from_json_value(value).unwrap()];

        if let Some(steps) = &self.instructions {
            for (index, step) in steps.iter().enumerate() {
                let point = Point::new(step.start_lon, step.start_lat);
                let value = json!({
                    "type": "Feature",
                    "geometry": Geometry::new((&point).into()),
                    "properties": {
                        "step_index": index,
                        "instruction": step.instruction,
                        "street_description": step.street_description,
                        "distance": step.distance,
                        "turn_direction": step.turn_direction,
                        "turn_angle": step.turn_angle,
                    }
                });
                features.push(Feature::from_json_value(value).unwrap());
            }
        }

        Ok(FeatureCollection {
            features,
            bbox: None,
            foreign_members: None,
        })
    }

    /// The `FeatureCollection` serialized to a JSON string.
    pub fn to_geojson_string(&self, graph: &CompactGraph) -> Result<String, Error> {
        Ok(serde_json::to_string(&self.to_geojson(graph)?).unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use crate::loading::{write_graph, GraphBuilder};
    use crate::routing::novelty_route;
    use crate::{CompactGraph, WalkedEdges};

    fn street_graph() -> (tempfile::TempDir, CompactGraph) {
        let mut builder = GraphBuilder::new();
        builder.add_node(1, 37.7700, -122.4100);
        builder.add_node(2, 37.7710, -122.4100);
        builder.add_node(3, 37.7720, -122.4100);
        builder.add_edge(1, 2, "Church Street", "residential");
        builder.add_edge(2, 3, "Church Street", "residential");

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("graph.bin");
        write_graph(&path, &builder.build(), true).unwrap();
        (dir, CompactGraph::load(&path).unwrap())
    }

    #[test]
    fn route_renders_line_and_step_points() {
        let (_dir, graph) = street_graph();
        let result = novelty_route(&graph, 1, 3, &WalkedEdges::default(), 0.3, 0.25)
            .unwrap()
            .unwrap();

        let collection = result.to_geojson(&graph).unwrap();
        let steps = result.instructions.as_ref().unwrap().len();
        assert_eq!(collection.features.len(), 1 + steps);

        let route = &collection.features[0];
        let props = route.properties.as_ref().unwrap();
        assert!(props.contains_key("novelty"));
        assert!(props.contains_key("overhead"));

        let text = result.to_geojson_string(&graph).unwrap();
        assert!(text.contains("\"FeatureCollection\""));
        assert!(text.contains("Arrive at destination"));
    }
}
