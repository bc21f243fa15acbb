//! In-memory assembly of an undirected street network into CSR arrays.

use hashbrown::HashMap;

use crate::geometry::haversine;
use crate::routing::EdgeKey;

#[derive(Debug, Clone)]
struct EdgeAttrs {
    weight: f32,
    name: String,
    highway: String,
}

/// Builds a walkable street graph from nodes and undirected edges, then
/// materializes the CSR arrays the binary container stores.
///
/// Nodes are ordered by external id for deterministic indexing; every
/// undirected edge is stored once per direction with identical weight and
/// metadata, and each node's neighbor list is sorted by target index.
#[derive(Debug, Default)]
pub struct GraphBuilder {
    nodes: HashMap<i64, (f32, f32)>,
    edges: HashMap<EdgeKey, EdgeAttrs>,
}

impl GraphBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a node. Re-adding an id overwrites its coordinates.
    pub fn add_node(&mut self, id: i64, lat: f32, lon: f32) {
        self.nodes.insert(id, (lat, lon));
    }

    /// Registers an undirected edge between two previously added nodes; the
    /// weight is the haversine distance between them. Edges referencing
    /// unknown nodes are skipped. For parallel ways the shorter segment wins.
    pub fn add_edge(&mut self, a: i64, b: i64, name: &str, highway: &str) {
        let (Some(&(lat1, lon1)), Some(&(lat2, lon2))) = (self.nodes.get(&a), self.nodes.get(&b))
        else {
            return;
        };
        let weight = haversine(lat1 as f64, lon1 as f64, lat2 as f64, lon2 as f64) as f32;

        let attrs = EdgeAttrs {
            weight,
            name: name.to_owned(),
            highway: highway.to_owned(),
        };
        match self.edges.entry(EdgeKey::new(a, b)) {
            hashbrown::hash_map::Entry::Vacant(entry) => {
                entry.insert(attrs);
            }
            hashbrown::hash_map::Entry::Occupied(mut entry) => {
                if weight < entry.get().weight {
                    entry.insert(attrs);
                }
            }
        }
    }

    pub fn num_nodes(&self) -> usize {
        self.nodes.len()
    }

    pub fn num_edges(&self) -> usize {
        self.edges.len()
    }

    /// Converts the accumulated network into CSR arrays.
    pub fn build(self) -> GraphData {
        let mut sorted_nodes: Vec<(i64, f32, f32)> = self
            .nodes
            .iter()
            .map(|(&id, &(lat, lon))| (id, lat, lon))
            .collect();
        sorted_nodes.sort_unstable_by_key(|&(id, _, _)| id);

        let num_nodes = sorted_nodes.len();
        let node_ids: Vec<i64> = sorted_nodes.iter().map(|n| n.0).collect();
        let node_lats: Vec<f32> = sorted_nodes.iter().map(|n| n.1).collect();
        let node_lons: Vec<f32> = sorted_nodes.iter().map(|n| n.2).collect();

        let osm_to_idx: HashMap<i64, usize> = node_ids
            .iter()
            .enumerate()
            .map(|(i, &id)| (id, i))
            .collect();

        // String tables keep "" at index 0 and sort the rest for determinism.
        let name_table = intern_table(self.edges.values().map(|e| e.name.as_str()));
        let highway_table = intern_table(self.edges.values().map(|e| e.highway.as_str()));
        let name_to_idx: HashMap<&str, usize> = name_table
            .iter()
            .enumerate()
            .map(|(i, s)| (s.as_str(), i))
            .collect();
        let highway_to_idx: HashMap<&str, usize> = highway_table
            .iter()
            .enumerate()
            .map(|(i, s)| (s.as_str(), i))
            .collect();

        // Each undirected edge contributes one directed slot per endpoint.
        let mut degrees = vec![0i32; num_nodes];
        for key in self.edges.keys() {
            degrees[osm_to_idx[&key.start]] += 1;
            degrees[osm_to_idx[&key.end]] += 1;
        }

        let mut adj_offsets = vec![0i32; num_nodes + 1];
        for i in 0..num_nodes {
            adj_offsets[i + 1] = adj_offsets[i] + degrees[i];
        }
        let num_directed = adj_offsets[num_nodes] as usize;

        let mut adj_targets = vec![0i32; num_directed];
        let mut adj_weights = vec![0f32; num_directed];
        let mut edge_name_indices = vec![0u16; num_directed];
        let mut edge_highway_indices = vec![0u8; num_directed];

        let mut cursor: Vec<usize> = adj_offsets[..num_nodes]
            .iter()
            .map(|&o| o as usize)
            .collect();
        for (key, attrs) in &self.edges {
            let u = osm_to_idx[&key.start];
            let v = osm_to_idx[&key.end];
            let ni = name_to_idx[attrs.name.as_str()] as u16;
            let hi = highway_to_idx[attrs.highway.as_str()] as u8;

            for (from, to) in [(u, v), (v, u)] {
                let slot = cursor[from];
                adj_targets[slot] = to as i32;
                adj_weights[slot] = attrs.weight;
                edge_name_indices[slot] = ni;
                edge_highway_indices[slot] = hi;
                cursor[from] += 1;
            }
        }
        drop(name_to_idx);
        drop(highway_to_idx);

        // Sort each neighbor list by target index for deterministic scans.
        for u in 0..num_nodes {
            let start = adj_offsets[u] as usize;
            let end = adj_offsets[u + 1] as usize;
            let mut order: Vec<usize> = (start..end).collect();
            order.sort_unstable_by_key(|&j| adj_targets[j]);

            let targets: Vec<i32> = order.iter().map(|&j| adj_targets[j]).collect();
            let weights: Vec<f32> = order.iter().map(|&j| adj_weights[j]).collect();
            let names: Vec<u16> = order.iter().map(|&j| edge_name_indices[j]).collect();
            let highways: Vec<u8> = order.iter().map(|&j| edge_highway_indices[j]).collect();
            adj_targets[start..end].copy_from_slice(&targets);
            adj_weights[start..end].copy_from_slice(&weights);
            edge_name_indices[start..end].copy_from_slice(&names);
            edge_highway_indices[start..end].copy_from_slice(&highways);
        }

        GraphData {
            node_ids,
            node_lats,
            node_lons,
            adj_offsets,
            adj_targets,
            adj_weights,
            edge_name_indices,
            edge_highway_indices,
            name_table,
            highway_table,
        }
    }
}

fn intern_table<'a>(values: impl Iterator<Item = &'a str>) -> Vec<String> {
    let mut distinct: Vec<&str> = values.filter(|s| !s.is_empty()).collect();
    distinct.sort_unstable();
    distinct.dedup();

    let mut table = Vec::with_capacity(distinct.len() + 1);
    table.push(String::new());
    table.extend(distinct.into_iter().map(str::to_owned));
    table
}

/// Flat CSR arrays ready for binary export.
#[derive(Debug, Clone)]
pub struct GraphData {
    pub node_ids: Vec<i64>,
    pub node_lats: Vec<f32>,
    pub node_lons: Vec<f32>,
    pub adj_offsets: Vec<i32>,
    pub adj_targets: Vec<i32>,
    pub adj_weights: Vec<f32>,
    pub edge_name_indices: Vec<u16>,
    pub edge_highway_indices: Vec<u8>,
    pub name_table: Vec<String>,
    pub highway_table: Vec<String>,
}

impl GraphData {
    pub fn num_nodes(&self) -> usize {
        self.node_ids.len()
    }

    pub fn num_directed_edges(&self) -> usize {
        self.adj_targets.len()
    }
}
