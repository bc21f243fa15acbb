//! Memory-mapped CSR street graph.

use std::fs::File;
use std::path::{Path, PathBuf};
use std::slice;
use std::sync::OnceLock;

use geo::Point;
use hashbrown::HashMap;
use log::{debug, warn};
use memmap2::Mmap;

use crate::geometry::haversine;
use crate::model::format::{self, Header, HEADER_LEN, VERSION_V2};
use crate::spatial::{load_cache, save_cache, SpatialIndex};
use crate::{Error, NodeIndex, OsmNodeId};

/// How many projected candidates the nearest-node snap rescores with exact
/// haversine. The projection is approximate, so the projected-Euclidean
/// nearest is not always the great-circle nearest.
const SNAP_CANDIDATES: usize = 10;

/// Byte offsets of the fixed-size sections within the mapping.
#[derive(Debug, Clone, Copy)]
struct Sections {
    node_ids: usize,
    node_lats: usize,
    node_lons: usize,
    adj_offsets: usize,
    adj_targets: usize,
    adj_weights: usize,
    edge_name_indices: usize,
    edge_highway_indices: usize,
}

/// A read-only street network backed by a memory-mapped graph file.
///
/// The file stays mapped for the lifetime of the graph; all array accessors
/// are zero-copy views into it. The spatial index for nearest-node snapping
/// is built lazily on first use behind a one-shot latch, so a fully warmed
/// graph can serve queries from many threads at once.
pub struct CompactGraph {
    mmap: Mmap,
    path: PathBuf,
    file_len: u64,
    version: u32,
    num_nodes: usize,
    num_directed_edges: usize,
    sections: Sections,
    name_table: Vec<String>,
    highway_table: Vec<String>,
    id_index: HashMap<OsmNodeId, NodeIndex>,
    spatial: OnceLock<SpatialIndex>,
}

impl CompactGraph {
    /// Maps and validates a graph file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, Error> {
        let path = path.as_ref().to_path_buf();
        let file = File::open(&path)?;
        let file_len = file.metadata()?.len();
        if file_len < HEADER_LEN as u64 {
            return Err(Error::FileTooSmall(file_len));
        }

        // SAFETY: the mapping is read-only and kept alive by the graph; the
        // file is treated as untrusted and every section is bounds-checked
        // before a view is handed out.
        let mmap = unsafe { Mmap::map(&file)? };
        let Header {
            version,
            num_nodes,
            num_directed_edges,
        } = format::parse_header(&mmap)?;
        let n = num_nodes as usize;
        let e = num_directed_edges as usize;

        let mut at = HEADER_LEN;
        let mut section = |size: usize, what: &str| -> Result<usize, Error> {
            let offset = at;
            at = at
                .checked_add(size)
                .filter(|&end| end <= mmap.len())
                .ok_or_else(|| Error::Truncated(format!("{what} section overruns file")))?;
            Ok(offset)
        };

        let sections = Sections {
            node_ids: section(n * 8, "node ids")?,
            node_lats: section(n * 4, "node latitudes")?,
            node_lons: section(n * 4, "node longitudes")?,
            adj_offsets: section((n + 1) * 4, "adjacency offsets")?,
            adj_targets: section(e * 4, "adjacency targets")?,
            adj_weights: section(e * 4, "adjacency weights")?,
            edge_name_indices: if version == VERSION_V2 {
                section(e * 2, "edge name indices")?
            } else {
                0
            },
            edge_highway_indices: if version == VERSION_V2 {
                section(e, "edge highway indices")?
            } else {
                0
            },
        };

        let (name_table, highway_table) = if version == VERSION_V2 {
            let mut pos = at;
            let names = format::read_string_table(&mmap, &mut pos, "name")?;
            let highways = format::read_string_table(&mmap, &mut pos, "highway")?;
            (names, highways)
        } else {
            (Vec::new(), Vec::new())
        };

        let mut graph = Self {
            mmap,
            path,
            file_len,
            version,
            num_nodes: n,
            num_directed_edges: e,
            sections,
            name_table,
            highway_table,
            id_index: HashMap::new(),
            spatial: OnceLock::new(),
        };

        // External -> internal index; duplicate ids resolve last-wins.
        let mut id_index = HashMap::with_capacity(n);
        for (i, &id) in graph.node_ids().iter().enumerate() {
            id_index.insert(id, i as NodeIndex);
        }
        graph.id_index = id_index;

        Ok(graph)
    }

    pub fn num_nodes(&self) -> usize {
        self.num_nodes
    }

    /// Directed edge slots; every undirected link occupies two.
    pub fn num_directed_edges(&self) -> usize {
        self.num_directed_edges
    }

    pub fn num_edges(&self) -> usize {
        self.num_directed_edges / 2
    }

    pub fn version(&self) -> u32 {
        self.version
    }

    /// Whether per-edge street names and highway classes are present (v2).
    pub fn has_street_metadata(&self) -> bool {
        self.version == VERSION_V2
    }

    pub fn node_ids(&self) -> &[i64] {
        self.view(self.sections.node_ids, self.num_nodes)
    }

    pub fn node_lats(&self) -> &[f32] {
        self.view(self.sections.node_lats, self.num_nodes)
    }

    pub fn node_lons(&self) -> &[f32] {
        self.view(self.sections.node_lons, self.num_nodes)
    }

    fn adj_offsets(&self) -> &[i32] {
        self.view(self.sections.adj_offsets, self.num_nodes + 1)
    }

    fn adj_targets(&self) -> &[i32] {
        self.view(self.sections.adj_targets, self.num_directed_edges)
    }

    fn adj_weights(&self) -> &[f32] {
        self.view(self.sections.adj_weights, self.num_directed_edges)
    }

    fn edge_name_indices(&self) -> &[u16] {
        self.view(self.sections.edge_name_indices, self.num_directed_edges)
    }

    fn edge_highway_indices(&self) -> &[u8] {
        self.view(self.sections.edge_highway_indices, self.num_directed_edges)
    }

    /// External id of an internal index.
    pub fn node_id(&self, index: NodeIndex) -> OsmNodeId {
        self.node_ids()[index as usize]
    }

    /// Coordinates of an internal index, in degrees.
    pub fn node_coords(&self, index: NodeIndex) -> (f64, f64) {
        (
            self.node_lats()[index as usize] as f64,
            self.node_lons()[index as usize] as f64,
        )
    }

    /// Internal index for an external node id.
    pub fn index_of(&self, id: OsmNodeId) -> Result<NodeIndex, Error> {
        self.id_index
            .get(&id)
            .copied()
            .ok_or(Error::UnknownNodeId(id))
    }

    /// Outgoing neighbors of `u` as zero-copy `(targets, weights)` slices.
    #[inline]
    pub fn neighbors(&self, u: NodeIndex) -> (&[i32], &[f32]) {
        let offsets = self.adj_offsets();
        let start = offsets[u as usize] as usize;
        let end = offsets[u as usize + 1] as usize;
        (
            &self.adj_targets()[start..end],
            &self.adj_weights()[start..end],
        )
    }

    /// Street name of the directed edge `u -> v`, if the graph carries
    /// metadata and the edge has a non-empty name.
    pub fn edge_name(&self, u: NodeIndex, v: NodeIndex) -> Option<&str> {
        let slot = self.edge_slot(u, v)?;
        if !self.has_street_metadata() {
            return None;
        }
        let entry = self
            .name_table
            .get(self.edge_name_indices()[slot] as usize)?;
        (!entry.is_empty()).then_some(entry.as_str())
    }

    /// Highway class of the directed edge `u -> v`, if present.
    pub fn edge_highway(&self, u: NodeIndex, v: NodeIndex) -> Option<&str> {
        let slot = self.edge_slot(u, v)?;
        if !self.has_street_metadata() {
            return None;
        }
        let entry = self
            .highway_table
            .get(self.edge_highway_indices()[slot] as usize)?;
        (!entry.is_empty()).then_some(entry.as_str())
    }

    /// Degree is small on road networks; a linear scan is adequate.
    fn edge_slot(&self, u: NodeIndex, v: NodeIndex) -> Option<usize> {
        let offsets = self.adj_offsets();
        let start = offsets[u as usize] as usize;
        let end = offsets[u as usize + 1] as usize;
        let targets = self.adj_targets();
        (start..end).find(|&j| targets[j] == v as i32)
    }

    /// Snaps a query point (x = lon, y = lat) to the nearest graph node,
    /// returning its internal index and the haversine distance in meters.
    ///
    /// The spatial index proposes candidates in projected space; the final
    /// ranking uses exact haversine.
    pub fn find_nearest_node(&self, point: Point<f64>) -> (NodeIndex, f64) {
        let (lat, lon) = (point.y(), point.x());
        let k = SNAP_CANDIDATES.min(self.num_nodes);
        let candidates = self.spatial_index().nearest(lat, lon, k);

        let mut best_idx = 0;
        let mut best_dist = f64::INFINITY;
        for idx in candidates {
            let (nlat, nlon) = self.node_coords(idx as NodeIndex);
            let d = haversine(lat, lon, nlat, nlon);
            if d < best_dist {
                best_dist = d;
                best_idx = idx as NodeIndex;
            }
        }
        (best_idx, best_dist)
    }

    /// Forces the spatial index to exist. Call once before sharing the graph
    /// across threads to keep queries wait-free afterwards.
    pub fn warm_spatial_index(&self) {
        self.spatial_index();
    }

    fn spatial_index(&self) -> &SpatialIndex {
        self.spatial.get_or_init(|| {
            let fp = crate::spatial::cache_fingerprint(
                self.num_nodes as u32,
                self.num_directed_edges as u32,
                self.version,
                self.file_len,
            );
            let cache_path = self.path.with_extension("kdtr");

            if let Some(index) = load_cache(&cache_path, &fp) {
                debug!("loaded kd-tree cache from {}", cache_path.display());
                return index;
            }

            let index = SpatialIndex::build(self.node_lats(), self.node_lons());
            match save_cache(&cache_path, &index, &fp) {
                Ok(()) => debug!("saved kd-tree cache to {}", cache_path.display()),
                Err(e) => warn!("could not save kd-tree cache: {e}"),
            }
            index
        })
    }

    /// Zero-copy typed view into a section of the mapping.
    #[inline]
    fn view<T>(&self, offset: usize, len: usize) -> &[T] {
        debug_assert!(offset + len * std::mem::size_of::<T>() <= self.mmap.len());
        debug_assert_eq!(
            (self.mmap.as_ptr() as usize + offset) % std::mem::align_of::<T>(),
            0
        );
        // SAFETY: section bounds were validated at load, the sections are
        // naturally aligned within the page-aligned mapping, and the view
        // cannot outlive the mapping it borrows from.
        unsafe { slice::from_raw_parts(self.mmap.as_ptr().add(offset) as *const T, len) }
    }
}

impl std::fmt::Debug for CompactGraph {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompactGraph")
            .field("path", &self.path)
            .field("version", &self.version)
            .field("num_nodes", &self.num_nodes)
            .field("num_directed_edges", &self.num_directed_edges)
            .finish_non_exhaustive()
    }
}
