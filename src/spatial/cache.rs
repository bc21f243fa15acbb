//! Sidecar cache for the built KD-tree.
//!
//! Layout, little-endian:
//!
//! ```text
//! magic        "KDTR" (4 bytes)
//! version      u32 (1)
//! cos_lat      f64
//! node_count   u32
//! fp_len       u32
//! fingerprint  fp_len bytes
//! padding      zeros to the next 8-byte boundary
//! nodes        node_count x 32-byte records
//! ```
//!
//! Each record is `x: f64, y: f64, index: i32, left: i32, right: i32` plus
//! four zero bytes so records stay 8-byte aligned. The fingerprint ties the
//! cache to one exact graph file; any mismatch or truncation rejects the
//! cache and the caller rebuilds.

use std::fs;
use std::io::{self, BufWriter, Write};
use std::path::Path;

use super::{KdNode, KdTree, SpatialIndex};
use crate::model::format::read_u32_le;

const MAGIC: &[u8; 4] = b"KDTR";
const VERSION: u32 = 1;
const NODE_RECORD_LEN: usize = 32;

/// Cache identity of a graph file.
pub(crate) fn fingerprint(num_nodes: u32, num_directed_edges: u32, version: u32, file_len: u64) -> String {
    format!("{num_nodes}-{num_directed_edges}-{version}-{file_len}")
}

/// Loads a cached tree, or `None` if the cache is missing, malformed or was
/// built for a different graph. Never fails hard.
pub(crate) fn load_cache(path: &Path, expected_fingerprint: &str) -> Option<SpatialIndex> {
    let bytes = fs::read(path).ok()?;

    if bytes.len() < 24 || &bytes[0..4] != MAGIC {
        return None;
    }
    if read_u32_le(&bytes, 4) != VERSION {
        return None;
    }
    let cos_lat = f64::from_le_bytes(bytes[8..16].try_into().ok()?);
    let node_count = read_u32_le(&bytes, 16) as usize;
    let fp_len = read_u32_le(&bytes, 20) as usize;

    let fp_end = 24usize.checked_add(fp_len)?;
    if fp_end > bytes.len() || &bytes[24..fp_end] != expected_fingerprint.as_bytes() {
        return None;
    }

    let nodes_start = fp_end + padding_after(fp_end);
    let nodes_end = nodes_start.checked_add(node_count.checked_mul(NODE_RECORD_LEN)?)?;
    if nodes_end != bytes.len() {
        return None;
    }

    let mut nodes = Vec::with_capacity(node_count);
    let mut at = nodes_start;
    for _ in 0..node_count {
        nodes.push(KdNode {
            x: f64::from_le_bytes(bytes[at..at + 8].try_into().ok()?),
            y: f64::from_le_bytes(bytes[at + 8..at + 16].try_into().ok()?),
            index: i32::from_le_bytes(bytes[at + 16..at + 20].try_into().ok()?),
            left: i32::from_le_bytes(bytes[at + 20..at + 24].try_into().ok()?),
            right: i32::from_le_bytes(bytes[at + 24..at + 28].try_into().ok()?),
        });
        at += NODE_RECORD_LEN;
    }

    Some(SpatialIndex {
        tree: KdTree::from_nodes(nodes),
        cos_lat,
    })
}

/// Saves the tree next to the graph, atomically: the bytes go to a `.tmp`
/// sibling first and are renamed into place.
pub(crate) fn save_cache(path: &Path, index: &SpatialIndex, fingerprint: &str) -> io::Result<()> {
    let tmp_path = path.with_extension("kdtr.tmp");
    {
        let mut writer = BufWriter::new(fs::File::create(&tmp_path)?);

        writer.write_all(MAGIC)?;
        writer.write_all(&VERSION.to_le_bytes())?;
        writer.write_all(&index.cos_lat.to_le_bytes())?;
        writer.write_all(&(index.tree.len() as u32).to_le_bytes())?;
        writer.write_all(&(fingerprint.len() as u32).to_le_bytes())?;
        writer.write_all(fingerprint.as_bytes())?;
        writer.write_all(&[0u8; 8][..padding_after(24 + fingerprint.len())])?;

        for node in index.tree.nodes() {
            writer.write_all(&node.x.to_le_bytes())?;
            writer.write_all(&node.y.to_le_bytes())?;
            writer.write_all(&node.index.to_le_bytes())?;
            writer.write_all(&node.left.to_le_bytes())?;
            writer.write_all(&node.right.to_le_bytes())?;
            writer.write_all(&[0u8; 4])?;
        }
        writer.flush()?;
    }
    fs::rename(&tmp_path, path)
}

fn padding_after(offset: usize) -> usize {
    (8 - offset % 8) % 8
}
