//! Binary export of CSR arrays in the compact graph container format.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use crate::model::format::{HEADER_LEN, MAGIC, VERSION_V1, VERSION_V2};
use crate::Error;

use super::GraphData;

/// Writes a graph to `path` in the versioned binary format.
///
/// With `with_metadata` the v2 sections (per-edge name/highway indices and
/// the two string tables) are appended; otherwise a v1 file is produced.
pub fn write_graph(path: &Path, data: &GraphData, with_metadata: bool) -> Result<(), Error> {
    let mut writer = BufWriter::new(File::create(path)?);

    let version = if with_metadata { VERSION_V2 } else { VERSION_V1 };
    writer.write_all(MAGIC)?;
    writer.write_all(&version.to_le_bytes())?;
    writer.write_all(&(data.num_nodes() as u32).to_le_bytes())?;
    writer.write_all(&(data.num_directed_edges() as u32).to_le_bytes())?;
    writer.write_all(&[0u8; HEADER_LEN - 16])?;

    for &id in &data.node_ids {
        writer.write_all(&id.to_le_bytes())?;
    }
    for &lat in &data.node_lats {
        writer.write_all(&lat.to_le_bytes())?;
    }
    for &lon in &data.node_lons {
        writer.write_all(&lon.to_le_bytes())?;
    }
    for &offset in &data.adj_offsets {
        writer.write_all(&offset.to_le_bytes())?;
    }
    for &target in &data.adj_targets {
        writer.write_all(&target.to_le_bytes())?;
    }
    for &weight in &data.adj_weights {
        writer.write_all(&weight.to_le_bytes())?;
    }

    if with_metadata {
        for &ni in &data.edge_name_indices {
            writer.write_all(&ni.to_le_bytes())?;
        }
        writer.write_all(&data.edge_highway_indices)?;
        write_string_table(&mut writer, &data.name_table)?;
        write_string_table(&mut writer, &data.highway_table)?;
    }

    writer.flush()?;
    Ok(())
}

fn write_string_table(writer: &mut impl Write, table: &[String]) -> Result<(), Error> {
    writer.write_all(&(table.len() as u32).to_le_bytes())?;
    for entry in table {
        let bytes = entry.as_bytes();
        writer.write_all(&(bytes.len() as u16).to_le_bytes())?;
        writer.write_all(bytes)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loading::GraphBuilder;

    fn two_node_data() -> GraphData {
        let mut builder = GraphBuilder::new();
        builder.add_node(1, 37.0, -122.0);
        builder.add_node(2, 37.001, -122.0);
        builder.add_edge(1, 2, "Pine Street", "residential");
        builder.build()
    }

    #[test]
    fn v1_file_has_exact_fixed_size() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("graph.bin");
        let data = two_node_data();
        write_graph(&path, &data, false).unwrap();

        let n = data.num_nodes();
        let e = data.num_directed_edges();
        let expected = HEADER_LEN + n * 8 + n * 4 + n * 4 + (n + 1) * 4 + e * 4 + e * 4;
        assert_eq!(std::fs::metadata(&path).unwrap().len() as usize, expected);
    }

    #[test]
    fn v2_header_records_version_and_counts() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("graph.bin");
        write_graph(&path, &two_node_data(), true).unwrap();

        let bytes = std::fs::read(&path).unwrap();
        assert_eq!(&bytes[0..4], MAGIC);
        assert_eq!(u32::from_le_bytes(bytes[4..8].try_into().unwrap()), 2);
        assert_eq!(u32::from_le_bytes(bytes[8..12].try_into().unwrap()), 2);
        assert_eq!(u32::from_le_bytes(bytes[12..16].try_into().unwrap()), 2);
    }
}
