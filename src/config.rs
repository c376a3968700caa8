//! Build inputs and GeoJSON file I/O

use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use tracing::{info, warn};

use crate::error::{Error, Result};
use crate::geojson::FeatureCollection;
use crate::graph::PatchedGraph;
use crate::patch::{build_patched_network, NetworkInput, PatchedNetwork};

pub const EDGES_PATCHED_FILE: &str = "edges_patched.geojson";
pub const NODES_PATCHED_FILE: &str = "nodes_patched.geojson";

/// Locations of the four input collections
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildConfig {
    pub base_edges_path: PathBuf,
    pub base_nodes_path: PathBuf,
    pub override_nodes_path: Option<PathBuf>,
    pub override_edges_path: Option<PathBuf>,
}

impl BuildConfig {
    pub fn new(base_edges_path: impl Into<PathBuf>, base_nodes_path: impl Into<PathBuf>) -> Self {
        Self {
            base_edges_path: base_edges_path.into(),
            base_nodes_path: base_nodes_path.into(),
            override_nodes_path: None,
            override_edges_path: None,
        }
    }

    pub fn with_overrides(
        mut self,
        override_nodes_path: Option<PathBuf>,
        override_edges_path: Option<PathBuf>,
    ) -> Self {
        self.override_nodes_path = override_nodes_path;
        self.override_edges_path = override_edges_path;
        self
    }

    /// Load every configured collection; unreadable files count as empty
    pub fn load_input(&self) -> NetworkInput {
        let optional = |path: &Option<PathBuf>| {
            path.as_deref()
                .map(load_collection_or_empty)
                .unwrap_or_default()
        };

        NetworkInput {
            base_edges: load_collection_or_empty(&self.base_edges_path),
            base_nodes: load_collection_or_empty(&self.base_nodes_path),
            override_nodes: optional(&self.override_nodes_path),
            override_edges: optional(&self.override_edges_path),
        }
    }
}

/// Read a feature collection, failing on I/O or JSON errors
pub fn read_collection(path: &Path) -> Result<FeatureCollection> {
    let file = File::open(path).map_err(|source| Error::Io {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_reader(BufReader::new(file)).map_err(|source| Error::Json {
        path: path.to_path_buf(),
        source,
    })
}

/// Read a feature collection, treating a missing or broken file as empty
pub fn load_collection_or_empty(path: &Path) -> FeatureCollection {
    if !path.exists() {
        info!(path = %path.display(), "collection not found, using empty");
        return FeatureCollection::default();
    }
    match read_collection(path) {
        Ok(fc) => fc,
        Err(e) => {
            warn!(error = %e, "unreadable collection, using empty");
            FeatureCollection::default()
        }
    }
}

pub fn write_collection(path: &Path, fc: &FeatureCollection) -> Result<()> {
    let io_err = |source| Error::Io {
        path: path.to_path_buf(),
        source,
    };
    let file = File::create(path).map_err(io_err)?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer(&mut writer, fc).map_err(|source| Error::Json {
        path: path.to_path_buf(),
        source,
    })?;
    writer.flush().map_err(io_err)
}

/// Write `edges_patched.geojson` and `nodes_patched.geojson` into `outdir`
pub fn write_network(outdir: &Path, network: &PatchedNetwork) -> Result<(PathBuf, PathBuf)> {
    std::fs::create_dir_all(outdir).map_err(|source| Error::Io {
        path: outdir.to_path_buf(),
        source,
    })?;

    let (edges, nodes) = network.to_feature_collections();
    let edges_path = outdir.join(EDGES_PATCHED_FILE);
    let nodes_path = outdir.join(NODES_PATCHED_FILE);
    write_collection(&edges_path, &edges)?;
    write_collection(&nodes_path, &nodes)?;
    Ok((edges_path, nodes_path))
}

/// Load, patch, and assemble in one call
pub fn build_patched_from_files(config: &BuildConfig) -> Result<(PatchedGraph, PatchedNetwork)> {
    let input = config.load_input();
    let network = build_patched_network(&input)?;
    let graph = PatchedGraph::from_network(&network);
    Ok((graph, network))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    #[test]
    fn test_missing_and_broken_files_load_empty() {
        let dir = TempDir::new().unwrap();
        let broken = dir.path().join("broken.geojson");
        std::fs::write(&broken, "{ not json").unwrap();

        assert!(load_collection_or_empty(&dir.path().join("absent.geojson")).is_empty());
        assert!(load_collection_or_empty(&broken).is_empty());
        assert!(matches!(read_collection(&broken), Err(Error::Json { .. })));
    }

    #[test]
    fn test_all_inputs_missing_is_empty_input() {
        let dir = TempDir::new().unwrap();
        let config = BuildConfig::new(dir.path().join("e.geojson"), dir.path().join("n.geojson"));
        assert!(matches!(
            build_patched_from_files(&config),
            Err(Error::EmptyInput)
        ));
    }

    #[test]
    fn test_write_then_read_collection() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("out.geojson");
        let fc: FeatureCollection = serde_json::from_value(json!({
            "type": "FeatureCollection",
            "features": [{"type": "Feature", "properties": {"osmid": 1},
                          "geometry": {"type": "Point", "coordinates": [4.0, 50.0]}}]
        }))
        .unwrap();

        write_collection(&path, &fc).unwrap();
        assert_eq!(read_collection(&path).unwrap(), fc);
    }
}
