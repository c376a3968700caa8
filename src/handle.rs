//! Published graph handle
//!
//! Readers take an `Arc` snapshot and keep it for the whole query. A rebuild
//! constructs the new graph completely before swapping the pointer, so a
//! reader sees either the old or the new graph, never a mix.

use std::sync::Arc;

use parking_lot::RwLock;
use tracing::info;

use crate::config::{build_patched_from_files, BuildConfig};
use crate::error::Result;
use crate::graph::PatchedGraph;
use crate::patch::BuildReport;

#[derive(Debug, Default)]
pub struct GraphHandle {
    current: RwLock<Arc<PatchedGraph>>,
}

impl GraphHandle {
    pub fn new(graph: PatchedGraph) -> Self {
        Self {
            current: RwLock::new(Arc::new(graph)),
        }
    }

    /// Snapshot of the published graph
    pub fn current(&self) -> Arc<PatchedGraph> {
        Arc::clone(&self.current.read())
    }

    /// Replace the published graph, returning the previous one
    pub fn publish(&self, graph: PatchedGraph) -> Arc<PatchedGraph> {
        let next = Arc::new(graph);
        std::mem::replace(&mut *self.current.write(), next)
    }

    /// Rebuild from files and publish. On error the old graph stays live.
    pub fn rebuild(&self, config: &BuildConfig) -> Result<BuildReport> {
        let (graph, network) = build_patched_from_files(config)?;
        info!(
            nodes = graph.node_count(),
            edges = graph.edge_count(),
            "publishing rebuilt graph"
        );
        self.publish(graph);
        Ok(network.report)
    }
}
