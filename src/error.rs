//! Error types for butterfly-patch
//!
//! Malformed individual features never surface here; they are skipped or
//! degraded inside the builder. Only whole-build failures become errors.

use std::path::PathBuf;
use thiserror::Error;

use crate::model::NodeId;

#[derive(Debug, Error)]
pub enum Error {
    /// Neither base nor override data was supplied
    #[error("no base network and no overrides to build from")]
    EmptyInput,

    #[error("node {0} is not in the graph")]
    UnknownNode(NodeId),

    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid GeoJSON in {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Convenience result type for butterfly-patch operations
pub type Result<T> = std::result::Result<T, Error>;
