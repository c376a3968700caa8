//! Butterfly-patch library
//!
//! Builds a routable pedestrian network from an OSM-derived base network
//! plus user overrides: nodes snapped onto existing streets and edges drawn
//! by hand. Override nodes are spliced into the base geometry, mirrored onto
//! the reverse direction of two-way streets, and the result is assembled
//! into a directed multigraph for routing and reachability queries.

pub mod config;
pub mod error;
pub mod geo;
pub mod geojson;
pub mod graph;
pub mod handle;
pub mod model;
pub mod patch;

pub use config::{build_patched_from_files, BuildConfig};
pub use error::{Error, Result};
pub use geojson::FeatureCollection;
pub use graph::PatchedGraph;
pub use handle::GraphHandle;
pub use patch::{build_patched_network, BuildReport, NetworkInput, PatchedNetwork};
