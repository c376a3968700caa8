//! Patched network builder
//!
//! Splices override nodes into the base street network and appends manually
//! drawn edges. The build is a pure batch computation over in-memory
//! collections: the same inputs always produce the same network.
//!
//! Pipeline per build:
//! 1. Resolve each edge-snapped override node into a cut on its base edge
//! 2. Mirror cuts of two-way edges onto their reverse edges
//! 3. Order cuts per edge by arc length and split the polyline
//! 4. Emit split, pass-through, and manual edges plus the merged node set

pub mod aggregate;
pub mod locate;
pub mod propagate;
pub mod split;

use std::collections::{BTreeMap, HashMap, HashSet};

use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::geo::polyline_length;
use crate::geojson::{
    base_edges_from, base_nodes_from, edge_to_feature, node_to_feature, override_nodes_from,
    FeatureCollection,
};
use crate::model::{manual_osmid, BaseEdge, Coord, EdgeProps, Node, OverrideNode};

pub use aggregate::{order_cuts, Cut};
pub use locate::{locate_cut, resolve_position, PendingCut};
pub use propagate::{index_by_endpoints, propagate_reverse};
pub use split::split_polyline;

/// The four input collections of a build; any of them may be empty
#[derive(Debug, Clone, Default)]
pub struct NetworkInput {
    pub base_edges: FeatureCollection,
    pub base_nodes: FeatureCollection,
    pub override_nodes: FeatureCollection,
    pub override_edges: FeatureCollection,
}

/// How an edge of the patched network came to be
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EdgeOrigin {
    /// Base edge passed through unchanged (length backfilled if missing)
    Base { index: usize },
    /// Piece `part` of base edge `parent`
    Split { parent: usize, part: usize },
    /// Drawn by hand in the editor
    Manual,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PatchedEdge {
    pub props: EdgeProps,
    pub geometry: Vec<Coord>,
    pub origin: EdgeOrigin,
}

impl PatchedEdge {
    /// Manual edges with `oneway` absent or false are traversable both ways
    pub fn is_bidirectional_manual(&self) -> bool {
        self.origin == EdgeOrigin::Manual && self.props.oneway.is_explicitly_two_way()
    }
}

/// Counters describing one build
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BuildReport {
    pub base_edges: usize,
    /// Base edges replaced by their pieces
    pub split_edges: usize,
    pub sub_edges: usize,
    /// Edges whose split was discarded as degenerate
    pub abandoned_splits: usize,
    /// Cuts mirrored onto reverse edges
    pub propagated_cuts: usize,
    pub override_nodes_added: usize,
    /// Override nodes without id or position, or colliding with a base id
    pub override_nodes_skipped: usize,
    pub manual_edges: usize,
}

#[derive(Debug, Clone, Default)]
pub struct PatchedNetwork {
    pub edges: Vec<PatchedEdge>,
    pub nodes: Vec<Node>,
    pub report: BuildReport,
}

impl PatchedNetwork {
    /// Patched edges and nodes as GeoJSON, for persistence and map clients
    pub fn to_feature_collections(&self) -> (FeatureCollection, FeatureCollection) {
        let edges = self
            .edges
            .iter()
            .map(|e| edge_to_feature(&e.props, &e.geometry))
            .collect();
        let nodes = self.nodes.iter().map(node_to_feature).collect();
        (FeatureCollection::new(edges), FeatureCollection::new(nodes))
    }
}

/// Build the patched network from base data and the current overrides.
///
/// Malformed individual features are skipped or left unsplit; only an
/// input with neither base nor override data fails.
pub fn build_patched_network(input: &NetworkInput) -> Result<PatchedNetwork> {
    if input.base_edges.is_empty()
        && input.base_nodes.is_empty()
        && input.override_nodes.is_empty()
        && input.override_edges.is_empty()
    {
        return Err(Error::EmptyInput);
    }

    let base_edges = base_edges_from(&input.base_edges);
    let base_nodes = base_nodes_from(&input.base_nodes);
    let override_nodes = override_nodes_from(&input.override_nodes);

    let mut report = BuildReport {
        base_edges: base_edges.len(),
        ..Default::default()
    };

    // Step 1: cuts from editor snaps
    let mut direct: BTreeMap<usize, Vec<PendingCut>> = BTreeMap::new();
    for (idx, node) in override_nodes.iter().enumerate() {
        let Some(snap) = node.snap else {
            continue;
        };
        let (Some(node_id), Some(point)) = (node.id, node.coord) else {
            debug!(feature = idx, "snapped override node lacks id or point");
            continue;
        };
        let Some(edge) = base_edges.get(snap.edge_index) else {
            debug!(node = node_id, edge = snap.edge_index, "snap references unknown edge");
            continue;
        };
        match locate_cut(&edge.geometry, node_id, point, snap.segment_index, snap.t) {
            Some(cut) => direct.entry(snap.edge_index).or_default().push(cut),
            None => debug!(node = node_id, edge = snap.edge_index, "no valid cut on edge"),
        }
    }

    // Step 2: two-way edges get the same nodes in the reverse direction
    let by_endpoints = index_by_endpoints(&base_edges);
    let mirrored = propagate_reverse(&base_edges, &by_endpoints, &direct);
    report.propagated_cuts = mirrored.len();

    let mut cuts_by_edge = direct;
    for (rfi, cut) in mirrored {
        cuts_by_edge.entry(rfi).or_default().push(cut);
    }

    // Step 3: split
    let mut replacements: HashMap<usize, Vec<PatchedEdge>> = HashMap::new();
    for (&fi, pending) in &cuts_by_edge {
        let edge = &base_edges[fi];
        let cuts = order_cuts(&edge.geometry, pending);
        if cuts.is_empty() {
            continue;
        }
        match split_edge(fi, edge, &cuts) {
            Some(pieces) => {
                report.split_edges += 1;
                report.sub_edges += pieces.len();
                replacements.insert(fi, pieces);
            }
            None => report.abandoned_splits += 1,
        }
    }

    // Step 4: assemble edges in base order, then manual edges
    let mut edges = Vec::with_capacity(base_edges.len() + report.sub_edges);
    for (idx, edge) in base_edges.into_iter().enumerate() {
        if let Some(pieces) = replacements.remove(&idx) {
            edges.extend(pieces);
            continue;
        }
        let mut props = edge.props;
        backfill_length(&mut props, &edge.geometry);
        edges.push(PatchedEdge {
            props,
            geometry: edge.geometry,
            origin: EdgeOrigin::Base { index: idx },
        });
    }

    for feature in &input.override_edges.features {
        let mut props = EdgeProps::from_properties(feature.properties.clone());
        let geometry = feature.line();
        backfill_length(&mut props, &geometry);
        props.osmid = Some(manual_osmid(props.osmid.as_ref()));
        edges.push(PatchedEdge {
            props,
            geometry,
            origin: EdgeOrigin::Manual,
        });
        report.manual_edges += 1;
    }

    let nodes = merge_nodes(base_nodes, &override_nodes, &mut report);

    info!(
        base_edges = report.base_edges,
        split_edges = report.split_edges,
        sub_edges = report.sub_edges,
        abandoned_splits = report.abandoned_splits,
        propagated_cuts = report.propagated_cuts,
        override_nodes_added = report.override_nodes_added,
        manual_edges = report.manual_edges,
        "patched network built"
    );

    Ok(PatchedNetwork {
        edges,
        nodes,
        report,
    })
}

/// Replace one base edge by its pieces, or `None` if the split is degenerate.
///
/// A degenerate split leaves the edge unsplit: the affected override nodes
/// are not connected on this edge.
fn split_edge(fi: usize, edge: &BaseEdge, cuts: &[Cut]) -> Option<Vec<PatchedEdge>> {
    let pieces = split_polyline(&edge.geometry, cuts);
    if pieces.len() != cuts.len() + 1 {
        warn!(
            edge = fi,
            u = ?edge.props.u,
            v = ?edge.props.v,
            cuts = cuts.len(),
            pieces = pieces.len(),
            "degenerate split abandoned; edge kept unsplit"
        );
        return None;
    }

    let (Some(u), Some(v)) = (edge.props.u, edge.props.v) else {
        warn!(edge = fi, "edge with cuts has no u/v; kept unsplit");
        return None;
    };

    let mut chain = Vec::with_capacity(cuts.len() + 2);
    chain.push(u);
    chain.extend(cuts.iter().map(|c| c.node_id));
    chain.push(v);

    let base_osmid = edge.props.osmid_scalar();
    let split = pieces
        .into_iter()
        .enumerate()
        .map(|(part, geometry)| {
            let mut props = edge.props.clone();
            props.u = Some(chain[part]);
            props.v = Some(chain[part + 1]);
            props.length = Some(polyline_length(&geometry));
            props.osmid = Some(Value::from(match &base_osmid {
                Some(osmid) => format!("{osmid}:split:{part}"),
                None => format!("split:{fi}:{part}"),
            }));
            PatchedEdge {
                props,
                geometry,
                origin: EdgeOrigin::Split { parent: fi, part },
            }
        })
        .collect();

    Some(split)
}

fn backfill_length(props: &mut EdgeProps, geometry: &[Coord]) {
    if props.length.is_none() && geometry.len() >= 2 {
        props.length = Some(polyline_length(geometry));
    }
}

/// Base nodes first, then override nodes whose id is new
fn merge_nodes(
    base_nodes: Vec<Node>,
    override_nodes: &[OverrideNode],
    report: &mut BuildReport,
) -> Vec<Node> {
    let mut ids: HashSet<_> = base_nodes.iter().map(|n| n.id).collect();
    let mut nodes = base_nodes;

    for node in override_nodes {
        match node.as_node() {
            Some(n) if ids.insert(n.id) => {
                nodes.push(n);
                report.override_nodes_added += 1;
            }
            _ => report.override_nodes_skipped += 1,
        }
    }

    nodes
}
