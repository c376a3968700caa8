//! Directed multigraph over the patched network
//!
//! Nodes carry `{x, y}`; edges carry `length` in meters, geometry, and the
//! provenance attributes of the feature they came from. Parallel edges are
//! kept, so a base edge and a manual edge between the same nodes coexist.

use std::collections::HashMap;

use petgraph::algo::dijkstra;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;
use rstar::primitives::GeomWithData;
use rstar::RTree;
use serde_json::Value;
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::geo::{mercator_xy, polyline_length};
use crate::geojson::{base_nodes_from, FeatureCollection};
use crate::model::{Coord, EdgeProps, Node, NodeId, Oneway, Properties};
use crate::patch::{EdgeOrigin, PatchedEdge, PatchedNetwork};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GraphNode {
    pub id: NodeId,
    /// Longitude
    pub x: f64,
    /// Latitude
    pub y: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct GraphEdge {
    /// `u`/`v` as recorded on the feature
    pub u: NodeId,
    pub v: NodeId,
    pub length: f64,
    pub geometry: Vec<Coord>,
    pub oneway: Oneway,
    pub osmid: Option<Value>,
    pub extra: Properties,
}

/// Node position in Web Mercator meters, tagged with its id
type IndexedNode = GeomWithData<[f64; 2], NodeId>;

#[derive(Debug, Default)]
pub struct PatchedGraph {
    pub graph: DiGraph<GraphNode, GraphEdge>,
    pub node_map: HashMap<NodeId, NodeIndex>,
    /// R-tree over node positions for snapping coordinates to the graph
    pub spatial_index: RTree<IndexedNode>,
}

impl PatchedGraph {
    /// Assemble the routing graph from a freshly built network
    pub fn from_network(network: &PatchedNetwork) -> Self {
        Self::assemble(&network.nodes, &network.edges)
    }

    /// Assemble from persisted patched collections.
    ///
    /// Manual edges are recognised by their `manual:` osmid prefix, which is
    /// the only trace of their origin once written to GeoJSON.
    pub fn from_collections(nodes: &FeatureCollection, edges: &FeatureCollection) -> Self {
        let nodes = base_nodes_from(nodes);
        let edges: Vec<PatchedEdge> = edges
            .features
            .iter()
            .enumerate()
            .map(|(index, f)| {
                let props = EdgeProps::from_properties(f.properties.clone());
                let origin = if props.has_manual_osmid() {
                    EdgeOrigin::Manual
                } else {
                    EdgeOrigin::Base { index }
                };
                PatchedEdge {
                    props,
                    geometry: f.line(),
                    origin,
                }
            })
            .collect();
        Self::assemble(&nodes, &edges)
    }

    fn assemble(nodes: &[Node], edges: &[PatchedEdge]) -> Self {
        let mut pg = PatchedGraph::default();

        for node in nodes {
            pg.ensure_node(node.id, node.coord);
        }

        let mut skipped = 0usize;
        for (i, edge) in edges.iter().enumerate() {
            let (Some(u), Some(v)) = (edge.props.u, edge.props.v) else {
                debug!(edge = i, "skipping edge without u/v");
                skipped += 1;
                continue;
            };

            // Endpoints missing from the node set come from the geometry.
            let missing = !pg.node_map.contains_key(&u) || !pg.node_map.contains_key(&v);
            if missing {
                let (Some(first), Some(last)) = (edge.geometry.first(), edge.geometry.last())
                else {
                    debug!(edge = i, u, v, "skipping edge with unknown endpoints and no geometry");
                    skipped += 1;
                    continue;
                };
                if edge.geometry.len() < 2 {
                    skipped += 1;
                    continue;
                }
                pg.ensure_node(u, *first);
                pg.ensure_node(v, *last);
            }

            let attrs = GraphEdge {
                u,
                v,
                length: edge
                    .props
                    .length
                    .unwrap_or_else(|| polyline_length(&edge.geometry)),
                geometry: edge.geometry.clone(),
                oneway: edge.props.oneway.clone(),
                osmid: edge.props.osmid.clone(),
                extra: edge.props.extra.clone(),
            };

            let (a, b) = (pg.node_map[&u], pg.node_map[&v]);
            if edge.is_bidirectional_manual() {
                pg.graph.add_edge(b, a, attrs.clone());
            }
            pg.graph.add_edge(a, b, attrs);
        }

        let points: Vec<IndexedNode> = pg
            .graph
            .node_weights()
            .map(|n| {
                let (x, y) = mercator_xy(n.x, n.y);
                GeomWithData::new([x, y], n.id)
            })
            .collect();
        pg.spatial_index = RTree::bulk_load(points);

        info!(
            nodes = pg.graph.node_count(),
            edges = pg.graph.edge_count(),
            skipped,
            "assembled patched graph"
        );
        pg
    }

    fn ensure_node(&mut self, id: NodeId, coord: Coord) -> NodeIndex {
        if let Some(&idx) = self.node_map.get(&id) {
            return idx;
        }
        let idx = self.graph.add_node(GraphNode {
            id,
            x: coord[0],
            y: coord[1],
        });
        self.node_map.insert(id, idx);
        idx
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    pub fn node(&self, id: NodeId) -> Option<&GraphNode> {
        self.node_map.get(&id).map(|&idx| &self.graph[idx])
    }

    pub fn contains_node(&self, id: NodeId) -> bool {
        self.node_map.contains_key(&id)
    }

    /// All parallel edges directed from `u` to `v`
    pub fn edges_between(&self, u: NodeId, v: NodeId) -> Vec<&GraphEdge> {
        let (Some(&a), Some(&b)) = (self.node_map.get(&u), self.node_map.get(&v)) else {
            return Vec::new();
        };
        self.graph
            .edges_connecting(a, b)
            .map(|e| e.weight())
            .collect()
    }

    /// Shortest walking distance in meters from `source` to every reachable node
    pub fn distances_from(&self, source: NodeId) -> Result<HashMap<NodeId, f64>> {
        let start = self.index_of(source)?;
        let costs = dijkstra(&self.graph, start, None, |e| e.weight().length);
        Ok(costs
            .into_iter()
            .map(|(idx, cost)| (self.graph[idx].id, cost))
            .collect())
    }

    /// Shortest walking distance from `from` to `to`, `None` if unreachable
    pub fn path_length(&self, from: NodeId, to: NodeId) -> Result<Option<f64>> {
        let start = self.index_of(from)?;
        let goal = self.index_of(to)?;
        let costs = dijkstra(&self.graph, start, Some(goal), |e| e.weight().length);
        Ok(costs.get(&goal).copied())
    }

    /// Node closest to `(lon, lat)`, `None` on an empty graph.
    ///
    /// Distances are compared in Web Mercator, which preserves the nearest
    /// neighbour at street scale.
    pub fn nearest_node(&self, lon: f64, lat: f64) -> Option<NodeId> {
        let (x, y) = mercator_xy(lon, lat);
        self.spatial_index.nearest_neighbor(&[x, y]).map(|p| p.data)
    }

    /// Nodes reachable from `source` within `max_meters` of walking, with
    /// their distances. `source` itself is always included at 0.
    pub fn reachable_within(
        &self,
        source: NodeId,
        max_meters: f64,
    ) -> Result<HashMap<NodeId, f64>> {
        let mut costs = self.distances_from(source)?;
        costs.retain(|_, cost| *cost <= max_meters);
        Ok(costs)
    }

    fn index_of(&self, id: NodeId) -> Result<NodeIndex> {
        self.node_map.get(&id).copied().ok_or(Error::UnknownNode(id))
    }
}
