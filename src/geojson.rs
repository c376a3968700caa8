//! GeoJSON feature collections as exchanged with the editor and map clients
//!
//! Deserialization is lenient: missing `properties` or `geometry` become
//! empty rather than failing the whole collection.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::model::{
    base_node_id, parse_line, parse_point, BaseEdge, Coord, EdgeProps, Node, OverrideNode,
    Properties,
};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureCollection {
    #[serde(rename = "type", default = "FeatureCollection::kind")]
    pub kind: String,
    #[serde(default)]
    pub features: Vec<Feature>,
}

impl FeatureCollection {
    fn kind() -> String {
        "FeatureCollection".to_string()
    }

    pub fn new(features: Vec<Feature>) -> Self {
        Self {
            kind: Self::kind(),
            features,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }
}

impl Default for FeatureCollection {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Feature {
    #[serde(rename = "type", default = "Feature::kind")]
    pub kind: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub properties: Properties,
    #[serde(default)]
    pub geometry: Option<Geometry>,
}

impl Feature {
    fn kind() -> String {
        "Feature".to_string()
    }

    pub fn new(properties: Properties, geometry: Option<Geometry>) -> Self {
        Self {
            kind: Self::kind(),
            properties,
            geometry,
        }
    }

    /// Point coordinate, if the geometry is a usable Point
    pub fn point(&self) -> Option<Coord> {
        self.geometry.as_ref().and_then(|g| parse_point(&g.coordinates))
    }

    /// LineString vertices, empty if the geometry is missing or malformed
    pub fn line(&self) -> Vec<Coord> {
        self.geometry
            .as_ref()
            .and_then(|g| parse_line(&g.coordinates))
            .unwrap_or_default()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Geometry {
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub coordinates: Value,
}

impl Geometry {
    pub fn point(coord: Coord) -> Self {
        Self {
            kind: "Point".to_string(),
            coordinates: Value::from(coord.to_vec()),
        }
    }

    pub fn line_string(coords: &[Coord]) -> Self {
        Self {
            kind: "LineString".to_string(),
            coordinates: Value::from(coords.iter().map(|c| c.to_vec()).collect::<Vec<_>>()),
        }
    }
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<Properties, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Ok(Option::<Properties>::deserialize(deserializer)?.unwrap_or_default())
}

/// Base edges keep their feature order: snap metadata refers to it by index
pub fn base_edges_from(fc: &FeatureCollection) -> Vec<BaseEdge> {
    fc.features
        .iter()
        .map(|f| BaseEdge {
            props: EdgeProps::from_properties(f.properties.clone()),
            geometry: f.line(),
        })
        .collect()
}

/// Base nodes with a resolvable id and position; others are skipped
pub fn base_nodes_from(fc: &FeatureCollection) -> Vec<Node> {
    fc.features
        .iter()
        .enumerate()
        .filter_map(|(idx, f)| {
            let node = base_node_id(&f.properties).zip(f.point()).map(|(id, coord)| Node {
                id,
                coord,
                properties: f.properties.clone(),
            });
            if node.is_none() {
                debug!(feature = idx, "skipping base node without id or point");
            }
            node
        })
        .collect()
}

pub fn override_nodes_from(fc: &FeatureCollection) -> Vec<OverrideNode> {
    fc.features
        .iter()
        .map(|f| OverrideNode::from_properties(f.properties.clone(), f.point()))
        .collect()
}

pub fn node_to_feature(node: &Node) -> Feature {
    Feature::new(node.properties.clone(), Some(Geometry::point(node.coord)))
}

pub fn edge_to_feature(props: &EdgeProps, geometry: &[Coord]) -> Feature {
    let geometry = (!geometry.is_empty()).then(|| Geometry::line_string(geometry));
    Feature::new(props.to_properties(), geometry)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_lenient_deserialization() {
        let fc: FeatureCollection = serde_json::from_value(json!({
            "type": "FeatureCollection",
            "features": [
                {"type": "Feature", "properties": null, "geometry": null},
                {"type": "Feature", "properties": {"osmid": 1},
                 "geometry": {"type": "Point", "coordinates": [4.0, 50.0]}},
                {"properties": {"osmid": 2}}
            ]
        }))
        .unwrap();

        assert_eq!(fc.features.len(), 3);
        let nodes = base_nodes_from(&fc);
        assert_eq!(nodes.len(), 1);
        assert_eq!(nodes[0].id, 1);
        assert_eq!(nodes[0].coord, [4.0, 50.0]);
    }

    #[test]
    fn test_missing_features_is_empty() {
        let fc: FeatureCollection = serde_json::from_value(json!({})).unwrap();
        assert!(fc.is_empty());
        assert_eq!(fc.kind, "FeatureCollection");
    }

    #[test]
    fn test_edge_feature_roundtrip_keeps_extras() {
        let feature: Feature = serde_json::from_value(json!({
            "type": "Feature",
            "properties": {"u": 1, "v": 2, "highway": "footway"},
            "geometry": {"type": "LineString", "coordinates": [[0.0, 0.0], [0.0, 0.001]]}
        }))
        .unwrap();
        let edges = base_edges_from(&FeatureCollection::new(vec![feature]));
        let out = edge_to_feature(&edges[0].props, &edges[0].geometry);

        assert_eq!(out.properties["highway"], json!("footway"));
        assert_eq!(out.line(), vec![[0.0, 0.0], [0.0, 0.001]]);
    }
}
