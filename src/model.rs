//! Typed data model for the patched network
//!
//! GeoJSON properties arrive loosely typed: ids may be ints, floats, or
//! strings, and flags may be bools or "yes"/"no". Everything goes through
//! the `parse_*` helpers here once, so downstream code only ever compares
//! typed values.

use serde_json::{Map, Value};

/// OSM-style node identifier, unique across base and override nodes
pub type NodeId = i64;

/// `[lon, lat]` in WGS84 degrees, GeoJSON axis order
pub type Coord = [f64; 2];

/// Open map of properties carried through unchanged
pub type Properties = Map<String, Value>;

/// Parse a node id from an int, an integral float, a bool, or a numeric string.
///
/// Strings go through `f64` first so that `"12.0"` is accepted. Anything
/// else, including non-integral numbers in either form, yields `None`.
pub fn parse_node_id(value: &Value) -> Option<NodeId> {
    match value {
        Value::Bool(b) => Some(*b as NodeId),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                return Some(i);
            }
            let f = n.as_f64()?;
            integral_f64_to_id(f)
        }
        Value::String(s) => {
            let s = s.trim();
            if s.is_empty() {
                return None;
            }
            if let Ok(i) = s.parse::<NodeId>() {
                return Some(i);
            }
            s.parse::<f64>().ok().and_then(integral_f64_to_id)
        }
        _ => None,
    }
}

fn integral_f64_to_id(f: f64) -> Option<NodeId> {
    if f.is_finite() && f.fract() == 0.0 && f.abs() < 9.0e15 {
        Some(f as NodeId)
    } else {
        None
    }
}

/// Parse a finite float from a number or numeric string
pub fn parse_f64(value: &Value) -> Option<f64> {
    let f = match value {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().parse::<f64>().ok()?,
        _ => return None,
    };
    f.is_finite().then_some(f)
}

/// Parse a non-negative index from an int, integral float, or string
pub fn parse_index(value: &Value) -> Option<usize> {
    parse_node_id(value).and_then(|i| usize::try_from(i).ok())
}

/// Parse a boolean flag such as `oneway`.
///
/// `None` means the value is absent or not recognisable either way.
pub fn parse_flag(value: &Value) -> Option<bool> {
    match value {
        Value::Bool(b) => Some(*b),
        Value::Number(n) => n.as_f64().map(|f| f != 0.0),
        Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
            "true" | "1" | "yes" | "y" => Some(true),
            "false" | "0" | "no" | "n" | "" => Some(false),
            _ => None,
        },
        _ => None,
    }
}

/// Parse a GeoJSON Point `coordinates` array
pub fn parse_point(value: &Value) -> Option<Coord> {
    let arr = value.as_array()?;
    if arr.len() < 2 {
        return None;
    }
    let lon = arr[0].as_f64()?;
    let lat = arr[1].as_f64()?;
    (lon.is_finite() && lat.is_finite()).then_some([lon, lat])
}

/// Parse a GeoJSON LineString `coordinates` array; `None` if any vertex is bad
pub fn parse_line(value: &Value) -> Option<Vec<Coord>> {
    value.as_array()?.iter().map(parse_point).collect()
}

/// A graph vertex: base node or appended override node
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub id: NodeId,
    pub coord: Coord,
    /// Original properties, written back as-is
    pub properties: Properties,
}

/// Typed core of an edge's properties plus passthrough attributes
#[derive(Debug, Clone, PartialEq, Default)]
pub struct EdgeProps {
    pub u: Option<NodeId>,
    pub v: Option<NodeId>,
    /// Meters along the polyline
    pub length: Option<f64>,
    pub oneway: Oneway,
    /// Provenance id: an OSM way id, a list of them, or a derived string
    pub osmid: Option<Value>,
    /// Street name, surface, highway, ... carried through unchanged
    pub extra: Properties,
}

impl EdgeProps {
    /// Split a raw property map into typed core fields and passthrough extras
    pub fn from_properties(mut props: Properties) -> Self {
        let u = props.remove("u").as_ref().and_then(parse_node_id);
        let v = props.remove("v").as_ref().and_then(parse_node_id);
        let length = props.remove("length").as_ref().and_then(parse_f64);
        let oneway = Oneway::from_value(props.remove("oneway"));
        let osmid = props.remove("osmid").filter(|v| !v.is_null());

        Self {
            u,
            v,
            length,
            oneway,
            osmid,
            extra: props,
        }
    }

    pub fn to_properties(&self) -> Properties {
        let mut props = self.extra.clone();
        if let Some(u) = self.u {
            props.insert("u".into(), u.into());
        }
        if let Some(v) = self.v {
            props.insert("v".into(), v.into());
        }
        if let Some(length) = self.length {
            props.insert("length".into(), length.into());
        }
        if let Some(oneway) = self.oneway.to_value() {
            props.insert("oneway".into(), oneway);
        }
        if let Some(osmid) = &self.osmid {
            props.insert("osmid".into(), osmid.clone());
        }
        props
    }

    pub fn is_oneway(&self) -> bool {
        self.oneway == Oneway::Yes
    }

    /// `osmid` as a plain string when it is a scalar, for provenance suffixes
    pub fn osmid_scalar(&self) -> Option<String> {
        match self.osmid.as_ref()? {
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            Value::Bool(b) => Some(b.to_string()),
            _ => None,
        }
    }

    /// Edges drawn in the editor carry an `osmid` of the form `manual:...`
    pub fn has_manual_osmid(&self) -> bool {
        matches!(&self.osmid, Some(Value::String(s)) if s.starts_with(MANUAL_OSMID_PREFIX))
    }
}

pub const MANUAL_OSMID_PREFIX: &str = "manual:";
pub const MANUAL_OSMID_UNKNOWN: &str = "manual:unknown";

/// The `osmid` an override edge is written with.
///
/// The prefix is the only mark of a manual edge in persisted collections,
/// so every override edge carries it: `123` becomes `"manual:123"`, an
/// existing `"manual:..."` string is kept, and a missing id becomes
/// `"manual:unknown"`.
pub fn manual_osmid(osmid: Option<&Value>) -> Value {
    match osmid {
        None | Some(Value::Null) => Value::from(MANUAL_OSMID_UNKNOWN),
        Some(Value::String(s)) if s.starts_with(MANUAL_OSMID_PREFIX) => Value::from(s.as_str()),
        Some(Value::String(s)) => Value::from(format!("{MANUAL_OSMID_PREFIX}{s}")),
        Some(other) => Value::from(format!("{MANUAL_OSMID_PREFIX}{other}")),
    }
}

/// An edge's `oneway` attribute.
///
/// Values that read as neither yes nor no (OSM's `"-1"`, `"reversible"`)
/// are kept verbatim and written back unchanged.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Oneway {
    #[default]
    Absent,
    Yes,
    No,
    Other(Value),
}

impl Oneway {
    pub fn from_value(value: Option<Value>) -> Self {
        match value {
            None | Some(Value::Null) => Oneway::Absent,
            Some(raw) => match parse_flag(&raw) {
                Some(true) => Oneway::Yes,
                Some(false) => Oneway::No,
                None => Oneway::Other(raw),
            },
        }
    }

    pub fn to_value(&self) -> Option<Value> {
        match self {
            Oneway::Absent => None,
            Oneway::Yes => Some(Value::Bool(true)),
            Oneway::No => Some(Value::Bool(false)),
            Oneway::Other(raw) => Some(raw.clone()),
        }
    }

    /// Absent or explicitly false. Unrecognised values do not qualify.
    pub fn is_explicitly_two_way(&self) -> bool {
        matches!(self, Oneway::Absent | Oneway::No)
    }
}

/// A directed edge of the base network
#[derive(Debug, Clone, PartialEq)]
pub struct BaseEdge {
    pub props: EdgeProps,
    /// Empty when the feature had no usable LineString
    pub geometry: Vec<Coord>,
}

/// Where an override node was snapped in the editor
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EdgeSnap {
    /// Index of the base edge feature
    pub edge_index: usize,
    pub segment_index: Option<usize>,
    pub t: Option<f64>,
}

/// An override node, possibly snapped onto a base edge
#[derive(Debug, Clone, PartialEq)]
pub struct OverrideNode {
    pub id: Option<NodeId>,
    pub coord: Option<Coord>,
    pub snap: Option<EdgeSnap>,
    pub properties: Properties,
}

impl OverrideNode {
    pub fn from_properties(properties: Properties, coord: Option<Coord>) -> Self {
        let id = properties
            .get("id")
            .or_else(|| properties.get("osmid"))
            .and_then(parse_node_id);

        let snap = match properties.get("snapped_kind") {
            Some(Value::String(kind)) if kind == "edge" => properties
                .get("edge_feature_index")
                .and_then(parse_index)
                .map(|edge_index| EdgeSnap {
                    edge_index,
                    segment_index: properties.get("edge_segment_index").and_then(parse_index),
                    t: properties.get("edge_segment_t").and_then(parse_f64),
                }),
            _ => None,
        };

        Self {
            id,
            coord,
            snap,
            properties,
        }
    }

    /// The node as a graph vertex, when it has both an id and a position
    pub fn as_node(&self) -> Option<Node> {
        Some(Node {
            id: self.id?,
            coord: self.coord?,
            properties: self.properties.clone(),
        })
    }
}

/// Base node id lookup prefers `osmid` over `id`
pub fn base_node_id(properties: &Properties) -> Option<NodeId> {
    properties
        .get("osmid")
        .or_else(|| properties.get("id"))
        .and_then(parse_node_id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_node_id_variants() {
        assert_eq!(parse_node_id(&json!(42)), Some(42));
        assert_eq!(parse_node_id(&json!(42.0)), Some(42));
        assert_eq!(parse_node_id(&json!("42")), Some(42));
        assert_eq!(parse_node_id(&json!(" 42.0 ")), Some(42));
        assert_eq!(parse_node_id(&json!(-7)), Some(-7));
        assert_eq!(parse_node_id(&json!(true)), Some(1));
    }

    #[test]
    fn test_parse_node_id_rejects_garbage() {
        assert_eq!(parse_node_id(&json!(null)), None);
        assert_eq!(parse_node_id(&json!("")), None);
        assert_eq!(parse_node_id(&json!("abc")), None);
        assert_eq!(parse_node_id(&json!(1.5)), None);
        assert_eq!(parse_node_id(&json!("1.5")), None);
        assert_eq!(parse_node_id(&json!([1, 2])), None);
    }

    #[test]
    fn test_parse_flag() {
        assert_eq!(parse_flag(&json!(true)), Some(true));
        assert_eq!(parse_flag(&json!("Yes")), Some(true));
        assert_eq!(parse_flag(&json!("0")), Some(false));
        assert_eq!(parse_flag(&json!("")), Some(false));
        assert_eq!(parse_flag(&json!("-1")), None);
        assert_eq!(parse_flag(&json!(null)), None);
    }

    #[test]
    fn test_oneway_keeps_unrecognised_values() {
        assert_eq!(Oneway::from_value(None), Oneway::Absent);
        assert_eq!(Oneway::from_value(Some(json!(null))), Oneway::Absent);
        assert_eq!(Oneway::from_value(Some(json!("yes"))), Oneway::Yes);
        assert_eq!(Oneway::from_value(Some(json!(0))), Oneway::No);

        let reverse = Oneway::from_value(Some(json!("-1")));
        assert_eq!(reverse, Oneway::Other(json!("-1")));
        assert!(!reverse.is_explicitly_two_way());
        assert_eq!(reverse.to_value(), Some(json!("-1")));
        assert!(Oneway::Absent.is_explicitly_two_way());
    }

    #[test]
    fn test_manual_osmid_always_prefixed() {
        assert_eq!(manual_osmid(None), json!("manual:unknown"));
        assert_eq!(manual_osmid(Some(&json!(123))), json!("manual:123"));
        assert_eq!(manual_osmid(Some(&json!("way-9"))), json!("manual:way-9"));
        assert_eq!(manual_osmid(Some(&json!("manual:abc"))), json!("manual:abc"));
    }

    #[test]
    fn test_parse_line_rejects_partial() {
        assert_eq!(
            parse_line(&json!([[1.0, 2.0], [3.0, 4.0]])),
            Some(vec![[1.0, 2.0], [3.0, 4.0]])
        );
        assert_eq!(parse_line(&json!([[1.0, 2.0], [3.0]])), None);
        assert_eq!(parse_line(&json!("nope")), None);
    }

    #[test]
    fn test_edge_props_split_and_restore() {
        let raw = json!({
            "u": "1", "v": 2.0, "length": "12.5", "oneway": "no",
            "osmid": 123, "name": "Rue Neuve"
        });
        let props = EdgeProps::from_properties(raw.as_object().unwrap().clone());
        assert_eq!(props.u, Some(1));
        assert_eq!(props.v, Some(2));
        assert_eq!(props.length, Some(12.5));
        assert_eq!(props.oneway, Oneway::No);
        assert_eq!(props.osmid_scalar().as_deref(), Some("123"));
        assert_eq!(props.extra.len(), 1);

        let out = props.to_properties();
        assert_eq!(out["u"], json!(1));
        assert_eq!(out["name"], json!("Rue Neuve"));
    }

    #[test]
    fn test_override_node_snap_parsing() {
        let raw = json!({
            "id": "900", "snapped_kind": "edge",
            "edge_feature_index": 3, "edge_segment_index": "1", "edge_segment_t": 0.25
        });
        let node =
            OverrideNode::from_properties(raw.as_object().unwrap().clone(), Some([0.0, 0.0]));
        assert_eq!(node.id, Some(900));
        assert_eq!(
            node.snap,
            Some(EdgeSnap {
                edge_index: 3,
                segment_index: Some(1),
                t: Some(0.25)
            })
        );
    }

    #[test]
    fn test_override_node_not_snapped_to_edge() {
        let raw = json!({"id": 5, "snapped_kind": "node", "edge_feature_index": 3});
        let node = OverrideNode::from_properties(raw.as_object().unwrap().clone(), None);
        assert!(node.snap.is_none());
        assert!(node.as_node().is_none());
    }
}
