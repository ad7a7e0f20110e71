//! Stored document shapes for road-network nodes and edges.
//!
//! Documents are plain JSON objects. Core fields (`osmid`, `x`, `y` for
//! nodes; `u`, `v`, `key`, `length` for edges) are typed on load, the
//! `geometry` field holds a GeoJSON geometry, and every other field is kept
//! as an [`AttributeValue`] in the element's extension map.

use std::collections::BTreeMap;

use geo::{Coord, LineString, Point};
use geojson::Geometry;
use serde::Serialize;
use serde_json::{Map, Value};

use crate::error::{Error, Result};

/// A stored record: field name to JSON value.
pub type Document = Map<String, Value>;

/// Open-ended attribute map carried by nodes and edges.
pub type Attributes = BTreeMap<String, AttributeValue>;

/// Store-assigned identifier field, never copied onto graph elements.
pub const STORE_ID_FIELD: &str = "_id";

/// Field holding the GeoJSON geometry of a record.
pub const GEOMETRY_FIELD: &str = "geometry";

/// Extra attribute value copied verbatim from a document.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum AttributeValue {
    Null,
    Bool(bool),
    Integer(i64),
    Float(f64),
    Text(String),
    List(Vec<AttributeValue>),
}

impl From<Value> for AttributeValue {
    fn from(value: Value) -> Self {
        match value {
            Value::Null => AttributeValue::Null,
            Value::Bool(b) => AttributeValue::Bool(b),
            Value::Number(n) => match n.as_i64() {
                Some(i) => AttributeValue::Integer(i),
                None => n
                    .as_f64()
                    .map(AttributeValue::Float)
                    .unwrap_or_else(|| AttributeValue::Text(n.to_string())),
            },
            Value::String(s) => AttributeValue::Text(s),
            Value::Array(items) => {
                AttributeValue::List(items.into_iter().map(AttributeValue::from).collect())
            }
            // Nested objects (e.g. `{"$oid": ...}`) keep their compact JSON text.
            object @ Value::Object(_) => AttributeValue::Text(object.to_string()),
        }
    }
}

impl AttributeValue {
    /// Text content, when the attribute is a string.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            AttributeValue::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Numeric content, when the attribute is an integer or float.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            AttributeValue::Integer(i) => Some(*i as f64),
            AttributeValue::Float(f) => Some(*f),
            _ => None,
        }
    }
}

/// Remove a required integer field from a document.
pub(crate) fn take_i64(doc: &mut Document, field: &str, record: &str) -> Result<i64> {
    match doc.remove(field) {
        Some(Value::Number(n)) => n.as_i64().ok_or_else(|| {
            Error::integrity(record, format!("field '{field}' must be an integer, got {n}"))
        }),
        Some(other) => Err(Error::integrity(
            record,
            format!("field '{field}' must be an integer, got {other}"),
        )),
        None => Err(Error::integrity(
            record,
            format!("missing required field '{field}'"),
        )),
    }
}

/// Remove an optional integer field, falling back to `default` when absent.
pub(crate) fn take_i64_or(doc: &mut Document, field: &str, record: &str, default: i64) -> Result<i64> {
    if doc.contains_key(field) {
        take_i64(doc, field, record)
    } else {
        Ok(default)
    }
}

/// Remove a required finite float field from a document.
pub(crate) fn take_f64(doc: &mut Document, field: &str, record: &str) -> Result<f64> {
    let value = match doc.remove(field) {
        Some(Value::Number(n)) => n.as_f64(),
        Some(other) => {
            return Err(Error::integrity(
                record,
                format!("field '{field}' must be a number, got {other}"),
            ))
        }
        None => {
            return Err(Error::integrity(
                record,
                format!("missing required field '{field}'"),
            ))
        }
    };

    match value {
        Some(v) if v.is_finite() => Ok(v),
        _ => Err(Error::integrity(
            record,
            format!("field '{field}' must be a finite number"),
        )),
    }
}

/// Remove the GeoJSON geometry field and parse it into a point.
///
/// Returns `Ok(None)` when the field is absent or null.
pub(crate) fn take_point(doc: &mut Document, record: &str) -> Result<Option<Point<f64>>> {
    match take_geometry(doc, record)? {
        None => Ok(None),
        Some(geo::Geometry::Point(point)) => Ok(Some(point)),
        Some(other) => Err(Error::integrity(
            record,
            format!("expected Point geometry, got {}", geometry_kind(&other)),
        )),
    }
}

/// Remove the GeoJSON geometry field and parse it into a line string.
///
/// Returns `Ok(None)` when the field is absent or null.
pub(crate) fn take_line(doc: &mut Document, record: &str) -> Result<Option<LineString<f64>>> {
    match take_geometry(doc, record)? {
        None => Ok(None),
        Some(geo::Geometry::LineString(line)) if line.0.len() >= 2 => Ok(Some(line)),
        Some(geo::Geometry::LineString(_)) => Err(Error::integrity(
            record,
            "LineString geometry needs at least two coordinates",
        )),
        Some(other) => Err(Error::integrity(
            record,
            format!("expected LineString geometry, got {}", geometry_kind(&other)),
        )),
    }
}

fn take_geometry(doc: &mut Document, record: &str) -> Result<Option<geo::Geometry<f64>>> {
    let value = match doc.remove(GEOMETRY_FIELD) {
        None | Some(Value::Null) => return Ok(None),
        Some(value) => value,
    };

    let geometry: Geometry = serde_json::from_value(value)
        .map_err(|e| Error::integrity(record, format!("invalid GeoJSON geometry: {e}")))?;
    let geometry = geo::Geometry::<f64>::try_from(geometry)
        .map_err(|e| Error::integrity(record, format!("unsupported geometry: {e}")))?;
    Ok(Some(geometry))
}

fn geometry_kind(geometry: &geo::Geometry<f64>) -> &'static str {
    match geometry {
        geo::Geometry::Point(_) => "Point",
        geo::Geometry::Line(_) => "Line",
        geo::Geometry::LineString(_) => "LineString",
        geo::Geometry::Polygon(_) => "Polygon",
        geo::Geometry::MultiPoint(_) => "MultiPoint",
        geo::Geometry::MultiLineString(_) => "MultiLineString",
        geo::Geometry::MultiPolygon(_) => "MultiPolygon",
        geo::Geometry::GeometryCollection(_) => "GeometryCollection",
        geo::Geometry::Rect(_) => "Rect",
        geo::Geometry::Triangle(_) => "Triangle",
    }
}

/// Convert the remaining document fields into graph attributes.
pub(crate) fn into_attributes(doc: Document) -> Attributes {
    doc.into_iter()
        .filter(|(key, _)| key != STORE_ID_FIELD)
        .map(|(key, value)| (key, AttributeValue::from(value)))
        .collect()
}

fn geometry_value(geometry: Geometry) -> Result<Value> {
    Ok(serde_json::to_value(geometry)?)
}

/// Shape a node document ready for storage.
///
/// `attributes` are merged in first so the core fields always win.
pub fn node_document(osmid: i64, lat: f64, lon: f64, attributes: Document) -> Result<Document> {
    let mut doc = attributes;
    doc.insert("osmid".to_string(), Value::from(osmid));
    doc.insert("x".to_string(), Value::from(lon));
    doc.insert("y".to_string(), Value::from(lat));
    let point = Point::new(lon, lat);
    doc.insert(
        GEOMETRY_FIELD.to_string(),
        geometry_value(Geometry::new((&point).into()))?,
    );
    Ok(doc)
}

/// Shape an edge document ready for storage.
///
/// `coords` are `(longitude, latitude)` pairs in travel order.
pub fn edge_document(
    u: i64,
    v: i64,
    key: i64,
    length: f64,
    coords: &[(f64, f64)],
    attributes: Document,
) -> Result<Document> {
    let mut doc = attributes;
    doc.insert("u".to_string(), Value::from(u));
    doc.insert("v".to_string(), Value::from(v));
    doc.insert("key".to_string(), Value::from(key));
    doc.insert("length".to_string(), Value::from(length));
    let line: LineString<f64> = coords.iter().map(|&(x, y)| Coord { x, y }).collect();
    doc.insert(
        GEOMETRY_FIELD.to_string(),
        geometry_value(Geometry::new((&line).into()))?,
    );
    Ok(doc)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn doc(value: Value) -> Document {
        match value {
            Value::Object(map) => map,
            _ => panic!("fixture must be an object"),
        }
    }

    #[test]
    fn attribute_values_keep_scalar_types() {
        assert_eq!(AttributeValue::from(json!(3)), AttributeValue::Integer(3));
        assert_eq!(AttributeValue::from(json!(2.5)), AttributeValue::Float(2.5));
        assert_eq!(
            AttributeValue::from(json!("primary")),
            AttributeValue::Text("primary".to_string())
        );
        assert_eq!(AttributeValue::from(json!(null)), AttributeValue::Null);
    }

    #[test]
    fn nested_objects_become_json_text() {
        let value = AttributeValue::from(json!({"$oid": "abc"}));
        assert_eq!(value.as_str(), Some(r#"{"$oid":"abc"}"#));
    }

    #[test]
    fn lists_are_converted_elementwise() {
        let value = AttributeValue::from(json!(["residential", 4]));
        assert_eq!(
            value,
            AttributeValue::List(vec![
                AttributeValue::Text("residential".to_string()),
                AttributeValue::Integer(4),
            ])
        );
    }

    #[test]
    fn take_point_parses_geojson() {
        let mut d = doc(json!({"geometry": {"type": "Point", "coordinates": [106.7, 10.8]}}));
        let point = take_point(&mut d, "node 1").unwrap().unwrap();
        assert_eq!(point.x(), 106.7);
        assert_eq!(point.y(), 10.8);
        assert!(d.is_empty());
    }

    #[test]
    fn take_point_rejects_wrong_geometry_type() {
        let mut d = doc(json!({"geometry": {"type": "LineString", "coordinates": [[0.0, 0.0], [1.0, 1.0]]}}));
        let err = take_point(&mut d, "node 1").unwrap_err();
        assert!(err.to_string().contains("expected Point"));
    }

    #[test]
    fn take_line_rejects_garbage() {
        let mut d = doc(json!({"geometry": {"type": "LineString", "coordinates": "nope"}}));
        assert!(matches!(
            take_line(&mut d, "edge 1->2"),
            Err(Error::DataIntegrity { .. })
        ));
    }

    #[test]
    fn missing_geometry_is_none() {
        let mut d = doc(json!({"geometry": null}));
        assert!(take_line(&mut d, "edge").unwrap().is_none());
    }

    #[test]
    fn take_f64_rejects_strings() {
        let mut d = doc(json!({"length": "12.5"}));
        assert!(take_f64(&mut d, "length", "edge").is_err());
    }

    #[test]
    fn store_id_is_dropped_from_attributes() {
        let attrs = into_attributes(doc(json!({"_id": {"$oid": "x"}, "highway": "primary"})));
        assert_eq!(attrs.len(), 1);
        assert_eq!(attrs["highway"].as_str(), Some("primary"));
    }

    #[test]
    fn node_document_round_trips_through_parsing() {
        let mut d = node_document(42, 10.8, 106.7, Document::new()).unwrap();
        assert_eq!(d["osmid"], json!(42));
        let point = take_point(&mut d, "node 42").unwrap().unwrap();
        assert_eq!((point.x(), point.y()), (106.7, 10.8));
    }

    #[test]
    fn edge_document_shapes_line_geometry() {
        let d = edge_document(1, 2, 0, 15.0, &[(0.0, 0.0), (0.5, 0.5)], Document::new()).unwrap();
        assert_eq!(d["geometry"]["type"], json!("LineString"));
        assert_eq!(d["geometry"]["coordinates"], json!([[0.0, 0.0], [0.5, 0.5]]));
    }
}
