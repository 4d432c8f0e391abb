use anyhow::{Context, Result, anyhow, bail};
use geo::{Coord, Geometry, LineString, MultiPoint, MultiPolygon, Point, Polygon};
use serde_json::{Map, Value, json};

use crate::{error::ScoreError, records::{Record, SpatialRecordSet}};

/// Write a record set to GeoJSON FeatureCollection bytes.
pub(crate) fn write_records_to_geojson_bytes(set: &SpatialRecordSet) -> Result<Vec<u8>> {
    let features: Vec<Value> = set.iter().map(|record| {
        json!({
            "type": "Feature",
            "id": record.id,
            "geometry": record.geometry.as_ref().map(geometry_to_geojson).unwrap_or(Value::Null),
            "properties": Value::Object(record.attributes.clone()),
        })
    }).collect();

    let feature_collection = json!({
        "type": "FeatureCollection",
        "name": set.name(),
        "features": features,
    });

    serde_json::to_vec(&feature_collection).context("Failed to serialize GeoJSON to bytes")
}

/// Read a record set from GeoJSON FeatureCollection bytes.
pub(crate) fn read_records_from_geojson_bytes(bytes: &[u8], name: &str, id_column: Option<&str>) -> Result<SpatialRecordSet> {
    let value: Value = serde_json::from_slice(bytes).context("Failed to parse GeoJSON bytes")?;
    let features = value["features"].as_array()
        .ok_or_else(|| anyhow!("GeoJSON has no `features` array"))?;

    let mut records = Vec::with_capacity(features.len());
    for (idx, feature) in features.iter().enumerate() {
        let attributes = match &feature["properties"] {
            Value::Object(map) => map.clone(),
            _ => Map::new(),
        };
        let geometry = match &feature["geometry"] {
            Value::Null => None,
            g => Some(geometry_from_geojson(g).with_context(|| format!("feature {idx}"))?),
        };

        let mut record = Record { id: String::new(), attributes, geometry };
        record.id = match id_column {
            Some(column) => record.str(column).ok_or_else(|| ScoreError::schema(name, column))?,
            None => match &feature["id"] {
                Value::String(s) => s.clone(),
                Value::Number(n) => n.to_string(),
                _ => idx.to_string(),
            },
        };
        records.push(record);
    }

    Ok(SpatialRecordSet::new(name, records))
}

fn coord_to_json(c: &Coord<f64>) -> Value { json!([c.x, c.y]) }

fn ring_to_json(ls: &LineString<f64>) -> Value {
    Value::Array(ls.coords().map(coord_to_json).collect())
}

fn polygon_to_json(p: &Polygon<f64>) -> Value {
    Value::Array(std::iter::once(p.exterior()).chain(p.interiors()).map(ring_to_json).collect())
}

/// Convert a geometry into a standard GeoJSON geometry object.
fn geometry_to_geojson(geometry: &Geometry<f64>) -> Value {
    match geometry {
        Geometry::Point(p) => json!({ "type": "Point", "coordinates": coord_to_json(&p.0) }),
        Geometry::MultiPoint(mp) => json!({
            "type": "MultiPoint",
            "coordinates": mp.0.iter().map(|p| coord_to_json(&p.0)).collect::<Vec<_>>(),
        }),
        Geometry::LineString(ls) => json!({ "type": "LineString", "coordinates": ring_to_json(ls) }),
        Geometry::Polygon(p) => json!({ "type": "Polygon", "coordinates": polygon_to_json(p) }),
        Geometry::MultiPolygon(mp) => json!({
            "type": "MultiPolygon",
            "coordinates": mp.0.iter().map(polygon_to_json).collect::<Vec<_>>(),
        }),
        _ => Value::Null,
    }
}

/// Parse a GeoJSON geometry object.
fn geometry_from_geojson(value: &Value) -> Result<Geometry<f64>> {
    let coords = &value["coordinates"];
    Ok(match value["type"].as_str() {
        Some("Point") => Geometry::Point(Point(parse_coord(coords)?)),
        Some("MultiPoint") => Geometry::MultiPoint(MultiPoint(
            as_array(coords)?.iter().map(|c| parse_coord(c).map(Point)).collect::<Result<_>>()?
        )),
        Some("LineString") => Geometry::LineString(LineString(
            as_array(coords)?.iter().map(parse_coord).collect::<Result<_>>()?
        )),
        Some("Polygon") => Geometry::Polygon(parse_polygon(coords)?),
        Some("MultiPolygon") => Geometry::MultiPolygon(MultiPolygon(
            as_array(coords)?.iter().map(parse_polygon).collect::<Result<_>>()?
        )),
        Some(other) => bail!("Unsupported GeoJSON geometry type: {other}"),
        None => bail!("GeoJSON geometry has no type"),
    })
}

fn as_array(value: &Value) -> Result<&Vec<Value>> {
    value.as_array().ok_or_else(|| anyhow!("Invalid GeoJSON: expected an array, got {value}"))
}

/// Parse `[x, y, ...]`; extra ordinates are ignored.
fn parse_coord(value: &Value) -> Result<Coord<f64>> {
    let pair = as_array(value)?;
    let x = pair.first().and_then(Value::as_f64)
        .ok_or_else(|| anyhow!("Invalid coordinate: x must be a number"))?;
    let y = pair.get(1).and_then(Value::as_f64)
        .ok_or_else(|| anyhow!("Invalid coordinate: y must be a number"))?;
    Ok(Coord { x, y })
}

/// Parse a ring, closing it when the first and last points differ.
fn parse_ring(value: &Value) -> Result<LineString<f64>> {
    let mut points = as_array(value)?.iter().map(parse_coord).collect::<Result<Vec<_>>>()?;
    if let (Some(&first), Some(&last)) = (points.first(), points.last()) {
        if first != last { points.push(first) }
    }
    Ok(LineString(points))
}

fn parse_polygon(value: &Value) -> Result<Polygon<f64>> {
    let rings = as_array(value)?;
    let exterior = rings.first()
        .ok_or_else(|| anyhow!("Invalid Polygon: missing exterior ring"))
        .and_then(parse_ring)?;
    let interiors = rings[1..].iter().map(parse_ring).collect::<Result<Vec<_>>>()?;
    Ok(Polygon::new(exterior, interiors))
}

#[cfg(test)]
mod tests {
    use geo::{Rect, coord};

    use super::*;

    #[test]
    fn features_keep_ids_properties_and_geometry() {
        let mut a = Record::new("c1").with_geometry(MultiPolygon(vec![
            Rect::new(coord! { x: 0.0, y: 0.0 }, coord! { x: 1.0, y: 1.0 }).to_polygon(),
        ]));
        a.set("cell_id", "c1").set("mean", Value::Null);
        let mut b = Record::new("c2").with_geometry(Point::new(3.0, 4.0));
        b.set("cell_id", "c2").set("mean", 7.5);
        let set = SpatialRecordSet::new("zonal", vec![a, b]);

        let bytes = write_records_to_geojson_bytes(&set).unwrap();
        let back = read_records_from_geojson_bytes(&bytes, "zonal", Some("cell_id")).unwrap();
        assert_eq!(back, set);
        assert_eq!(back.records()[0].f64("mean"), None);
    }

    #[test]
    fn standard_polygon_rings_are_parsed() {
        let doc = br#"{"type":"FeatureCollection","features":[
            {"type":"Feature","properties":{"fclass":"grass"},
             "geometry":{"type":"Polygon","coordinates":[[[0,0],[2,0],[2,2],[0,2]],[[0.5,0.5],[1,0.5],[1,1],[0.5,0.5]]]}}
        ]}"#;
        let set = read_records_from_geojson_bytes(doc, "land", None).unwrap();
        let record = &set.records()[0];
        assert_eq!(record.id, "0");
        match &record.geometry {
            Some(Geometry::Polygon(p)) => {
                assert_eq!(p.exterior().0.len(), 5);
                assert_eq!(p.interiors().len(), 1);
            }
            other => panic!("unexpected geometry: {other:?}"),
        }
    }

    #[test]
    fn missing_id_column_is_schema_error() {
        let doc = br#"{"type":"FeatureCollection","features":[{"type":"Feature","properties":{},"geometry":null}]}"#;
        let err = read_records_from_geojson_bytes(doc, "dso_facilities", Some("dso_id")).unwrap_err();
        assert!(matches!(err.downcast_ref::<ScoreError>(), Some(ScoreError::Schema { .. })));
    }
}
