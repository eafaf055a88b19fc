//! Raw catalog rows as they arrive from upstream feeds.
//!
//! Three container formats are accepted: a JSON array of row objects, JSON
//! lines, and a GeoJSON `FeatureCollection` as served by the USGS event API.
//! A row that fails to decode is kept as [`RawEntry::Malformed`] so the
//! ingestor can count it against the reject threshold.

use chrono::{DateTime, NaiveDateTime, Utc};
use qc_common::{Error, Result};
use serde::{Deserialize, Serialize};

/// Origin time as either text or epoch milliseconds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawTime {
    EpochMillis(i64),
    EpochMillisFloat(f64),
    Text(String),
}

impl RawTime {
    /// Parse to a UTC instant truncated to whole seconds.
    ///
    /// Text without an offset is taken as UTC.
    pub fn to_utc(&self) -> std::result::Result<DateTime<Utc>, String> {
        let parsed = match self {
            RawTime::EpochMillis(ms) => DateTime::from_timestamp_millis(*ms)
                .ok_or_else(|| format!("epoch milliseconds out of range: {ms}"))?,
            RawTime::EpochMillisFloat(ms) => {
                if !ms.is_finite() {
                    return Err(format!("non-finite epoch milliseconds: {ms}"));
                }
                DateTime::from_timestamp_millis(ms.round() as i64)
                    .ok_or_else(|| format!("epoch milliseconds out of range: {ms}"))?
            }
            RawTime::Text(s) => parse_text_time(s.trim())?,
        };
        DateTime::from_timestamp(parsed.timestamp(), 0)
            .ok_or_else(|| format!("timestamp out of range: {parsed}"))
    }
}

fn parse_text_time(s: &str) -> std::result::Result<DateTime<Utc>, String> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.with_timezone(&Utc));
    }
    for fmt in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, fmt) {
            return Ok(naive.and_utc());
        }
    }
    Err(format!("unparseable time {s:?}"))
}

/// One catalog row before normalization. Every field is optional so that
/// missing values surface as row-level rejections instead of a batch-wide
/// decode failure.
///
/// Feeds spell fields differently (`lat`, `mag`, `magType`, `source_id`).
/// When one row carries several spellings of the same field, the canonical
/// name wins, then the aliases in the order below.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "RowSpellings")]
pub struct RawRow {
    pub id: Option<String>,
    pub time: Option<RawTime>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub depth: Option<f64>,
    pub magnitude: Option<f64>,
    pub magnitude_type: Option<String>,
}

/// Every accepted spelling of a row field, each decoded on its own.
#[derive(Debug, Default, Deserialize)]
struct RowSpellings {
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    event_id: Option<String>,
    #[serde(default)]
    source_id: Option<String>,
    #[serde(default)]
    time: Option<RawTime>,
    #[serde(default)]
    latitude: Option<f64>,
    #[serde(default)]
    lat: Option<f64>,
    #[serde(default)]
    longitude: Option<f64>,
    #[serde(default)]
    lon: Option<f64>,
    #[serde(default)]
    lng: Option<f64>,
    #[serde(default)]
    depth: Option<f64>,
    #[serde(default)]
    depth_km: Option<f64>,
    #[serde(default)]
    magnitude: Option<f64>,
    #[serde(default)]
    mag: Option<f64>,
    #[serde(default)]
    magnitude_type: Option<String>,
    #[serde(default, rename = "magType")]
    mag_type_camel: Option<String>,
    #[serde(default)]
    mag_type: Option<String>,
}

impl From<RowSpellings> for RawRow {
    fn from(s: RowSpellings) -> Self {
        RawRow {
            id: s.id.or(s.event_id).or(s.source_id),
            time: s.time,
            latitude: s.latitude.or(s.lat),
            longitude: s.longitude.or(s.lon).or(s.lng),
            depth: s.depth.or(s.depth_km),
            magnitude: s.magnitude.or(s.mag),
            magnitude_type: s.magnitude_type.or(s.mag_type_camel).or(s.mag_type),
        }
    }
}

/// A decoded row or the reason it could not be decoded.
#[derive(Debug, Clone, PartialEq)]
pub enum RawEntry {
    Row(RawRow),
    Malformed(String),
}

impl From<RawRow> for RawEntry {
    fn from(row: RawRow) -> Self {
        RawEntry::Row(row)
    }
}

#[derive(Debug, Deserialize)]
struct FeatureCollection {
    features: Vec<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct Feature {
    #[serde(default)]
    id: Option<serde_json::Value>,
    #[serde(default)]
    properties: FeatureProperties,
    #[serde(default)]
    geometry: Option<Geometry>,
}

#[derive(Debug, Default, Deserialize)]
struct FeatureProperties {
    #[serde(default)]
    time: Option<RawTime>,
    #[serde(default)]
    mag: Option<f64>,
    #[serde(default, rename = "magType")]
    mag_type: Option<String>,
    #[serde(default)]
    ids: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Geometry {
    coordinates: Vec<Option<f64>>,
}

fn flatten_feature(value: serde_json::Value) -> RawEntry {
    let feature: Feature = match serde_json::from_value(value) {
        Ok(f) => f,
        Err(e) => return RawEntry::Malformed(format!("feature: {e}")),
    };
    let coord = |i: usize| {
        feature
            .geometry
            .as_ref()
            .and_then(|g| g.coordinates.get(i).copied().flatten())
    };
    let id = match feature.id {
        Some(serde_json::Value::String(s)) => Some(s),
        Some(serde_json::Value::Number(n)) => Some(n.to_string()),
        _ => feature
            .properties
            .ids
            .as_deref()
            .and_then(|ids| ids.split(',').find(|s| !s.is_empty()))
            .map(str::to_string),
    };
    RawEntry::Row(RawRow {
        id,
        time: feature.properties.time,
        longitude: coord(0),
        latitude: coord(1),
        depth: coord(2),
        magnitude: feature.properties.mag,
        magnitude_type: feature.properties.mag_type,
    })
}

fn decode_row(value: serde_json::Value) -> RawEntry {
    match serde_json::from_value::<RawRow>(value) {
        Ok(row) => RawEntry::Row(row),
        Err(e) => RawEntry::Malformed(e.to_string()),
    }
}

/// Decode a catalog document into entries, detecting the container format.
///
/// Fails only when the document as a whole is unreadable; individual bad
/// rows become [`RawEntry::Malformed`].
pub fn parse_catalog(text: &str) -> Result<Vec<RawEntry>> {
    let trimmed = text.trim_start();
    if trimmed.is_empty() {
        return Ok(Vec::new());
    }
    if trimmed.starts_with('[') {
        let values: Vec<serde_json::Value> = serde_json::from_str(text)?;
        return Ok(values.into_iter().map(decode_row).collect());
    }

    // A single object is either a FeatureCollection or the first JSON line.
    if let Ok(doc) = serde_json::from_str::<serde_json::Value>(text) {
        if doc.get("type").and_then(|t| t.as_str()) == Some("FeatureCollection") {
            let fc: FeatureCollection = serde_json::from_value(doc)?;
            return Ok(fc.features.into_iter().map(flatten_feature).collect());
        }
        if doc.is_object() {
            return Ok(vec![decode_row(doc)]);
        }
        return Err(Error::DataQuality {
            row: None,
            reason: "catalog must be a JSON array, JSON lines or a GeoJSON FeatureCollection"
                .to_string(),
        });
    }

    Ok(text
        .lines()
        .filter(|l| !l.trim().is_empty())
        .map(|line| match serde_json::from_str::<serde_json::Value>(line) {
            Ok(v) => decode_row(v),
            Err(e) => RawEntry::Malformed(e.to_string()),
        })
        .collect())
}

/// Read and decode a catalog file.
pub fn read_catalog(path: &std::path::Path) -> Result<Vec<RawEntry>> {
    let text = std::fs::read_to_string(path)?;
    parse_catalog(&text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn row(entry: &RawEntry) -> &RawRow {
        match entry {
            RawEntry::Row(r) => r,
            RawEntry::Malformed(e) => panic!("malformed: {e}"),
        }
    }

    #[test]
    fn time_accepts_iso_and_epoch_millis() {
        let want = Utc.with_ymd_and_hms(2021, 3, 4, 5, 6, 7).unwrap();
        assert_eq!(RawTime::Text("2021-03-04T05:06:07.890Z".into()).to_utc().unwrap(), want);
        assert_eq!(RawTime::Text("2021-03-04 05:06:07".into()).to_utc().unwrap(), want);
        assert_eq!(RawTime::EpochMillis(want.timestamp_millis() + 450).to_utc().unwrap(), want);
        assert!(RawTime::Text("yesterday".into()).to_utc().is_err());
    }

    #[test]
    fn aliases_are_accepted() {
        let entries = parse_catalog(
            r#"[{"source_id":"a1","time":1609459200000,"lat":10,"lon":20,"depth_km":5,"mag":4.5,"magType":"mb"}]"#,
        )
        .unwrap();
        let r = row(&entries[0]);
        assert_eq!(r.id.as_deref(), Some("a1"));
        assert_eq!(r.depth, Some(5.0));
        assert_eq!(r.magnitude_type.as_deref(), Some("mb"));
        assert_eq!(r.time, Some(RawTime::EpochMillis(1_609_459_200_000)));
    }

    #[test]
    fn canonical_spelling_wins_over_aliases() {
        let entries = parse_catalog(
            r#"[{"id":"us1","source_id":"ci2","event_id":"nc3","lat":1.0,"latitude":2.0,"mag":4.0,"magnitude":4.4,"magType":"ml","mag_type":"md"}]"#,
        )
        .unwrap();
        let r = row(&entries[0]);
        assert_eq!(r.id.as_deref(), Some("us1"));
        assert_eq!(r.latitude, Some(2.0));
        assert_eq!(r.magnitude, Some(4.4));
        assert_eq!(r.magnitude_type.as_deref(), Some("ml"));

        let entries = parse_catalog(r#"[{"source_id":"ci2","event_id":"nc3","lon":5.0,"lng":6.0}]"#).unwrap();
        let r = row(&entries[0]);
        assert_eq!(r.id.as_deref(), Some("nc3"));
        assert_eq!(r.longitude, Some(5.0));
    }

    #[test]
    fn bad_rows_in_array_are_kept_as_malformed() {
        let entries = parse_catalog(r#"[{"id":"ok","mag":3.0}, {"mag":"big"}]"#).unwrap();
        assert!(matches!(entries[0], RawEntry::Row(_)));
        assert!(matches!(entries[1], RawEntry::Malformed(_)));
    }

    #[test]
    fn json_lines_are_decoded_line_by_line() {
        let text = "{\"id\":\"a\",\"mag\":3.1}\nnot json\n\n{\"id\":\"b\",\"mag\":3.2}\n";
        let entries = parse_catalog(text).unwrap();
        assert_eq!(entries.len(), 3);
        assert!(matches!(entries[1], RawEntry::Malformed(_)));
        assert_eq!(row(&entries[2]).id.as_deref(), Some("b"));
    }

    #[test]
    fn geojson_is_flattened() {
        let text = r#"{
            "type": "FeatureCollection",
            "features": [{
                "type": "Feature",
                "id": "us7000abcd",
                "properties": {"time": 1609459200000, "mag": 6.1, "magType": "mww"},
                "geometry": {"type": "Point", "coordinates": [142.3, 38.1, 35.0]}
            }]
        }"#;
        let entries = parse_catalog(text).unwrap();
        let r = row(&entries[0]);
        assert_eq!(r.id.as_deref(), Some("us7000abcd"));
        assert_eq!(r.longitude, Some(142.3));
        assert_eq!(r.latitude, Some(38.1));
        assert_eq!(r.depth, Some(35.0));
        assert_eq!(r.magnitude_type.as_deref(), Some("mww"));
    }

    #[test]
    fn single_object_is_one_row() {
        let entries = parse_catalog(r#"{"id":"x","mag":2.0}"#).unwrap();
        assert_eq!(entries.len(), 1);
        assert!(parse_catalog("42").is_err());
        assert!(parse_catalog("   ").unwrap().is_empty());
    }

    #[test]
    fn read_catalog_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("catalog.jsonl");
        std::fs::write(&path, "{\"id\":\"a\",\"mag\":3.1}\n").unwrap();
        assert_eq!(read_catalog(&path).unwrap().len(), 1);
        assert!(read_catalog(&dir.path().join("missing.json")).is_err());
    }
}
