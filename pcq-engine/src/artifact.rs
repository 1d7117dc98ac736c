use std::collections::BTreeMap;
use std::fs;
use std::io::{self, Write as _};
use std::path::Path;

use serde::Serialize;
use tempfile::NamedTempFile;

/// `index.json` payload.
#[derive(Debug, Clone, Serialize)]
pub struct IndexArtifact {
    pub id: String,
    #[serde(rename = "pointsTotal")]
    pub points_total: u64,
    pub bbox_native: Bbox,
    /// Absent when no usable CRS is declared. Axis order is [lat, lon, z].
    pub bbox_wgs84: Option<Bbox>,
    pub classes: BTreeMap<String, u64>,
    pub coordinate_system: Option<String>,
    #[serde(rename = "updatedAt")]
    pub updated_at: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Bbox {
    pub min: [f64; 3],
    pub max: [f64; 3],
}

/// `products/profile.json` payload.
#[derive(Debug, Clone, Serialize)]
pub struct ProfileArtifact {
    pub id: String,
    pub buffer_m: f64,
    pub step_m: f64,
    pub series: Vec<SeriesEntry>,
    #[serde(rename = "generatedAt")]
    pub generated_at: String,
}

/// One (bin, classification) aggregate, ordered by `s_m` then `cls`.
/// `x`/`y` are the WGS84 lon/lat of the line at that arc length.
#[derive(Debug, Clone, Serialize)]
pub struct SeriesEntry {
    pub s_m: f64,
    pub z_m: f64,
    pub cls: u8,
    pub count: u64,
    pub x: f64,
    pub y: f64,
}

/// `products/plan_points.geojson` payload.
#[derive(Debug, Clone, Serialize)]
pub struct FeatureCollection {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub features: Vec<PlanFeature>,
}

impl FeatureCollection {
    pub fn new(features: Vec<PlanFeature>) -> Self {
        Self {
            kind: "FeatureCollection",
            features,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct PlanFeature {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub geometry: PointGeometry,
    pub properties: PlanProperties,
}

#[derive(Debug, Clone, Serialize)]
pub struct PointGeometry {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub coordinates: [f64; 3],
}

#[derive(Debug, Clone, Serialize)]
pub struct PlanProperties {
    pub cls: u8,
    pub z: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub intensity: Option<u16>,
}

impl PlanFeature {
    pub fn new(lon: f64, lat: f64, z: f64, cls: u8, intensity: Option<u16>) -> Self {
        Self {
            kind: "Feature",
            geometry: PointGeometry {
                kind: "Point",
                coordinates: [lon, lat, z],
            },
            properties: PlanProperties { cls, z, intensity },
        }
    }
}

/// `products/last_error.json` payload: the failure plus the original
/// descriptor that caused it.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorArtifact {
    pub error: String,
    #[serde(rename = "failedAt")]
    pub failed_at: String,
    pub job: serde_json::Value,
}

pub fn utc_timestamp() -> String {
    chrono::Utc::now().format("%Y-%m-%dT%H:%M:%SZ").to_string()
}

/// Writes pretty JSON through a sibling temp file and an atomic rename, so a
/// reader never observes a partially written artifact.
pub fn write_json_atomic<T: Serialize>(path: &Path, payload: &T) -> io::Result<()> {
    let parent = path.parent().unwrap_or_else(|| Path::new("."));
    fs::create_dir_all(parent)?;

    let mut tmp = NamedTempFile::new_in(parent)?;
    serde_json::to_writer_pretty(&mut tmp, payload).map_err(io::Error::from)?;
    tmp.write_all(b"\n")?;
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|e| e.error)?;
    Ok(())
}
