use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// A pending job, as dropped into `<dataset>/queue/<id>.json`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobDescriptor {
    pub id: String,

    #[serde(rename = "type")]
    pub kind: JobKind,

    #[serde(rename = "inputFile")]
    pub input_file: PathBuf,

    #[serde(default)]
    pub line: Option<LineFeature>,

    /// Corridor half-width in meters (native linear units).
    #[serde(default = "default_buffer_m")]
    pub buffer_m: f64,

    /// Profile bin length in meters along the line.
    #[serde(default = "default_step_m")]
    pub step_m: f64,

    /// Accepted classification codes; empty accepts everything.
    #[serde(default)]
    pub classes: Vec<u8>,

    /// Visualization sample capacity.
    #[serde(default = "default_max_points_per_plan")]
    pub max_points_per_plan: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobKind {
    Index,
    Profile,
    #[serde(other)]
    Unknown,
}

/// GeoJSON `LineString` feature carried by profile jobs, in WGS84.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LineFeature {
    pub geometry: LineGeometry,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LineGeometry {
    #[serde(rename = "type")]
    pub kind: String,
    pub coordinates: Vec<Vec<f64>>,
}

fn default_buffer_m() -> f64 {
    25.0
}

fn default_step_m() -> f64 {
    0.5
}

fn default_max_points_per_plan() -> usize {
    200_000
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_a_full_profile_descriptor() {
        let raw = r#"{
            "id": "job-1", "type": "profile", "inputFile": "/data/ds/raw.laz",
            "line": {"type": "Feature", "geometry": {"type": "LineString",
                     "coordinates": [[-47.1, -15.8], [-47.2, -15.9]]}},
            "buffer_m": 25, "step_m": 0.5, "classes": [2, 6],
            "max_points_per_plan": 200000
        }"#;
        let job: JobDescriptor = serde_json::from_str(raw).unwrap();
        assert_eq!(job.kind, JobKind::Profile);
        assert_eq!(job.classes, vec![2, 6]);
        assert_eq!(job.max_points_per_plan, 200_000);
        let line = job.line.unwrap();
        assert_eq!(line.geometry.kind, "LineString");
        assert_eq!(line.geometry.coordinates.len(), 2);
    }

    #[test]
    fn profile_fields_have_worker_defaults() {
        let raw = r#"{"id": "job-2", "type": "profile", "inputFile": "raw.las"}"#;
        let job: JobDescriptor = serde_json::from_str(raw).unwrap();
        assert_eq!(job.buffer_m, 25.0);
        assert_eq!(job.step_m, 0.5);
        assert!(job.classes.is_empty());
        assert_eq!(job.max_points_per_plan, 200_000);
        assert!(job.line.is_none());
    }

    #[test]
    fn unrecognized_types_map_to_unknown() {
        let raw = r#"{"id": "job-3", "type": "reticulate", "inputFile": "raw.las"}"#;
        let job: JobDescriptor = serde_json::from_str(raw).unwrap();
        assert_eq!(job.kind, JobKind::Unknown);
    }
}
