use std::collections::HashSet;

use rand::Rng;

use pcq_geometry::{Corridor, Polyline};
use pcq_projection::{CoordinateProjector, Direction};
use pcq_source::PointSource;

use crate::artifact::{
    utc_timestamp, FeatureCollection, PlanFeature, ProfileArtifact, SeriesEntry,
};
use crate::binner::DistanceBinner;
use crate::cancel::CancelToken;
use crate::error::EngineError;
use crate::job::JobDescriptor;
use crate::reservoir::ReservoirSampler;
use crate::CHUNK_SIZE;

/// Validated parameters of a corridor/profile query.
#[derive(Debug, Clone)]
pub struct ProfileRequest {
    /// Line vertices in WGS84 (lon, lat), at least two of them.
    pub line_wgs84: Vec<[f64; 2]>,
    pub buffer_m: f64,
    pub step_m: f64,
    pub classes: HashSet<u8>,
    pub max_plan_points: usize,
}

impl ProfileRequest {
    pub fn from_job(job: &JobDescriptor) -> Result<Self, EngineError> {
        let line = job
            .line
            .as_ref()
            .ok_or_else(|| EngineError::Input("profile job carries no line".to_string()))?;
        if line.geometry.kind != "LineString" {
            return Err(EngineError::Input(format!(
                "line geometry must be a LineString, got {}",
                line.geometry.kind
            )));
        }

        let mut vertices = Vec::with_capacity(line.geometry.coordinates.len());
        for coordinate in &line.geometry.coordinates {
            if coordinate.len() < 2 {
                return Err(EngineError::Input(
                    "line coordinates must have at least two components".to_string(),
                ));
            }
            vertices.push([coordinate[0], coordinate[1]]);
        }
        if vertices.len() < 2 {
            return Err(EngineError::Input(
                "line must have at least two vertices".to_string(),
            ));
        }

        if !(job.buffer_m > 0.0) {
            return Err(EngineError::Input("buffer_m must be positive".to_string()));
        }
        if !(job.step_m > 0.0) {
            return Err(EngineError::Input("step_m must be positive".to_string()));
        }

        Ok(Self {
            line_wgs84: vertices,
            buffer_m: job.buffer_m,
            step_m: job.step_m,
            classes: job.classes.iter().copied().collect(),
            max_plan_points: job.max_points_per_plan,
        })
    }
}

/// Everything a profile job produces: the exact, complete elevation series
/// and the bounded visualization sample. Both are views of the same filtered
/// stream.
#[derive(Debug)]
pub struct ProfileOutput {
    pub artifact: ProfileArtifact,
    pub plan: FeatureCollection,
}

/// Corridor/profile query over a single streaming pass.
pub struct ProfileExtractor {
    chunk_size: usize,
    cancel: CancelToken,
}

impl ProfileExtractor {
    pub fn new(cancel: CancelToken) -> Self {
        Self {
            chunk_size: CHUNK_SIZE,
            cancel,
        }
    }

    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size;
        self
    }

    pub fn run<S: PointSource, R: Rng>(
        &self,
        source: &mut S,
        projector: &mut CoordinateProjector,
        request: &ProfileRequest,
        job_id: &str,
        rng: R,
    ) -> Result<ProfileOutput, EngineError> {
        let line_native = projector.project_line(&request.line_wgs84, Direction::Wgs84ToNative)?;
        let line = Polyline::new(line_native);
        if line.length() <= 0.0 {
            return Err(EngineError::Input(
                "line has zero length in the native CRS".to_string(),
            ));
        }

        let corridor = Corridor::new(&line, request.buffer_m);
        let mut binner = DistanceBinner::new(request.step_m);
        let mut reservoir = ReservoirSampler::new(request.max_plan_points, rng);

        for chunk in source.chunks(self.chunk_size) {
            if self.cancel.is_cancelled() {
                return Err(EngineError::Cancelled);
            }
            for point in chunk? {
                if !request.classes.is_empty() && !request.classes.contains(&point.classification)
                {
                    continue;
                }
                if !corridor.contains(point.x, point.y) {
                    continue;
                }

                let arc_length = line.project(point.x, point.y);
                binner.admit(arc_length, point.classification, point.z);

                let [lon, lat, z] =
                    projector.project([point.x, point.y, point.z], Direction::NativeToWgs84)?;
                reservoir.offer(PlanFeature::new(
                    lon,
                    lat,
                    z,
                    point.classification,
                    point.intensity,
                ));
            }
        }

        let bins = binner.emit();
        let mut series = Vec::with_capacity(bins.len());
        for bin in bins {
            let [x_native, y_native] = line.interpolate(bin.arc_length);
            let [lon, lat, _] =
                projector.project([x_native, y_native, 0.0], Direction::NativeToWgs84)?;
            series.push(SeriesEntry {
                s_m: round3(bin.arc_length),
                z_m: round3(bin.mean_elevation),
                cls: bin.classification,
                count: bin.count,
                x: lon,
                y: lat,
            });
        }

        let artifact = ProfileArtifact {
            id: job_id.to_string(),
            buffer_m: request.buffer_m,
            step_m: request.step_m,
            series,
            generated_at: utc_timestamp(),
        };

        Ok(ProfileOutput {
            artifact,
            plan: FeatureCollection::new(reservoir.into_items()),
        })
    }
}

fn round3(value: f64) -> f64 {
    (value * 1000.0).round() / 1000.0
}
