use std::collections::BTreeMap;

use pcq_projection::{CoordinateProjector, Direction};
use pcq_source::PointSource;

use crate::artifact::{utc_timestamp, Bbox, IndexArtifact};
use crate::cancel::CancelToken;
use crate::error::EngineError;
use crate::CHUNK_SIZE;

/// Dataset-wide summary: classification histogram plus native and geographic
/// bounding boxes, built in a single streaming pass.
pub struct IndexBuilder {
    chunk_size: usize,
    cancel: CancelToken,
}

impl IndexBuilder {
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

    pub fn build<S: PointSource>(
        &self,
        source: &mut S,
        projector: &mut CoordinateProjector,
        job_id: &str,
    ) -> Result<IndexArtifact, EngineError> {
        let metadata = source.metadata().clone();

        let mut classes: BTreeMap<u8, u64> = BTreeMap::new();
        for chunk in source.chunks(self.chunk_size) {
            if self.cancel.is_cancelled() {
                return Err(EngineError::Cancelled);
            }
            for point in chunk? {
                *classes.entry(point.classification).or_insert(0) += 1;
            }
        }

        let bbox_native = Bbox {
            min: metadata.bounding_volume.min,
            max: metadata.bounding_volume.max,
        };
        let bbox_wgs84 = wgs84_bbox(projector, &bbox_native)?;

        Ok(IndexArtifact {
            id: job_id.to_string(),
            points_total: metadata.point_count,
            bbox_native,
            bbox_wgs84,
            classes: classes
                .into_iter()
                .map(|(code, count)| (code.to_string(), count))
                .collect(),
            coordinate_system: metadata.crs_wkt,
            updated_at: utc_timestamp(),
        })
    }
}

// Projects only the two native corner points, which is an approximation when
// the reprojection is not axis-aligned. Identity projectors (no usable CRS)
// yield no geographic bbox at all.
fn wgs84_bbox(
    projector: &mut CoordinateProjector,
    native: &Bbox,
) -> Result<Option<Bbox>, EngineError> {
    if projector.is_identity() {
        return Ok(None);
    }
    let [min_lon, min_lat, min_z] = projector.project(native.min, Direction::NativeToWgs84)?;
    let [max_lon, max_lat, max_z] = projector.project(native.max, Direction::NativeToWgs84)?;
    Ok(Some(Bbox {
        min: [min_lat, min_lon, min_z],
        max: [max_lat, max_lon, max_z],
    }))
}
