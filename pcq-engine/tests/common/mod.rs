#![allow(dead_code)]

use pcq_core::pointcloud::point::{BoundingVolume, Point, SourceMetadata};
use pcq_source::{PointSource, SourceError};

/// In-memory stand-in for a LAS source.
pub struct MemorySource {
    points: Vec<Point>,
    cursor: usize,
    metadata: SourceMetadata,
}

impl MemorySource {
    pub fn new(points: Vec<Point>) -> Self {
        let mut bounding_volume = BoundingVolume {
            min: [f64::MAX; 3],
            max: [f64::MIN; 3],
        };
        for point in &points {
            bounding_volume.min[0] = bounding_volume.min[0].min(point.x);
            bounding_volume.min[1] = bounding_volume.min[1].min(point.y);
            bounding_volume.min[2] = bounding_volume.min[2].min(point.z);
            bounding_volume.max[0] = bounding_volume.max[0].max(point.x);
            bounding_volume.max[1] = bounding_volume.max[1].max(point.y);
            bounding_volume.max[2] = bounding_volume.max[2].max(point.z);
        }
        let metadata = SourceMetadata {
            point_count: points.len() as u64,
            bounding_volume,
            crs_wkt: None,
        };
        Self {
            points,
            cursor: 0,
            metadata,
        }
    }
}

impl PointSource for MemorySource {
    fn metadata(&self) -> &SourceMetadata {
        &self.metadata
    }

    fn next_point(&mut self) -> Result<Option<Point>, SourceError> {
        let point = self.points.get(self.cursor).cloned();
        if point.is_some() {
            self.cursor += 1;
        }
        Ok(point)
    }
}

pub fn point(x: f64, y: f64, z: f64, classification: u8) -> Point {
    Point {
        x,
        y,
        z,
        classification,
        intensity: Some(0),
    }
}
