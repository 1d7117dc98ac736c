/// A single point in the source's native coordinate reference system.
///
/// Points are never materialized for a whole dataset; they exist only inside
/// the chunk buffer currently being streamed.
#[derive(Debug, Clone, PartialEq)]
pub struct Point {
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub classification: u8,
    pub intensity: Option<u16>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct BoundingVolume {
    pub min: [f64; 3],
    pub max: [f64; 3],
}

/// Header-level metadata, read once per job.
///
/// The LAS format guarantees header min/max, so the bounding volume is taken
/// from the header and never recomputed from the stream.
#[derive(Debug, Clone, Default)]
pub struct SourceMetadata {
    pub point_count: u64,
    pub bounding_volume: BoundingVolume,
    pub crs_wkt: Option<String>,
}
