use std::path::{Path, PathBuf};

use las::Reader;

use pcq_core::pointcloud::point::{BoundingVolume, Point, SourceMetadata};

use super::PointSource;
use crate::error::SourceError;

// LAS 1.4 coordinate system WKT record.
const PROJECTION_USER_ID: &str = "LASF_Projection";
const WKT_RECORD_ID: u16 = 2112;

/// A LAS/LAZ file opened for one streaming pass.
pub struct LasSource {
    reader: Reader,
    metadata: SourceMetadata,
}

impl std::fmt::Debug for LasSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LasSource")
            .field("metadata", &self.metadata)
            .finish_non_exhaustive()
    }
}

impl LasSource {
    pub fn open(path: &Path) -> Result<Self, SourceError> {
        if !path.exists() {
            return Err(SourceError::MissingFile(path.to_path_buf()));
        }

        let reader = Reader::from_path(path)?;
        let header = reader.header();
        let bounds = header.bounds();
        let metadata = SourceMetadata {
            point_count: header.number_of_points(),
            bounding_volume: BoundingVolume {
                min: [bounds.min.x, bounds.min.y, bounds.min.z],
                max: [bounds.max.x, bounds.max.y, bounds.max.z],
            },
            crs_wkt: wkt_from_header(header),
        };

        Ok(Self { reader, metadata })
    }

    /// Locates the raw capture inside a dataset directory.
    pub fn find_raw(dataset_dir: &Path) -> Option<PathBuf> {
        ["las", "laz"]
            .iter()
            .map(|ext| dataset_dir.join(format!("raw.{ext}")))
            .find(|candidate| candidate.exists())
    }

    fn convert_las_point(las_point: las::Point) -> Point {
        Point {
            x: las_point.x,
            y: las_point.y,
            z: las_point.z,
            classification: u8::from(las_point.classification),
            intensity: Some(las_point.intensity),
        }
    }
}

impl PointSource for LasSource {
    fn metadata(&self) -> &SourceMetadata {
        &self.metadata
    }

    fn next_point(&mut self) -> Result<Option<Point>, SourceError> {
        match self.reader.points().next() {
            Some(Ok(las_point)) => Ok(Some(Self::convert_las_point(las_point))),
            Some(Err(e)) => Err(SourceError::Las(e)),
            None => Ok(None),
        }
    }
}

fn wkt_from_header(header: &las::Header) -> Option<String> {
    header
        .vlrs()
        .iter()
        .chain(header.evlrs().iter())
        .find(|vlr| vlr.user_id == PROJECTION_USER_ID && vlr.record_id == WKT_RECORD_ID)
        .map(|vlr| {
            String::from_utf8_lossy(&vlr.data)
                .trim_end_matches('\0')
                .trim()
                .to_string()
        })
        .filter(|wkt| !wkt.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn header_with_vlr(user_id: &str, record_id: u16, data: &[u8]) -> las::Header {
        let mut builder = las::Builder::from((1, 4));
        builder.vlrs.push(las::Vlr {
            user_id: user_id.to_string(),
            record_id,
            description: String::new(),
            data: data.to_vec(),
        });
        builder.into_header().unwrap()
    }

    #[test]
    fn extracts_wkt_from_projection_vlr() {
        let header = header_with_vlr(PROJECTION_USER_ID, WKT_RECORD_ID, b"PROJCS[\"test\"]\0\0");
        assert_eq!(wkt_from_header(&header), Some("PROJCS[\"test\"]".to_string()));
    }

    #[test]
    fn ignores_unrelated_vlrs_and_empty_wkt() {
        let header = header_with_vlr("LASF_Spec", 0, b"whatever");
        assert_eq!(wkt_from_header(&header), None);

        let header = header_with_vlr(PROJECTION_USER_ID, WKT_RECORD_ID, b"\0\0\0");
        assert_eq!(wkt_from_header(&header), None);
    }
}
