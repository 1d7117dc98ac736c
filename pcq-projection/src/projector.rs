use std::path::Path;

use proj_crs_transformer::{CrsTransformer, Direction as ProjDirection, ProjError};

/// Which way a coordinate is carried across the CRS boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    NativeToWgs84,
    Wgs84ToNative,
}

impl Direction {
    fn to_proj(self) -> ProjDirection {
        match self {
            Direction::NativeToWgs84 => ProjDirection::Forward,
            Direction::Wgs84ToNative => ProjDirection::Inverse,
        }
    }
}

/// Non-fatal condition: a declared CRS could not be turned into a transform,
/// so the projector degraded to identity.
#[derive(Debug)]
pub struct ProjectionWarning {
    pub crs_wkt: String,
    pub reason: String,
}

impl std::fmt::Display for ProjectionWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "declared CRS could not be used ({}); falling back to identity",
            self.reason
        )
    }
}

/// Transform pair between a source's native CRS and WGS84.
///
/// The variant is selected once at construction; callers never branch on CRS
/// presence themselves. WGS84 coordinates are always (lon, lat) order.
pub enum CoordinateProjector {
    Identity,
    Projected(CrsTransformer),
}

impl CoordinateProjector {
    /// Builds a projector from an optional CRS WKT. A missing CRS yields
    /// `Identity` silently; a CRS that fails transform construction yields
    /// `Identity` plus a warning for the caller to record.
    pub fn from_wkt(
        crs_wkt: Option<&str>,
        proj_data_dir: Option<&Path>,
    ) -> (Self, Option<ProjectionWarning>) {
        let Some(wkt) = crs_wkt else {
            return (Self::Identity, None);
        };
        match CrsTransformer::to_wgs84(wkt, proj_data_dir) {
            Ok(transformer) => (Self::Projected(transformer), None),
            Err(err) => (
                Self::Identity,
                Some(ProjectionWarning {
                    crs_wkt: wkt.to_string(),
                    reason: err.to_string(),
                }),
            ),
        }
    }

    pub fn is_identity(&self) -> bool {
        matches!(self, Self::Identity)
    }

    /// Deterministic, side-effect-free coordinate transform. `z` passes
    /// through unchanged for the 2D WGS84 target.
    pub fn project(
        &mut self,
        coord: [f64; 3],
        direction: Direction,
    ) -> Result<[f64; 3], ProjError> {
        match self {
            Self::Identity => Ok(coord),
            Self::Projected(transformer) => {
                let (x, y, z) =
                    transformer.transform(coord[0], coord[1], coord[2], direction.to_proj())?;
                Ok([x, y, z])
            }
        }
    }

    /// Projects a line vertex by vertex, preserving order.
    pub fn project_line(
        &mut self,
        coords: &[[f64; 2]],
        direction: Direction,
    ) -> Result<Vec<[f64; 2]>, ProjError> {
        match self {
            Self::Identity => Ok(coords.to_vec()),
            Self::Projected(transformer) => {
                let mut buffer: Vec<[f64; 3]> =
                    coords.iter().map(|c| [c[0], c[1], 0.0]).collect();
                transformer.transform_coords_in_place(&mut buffer, direction.to_proj())?;
                Ok(buffer.iter().map(|c| [c[0], c[1]]).collect())
            }
        }
    }
}
