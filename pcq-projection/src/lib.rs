mod projector;

pub use proj_crs_transformer::ProjError;
pub use projector::{CoordinateProjector, Direction, ProjectionWarning};
