pub mod error;
pub mod reader;

pub use error::SourceError;
pub use reader::las::LasSource;
pub use reader::{Chunks, PointSource};
