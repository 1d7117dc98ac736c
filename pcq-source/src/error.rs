use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("point cloud file not found: {0:?}")]
    MissingFile(PathBuf),

    #[error("failed to read point cloud: {0}")]
    Las(#[from] las::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
