//! Errors surfaced by the server binary outside the HTTP path.

use std::path::PathBuf;

use feature_detector::DetectorError;
use thiserror::Error;

pub type ServerResult<T> = Result<T, ServerError>;

#[derive(Error, Debug)]
pub enum ServerError {
    /// `--mode detect` was given without `--image`
    #[error("detect mode requires --image <path>")]
    MissingImage,

    #[error("failed to read image {path}: {source}")]
    ImageRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("detector error: {0}")]
    Detection(#[from] DetectorError),
}
