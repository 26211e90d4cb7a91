use thiserror::Error;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("libmdbx error: {0}")]
    Mdbx(#[from] libmdbx::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

pub type StorageResult<T> = std::result::Result<T, StorageError>;
