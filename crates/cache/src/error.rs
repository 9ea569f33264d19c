use sense_client::ClientError;
use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, CacheError>;

#[derive(Error, Debug)]
pub enum CacheError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Cache store path '{0}' exists but is not a directory")]
    NotADirectory(PathBuf),

    #[error("Entry file '{path}': {reason}")]
    MalformedEntry { path: PathBuf, reason: String },

    #[error("Model error: {0}")]
    Model(#[from] sense_model::ModelError),

    /// Terminal computation failure, shared by every caller that awaited the
    /// same in-flight computation.
    #[error("{0}")]
    Disambiguation(Arc<ClientError>),

    #[error("{0}")]
    Other(String),
}
