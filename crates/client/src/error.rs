use thiserror::Error;

pub type Result<T> = std::result::Result<T, ClientError>;

#[derive(Error, Debug)]
pub enum ClientError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Decode error: {0}")]
    Decode(#[from] sense_model::ModelError),

    #[error("Text is {len} characters long, limit is {limit}")]
    TextTooLong { len: usize, limit: usize },

    #[error("Tried {attempts} times, but still could not disambiguate '{text}'")]
    RetriesExhausted {
        text: String,
        attempts: u32,
        #[source]
        source: Box<ClientError>,
    },

    #[error("Interrupted while waiting to retry '{text}'")]
    Interrupted { text: String },

    #[error("{0}")]
    Other(String),
}
