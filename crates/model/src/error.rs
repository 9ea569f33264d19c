use thiserror::Error;

pub type Result<T> = std::result::Result<T, ModelError>;

#[derive(Error, Debug)]
pub enum ModelError {
    #[error("Decode error: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Bad neighbour distance '{value}' for meaning '{meaning}'")]
    BadDistance { meaning: String, value: String },
}
