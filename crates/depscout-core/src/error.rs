use thiserror::Error;

use crate::record::RecordError;

#[derive(Error, Debug)]
pub enum DepScoutError {
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Validation error: {0}")]
    Validation(#[from] RecordError),
}

pub type Result<T> = std::result::Result<T, DepScoutError>;
