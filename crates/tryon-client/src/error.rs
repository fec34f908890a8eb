//! Detection client error types.

use std::time::Duration;
use thiserror::Error;

pub type ClientResult<T> = Result<T, ClientError>;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Detection service returned {status}: {body}")]
    RequestFailed { status: u16, body: String },

    #[error("Timeout after {0:?}")]
    Timeout(Duration),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),
}
