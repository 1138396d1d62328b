use reqwest::StatusCode;

use crate::{metrics::Kind, Id};

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("invalid config: {0}")]
    InvalidConfig(String),
    #[error("{id} is registered as a {registered}, not a {requested}")]
    KindMismatch {
        id: Id,
        registered: Kind,
        requested: Kind,
    },
    #[error("publisher is already running")]
    AlreadyRunning,
    #[error("publisher is still stopping")]
    Stopping,
    #[error("publisher must be started from within a tokio runtime")]
    NoRuntime,
    #[error("failed to encode payload: {0}")]
    Encode(#[from] serde_json::Error),
    #[error("failed to send payload: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("backend responded with {0}")]
    Status(StatusCode),
}
