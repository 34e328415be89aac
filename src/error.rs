//! Error types for Eden.

use thiserror::Error;

use crate::cache::StoreError;
use crate::commands::CommandError;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Cache error: {0}")]
    Cache(#[from] StoreError),

    #[error("Command error: {0}")]
    Command(#[from] CommandError),

    #[error("Telegram error: {0}")]
    Telegram(String),

    #[error("{0}")]
    Other(String),
}
