use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum PipelineError {
    /// The schedule could not be fetched or read. Fatal for the run.
    #[error("document unavailable: {0}")]
    SourceUnavailable(String),

    #[error("run exceeded deadline of {0:?}")]
    DeadlineExceeded(Duration),

    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("failed to write map output: {0}")]
    Render(#[from] std::io::Error),

    #[error("configuration error: {0}")]
    Config(#[from] ::config::ConfigError),
}

/// Failure of a single geocode call. Only ever seen by the retry loop.
#[derive(Debug, Error)]
pub enum GeocodeError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("geocoder returned HTTP {0}")]
    Status(u16),

    #[error("malformed geocoder response: {0}")]
    Malformed(String),
}

pub type Result<T> = std::result::Result<T, PipelineError>;
