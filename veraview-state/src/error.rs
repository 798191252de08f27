//! Error types for veraview-state.

use thiserror::Error;

/// Result type alias for state persistence.
pub type Result<T> = std::result::Result<T, Error>;

/// State persistence errors. Change and notification never fail.
#[derive(Error, Debug)]
pub enum Error {
    /// A persisted property holds a value of the wrong shape.
    #[error("invalid value for property {key}: {source}")]
    InvalidProp {
        key: &'static str,
        #[source]
        source: serde_json::Error,
    },

    /// JSON serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
