//! I/O error types.

use thiserror::Error;

/// Result type for I/O operations.
pub type Result<T> = std::result::Result<T, Error>;

/// I/O error types.
#[derive(Error, Debug)]
pub enum Error {
    /// File I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Session or widget config JSON error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// HDF5 library error.
    #[cfg(feature = "hdf5")]
    #[error("HDF5 error: {0}")]
    Hdf5(#[from] hdf5::Error),

    /// Invalid file format.
    #[error("invalid file format: {0}")]
    InvalidFormat(String),

    /// The file type needs a feature this build lacks.
    #[error("unsupported: {0}")]
    Unsupported(String),

    /// Core library error.
    #[error("core error: {0}")]
    Core(#[from] veraview_core::Error),

    /// State persistence error.
    #[error("state error: {0}")]
    State(#[from] veraview_state::Error),
}
