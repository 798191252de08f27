//! Error types for veraview-core.

use thiserror::Error;

/// Result type alias for veraview-core operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Core error types.
#[derive(Error, Debug)]
pub enum Error {
    /// A lookup table whose cell count does not match its dimensions.
    #[error("invalid map shape: {rows}x{cols} with {len} cells")]
    InvalidMapShape { rows: usize, cols: usize, len: usize },

    /// A row of a nested map whose length differs from the first row.
    #[error("ragged map row {row}: {len} cells, expected {cols}")]
    RaggedRow { row: usize, cols: usize, len: usize },

    /// Unsupported core symmetry option.
    #[error("invalid core symmetry: {0} (expected 1, 4 or 8)")]
    InvalidSymmetry(i32),

    /// Axial mesh values that are not in ascending order.
    #[error("axial mesh is not ascending: {0}")]
    InvalidMesh(String),

    /// Unknown dataset category name.
    #[error("unknown dataset category: {0}")]
    UnknownCategory(String),

    /// Unknown mode string for scale or weights mode.
    #[error("unknown mode: {0}")]
    UnknownMode(String),
}
