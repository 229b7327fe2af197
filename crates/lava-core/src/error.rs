//! Error types for the core crate.

use thiserror::Error;

/// Core error type.
#[derive(Error, Debug)]
pub enum Error {
    /// Invalid data error
    #[error("Invalid data: {0}")]
    InvalidData(String),

    /// Invalid size error
    #[error("Invalid size: {0}")]
    InvalidSize(String),
}

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;
