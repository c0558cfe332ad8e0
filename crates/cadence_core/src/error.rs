//! Core error types

use thiserror::Error;

/// Errors raised by the timing configuration layer
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CoreError {
    /// Duration scale was negative, NaN or infinite
    #[error("Invalid duration scale: {0} (must be finite and >= 0)")]
    InvalidDurationScale(f32),
}

/// Result type for core operations
pub type Result<T> = std::result::Result<T, CoreError>;
