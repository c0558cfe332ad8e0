//! Animation error types

use cadence_core::CoreError;
use thiserror::Error;

/// Errors raised by animators and animation contexts
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AnimationError {
    #[error("Animators cannot have negative duration: {0}")]
    NegativeDuration(i64),

    /// `start()` was called on a thread with no installed context
    #[error("No animation context installed on this thread")]
    NoAnimationContext,

    #[error("An animation context is already installed on this thread")]
    ContextAlreadyInstalled,

    #[error("Timing configuration error: {0}")]
    Config(#[from] CoreError),
}

/// Result type for animation operations
pub type Result<T> = std::result::Result<T, AnimationError>;
