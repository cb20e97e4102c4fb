//! Common error types for stage components.

use thiserror::Error;

/// Common errors that can occur across stage components
#[derive(Error, Debug)]
pub enum CommonError {
    /// Invalid configuration
    #[error("Configuration error: {0}")]
    Configuration(String),
}

/// Result type alias using `CommonError`
pub type Result<T> = std::result::Result<T, CommonError>;
