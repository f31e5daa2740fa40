//! Error types for the advisor service

use thiserror::Error;

/// Result type alias for advisor operations
pub type Result<T> = std::result::Result<T, AdvisorError>;

#[derive(Error, Debug)]
pub enum AdvisorError {

    // =============================
    // Recommendation Pipeline Errors
    // =============================

    /// Missing or malformed profile / payload field. Surfaces as a client error.
    #[error("Validation error: {0}")]
    Validation(String),

    /// The generative model could not be reached or returned nothing usable.
    #[error("External service error: {0}")]
    ExternalService(String),

    /// The generative model answered, but not in the recommendation shape.
    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    #[error("Storage error: {0}")]
    Storage(String),

    // =============================
    // Service Errors
    // =============================

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Configuration error: {0}")]
    Config(String),

    // =============================
    // External Library Conversions
    // =============================

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
}
