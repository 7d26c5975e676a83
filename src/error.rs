//! Error types for the financial report analysis chain

use crate::models::StageLabel;
use thiserror::Error;

/// Result type alias for chain operations
pub type Result<T> = std::result::Result<T, ChainError>;

#[derive(Error, Debug)]
pub enum ChainError {

    // =============================
    // Configuration
    // =============================

    #[error("GEMINI_API_KEY is not set; the analysis chain cannot start")]
    MissingApiKey,

    // =============================
    // Per-stage failures
    // =============================

    /// The provider call itself failed (transport, auth, quota, model error).
    #[error("{stage}: provider call failed: {message}")]
    Provider { stage: StageLabel, message: String },

    /// The provider answered but returned nothing usable.
    #[error("{stage}: provider returned no usable content")]
    EmptyResponse { stage: StageLabel },

    /// Stage 1 output did not parse into the metrics field set.
    /// Carries the raw offending text for operator inspection.
    #[error("Stage 1: Data Extraction: provider returned unusable content: {reason}")]
    MalformedExtraction { reason: String, raw: String },

    /// A stage request failed validation before any network call was made.
    #[error("Invalid stage request: {0}")]
    InvalidRequest(String),

    // =============================
    // External Library Conversions
    // =============================

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("HTTP client error: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}
