//! Stage executor seam
//!
//! One stage = one model invocation. The trait lets tests substitute a
//! scripted executor so the chain's state machine runs without network.

use crate::error::{ChainError, Result};
use crate::gemini::GeminiClient;
use crate::models::{MediaType, StageLabel};
use async_trait::async_trait;

/// How the stage's output should be shaped.
#[derive(Debug, Clone, PartialEq)]
pub enum OutputShape {
    /// Free-form text.
    Text,
    /// JSON constrained to the given response schema.
    Json { schema: serde_json::Value },
}

/// A single stage invocation: prompt, optional document, output shaping.
#[derive(Debug, Clone)]
pub struct StageRequest {
    pub prompt: String,
    pub document: Option<(Vec<u8>, MediaType)>,
    pub shape: OutputShape,
}

impl StageRequest {
    pub fn text(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            document: None,
            shape: OutputShape::Text,
        }
    }

    pub fn with_document(mut self, bytes: Vec<u8>, media_type: MediaType) -> Self {
        self.document = Some((bytes, media_type));
        self
    }

    pub fn with_schema(mut self, schema: serde_json::Value) -> Self {
        self.shape = OutputShape::Json { schema };
        self
    }

    /// Reject malformed requests before any network call is made.
    pub fn validate(&self) -> Result<()> {
        if self.prompt.trim().is_empty() {
            return Err(ChainError::InvalidRequest(
                "prompt must be non-empty".to_string(),
            ));
        }
        if let Some((bytes, _)) = &self.document {
            if bytes.is_empty() {
                return Err(ChainError::InvalidRequest(
                    "document content must be non-empty".to_string(),
                ));
            }
        }
        Ok(())
    }
}

/// Trait for stage execution (model-provider controlled)
#[async_trait]
pub trait StageExecutor: Send + Sync {
    /// Run one stage and return the model's raw text.
    async fn run_stage(&self, stage: StageLabel, request: StageRequest) -> Result<String>;
}

/// Production executor backed by the Gemini API.
pub struct GeminiExecutor {
    client: GeminiClient,
}

impl GeminiExecutor {
    pub fn new(client: GeminiClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl StageExecutor for GeminiExecutor {
    async fn run_stage(&self, stage: StageLabel, request: StageRequest) -> Result<String> {
        request.validate()?;

        let schema = match request.shape {
            OutputShape::Json { schema } => Some(schema),
            OutputShape::Text => None,
        };

        let document = request
            .document
            .as_ref()
            .map(|(bytes, media_type)| (bytes.as_slice(), media_type.as_str()));

        self.client
            .generate(stage, &request.prompt, document, schema)
            .await
    }
}
