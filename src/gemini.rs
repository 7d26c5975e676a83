//! Gemini API client for the analysis stages
//!
//! One `generateContent` call per stage. Supports an optional inline
//! document part (base64) and optional schema-constrained JSON output.
//! Uses a long-lived reqwest::Client for connection pooling.

use crate::error::{ChainError, Result};
use crate::models::StageLabel;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{error, info};

const DEFAULT_MODEL: &str = "gemini-2.5-pro";
const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Output cap applied to every stage; the only length bound in the chain.
const MAX_OUTPUT_TOKENS: i32 = 4096;

/// Reusable Gemini client (connection-pooled)
#[derive(Clone)]
pub struct GeminiClient {
    client: Client,
    api_key: String,
    model: String,
    base_url: String,
}

impl GeminiClient {
    pub fn new(api_key: String) -> Result<Self> {
        if api_key.trim().is_empty() {
            return Err(ChainError::MissingApiKey);
        }

        let client = Client::builder()
            .pool_idle_timeout(Duration::from_secs(90))
            .pool_max_idle_per_host(8)
            .build()?;

        Ok(Self {
            client,
            api_key,
            model: DEFAULT_MODEL.to_string(),
            base_url: GEMINI_BASE_URL.to_string(),
        })
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Point the client at a different endpoint (stub server in tests).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Run one stage call: prompt text, optional inline document, optional
    /// response schema. Returns the model's text.
    pub async fn generate(
        &self,
        stage: StageLabel,
        prompt: &str,
        document: Option<(&[u8], &str)>,
        response_schema: Option<serde_json::Value>,
    ) -> Result<String> {
        let url = format!(
            "{}/models/{}:generateContent?key={}",
            self.base_url, self.model, self.api_key
        );

        let mut parts = Vec::new();
        if let Some((bytes, mime_type)) = document {
            parts.push(Part {
                text: None,
                inline_data: Some(InlineData {
                    mime_type: mime_type.to_string(),
                    data: BASE64.encode(bytes),
                }),
            });
        }
        parts.push(Part {
            text: Some(prompt.to_string()),
            inline_data: None,
        });

        let generation_config = match response_schema {
            Some(schema) => GenerationConfig {
                max_output_tokens: MAX_OUTPUT_TOKENS,
                response_mime_type: Some("application/json".to_string()),
                response_schema: Some(schema),
            },
            None => GenerationConfig {
                max_output_tokens: MAX_OUTPUT_TOKENS,
                response_mime_type: None,
                response_schema: None,
            },
        };

        let request = GeminiRequest {
            contents: vec![Content { parts }],
            generation_config,
        };

        info!(%stage, model = %self.model, "Calling Gemini API");

        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                error!(%stage, "Gemini API request failed: {}", e);
                ChainError::Provider {
                    stage,
                    message: e.to_string(),
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            error!(%stage, %status, "Gemini API error response: {}", error_text);
            return Err(ChainError::Provider {
                stage,
                message: format!("status {}: {}", status, error_text),
            });
        }

        let gemini_response: GeminiResponse = response.json().await.map_err(|e| {
            error!(%stage, "Failed to parse Gemini response: {}", e);
            ChainError::Provider {
                stage,
                message: format!("response parse error: {}", e),
            }
        })?;

        let text = gemini_response
            .candidates
            .and_then(|c| c.into_iter().next())
            .and_then(|c| c.content.parts.into_iter().next())
            .and_then(|p| p.text)
            .filter(|t| !t.trim().is_empty())
            .ok_or(ChainError::EmptyResponse { stage })?;

        info!(%stage, response_len = text.len(), "Gemini response received");

        Ok(text)
    }
}

#[derive(Debug, Serialize)]
struct GeminiRequest {
    contents: Vec<Content>,
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize, Deserialize)]
struct Content {
    parts: Vec<Part>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Part {
    #[serde(skip_serializing_if = "Option::is_none")]
    text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    inline_data: Option<InlineData>,
}

#[derive(Debug, Serialize, Deserialize)]
struct InlineData {
    mime_type: String,
    data: String,
}

#[derive(Debug, Serialize)]
struct GenerationConfig {
    max_output_tokens: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_mime_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_schema: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct GeminiResponse {
    candidates: Option<Vec<Candidate>>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Content,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_serialization_with_document() {
        let request = GeminiRequest {
            contents: vec![Content {
                parts: vec![
                    Part {
                        text: None,
                        inline_data: Some(InlineData {
                            mime_type: "application/pdf".to_string(),
                            data: BASE64.encode(b"report bytes"),
                        }),
                    },
                    Part {
                        text: Some("Extract the metrics".to_string()),
                        inline_data: None,
                    },
                ],
            }],
            generation_config: GenerationConfig {
                max_output_tokens: MAX_OUTPUT_TOKENS,
                response_mime_type: Some("application/json".to_string()),
                response_schema: Some(serde_json::json!({ "type": "OBJECT" })),
            },
        };

        let json = serde_json::to_string(&request).unwrap();
        assert!(json.contains("Extract the metrics"));
        assert!(json.contains("application/pdf"));
        assert!(json.contains("response_schema"));
    }

    #[test]
    fn test_text_only_request_omits_shaping() {
        let request = GeminiRequest {
            contents: vec![Content {
                parts: vec![Part {
                    text: Some("Reason over the data".to_string()),
                    inline_data: None,
                }],
            }],
            generation_config: GenerationConfig {
                max_output_tokens: MAX_OUTPUT_TOKENS,
                response_mime_type: None,
                response_schema: None,
            },
        };

        let json = serde_json::to_string(&request).unwrap();
        assert!(!json.contains("inline_data"));
        assert!(!json.contains("response_schema"));
    }

    #[test]
    fn test_empty_api_key_is_fatal() {
        assert!(matches!(
            GeminiClient::new("  ".to_string()),
            Err(ChainError::MissingApiKey)
        ));
    }
}
