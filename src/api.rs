//! REST API Server for the report analysis chain
//!
//! Exposes the chain via HTTP endpoints
//! Integrates with frontend UI

use axum::{extract::State, http::StatusCode, routing::post, Json, Router};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tracing::info;

use crate::chain::AnalysisChain;
use crate::error::ChainError;
use crate::models::{MediaType, ReportDocument};

/// =============================
/// Request Models
/// =============================

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct AnalyzeRequest {
    pub file_name: String,
    /// Document bytes, base64-encoded by the uploading client.
    pub content_base64: String,
    /// Reported content type; exactly "application/pdf" selects document
    /// mode, anything else (or absence) is treated as plain text by name.
    pub content_type: Option<String>,
}

/// =============================
/// Response Wrapper
/// =============================

#[derive(Debug, Serialize, Deserialize)]
pub struct ApiResponse {
    pub success: bool,
    pub data: Option<serde_json::Value>,
    pub error: Option<String>,
    pub timestamp: String,
}

impl ApiResponse {
    pub fn success<T: Serialize>(data: T) -> Self {
        Self {
            success: true,
            data: serde_json::to_value(data).ok(),
            error: None,
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }

    pub fn error(message: String) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message),
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}

/// =============================
/// API State
/// =============================

#[derive(Clone)]
pub struct ApiState {
    pub chain: Arc<AnalysisChain>,
}

/// =============================
/// Health Endpoint
/// =============================

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "healthy",
        "timestamp": chrono::Utc::now().to_rfc3339()
    }))
}

/// Distinguish "provider call failed" from "provider returned unusable
/// content" from "bad request" in the status code.
fn status_for(error: &ChainError) -> StatusCode {
    match error {
        ChainError::Provider { .. } | ChainError::HttpError(_) => StatusCode::BAD_GATEWAY,
        ChainError::EmptyResponse { .. } | ChainError::MalformedExtraction { .. } => {
            StatusCode::UNPROCESSABLE_ENTITY
        }
        ChainError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

/// =============================
/// Main Analysis Endpoint
/// =============================

async fn run_analysis(
    State(state): State<ApiState>,
    Json(req): Json<AnalyzeRequest>,
) -> (StatusCode, Json<ApiResponse>) {
    info!("Received analysis request: {}", req.file_name);

    let bytes = match BASE64.decode(req.content_base64.as_bytes()) {
        Ok(bytes) => bytes,
        Err(e) => {
            return (
                StatusCode::BAD_REQUEST,
                Json(ApiResponse::error(format!("Invalid base64 content: {}", e))),
            )
        }
    };

    let media_type = match req.content_type.as_deref() {
        Some(content_type) => MediaType::from_content_type(content_type),
        None => MediaType::from_file_name(&req.file_name),
    };

    let document = ReportDocument::new(req.file_name, bytes, media_type);
    let download_file_name = document.download_file_name();

    match state.chain.run(&document).await {
        Ok(outcome) => (
            StatusCode::OK,
            Json(ApiResponse::success(serde_json::json!({
                "report_markdown": outcome.report_markdown,
                "extracted_json": outcome.extracted_json,
                "reasoning_raw": outcome.reasoning_raw,
                "download_file_name": download_file_name,
            }))),
        ),
        Err(e) => {
            // Stage-labeled message; MalformedExtraction additionally carries
            // the raw offending text for inspection.
            let mut response = ApiResponse::error(e.to_string());
            if let ChainError::MalformedExtraction { raw, .. } = &e {
                response.data = Some(serde_json::json!({ "raw_output": raw }));
            }
            (status_for(&e), Json(response))
        }
    }
}

/// =============================
/// Router
/// =============================

pub fn create_router(chain: Arc<AnalysisChain>) -> Router {
    let state = ApiState { chain };

    Router::new()
        .route("/health", axum::routing::get(health))
        .route("/api/analyze", post(run_analysis))
        .with_state(state)
        .layer(CorsLayer::permissive())
}

/// =============================
/// Server Startup
/// =============================

pub async fn start_server(
    chain: Arc<AnalysisChain>,
    port: u16,
) -> std::result::Result<(), Box<dyn std::error::Error>> {
    let router = create_router(chain);

    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", port)).await?;

    info!("API Server listening on http://0.0.0.0:{}", port);
    info!("Local: http://127.0.0.1:{}", port);

    axum::serve(listener, router).await?;

    Ok(())
}
