use financial_report_chain::{
    api::start_server, chain::AnalysisChain, error::ChainError, executor::GeminiExecutor,
    gemini::GeminiClient,
};
use std::sync::Arc;
use tracing::info;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    // Load environment variables
    dotenv::dotenv().ok();

    // Missing credential is fatal: halt before accepting any request.
    let gemini_api_key = std::env::var("GEMINI_API_KEY").map_err(|_| ChainError::MissingApiKey)?;

    let api_port: u16 = std::env::var("PORT")
        .or_else(|_| std::env::var("API_PORT"))
        .unwrap_or_else(|_| "8080".to_string())
        .parse()?;

    info!("🚀 Financial Report Analysis Chain - API Server");
    info!("📍 Port: {}", api_port);

    let client = GeminiClient::new(gemini_api_key)?;
    let executor = Arc::new(GeminiExecutor::new(client));
    let chain = Arc::new(AnalysisChain::new(executor));

    info!("✅ Analysis chain initialized");
    info!("📡 Starting API server...");

    start_server(chain, api_port).await?;

    Ok(())
}
