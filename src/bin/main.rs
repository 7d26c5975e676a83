use financial_report_chain::{
    chain::AnalysisChain,
    error::ChainError,
    executor::GeminiExecutor,
    gemini::GeminiClient,
    models::{MediaType, ReportDocument},
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

    // Missing credential is fatal before any input is read.
    let gemini_api_key = std::env::var("GEMINI_API_KEY").map_err(|_| ChainError::MissingApiKey)?;

    let path = std::env::args().nth(1).ok_or_else(|| {
        "usage: analyze <report-file>  (PDF, TXT or MD)".to_string()
    })?;

    info!("Financial Report Analysis Chain starting");

    let file_name = std::path::Path::new(&path)
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or(&path)
        .to_string();
    let bytes = tokio::fs::read(&path).await?;
    let media_type = MediaType::from_file_name(&file_name);

    let document = ReportDocument::new(file_name, bytes, media_type);

    let client = GeminiClient::new(gemini_api_key)?;
    let executor = Arc::new(GeminiExecutor::new(client));
    let chain = AnalysisChain::new(executor);

    info!(
        file_name = %document.file_name,
        media_type = document.media_type.as_str(),
        "Running 3-stage analysis chain"
    );

    match chain.run(&document).await {
        Ok(outcome) => {
            println!("\n=== EXECUTIVE REPORT ===\n");
            println!("{}", outcome.report_markdown);

            println!("\n=== STAGE 1: EXTRACTED METRICS ===\n");
            println!("{}", outcome.extracted_json);

            println!("\n=== STAGE 2: REASONING (RAW) ===\n");
            println!("{}", outcome.reasoning_raw);

            let report_path = document.download_file_name();
            tokio::fs::write(&report_path, &outcome.report_markdown).await?;
            info!("Report written to {}", report_path);
            Ok(())
        }
        Err(ChainError::MalformedExtraction { reason, raw }) => {
            eprintln!("Stage 1 failed: the model did not return valid metrics JSON ({reason})");
            eprintln!("--- raw output for inspection ---\n{raw}");
            Err(Box::new(ChainError::MalformedExtraction { reason, raw }) as Box<dyn std::error::Error>)
        }
        Err(e) => {
            eprintln!("Analysis failed: {}", e);
            Err(Box::new(e) as Box<dyn std::error::Error>)
        }
    }
}
