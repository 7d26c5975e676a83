//! Financial Report Analysis Chain
//!
//! A three-stage prompt chain over the Gemini API:
//! 1. EXTRACT — schema-constrained structured metrics from a report file
//! 2. REASON — chain-of-thought analysis over the extracted metrics
//! 3. SYNTHESIZE — an executive-ready Markdown report
//!
//! Stages run strictly in order, each exactly once; any failure aborts the
//! chain with a stage-labeled error. The stage executor is a trait so the
//! chain runs against scripted fakes in tests.

pub mod api;
pub mod chain;
pub mod error;
pub mod executor;
pub mod gemini;
pub mod metrics;
pub mod models;
pub mod prompts;

pub use error::{ChainError, Result};

// Re-export common types
pub use chain::AnalysisChain;
pub use executor::{GeminiExecutor, StageExecutor, StageRequest};
pub use metrics::FinancialMetrics;
pub use models::{AnalysisOutcome, MediaType, ReportDocument, StageLabel};
