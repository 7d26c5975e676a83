//! Core data models for the analysis chain

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

//
// ================= Stages =================
//

/// Labels for the three chain stages, used in log lines and error messages.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StageLabel {
    Extraction,
    Reasoning,
    Synthesis,
}

impl fmt::Display for StageLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            StageLabel::Extraction => "Stage 1: Data Extraction",
            StageLabel::Reasoning => "Stage 2: Analytical Reasoning",
            StageLabel::Synthesis => "Stage 3: Report Synthesis",
        };
        write!(f, "{}", s)
    }
}

//
// ================= Media types =================
//

/// Whitelist of document media types accepted by Stage 1.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum MediaType {
    Pdf,
    PlainText,
}

impl MediaType {
    /// Exactly "application/pdf" maps to document mode; anything else is
    /// treated as plain text.
    pub fn from_content_type(content_type: &str) -> Self {
        if content_type == "application/pdf" {
            MediaType::Pdf
        } else {
            MediaType::PlainText
        }
    }

    pub fn from_file_name(file_name: &str) -> Self {
        match Path::new(file_name)
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
            .as_deref()
        {
            Some("pdf") => MediaType::Pdf,
            _ => MediaType::PlainText,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            MediaType::Pdf => "application/pdf",
            MediaType::PlainText => "text/plain",
        }
    }
}

//
// ================= Input document =================
//

/// The uploaded report, read fully into memory before the chain starts.
#[derive(Debug, Clone)]
pub struct ReportDocument {
    pub file_name: String,
    pub bytes: Vec<u8>,
    pub media_type: MediaType,
}

impl ReportDocument {
    pub fn new(file_name: impl Into<String>, bytes: Vec<u8>, media_type: MediaType) -> Self {
        Self {
            file_name: file_name.into(),
            bytes,
            media_type,
        }
    }

    /// Name for the downloadable report, derived from the source file's stem.
    pub fn download_file_name(&self) -> String {
        let stem = Path::new(&self.file_name)
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("report");
        format!("Executive_Analysis_{}.txt", stem)
    }
}

//
// ================= Final Result =================
//

/// The triple returned by a completed chain run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisOutcome {
    /// Final executive report (Markdown).
    pub report_markdown: String,
    /// Stage 1 metrics in canonical indented JSON form.
    pub extracted_json: String,
    /// Raw Stage 2 output, shown verbatim for inspection.
    pub reasoning_raw: String,
}
