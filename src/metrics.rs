//! Structured data contract for Stage 1 extraction
//!
//! The model is asked for schema-constrained JSON; this module owns the
//! strict parse, the defaulting rules (0 for numbers, empty for text),
//! and the canonical indented form embedded into the Stage 2 prompt.

use crate::error::{ChainError, Result};
use serde::{Deserialize, Serialize};
use serde_json::json;

/// Quantitative and qualitative data extracted from a financial report.
///
/// Every field is defaulted so a metric the model could not find parses as
/// 0 / empty rather than failing the run. Wrong-typed values still fail.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FinancialMetrics {
    #[serde(default)]
    pub revenue_current_period: f64,
    #[serde(default)]
    pub revenue_previous_period: f64,
    #[serde(default)]
    pub net_income_current_period: f64,
    #[serde(default)]
    pub net_income_previous_period: f64,
    #[serde(default)]
    pub gross_margin_percentage: f64,
    #[serde(default)]
    pub operating_expense_total: f64,
    #[serde(default)]
    pub cash_from_operations: f64,
    #[serde(default)]
    pub total_debt: f64,
    #[serde(default)]
    pub cash_and_equivalents: f64,

    #[serde(default)]
    pub management_summary: String,
    #[serde(default)]
    pub risk_factors: Vec<String>,
    #[serde(default)]
    pub future_outlook_statement: String,
}

impl FinancialMetrics {
    /// Strict parse of the raw Stage 1 response. On failure the raw text is
    /// carried in the error so the operator can inspect what the model wrote.
    pub fn from_raw(raw: &str) -> Result<Self> {
        serde_json::from_str(raw).map_err(|e| ChainError::MalformedExtraction {
            reason: e.to_string(),
            raw: raw.to_string(),
        })
    }

    /// Canonical indented JSON form, the artifact passed to Stage 2.
    pub fn canonical_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Gemini `responseSchema` declaring the metrics field set for
    /// schema-constrained generation.
    pub fn response_schema() -> serde_json::Value {
        json!({
            "type": "OBJECT",
            "properties": {
                "revenue_current_period": {
                    "type": "NUMBER",
                    "description": "Total Revenue for the current quarter/year (in millions/billions)."
                },
                "revenue_previous_period": {
                    "type": "NUMBER",
                    "description": "Total Revenue for the previous quarter/year for comparison."
                },
                "net_income_current_period": {
                    "type": "NUMBER",
                    "description": "Net Income for the current period."
                },
                "net_income_previous_period": {
                    "type": "NUMBER",
                    "description": "Net Income for the previous period."
                },
                "gross_margin_percentage": {
                    "type": "NUMBER",
                    "description": "The Gross Margin percentage (e.g., 0.40 for 40%)."
                },
                "operating_expense_total": {
                    "type": "NUMBER",
                    "description": "Total Operating Expenses."
                },
                "cash_from_operations": {
                    "type": "NUMBER",
                    "description": "Cash Flow from Operating Activities."
                },
                "total_debt": {
                    "type": "NUMBER",
                    "description": "The company's Total Debt or Liabilities."
                },
                "cash_and_equivalents": {
                    "type": "NUMBER",
                    "description": "Total Cash and Cash Equivalents on the Balance Sheet."
                },
                "management_summary": {
                    "type": "STRING",
                    "description": "The 3-sentence summary of the company's performance from the MD&A section."
                },
                "risk_factors": {
                    "type": "ARRAY",
                    "items": { "type": "STRING" },
                    "description": "List of all major risk factors mentioned in the report."
                },
                "future_outlook_statement": {
                    "type": "STRING",
                    "description": "The most definitive sentence regarding the company's outlook for the next period."
                }
            },
            "required": [
                "revenue_current_period",
                "revenue_previous_period",
                "net_income_current_period",
                "net_income_previous_period",
                "gross_margin_percentage",
                "operating_expense_total",
                "cash_from_operations",
                "total_debt",
                "cash_and_equivalents",
                "management_summary",
                "risk_factors",
                "future_outlook_statement"
            ]
        })
    }
}
