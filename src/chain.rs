//! Three-stage analysis chain
//!
//! EXTRACT → REASON → SYNTHESIZE, as an explicit linear state machine.
//! Each stage runs exactly once; any failure is absorbing and later stages
//! never run. The only recovered condition is a Stage 2 marker miss, which
//! degrades to using the full raw output.

use crate::error::{ChainError, Result};
use crate::executor::{StageExecutor, StageRequest};
use crate::metrics::FinancialMetrics;
use crate::models::{AnalysisOutcome, ReportDocument, StageLabel};
use crate::prompts;
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Chain progress. Artifacts ride in the variants so each transition owns
/// exactly the data the next stage needs.
enum ChainState {
    Start,
    Stage1Running,
    Stage1Done {
        extracted_json: String,
    },
    Stage2Running {
        extracted_json: String,
    },
    Stage2Done {
        extracted_json: String,
        reasoning_raw: String,
    },
    Stage3Running {
        extracted_json: String,
        reasoning_raw: String,
    },
    Stage3Done {
        outcome: AnalysisOutcome,
    },
    Complete(AnalysisOutcome),
    Failed(ChainError),
}

/// Runs the three stages in strict order against an injected executor.
pub struct AnalysisChain {
    executor: Arc<dyn StageExecutor>,
}

impl AnalysisChain {
    pub fn new(executor: Arc<dyn StageExecutor>) -> Self {
        Self { executor }
    }

    /// Execute the full chain over one report document.
    pub async fn run(&self, document: &ReportDocument) -> Result<AnalysisOutcome> {
        let run_id = Uuid::new_v4();

        info!(
            %run_id,
            file_name = %document.file_name,
            media_type = document.media_type.as_str(),
            size = document.bytes.len(),
            "Analysis chain: starting"
        );

        let mut state = ChainState::Start;

        loop {
            state = match state {
                ChainState::Start => ChainState::Stage1Running,

                ChainState::Stage1Running => match self.run_extraction(document).await {
                    Ok(extracted_json) => {
                        info!(%run_id, "Stage 1 complete: structured data extracted");
                        ChainState::Stage1Done { extracted_json }
                    }
                    Err(e) => ChainState::Failed(e),
                },

                ChainState::Stage1Done { extracted_json } => {
                    ChainState::Stage2Running { extracted_json }
                }

                ChainState::Stage2Running { extracted_json } => {
                    match self.run_reasoning(&extracted_json).await {
                        Ok(reasoning_raw) => {
                            info!(%run_id, "Stage 2 complete: analysis ready");
                            ChainState::Stage2Done {
                                extracted_json,
                                reasoning_raw,
                            }
                        }
                        Err(e) => ChainState::Failed(e),
                    }
                }

                ChainState::Stage2Done {
                    extracted_json,
                    reasoning_raw,
                } => ChainState::Stage3Running {
                    extracted_json,
                    reasoning_raw,
                },

                ChainState::Stage3Running {
                    extracted_json,
                    reasoning_raw,
                } => {
                    let analysis = extract_analysis_block(&reasoning_raw);
                    match self.run_synthesis(&extracted_json, analysis).await {
                        Ok(report_markdown) => {
                            info!(%run_id, "Stage 3 complete: report generated");
                            ChainState::Stage3Done {
                                outcome: AnalysisOutcome {
                                    report_markdown,
                                    extracted_json,
                                    reasoning_raw,
                                },
                            }
                        }
                        Err(e) => ChainState::Failed(e),
                    }
                }

                ChainState::Stage3Done { outcome } => ChainState::Complete(outcome),

                ChainState::Complete(outcome) => {
                    info!(%run_id, "Analysis chain: complete");
                    return Ok(outcome);
                }

                ChainState::Failed(e) => {
                    warn!(%run_id, "Analysis chain failed: {}", e);
                    return Err(e);
                }
            };
        }
    }

    /// Stage 1: schema-constrained extraction over the uploaded document.
    /// The raw response must parse into the metrics field set; the canonical
    /// indented form is what flows into Stage 2.
    async fn run_extraction(&self, document: &ReportDocument) -> Result<String> {
        let request = StageRequest::text(prompts::STAGE_1_PROMPT)
            .with_document(document.bytes.clone(), document.media_type)
            .with_schema(FinancialMetrics::response_schema());

        let raw = self
            .executor
            .run_stage(StageLabel::Extraction, request)
            .await?;
        if raw.trim().is_empty() {
            return Err(ChainError::EmptyResponse {
                stage: StageLabel::Extraction,
            });
        }

        let metrics = FinancialMetrics::from_raw(&raw)?;
        metrics.canonical_json()
    }

    /// Stage 2: chain-of-thought reasoning, text only.
    async fn run_reasoning(&self, extracted_json: &str) -> Result<String> {
        let request = StageRequest::text(prompts::reasoning_prompt(extracted_json));

        let raw = self
            .executor
            .run_stage(StageLabel::Reasoning, request)
            .await?;
        if raw.trim().is_empty() {
            return Err(ChainError::EmptyResponse {
                stage: StageLabel::Reasoning,
            });
        }
        Ok(raw)
    }

    /// Stage 3: executive report synthesis, text only.
    async fn run_synthesis(&self, extracted_json: &str, analysis: &str) -> Result<String> {
        let request = StageRequest::text(prompts::synthesis_prompt(extracted_json, analysis));

        let raw = self
            .executor
            .run_stage(StageLabel::Synthesis, request)
            .await?;
        if raw.trim().is_empty() {
            return Err(ChainError::EmptyResponse {
                stage: StageLabel::Synthesis,
            });
        }
        Ok(raw)
    }
}

/// Locate the reasoning-through-conclusions block in the Stage 2 output:
/// from the first `<Chain_of_Thought>` to the first `</Intermediate_Analysis>`,
/// both inclusive. Models frequently drop the tags, so a miss is not an
/// error: the whole raw output stands in as the artifact.
pub fn extract_analysis_block(raw: &str) -> &str {
    let open = raw.find(prompts::REASONING_OPEN);
    let close = open.and_then(|start| {
        raw[start..]
            .find(prompts::ANALYSIS_CLOSE)
            .map(|rel| start + rel + prompts::ANALYSIS_CLOSE.len())
    });

    match (open, close) {
        (Some(start), Some(end)) => {
            debug!("Stage 2 markers found; using delimited block");
            &raw[start..end]
        }
        _ => {
            info!("Stage 2 markers absent; using full raw output");
            raw
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::MediaType;
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    /// Scripted executor: pops one canned result per invocation and records
    /// every request it receives.
    struct ScriptedExecutor {
        responses: Mutex<VecDeque<Result<String>>>,
        calls: Mutex<Vec<(StageLabel, StageRequest)>>,
    }

    impl ScriptedExecutor {
        fn new(responses: Vec<Result<String>>) -> Arc<Self> {
            Arc::new(Self {
                responses: Mutex::new(responses.into()),
                calls: Mutex::new(Vec::new()),
            })
        }

        fn calls(&self) -> Vec<(StageLabel, StageRequest)> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl StageExecutor for ScriptedExecutor {
        async fn run_stage(&self, stage: StageLabel, request: StageRequest) -> Result<String> {
            self.calls.lock().unwrap().push((stage, request));
            self.responses
                .lock()
                .unwrap()
                .pop_front()
                .expect("executor invoked more times than scripted")
        }
    }

    fn text_report() -> ReportDocument {
        ReportDocument::new(
            "q3_report.txt",
            b"Revenue: $100M current, $80M previous".to_vec(),
            MediaType::PlainText,
        )
    }

    const STAGE_1_RAW: &str =
        r#"{"revenue_current_period": 100.0, "revenue_previous_period": 80.0}"#;

    fn stage_2_with_markers() -> String {
        format!(
            "preamble {}\n1. Growth: (100 - 80) / 80 = 25% growth.\n<Intermediate_Analysis>\nGrowth of 25% confirmed.\n{} trailing text",
            prompts::REASONING_OPEN,
            prompts::ANALYSIS_CLOSE
        )
    }

    #[tokio::test]
    async fn test_happy_path_threads_artifacts_forward() {
        let stage2 = stage_2_with_markers();
        let executor = ScriptedExecutor::new(vec![
            Ok(STAGE_1_RAW.to_string()),
            Ok(stage2.clone()),
            Ok("# Executive Summary\nSolid quarter.".to_string()),
        ]);
        let chain = AnalysisChain::new(executor.clone());

        let outcome = chain.run(&text_report()).await.unwrap();

        assert!(outcome.report_markdown.starts_with("# Executive Summary"));
        assert_eq!(outcome.reasoning_raw, stage2);
        // Canonical form re-serialized with defaults filled in.
        assert!(outcome.extracted_json.contains("\"revenue_current_period\": 100.0"));
        assert!(outcome.extracted_json.contains("\"total_debt\": 0.0"));

        let calls = executor.calls();
        assert_eq!(calls.len(), 3);
        assert_eq!(calls[0].0, StageLabel::Extraction);
        assert_eq!(calls[1].0, StageLabel::Reasoning);
        assert_eq!(calls[2].0, StageLabel::Synthesis);

        // Stage 1 carries the document and the schema; later stages carry neither.
        assert!(calls[0].1.document.is_some());
        assert!(calls[1].1.document.is_none());
        assert!(calls[2].1.document.is_none());

        // Stage 2's prompt embeds the canonical artifact, and Stage 3's prompt
        // embeds the extracted block bounded by the markers (inclusive).
        assert!(calls[1].1.prompt.contains(&outcome.extracted_json));
        assert!(calls[2].1.prompt.contains("25% growth"));
        let stage3_prompt = &calls[2].1.prompt;
        assert!(stage3_prompt.contains("1. Growth: (100 - 80) / 80 = 25% growth."));
        assert!(!stage3_prompt.contains("preamble"));
        assert!(!stage3_prompt.contains("trailing text"));
    }

    #[tokio::test]
    async fn test_stage1_provider_failure_short_circuits() {
        let executor = ScriptedExecutor::new(vec![Err(ChainError::Provider {
            stage: StageLabel::Extraction,
            message: "timeout".to_string(),
        })]);
        let chain = AnalysisChain::new(executor.clone());

        let err = chain.run(&text_report()).await.unwrap_err();
        assert!(matches!(err, ChainError::Provider { stage: StageLabel::Extraction, .. }));
        // Stages 2 and 3 never receive an invocation.
        assert_eq!(executor.calls().len(), 1);
    }

    #[tokio::test]
    async fn test_stage1_malformed_output_surfaces_raw() {
        let raw = r#"{"revenue_current_period": "N/A"}"#;
        let executor = ScriptedExecutor::new(vec![Ok(raw.to_string())]);
        let chain = AnalysisChain::new(executor.clone());

        let err = chain.run(&text_report()).await.unwrap_err();
        match err {
            ChainError::MalformedExtraction { raw: captured, .. } => assert_eq!(captured, raw),
            other => panic!("expected MalformedExtraction, got {:?}", other),
        }
        assert_eq!(executor.calls().len(), 1);
    }

    #[tokio::test]
    async fn test_stage1_empty_output_fails() {
        let executor = ScriptedExecutor::new(vec![Ok("  \n".to_string())]);
        let chain = AnalysisChain::new(executor.clone());

        let err = chain.run(&text_report()).await.unwrap_err();
        assert!(matches!(
            err,
            ChainError::EmptyResponse { stage: StageLabel::Extraction }
        ));
        assert_eq!(executor.calls().len(), 1);
    }

    #[tokio::test]
    async fn test_stage2_missing_close_marker_uses_full_raw() {
        let stage2_raw = format!(
            "{}\nGrowth is 25%, but the closing tag never arrives.",
            prompts::REASONING_OPEN
        );
        let executor = ScriptedExecutor::new(vec![
            Ok(STAGE_1_RAW.to_string()),
            Ok(stage2_raw.clone()),
            Ok("# Executive Summary\nDone.".to_string()),
        ]);
        let chain = AnalysisChain::new(executor.clone());

        let outcome = chain.run(&text_report()).await.unwrap();
        assert_eq!(outcome.reasoning_raw, stage2_raw);

        // Degraded mode: the entire raw output is embedded in the Stage 3 prompt.
        let calls = executor.calls();
        assert!(calls[2].1.prompt.contains(&stage2_raw));
    }

    #[tokio::test]
    async fn test_stage3_failure_aborts_without_partial_result() {
        let executor = ScriptedExecutor::new(vec![
            Ok(STAGE_1_RAW.to_string()),
            Ok(stage_2_with_markers()),
            Err(ChainError::Provider {
                stage: StageLabel::Synthesis,
                message: "quota exceeded".to_string(),
            }),
        ]);
        let chain = AnalysisChain::new(executor.clone());

        let err = chain.run(&text_report()).await.unwrap_err();
        assert!(matches!(err, ChainError::Provider { stage: StageLabel::Synthesis, .. }));
        assert_eq!(executor.calls().len(), 3);
    }

    #[test]
    fn test_extract_analysis_block_is_inclusive_substring() {
        let raw = stage_2_with_markers();
        let block = extract_analysis_block(&raw);
        assert!(block.starts_with(prompts::REASONING_OPEN));
        assert!(block.ends_with(prompts::ANALYSIS_CLOSE));
        assert!(raw.contains(block));
    }

    #[test]
    fn test_extract_analysis_block_fallbacks() {
        // No markers at all.
        let raw = "Just plain analysis text.";
        assert_eq!(extract_analysis_block(raw), raw);

        // Close marker before open marker never matches.
        let inverted = format!("{} text {}", prompts::ANALYSIS_CLOSE, prompts::REASONING_OPEN);
        assert_eq!(extract_analysis_block(&inverted), inverted);
    }
}
