//! Prompt templates for the three chain stages
//!
//! Stage 1 is a static instruction; Stages 2 and 3 are rendered from the
//! prior stage's artifact. Rendering uses `format!` against `&str`
//! parameters, so a missing placeholder is a compile error rather than a
//! runtime condition.

/// Stage 1: extraction instruction. The field structure itself is enforced
/// separately via schema-constrained generation.
pub const STAGE_1_PROMPT: &str = "\
You are a highly meticulous Financial Data Analyst. Your sole function is to analyze the \
provided financial report (PDF, TXT, or MD) and extract the exact values for the specified metrics.

CRITICAL INSTRUCTION: Analyze the entire document, including tables, figures, and narrative text, \
to locate the requested data points. Provide the values as pure numbers (e.g., 550.5 for $550.5 Million, \
0.40 for 40%).

Your output MUST be a JSON object that strictly adheres to the provided schema. DO NOT add any \
introductory or explanatory text. If a metric is not found, use 0 for numbers or an empty string for text.";

/// Opening marker of the Stage 2 reasoning block.
pub const REASONING_OPEN: &str = "<Chain_of_Thought>";

/// Closing marker of the Stage 2 conclusions block.
pub const ANALYSIS_CLOSE: &str = "</Intermediate_Analysis>";

/// Stage 2: chain-of-thought reasoning over the extracted metrics.
/// `extracted_json` is the canonical Stage 1 artifact, embedded verbatim.
pub fn reasoning_prompt(extracted_json: &str) -> String {
    format!(
        "\
<System_Prompt>
You are a Senior Financial Strategist. Your task is to perform a detailed financial analysis based \
solely on the extracted structured data provided in the <Extracted_Data_JSON> tag. Your analysis must \
follow a structured, step-by-step reasoning process (Chain-of-Thought) to ensure numerical accuracy \
before drawing conclusions.
</System_Prompt>

<Extracted_Data_JSON>
{extracted_json}
</Extracted_Data_JSON>

<Instructions>
First, complete the required reasoning steps in the <Chain_of_Thought> section. Then, use the output \
of that reasoning to fill the <Intermediate_Analysis> section.

<Chain_of_Thought>
1. **Growth Calculation:** Calculate the Quarter-over-Quarter Revenue Growth Rate (Formula: \
(Current Revenue - Previous Revenue) / Previous Revenue * 100%). Use the numbers from the JSON.
2. **Profitability Check:** Calculate the Operating Margin (Net Income / Revenue).
3. **Liquidity Assessment:** Comment on the immediate liquidity trend by comparing Cash vs. Total Debt.
4. **Synthesize Work:** Cross-reference the calculated financial trends (growth/margin) with the \
Management Summary and Risk Factors. What single, major theme connects the financials to the \
management commentary?
</Chain_of_Thought>

<Intermediate_Analysis>
1. **Revenue & Growth:** [Summary of growth calculation and trend.]
2. **Profitability:** [Summary of operating margin and what Net Income trend reveals.]
3. **Risk Synthesis:** [Detailed note on how the calculated financial health is impacted by the \
identified risk factors.]
4. **Work Done Assessment (The \"Why\"):** [Based on the MD&A summary and financial trends, provide \
a single paragraph assessing the effectiveness of the *work done* by the company during the period.]
</Intermediate_Analysis>"
    )
}

/// Stage 3: executive report synthesis over both prior artifacts, labeled
/// and separated by a blank line.
pub fn synthesis_prompt(extracted_json: &str, analysis: &str) -> String {
    let full_analysis_data = format!("STAGE 1 DATA:\n{extracted_json}\n\nSTAGE 2 ANALYSIS:\n{analysis}");
    format!(
        "\
<System_Prompt>
You are the CEO's Chief of Staff. Your final task is to condense the entire analysis (provided in the \
<Full_Analysis_Data> tag) into a three-part, executive-ready final report.
Tone: Professional, direct, and forward-looking.
Output: The final response MUST use Markdown headings (#) and bullet points. DO NOT use any XML tags \
in your final output.
</System_Prompt>

<Full_Analysis_Data>
{full_analysis_data}
</Full_Analysis_Data>

**FINAL REPORT SECTIONS:**

# Executive Summary
**Max 3 Sentences.** Summarize the period's overall performance, highlighting the main success and \
the primary challenge/risk.

# Key Insights and Work Assessment
Use bullet points to present three distinct insights. One must specifically assess the effectiveness \
of the *work done* by the company during the period.

# Strategic Suggestions for Next Period
Use bullet points to provide three distinct, actionable, and measurable suggestions for the management \
team, logically derived from the insights."
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_1_prompt_demands_json_and_defaults() {
        assert!(STAGE_1_PROMPT.contains("JSON object"));
        assert!(STAGE_1_PROMPT.contains("use 0 for numbers"));
    }

    #[test]
    fn test_reasoning_prompt_embeds_artifact_verbatim() {
        let artifact = r#"{ "revenue_current_period": 100.0 }"#;
        let prompt = reasoning_prompt(artifact);
        assert!(prompt.contains(artifact));
        // The template itself carries both markers the chain later searches for.
        assert!(prompt.contains(REASONING_OPEN));
        assert!(prompt.contains(ANALYSIS_CLOSE));
    }

    #[test]
    fn test_synthesis_prompt_labels_both_artifacts() {
        let prompt = synthesis_prompt("{json}", "analysis text");
        assert!(prompt.contains("STAGE 1 DATA:\n{json}"));
        assert!(prompt.contains("STAGE 2 ANALYSIS:\nanalysis text"));
        assert!(prompt.contains("# Executive Summary"));
    }

    #[test]
    fn test_synthesis_prompt_is_deterministic() {
        let a = synthesis_prompt("data", "conclusions");
        let b = synthesis_prompt("data", "conclusions");
        assert_eq!(a, b);
    }
}
