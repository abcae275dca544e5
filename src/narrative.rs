//! Optional second model call: advisor-style commentary on the figures.
//!
//! Off unless [`crate::config::AnalysisConfig::narrative_insights`] is set.
//! The model only sees what [`crate::insights`] and the aggregator already
//! computed, and only writes prose about it. The call goes through the same
//! backend, retry policy and wrapping tolerance as extraction. A failure
//! fails the run; there is no canned commentary to fall back to.

use crate::backend::InferenceBackend;
use crate::config::AnalysisConfig;
use crate::error::{CashflowError, ParseError};
use crate::insights::FinancialHealth;
use crate::output::CashFlowSummary;
use crate::pipeline::prompt::Prompt;
use crate::pipeline::{llm, parse};
use crate::prompts::{advice_message, ADVISOR_PROMPT};
use serde::{Deserialize, Serialize};
use tracing::info;

/// Commentary written by the model about one statement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NarrativeInsights {
    /// A few sentences addressed to the account holder.
    pub summary: String,
    /// Saving opportunities, most specific first as the model ranked them.
    pub tips: Vec<String>,
    #[serde(alias = "custom_advice")]
    pub advice: String,
}

/// Prompt for the narrative call.
pub fn build_advice_prompt(summary: &CashFlowSummary, health: &FinancialHealth) -> Prompt {
    let user = advice_message(summary, health);
    Prompt {
        system: ADVISOR_PROMPT.to_string(),
        document_chars: user.chars().count(),
        user,
    }
}

/// Ask `backend` to write commentary on `summary` and `health`.
///
/// Returns the commentary and the number of attempts made.
///
/// # Errors
/// [`CashflowError::Inference`] when the call fails after retries,
/// [`CashflowError::Parse`] when the reply is not a usable object.
pub async fn narrate(
    backend: &dyn InferenceBackend,
    summary: &CashFlowSummary,
    health: &FinancialHealth,
    config: &AnalysisConfig,
) -> Result<(NarrativeInsights, u32), CashflowError> {
    let prompt = build_advice_prompt(summary, health);
    let (response, attempts) = llm::request_completion(backend, &prompt, config).await?;
    let narrative = decode_narrative(&response.text)?;
    info!(
        "Narrative written: {} tips ({} attempt(s))",
        narrative.tips.len(),
        attempts
    );
    Ok((narrative, attempts))
}

/// Decode a narrative reply, tolerating fences and surrounding prose.
///
/// Text fields are trimmed and blank tips removed. A blank summary is
/// [`ParseError::Malformed`].
pub fn decode_narrative(raw: &str) -> Result<NarrativeInsights, ParseError> {
    let value = parse::decode_payload(raw)?;
    let decoded: NarrativeInsights =
        serde_json::from_value(value).map_err(|e| ParseError::Malformed {
            detail: format!("insights reply: {e}"),
        })?;

    let summary = decoded.summary.trim().to_string();
    if summary.is_empty() {
        return Err(ParseError::Malformed {
            detail: "insights reply has an empty summary".into(),
        });
    }
    Ok(NarrativeInsights {
        summary,
        tips: decoded
            .tips
            .iter()
            .map(|t| t.trim())
            .filter(|t| !t.is_empty())
            .map(str::to_string)
            .collect(),
        advice: decoded.advice.trim().to_string(),
    })
}
