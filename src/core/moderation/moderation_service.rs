// Moderation service - core business logic for report classification.
//
// This service handles:
// - Input validation (empty reasons are rejected)
// - Prompt construction for the agent
// - Degrading every agent failure to a "needs_review" decision
// - Mapping the agent's loosely-typed reply onto a Decision
//
// NO HTTP server or client dependencies here - the agent is reached through
// the AgentProvider port, implemented in infra/.

use super::moderation_models::{
    AgentConfig, AgentMessage, Decision, FallbackReason, ReportPacket, CATEGORIES,
    CATEGORY_OTHER, NOTES_PLACEHOLDER, VERDICTS, VERDICT_NEEDS_REVIEW,
};
use super::reply_parsing::{extract_content, parse_content};
use async_trait::async_trait;
use serde_json::{Map, Value};
use thiserror::Error;

/// Confidence used when the agent's reply has no `confidence` key.
const DEFAULT_CONFIDENCE: f64 = 0.5;

/// Substituted into the prompt when the report carries no message text.
const NO_TEXT_PLACEHOLDER: &str = "(нет текста)";

// ============================================================================
// ERRORS
// ============================================================================

/// Errors surfaced to the caller of [`ModerationService::analyze`].
#[derive(Debug, Error)]
pub enum ModerationError {
    #[error("empty reason")]
    EmptyReason,
}

/// Errors from the agent transport. These never reach the caller.
#[derive(Debug, Error)]
pub enum AgentError {
    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Agent returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Failed to decode agent response: {0}")]
    Decode(String),
}

// ============================================================================
// AGENT TRAIT (PORT)
// ============================================================================

#[async_trait]
pub trait AgentProvider: Send + Sync {
    /// Sends a chat completion request to the agent.
    ///
    /// Returns the raw JSON response body; extracting the model's text is the
    /// service's job so a malformed body can be told apart from a failed call.
    async fn chat_complete(
        &self,
        messages: &[AgentMessage],
        config: &AgentConfig,
    ) -> Result<Value, AgentError>;
}

// Blanket implementation for Box<dyn AgentProvider> so the composition root
// can pick an implementation at runtime.
#[async_trait]
impl AgentProvider for Box<dyn AgentProvider> {
    async fn chat_complete(
        &self,
        messages: &[AgentMessage],
        config: &AgentConfig,
    ) -> Result<Value, AgentError> {
        (**self).chat_complete(messages, config).await
    }
}

// ============================================================================
// CORE SERVICE
// ============================================================================

pub struct ModerationService<P: AgentProvider> {
    provider: P,
    config: AgentConfig,
}

impl<P: AgentProvider> ModerationService<P> {
    pub fn new(provider: P, config: AgentConfig) -> Self {
        Self { provider, config }
    }

    /// Classify a report.
    ///
    /// Only an empty `reason` is an error. Every other failure (missing key,
    /// unreachable agent, malformed reply) yields a low-confidence
    /// `needs_review` decision instead.
    pub async fn analyze(&self, packet: &ReportPacket) -> Result<Decision, ModerationError> {
        if packet.reason.is_empty() {
            return Err(ModerationError::EmptyReason);
        }

        if self.config.api_key().is_none() {
            tracing::warn!(report_id = %packet.report_id, "Agent API key missing, deferring to review");
            return Ok(Decision::fallback(
                &packet.report_id,
                FallbackReason::MissingApiKey,
            ));
        }

        let messages = build_messages(packet);
        let response = match self.provider.chat_complete(&messages, &self.config).await {
            Ok(response) => response,
            Err(e) => {
                tracing::warn!(report_id = %packet.report_id, "Agent request failed: {}", e);
                return Ok(Decision::fallback(
                    &packet.report_id,
                    FallbackReason::AgentUnavailable,
                ));
            }
        };

        let Some(content) = extract_content(&response) else {
            tracing::warn!(report_id = %packet.report_id, "Agent response has no choices[0].message.content");
            return Ok(Decision::fallback(
                &packet.report_id,
                FallbackReason::BadFormat,
            ));
        };

        let fields = parse_content(content).unwrap_or_else(|| {
            tracing::warn!(report_id = %packet.report_id, "Agent content is not a JSON object, using defaults");
            Map::new()
        });

        let decision = decision_from_fields(&packet.report_id, &fields);
        tracing::info!(
            report_id = %decision.report_id,
            verdict = %decision.verdict,
            confidence = decision.confidence,
            "Report analyzed"
        );

        Ok(decision)
    }
}

// ============================================================================
// PROMPTS
// ============================================================================

/// The system instruction plus the user message describing the report.
pub fn build_messages(packet: &ReportPacket) -> Vec<AgentMessage> {
    vec![
        AgentMessage {
            role: "system".to_string(),
            content: system_prompt(),
        },
        AgentMessage {
            role: "user".to_string(),
            content: user_prompt(packet),
        },
    ]
}

fn system_prompt() -> String {
    format!(
        "Ты модератор. Верни JSON строго вида \
         {{\"verdict\":\"{}\",\"category\":\"{}\",\"confidence\":0..1,\"notes\":\"кратко\"}}. \
         Никакого другого текста.",
        VERDICTS.join("|"),
        CATEGORIES.join("|"),
    )
}

fn user_prompt(packet: &ReportPacket) -> String {
    let text = packet
        .message_text
        .as_deref()
        .filter(|text| !text.is_empty())
        .unwrap_or(NO_TEXT_PLACEHOLDER);

    format!(
        "Репорт {}. Репортер {} на {}. Причина: {}. Текст: {}",
        packet.report_id, packet.reporter_user_id, packet.reported_user_id, packet.reason, text
    )
}

// ============================================================================
// REPLY MAPPING
// ============================================================================

/// Build a decision from the agent's JSON fields, defaulting anything missing.
///
/// Verdict and category are not checked against the advertised sets.
fn decision_from_fields(report_id: &str, fields: &Map<String, Value>) -> Decision {
    let verdict = match fields.get("verdict") {
        Some(Value::String(verdict)) => verdict.clone(),
        _ => VERDICT_NEEDS_REVIEW.to_string(),
    };

    Decision {
        report_id: report_id.to_string(),
        verdict,
        category: optional_text(fields.get("category"), CATEGORY_OTHER),
        confidence: coerce_confidence(fields.get("confidence")),
        notes: optional_text(fields.get("notes"), NOTES_PLACEHOLDER),
    }
}

/// Absent keys take the default, an explicit `null` clears the field.
fn optional_text(value: Option<&Value>, default: &str) -> Option<String> {
    match value {
        Some(Value::String(text)) => Some(text.clone()),
        Some(Value::Null) => None,
        _ => Some(default.to_string()),
    }
}

/// Loose float coercion: falsy values become 0, numeric strings are parsed.
fn coerce_confidence(value: Option<&Value>) -> f64 {
    let confidence = match value {
        None => DEFAULT_CONFIDENCE,
        Some(Value::Number(n)) => n.as_f64().unwrap_or(0.0),
        Some(Value::Bool(true)) => 1.0,
        Some(Value::String(s)) => s.trim().parse::<f64>().unwrap_or(0.0),
        Some(_) => 0.0,
    };

    if confidence.is_finite() {
        confidence
    } else {
        0.0
    }
}

// ============================================================================
// TESTS
// ============================================================================
