// Moderation domain models - the inbound report and the outbound decision.
//
// These are pure domain types with no HTTP dependencies.
// The http layer deserializes/serializes them directly.

use serde::{Deserialize, Serialize};

/// Verdicts the agent is asked to choose from. Not enforced on replies.
pub const VERDICTS: [&str; 3] = ["allow", "needs_review", "ban_suspected"];

/// Categories the agent is asked to choose from. Not enforced on replies.
pub const CATEGORIES: [&str; 6] = ["spam", "fraud", "extremism", "csam", "hate", "other"];

pub const VERDICT_NEEDS_REVIEW: &str = "needs_review";
pub const CATEGORY_OTHER: &str = "other";

/// Placeholder notes used when the agent gave no explanation.
pub const NOTES_PLACEHOLDER: &str = "нет пояснения";

/// A user complaint about another user, as submitted to `/analyze`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ReportPacket {
    pub report_id: String,
    pub reporter_user_id: String,
    pub reported_user_id: String,
    pub reason: String,
    #[serde(default)]
    pub message_text: Option<String>,
}

/// The normalized moderation outcome for one report.
///
/// `verdict` and `category` are open strings: whatever the agent emits is
/// passed through, see [`VERDICTS`] and [`CATEGORIES`] for the advertised sets.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Decision {
    pub report_id: String,
    pub verdict: String,
    pub category: Option<String>,
    pub confidence: f64,
    pub notes: Option<String>,
}

/// One chat message sent to the agent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentMessage {
    pub role: String,
    pub content: String,
}

/// How to reach the external agent.
#[derive(Debug, Clone)]
pub struct AgentConfig {
    pub url: String,
    pub api_key: Option<String>,
    pub access_id: Option<String>,
    pub max_tokens: u32,
}

impl AgentConfig {
    /// The API key, if one is configured and non-empty.
    pub fn api_key(&self) -> Option<&str> {
        self.api_key.as_deref().filter(|key| !key.is_empty())
    }

    /// The access identifier, if one is configured and non-empty.
    pub fn access_id(&self) -> Option<&str> {
        self.access_id.as_deref().filter(|id| !id.is_empty())
    }
}

/// Why a decision was synthesized locally instead of taken from the agent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FallbackReason {
    /// No API key configured, the agent was never called
    MissingApiKey,
    /// The agent call failed (timeout, connection error, non-2xx, non-JSON body)
    AgentUnavailable,
    /// The agent answered but without `choices[0].message.content`
    BadFormat,
}

impl FallbackReason {
    /// Tag written into `Decision::notes` so operators can tell failure modes apart.
    pub fn notes(self) -> &'static str {
        match self {
            FallbackReason::MissingApiKey => "AI key missing",
            FallbackReason::AgentUnavailable => "fallback",
            FallbackReason::BadFormat => "bad format",
        }
    }

    pub fn confidence(self) -> f64 {
        match self {
            FallbackReason::MissingApiKey => 0.1,
            FallbackReason::AgentUnavailable | FallbackReason::BadFormat => 0.2,
        }
    }
}

impl Decision {
    /// Create a low-confidence "needs human review" decision.
    pub fn fallback(report_id: impl Into<String>, reason: FallbackReason) -> Self {
        Self {
            report_id: report_id.into(),
            verdict: VERDICT_NEEDS_REVIEW.to_string(),
            category: Some(CATEGORY_OTHER.to_string()),
            confidence: reason.confidence(),
            notes: Some(reason.notes().to_string()),
        }
    }
}
