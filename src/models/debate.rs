use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::AgentId;

/// One turn in the inter-agent exchange.
///
/// The debate log is append-only: insertion order is the causal order of the
/// debate.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DebateMessage {
    pub id: Uuid,
    pub agent_id: AgentId,
    #[serde(rename = "type")]
    pub kind: MessageKind,
    pub content: String,
    pub timestamp: DateTime<Utc>,
    /// The message this turn responds to, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_message_id: Option<Uuid>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<u32>,
    #[serde(default)]
    pub highlights: Vec<DebateHighlight>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum MessageKind {
    Proposal,
    Critique,
    CounterProposal,
    Approval,
    Learning,
}

/// A passage the Judge singled out in a critique.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DebateHighlight {
    #[serde(rename = "type")]
    pub kind: HighlightKind,
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suggestion: Option<String>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum HighlightKind {
    Improvement,
    Issue,
    Question,
}

impl DebateHighlight {
    pub fn new(kind: HighlightKind, text: impl Into<String>) -> Self {
        Self {
            kind,
            text: text.into(),
            suggestion: None,
        }
    }

    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }
}

/// A debate turn before the log assigns id and timestamp.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct NewDebateMessage {
    pub agent_id: AgentId,
    #[serde(rename = "type")]
    pub kind: MessageKind,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_message_id: Option<Uuid>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<u32>,
    #[serde(default)]
    pub highlights: Vec<DebateHighlight>,
}

impl NewDebateMessage {
    pub fn new(agent_id: AgentId, kind: MessageKind, content: impl Into<String>) -> Self {
        Self {
            agent_id,
            kind,
            content: content.into(),
            target_message_id: None,
            score: None,
            highlights: Vec::new(),
        }
    }

    pub fn with_score(mut self, score: u32) -> Self {
        self.score = Some(score);
        self
    }

    pub fn with_highlights(mut self, highlights: Vec<DebateHighlight>) -> Self {
        self.highlights = highlights;
        self
    }

    pub fn replying_to(mut self, message_id: Uuid) -> Self {
        self.target_message_id = Some(message_id);
        self
    }
}
