use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Confidence assigned to manually entered rules.
pub const DEFAULT_CONFIDENCE: f64 = 0.7;

/// A reusable heuristic learned from a past cycle.
///
/// Rules are the only durable entity: they survive process restarts and bias
/// the Judge's evaluation of later documents while `is_active` is set.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct KnowledgeRule {
    pub id: Uuid,
    pub category: String,
    pub rule: String,
    /// In `0.0..=1.0`.
    pub confidence: f64,
    pub usage_count: u32,
    /// Where the rule came from (debate message, document title, or a person).
    pub source: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A rule before the Knowledge Store assigns identity, timestamps and usage.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RuleDraft {
    pub category: String,
    pub rule: String,
    /// Defaults to [`DEFAULT_CONFIDENCE`] when omitted.
    #[serde(default)]
    pub confidence: Option<f64>,
    pub source: String,
    #[serde(default = "default_active")]
    pub is_active: bool,
}

fn default_active() -> bool {
    true
}

impl RuleDraft {
    pub fn new(
        category: impl Into<String>,
        rule: impl Into<String>,
        confidence: f64,
        source: impl Into<String>,
    ) -> Self {
        Self {
            category: category.into(),
            rule: rule.into(),
            confidence: Some(confidence),
            source: source.into(),
            is_active: true,
        }
    }
}

/// Merge-patch for a rule. Absent fields keep their current value.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateRuleInput {
    pub category: Option<String>,
    pub rule: Option<String>,
    pub confidence: Option<f64>,
    pub source: Option<String>,
    pub is_active: Option<bool>,
}
