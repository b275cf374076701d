use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Aggregate progress figures for the current session.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ProjectMetrics {
    pub total_documents: u32,
    pub approved_documents: u32,
    /// Fraction of evaluated root documents that were rejected.
    pub rejection_rate: f64,
    pub average_score: f64,
    /// Documents produced per critique round.
    pub generation_speed: f64,
    /// Rules learned per debate message.
    pub learning_efficiency: f64,
    pub iterations: Vec<IterationMetric>,
}

/// One completed cycle.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct IterationMetric {
    pub iteration: u32,
    pub timestamp: DateTime<Utc>,
    pub documents_generated: u32,
    pub average_score: f64,
    pub rules_learned: u32,
}

/// Merge-patch for the scalar metrics. `iterations` is only appended to.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateMetricsInput {
    pub total_documents: Option<u32>,
    pub approved_documents: Option<u32>,
    pub rejection_rate: Option<f64>,
    pub average_score: Option<f64>,
    pub generation_speed: Option<f64>,
    pub learning_efficiency: Option<f64>,
}

/// An iteration before the store stamps it.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewIteration {
    pub iteration: u32,
    pub documents_generated: u32,
    pub average_score: f64,
    pub rules_learned: u32,
}
