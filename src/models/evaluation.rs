use serde::{Deserialize, Serialize};

/// Minimum overall score for a document to pass the approval gate.
pub const APPROVAL_THRESHOLD: u32 = 70;

/// Overall score at which a document is considered ready for implementation.
pub const EXCELLENT_THRESHOLD: u32 = 85;

/// The Judge's multi-dimensional score for a document.
///
/// Every dimension lies in `0..=100`. `overall` is always the weighted sum
/// `round(0.25·strategic_fit + 0.30·feasibility + 0.25·completeness + 0.20·clarity)`
/// and is recomputed on construction and deserialization, so it can never be
/// set independently of the dimensions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", from = "ScoreRecord")]
pub struct EvaluationScore {
    strategic_fit: u32,
    feasibility: u32,
    completeness: u32,
    clarity: u32,
    overall: u32,
    feedback: String,
}

impl EvaluationScore {
    pub fn new(
        strategic_fit: u32,
        feasibility: u32,
        completeness: u32,
        clarity: u32,
        feedback: impl Into<String>,
    ) -> Self {
        let strategic_fit = strategic_fit.min(100);
        let feasibility = feasibility.min(100);
        let completeness = completeness.min(100);
        let clarity = clarity.min(100);
        Self {
            strategic_fit,
            feasibility,
            completeness,
            clarity,
            overall: weighted_overall(strategic_fit, feasibility, completeness, clarity),
            feedback: feedback.into(),
        }
    }

    /// Replace the verdict text, keeping every number.
    pub fn with_feedback(mut self, feedback: impl Into<String>) -> Self {
        self.feedback = feedback.into();
        self
    }

    pub fn strategic_fit(&self) -> u32 {
        self.strategic_fit
    }

    pub fn feasibility(&self) -> u32 {
        self.feasibility
    }

    pub fn completeness(&self) -> u32 {
        self.completeness
    }

    pub fn clarity(&self) -> u32 {
        self.clarity
    }

    pub fn overall(&self) -> u32 {
        self.overall
    }

    pub fn feedback(&self) -> &str {
        &self.feedback
    }

    /// The approval gate: `overall >= 70`.
    pub fn is_approved(&self) -> bool {
        passes_gate(self.overall)
    }
}

/// Approval gate shared by the Judge and the `evaluate-document` action.
pub fn passes_gate(overall: u32) -> bool {
    overall >= APPROVAL_THRESHOLD
}

fn weighted_overall(strategic_fit: u32, feasibility: u32, completeness: u32, clarity: u32) -> u32 {
    let weighted = 0.25 * f64::from(strategic_fit)
        + 0.30 * f64::from(feasibility)
        + 0.25 * f64::from(completeness)
        + 0.20 * f64::from(clarity);
    weighted.round() as u32
}

/// Wire shape of a score. An incoming `overall` is an unknown field and is
/// dropped.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ScoreRecord {
    strategic_fit: u32,
    feasibility: u32,
    completeness: u32,
    clarity: u32,
    #[serde(default)]
    feedback: String,
}

impl From<ScoreRecord> for EvaluationScore {
    fn from(r: ScoreRecord) -> Self {
        Self::new(r.strategic_fit, r.feasibility, r.completeness, r.clarity, r.feedback)
    }
}
