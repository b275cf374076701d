//! The Judge's scoring heuristic.
//!
//! Deterministic: the score depends only on the document text and the rule
//! set. Active rules whose leading text appears in the document nudge
//! strategic fit and feasibility upwards.

use crate::models::{EvaluationScore, KnowledgeRule, EXCELLENT_THRESHOLD};

/// Number of leading rule characters matched against document content.
const RULE_PREFIX_CHARS: usize = 20;

/// Score `content` against the active members of `rules`.
pub fn evaluate(content: &str, rules: &[KnowledgeRule]) -> EvaluationScore {
    let content_length = content.chars().count() as f64;
    let has_code = content.contains("```");
    let has_diagram = content.contains("```mermaid");
    let section_count = content.matches("##").count() as f64;

    let mut strategic_fit = (50.0 + content_length / 50.0 + section_count * 5.0).min(100.0);
    let mut feasibility = (60.0 + if has_code { 15.0 } else { 0.0 } + section_count * 3.0).min(100.0);
    let completeness = (40.0 + content_length / 40.0 + section_count * 8.0).min(100.0);
    let clarity = (55.0 + section_count * 5.0 + if has_diagram { 20.0 } else { 0.0 }).min(100.0);

    let lowered = content.to_lowercase();
    for rule in rules.iter().filter(|r| rule_matches_lowered(&lowered, r)) {
        strategic_fit = (strategic_fit + rule.confidence * 5.0).min(100.0);
        feasibility = (feasibility + rule.confidence * 3.0).min(100.0);
    }

    let score = EvaluationScore::new(
        strategic_fit.round() as u32,
        feasibility.round() as u32,
        completeness.round() as u32,
        clarity.round() as u32,
        "",
    );
    let feedback = feedback_for(score.overall());
    score.with_feedback(feedback)
}

/// Whether an active rule's leading text appears in `content`, ignoring case.
pub fn rule_matches(content: &str, rule: &KnowledgeRule) -> bool {
    rule_matches_lowered(&content.to_lowercase(), rule)
}

/// The active rules from `rules` that [`rule_matches`] `content`.
pub fn matched_rules<'a>(content: &str, rules: &'a [KnowledgeRule]) -> Vec<&'a KnowledgeRule> {
    let lowered = content.to_lowercase();
    rules
        .iter()
        .filter(|r| rule_matches_lowered(&lowered, r))
        .collect()
}

fn rule_matches_lowered(lowered_content: &str, rule: &KnowledgeRule) -> bool {
    if !rule.is_active {
        return false;
    }
    let prefix: String = rule
        .rule
        .to_lowercase()
        .chars()
        .take(RULE_PREFIX_CHARS)
        .collect();
    lowered_content.contains(&prefix)
}

/// Verdict text for an overall score.
pub fn feedback_for(overall: u32) -> &'static str {
    if overall >= EXCELLENT_THRESHOLD {
        "Excellent quality. Proceed to implementation."
    } else if overall >= 70 {
        "Good quality, minor improvements needed."
    } else if overall >= 50 {
        "Basic structure present, needs substantial work."
    } else {
        "Requires a rewrite."
    }
}
