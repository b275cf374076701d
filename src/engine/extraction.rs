//! The Auditor's rule extraction.
//!
//! Pure and deterministic: the same transcript and document always produce
//! the same drafts, in the same order. No de-duplication against the
//! existing rule base is attempted.

use crate::models::{DebateMessage, MessageKind, RuleDraft};

/// Learning messages at or below this many characters carry no rule.
const MIN_LEARNING_CHARS: usize = 20;

/// Rule text is cut to this many characters.
const MAX_RULE_CHARS: usize = 200;

const LEARNING_CONFIDENCE: f64 = 0.75;

pub const OAUTH_RULE: &str = "Prefer the OAuth 2.0 protocol for authentication systems.";
pub const MVP_RULE: &str =
    "In the MVP phase focus on core features and defer complex features to later phases.";

/// Keyword sets in priority order. The first category with a keyword
/// appearing anywhere in the text wins, so short keywords such as "ui" or
/// "db" also fire inside longer words.
const CATEGORIES: &[(&str, &[&str])] = &[
    ("Authentication", &["authentication", "login", "oauth", "jwt", "session"]),
    ("UI/UX", &["ui", "ux", "screen", "design", "layout"]),
    ("Database", &["database", "db", "schema", "table", "query"]),
    ("API", &["api", "rest", "graphql", "endpoint"]),
    ("Security", &["security", "encryption", "permission", "https"]),
    ("Performance", &["performance", "cache", "optimization", "loading"]),
];

pub const GENERAL_CATEGORY: &str = "General";

/// Derive rule drafts from a debate transcript and the document it approved.
pub fn extract(
    messages: &[DebateMessage],
    approved_title: &str,
    approved_content: &str,
) -> Vec<RuleDraft> {
    let mut rules: Vec<RuleDraft> = messages
        .iter()
        .filter(|m| m.kind == MessageKind::Learning)
        .filter(|m| m.content.chars().count() > MIN_LEARNING_CHARS)
        .map(|m| {
            RuleDraft::new(
                classify(&m.content),
                m.content.chars().take(MAX_RULE_CHARS).collect::<String>(),
                LEARNING_CONFIDENCE,
                format!("Debate Round {}", m.id),
            )
        })
        .collect();

    if approved_content.contains("OAuth") {
        rules.push(RuleDraft::new("Authentication", OAUTH_RULE, 0.8, approved_title));
    }

    if approved_content.contains("MVP") {
        rules.push(RuleDraft::new("Strategy", MVP_RULE, 0.85, approved_title));
    }

    rules
}

/// Category for free text, ignoring case.
pub fn classify(content: &str) -> &'static str {
    let lowered = content.to_lowercase();

    CATEGORIES
        .iter()
        .find(|(_, keywords)| keywords.iter().any(|k| lowered.contains(k)))
        .map(|(category, _)| *category)
        .unwrap_or(GENERAL_CATEGORY)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::AgentId;
    use chrono::Utc;
    use uuid::Uuid;

    fn message(kind: MessageKind, content: &str) -> DebateMessage {
        DebateMessage {
            id: Uuid::new_v4(),
            agent_id: AgentId::Auditor,
            kind,
            content: content.into(),
            timestamp: Utc::now(),
            target_message_id: None,
            score: None,
            highlights: Vec::new(),
        }
    }

    #[test]
    fn learning_message_and_both_document_patterns() {
        let messages = vec![message(MessageKind::Learning, &"x".repeat(25))];
        let rules = extract(&messages, "Blueprint", "includes MVP and OAuth");

        assert_eq!(rules.len(), 3);
        assert_eq!(rules[0].category, GENERAL_CATEGORY);
        assert_eq!(rules[0].confidence, Some(0.75));
        assert_eq!(rules[0].source, format!("Debate Round {}", messages[0].id));
        assert_eq!(rules[1].category, "Authentication");
        assert_eq!(rules[1].confidence, Some(0.8));
        assert_eq!(rules[2].category, "Strategy");
        assert_eq!(rules[2].confidence, Some(0.85));
        assert!(rules.iter().all(|r| r.is_active));
    }

    #[test]
    fn short_and_non_learning_messages_are_skipped() {
        let messages = vec![
            message(MessageKind::Learning, "too short to learn"),
            message(MessageKind::Critique, "This critique is long enough but not a lesson."),
        ];
        assert!(extract(&messages, "Doc", "plain").is_empty());
    }

    #[test]
    fn rule_text_is_truncated() {
        let messages = vec![message(MessageKind::Learning, &"y".repeat(450))];
        let rules = extract(&messages, "Doc", "");
        assert_eq!(rules[0].rule.chars().count(), 200);
    }

    #[test]
    fn document_patterns_are_case_sensitive() {
        assert!(extract(&[], "Doc", "mvp with oauth").is_empty());
    }

    #[test]
    fn extraction_is_deterministic() {
        let messages = vec![
            message(MessageKind::Learning, "Cache API responses close to the edge."),
            message(MessageKind::Learning, "Limit the MVP to three core features at most."),
        ];
        let first = extract(&messages, "Plan", "OAuth and MVP");
        let second = extract(&messages, "Plan", "OAuth and MVP");
        assert_eq!(first, second);
    }

    #[test]
    fn classification_uses_first_matching_category() {
        assert_eq!(classify("Support social LOGIN via OAuth"), "Authentication");
        assert_eq!(classify("Keep the screen layout simple"), "UI/UX");
        assert_eq!(classify("Normalize the schema early"), "Database");
        assert_eq!(classify("Version every REST endpoint"), "API");
        assert_eq!(classify("Enforce HTTPS everywhere"), "Security");
        assert_eq!(classify("Add a cache in front of reads"), "Performance");
        // Both auth and API terms: authentication is checked first.
        assert_eq!(classify("Protect the API with JWT"), "Authentication");
        // Keywords count inside other words too.
        assert_eq!(classify("Build quickly and iterate"), "UI/UX");
        assert_eq!(classify("Use JWTs for every token"), "Authentication");
        assert_eq!(classify("Write it down"), GENERAL_CATEGORY);
    }
}
