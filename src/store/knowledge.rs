use chrono::Utc;
use uuid::Uuid;

use super::StoreError;
use crate::db::Database;
use crate::models::*;

/// Namespace key the rule array is persisted under.
pub const STORE_KEY: &str = "knowledge-store";

/// The learned rule base.
///
/// Every mutation writes the complete rule array to the durable cache before
/// it becomes visible, so a failed write leaves both copies unchanged.
pub struct KnowledgeStore {
    db: Database,
    rules: Vec<KnowledgeRule>,
}

impl KnowledgeStore {
    /// Open the store, loading any rules persisted by an earlier process.
    pub fn open(db: Database) -> Result<Self, StoreError> {
        let rules = db
            .load::<Vec<KnowledgeRule>>(STORE_KEY)
            .map_err(StoreError::Persistence)?
            .unwrap_or_default();
        tracing::debug!("Loaded {} knowledge rules", rules.len());
        Ok(Self { db, rules })
    }

    /// Discard in-memory state and re-read the durable copy.
    pub fn reload(&mut self) -> Result<(), StoreError> {
        self.rules = self
            .db
            .load::<Vec<KnowledgeRule>>(STORE_KEY)
            .map_err(StoreError::Persistence)?
            .unwrap_or_default();
        Ok(())
    }

    pub fn rules(&self) -> &[KnowledgeRule] {
        &self.rules
    }

    pub fn active_rules(&self) -> Vec<KnowledgeRule> {
        self.rules.iter().filter(|r| r.is_active).cloned().collect()
    }

    pub fn get(&self, id: Uuid) -> Option<&KnowledgeRule> {
        self.rules.iter().find(|r| r.id == id)
    }

    pub fn add_rule(&mut self, draft: RuleDraft) -> Result<KnowledgeRule, StoreError> {
        let confidence = draft.confidence.unwrap_or(DEFAULT_CONFIDENCE);
        validate_confidence(confidence)?;
        if draft.rule.trim().is_empty() {
            return Err(StoreError::InvalidInput("Rule text must not be empty".into()));
        }

        let now = Utc::now();
        let rule = KnowledgeRule {
            id: Uuid::new_v4(),
            category: draft.category,
            rule: draft.rule,
            confidence,
            usage_count: 0,
            source: draft.source,
            is_active: draft.is_active,
            created_at: now,
            updated_at: now,
        };

        let mut next = self.rules.clone();
        next.push(rule.clone());
        self.commit(next)?;
        Ok(rule)
    }

    pub fn update_rule(&mut self, id: Uuid, input: UpdateRuleInput) -> Result<KnowledgeRule, StoreError> {
        if let Some(confidence) = input.confidence {
            validate_confidence(confidence)?;
        }

        self.modify(id, |rule| {
            if let Some(category) = input.category {
                rule.category = category;
            }
            if let Some(text) = input.rule {
                rule.rule = text;
            }
            if let Some(confidence) = input.confidence {
                rule.confidence = confidence;
            }
            if let Some(source) = input.source {
                rule.source = source;
            }
            if let Some(is_active) = input.is_active {
                rule.is_active = is_active;
            }
            rule.updated_at = Utc::now();
        })
    }

    pub fn delete_rule(&mut self, id: Uuid) -> Result<(), StoreError> {
        if self.get(id).is_none() {
            return Err(StoreError::not_found("Rule", id));
        }
        let next = self.rules.iter().filter(|r| r.id != id).cloned().collect();
        self.commit(next)
    }

    /// Flip `is_active`. Returns the updated rule.
    pub fn toggle_active(&mut self, id: Uuid) -> Result<KnowledgeRule, StoreError> {
        self.modify(id, |rule| {
            rule.is_active = !rule.is_active;
            rule.updated_at = Utc::now();
        })
    }

    pub fn increment_usage(&mut self, id: Uuid) -> Result<KnowledgeRule, StoreError> {
        self.modify(id, |rule| rule.usage_count += 1)
    }

    fn modify(
        &mut self,
        id: Uuid,
        apply: impl FnOnce(&mut KnowledgeRule),
    ) -> Result<KnowledgeRule, StoreError> {
        let mut next = self.rules.clone();
        let rule = next
            .iter_mut()
            .find(|r| r.id == id)
            .ok_or_else(|| StoreError::not_found("Rule", id))?;
        apply(rule);
        let updated = rule.clone();
        self.commit(next)?;
        Ok(updated)
    }

    fn commit(&mut self, next: Vec<KnowledgeRule>) -> Result<(), StoreError> {
        self.db
            .save(STORE_KEY, &next)
            .map_err(StoreError::Persistence)?;
        self.rules = next;
        Ok(())
    }
}

fn validate_confidence(confidence: f64) -> Result<(), StoreError> {
    if (0.0..=1.0).contains(&confidence) {
        Ok(())
    } else {
        Err(StoreError::InvalidInput(format!(
            "Confidence must be between 0 and 1, got {}",
            confidence
        )))
    }
}
