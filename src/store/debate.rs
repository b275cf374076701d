use chrono::Utc;
use serde::Serialize;
use uuid::Uuid;

use crate::models::*;

/// Append-only debate transcript with round counter.
#[derive(Debug, Default)]
pub struct DebateLog {
    messages: Vec<DebateMessage>,
    is_debating: bool,
    current_round: u32,
}

/// Read model handed to presentation.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DebateSnapshot {
    pub messages: Vec<DebateMessage>,
    pub is_debating: bool,
    pub current_round: u32,
}

impl DebateLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stamp `message` with an id and the current time and add it to the tail.
    pub fn append(&mut self, message: NewDebateMessage) -> &DebateMessage {
        self.messages.push(DebateMessage {
            id: Uuid::new_v4(),
            agent_id: message.agent_id,
            kind: message.kind,
            content: message.content,
            timestamp: Utc::now(),
            target_message_id: message.target_message_id,
            score: message.score,
            highlights: message.highlights,
        });
        &self.messages[self.messages.len() - 1]
    }

    /// Empty the log and reset the round counter.
    pub fn clear(&mut self) {
        self.messages.clear();
        self.current_round = 0;
    }

    pub fn set_debating(&mut self, is_debating: bool) {
        self.is_debating = is_debating;
    }

    /// Advance to the next round, returning the new round number.
    pub fn increment_round(&mut self) -> u32 {
        self.current_round += 1;
        self.current_round
    }

    pub fn messages(&self) -> &[DebateMessage] {
        &self.messages
    }

    pub fn is_debating(&self) -> bool {
        self.is_debating
    }

    pub fn current_round(&self) -> u32 {
        self.current_round
    }

    pub fn snapshot(&self) -> DebateSnapshot {
        DebateSnapshot {
            messages: self.messages.clone(),
            is_debating: self.is_debating,
            current_round: self.current_round,
        }
    }
}
