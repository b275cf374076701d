//! Cycle state machine with audited transitions.
//!
//! One generation cycle walks
//! `Idle → StructuringDocuments → DecisionProposal → JudgeCritique →
//! DecisionRevision → JudgeApproval → AuditorApproval → AuditorLearning → Idle`.
//! `JudgeApproval` may loop back to `DecisionRevision` while the round
//! budget lasts, or return straight to `Idle` when the Judge rejects.
//! Any running state may abort to `Idle`.

use std::fmt;
use std::time::Instant;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum CycleState {
    #[default]
    Idle,
    /// Decision Maker lays out the document skeleton.
    StructuringDocuments,
    DecisionProposal,
    /// Judge scores the initial proposal.
    JudgeCritique,
    /// Decision Maker rewrites the root document from feedback.
    DecisionRevision,
    /// Judge re-scores the revision and decides.
    JudgeApproval,
    /// Auditor signs off and records the ADR.
    AuditorApproval,
    /// Auditor turns the debate into knowledge rules.
    AuditorLearning,
}

impl CycleState {
    pub fn is_running(self) -> bool {
        self != Self::Idle
    }
}

impl fmt::Display for CycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle => write!(f, "Idle"),
            Self::StructuringDocuments => write!(f, "StructuringDocuments"),
            Self::DecisionProposal => write!(f, "DecisionProposal"),
            Self::JudgeCritique => write!(f, "JudgeCritique"),
            Self::DecisionRevision => write!(f, "DecisionRevision"),
            Self::JudgeApproval => write!(f, "JudgeApproval"),
            Self::AuditorApproval => write!(f, "AuditorApproval"),
            Self::AuditorLearning => write!(f, "AuditorLearning"),
        }
    }
}

/// Legal edges of the cycle graph:
/// ```text
/// Idle → StructuringDocuments
/// StructuringDocuments → DecisionProposal
/// DecisionProposal → JudgeCritique
/// JudgeCritique → DecisionRevision
/// DecisionRevision → JudgeApproval
/// JudgeApproval → DecisionRevision | AuditorApproval | Idle
/// AuditorApproval → AuditorLearning
/// AuditorLearning → Idle
/// ```
pub fn is_legal_transition(from: CycleState, to: CycleState) -> bool {
    use CycleState::*;

    // Abort from anywhere.
    if to == Idle && from.is_running() {
        return true;
    }

    matches!(
        (from, to),
        (Idle, StructuringDocuments)
            | (StructuringDocuments, DecisionProposal)
            | (DecisionProposal, JudgeCritique)
            | (JudgeCritique, DecisionRevision)
            | (DecisionRevision, JudgeApproval)
            // Score below the excellence bar with rounds left
            | (JudgeApproval, DecisionRevision)
            | (JudgeApproval, AuditorApproval)
            | (AuditorApproval, AuditorLearning)
    )
}

/// A single recorded state transition.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransitionRecord {
    pub from: CycleState,
    pub to: CycleState,
    /// Critique round at the time of transition (0 before the first revision).
    pub round: u32,
    /// Milliseconds since the cycle started.
    pub elapsed_ms: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IllegalTransition {
    pub from: CycleState,
    pub to: CycleState,
}

impl fmt::Display for IllegalTransition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Illegal cycle transition: {} → {}", self.from, self.to)
    }
}

impl std::error::Error for IllegalTransition {}

/// Current state plus the transition log of the latest cycle.
#[derive(Debug)]
pub struct CycleMachine {
    current: CycleState,
    round: u32,
    started_at: Instant,
    transitions: Vec<TransitionRecord>,
}

impl Default for CycleMachine {
    fn default() -> Self {
        Self::new()
    }
}

impl CycleMachine {
    pub fn new() -> Self {
        Self {
            current: CycleState::Idle,
            round: 0,
            started_at: Instant::now(),
            transitions: Vec::new(),
        }
    }

    pub fn current(&self) -> CycleState {
        self.current
    }

    pub fn round(&self) -> u32 {
        self.round
    }

    pub fn set_round(&mut self, round: u32) {
        self.round = round;
    }

    pub fn transitions(&self) -> &[TransitionRecord] {
        &self.transitions
    }

    /// Forget the previous cycle's log. Only valid while idle.
    pub fn restart(&mut self) -> Result<(), IllegalTransition> {
        if self.current.is_running() {
            return Err(IllegalTransition {
                from: self.current,
                to: CycleState::StructuringDocuments,
            });
        }
        *self = Self::new();
        Ok(())
    }

    /// Move to `to` if the edge is legal, recording it.
    pub fn advance(&mut self, to: CycleState, reason: Option<&str>) -> Result<(), IllegalTransition> {
        if !is_legal_transition(self.current, to) {
            return Err(IllegalTransition {
                from: self.current,
                to,
            });
        }

        let record = TransitionRecord {
            from: self.current,
            to,
            round: self.round,
            elapsed_ms: self.started_at.elapsed().as_millis() as u64,
            reason: reason.map(String::from),
        };
        tracing::info!(
            from = %record.from,
            to = %record.to,
            round = record.round,
            elapsed_ms = record.elapsed_ms,
            reason = record.reason.as_deref().unwrap_or(""),
            "Cycle transition"
        );
        self.transitions.push(record);
        self.current = to;
        Ok(())
    }

    /// Return to `Idle` from wherever the cycle stopped. No-op when idle.
    pub fn abort(&mut self, reason: &str) {
        if self.current.is_running() {
            // Idle is reachable from every running state.
            let _ = self.advance(CycleState::Idle, Some(reason));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use CycleState::*;

    fn walk(machine: &mut CycleMachine, states: &[CycleState]) {
        for &s in states {
            machine.advance(s, None).unwrap();
        }
    }

    #[test]
    fn happy_path_is_legal() {
        let mut m = CycleMachine::new();
        walk(
            &mut m,
            &[
                StructuringDocuments,
                DecisionProposal,
                JudgeCritique,
                DecisionRevision,
                JudgeApproval,
                AuditorApproval,
                AuditorLearning,
                Idle,
            ],
        );
        assert_eq!(m.current(), Idle);
        assert_eq!(m.transitions().len(), 8);
        assert_eq!(m.transitions()[0].from, Idle);
    }

    #[test]
    fn revision_loop_and_rejection_are_legal() {
        let mut m = CycleMachine::new();
        walk(
            &mut m,
            &[
                StructuringDocuments,
                DecisionProposal,
                JudgeCritique,
                DecisionRevision,
                JudgeApproval,
                DecisionRevision,
                JudgeApproval,
                Idle,
            ],
        );
        assert_eq!(m.current(), Idle);
    }

    #[test]
    fn skipping_steps_is_rejected() {
        let mut m = CycleMachine::new();
        let err = m.advance(JudgeCritique, None).unwrap_err();
        assert_eq!(err.from, Idle);
        assert_eq!(err.to, JudgeCritique);
        assert!(m.transitions().is_empty());

        walk(&mut m, &[StructuringDocuments, DecisionProposal]);
        assert!(m.advance(AuditorApproval, None).is_err());
        assert_eq!(m.current(), DecisionProposal);
    }

    #[test]
    fn idle_to_idle_is_illegal() {
        assert!(!is_legal_transition(Idle, Idle));
    }

    #[test]
    fn abort_returns_to_idle_with_reason() {
        let mut m = CycleMachine::new();
        walk(&mut m, &[StructuringDocuments, DecisionProposal, JudgeCritique]);
        m.abort("backend failed");
        assert_eq!(m.current(), Idle);
        let last = m.transitions().last().unwrap();
        assert_eq!(last.from, JudgeCritique);
        assert_eq!(last.reason.as_deref(), Some("backend failed"));

        let before = m.transitions().len();
        m.abort("again");
        assert_eq!(m.transitions().len(), before);
    }

    #[test]
    fn restart_only_while_idle() {
        let mut m = CycleMachine::new();
        m.advance(StructuringDocuments, None).unwrap();
        assert!(m.restart().is_err());
        m.abort("stop");
        m.restart().unwrap();
        assert!(m.transitions().is_empty());
        assert_eq!(m.round(), 0);
    }

    #[test]
    fn display_matches_variant_names() {
        assert_eq!(JudgeApproval.to_string(), "JudgeApproval");
        assert_eq!(
            serde_json::to_string(&StructuringDocuments).unwrap(),
            "\"structuring_documents\""
        );
    }
}
