use std::fmt;

use serde::{Deserialize, Serialize};

/// The three fixed roles that drive a cycle.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "kebab-case")]
pub enum AgentId {
    DecisionMaker,
    Judge,
    Auditor,
}

impl AgentId {
    pub const ALL: [AgentId; 3] = [Self::DecisionMaker, Self::Judge, Self::Auditor];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::DecisionMaker => "decision-maker",
            Self::Judge => "judge",
            Self::Auditor => "auditor",
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::DecisionMaker => "Decision Maker",
            Self::Judge => "Judge",
            Self::Auditor => "Auditor",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Self::DecisionMaker => "Drafts the initial plan and proposes revisions",
            Self::Judge => "Scores the plan and returns critique",
            Self::Auditor => "Grants final approval and extracts learned rules",
        }
    }

    /// Role instructions handed to an inference-backed generator.
    pub fn system_prompt(&self) -> &'static str {
        match self {
            Self::DecisionMaker => {
                "You are the Decision Maker. Analyse the project goal and write structured \
                 planning documents (Blueprint, Module, Detail, Implementation). Give every \
                 document a clear purpose, scope, functional requirements and technical \
                 specification, illustrate architecture with Mermaid diagrams, and revise \
                 your proposal in response to the Judge's feedback."
            }
            Self::Judge => {
                "You are the Judge. Independently evaluate the Decision Maker's documents on \
                 strategic fit, feasibility, completeness and clarity (each 0-100). Point out \
                 concrete weaknesses and alternatives. Recommend conditional approval at 70 \
                 and unconditional approval at 85."
            }
            Self::Auditor => {
                "You are the Auditor. Review the debate between the Decision Maker and the \
                 Judge, decide final approval, and extract reusable rules (category, rule, \
                 confidence 0.0-1.0) to guide future generations."
            }
        }
    }
}

impl fmt::Display for AgentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// What an agent is doing right now.
///
/// The nominal order is `Idle → Thinking → Writing → Evaluating → Complete`,
/// but any status may follow any other; sequencing belongs to the
/// orchestrator.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum AgentStatus {
    #[default]
    Idle,
    Thinking,
    Writing,
    Evaluating,
    Complete,
}

/// Ephemeral per-session view of one agent.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Agent {
    pub id: AgentId,
    pub name: String,
    pub description: String,
    pub status: AgentStatus,
    pub current_task: Option<String>,
}

impl Agent {
    pub fn idle(id: AgentId) -> Self {
        Self {
            id,
            name: id.name().to_string(),
            description: id.description().to_string(),
            status: AgentStatus::Idle,
            current_task: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_use_kebab_case() {
        assert_eq!(serde_json::to_string(&AgentId::DecisionMaker).unwrap(), "\"decision-maker\"");
        assert_eq!(AgentId::DecisionMaker.as_str(), "decision-maker");
        assert_eq!(AgentId::Auditor.to_string(), "Auditor");
    }

    #[test]
    fn every_role_has_a_prompt() {
        for id in AgentId::ALL {
            assert!(id.system_prompt().contains(id.name()));
        }
    }

    #[test]
    fn idle_agent_carries_descriptor() {
        let agent = Agent::idle(AgentId::Judge);
        assert_eq!(agent.name, "Judge");
        assert_eq!(agent.status, AgentStatus::Idle);
        assert!(agent.current_task.is_none());
    }
}
