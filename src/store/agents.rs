use crate::models::*;

/// Per-session status of the three fixed agents.
///
/// Any status may follow any other; ordering discipline belongs to the
/// orchestrator.
#[derive(Debug, Clone)]
pub struct AgentTracker {
    agents: [Agent; 3],
}

impl Default for AgentTracker {
    fn default() -> Self {
        Self {
            agents: AgentId::ALL.map(Agent::idle),
        }
    }
}

impl AgentTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Overwrite status and task of one agent together.
    pub fn set_status(&mut self, id: AgentId, status: AgentStatus, task: Option<String>) {
        let agent = self.slot_mut(id);
        agent.status = status;
        agent.current_task = task;
    }

    pub fn reset_all(&mut self) {
        for agent in &mut self.agents {
            agent.status = AgentStatus::Idle;
            agent.current_task = None;
        }
    }

    pub fn get(&self, id: AgentId) -> &Agent {
        &self.agents[Self::index(id)]
    }

    pub fn all(&self) -> &[Agent] {
        &self.agents
    }

    fn slot_mut(&mut self, id: AgentId) -> &mut Agent {
        &mut self.agents[Self::index(id)]
    }

    fn index(id: AgentId) -> usize {
        match id {
            AgentId::DecisionMaker => 0,
            AgentId::Judge => 1,
            AgentId::Auditor => 2,
        }
    }
}
