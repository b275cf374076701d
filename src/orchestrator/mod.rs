//! Drives one generation cycle across the three agents.
//!
//! The cycle runs as a single task. Each step takes the workspace lock for
//! one synchronous read-modify-write; pacing sleeps and backend calls happen
//! with the lock released.

mod state;

use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use serde::Serialize;
use thiserror::Error;
use tokio::task::JoinHandle;
use uuid::Uuid;

pub use state::{is_legal_transition, CycleMachine, CycleState, IllegalTransition, TransitionRecord};

use crate::backend::{BackendError, DocumentPayload, GenerationBackend};
use crate::engine;
use crate::models::*;
use crate::store::{SharedWorkspace, StoreError, Workspace};

#[derive(Debug, Error)]
pub enum CycleError {
    #[error("A generation cycle is already running")]
    Busy,

    #[error("Project goal must not be empty")]
    EmptyGoal,

    #[error("Generation backend failed: {0}")]
    Backend(#[from] BackendError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Transition(#[from] IllegalTransition),
}

/// Pacing and round budget for a cycle.
#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    /// Pause while an agent is "thinking" before each step.
    pub think_delay: Duration,
    /// Pause per document while the skeleton is written out.
    pub write_delay: Duration,
    /// Maximum number of revision rounds.
    pub max_rounds: u32,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            think_delay: Duration::from_millis(1000),
            write_delay: Duration::from_millis(300),
            max_rounds: 3,
        }
    }
}

impl OrchestratorConfig {
    /// No pacing; used by tests and the one-shot CLI.
    pub fn immediate() -> Self {
        Self {
            think_delay: Duration::ZERO,
            write_delay: Duration::ZERO,
            ..Self::default()
        }
    }
}

/// What a finished cycle produced.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CycleOutcome {
    pub root_id: Uuid,
    pub document_ids: Vec<Uuid>,
    pub final_score: EvaluationScore,
    pub approved: bool,
    pub rounds: u32,
    pub rules_learned: Vec<KnowledgeRule>,
}

/// Read model for `/cycles/status`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CycleStatus {
    pub state: CycleState,
    pub is_processing: bool,
    pub last_error: Option<String>,
    pub transitions: Vec<TransitionRecord>,
}

#[derive(Clone)]
pub struct Orchestrator {
    workspace: SharedWorkspace,
    backend: Arc<dyn GenerationBackend>,
    config: OrchestratorConfig,
    machine: Arc<Mutex<CycleMachine>>,
}

impl Orchestrator {
    pub fn new(
        workspace: SharedWorkspace,
        backend: Arc<dyn GenerationBackend>,
        config: OrchestratorConfig,
    ) -> Self {
        Self {
            workspace,
            backend,
            config,
            machine: Arc::new(Mutex::new(CycleMachine::new())),
        }
    }

    pub fn workspace(&self) -> &SharedWorkspace {
        &self.workspace
    }

    pub fn status(&self) -> CycleStatus {
        let (is_processing, last_error) = {
            let ws = self.workspace.lock();
            (ws.is_processing, ws.last_error.clone())
        };
        let machine = self.machine();
        CycleStatus {
            state: machine.current(),
            is_processing,
            last_error,
            transitions: machine.transitions().to_vec(),
        }
    }

    /// Claim the workspace and run the cycle in the background.
    ///
    /// Fails with [`CycleError::Busy`] without touching any state when a
    /// cycle is already running.
    pub fn start(
        &self,
        goal: impl Into<String>,
    ) -> Result<JoinHandle<Result<CycleOutcome, CycleError>>, CycleError> {
        let goal = goal.into();
        self.begin(&goal)?;
        let this = self.clone();
        Ok(tokio::spawn(async move { this.complete(&goal).await }))
    }

    /// Run a full cycle to completion on the current task.
    pub async fn run(&self, goal: &str) -> Result<CycleOutcome, CycleError> {
        self.begin(goal)?;
        self.complete(goal).await
    }

    fn begin(&self, goal: &str) -> Result<(), CycleError> {
        let goal = goal.trim();
        if goal.is_empty() {
            return Err(CycleError::EmptyGoal);
        }

        let mut ws = self.workspace.lock();
        if ws.is_processing {
            return Err(CycleError::Busy);
        }
        self.machine().restart()?;

        ws.is_processing = true;
        ws.last_error = None;
        ws.project_goal = goal.to_string();
        ws.debate.clear();
        ws.debate.set_debating(false);
        ws.agents.reset_all();
        tracing::info!(goal, "Starting generation cycle");
        Ok(())
    }

    async fn complete(&self, goal: &str) -> Result<CycleOutcome, CycleError> {
        let result = self.drive(goal.trim()).await;

        if let Err(ref e) = result {
            tracing::error!(error = %e, "Generation cycle aborted");
            self.machine().abort(&e.to_string());
        }
        self.update(|ws| {
            if let Err(ref e) = result {
                ws.last_error = Some(e.to_string());
            }
            ws.debate.set_debating(false);
            ws.agents.reset_all();
            ws.is_processing = false;
        });

        result
    }

    async fn drive(&self, goal: &str) -> Result<CycleOutcome, CycleError> {
        let started = Instant::now();

        // Structure
        self.advance(CycleState::StructuringDocuments, None)?;
        self.think(AgentId::DecisionMaker, "Analyzing project structure...")
            .await;
        let rules = self.update(|ws| ws.knowledge.rules().to_vec());
        let structure = self.backend.start_generation(goal, &rules).await?;
        if structure.documents.is_empty() {
            return Err(BackendError::Generation("no documents were generated".into()).into());
        }

        let mut root_id: Option<Uuid> = None;
        let mut document_ids = Vec::with_capacity(structure.documents.len());
        let mut doc_types = Vec::with_capacity(structure.documents.len());
        for mut draft in structure.documents {
            doc_types.push(draft.doc_type);
            self.update(|ws| {
                ws.agents.set_status(
                    AgentId::DecisionMaker,
                    AgentStatus::Writing,
                    Some(format!("Writing {}...", draft.title)),
                )
            });
            pause(self.config.write_delay).await;

            draft.parent_id = root_id;
            let id = self.update(|ws| -> Result<Uuid, StoreError> {
                let id = ws.documents.add(draft)?;
                if root_id.is_none() {
                    ws.documents.set_root(id)?;
                }
                Ok(id)
            })?;
            root_id.get_or_insert(id);
            document_ids.push(id);
        }
        let root_id = root_id.ok_or_else(|| StoreError::InvalidInput("no root document".into()))?;

        // Proposal
        self.advance(CycleState::DecisionProposal, None)?;
        let proposal_id = self.update(|ws| {
            let id = ws
                .debate
                .append(NewDebateMessage::new(
                    AgentId::DecisionMaker,
                    MessageKind::Proposal,
                    proposal_summary(goal, &doc_types),
                ))
                .id;
            ws.agents
                .set_status(AgentId::DecisionMaker, AgentStatus::Complete, None);
            ws.debate.increment_round();
            id
        });

        // Critique
        self.advance(CycleState::JudgeCritique, None)?;
        self.think(AgentId::Judge, "Evaluating the proposal...").await;
        self.update(|ws| ws.debate.set_debating(true));
        let mut score = self.evaluate_root(root_id).await?;
        let mut last_message_id = self.update(|ws| -> Result<Uuid, StoreError> {
            ws.agents
                .set_status(AgentId::Judge, AgentStatus::Evaluating, None);
            ws.documents.update(
                root_id,
                UpdateDocumentInput {
                    status: Some(DocumentStatus::Reviewing),
                    score: Some(score.clone()),
                    ..Default::default()
                },
            )?;
            Ok(ws
                .debate
                .append(critique_message(&score).replying_to(proposal_id))
                .id)
        })?;
        pause(self.config.think_delay).await;

        // Revision rounds
        let max_rounds = self.config.max_rounds.max(1);
        let mut round = 0;
        loop {
            round += 1;
            self.machine().set_round(round);
            self.advance(
                CycleState::DecisionRevision,
                Some(&format!("overall {}", score.overall())),
            )?;
            self.update(|ws| {
                ws.agents.set_status(
                    AgentId::DecisionMaker,
                    AgentStatus::Writing,
                    Some("Applying feedback...".into()),
                )
            });
            pause(self.config.think_delay).await;

            let (version, rules) = self.update(|ws| -> Result<_, StoreError> {
                let doc = ws
                    .documents
                    .get(root_id)
                    .ok_or_else(|| StoreError::not_found("Document", root_id))?;
                Ok((doc.version + 1, ws.knowledge.rules().to_vec()))
            })?;
            let revision = self
                .backend
                .generate_document(goal, root_id, version, &rules)
                .await?;

            last_message_id = self.update(|ws| -> Result<Uuid, StoreError> {
                ws.documents.update(
                    root_id,
                    UpdateDocumentInput {
                        content: Some(revision.content),
                        version: Some(version),
                        ..Default::default()
                    },
                )?;
                let message = NewDebateMessage::new(
                    AgentId::DecisionMaker,
                    MessageKind::CounterProposal,
                    format!(
                        "Revised the plan after feedback (version {}).\n\nAddressed: {}",
                        version,
                        score.feedback()
                    ),
                )
                .replying_to(last_message_id);
                let id = ws.debate.append(message).id;
                ws.agents
                    .set_status(AgentId::DecisionMaker, AgentStatus::Complete, None);
                ws.debate.increment_round();
                Ok(id)
            })?;

            self.advance(CycleState::JudgeApproval, None)?;
            self.think(AgentId::Judge, "Re-evaluating the revision...")
                .await;
            score = self.evaluate_root(root_id).await?;
            self.update(|ws| {
                ws.documents.update(
                    root_id,
                    UpdateDocumentInput {
                        score: Some(score.clone()),
                        ..Default::default()
                    },
                )
                .map(|_| ())
            })?;

            if score.overall() >= EXCELLENT_THRESHOLD || round >= max_rounds {
                break;
            }
            last_message_id = self.update(|ws| {
                ws.debate
                    .append(critique_message(&score).replying_to(last_message_id))
                    .id
            });
        }

        let approved = score.is_approved();
        let mut learned = Vec::new();

        if approved {
            let root = self.update(|ws| -> Result<DocumentPayload, StoreError> {
                ws.debate.append(
                    NewDebateMessage::new(
                        AgentId::Judge,
                        MessageKind::Approval,
                        format!(
                            "The revision is an improvement.\n\n{}\n\nOverall: {} - approval recommended",
                            score_lines(&score),
                            score.overall()
                        ),
                    )
                    .with_score(score.overall())
                    .replying_to(last_message_id),
                );
                ws.agents
                    .set_status(AgentId::Judge, AgentStatus::Complete, None);
                let doc = ws.documents.update(
                    root_id,
                    UpdateDocumentInput {
                        status: Some(DocumentStatus::Approved),
                        ..Default::default()
                    },
                )?;
                Ok(DocumentPayload::from(doc))
            })?;

            // Auditor sign-off
            self.advance(CycleState::AuditorApproval, None)?;
            self.think(AgentId::Auditor, "Final verification and rule extraction...")
                .await;
            self.update(|ws| {
                ws.debate.append(NewDebateMessage::new(
                    AgentId::Auditor,
                    MessageKind::Approval,
                    format!(
                        "Final approval granted.\n\nReasons:\n- Evaluation score {} (threshold {})\n\
                         - The Judge recommended approval\n- Clear phase separation\n\n\
                         The document is formally approved.",
                        score.overall(),
                        APPROVAL_THRESHOLD
                    ),
                ));
            });

            // Learning: lessons go into the transcript before extraction reads it.
            self.advance(CycleState::AuditorLearning, None)?;
            let messages = self.update(|ws| {
                for lesson in lessons(ws.debate.messages()) {
                    ws.debate.append(NewDebateMessage::new(
                        AgentId::Auditor,
                        MessageKind::Learning,
                        lesson,
                    ));
                }
                ws.debate.messages().to_vec()
            });
            let approval = self.backend.approve_document(&root, &messages).await?;

            learned = self.update(|ws| -> Result<Vec<KnowledgeRule>, StoreError> {
                ws.documents.update(
                    root_id,
                    UpdateDocumentInput {
                        adr: Some(approval.adr),
                        ..Default::default()
                    },
                )?;
                let mut learned = Vec::with_capacity(approval.new_rules.len());
                for draft in approval.new_rules {
                    learned.push(ws.knowledge.add_rule(draft)?);
                }
                ws.debate.append(NewDebateMessage::new(
                    AgentId::Auditor,
                    MessageKind::Learning,
                    learning_summary(&learned),
                ));
                ws.agents
                    .set_status(AgentId::Auditor, AgentStatus::Complete, None);
                Ok(learned)
            })?;
        } else {
            self.update(|ws| -> Result<(), StoreError> {
                ws.debate.append(
                    NewDebateMessage::new(
                        AgentId::Judge,
                        MessageKind::Critique,
                        format!(
                            "The plan is rejected after {} revision round(s).\n\n{}\n\n\
                             Overall: {} (approval requires {})",
                            round,
                            score_lines(&score),
                            score.overall(),
                            APPROVAL_THRESHOLD
                        ),
                    )
                    .with_score(score.overall())
                    .replying_to(last_message_id),
                );
                ws.agents
                    .set_status(AgentId::Judge, AgentStatus::Complete, None);
                ws.documents.update(
                    root_id,
                    UpdateDocumentInput {
                        status: Some(DocumentStatus::Rejected),
                        ..Default::default()
                    },
                )?;
                Ok(())
            })?;
        }

        // Metrics and selection
        self.update(|ws| -> Result<(), StoreError> {
            record_metrics(ws, document_ids.len(), round, &score, learned.len(), started);
            ws.debate.set_debating(false);
            ws.documents.select(Some(root_id))
        })?;

        let reason = if approved { "approved" } else { "rejected" };
        self.advance(CycleState::Idle, Some(reason))?;
        tracing::info!(%root_id, overall = score.overall(), rounds = round, reason, "Generation cycle finished");

        Ok(CycleOutcome {
            root_id,
            document_ids,
            final_score: score,
            approved,
            rounds: round,
            rules_learned: learned,
        })
    }

    /// Score the root through the backend, then count usage of every
    /// active rule that matched it.
    async fn evaluate_root(&self, root_id: Uuid) -> Result<EvaluationScore, CycleError> {
        let (payload, rules) = self.update(|ws| -> Result<_, StoreError> {
            let doc = ws
                .documents
                .get(root_id)
                .ok_or_else(|| StoreError::not_found("Document", root_id))?;
            Ok((DocumentPayload::from(doc), ws.knowledge.rules().to_vec()))
        })?;

        let evaluation = self.backend.evaluate_document(&payload, &rules).await?;

        self.update(|ws| -> Result<(), StoreError> {
            let matched: Vec<Uuid> = engine::matched_rules(&payload.content, ws.knowledge.rules())
                .into_iter()
                .map(|r| r.id)
                .collect();
            for id in matched {
                ws.knowledge.increment_usage(id)?;
            }
            Ok(())
        })?;

        Ok(evaluation.score)
    }

    async fn think(&self, agent: AgentId, task: &str) {
        self.update(|ws| {
            ws.agents
                .set_status(agent, AgentStatus::Thinking, Some(task.to_string()))
        });
        pause(self.config.think_delay).await;
    }

    fn advance(&self, to: CycleState, reason: Option<&str>) -> Result<(), IllegalTransition> {
        self.machine().advance(to, reason)
    }

    fn machine(&self) -> std::sync::MutexGuard<'_, CycleMachine> {
        self.machine.lock().expect("cycle machine lock poisoned")
    }

    fn update<R>(&self, f: impl FnOnce(&mut Workspace) -> R) -> R {
        let mut ws = self.workspace.lock();
        f(&mut ws)
    }
}

async fn pause(delay: Duration) {
    if !delay.is_zero() {
        tokio::time::sleep(delay).await;
    }
}

fn proposal_summary(goal: &str, doc_types: &[DocumentType]) -> String {
    let count = |t: DocumentType| doc_types.iter().filter(|d| **d == t).count();
    format!(
        "Drafted the initial plan for \"{}\".\n\n{} documents generated:\n\
         - Blueprint: {}\n- Module: {}\n- Detail: {}\n- Implementation: {}",
        goal,
        doc_types.len(),
        count(DocumentType::Blueprint),
        count(DocumentType::Module),
        count(DocumentType::Detail),
        count(DocumentType::Implementation),
    )
}

fn score_lines(score: &EvaluationScore) -> String {
    format!(
        "- Strategic fit: {}/100\n- Feasibility: {}/100\n- Completeness: {}/100\n- Clarity: {}/100",
        score.strategic_fit(),
        score.feasibility(),
        score.completeness(),
        score.clarity()
    )
}

/// Judge critique with the strongest dimension as an improvement and the
/// weakest as an issue.
fn critique_message(score: &EvaluationScore) -> NewDebateMessage {
    let dims = [
        ("Strategic fit", score.strategic_fit()),
        ("Feasibility", score.feasibility()),
        ("Completeness", score.completeness()),
        ("Clarity", score.clarity()),
    ];
    let strongest = dims.iter().max_by_key(|(_, v)| *v).map(|(n, _)| *n).unwrap_or("Structure");
    let weakest = dims.iter().min_by_key(|(_, v)| *v).map(|(n, _)| *n).unwrap_or("Structure");

    NewDebateMessage::new(
        AgentId::Judge,
        MessageKind::Critique,
        format!(
            "Reviewed the proposal.\n\n{}\n\nOverall: {}\n\n{}",
            score_lines(score),
            score.overall(),
            score.feedback()
        ),
    )
    .with_score(score.overall())
    .with_highlights(vec![
        DebateHighlight::new(HighlightKind::Improvement, format!("{} is the strongest dimension", strongest)),
        DebateHighlight::new(HighlightKind::Issue, format!("{} needs work", weakest))
            .with_suggestion(format!("Expand the sections that drive {}", weakest.to_lowercase())),
    ])
}

/// One lesson per distinct issue the Judge raised, in the order raised.
fn lessons(messages: &[DebateMessage]) -> Vec<String> {
    let mut lessons: Vec<String> = Vec::new();
    let issues = messages
        .iter()
        .filter(|m| m.agent_id == AgentId::Judge && m.kind == MessageKind::Critique)
        .flat_map(|m| &m.highlights)
        .filter(|h| h.kind == HighlightKind::Issue);
    for issue in issues {
        let lesson = match &issue.suggestion {
            Some(suggestion) => format!(
                "{} in the first draft; review found that {}.",
                suggestion,
                issue.text.to_lowercase()
            ),
            None => format!("Settle this before review: {}.", issue.text.to_lowercase()),
        };
        if !lessons.contains(&lesson) {
            lessons.push(lesson);
        }
    }
    lessons
}

fn learning_summary(learned: &[KnowledgeRule]) -> String {
    if learned.is_empty() {
        return "No new rules were learned this session.".into();
    }
    let mut text = String::from("Rules learned this session:\n");
    for (i, rule) in learned.iter().enumerate() {
        text.push_str(&format!("\n{}. [{}] {}", i + 1, rule.category, rule.rule));
    }
    text
}

fn record_metrics(
    ws: &mut Workspace,
    documents_generated: usize,
    rounds: u32,
    score: &EvaluationScore,
    rules_learned: usize,
    started: Instant,
) {
    let iteration = ws.metrics.metrics().iterations.len() as u32 + 1;
    ws.metrics.add_iteration(NewIteration {
        iteration,
        documents_generated: documents_generated as u32,
        average_score: score.overall() as f64,
        rules_learned: rules_learned as u32,
    });

    let approved = ws
        .documents
        .all()
        .iter()
        .filter(|d| d.status == DocumentStatus::Approved)
        .count();
    let rejected = ws
        .documents
        .all()
        .iter()
        .filter(|d| d.status == DocumentStatus::Rejected)
        .count();
    let decided = approved + rejected;
    let iterations = &ws.metrics.metrics().iterations;
    let average_score =
        iterations.iter().map(|i| i.average_score).sum::<f64>() / iterations.len() as f64;
    let message_count = ws.debate.messages().len().max(1);

    ws.metrics.update(UpdateMetricsInput {
        total_documents: Some(ws.documents.len() as u32),
        approved_documents: Some(approved as u32),
        rejection_rate: Some(if decided == 0 {
            0.0
        } else {
            rejected as f64 / decided as f64
        }),
        average_score: Some(average_score),
        generation_speed: Some(documents_generated as f64 / rounds.max(1) as f64),
        learning_efficiency: Some(rules_learned as f64 / message_count as f64),
    });
    tracing::debug!(
        iteration,
        elapsed_ms = started.elapsed().as_millis() as u64,
        "Recorded cycle metrics"
    );
}
