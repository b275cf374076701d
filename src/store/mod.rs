//! Session state owned by a [`Workspace`] and handed to the orchestrator and
//! the HTTP layer as a shared handle.
//!
//! All mutations are synchronous; callers hold the workspace lock for one
//! logical read-modify-write and never across an await point.

mod agents;
mod debate;
mod documents;
mod knowledge;
mod metrics;

use std::sync::{Arc, Mutex, MutexGuard};

use thiserror::Error;
use uuid::Uuid;

pub use agents::AgentTracker;
pub use debate::{DebateLog, DebateSnapshot};
pub use documents::DocumentStore;
pub use knowledge::{KnowledgeStore, STORE_KEY};
pub use metrics::MetricsStore;

use crate::db::Database;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("{kind} not found: {id}")]
    NotFound { kind: &'static str, id: Uuid },

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Moving document {id} under {parent_id} would create a cycle")]
    Cycle { id: Uuid, parent_id: Uuid },

    #[error("Persistence error: {0}")]
    Persistence(anyhow::Error),
}

impl StoreError {
    pub fn not_found(kind: &'static str, id: Uuid) -> Self {
        Self::NotFound { kind, id }
    }
}

/// Everything one session knows: the document tree, the rule base, agent
/// status, the debate transcript, metrics and the processing flags.
pub struct Workspace {
    pub documents: DocumentStore,
    pub knowledge: KnowledgeStore,
    pub agents: AgentTracker,
    pub debate: DebateLog,
    pub metrics: MetricsStore,
    pub project_goal: String,
    pub is_processing: bool,
    /// The single user-visible message from the last failed cycle.
    pub last_error: Option<String>,
}

impl Workspace {
    /// Fresh session on top of the durable rule base in `db`.
    pub fn open(db: Database) -> Result<Self, StoreError> {
        Ok(Self {
            documents: DocumentStore::new(),
            knowledge: KnowledgeStore::open(db)?,
            agents: AgentTracker::new(),
            debate: DebateLog::new(),
            metrics: MetricsStore::new(),
            project_goal: String::new(),
            is_processing: false,
            last_error: None,
        })
    }

    pub fn into_shared(self) -> SharedWorkspace {
        SharedWorkspace(Arc::new(Mutex::new(self)))
    }
}

/// Cloneable handle to a [`Workspace`].
#[derive(Clone)]
pub struct SharedWorkspace(Arc<Mutex<Workspace>>);

impl SharedWorkspace {
    pub fn lock(&self) -> MutexGuard<'_, Workspace> {
        self.0.lock().expect("workspace lock poisoned")
    }
}
