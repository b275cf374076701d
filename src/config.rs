//! Runtime configuration from CLI flags with `TRIBUNAL_*` environment fallbacks.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::Result;
use clap::Args;

use crate::api::middleware::SecurityConfig;
use crate::db::{self, Database};
use crate::orchestrator::OrchestratorConfig;

/// Flags shared by every command that opens the workspace.
#[derive(Debug, Clone, Args)]
pub struct RuntimeArgs {
    /// Directory holding tribunal.db (default: platform data directory)
    #[arg(long, env = "TRIBUNAL_DATA_DIR")]
    pub data_dir: Option<PathBuf>,

    /// Agent "thinking" pause per step, in milliseconds
    #[arg(long, env = "TRIBUNAL_THINK_MS", default_value = "1000")]
    pub think_ms: u64,

    /// Pause per generated document, in milliseconds
    #[arg(long, env = "TRIBUNAL_WRITE_MS", default_value = "300")]
    pub write_ms: u64,

    /// Maximum critique/revision rounds per cycle
    #[arg(long, env = "TRIBUNAL_MAX_ROUNDS", default_value = "3")]
    pub max_rounds: u32,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub data_dir: Option<PathBuf>,
    pub port: u16,
    pub orchestrator: OrchestratorConfig,
    pub security: SecurityConfig,
}

impl AppConfig {
    pub fn new(args: RuntimeArgs, port: u16) -> Self {
        Self {
            data_dir: args.data_dir,
            port,
            orchestrator: OrchestratorConfig {
                think_delay: Duration::from_millis(args.think_ms),
                write_delay: Duration::from_millis(args.write_ms),
                max_rounds: args.max_rounds.max(1),
            },
            security: SecurityConfig::from_env(),
        }
    }

    pub fn database_path(&self) -> Result<PathBuf> {
        match &self.data_dir {
            Some(dir) => Ok(dir.join("tribunal.db")),
            None => db::default_path(),
        }
    }

    /// Open and migrate the durable store.
    pub fn open_database(&self) -> Result<Database> {
        let path = self.database_path()?;
        tracing::debug!(path = %path.display(), "Opening database");
        let db = Database::open(path)?;
        db.migrate()?;
        Ok(db)
    }
}
