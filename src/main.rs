use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use uuid::Uuid;

use tribunal::api::{self, AppState};
use tribunal::backend::{GenerationBackend, HttpBackend, LocalBackend};
use tribunal::config::{AppConfig, RuntimeArgs};
use tribunal::models::*;
use tribunal::orchestrator::{Orchestrator, OrchestratorConfig};
use tribunal::store::{KnowledgeStore, Workspace};

#[derive(Parser)]
#[command(name = "tribunal")]
#[command(about = "Three-agent planning debate with a learned rule base")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP server
    Serve {
        /// Port for HTTP API
        #[arg(short, long, env = "TRIBUNAL_PORT", default_value = "3000")]
        port: u16,

        #[command(flatten)]
        runtime: RuntimeArgs,
    },
    /// Run one generation cycle and print the debate
    Run {
        /// Project goal the agents plan for
        #[arg(short, long)]
        goal: String,

        /// Base URL of a tribunal server whose /api/agents does the generation
        #[arg(long)]
        remote: Option<String>,

        /// Keep the agent pacing delays instead of running straight through
        #[arg(long)]
        paced: bool,

        #[command(flatten)]
        runtime: RuntimeArgs,
    },
    /// Manage the durable knowledge rules
    Rules {
        #[command(subcommand)]
        action: RulesCommand,

        #[command(flatten)]
        runtime: RuntimeArgs,
    },
}

#[derive(Subcommand)]
enum RulesCommand {
    /// List every rule
    List,
    /// Add a rule by hand
    Add {
        #[arg(short, long)]
        category: String,
        /// Rule text
        rule: String,
        /// Confidence in [0, 1] (default 0.7)
        #[arg(long)]
        confidence: Option<f64>,
        #[arg(long, default_value = "manual")]
        source: String,
    },
    /// Flip a rule between active and inactive
    Toggle { id: Uuid },
    /// Delete a rule
    Delete { id: Uuid },
}

/// Initialize tracing with output to stderr (for CLI output) or stdout
fn init_tracing(use_stderr: bool) {
    let filter = tracing_subscriber::EnvFilter::new(
        std::env::var("RUST_LOG").unwrap_or_else(|_| "tribunal=debug,tower_http=debug".into()),
    );

    if use_stderr {
        // Printed transcripts and rule listings own stdout
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let use_stderr = matches!(
        cli.command,
        Some(Commands::Run { .. }) | Some(Commands::Rules { .. })
    );
    init_tracing(use_stderr);

    match cli.command {
        Some(Commands::Serve { port, runtime }) => serve(AppConfig::new(runtime, port)).await?,
        Some(Commands::Run {
            goal,
            remote,
            paced,
            runtime,
        }) => {
            let mut config = AppConfig::new(runtime, 0);
            if !paced {
                config.orchestrator = OrchestratorConfig {
                    max_rounds: config.orchestrator.max_rounds,
                    ..OrchestratorConfig::immediate()
                };
            }
            run_cycle(config, &goal, remote).await?;
        }
        Some(Commands::Rules { action, runtime }) => {
            manage_rules(AppConfig::new(runtime, 0), action)?;
        }
        None => {
            // Default: start server with env/default settings
            let cli = Cli::parse_from(["tribunal", "serve"]);
            if let Some(Commands::Serve { port, runtime }) = cli.command {
                serve(AppConfig::new(runtime, port)).await?;
            }
        }
    }

    Ok(())
}

async fn serve(config: AppConfig) -> anyhow::Result<()> {
    tracing::info!("Starting tribunal server on port {}", config.port);

    let db = config.open_database()?;
    let workspace = Workspace::open(db)?.into_shared();
    let backend: Arc<dyn GenerationBackend> = Arc::new(LocalBackend::with_latency(
        std::time::Duration::from_millis(500),
        std::time::Duration::from_millis(300),
    ));
    let state = AppState::new(workspace, backend, config.orchestrator.clone());
    if config.security.is_enabled() {
        tracing::info!("API key authentication or rate limiting enabled");
    }
    let app = api::create_router_with_security(state, config.security.clone());

    let listener = tokio::net::TcpListener::bind(format!("127.0.0.1:{}", config.port)).await?;
    tracing::info!(
        "tribunal server listening on http://127.0.0.1:{}",
        config.port
    );

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<std::net::SocketAddr>(),
    )
    .await?;
    Ok(())
}

async fn run_cycle(config: AppConfig, goal: &str, remote: Option<String>) -> anyhow::Result<()> {
    let db = config.open_database()?;
    let workspace = Workspace::open(db)?.into_shared();
    let backend: Arc<dyn GenerationBackend> = match remote {
        Some(url) => {
            tracing::info!("Using remote generation backend at {}", url);
            Arc::new(HttpBackend::new(url, std::env::var("TRIBUNAL_API_KEY").ok()))
        }
        None => Arc::new(LocalBackend::new()),
    };
    let orchestrator = Orchestrator::new(workspace.clone(), backend, config.orchestrator);

    let result = orchestrator.run(goal).await;

    let ws = workspace.lock();
    for message in ws.debate.messages() {
        let score = message
            .score
            .map(|s| format!(" ({}/100)", s))
            .unwrap_or_default();
        println!(
            "── {} · {:?}{}\n{}\n",
            message.agent_id.name(),
            message.kind,
            score,
            message.content
        );
    }

    let outcome = result?;
    let s = &outcome.final_score;
    println!(
        "Final score {} (strategic fit {}, feasibility {}, completeness {}, clarity {}) after {} round(s): {}",
        s.overall(),
        s.strategic_fit(),
        s.feasibility(),
        s.completeness(),
        s.clarity(),
        outcome.rounds,
        if outcome.approved { "approved" } else { "rejected" }
    );
    if !outcome.rules_learned.is_empty() {
        println!("\nLearned rules:");
        for rule in &outcome.rules_learned {
            print_rule(rule);
        }
    }
    Ok(())
}

fn manage_rules(config: AppConfig, action: RulesCommand) -> anyhow::Result<()> {
    let mut store = KnowledgeStore::open(config.open_database()?)?;

    match action {
        RulesCommand::List => {
            if store.rules().is_empty() {
                println!("No rules yet.");
            }
            for rule in store.rules() {
                print_rule(rule);
            }
        }
        RulesCommand::Add {
            category,
            rule,
            confidence,
            source,
        } => {
            let added = store.add_rule(RuleDraft {
                category,
                rule,
                confidence,
                source,
                is_active: true,
            })?;
            print_rule(&added);
        }
        RulesCommand::Toggle { id } => print_rule(&store.toggle_active(id)?),
        RulesCommand::Delete { id } => {
            store.delete_rule(id)?;
            println!("Deleted {}", id);
        }
    }
    Ok(())
}

fn print_rule(rule: &KnowledgeRule) {
    println!(
        "{} [{}] {} (confidence {:.2}, used {}x{})",
        rule.id,
        rule.category,
        rule.rule,
        rule.confidence,
        rule.usage_count,
        if rule.is_active { "" } else { ", inactive" }
    );
}
