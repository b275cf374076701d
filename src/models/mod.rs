//! Domain models for the planning tribunal.
//!
//! # Core Concepts
//!
//! ## Session Entities
//!
//! These live only for the current session and are rebuilt every cycle:
//!
//! - [`Document`]: A planning document in a parent/child tree (blueprint → module → detail → implementation).
//! - [`DebateMessage`]: Append-only turn in the exchange between the three agents.
//! - [`Agent`]: Status of one of the three fixed roles ([`AgentId`]).
//! - [`ProjectMetrics`]: Aggregate figures over completed cycles.
//!
//! ## Durable Entities
//!
//! - [`KnowledgeRule`]: A learned heuristic that survives restarts and biases later evaluations.
//!
//! ## Artifacts
//!
//! - [`EvaluationScore`]: The Judge's weighted four-dimension score.
//! - [`Adr`]: Architecture Decision Record attached to an approved document.

mod adr;
mod agent;
mod debate;
mod document;
mod evaluation;
mod knowledge;
mod metrics;

pub use adr::*;
pub use agent::*;
pub use debate::*;
pub use document::*;
pub use evaluation::*;
pub use knowledge::*;
pub use metrics::*;
