//! Tribunal: a Decision Maker proposes a plan, a Judge critiques and scores
//! it, an Auditor approves it and distills reusable knowledge rules that bias
//! the next cycle's evaluation.

pub mod api;
pub mod backend;
pub mod config;
pub mod db;
pub mod engine;
pub mod models;
pub mod orchestrator;
pub mod store;
