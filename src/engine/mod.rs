//! Pure functions behind the three agents: templated generation for the
//! Decision Maker, scoring for the Judge, and rule extraction for the Auditor.

pub mod content;
pub mod evaluation;
pub mod extraction;

pub use content::{adr_for, generate_adr, revised_content, simulated_debate, structure_drafts};
pub use evaluation::{evaluate, matched_rules, rule_matches};
pub use extraction::{classify, extract};
