//! Proofcheck - existence proof checker for Python source trees.
//!
//! Every unit of code must carry a proof that it deserves to exist:
//! files declare a `# PROOF:` header with a depth level and a parent
//! reference, directories carry a `PROOF.md` contract, functions and
//! classes a `# PURPOSE:` comment, signatures their type annotations.
//! Proofcheck walks a tree, verifies these proofs, and layers structural
//! quality checks on top: unresolved imports and calls, oversized or
//! near-duplicate functions, and code nothing ever imports or calls.
//!
//! # Architecture
//!
//! The pipeline is two-phase. A depth-first walk runs the file-local
//! analyzers and retains each parsed file; a second pass runs the
//! project-wide liveness checks over the retained views. One fold at the
//! end turns the records into counters.
//!
//! - `model`: record and result types
//! - `grammar`: the proof header grammar and parent validation
//! - `config`: thresholds, pattern tables, and the YAML overlay
//! - `parser`: tree-sitter Python parsing and tree helpers
//! - `analyze`: the analyzer passes (header, purpose, signature,
//!   structure, quality, verify)
//! - `checker`: tree walker and orchestration
//! - `report`: output formatting (text, markdown, JSON, CI)

pub mod analyze;
pub mod checker;
pub mod cli;
pub mod config;
pub mod grammar;
pub mod model;
pub mod parser;
pub mod report;

pub use checker::{Checker, EngineError};
pub use config::{CheckConfig, ConfigFile};
pub use model::{CheckResult, Level, Status};
pub use report::Format;
