//! Analyzer passes over parsed files.
//!
//! The first four modules are file-local and run during the walk; `verify`
//! is project-wide and runs once over the retained file views.

pub mod header;
pub mod purpose;
pub mod quality;
pub mod signature;
pub mod structure;
pub mod verify;
