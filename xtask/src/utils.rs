//! Utility functions and helpers for build automation
//!
//! - [`cargo`] - Cargo command execution helpers
//! - [`crates`] - Workspace crate and demo discovery
//! - [`output`] - Formatted terminal output

pub mod cargo;
pub mod crates;
pub mod output;

pub use cargo::*;
pub use crates::*;
pub use output::*;
