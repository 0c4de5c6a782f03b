//! # xtask - Build Automation for sntpm
//!
//! Runs tests, checks, lints and formatting over the workspace crates and the
//! standalone demo projects under `demos/`, following the
//! [xtask pattern](https://github.com/matklad/cargo-xtask).
//!
//! Workspace crates are read from the root `Cargo.toml`; demos are every
//! directory under `demos/` with a `Cargo.toml`. Demos are kept out of the
//! workspace so their dependencies do not leak into the library lock file.

/// Build automation commands
pub mod commands;

/// Cargo invocation, project discovery and output helpers
pub mod utils;

pub use anyhow::{Context, Result};
pub use colored::Colorize;
