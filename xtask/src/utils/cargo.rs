use crate::{Context, Result};
use std::path::Path;
use std::process::Command;

/// Runs `cargo <args>` inside the project directory `path`.
///
/// # Errors
///
/// Returns an error if the directory does not exist, cargo cannot be spawned
/// or it exits unsuccessfully.
pub fn run_cargo(path: &str, args: &[&str]) -> Result<()> {
    if !Path::new(path).exists() {
        anyhow::bail!("Path does not exist: {path}");
    }

    let status = Command::new("cargo")
        .args(args)
        .current_dir(path)
        .status()
        .with_context(|| format!("Failed to execute cargo {} for {path}", args.join(" ")))?;

    if !status.success() {
        anyhow::bail!("cargo {} failed for {path}", args.join(" "));
    }

    Ok(())
}
