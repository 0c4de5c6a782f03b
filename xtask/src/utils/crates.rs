use crate::Result;
use std::fs;
use std::path::Path;

/// Directory holding the standalone demo projects
pub const DEMOS_DIR: &str = "demos";

/// Retrieves the crates listed in `workspace.members` of the root
/// `Cargo.toml`, expanding glob patterns.
///
/// # Errors
///
/// Returns an error if the manifest cannot be read or parsed, or a glob
/// pattern is invalid.
pub fn get_workspace_crates() -> Result<Vec<String>> {
    let content = fs::read_to_string("Cargo.toml")?;
    let manifest: toml::Value = toml::from_str(&content)?;

    let members = manifest
        .get("workspace")
        .and_then(|ws| ws.get("members"))
        .and_then(|m| m.as_array())
        .ok_or_else(|| anyhow::anyhow!("Failed to parse workspace members from Cargo.toml"))?;

    let mut crates = Vec::new();
    for member in members.iter().filter_map(toml::Value::as_str) {
        if member.contains('*') {
            for entry in glob::glob(member)?.flatten() {
                crates.push(entry.to_string_lossy().into_owned());
            }
        } else {
            crates.push(member.to_string());
        }
    }

    crates.sort();
    Ok(crates)
}

/// Workspace crates except `xtask` itself
///
/// # Errors
///
/// See [`get_workspace_crates`].
pub fn get_library_crates() -> Result<Vec<String>> {
    Ok(get_workspace_crates()?
        .into_iter()
        .filter(|name| name != "xtask")
        .collect())
}

/// Paths of all directories under `demos/` that contain a `Cargo.toml`.
///
/// # Errors
///
/// Returns an error on I/O failures while scanning the directory.
pub fn get_demos() -> Result<Vec<String>> {
    let demos_dir = Path::new(DEMOS_DIR);
    if !demos_dir.exists() {
        return Ok(vec![]);
    }

    let mut demos = Vec::new();
    for entry in fs::read_dir(demos_dir)? {
        let path = entry?.path();

        if path.is_dir() && path.join("Cargo.toml").exists() {
            demos.push(path.to_string_lossy().into_owned());
        }
    }

    demos.sort();
    Ok(demos)
}
