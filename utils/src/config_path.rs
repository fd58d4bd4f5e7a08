use anyhow::{anyhow, Result};
use std::path::{Path, PathBuf};

/// Directory name for per-workspace state, relative to the workdir.
pub const STATE_DIR: &str = ".callship";

/// Get the path to the user-level callship config directory
/// On macOS: ~/Library/Application Support/callship
/// On Linux: ~/.config/callship
/// On Windows: %APPDATA%\callship
pub fn get_config_dir() -> Result<PathBuf> {
    let mut path = dirs::config_dir().ok_or_else(|| anyhow!("Could not find config directory"))?;
    path.push("callship");
    Ok(path)
}

/// Pipeline state file for one workspace.
pub fn get_state_path(workdir: &Path) -> PathBuf {
    workdir.join(STATE_DIR).join("state.json")
}

/// Workspace config file, falling back to the user-level one.
pub fn find_config_file(workdir: &Path) -> Option<PathBuf> {
    let local = workdir.join("callship.yaml");
    if local.exists() {
        return Some(local);
    }
    let global = get_config_dir().ok()?.join("callship.yaml");
    if global.exists() {
        Some(global)
    } else {
        None
    }
}
