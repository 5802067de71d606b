//! Saved login session (~/.sleuth/session.json)

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SavedSession {
    pub server: String,
    pub wallet_address: String,
    pub token: String,
}

pub fn session_path() -> Result<PathBuf> {
    let home = std::env::var_os("HOME").ok_or_else(|| anyhow!("HOME is not set"))?;
    Ok(PathBuf::from(home).join(".sleuth").join("session.json"))
}

pub fn save(session: &SavedSession) -> Result<PathBuf> {
    let path = session_path()?;
    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create {}", dir.display()))?;
    }
    std::fs::write(&path, serde_json::to_string_pretty(session)?)
        .with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(path)
}

/// Session for `server`, if one was saved by `sleuth login`
pub fn load(server: &str) -> Result<Option<SavedSession>> {
    let path = session_path()?;
    if !path.exists() {
        return Ok(None);
    }
    let content = std::fs::read_to_string(&path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let session: SavedSession =
        serde_json::from_str(&content).context("Session file is corrupted, log in again")?;

    if session.server.trim_end_matches('/') == server.trim_end_matches('/') {
        Ok(Some(session))
    } else {
        Ok(None)
    }
}

pub fn require(server: &str) -> Result<SavedSession> {
    load(server)?.ok_or_else(|| anyhow!("Not logged in to {}. Run `sleuth login` first", server))
}
