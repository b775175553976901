//! The logged-in user record written by `healthdesk login`.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::config::Config;

/// Explicit session passed into every API operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionContext {
    #[serde(rename = "id")]
    pub user_id: i64,
    pub username: String,
}

impl SessionContext {
    /// Letter shown next to the user's own chat messages
    pub fn initial(&self) -> char {
        self.username
            .chars()
            .next()
            .map(|c| c.to_ascii_uppercase())
            .unwrap_or('?')
    }

    pub fn default_path() -> Result<PathBuf> {
        Ok(Config::data_dir()?.join("session.json"))
    }

    /// Read the stored session. `Ok(None)` means nobody is logged in.
    pub fn load_from(path: &Path) -> Result<Option<Self>> {
        if !path.exists() {
            return Ok(None);
        }
        let content = fs::read_to_string(path)
            .with_context(|| format!("reading session file {}", path.display()))?;
        let session = serde_json::from_str(&content)
            .with_context(|| format!("parsing session file {}", path.display()))?;
        Ok(Some(session))
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }

    /// Remove the stored session. Returns false if there was none.
    pub fn clear_at(path: &Path) -> Result<bool> {
        if !path.exists() {
            return Ok(false);
        }
        fs::remove_file(path)?;
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_absent_session() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");
        assert!(SessionContext::load_from(&path).unwrap().is_none());
        assert!(!SessionContext::clear_at(&path).unwrap());
    }

    #[test]
    fn test_session_roundtrip_and_logout() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");
        let session = SessionContext { user_id: 7, username: "maria".to_string() };
        session.save_to(&path).unwrap();

        let raw = fs::read_to_string(&path).unwrap();
        assert!(raw.contains("\"id\": 7"));

        assert_eq!(SessionContext::load_from(&path).unwrap(), Some(session));
        assert!(SessionContext::clear_at(&path).unwrap());
        assert!(SessionContext::load_from(&path).unwrap().is_none());
    }

    #[test]
    fn test_initial() {
        let session = SessionContext { user_id: 1, username: "ana".to_string() };
        assert_eq!(session.initial(), 'A');
        let blank = SessionContext { user_id: 1, username: String::new() };
        assert_eq!(blank.initial(), '?');
    }
}
