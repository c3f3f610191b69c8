use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use super::platform;

/// Desktop notification permission, as a browser would track it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Permission {
    Granted,
    Denied,
    #[default]
    Undetermined,
}

/// State remembered between runs.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PersistentState {
    #[serde(default)]
    pub notification_permission: Permission,
}

impl PersistentState {
    pub fn default_path() -> PathBuf {
        platform::data_dir().join("state.json")
    }

    /// Missing or unreadable files fall back to the default state.
    pub fn load(path: &Path) -> Self {
        if let Ok(content) = std::fs::read_to_string(path) {
            match serde_json::from_str::<PersistentState>(&content) {
                Ok(state) => return state,
                Err(e) => tracing::warn!("[state] ignoring unreadable {:?}: {}", path, e),
            }
        }
        Self::default()
    }

    pub fn save(&self, path: &Path) -> anyhow::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }
}
