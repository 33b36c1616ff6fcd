use crate::error::{ManagerError, Result};

use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::Path;

pub const DEFAULT_BLENDER_VERSION: &str = "5.0";

/// Persisted manager settings.
///
/// Stored as a flat JSON object:
///
/// ```json
/// {
///   "blenderVersion": "5.0",
///   "customPath": "",
///   "autoBackup": true
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Settings {
    /// Blender version whose addons folder is managed
    pub blender_version: String,

    /// Addons root override; empty means "derive from the platform"
    pub custom_path: String,

    /// Take a snapshot before switching branches
    pub auto_backup: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            blender_version: DEFAULT_BLENDER_VERSION.to_string(),
            custom_path: String::new(),
            auto_backup: true,
        }
    }
}

impl Settings {
    /// The custom addons root, if one is configured.
    pub fn custom_path(&self) -> Option<&str> {
        Some(self.custom_path.as_str()).filter(|p| !p.is_empty())
    }

    /// Reads settings from `path`, falling back to the defaults when the file is absent.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            debug!("No settings at {}; using defaults", path.display());
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path).map_err(|e| ManagerError::io(path, e))?;
        serde_json::from_str(&contents).map_err(|source| ManagerError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Writes settings as pretty JSON, creating parent directories as needed.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir).map_err(|e| ManagerError::io(dir, e))?;
        }

        let contents = serde_json::to_string_pretty(self)
            .map_err(|e| ManagerError::io(path, io::Error::other(e)))?;
        fs::write(path, contents).map_err(|e| ManagerError::io(path, e))?;

        info!("Saved settings to {}", path.display());
        Ok(())
    }
}
