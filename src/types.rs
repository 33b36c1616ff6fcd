use serde::Serialize;
use std::path::PathBuf;

/// Snapshot of the local installation, derived fresh on each inspection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InstallStatus {
    pub installed: bool,
    /// The addons root the installation lives under
    pub path: String,
    pub branch: Option<String>,
    pub last_updated: Option<String>,
}

/// A remote branch and the date of its head commit, when known.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Branch {
    pub name: String,
    pub last_commit: Option<String>,
}

/// A timestamped copy of the install directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BackupSnapshot {
    pub name: String,
    pub path: PathBuf,
    /// `YYYY-MM-DD HH:MM:SS`, parsed back from the folder name
    pub created: Option<String>,
}

/// Captured result of an external command.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    /// Exit code; `None` when the process was killed by a signal
    pub code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.code == Some(0)
    }
}
