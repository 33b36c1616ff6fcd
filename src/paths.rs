use crate::config::Settings;
use crate::error::{ManagerError, Result};

use std::env;
use std::path::{Path, PathBuf};

pub const ADDON_FOLDER_NAME: &str = "scripting_nodes";
pub const BACKUP_FOLDER_NAME: &str = "_tmp_serpens_backup";

const SETTINGS_DIR_NAME: &str = "SerpensDevManager";
const SETTINGS_FILE_NAME: &str = "serpens_manager_settings.json";

/// Overrides the directory holding the settings file.
pub const HOME_OVERRIDE_VAR: &str = "SERPENS_MANAGER_HOME";

/// Operating system family, which decides where Blender keeps per-user data.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Platform {
    Windows,
    MacOs,
    Linux,
}

impl Platform {
    pub fn current() -> Self {
        if cfg!(windows) {
            Platform::Windows
        } else if cfg!(target_os = "macos") {
            Platform::MacOs
        } else {
            Platform::Linux
        }
    }

    /// Looks up the per-user application data directory for this platform.
    ///
    /// Windows   :   %APPDATA%
    /// macOS     :   $HOME/Library/Application Support
    /// Linux     :   $XDG_CONFIG_HOME or $HOME/.config
    pub fn app_data_dir(self) -> Option<PathBuf> {
        match self {
            Platform::Windows => env::var_os("APPDATA")
                .filter(|v| !v.is_empty())
                .map(PathBuf::from),
            Platform::MacOs | Platform::Linux => dirs::config_dir(),
        }
    }

    fn missing_app_data(self) -> ManagerError {
        ManagerError::Configuration(match self {
            Platform::Windows => "APPDATA environment variable is not set".into(),
            _ => "could not determine the per-user config directory (is HOME set?)".into(),
        })
    }

    /// Blender's folder under the application data directory.
    fn blender_segments(self) -> &'static [&'static str] {
        match self {
            Platform::Windows => &["Blender Foundation", "Blender"],
            Platform::MacOs => &["Blender"],
            Platform::Linux => &["blender"],
        }
    }
}

/// Every location the manager touches for one Blender version.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddonPaths {
    /// Blender's `scripts/addons` directory (or the custom override)
    pub addons_root: PathBuf,
    /// `<addons_root>/scripting_nodes`
    pub install_path: PathBuf,
    /// `<addons_root>/_tmp_serpens_backup`
    pub backup_root: PathBuf,
}

impl AddonPaths {
    /// Resolves paths from the settings and an already looked-up application data directory.
    ///
    /// A custom path is taken verbatim as the addons root and needs no base directory.
    pub fn resolve(settings: &Settings, platform: Platform, app_data: Option<&Path>) -> Result<Self> {
        let addons_root = match settings.custom_path() {
            Some(custom) => PathBuf::from(custom),
            None => {
                let mut root = app_data
                    .ok_or_else(|| platform.missing_app_data())?
                    .to_path_buf();
                root.extend(platform.blender_segments());
                root.push(&settings.blender_version);
                root.push("scripts");
                root.push("addons");
                root
            }
        };

        Ok(Self::from_root(addons_root))
    }

    /// Resolves paths for the running platform and its per-user directories.
    pub fn from_env(settings: &Settings) -> Result<Self> {
        let platform = Platform::current();
        Self::resolve(settings, platform, platform.app_data_dir().as_deref())
    }

    pub fn from_root(addons_root: PathBuf) -> Self {
        Self {
            install_path: addons_root.join(ADDON_FOLDER_NAME),
            backup_root: addons_root.join(BACKUP_FOLDER_NAME),
            addons_root,
        }
    }

    /// Git metadata directory inside the install path.
    pub fn git_dir(&self) -> PathBuf {
        self.install_path.join(".git")
    }
}

/// Location of the settings file, preferring `home_override` when given.
pub fn settings_path(
    platform: Platform,
    home_override: Option<&Path>,
    app_data: Option<&Path>,
) -> Result<PathBuf> {
    if let Some(home) = home_override {
        return Ok(home.join(SETTINGS_FILE_NAME));
    }

    Ok(app_data
        .ok_or_else(|| platform.missing_app_data())?
        .join(SETTINGS_DIR_NAME)
        .join(SETTINGS_FILE_NAME))
}

pub fn default_settings_path() -> Result<PathBuf> {
    let home_override = env::var_os(HOME_OVERRIDE_VAR)
        .filter(|v| !v.is_empty())
        .map(PathBuf::from);
    let platform = Platform::current();
    settings_path(
        platform,
        home_override.as_deref(),
        platform.app_data_dir().as_deref(),
    )
}
