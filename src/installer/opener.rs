use crate::error::{ManagerError, Result};
use crate::installer::CommandRunner;
use crate::paths::{AddonPaths, Platform};

use log::info;
use std::fs;

/// File browser launcher for each platform.
fn opener_program(platform: Platform) -> &'static str {
    match platform {
        Platform::Windows => "explorer",
        Platform::MacOs => "open",
        Platform::Linux => "xdg-open",
    }
}

/// Opens the addons root in the file browser, creating it first if needed.
pub fn open_folder<R: CommandRunner>(runner: &R, paths: &AddonPaths, platform: Platform) -> Result<()> {
    fs::create_dir_all(&paths.addons_root).map_err(|e| ManagerError::io(&paths.addons_root, e))?;

    let target = paths.addons_root.display().to_string();
    let program = opener_program(platform);
    info!("Opening {} with {}", target, program);

    runner
        .spawn(program, &[target.as_str()])
        .map_err(|source| ManagerError::OpenFailed {
            path: paths.addons_root.clone(),
            source,
        })
}
