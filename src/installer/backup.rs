use crate::error::{ManagerError, Result};
use crate::paths::{AddonPaths, ADDON_FOLDER_NAME};
use crate::types::BackupSnapshot;

use chrono::{Local, NaiveDateTime};
use glob::Pattern;
use log::{debug, info};
use regex::Regex;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use walkdir::WalkDir;

/// Zero-padded and fixed-width, so names sort chronologically.
const TIMESTAMP_FORMAT: &str = "%Y%m%d_%H%M%S";

/// Folder names under the backup root that count as snapshots.
const SNAPSHOT_GLOB: &str = "scripting_nodes_*";

static SNAPSHOT_PATTERN: LazyLock<Pattern> =
    LazyLock::new(|| Pattern::new(SNAPSHOT_GLOB).expect("snapshot glob is valid"));

static SNAPSHOT_STAMP: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"_(?P<stamp>\d{8}_\d{6})$").expect("snapshot regex is valid"));

fn snapshot_name(at: NaiveDateTime) -> String {
    format!("{}_{}", ADDON_FOLDER_NAME, at.format(TIMESTAMP_FORMAT))
}

/// Copies the installation into a new snapshot stamped with the current local time.
pub fn backup(paths: &AddonPaths) -> Result<PathBuf> {
    backup_at(paths, Local::now().naive_local())
}

/// Copies the installation into a snapshot stamped with `at`.
pub fn backup_at(paths: &AddonPaths, at: NaiveDateTime) -> Result<PathBuf> {
    if !paths.install_path.exists() {
        return Err(ManagerError::NotFound(format!(
            "no installation found to backup at {}",
            paths.install_path.display()
        )));
    }

    let dest = paths.backup_root.join(snapshot_name(at));
    fs::create_dir_all(&paths.backup_root).map_err(|e| ManagerError::io(&paths.backup_root, e))?;
    if dest.exists() {
        return Err(ManagerError::io(
            &dest,
            io::Error::new(io::ErrorKind::AlreadyExists, "snapshot already exists"),
        ));
    }

    info!("Backing up {} to {}", paths.install_path.display(), dest.display());
    copy_tree(&paths.install_path, &dest)?;
    Ok(dest)
}

/// Existing snapshots, newest first. Empty when no backup was ever taken.
pub fn list_snapshots(paths: &AddonPaths) -> Result<Vec<BackupSnapshot>> {
    if !paths.backup_root.is_dir() {
        return Ok(Vec::new());
    }

    let mut snapshots = Vec::new();
    let entries = fs::read_dir(&paths.backup_root).map_err(|e| ManagerError::io(&paths.backup_root, e))?;
    for entry in entries {
        let entry = entry.map_err(|e| ManagerError::io(&paths.backup_root, e))?;
        let name = entry.file_name().to_string_lossy().into_owned();
        if !SNAPSHOT_PATTERN.matches(&name) || !entry.path().is_dir() {
            debug!("Skipping {} in backup folder", name);
            continue;
        }
        snapshots.push(BackupSnapshot {
            created: snapshot_created(&name),
            path: entry.path(),
            name,
        });
    }

    snapshots.sort_by(|a, b| b.name.cmp(&a.name));
    Ok(snapshots)
}

/// Replaces the installation with the most recent snapshot.
///
/// The current installation is deleted before the copy starts.
pub fn restore(paths: &AddonPaths) -> Result<PathBuf> {
    let latest = list_snapshots(paths)?
        .into_iter()
        .next()
        .ok_or_else(|| ManagerError::NotFound(format!("no backups found in {}", paths.backup_root.display())))?;

    if paths.install_path.exists() {
        info!("Removing current installation at {}", paths.install_path.display());
        fs::remove_dir_all(&paths.install_path).map_err(|e| ManagerError::io(&paths.install_path, e))?;
    }

    info!("Restoring {} to {}", latest.path.display(), paths.install_path.display());
    copy_tree(&latest.path, &paths.install_path)?;
    Ok(latest.path)
}

/// Parses the timestamp back out of a snapshot folder name.
fn snapshot_created(name: &str) -> Option<String> {
    let caps = SNAPSHOT_STAMP.captures(name)?;
    NaiveDateTime::parse_from_str(&caps["stamp"], TIMESTAMP_FORMAT)
        .ok()
        .map(|dt| dt.format("%Y-%m-%d %H:%M:%S").to_string())
}

/// Recursively copies `src` to `dst`, following symlinks. Not rolled back on failure.
fn copy_tree(src: &Path, dst: &Path) -> Result<()> {
    for entry in WalkDir::new(src).follow_links(true) {
        let entry = entry.map_err(|e| {
            let path = e.path().unwrap_or(src).to_path_buf();
            ManagerError::io(path, e.into())
        })?;
        let rel = entry
            .path()
            .strip_prefix(src)
            .map_err(|e| ManagerError::io(entry.path(), io::Error::new(io::ErrorKind::Other, e)))?;
        let target = dst.join(rel);

        if entry.file_type().is_dir() {
            fs::create_dir_all(&target).map_err(|e| ManagerError::io(&target, e))?;
        } else {
            fs::copy(entry.path(), &target).map_err(|e| ManagerError::io(entry.path(), e))?;
        }
    }
    Ok(())
}
