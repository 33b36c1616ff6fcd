use crate::config::Settings;
use crate::error::{ManagerError, Result};
use crate::installer::{backup, CommandRunner};
use crate::paths::AddonPaths;
use crate::types::InstallStatus;

use chrono::{DateTime, Local};
use log::{debug, info, warn};
use std::fs;
use std::path::{Path, PathBuf};

pub const CLONE_URL: &str = "https://github.com/CoreyCorza/scripting_nodes.git";

/// File every valid addon checkout carries at its root.
const ADDON_ENTRY_FILE: &str = "__init__.py";

/// Installs and updates the addon as a git checkout.
pub struct GitInstaller<R> {
    runner: R,
    clone_url: String,
}

impl<R: CommandRunner> GitInstaller<R> {
    pub fn new(runner: R) -> Self {
        Self::with_clone_url(runner, CLONE_URL)
    }

    pub fn with_clone_url(runner: R, clone_url: &str) -> Self {
        Self {
            runner,
            clone_url: clone_url.to_string(),
        }
    }

    /// Reports whether the addon is installed, and on which branch.
    pub fn inspect(&self, paths: &AddonPaths) -> Result<InstallStatus> {
        let mut status = InstallStatus {
            installed: false,
            path: paths.addons_root.display().to_string(),
            branch: None,
            last_updated: None,
        };

        if !paths.install_path.exists() {
            info!("No installation at {}", paths.install_path.display());
            return Ok(status);
        }
        status.installed = true;

        if paths.git_dir().exists() {
            status.branch = self.query(&["rev-parse", "--abbrev-ref", "HEAD"], &paths.install_path);
            status.last_updated = self.query(
                &["log", "-1", "--format=%cd", "--date=relative"],
                &paths.install_path,
            );
        } else {
            status.last_updated = Some(modified_time(&paths.install_path)?);
        }

        Ok(status)
    }

    /// Runs a read-only git query; any failure yields `None`.
    fn query(&self, args: &[&str], cwd: &Path) -> Option<String> {
        match self.runner.run("git", args, Some(cwd)) {
            Ok(output) if output.success() => Some(output.stdout.trim().to_string()),
            Ok(output) => {
                warn!(
                    "git {} exited with {:?}: {}",
                    args.join(" "),
                    output.code,
                    output.stderr.trim()
                );
                None
            }
            Err(e) => {
                warn!("git {} could not run: {}", args.join(" "), e);
                None
            }
        }
    }

    /// Replaces the installation with a shallow clone of `branch`.
    ///
    /// Any existing install directory is deleted first, local changes included.
    pub fn switch(&self, paths: &AddonPaths, branch: &str) -> Result<()> {
        fs::create_dir_all(&paths.addons_root).map_err(|e| ManagerError::io(&paths.addons_root, e))?;

        if paths.install_path.exists() {
            info!("Removing existing installation at {}", paths.install_path.display());
            fs::remove_dir_all(&paths.install_path)
                .map_err(|e| ManagerError::io(&paths.install_path, e))?;
        }

        let dest = paths.install_path.display().to_string();
        info!("Cloning branch {} into {}", branch, dest);
        let output = self
            .runner
            .run(
                "git",
                &[
                    "clone",
                    "-b",
                    branch,
                    "--single-branch",
                    "--depth",
                    "1",
                    self.clone_url.as_str(),
                    dest.as_str(),
                ],
                None,
            )
            .map_err(|e| ManagerError::io(&paths.install_path, e))?;

        if !output.success() {
            return Err(ManagerError::Clone {
                stderr: output.stderr.trim().to_string(),
            });
        }

        if !paths.install_path.join(ADDON_ENTRY_FILE).exists() {
            warn!(
                "Branch {} was cloned but has no {}; it may not contain the addon",
                branch, ADDON_ENTRY_FILE
            );
        }

        Ok(())
    }

    /// Switches branches, first snapshotting the current installation when
    /// `auto_backup` is enabled and `skip_backup` is not set.
    ///
    /// Returns the snapshot folder if one was taken.
    pub fn switch_with_backup(
        &self,
        settings: &Settings,
        paths: &AddonPaths,
        branch: &str,
        skip_backup: bool,
    ) -> Result<Option<PathBuf>> {
        let snapshot = if settings.auto_backup && !skip_backup && paths.install_path.exists() {
            Some(backup::backup(paths)?)
        } else {
            debug!("Skipping backup before switching to {}", branch);
            None
        };

        self.switch(paths, branch)?;
        Ok(snapshot)
    }

    /// Pulls upstream changes into the existing checkout.
    pub fn pull(&self, paths: &AddonPaths) -> Result<()> {
        if !paths.install_path.exists() {
            return Err(ManagerError::NotInstalled(paths.install_path.clone()));
        }
        if !paths.git_dir().exists() {
            return Err(ManagerError::NotAVcsCheckout(paths.install_path.clone()));
        }

        info!("Pulling latest changes in {}", paths.install_path.display());
        let output = self
            .runner
            .run("git", &["pull"], Some(&paths.install_path))
            .map_err(|e| ManagerError::io(&paths.install_path, e))?;

        if !output.success() {
            return Err(ManagerError::Pull {
                stderr: output.stderr.trim().to_string(),
            });
        }

        Ok(())
    }
}

/// Last modification time of `path` as local `YYYY-MM-DD HH:MM`.
fn modified_time(path: &Path) -> Result<String> {
    let modified = fs::metadata(path)
        .and_then(|meta| meta.modified())
        .map_err(|e| ManagerError::io(path, e))?;
    let local: DateTime<Local> = modified.into();
    Ok(local.format("%Y-%m-%d %H:%M").to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::installer::testing::{Call, FakeRunner};
    use pretty_assertions::assert_eq;
    use std::io;

    /// Acts like git: `clone` creates a checkout whose HEAD names the branch,
    /// `rev-parse` reads it back.
    fn fake_git(call: &Call) -> io::Result<crate::types::CommandOutput> {
        match call.args[0].as_str() {
            "clone" => {
                let branch = &call.args[2];
                let dest = PathBuf::from(call.args.last().expect("dest"));
                fs::create_dir_all(dest.join(".git"))?;
                fs::write(dest.join(".git").join("HEAD"), branch)?;
                fs::write(dest.join("__init__.py"), "bl_info = {}")?;
                FakeRunner::ok("")
            }
            "rev-parse" => {
                let cwd = call.cwd.as_ref().expect("cwd");
                let head = fs::read_to_string(cwd.join(".git").join("HEAD"))?;
                FakeRunner::ok(&format!("{}\n", head))
            }
            "log" => FakeRunner::ok("3 days ago\n"),
            "pull" => FakeRunner::ok("Already up to date.\n"),
            other => FakeRunner::failed(1, &format!("unexpected {}", other)),
        }
    }

    fn scratch() -> (tempfile::TempDir, AddonPaths) {
        let dir = tempfile::tempdir().expect("tempdir");
        let paths = AddonPaths::from_root(dir.path().join("addons"));
        (dir, paths)
    }

    #[test]
    fn inspect_reports_missing_installation() {
        let (_dir, paths) = scratch();
        let git = GitInstaller::new(FakeRunner::new(fake_git));

        let status = git.inspect(&paths).expect("inspect");
        assert_eq!(
            status,
            InstallStatus {
                installed: false,
                path: paths.addons_root.display().to_string(),
                branch: None,
                last_updated: None,
            }
        );
        assert!(git.runner.calls.borrow().is_empty());
    }

    #[test]
    fn inspect_plain_folder_uses_modification_time() {
        let (_dir, paths) = scratch();
        fs::create_dir_all(&paths.install_path).expect("mkdir");
        let git = GitInstaller::new(FakeRunner::new(fake_git));

        let status = git.inspect(&paths).expect("inspect");
        assert!(status.installed);
        assert_eq!(status.branch, None);
        let stamp = status.last_updated.expect("mtime");
        assert_eq!(stamp.len(), "2024-01-01 00:00".len());
        assert!(git.runner.calls.borrow().is_empty());
    }

    #[test]
    fn inspect_degrades_when_git_fails() {
        let (_dir, paths) = scratch();
        fs::create_dir_all(paths.git_dir()).expect("mkdir");
        let git = GitInstaller::new(FakeRunner::new(|call: &Call| {
            if call.args[0] == "log" {
                Err(io::Error::new(io::ErrorKind::NotFound, "git missing"))
            } else {
                FakeRunner::failed(128, "fatal: not a git repository")
            }
        }));

        let status = git.inspect(&paths).expect("inspect");
        assert!(status.installed);
        assert_eq!(status.branch, None);
        assert_eq!(status.last_updated, None);
    }

    #[test]
    fn switch_then_inspect_reports_branch() {
        let (_dir, paths) = scratch();
        fs::create_dir_all(&paths.install_path).expect("mkdir");
        fs::write(paths.install_path.join("stale.py"), "old").expect("write");
        let git = GitInstaller::with_clone_url(FakeRunner::new(fake_git), "https://git.test/addon.git");

        git.switch(&paths, "dev").expect("switch");

        assert!(!paths.install_path.join("stale.py").exists());
        let clone = git.runner.calls.borrow()[0].clone();
        assert_eq!(
            clone.args,
            vec![
                "clone",
                "-b",
                "dev",
                "--single-branch",
                "--depth",
                "1",
                "https://git.test/addon.git",
                paths.install_path.to_str().expect("utf8"),
            ]
        );

        let status = git.inspect(&paths).expect("inspect");
        assert_eq!(status.branch.as_deref(), Some("dev"));
        assert_eq!(status.last_updated.as_deref(), Some("3 days ago"));
    }

    #[test]
    fn failed_clone_carries_stderr() {
        let (_dir, paths) = scratch();
        let git = GitInstaller::new(FakeRunner::new(|_: &Call| {
            FakeRunner::failed(128, "fatal: Remote branch nope not found in upstream origin\n")
        }));

        let err = git.switch(&paths, "nope").unwrap_err();
        match err {
            ManagerError::Clone { stderr } => {
                assert_eq!(stderr, "fatal: Remote branch nope not found in upstream origin")
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(paths.addons_root.is_dir());
    }

    #[test]
    fn pull_requires_an_installation() {
        let (_dir, paths) = scratch();
        let git = GitInstaller::new(FakeRunner::new(fake_git));

        let err = git.pull(&paths).unwrap_err();
        assert!(matches!(err, ManagerError::NotInstalled(_)));
    }

    #[test]
    fn pull_rejects_plain_folder_without_touching_it() {
        let (_dir, paths) = scratch();
        fs::create_dir_all(&paths.install_path).expect("mkdir");
        fs::write(paths.install_path.join("__init__.py"), "keep").expect("write");
        let git = GitInstaller::new(FakeRunner::new(fake_git));

        let err = git.pull(&paths).unwrap_err();
        assert!(matches!(err, ManagerError::NotAVcsCheckout(_)));
        assert!(git.runner.calls.borrow().is_empty());
        assert_eq!(
            fs::read_to_string(paths.install_path.join("__init__.py")).expect("read"),
            "keep"
        );
        assert_eq!(fs::read_dir(&paths.install_path).expect("ls").count(), 1);
    }

    #[test]
    fn pull_runs_in_checkout_and_reports_conflicts() {
        let (_dir, paths) = scratch();
        fs::create_dir_all(paths.git_dir()).expect("mkdir");

        let git = GitInstaller::new(FakeRunner::new(fake_git));
        git.pull(&paths).expect("pull");
        let call = git.runner.calls.borrow()[0].clone();
        assert_eq!(call.args, vec!["pull"]);
        assert_eq!(call.cwd.as_deref(), Some(paths.install_path.as_path()));

        let conflicted = GitInstaller::new(FakeRunner::new(|_: &Call| {
            FakeRunner::failed(1, "CONFLICT (content): Merge conflict in __init__.py")
        }));
        let err = conflicted.pull(&paths).unwrap_err();
        assert!(err.to_string().contains("Merge conflict in __init__.py"));
    }

    #[test]
    fn missing_git_is_an_io_error() {
        let (_dir, paths) = scratch();
        fs::create_dir_all(paths.git_dir()).expect("mkdir");
        let git = GitInstaller::new(FakeRunner::new(|_: &Call| {
            Err(io::Error::new(io::ErrorKind::NotFound, "git not found in PATH"))
        }));

        match git.pull(&paths).unwrap_err() {
            ManagerError::Io { path, source } => {
                assert_eq!(path, paths.install_path);
                assert_eq!(source.kind(), io::ErrorKind::NotFound);
            }
            other => panic!("unexpected error: {other:?}"),
        }
        match git.switch(&paths, "dev").unwrap_err() {
            ManagerError::Io { source, .. } => assert_eq!(source.kind(), io::ErrorKind::NotFound),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    fn snapshot_count(paths: &AddonPaths) -> usize {
        backup::list_snapshots(paths).expect("list").len()
    }

    #[test]
    fn switch_snapshots_installation_when_auto_backup_is_on() {
        let (_dir, paths) = scratch();
        fs::create_dir_all(&paths.install_path).expect("mkdir");
        fs::write(paths.install_path.join("local.py"), "mine").expect("write");
        let git = GitInstaller::new(FakeRunner::new(fake_git));

        let snapshot = git
            .switch_with_backup(&Settings::default(), &paths, "dev", false)
            .expect("switch")
            .expect("snapshot taken");

        assert_eq!(fs::read_to_string(snapshot.join("local.py")).expect("read"), "mine");
        assert_eq!(snapshot_count(&paths), 1);
        assert!(!paths.install_path.join("local.py").exists());
    }

    #[test]
    fn switch_skips_backup_when_asked_or_disabled() {
        let (_dir, paths) = scratch();
        fs::create_dir_all(&paths.install_path).expect("mkdir");
        let git = GitInstaller::new(FakeRunner::new(fake_git));

        let taken = git
            .switch_with_backup(&Settings::default(), &paths, "dev", true)
            .expect("switch");
        assert_eq!(taken, None);

        let disabled = Settings {
            auto_backup: false,
            ..Settings::default()
        };
        let taken = git
            .switch_with_backup(&disabled, &paths, "main", false)
            .expect("switch");
        assert_eq!(taken, None);
        assert_eq!(snapshot_count(&paths), 0);
    }

    #[test]
    fn switch_without_installation_takes_no_backup() {
        let (_dir, paths) = scratch();
        let git = GitInstaller::new(FakeRunner::new(fake_git));

        let taken = git
            .switch_with_backup(&Settings::default(), &paths, "dev", false)
            .expect("switch");

        assert_eq!(taken, None);
        assert_eq!(snapshot_count(&paths), 0);
        assert!(paths.git_dir().is_dir());
    }
}
