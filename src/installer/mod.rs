pub mod backup;
pub mod git;
pub mod opener;

use crate::types::CommandOutput;

use log::debug;
use std::io;
use std::path::Path;
use std::process::{Command, Stdio};
use which::which;

/// Runs external programs for the installer.
pub trait CommandRunner {
    /// Runs `program` to completion, capturing its output.
    fn run(&self, program: &str, args: &[&str], cwd: Option<&Path>) -> io::Result<CommandOutput>;

    /// Starts `program` detached; does not wait for it to exit.
    fn spawn(&self, program: &str, args: &[&str]) -> io::Result<()>;
}

/// Runs programs found on `PATH` via `std::process::Command`.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemRunner;

impl SystemRunner {
    fn locate(program: &str) -> io::Result<std::path::PathBuf> {
        which(program).map_err(|e| {
            io::Error::new(
                io::ErrorKind::NotFound,
                format!("{} not found in PATH: {}", program, e),
            )
        })
    }
}

impl CommandRunner for SystemRunner {
    fn run(&self, program: &str, args: &[&str], cwd: Option<&Path>) -> io::Result<CommandOutput> {
        let exe = Self::locate(program)?;
        debug!("Running {} {}", program, args.join(" "));

        let mut cmd = Command::new(exe);
        cmd.args(args).stdin(Stdio::null());
        if let Some(dir) = cwd {
            cmd.current_dir(dir);
        }

        let output = cmd.output()?;
        Ok(CommandOutput {
            code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }

    fn spawn(&self, program: &str, args: &[&str]) -> io::Result<()> {
        let exe = Self::locate(program)?;
        debug!("Spawning {} {}", program, args.join(" "));

        Command::new(exe)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()?;
        Ok(())
    }
}
