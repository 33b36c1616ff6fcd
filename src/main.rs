mod config;
mod error;
mod fetcher;
mod installer;
mod paths;
mod types;

use crate::config::Settings;
use crate::fetcher::github::{GitHubBranches, HttpTransport};
use crate::installer::git::GitInstaller;
use crate::installer::{backup, opener, SystemRunner};
use crate::paths::{AddonPaths, Platform};

use anyhow::{Context, Result};
use clap::{ArgAction, Parser, Subcommand};
use log::info;
use serde::Serialize;
use std::path::Path;

/// Manages the Serpens scripting_nodes addon checkout inside Blender's addons folder.
#[derive(Parser, Debug)]
#[command(name = "serpens-manager")]
#[command(author, version, about)]
struct Cli {
    /// Log level (error, warn, info, debug, trace)
    #[arg(long, value_name = "LEVEL", default_value = "warn", global = true)]
    log_level: String,

    /// Blender version to manage, overriding the saved setting
    #[arg(long, value_name = "VERSION", global = true)]
    blender_version: Option<String>,

    /// Addons root to use instead of Blender's default, overriding the saved setting
    #[arg(long, value_name = "PATH", global = true)]
    custom_path: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Report whether the addon is installed and which branch it tracks
    Check,

    /// List remote branches with their last commit date
    Branches,

    /// Copy the installation into a timestamped snapshot
    Backup,

    /// Replace the installation with the most recent snapshot
    Restore,

    /// List existing snapshots, newest first
    Backups,

    /// Replace the installation with a fresh clone of BRANCH
    Switch {
        branch: String,

        /// Skip the automatic backup even if autoBackup is enabled
        #[arg(long)]
        no_backup: bool,
    },

    /// Pull the latest changes into the current checkout
    Pull,

    /// Open the addons folder in the file browser
    Open,

    /// Show or change the saved settings
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug)]
enum ConfigAction {
    /// Print the effective settings
    Show,

    /// Update the saved settings file
    Set {
        /// Blender version, e.g. 4.2
        #[arg(long, value_name = "VERSION")]
        blender: Option<String>,

        /// Custom addons root; an empty value clears it
        #[arg(long, value_name = "PATH")]
        path: Option<String>,

        /// Back up before switching branches
        #[arg(long, value_name = "BOOL", action = ArgAction::Set)]
        auto_backup: Option<bool>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    env_logger::Builder::from_env(
        env_logger::Env::default()
            .default_filter_or(format!("serpens_manager={}", cli.log_level)),
    )
    .format_target(false)
    .format_timestamp_secs()
    .target(env_logger::Target::Stderr)
    .init();

    let settings_path = paths::default_settings_path().context("Failed to locate settings file")?;
    run(&cli, &settings_path)
}

/// Settings and resolved paths for commands that touch the addon.
fn session(cli: &Cli, settings_path: &Path) -> Result<(Settings, AddonPaths)> {
    let settings = effective_settings(cli, settings_path)?;
    let paths = AddonPaths::from_env(&settings).context("Failed to resolve addon paths")?;
    info!("Managing addon at {}", paths.install_path.display());
    Ok((settings, paths))
}

/// Saved settings with the command-line overrides applied.
fn effective_settings(cli: &Cli, settings_path: &Path) -> Result<Settings> {
    let mut settings = Settings::load(settings_path).context("Failed to load settings")?;
    if let Some(version) = &cli.blender_version {
        settings.blender_version = version.clone();
    }
    if let Some(custom) = &cli.custom_path {
        settings.custom_path = custom.clone();
    }
    Ok(settings)
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!(
        "{}",
        serde_json::to_string_pretty(value).context("Failed to serialize output")?
    );
    Ok(())
}

fn run(cli: &Cli, settings_path: &Path) -> Result<()> {
    match &cli.command {
        Commands::Check => {
            let (_, paths) = session(cli, settings_path)?;
            let status = GitInstaller::new(SystemRunner).inspect(&paths)?;
            print_json(&status)
        }
        Commands::Branches => {
            let branches = GitHubBranches::new(HttpTransport::new()?).list()?;
            print_json(&branches)
        }
        Commands::Backup => {
            let (_, paths) = session(cli, settings_path)?;
            let dest = backup::backup(&paths)?;
            println!("Backup created: {}", dest.display());
            Ok(())
        }
        Commands::Restore => {
            let (_, paths) = session(cli, settings_path)?;
            let source = backup::restore(&paths)?;
            println!("Backup restored from {}", source.display());
            Ok(())
        }
        Commands::Backups => {
            let (_, paths) = session(cli, settings_path)?;
            print_json(&backup::list_snapshots(&paths)?)
        }
        Commands::Switch { branch, no_backup } => {
            let (settings, paths) = session(cli, settings_path)?;
            let snapshot =
                GitInstaller::new(SystemRunner).switch_with_backup(&settings, &paths, branch, *no_backup)?;
            if let Some(dest) = snapshot {
                println!("Backup created: {}", dest.display());
            }
            println!("Switched to branch: {}", branch);
            Ok(())
        }
        Commands::Pull => {
            let (_, paths) = session(cli, settings_path)?;
            GitInstaller::new(SystemRunner).pull(&paths)?;
            println!("Pulled latest changes");
            Ok(())
        }
        Commands::Open => {
            let (_, paths) = session(cli, settings_path)?;
            opener::open_folder(&SystemRunner, &paths, Platform::current())?;
            println!("Opened folder: {}", paths.addons_root.display());
            Ok(())
        }
        Commands::Config { action } => config_command(cli, action, settings_path),
    }
}

fn config_command(cli: &Cli, action: &ConfigAction, settings_path: &Path) -> Result<()> {
    match action {
        ConfigAction::Show => {
            info!("Settings file: {}", settings_path.display());
            print_json(&effective_settings(cli, settings_path)?)
        }
        ConfigAction::Set {
            blender,
            path,
            auto_backup,
        } => {
            let mut settings = Settings::load(settings_path).context("Failed to load settings")?;
            if let Some(version) = blender {
                settings.blender_version = version.clone();
            }
            if let Some(custom) = path {
                settings.custom_path = custom.clone();
            }
            if let Some(enabled) = auto_backup {
                settings.auto_backup = *enabled;
            }
            settings.save(settings_path).context("Failed to save settings")?;
            print_json(&settings)
        }
    }
}
