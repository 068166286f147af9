//! Command-line interface for appdock.
//!
//! Each command lives in its own module with its own argument structure and
//! an `execute` method taking the [`AppManager`] and the [`Output`] settings.
//!
//! # Available Commands
//!
//! | Command | Purpose |
//! |---|---|
//! | `list` | Installed apps and their update status |
//! | `check-update <URL> --version <V>` | Whether a newer version is published |
//! | `files <NAME>` | Every file of an installed app |
//! | `meta get <NAME>` / `meta save` | Show or replace an app's manifest |
//! | `update <NAME>` | Install a newer version from the recorded URL |
//! | `install local\|payload\|github\|web` | Install a new app |
//! | `lock status` / `lock clear` | Inspect or clear the install lock |
//!
//! # Global Options
//!
//! - `--apps-root <DIR>` overrides the apps root (also `APPDOCK_APPS_ROOT`)
//! - `--config <FILE>` overrides the config file (also `APPDOCK_CONFIG`)
//! - `--json` prints one result object per command on stdout
//! - `--verbose` / `--quiet` adjust logging and status output
//!
//! # Exit Status
//!
//! `0` on success, when another install holds the lock, and when an app is
//! already up to date; `1` on any error.
//!
//! ```bash
//! appdock --json install web https://apps.example.com/clock/clock.manifest
//! appdock update clock
//! appdock --apps-root /srv/apps list
//! ```

mod check;
pub mod common;
mod install;
mod list;
mod lock;
mod meta;
mod update;


use crate::config::{Overrides, Settings};
use crate::installer::AppManager;
use anyhow::Result;
use clap::{Parser, Subcommand};
use common::Output;
use std::path::PathBuf;

/// Main CLI structure for appdock.
///
/// Options marked `global = true` are accepted before or after the
/// subcommand.
#[derive(Parser, Debug)]
#[command(
    name = "appdock",
    about = "Install, update and inspect self-contained apps",
    version,
    long_about = "appdock installs apps from local archives, GitHub or web servers into one apps root, \
                  and keeps them up to date from the URL recorded in each app's manifest."
)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable debug logging on stderr
    #[arg(short, long, global = true, conflicts_with = "quiet")]
    verbose: bool,

    /// Only log errors and hide status lines
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Print a JSON result object instead of text
    #[arg(long, global = true)]
    json: bool,

    /// Directory holding the installed apps
    #[arg(long, global = true, value_name = "DIR")]
    apps_root: Option<PathBuf>,

    /// Path to the config file
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// List installed apps
    List(list::ListCommand),

    /// Check a manifest URL for a newer version
    CheckUpdate(check::CheckUpdateCommand),

    /// List the files of an installed app
    Files(list::FilesCommand),

    /// Show or edit an app's manifest
    Meta(meta::MetaCommand),

    /// Update an installed app
    Update(update::UpdateCommand),

    /// Install a new app
    Install(install::InstallCommand),

    /// Inspect or clear the install lock
    Lock(lock::LockCommand),
}

impl Cli {
    /// Whether results should be printed as JSON.
    #[must_use]
    pub const fn json_output(&self) -> bool {
        self.json
    }

    /// Log filter implied by `--verbose` / `--quiet`, used when `RUST_LOG`
    /// is not set.
    #[must_use]
    pub const fn log_filter(&self) -> &'static str {
        if self.verbose {
            "debug"
        } else if self.quiet {
            "error"
        } else {
            "warn"
        }
    }

    /// Command-line overrides of the configuration.
    #[must_use]
    pub fn overrides(&self) -> Overrides {
        Overrides {
            apps_root: self.apps_root.clone(),
            config_path: self.config.clone(),
        }
    }

    /// Resolves configuration from flags, environment and config file, then
    /// runs the command.
    ///
    /// # Errors
    ///
    /// Returns any configuration or command error; the caller decides how to
    /// render it.
    pub async fn execute(self) -> Result<()> {
        let settings = Settings::resolve(&self.overrides(), |key| std::env::var(key).ok()).await?;
        let manager = AppManager::from_settings(settings)?;
        self.execute_with_manager(&manager).await
    }

    /// Runs the command against an existing manager.
    ///
    /// # Errors
    ///
    /// Returns the command's error.
    pub async fn execute_with_manager(self, manager: &AppManager) -> Result<()> {
        let output = Output::new(self.json, self.quiet);
        match self.command {
            Commands::List(cmd) => cmd.execute(manager, &output).await,
            Commands::CheckUpdate(cmd) => cmd.execute(manager, &output).await,
            Commands::Files(cmd) => cmd.execute(manager, &output).await,
            Commands::Meta(cmd) => cmd.execute(manager, &output).await,
            Commands::Update(cmd) => cmd.execute(manager, &output).await,
            Commands::Install(cmd) => cmd.execute(manager, &output).await,
            Commands::Lock(cmd) => cmd.execute(manager, &output).await,
        }
    }
}
