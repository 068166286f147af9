//! `appdock update`: install a newer version of an app from its recorded URL.

use super::common::Output;
use crate::installer::{AppManager, UpdateOutcome};
use crate::models::Response;
use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;

/// Update an installed app from the `app-meta-url` in its manifest.
///
/// Only a strictly newer version is installed. If anything fails the
/// installed version is left in place.
#[derive(Args, Debug)]
pub struct UpdateCommand {
    /// Name of the installed app
    #[arg(value_name = "NAME")]
    name: String,
}

impl UpdateCommand {
    pub async fn execute(self, manager: &AppManager, output: &Output) -> Result<()> {
        output.status(format!("🔍 Checking '{}' for updates", self.name));
        let outcome =
            manager.update(&self.name).await.with_context(|| format!("Failed to update '{}'", self.name))?;

        match &outcome {
            UpdateOutcome::Busy => output.busy(),
            UpdateOutcome::UpToDate {
                name,
            } => output.report(&Response::updated(&outcome), || println!("✅ '{name}' is up to date")),
            UpdateOutcome::Updated {
                name,
                version,
            } => output.report(&Response::updated(&outcome), || {
                println!("{} '{name}' to {version}", "Updated".green().bold());
            }),
        }
        Ok(())
    }
}
