//! `appdock check-update`: ask a manifest URL whether a newer version exists.

use super::common::Output;
use crate::installer::AppManager;
use crate::models::Response;
use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;

/// Check a manifest URL for a version newer than the one given.
///
/// Nothing is installed; use `appdock update` for that.
#[derive(Args, Debug)]
pub struct CheckUpdateCommand {
    /// Manifest URL on github.com or a plain web server
    #[arg(value_name = "URL")]
    url: String,

    /// Version to compare against
    #[arg(long = "version", value_name = "VERSION")]
    installed_version: String,
}

impl CheckUpdateCommand {
    pub async fn execute(self, manager: &AppManager, output: &Output) -> Result<()> {
        let info = manager
            .check_update(&self.url, &self.installed_version)
            .await
            .with_context(|| format!("Failed to check {} for updates", self.url))?;

        output.report(&Response::update_info(&info), || match &info.new_version {
            Some(version) => println!(
                "📦 {} {} → {}",
                "Update available:".green().bold(),
                self.installed_version,
                version
            ),
            None if info.meta.is_none() => println!("✅ Not modified since last install"),
            None => println!("✅ {} is the latest version", self.installed_version),
        });
        Ok(())
    }
}
