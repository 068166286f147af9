//! `appdock install`: add a new app from one of four sources.
//!
//! ```bash
//! appdock install local ./clock.tgz
//! appdock install local ./clock/clock.manifest
//! base64 clock.zip | appdock install payload -
//! appdock install github https://github.com/acme/apps/blob/main/clock/clock.manifest
//! appdock install web https://apps.example.com/clock/clock.manifest
//! ```

use super::common::Output;
use crate::installer::{AppManager, InstallOutcome};
use crate::models::Response;
use anyhow::{Context, Result};
use clap::{Args, Subcommand};
use colored::Colorize;
use std::path::PathBuf;
use tokio::io::AsyncReadExt;

/// Install a new app.
#[derive(Args, Debug)]
pub struct InstallCommand {
    #[command(subcommand)]
    source: InstallSource,
}

#[derive(Subcommand, Debug)]
enum InstallSource {
    /// From a tar, tar.gz or zip archive, or a manifest file on disk
    Local {
        /// Archive or `<app>.<ext>` manifest path
        #[arg(value_name = "PATH")]
        path: PathBuf,
    },

    /// From a base64-encoded archive
    Payload {
        /// File holding the encoded archive, or `-` for stdin
        #[arg(value_name = "FILE")]
        file: String,
    },

    /// From a manifest on github.com (`.../blob/<ref>/<dir>/<app>.<ext>`)
    Github {
        /// Manifest URL
        #[arg(value_name = "URL")]
        url: String,
    },

    /// From a manifest on a plain web server
    Web {
        /// Manifest URL
        #[arg(value_name = "URL")]
        url: String,
    },
}

impl InstallCommand {
    pub async fn execute(self, manager: &AppManager, output: &Output) -> Result<()> {
        let outcome = match self.source {
            InstallSource::Local {
                path,
            } => {
                output.status(format!("📦 Installing from {}", path.display()));
                manager.install_local(&path).await.with_context(|| format!("Failed to install {}", path.display()))?
            }
            InstallSource::Payload {
                file,
            } => {
                let encoded = read_payload(&file).await?;
                output.status("📦 Installing from archive payload");
                manager.install_payload(&encoded).await.context("Failed to install archive payload")?
            }
            InstallSource::Github {
                url,
            } => {
                output.status(format!("📥 Installing from {url}"));
                manager.install_github(&url).await.with_context(|| format!("Failed to install {url}"))?
            }
            InstallSource::Web {
                url,
            } => {
                output.status(format!("📥 Installing from {url}"));
                manager.install_web(&url).await.with_context(|| format!("Failed to install {url}"))?
            }
        };

        match &outcome {
            InstallOutcome::Busy => output.busy(),
            InstallOutcome::Installed {
                name,
                version,
            } => output.report(&Response::installed(&outcome), || {
                println!("{} '{name}' {version}", "Installed".green().bold());
            }),
        }
        Ok(())
    }
}

async fn read_payload(file: &str) -> Result<String> {
    if file == "-" {
        let mut encoded = String::new();
        tokio::io::stdin().read_to_string(&mut encoded).await.context("Failed to read payload from stdin")?;
        return Ok(encoded);
    }
    tokio::fs::read_to_string(file).await.with_context(|| format!("Failed to read payload file {file}"))
}
