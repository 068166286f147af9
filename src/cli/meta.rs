//! `appdock meta`: show or replace an installed app's manifest.

use super::common::Output;
use crate::installer::AppManager;
use crate::models::Response;
use anyhow::{Context, Result, bail};
use clap::{Args, Subcommand};
use colored::Colorize;
use std::path::PathBuf;

/// Show or edit an app's manifest.
#[derive(Args, Debug)]
pub struct MetaCommand {
    #[command(subcommand)]
    action: MetaAction,
}

#[derive(Subcommand, Debug)]
enum MetaAction {
    /// Print the manifest; one is synthesized from the app's files if missing
    Get {
        /// Name of the installed app
        #[arg(value_name = "NAME")]
        name: String,
    },

    /// Validate and store a manifest
    ///
    /// A `files` entry containing `(Will be created)` is replaced with the
    /// manifest's own file name.
    Save {
        /// Manifest JSON
        #[arg(value_name = "JSON", required_unless_present = "file")]
        document: Option<String>,

        /// Read the manifest JSON from a file instead
        #[arg(long, value_name = "PATH", conflicts_with = "document")]
        file: Option<PathBuf>,
    },
}

impl MetaCommand {
    pub async fn execute(self, manager: &AppManager, output: &Output) -> Result<()> {
        match self.action {
            MetaAction::Get {
                name,
            } => {
                let view = manager.get_meta(&name)?;
                output.report(&Response::meta(&view), || {
                    if view.created {
                        eprintln!("{}", format!("'{name}' has no meta file, showing a generated one").yellow());
                    }
                    println!("{}", serde_json::to_string_pretty(&view.meta).unwrap_or_default());
                });
            }
            MetaAction::Save {
                document,
                file,
            } => {
                let raw = match (document, file) {
                    (Some(document), _) => document,
                    (None, Some(path)) => tokio::fs::read_to_string(&path)
                        .await
                        .with_context(|| format!("Failed to read {}", path.display()))?,
                    (None, None) => bail!("Provide the manifest JSON or --file"),
                };
                let name = manager.save_meta(&raw).context("Failed to save meta file")?;
                output.report(&Response::meta_saved(&name), || {
                    println!("{} meta file for '{name}'", "Saved".green().bold());
                });
            }
        }
        Ok(())
    }
}
