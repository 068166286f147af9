//! Inventory commands: `appdock list` and `appdock files`.

use super::common::Output;
use crate::installer::{AppListing, AppManager};
use crate::models::Response;
use anyhow::Result;
use clap::Args;
use colored::Colorize;
use serde_json::Value;

/// List installed apps with their versions and update status.
#[derive(Args, Debug)]
pub struct ListCommand {}

impl ListCommand {
    pub async fn execute(self, manager: &AppManager, output: &Output) -> Result<()> {
        let apps = manager.list_apps()?;
        output.report(&Response::app_list(&apps), || print_apps(&apps));
        Ok(())
    }
}

fn print_apps(apps: &[AppListing]) {
    if apps.is_empty() {
        println!("No apps installed");
        return;
    }

    let width = apps.iter().map(|app| app.name.len()).max().unwrap_or(0).max(4);
    println!("{:<width$}  {:<10}  {}", "NAME".bold(), "VERSION".bold(), "STATUS".bold());
    for app in apps {
        let version = app
            .meta
            .as_ref()
            .and_then(|meta| meta.get("version"))
            .and_then(Value::as_str)
            .unwrap_or("-");
        let status = match (&app.meta, &app.meta_error) {
            (None, None) => "no meta file".yellow().to_string(),
            (_, Some(error)) => error.red().to_string(),
            (Some(_), None) => "ok".green().to_string(),
        };
        println!("{:<width$}  {version:<10}  {status}", app.name);
    }
}

/// List every file of an installed app.
#[derive(Args, Debug)]
pub struct FilesCommand {
    /// Name of the installed app
    #[arg(value_name = "NAME")]
    name: String,
}

impl FilesCommand {
    pub async fn execute(self, manager: &AppManager, output: &Output) -> Result<()> {
        let files = manager.file_list(&self.name)?;
        output.report(&Response::file_list(&files), || {
            for file in &files {
                println!("{file}");
            }
        });
        Ok(())
    }
}
