//! `appdock lock`: inspect or clear the install lock.

use super::common::Output;
use crate::installer::AppManager;
use crate::models::Response;
use anyhow::Result;
use clap::{Args, Subcommand};
use colored::Colorize;

/// Inspect or clear the install lock.
#[derive(Args, Debug)]
pub struct LockCommand {
    #[command(subcommand)]
    action: LockAction,
}

#[derive(Subcommand, Debug)]
enum LockAction {
    /// Report whether an install or update is in progress
    Status,

    /// Remove a lock left behind by a crashed process
    ///
    /// Only run this when no appdock process is running.
    Clear,
}

impl LockCommand {
    pub async fn execute(self, manager: &AppManager, output: &Output) -> Result<()> {
        match self.action {
            LockAction::Status => {
                let status = manager.lock_status();
                output.report(&Response::lock_status(&status), || match (&status.holder, status.held) {
                    (_, false) => println!("{}", "Install lock is free".green()),
                    (Some(holder), true) => println!(
                        "{} by pid {} since {}",
                        "Install lock held".yellow(),
                        holder.pid,
                        holder.created_at.to_rfc3339()
                    ),
                    (None, true) => println!("{}", "Install lock held".yellow()),
                });
            }
            LockAction::Clear => {
                let removed = manager.clear_lock()?;
                output.report(&Response::lock_cleared(removed), || {
                    if removed {
                        println!("{}", "Removed install lock".green());
                    } else {
                        println!("No install lock present");
                    }
                });
            }
        }
        Ok(())
    }
}
