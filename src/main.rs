//! appdock CLI entry point
//!
//! Parses arguments, sets up logging on stderr, runs the command, and renders
//! any error either as a JSON result object (`--json`) or as a colored message
//! with a suggestion.

use anyhow::Result;
use appdock::cli;
use appdock::core::user_friendly_error;
use appdock::models::Response;
use clap::Parser;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = cli::Cli::parse();

    // RUST_LOG wins over the verbosity flags
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(cli.log_filter()));
    tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr).with_target(false).init();

    // Set up colored output for Windows
    #[cfg(windows)]
    colored::control::set_virtual_terminal(true).ok();

    let json = cli.json_output();
    match cli.execute().await {
        Ok(()) => Ok(()),
        Err(e) => {
            if json {
                println!("{}", Response::error(&e).to_json());
            } else {
                user_friendly_error(e).display();
            }
            std::process::exit(1);
        }
    }
}
