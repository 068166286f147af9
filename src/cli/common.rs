//! Common utilities for CLI commands

use crate::models::Response;
use colored::Colorize;

/// How a command reports its result.
///
/// In JSON mode every command prints exactly one [`Response`] object on
/// stdout. Otherwise it prints human-readable text; `quiet` suppresses
/// progress and confirmation lines but never the data a command was asked for.
#[derive(Debug, Clone, Copy, Default)]
pub struct Output {
    json: bool,
    quiet: bool,
}

impl Output {
    /// Output settings from the global flags.
    #[must_use]
    pub const fn new(json: bool, quiet: bool) -> Self {
        Self {
            json,
            quiet,
        }
    }

    /// Whether results are printed as JSON.
    #[must_use]
    pub const fn is_json(&self) -> bool {
        self.json
    }

    /// Prints `response` in JSON mode, or runs `human` otherwise.
    pub fn report(&self, response: &Response, human: impl FnOnce()) {
        if self.json {
            println!("{}", response.to_json());
        } else {
            human();
        }
    }

    /// A progress or confirmation line, hidden by `--quiet` and in JSON mode.
    pub fn status(&self, message: impl AsRef<str>) {
        if !self.json && !self.quiet {
            println!("{}", message.as_ref());
        }
    }

    /// Reports that the install lock is held.
    pub fn busy(&self) {
        self.report(&Response::busy(), || {
            println!(
                "{}",
                "⏳ Another install or update is in progress, try again shortly".yellow()
            );
        });
    }
}
