//! Integration test suite for appdock
//!
//! These tests drive the compiled binary against a temporary apps root.
//!
//! ```bash
//! cargo test --test integration
//! ```
//!
//! - **cli_install**: local archive, manifest and payload installs
//! - **cli_lock**: lock status, busy answers and clearing
//! - **cli_meta**: listing, file lists and manifest editing

#[path = "../common/mod.rs"]
mod common;

mod cli_install;
mod cli_lock;
mod cli_meta;
