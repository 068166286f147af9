//! Cross-platform utilities shared by the installer, fetchers and CLI.
//!
//! - [`fs`] - Directory creation, atomic writes, recursive listings
//! - [`path_validation`] - Checks for untrusted archive and manifest paths
//! - [`platform`] - Home directory lookup and path expansion

pub mod fs;
pub mod path_validation;
pub mod platform;

pub use fs::{atomic_write, ensure_dir, list_relative_files, remove_dir_all};
pub use path_validation::{is_safe_relative_file, is_unsafe_entry_path, is_valid_app_name};
pub use platform::{get_home_dir, is_windows, resolve_path};
