//! Core types shared by every layer of appdock.
//!
//! - [`error`] - The [`AppError`] taxonomy and user-facing [`ErrorContext`]
//! - [`apps_root`] - Path layout of the managed apps root

pub mod apps_root;
pub mod error;

pub use apps_root::AppsRoot;
pub use error::{AppError, ErrorContext, ErrorKind, user_friendly_error};
