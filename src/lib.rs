//! Terminal front end for systemd service units.
//!
//! The core lives in [`app::systemd`]: reading a snapshot of service units
//! and dispatching start/stop/restart actions through `systemctl`. The
//! interactive table in [`app`] and the command-line subcommands in the
//! binary are thin shells over those two operations.

pub mod app;
pub mod config;
pub mod error;

pub use error::{Error, Result};

/// Name used for the config and log directories.
pub const APP_NAME: &str = "systemd-user-tui";
