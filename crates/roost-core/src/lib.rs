//! Roost Core - Foundation crate for the Roost account pool.
//!
//! This crate provides the shared account record, error handling, and
//! configuration management that all other Roost crates depend on.
//!
//! # Modules
//!
//! - [`account`] - The account record and its lock/stat bookkeeping
//! - [`error`] - Central error types using thiserror
//! - [`config`] - TOML-based configuration with XDG paths
//! - [`logging`] - tracing subscriber initialization

#![warn(missing_docs)]
#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)]

pub mod account;
pub mod config;
pub mod error;
pub mod logging;

// Re-export commonly used types
pub use account::{Account, GmailCredentials};
pub use config::{AppConfig, DatabaseConfig, LoginSettings, MailSettings, PoolSettings};
pub use error::{ConfigError, ConfigResult, Result, RoostError};
