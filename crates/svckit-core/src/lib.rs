//! # svckit Core
//!
//! Shared configuration, error types, and logging bootstrap for the svckit
//! backend-service framework.
//!
//! This crate provides the foundational building blocks shared by the other
//! svckit crates:
//!
//! - **Configuration**: a JSON configuration file (`AppConfig`) with
//!   per-section defaults and validation.
//! - **Errors**: `thiserror`-based error types for configuration failures.
//! - **Logging**: a `tracing-subscriber` bootstrap driven by the logging
//!   section of the configuration.
//!
//! The discovery configuration lives here (not in `svckit-discovery`) so the
//! server and the discovery crate can both depend on it without a cycle.

pub mod config;
pub mod discovery_config;
pub mod error;
pub mod logging;

pub use config::AppConfig;
pub use discovery_config::DiscoveryConfig;
pub use error::{ConfigError, CoreError, Result};
