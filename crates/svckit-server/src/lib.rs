//! svckit server composition layer
//!
//! Ties the framework together: loads configuration, bootstraps logging,
//! starts the timer scheduler and (when configured) the multicast discovery
//! service, and runs the single-consumer event dispatch loop that everything
//! else feeds.
//!
//! # Example
//!
//! ```no_run
//! use svckit_core::config::AppConfig;
//! use svckit_server::Server;
//!
//! # async fn run() -> svckit_server::Result<()> {
//! let config = AppConfig::from_file("bench.json")?;
//!
//! let mut server = Server::start(config, |event| {
//!     println!("discovered {}#{}", event.peer.name, event.peer.id);
//! })
//! .await?;
//!
//! // ... run until shutdown ...
//! server.stop().await;
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod server;

pub use error::{Result, ServerError};
pub use server::Server;
