//! Inspectra - AI-assisted industrial component inspection
//!
//! This library provides the core functionality for Inspectra: persisted
//! inspection sessions, a multimodal AI gateway client, persona-gated
//! prompt composition, and PDF report rendering.
//!
//! # Architecture
//!
//! The library is organized into the following modules:
//!
//! - `orchestrator`: Session flow — create/load sessions, attach images, submit questions
//! - `gateway`: AI gateway abstraction and the multimodal HTTP client
//! - `storage`: SQLite persistence for sessions and messages
//! - `personas`: Analysis personas and system prompt composition
//! - `report`: PDF rendering of a session's history
//! - `config`: Configuration management and validation
//! - `error`: Error types and result aliases
//! - `cli`: Command-line interface definition
//!
//! # Example
//!
//! ```no_run
//! use inspectra::config::Config;
//! use inspectra::gateway::MultimodalClient;
//! use inspectra::orchestrator::Orchestrator;
//! use inspectra::storage::SqliteStore;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::load("config/config.yaml")?;
//!     config.validate()?;
//!
//!     let store = SqliteStore::new()?;
//!     let gateway = MultimodalClient::new(config.gateway.clone())?;
//!     let orchestrator = Orchestrator::new(store, Box::new(gateway), "assets")?;
//!
//!     let ctx = orchestrator.new_session()?;
//!     orchestrator.upload_image(&ctx, &std::fs::read("part.png")?)?;
//!     let outcome = orchestrator.submit(&ctx, "What is this component?", None).await?;
//!     println!("{:?}", outcome);
//!     Ok(())
//! }
//! ```

pub mod cli;
pub mod commands;
pub mod config;
pub mod error;
pub mod gateway;
pub mod orchestrator;
pub mod personas;
pub mod report;
pub mod storage;

// Re-export commonly used types
pub use config::Config;
pub use error::{InspectraError, Result};
pub use orchestrator::{Orchestrator, SessionContext, SubmitOutcome};
pub use personas::Persona;
