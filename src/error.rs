//! Error types for Inspectra
//!
//! This module defines all error types used throughout the application,
//! using `thiserror` for ergonomic error handling.

use thiserror::Error;

/// Main error type for Inspectra operations
///
/// This enum encompasses all possible errors that can occur during
/// configuration loading, gateway calls, persistence, and report rendering.
#[derive(Error, Debug)]
pub enum InspectraError {
    /// Configuration-related errors (missing key, bad file, invalid value)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Non-success response from the AI gateway; carries the raw body
    #[error("Upstream error: {0}")]
    Upstream(String),

    /// Transport-level or response-parsing failure on a gateway call
    #[error("Connection failed: {0}")]
    Connection(String),

    /// Persistence-layer errors (database operations)
    #[error("Storage error: {0}")]
    Storage(String),

    /// Report rendering errors (PDF generation)
    #[error("Report error: {0}")]
    Report(String),

    /// Image asset errors (unreadable or unrecognized image data)
    #[error("Image error: {0}")]
    Image(String),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// YAML parsing errors
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// HTTP request errors
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

/// Result type alias for Inspectra operations
///
/// This is a convenience alias that uses `anyhow::Error` as the error type,
/// allowing for rich error context and easy error propagation.
pub type Result<T> = anyhow::Result<T>;
