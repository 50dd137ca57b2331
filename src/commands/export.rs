//! PDF export command handler

use crate::commands::open_store;
use crate::config::Config;
use crate::error::{InspectraError, Result};
use crate::report;
use anyhow::Context;
use colored::Colorize;
use std::path::Path;

/// Render a stored session's history to a PDF file
///
/// # Arguments
///
/// * `config` - Global configuration
/// * `session_id` - Session to export
/// * `output` - Destination file path
pub fn run_export(config: &Config, session_id: &str, output: &Path) -> Result<()> {
    let store = open_store(config)?;

    let session = store
        .get_session(session_id)?
        .ok_or_else(|| InspectraError::Storage(format!("Session {} not found", session_id)))?;

    let history = store.get_history(session_id)?;
    if history.is_empty() {
        println!("{}", "Session has no messages; exporting an empty report.".yellow());
    }

    let bytes = report::render(&history)?;
    std::fs::write(output, bytes)
        .with_context(|| format!("Failed to write {}", output.display()))?;

    println!(
        "{}",
        format!(
            "Exported '{}' ({} messages) to {}",
            session.title,
            history.len(),
            output.display()
        )
        .green()
    );
    Ok(())
}
