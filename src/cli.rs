//! Command-line interface definition for Inspectra
//!
//! This module defines the CLI structure using clap's derive API,
//! providing commands for interactive inspection, session management,
//! and report export.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Inspectra - AI-assisted industrial component inspection
///
/// Attach an image of a component, converse with a vision model about it
/// under a fixed analysis persona, and keep every session on disk.
#[derive(Parser, Debug, Clone)]
#[command(name = "inspectra")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "config/config.yaml")]
    pub config: Option<String>,

    /// Override the session database path
    #[arg(long)]
    pub db_path: Option<String>,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Command to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands for Inspectra
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Start an interactive inspection session
    Inspect {
        /// Resume an existing session by id
        #[arg(short, long)]
        session: Option<String>,

        /// Attach an image before the first question
        #[arg(short, long)]
        image: Option<PathBuf>,

        /// Analysis persona (General Analysis, Defect Inspection, Safety Audit)
        #[arg(short, long)]
        mode: Option<String>,

        /// Focus instructions appended to every request
        #[arg(short, long)]
        focus: Option<String>,
    },

    /// Manage stored inspection sessions
    Sessions {
        /// Session management subcommand
        #[command(subcommand)]
        command: SessionCommand,
    },

    /// Export a session's history as a PDF report
    Export {
        /// Session id to export
        #[arg(short, long)]
        session: String,

        /// Output file path
        #[arg(short, long, default_value = "inspection_report.pdf")]
        output: PathBuf,
    },
}

/// Session management subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum SessionCommand {
    /// List stored sessions, newest first
    List,

    /// Rename a session
    Rename {
        /// Session id
        #[arg(long)]
        id: String,

        /// New title
        #[arg(long)]
        title: String,
    },

    /// Delete a session, its messages, and its image asset
    Delete {
        /// Session id
        #[arg(long)]
        id: String,
    },
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }
}
