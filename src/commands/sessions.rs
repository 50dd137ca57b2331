//! Session management command handlers

use crate::cli::SessionCommand;
use crate::commands::open_store;
use crate::config::Config;
use crate::error::Result;
use colored::Colorize;
use prettytable::{format, Table};

/// Handle `sessions` subcommands
pub fn run_sessions(config: &Config, command: SessionCommand) -> Result<()> {
    let store = open_store(config)?;

    match command {
        SessionCommand::List => {
            let sessions = store.list_sessions()?;

            if sessions.is_empty() {
                println!("{}", "No inspection sessions found.".yellow());
                return Ok(());
            }

            let mut table = Table::new();
            table.set_format(*format::consts::FORMAT_BORDERS_ONLY);

            table.add_row(prettytable::row![
                "ID".bold(),
                "Title".bold(),
                "Persona".bold(),
                "Image".bold(),
                "Created".bold()
            ]);

            for session in sessions {
                let id_short = session.id.get(..8).unwrap_or(&session.id).to_string();
                let title = if session.title.chars().count() > 40 {
                    let prefix: String = session.title.chars().take(37).collect();
                    format!("{}...", prefix)
                } else {
                    session.title
                };
                let image = if session.image_path.is_some() { "yes" } else { "-" };
                let created = session.created_at.format("%Y-%m-%d %H:%M").to_string();

                table.add_row(prettytable::row![
                    id_short.cyan(),
                    title,
                    session.mode.name(),
                    image,
                    created
                ]);
            }

            println!("\nInspection Sessions:");
            table.printstd();
            println!();
            println!(
                "Use {} to resume a session.",
                "inspectra inspect --session <ID>".cyan()
            );
            println!();
        }
        SessionCommand::Rename { id, title } => {
            store.rename_session(&id, &title)?;
            println!("{}", format!("Renamed session {} to '{}'", id, title).green());
        }
        SessionCommand::Delete { id } => {
            store.delete_session(&id)?;
            println!("{}", format!("Deleted session {}", id).green());
        }
    }

    Ok(())
}
