//! Interactive inspection session handler
//!
//! Instantiates the store, gateway, and orchestrator, then runs a
//! readline-based loop that submits operator input as questions about the
//! attached image. Slash commands cover session controls (persona, focus
//! instructions, image attachment, export).

use crate::commands::open_store;
use crate::config::Config;
use crate::error::Result;
use crate::gateway::{MultimodalClient, UsageMetrics};
use crate::orchestrator::{Orchestrator, SessionContext, SubmitOutcome};
use crate::personas::Persona;
use crate::report;
use anyhow::Context;
use colored::Colorize;
use directories::ProjectDirs;
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;
use std::path::{Path, PathBuf};

/// Slash commands available inside the inspection loop
#[derive(Debug, PartialEq)]
enum SlashCommand {
    /// Switch the analysis persona
    Mode(String),
    /// Set focus instructions for subsequent requests
    Focus(String),
    /// Clear focus instructions
    ClearFocus,
    /// Attach (or replace) the session image
    Image(PathBuf),
    /// Export the session to a PDF file
    Export(Option<PathBuf>),
    /// Show available commands
    Help,
    /// Leave the session
    Exit,
    /// Anything else starting with a slash
    Unknown(String),
}

/// Parse a slash command; `None` means regular question input
fn parse_slash_command(input: &str) -> Option<SlashCommand> {
    let rest = input.strip_prefix('/')?;
    let (command, arg) = match rest.split_once(char::is_whitespace) {
        Some((c, a)) => (c, a.trim()),
        None => (rest, ""),
    };

    Some(match command.to_lowercase().as_str() {
        "mode" => SlashCommand::Mode(arg.to_string()),
        "focus" if arg.is_empty() => SlashCommand::ClearFocus,
        "focus" => SlashCommand::Focus(arg.to_string()),
        "image" => SlashCommand::Image(PathBuf::from(arg)),
        "export" if arg.is_empty() => SlashCommand::Export(None),
        "export" => SlashCommand::Export(Some(PathBuf::from(arg))),
        "help" => SlashCommand::Help,
        "exit" | "quit" => SlashCommand::Exit,
        other => SlashCommand::Unknown(other.to_string()),
    })
}

/// Start an interactive inspection session
///
/// # Arguments
///
/// * `config` - Global configuration (consumed)
/// * `session` - Optional session id to resume
/// * `image` - Optional image to attach before the first question
/// * `mode` - Optional persona name override
/// * `focus` - Optional focus instructions for every request
pub async fn run_inspect(
    config: Config,
    session: Option<String>,
    image: Option<PathBuf>,
    mode: Option<String>,
    focus: Option<String>,
) -> Result<()> {
    let store = open_store(&config)?;
    let assets_dir = config
        .storage
        .assets_dir
        .clone()
        .map(PathBuf::from)
        .unwrap_or_else(default_assets_dir);
    let gateway = MultimodalClient::new(config.gateway.clone())?;
    let orchestrator = Orchestrator::new(store, Box::new(gateway), assets_dir)?;

    let ctx = match session {
        Some(id) => orchestrator.open_session(&id)?,
        None => orchestrator.new_session()?,
    };

    if let Some(name) = mode.as_deref() {
        match Persona::from_name(name) {
            Some(persona) => orchestrator.select_mode(&ctx, persona)?,
            None => print_unknown_persona(name),
        }
    }

    if let Some(path) = image {
        attach_image(&orchestrator, &ctx, &path)?;
    }

    let mut focus = focus;
    print_banner(&orchestrator, &ctx)?;

    let mut rl = DefaultEditor::new()?;

    loop {
        let persona = orchestrator
            .store()
            .get_session(&ctx.session_id)?
            .map(|s| s.mode)
            .unwrap_or_default();
        let prompt = format!("{} >> ", persona.colored_tag());

        match rl.readline(&prompt) {
            Ok(line) => {
                let trimmed = line.trim();
                if trimmed.is_empty() {
                    continue;
                }
                rl.add_history_entry(trimmed)?;

                match parse_slash_command(trimmed) {
                    Some(SlashCommand::Mode(name)) => match Persona::from_name(&name) {
                        Some(persona) => {
                            orchestrator.select_mode(&ctx, persona)?;
                            println!("Switched to {}\n", persona.colored_tag());
                        }
                        None => print_unknown_persona(&name),
                    },
                    Some(SlashCommand::Focus(text)) => {
                        println!("{}", format!("Focus set: {}", text).cyan());
                        focus = Some(text);
                    }
                    Some(SlashCommand::ClearFocus) => {
                        focus = None;
                        println!("{}", "Focus cleared.".cyan());
                    }
                    Some(SlashCommand::Image(path)) => {
                        if let Err(e) = attach_image(&orchestrator, &ctx, &path) {
                            println!("{}", format!("Image attach failed: {:#}", e).red());
                        }
                    }
                    Some(SlashCommand::Export(path)) => {
                        let path =
                            path.unwrap_or_else(|| PathBuf::from("inspection_report.pdf"));
                        if let Err(e) = export_report(&orchestrator, &ctx, &path) {
                            println!("{}", format!("Export failed: {:#}", e).red());
                        }
                    }
                    Some(SlashCommand::Help) => print_help(),
                    Some(SlashCommand::Exit) => break,
                    Some(SlashCommand::Unknown(cmd)) => {
                        println!(
                            "{}",
                            format!("Unknown command /{}; try /help", cmd).yellow()
                        );
                    }
                    None => {
                        match orchestrator.submit(&ctx, trimmed, focus.as_deref()).await {
                            Ok(SubmitOutcome::NoImage) => {
                                println!(
                                    "{}",
                                    "No image attached. Use /image <path> first.".yellow()
                                );
                            }
                            Ok(SubmitOutcome::Answered { content, usage }) => {
                                println!("\n{}\n", content);
                                print_metrics(&usage);
                            }
                            // Non-fatal: the user message is retained and the
                            // loop stays usable for the next attempt
                            Err(e) => {
                                println!("{}", format!("Request failed: {:#}", e).red());
                            }
                        }
                    }
                }
            }
            Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => break,
            Err(e) => return Err(e.into()),
        }
    }

    println!("Session {} saved.", short_id(&ctx.session_id));
    Ok(())
}

/// First 8 characters of a session id, for display
fn short_id(id: &str) -> &str {
    id.get(..8).unwrap_or(id)
}

/// Default asset directory under the platform data dir
fn default_assets_dir() -> PathBuf {
    ProjectDirs::from("io", "inspectra", "inspectra")
        .map(|dirs| dirs.data_dir().join("assets"))
        .unwrap_or_else(|| PathBuf::from("assets"))
}

/// Read an image file and attach it to the session
fn attach_image(orchestrator: &Orchestrator, ctx: &SessionContext, path: &Path) -> Result<()> {
    let bytes = std::fs::read(path)
        .with_context(|| format!("Failed to read image {}", path.display()))?;
    let stored = orchestrator.upload_image(ctx, &bytes)?;
    println!(
        "{}",
        format!("Image saved to {}", stored.display()).green()
    );
    Ok(())
}

/// Render the session history to a PDF file
fn export_report(orchestrator: &Orchestrator, ctx: &SessionContext, path: &Path) -> Result<()> {
    let history = orchestrator.store().get_history(&ctx.session_id)?;
    if history.is_empty() {
        println!("{}", "Nothing to export yet.".yellow());
        return Ok(());
    }
    let bytes = report::render(&history)?;
    std::fs::write(path, bytes)
        .with_context(|| format!("Failed to write {}", path.display()))?;
    println!(
        "{}",
        format!("Exported {} messages to {}", history.len(), path.display()).green()
    );
    Ok(())
}

fn print_banner(orchestrator: &Orchestrator, ctx: &SessionContext) -> Result<()> {
    let session = orchestrator.store().get_session(&ctx.session_id)?;
    println!();
    println!("{}", "INSPECTRA — component diagnostics".bold());
    if let Some(session) = session {
        println!("Session: {}  ({})", session.title, short_id(&ctx.session_id));
        println!("Persona: {}", session.mode.colored_tag());
        match session.image_path {
            Some(path) => println!("Image:   {}", path),
            None => println!("Image:   {}", "none — use /image <path>".yellow()),
        }
    }
    println!("Type a question, or /help for commands.\n");
    Ok(())
}

fn print_help() {
    println!("Commands:");
    println!("  /mode <name>     Switch persona: General Analysis, Defect Inspection, Safety Audit");
    println!("  /focus <text>    Extra instructions sent with every request (/focus to clear)");
    println!("  /image <path>    Attach or replace the component image");
    println!("  /export [path]   Write the session to a PDF report");
    println!("  /help            Show this help");
    println!("  /exit            Leave the session");
}

fn print_unknown_persona(name: &str) {
    let known: Vec<&str> = Persona::ALL.iter().map(|p| p.name()).collect();
    println!(
        "{}",
        format!("Unknown persona '{}'; known: {}", name, known.join(", ")).yellow()
    );
}

fn print_metrics(usage: &UsageMetrics) {
    println!(
        "{}",
        format!(
            "{} tokens · {:.2}s · {:.2} T/s",
            usage.total_tokens, usage.latency, usage.throughput
        )
        .dimmed()
    );
}
