/*!
Command handlers for the CLI

This module provides command handlers invoked by the CLI entrypoint.

It exposes three top-level command modules:

- `inspect`  — Interactive inspection session
- `sessions` — List, rename, and delete stored sessions
- `export`   — Render a session's history to a PDF file

These handlers are intentionally small and use the library components:
the store, the gateway, the orchestrator, and the report renderer.
*/

use crate::config::Config;
use crate::error::Result;
use crate::storage::SqliteStore;

pub mod export;
pub mod inspect;
pub mod sessions;

/// Open the store at the configured path, or the default location
pub(crate) fn open_store(config: &Config) -> Result<SqliteStore> {
    match &config.storage.db_path {
        Some(path) => SqliteStore::new_with_path(path),
        None => SqliteStore::new(),
    }
}
