use crate::gateway::UsageMetrics;
use crate::personas::Persona;
use chrono::{DateTime, Utc};

/// Metadata for a stored inspection session
#[derive(Debug, Clone)]
pub struct SessionRecord {
    /// Unique identifier for the session
    pub id: String,
    /// User-friendly title (sentinel until the first user message)
    pub title: String,
    /// Path to the uploaded image asset, when one exists
    pub image_path: Option<String>,
    /// Active analysis persona
    pub mode: Persona,
    /// When the session was created
    pub created_at: DateTime<Utc>,
}

/// One stored conversation turn
#[derive(Debug, Clone)]
pub struct MessageRecord {
    /// Insertion-ordered identifier, unique within the store
    pub id: i64,
    /// Session this message belongs to
    pub session_id: String,
    /// "user" or "assistant"
    pub role: String,
    /// Text body
    pub content: String,
    /// Usage metrics; present only for assistant turns that got a
    /// successful response
    pub usage: Option<UsageMetrics>,
    /// When the message was appended
    pub timestamp: DateTime<Utc>,
}
