//! Base gateway trait and common types for Inspectra
//!
//! This module defines the Gateway trait the AI client implements, along
//! with the message and metrics types shared by the gateway, the store,
//! and the orchestrator.

use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Message structure for conversation history
///
/// Represents one turn exchanged with the AI service. History entries are
/// forwarded to the gateway verbatim, preserving role and content.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Role of the message sender (user, assistant, system)
    pub role: String,
    /// Content of the message
    pub content: String,
}

impl ChatMessage {
    /// Creates a new user message
    ///
    /// # Examples
    ///
    /// ```
    /// use inspectra::gateway::ChatMessage;
    ///
    /// let msg = ChatMessage::user("What is this component?");
    /// assert_eq!(msg.role, "user");
    /// ```
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }

    /// Creates a new assistant message
    ///
    /// # Examples
    ///
    /// ```
    /// use inspectra::gateway::ChatMessage;
    ///
    /// let msg = ChatMessage::assistant("This is a ball bearing.");
    /// assert_eq!(msg.role, "assistant");
    /// ```
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: "assistant".to_string(),
            content: content.into(),
        }
    }

    /// Creates a new system message
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: content.into(),
        }
    }
}

/// Token usage and performance metrics for one gateway call
///
/// The canonical structured form: the store always deserializes persisted
/// usage blobs back into this type, so callers never branch on
/// representation. All fields default to zero when absent.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct UsageMetrics {
    /// Number of tokens in the prompt
    #[serde(default)]
    pub prompt_tokens: u64,
    /// Number of tokens in the completion
    #[serde(default)]
    pub completion_tokens: u64,
    /// Total tokens reported by the service
    #[serde(default)]
    pub total_tokens: u64,
    /// Round-trip time in seconds, rounded to 2 decimals
    #[serde(default)]
    pub latency: f64,
    /// Tokens per second, rounded to 2 decimals; 0 when latency is 0
    #[serde(default)]
    pub throughput: f64,
}

impl UsageMetrics {
    /// Create metrics from reported token counts and a measured latency
    ///
    /// Throughput is `total_tokens / latency` rounded to 2 decimals. A
    /// latency of zero (or below, on a clock anomaly) yields a throughput
    /// of exactly zero rather than a division fault.
    ///
    /// # Examples
    ///
    /// ```
    /// use inspectra::gateway::UsageMetrics;
    ///
    /// let usage = UsageMetrics::from_counts(40, 60, 100, 2.0);
    /// assert_eq!(usage.throughput, 50.0);
    /// ```
    pub fn from_counts(
        prompt_tokens: u64,
        completion_tokens: u64,
        total_tokens: u64,
        latency: f64,
    ) -> Self {
        let throughput = if latency > 0.0 {
            round2(total_tokens as f64 / latency)
        } else {
            0.0
        };
        Self {
            prompt_tokens,
            completion_tokens,
            total_tokens,
            latency,
            throughput,
        }
    }
}

/// Round a value to 2 decimal places
pub(crate) fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Reply from a completed gateway call
///
/// Contains the answer text and the computed usage metrics.
#[derive(Debug, Clone)]
pub struct ChatReply {
    /// The answer text from the AI
    pub content: String,
    /// Token counts and derived latency/throughput
    pub usage: UsageMetrics,
}

/// Gateway trait for the multimodal chat service
///
/// The orchestrator depends on this trait rather than the concrete client
/// so it can be exercised against a test double.
#[async_trait]
pub trait Gateway: Send + Sync {
    /// Send one multimodal chat request
    ///
    /// # Arguments
    ///
    /// * `question` - The current user question
    /// * `image` - Optional raw image bytes to attach inline
    /// * `history` - Prior conversation turns, forwarded verbatim in order
    /// * `system_prompt` - The composed system prompt for this call
    ///
    /// # Returns
    ///
    /// Returns the answer text with usage metrics. This is a single
    /// best-effort attempt: no retry, no backoff, no streaming.
    ///
    /// # Errors
    ///
    /// Returns an upstream error for a non-success status, or a connection
    /// error for transport and parsing failures
    async fn send(
        &self,
        question: &str,
        image: Option<&[u8]>,
        history: &[ChatMessage],
        system_prompt: &str,
    ) -> Result<ChatReply>;
}
