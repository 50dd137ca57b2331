//! Multimodal chat client for Inspectra
//!
//! This module implements the Gateway trait against an OpenAI-style
//! multimodal chat endpoint: one synchronous POST carrying the system
//! prompt, the conversation history, and the current question with an
//! optional inline base64 image, with token usage and latency extracted
//! from the response.

use crate::config::GatewayConfig;
use crate::error::{InspectraError, Result};
use crate::gateway::base::round2;
use crate::gateway::{ChatMessage, ChatReply, Gateway, UsageMetrics};

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use reqwest::Client;
use serde::Serialize;
use std::time::Instant;

/// Placeholder answer used when a success response carries no content field
///
/// Some gateway deployments have returned 2xx bodies with neither a
/// `choices` array nor a top-level `content`. That shape is treated as a
/// defined fallback, not an error.
const NO_CONTENT_PLACEHOLDER: &str = "no content";

/// Client for the multimodal chat gateway
///
/// Issues a single blocking (from the caller's perspective) request per
/// `send`. There is no retry, backoff, or timeout configuration beyond the
/// transport defaults; callers treat each call as one best-effort attempt.
///
/// # Examples
///
/// ```no_run
/// use inspectra::config::GatewayConfig;
/// use inspectra::gateway::{Gateway, MultimodalClient};
///
/// # async fn example() -> inspectra::error::Result<()> {
/// let config = GatewayConfig {
///     api_key: Some("sk-test".to_string()),
///     ..Default::default()
/// };
/// let client = MultimodalClient::new(config)?;
/// let reply = client.send("What is this?", None, &[], "You are an inspector").await?;
/// println!("{}", reply.content);
/// # Ok(())
/// # }
/// ```
pub struct MultimodalClient {
    client: Client,
    config: GatewayConfig,
    api_key: String,
}

/// Request body for the chat endpoint
#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<RequestMessage>,
    max_tokens: u32,
    temperature: f32,
    stream: bool,
}

/// One entry in the request message list
#[derive(Debug, Serialize)]
struct RequestMessage {
    role: String,
    content: RequestContent,
}

/// Message content: plain text for history, parts for the final user entry
#[derive(Debug, Serialize)]
#[serde(untagged)]
enum RequestContent {
    Text(String),
    Parts(Vec<ContentPart>),
}

/// One part of a multimodal user message
#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ContentPart {
    Text { text: String },
    ImageUrl { image_url: ImageRef },
}

/// Inline image reference carried as a data URI
#[derive(Debug, Serialize)]
struct ImageRef {
    url: String,
}

impl MultimodalClient {
    /// Create a new gateway client
    ///
    /// # Arguments
    ///
    /// * `config` - Gateway configuration; must carry an API key
    ///
    /// # Errors
    ///
    /// Returns a configuration error when the API key is missing, or if
    /// HTTP client initialization fails
    pub fn new(config: GatewayConfig) -> Result<Self> {
        let api_key = config
            .api_key
            .clone()
            .filter(|k| !k.is_empty())
            .ok_or_else(|| {
                InspectraError::Config(format!(
                    "No API key configured; set {}",
                    crate::config::ENV_API_KEY
                ))
            })?;

        let client = Client::builder()
            .user_agent(concat!("inspectra/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| {
                InspectraError::Connection(format!("Failed to create HTTP client: {}", e))
            })?;

        tracing::info!(
            "Initialized gateway client: endpoint={}, model={}",
            config.endpoint,
            config.model
        );

        Ok(Self {
            client,
            config,
            api_key,
        })
    }

    /// Build the full request message list
    ///
    /// Ordering is fixed: one system message, the history entries verbatim,
    /// then the final user message with the question text and, when image
    /// bytes are provided, an inline data-URI image part.
    fn build_messages(
        &self,
        question: &str,
        image: Option<&[u8]>,
        history: &[ChatMessage],
        system_prompt: &str,
    ) -> Vec<RequestMessage> {
        let mut messages = Vec::with_capacity(history.len() + 2);

        messages.push(RequestMessage {
            role: "system".to_string(),
            content: RequestContent::Text(system_prompt.to_string()),
        });

        for entry in history {
            messages.push(RequestMessage {
                role: entry.role.clone(),
                content: RequestContent::Text(entry.content.clone()),
            });
        }

        let mut parts = vec![ContentPart::Text {
            text: question.to_string(),
        }];
        if let Some(bytes) = image {
            parts.push(ContentPart::ImageUrl {
                image_url: ImageRef {
                    url: image_data_uri(bytes),
                },
            });
        }
        messages.push(RequestMessage {
            role: "user".to_string(),
            content: RequestContent::Parts(parts),
        });

        messages
    }
}

/// Encode image bytes as a base64 data URI
///
/// The media type is sniffed from the bytes; unrecognized data falls back
/// to JPEG, which matches what the gateway accepts for opaque uploads.
fn image_data_uri(bytes: &[u8]) -> String {
    let mime = image::guess_format(bytes)
        .map(|f| f.to_mime_type())
        .unwrap_or("image/jpeg");
    format!("data:{};base64,{}", mime, BASE64.encode(bytes))
}

/// Extract the answer text from a response body
///
/// The response may nest the answer under `choices[0].message.content` or
/// expose it as a top-level `content` field. When neither is present the
/// defined placeholder is returned instead of failing the call.
fn extract_content(body: &serde_json::Value) -> String {
    if let Some(content) = body
        .pointer("/choices/0/message/content")
        .and_then(|v| v.as_str())
    {
        return content.to_string();
    }
    if let Some(content) = body.get("content").and_then(|v| v.as_str()) {
        return content.to_string();
    }
    tracing::warn!("Gateway response carried no content field");
    NO_CONTENT_PLACEHOLDER.to_string()
}

/// Extract token usage from a response body, defaulting all counts to zero
fn extract_usage(body: &serde_json::Value, latency: f64) -> UsageMetrics {
    let field = |name: &str| {
        body.get("usage")
            .and_then(|u| u.get(name))
            .and_then(|v| v.as_u64())
            .unwrap_or(0)
    };
    UsageMetrics::from_counts(
        field("prompt_tokens"),
        field("completion_tokens"),
        field("total_tokens"),
        latency,
    )
}

#[async_trait]
impl Gateway for MultimodalClient {
    async fn send(
        &self,
        question: &str,
        image: Option<&[u8]>,
        history: &[ChatMessage],
        system_prompt: &str,
    ) -> Result<ChatReply> {
        let started = Instant::now();

        let request = ChatRequest {
            model: self.config.model.clone(),
            messages: self.build_messages(question, image, history, system_prompt),
            max_tokens: self.config.max_tokens,
            temperature: self.config.temperature,
            stream: false,
        };

        tracing::debug!(
            "Sending gateway request: {} messages, image={}",
            request.messages.len(),
            image.is_some()
        );

        let response = self
            .client
            .post(&self.config.endpoint)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                tracing::error!("Gateway request failed: {}", e);
                InspectraError::Connection(e.to_string())
            })?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| InspectraError::Connection(format!("Failed to read response: {}", e)))?;

        let latency = round2(started.elapsed().as_secs_f64());

        if !status.is_success() {
            tracing::error!("Gateway returned {}: {}", status, body);
            return Err(InspectraError::Upstream(body).into());
        }

        let parsed: serde_json::Value = serde_json::from_str(&body).map_err(|e| {
            tracing::error!("Failed to parse gateway response: {}", e);
            InspectraError::Connection(format!("Failed to parse response: {}", e))
        })?;

        let content = extract_content(&parsed);
        let usage = extract_usage(&parsed, latency);

        tracing::debug!(
            "Gateway response: {} tokens in {}s ({} T/s)",
            usage.total_tokens,
            usage.latency,
            usage.throughput
        );

        Ok(ChatReply { content, usage })
    }
}
