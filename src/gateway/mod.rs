//! AI gateway abstraction and client
//!
//! The gateway turns one user question (plus optional image and prior
//! history) into a single multimodal chat request and parses the answer
//! text and usage metrics out of the response.

mod base;
mod multimodal;

pub use base::{ChatMessage, ChatReply, Gateway, UsageMetrics};
pub use multimodal::MultimodalClient;
