// ABOUTME: Collaborator traits the session talks to: chat transport and product catalog
// ABOUTME: Defines the reply shape, queryStage attachment gating, and an offline canned transport

use crate::error::TransportError;
use crate::types::{ConversationContext, Message, Product};
use async_trait::async_trait;
use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Stage marker that switches attachment input on
pub const DOCUMENTS_REQUIRED: &str = "DocumentsRequired";

/// Server-side progress marker attached to a reply
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryStage {
    #[serde(rename = "type")]
    pub kind: String,
    pub stage: String,
}

/// Reply to a free-text send
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatReply {
    /// Display text
    pub response: String,
    /// Informational only
    #[serde(default)]
    pub source: Option<String>,
    #[serde(rename = "queryStage", default)]
    pub query_stage: Option<QueryStage>,
}

impl ChatReply {
    pub fn text(response: impl Into<String>) -> Self {
        Self {
            response: response.into(),
            source: None,
            query_stage: None,
        }
    }

    pub fn with_stage(mut self, kind: impl Into<String>, stage: impl Into<String>) -> Self {
        self.query_stage = Some(QueryStage {
            kind: kind.into(),
            stage: stage.into(),
        });
        self
    }

    /// Attachment input is on only while a claim submission awaits documents.
    pub fn enables_attachments(&self) -> bool {
        self.query_stage.as_ref().is_some_and(|qs| {
            qs.kind == ConversationContext::ClaimSubmission.as_str()
                && qs.stage == DOCUMENTS_REQUIRED
        })
    }
}

/// Delivers an outgoing user message to the remote assistant.
///
/// Implementations own their timeout and retry policy; the session makes
/// exactly one call per send and never retries.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Short name for logs
    fn name(&self) -> &'static str;

    async fn send(&self, message: &Message) -> Result<ChatReply, TransportError>;
}

/// Read-only product catalog used by the Product Info flow.
#[async_trait]
pub trait Catalog: Send + Sync {
    async fn fetch_segments(&self) -> Result<Vec<String>, TransportError>;

    async fn fetch_products(&self, segment: &str) -> Result<Vec<Product>, TransportError>;

    async fn fetch_product_detail(&self, code: &str) -> Result<String, TransportError>;
}

const CANNED_RESPONSES: [&str; 5] = [
    "Thanks for your message! I'd be happy to help you with that.",
    "I understand what you're asking. Let me provide you with some information.",
    "Great question! Here's what I can tell you about that.",
    "I'm here to help! Based on your message, I can suggest a few things.",
    "That's an interesting point. Let me break that down for you.",
];

/// Offline stand-in that answers with a canned acknowledgement after a
/// simulated typing delay.
#[derive(Debug, Clone)]
pub struct CannedTransport {
    base_delay: Duration,
    max_jitter: Duration,
}

impl Default for CannedTransport {
    fn default() -> Self {
        Self {
            base_delay: Duration::from_millis(1000),
            max_jitter: Duration::from_millis(2000),
        }
    }
}

impl CannedTransport {
    pub fn new(base_delay: Duration, max_jitter: Duration) -> Self {
        Self {
            base_delay,
            max_jitter,
        }
    }

    fn pick(&self) -> (Duration, &'static str) {
        let mut rng = rand::thread_rng();
        let jitter_ms = self.max_jitter.as_millis() as u64;
        let jitter = if jitter_ms == 0 {
            Duration::ZERO
        } else {
            Duration::from_millis(rng.gen_range(0..jitter_ms))
        };
        let response = CANNED_RESPONSES
            .choose(&mut rng)
            .copied()
            .unwrap_or(CANNED_RESPONSES[0]);
        (self.base_delay + jitter, response)
    }
}

#[async_trait]
impl Transport for CannedTransport {
    fn name(&self) -> &'static str {
        "canned"
    }

    async fn send(&self, _message: &Message) -> Result<ChatReply, TransportError> {
        // ThreadRng is not Send, so pick before awaiting
        let (delay, response) = self.pick();
        tokio::time::sleep(delay).await;
        Ok(ChatReply::text(response))
    }
}
