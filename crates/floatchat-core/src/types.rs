// ABOUTME: Core transcript types for floatchat
// ABOUTME: Message, Sender, MessageFlags, Attachment, ConversationContext, and Product

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

/// Who authored a transcript entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sender {
    User,
    Bot,
}

/// Rendering markers that never alter `content`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageFlags {
    pub is_welcome: bool,
    pub is_error: bool,
    /// Segment choices follow this message
    pub show_segments: bool,
    /// Product choices follow this message
    pub has_products: bool,
}

impl MessageFlags {
    pub fn welcome() -> Self {
        Self {
            is_welcome: true,
            ..Self::default()
        }
    }

    pub fn error() -> Self {
        Self {
            is_error: true,
            ..Self::default()
        }
    }

    pub fn segments() -> Self {
        Self {
            show_segments: true,
            ..Self::default()
        }
    }

    pub fn products() -> Self {
        Self {
            has_products: true,
            ..Self::default()
        }
    }
}

/// Routes the next free-text submission to a server-side handling path
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ConversationContext {
    #[default]
    Default,
    PolicyInfo,
    ClaimInfo,
    ClaimSubmission,
    ProductInfo,
}

impl ConversationContext {
    /// Wire name sent in the `x-user-context` header
    pub fn as_str(&self) -> &'static str {
        match self {
            ConversationContext::Default => "DEFAULT",
            ConversationContext::PolicyInfo => "POLICY_INFO",
            ConversationContext::ClaimInfo => "CLAIM_INFO",
            ConversationContext::ClaimSubmission => "CLAIM_SUBMISSION",
            ConversationContext::ProductInfo => "PRODUCT_INFO",
        }
    }
}

impl fmt::Display for ConversationContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where an attachment's bytes live until the transport reads them
#[derive(Clone)]
pub enum FileSource {
    Path(PathBuf),
    Memory(Arc<[u8]>),
}

impl fmt::Debug for FileSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FileSource::Path(path) => f.debug_tuple("Path").field(path).finish(),
            FileSource::Memory(bytes) => write!(f, "Memory({} bytes)", bytes.len()),
        }
    }
}

/// A file chosen by the user, staged or already sent
#[derive(Debug, Clone)]
pub struct Attachment {
    pub name: String,
    pub size: u64,
    pub mime_type: String,
    pub source: FileSource,
}

impl Attachment {
    pub fn from_bytes(
        name: impl Into<String>,
        mime_type: impl Into<String>,
        bytes: impl Into<Arc<[u8]>>,
    ) -> Self {
        let bytes = bytes.into();
        Self {
            name: name.into(),
            size: bytes.len() as u64,
            mime_type: mime_type.into(),
            source: FileSource::Memory(bytes),
        }
    }

    pub fn from_path(
        name: impl Into<String>,
        size: u64,
        mime_type: impl Into<String>,
        path: impl Into<PathBuf>,
    ) -> Self {
        Self {
            name: name.into(),
            size,
            mime_type: mime_type.into(),
            source: FileSource::Path(path.into()),
        }
    }

    /// Two attachments are the same file when name and size match
    pub fn same_file(&self, other: &Attachment) -> bool {
        self.name == other.name && self.size == other.size
    }
}

/// A product offered during the Product Info flow
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub product_name: String,
    pub product_code: String,
}

/// An immutable transcript entry
#[derive(Debug, Clone)]
pub struct Message {
    pub id: u64,
    pub sender: Sender,
    pub content: String,
    pub files: Vec<Attachment>,
    pub timestamp: DateTime<Utc>,
    pub flags: MessageFlags,
    pub context: Option<ConversationContext>,
}

impl Message {
    pub fn is_bot(&self) -> bool {
        self.sender == Sender::Bot
    }

    pub fn is_user(&self) -> bool {
        self.sender == Sender::User
    }
}

/// Trim and collapse whitespace runs, dropping control characters.
pub fn sanitize_input(input: &str) -> String {
    input
        .split_whitespace()
        .map(|word| word.chars().filter(|c| !c.is_control()).collect::<String>())
        .filter(|word| !word.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Human readable byte count, base 1024, up to two decimals.
pub fn format_file_size(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["Bytes", "KB", "MB", "GB"];
    if bytes == 0 {
        return "0 Bytes".to_string();
    }

    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }

    let rounded = (value * 100.0).round() / 100.0;
    format!("{} {}", rounded, UNITS[unit])
}
