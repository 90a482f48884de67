// ABOUTME: Inputs and outputs of the session state machine
// ABOUTME: Host commands in, collaborator completions in, effects and host notifications out

use crate::error::TransportError;
use crate::flow::DefaultOption;
use crate::stager::Rejection;
use crate::transport::ChatReply;
use crate::types::{Attachment, Message, Product};
use std::time::Duration;

/// Everything the UI or the embedding host can ask of the widget
#[derive(Debug, Clone)]
pub enum Command {
    /// Replace the text field contents
    SetInput(String),
    StageFiles(Vec<Attachment>),
    RemoveFile(usize),
    Send,
    SelectOption(DefaultOption),
    /// Pick one of the pending segment labels
    SelectSegment(String),
    /// Pick one of the pending products by code
    SelectProduct(String),
    Open,
    Close,
    Toggle,
    Escape,
    ClickOutside,
    InjectBotMessage(String),
    /// Append an error notice; `None` uses the generic text
    InjectError(Option<String>),
    SetAttachmentEnabled(bool),
    Clear,
    SetTyping(bool),
}

/// Fixed-delay timers the session schedules
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Timer {
    /// Open animation finished
    FocusInput,
    /// Close animation finished
    CloseFinished,
    /// Simulated bot latency for a default-option prompt
    Prompt {
        generation: u64,
        option: DefaultOption,
    },
}

/// Completions fed back into the session
#[derive(Debug)]
pub enum Event {
    Reply {
        ticket: u64,
        result: Result<ChatReply, TransportError>,
    },
    Segments {
        generation: u64,
        result: Result<Vec<String>, TransportError>,
    },
    Products {
        generation: u64,
        segment: String,
        result: Result<Vec<Product>, TransportError>,
    },
    Detail {
        generation: u64,
        result: Result<String, TransportError>,
    },
    TimerFired(Timer),
}

/// Notifications published to the host
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostEvent {
    TranscriptChanged,
    FocusInput,
    UnreadChanged(bool),
    TypingChanged(bool),
    AttachmentsEnabledChanged(bool),
    StagingWarnings(Vec<Rejection>),
}

/// Work the session asks its driver to perform
#[derive(Debug)]
pub enum Effect {
    Transmit { ticket: u64, message: Message },
    FetchSegments { generation: u64 },
    FetchProducts { generation: u64, segment: String },
    FetchDetail { generation: u64, code: String },
    Schedule { after: Duration, timer: Timer },
    Notify(HostEvent),
}
