// ABOUTME: Bounded, ordered transcript store
// ABOUTME: FIFO eviction past the cap and a session-owned monotonic id counter

use crate::types::{sanitize_input, Attachment, ConversationContext, Message, MessageFlags, Sender};
use chrono::Utc;
use std::collections::VecDeque;
use tracing::debug;

const WELCOME_ID: u64 = 1;

/// Ordered log of transcript entries.
///
/// Never holds more than `cap` messages. Ids come from a counter owned by
/// the store, so they are unique within a session regardless of clock
/// resolution; `clear()` rewinds the counter along with the log.
#[derive(Debug)]
pub struct MessageStore {
    messages: VecDeque<Message>,
    cap: usize,
    next_id: u64,
    welcome: String,
    revision: u64,
}

impl MessageStore {
    /// Create a store seeded with the welcome message. `cap` is clamped to 1.
    pub fn new(cap: usize, welcome: impl Into<String>) -> Self {
        let mut store = Self {
            messages: VecDeque::new(),
            cap: cap.max(1),
            next_id: WELCOME_ID,
            welcome: welcome.into(),
            revision: 0,
        };
        store.seed();
        store
    }

    fn seed(&mut self) {
        self.revision += 1;
        self.messages.clear();
        self.next_id = WELCOME_ID;
        let id = self.next_id();
        self.messages.push_back(Message {
            id,
            sender: Sender::Bot,
            content: sanitize_input(&self.welcome),
            files: Vec::new(),
            timestamp: Utc::now(),
            flags: MessageFlags::welcome(),
            context: None,
        });
    }

    /// Allocate the next message id.
    pub fn next_id(&mut self) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    /// Append to the back, evicting from the front until within the cap.
    pub fn append(&mut self, message: Message) {
        self.revision += 1;
        self.messages.push_back(message);
        while self.messages.len() > self.cap {
            if let Some(evicted) = self.messages.pop_front() {
                debug!(message_id = evicted.id, "Evicted oldest message");
            }
        }
    }

    /// Build and append a user message; returns a copy of what was stored.
    pub fn push_user(
        &mut self,
        content: &str,
        files: Vec<Attachment>,
        context: ConversationContext,
    ) -> Message {
        let message = Message {
            id: self.next_id(),
            sender: Sender::User,
            content: sanitize_input(content),
            files,
            timestamp: Utc::now(),
            flags: MessageFlags::default(),
            context: Some(context),
        };
        self.append(message.clone());
        message
    }

    /// Build and append a bot message.
    pub fn push_bot(&mut self, content: &str, flags: MessageFlags) -> &Message {
        let message = Message {
            id: self.next_id(),
            sender: Sender::Bot,
            content: sanitize_input(content),
            files: Vec::new(),
            timestamp: Utc::now(),
            flags,
            context: None,
        };
        self.append(message);
        // append never leaves the store empty
        &self.messages[self.messages.len() - 1]
    }

    /// Reset to the single seeded welcome message.
    pub fn clear(&mut self) {
        self.seed();
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Bumped on every mutation, including `clear()`
    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn cap(&self) -> usize {
        self.cap
    }

    pub fn last(&self) -> Option<&Message> {
        self.messages.back()
    }

    pub fn get(&self, id: u64) -> Option<&Message> {
        self.messages.iter().find(|m| m.id == id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Message> {
        self.messages.iter()
    }
}
