// ABOUTME: Synchronous conversation session state machine
// ABOUTME: Single struct holds all state; commands and completions return effects for the driver

use crate::config::{ValidationPolicy, WidgetConfig};
use crate::error::{ConfigError, TransportError};
use crate::events::{Command, Effect, Event, HostEvent, Timer};
use crate::flow::{
    DefaultOption, FlowEngine, FlowStep, DETAIL_FAILED, PRODUCTS_FAILED, SEGMENTS_FAILED,
    SEGMENTS_PROMPT,
};
use crate::stager::{AttachmentStager, RejectReason, StageReport};
use crate::store::MessageStore;
use crate::transport::ChatReply;
use crate::types::{
    sanitize_input, Attachment, ConversationContext, Message, MessageFlags, Product,
};
use crate::visibility::{Visibility, VisibilityState};
use tracing::{debug, info, warn};

/// Generic notice shown when a send fails for any reason
pub const GENERAL_ERROR: &str = "Sorry, I encountered an error processing your message.";

/// Values whose changes are published to the host
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Observed {
    revision: u64,
    typing: bool,
    unread: bool,
    attachments_enabled: bool,
}

/// Conversation session: transcript, staging, flows, visibility.
///
/// Nothing here awaits. Every input returns the effects the driver must
/// perform, and every completion comes back through `handle_event`.
#[derive(Debug)]
pub struct Session {
    config: WidgetConfig,
    store: MessageStore,
    stager: AttachmentStager,
    flow: FlowEngine,
    visibility: VisibilityState,
    input: String,
    attachments_enabled: bool,
    in_flight_send: Option<u64>,
    next_ticket: u64,
    typing_override: bool,
    last_stage: StageReport,
}

impl Session {
    pub fn new(config: WidgetConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            store: MessageStore::new(config.max_messages, config.welcome_message.clone()),
            stager: AttachmentStager::new(
                config.max_file_size,
                config.allowed_file_types.clone(),
            ),
            flow: FlowEngine::new(),
            visibility: VisibilityState::new(),
            input: String::new(),
            attachments_enabled: config.attachments_enabled,
            in_flight_send: None,
            next_ticket: 1,
            typing_override: false,
            last_stage: StageReport::default(),
            config,
        })
    }

    // ------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------

    pub fn messages(&self) -> impl Iterator<Item = &Message> {
        self.store.iter()
    }

    pub fn store(&self) -> &MessageStore {
        &self.store
    }

    pub fn input(&self) -> &str {
        &self.input
    }

    pub fn staged(&self) -> &[Attachment] {
        self.stager.staged()
    }

    pub fn last_stage_report(&self) -> &StageReport {
        &self.last_stage
    }

    pub fn context(&self) -> ConversationContext {
        self.flow.context()
    }

    pub fn pending_segments(&self) -> Option<&[String]> {
        self.flow.pending_segments()
    }

    pub fn pending_products(&self) -> Option<&[Product]> {
        self.flow.pending_products()
    }

    pub fn visibility(&self) -> Visibility {
        self.visibility.state()
    }

    pub fn has_unread(&self) -> bool {
        self.visibility.has_unread()
    }

    pub fn attachments_enabled(&self) -> bool {
        self.attachments_enabled
    }

    /// True while any request is outstanding or the host forced it on.
    pub fn is_typing(&self) -> bool {
        self.in_flight_send.is_some() || self.flow.in_flight().is_some() || self.typing_override
    }

    /// Whether the send affordance is enabled.
    pub fn can_send(&self) -> bool {
        !self.is_typing() && (!sanitize_input(&self.input).is_empty() || !self.stager.is_empty())
    }

    fn observe(&self) -> Observed {
        Observed {
            revision: self.store.revision(),
            typing: self.is_typing(),
            unread: self.visibility.has_unread(),
            attachments_enabled: self.attachments_enabled,
        }
    }

    fn publish_changes(&self, before: Observed, effects: &mut Vec<Effect>) {
        let after = self.observe();
        if after.revision != before.revision {
            effects.push(Effect::Notify(HostEvent::TranscriptChanged));
        }
        if after.typing != before.typing {
            effects.push(Effect::Notify(HostEvent::TypingChanged(after.typing)));
        }
        if after.unread != before.unread {
            effects.push(Effect::Notify(HostEvent::UnreadChanged(after.unread)));
        }
        if after.attachments_enabled != before.attachments_enabled {
            effects.push(Effect::Notify(HostEvent::AttachmentsEnabledChanged(
                after.attachments_enabled,
            )));
        }
    }

    // ------------------------------------------------------------------
    // Commands
    // ------------------------------------------------------------------

    /// Apply a UI or host command.
    pub fn handle(&mut self, command: Command) -> Vec<Effect> {
        let before = self.observe();
        let mut effects = Vec::new();

        match command {
            Command::SetInput(text) => self.input = text,
            Command::StageFiles(files) => self.stage_files(files, &mut effects),
            Command::RemoveFile(index) => {
                if let Some(removed) = self.stager.remove(index) {
                    debug!(name = %removed.name, "Removed staged attachment");
                }
            }
            Command::Send => self.send(&mut effects),
            Command::SelectOption(option) => self.select_option(option, &mut effects),
            Command::SelectSegment(label) => self.select_segment(&label, &mut effects),
            Command::SelectProduct(code) => self.select_product(&code, &mut effects),
            Command::Open => self.open(&mut effects),
            Command::Close => self.close(&mut effects),
            Command::Toggle => {
                if self.visibility.is_open() {
                    self.close(&mut effects);
                } else {
                    self.open(&mut effects);
                }
            }
            Command::Escape | Command::ClickOutside => {
                if self.visibility.is_open() {
                    self.close(&mut effects);
                }
            }
            Command::InjectBotMessage(text) => {
                self.typing_override = false;
                self.push_bot(&text, MessageFlags::default());
            }
            Command::InjectError(text) => {
                self.typing_override = false;
                let text = text.unwrap_or_else(|| GENERAL_ERROR.to_string());
                self.push_bot(&text, MessageFlags::error());
            }
            Command::SetAttachmentEnabled(enabled) => self.attachments_enabled = enabled,
            Command::Clear => {
                self.store.clear();
                self.flow.reset();
                info!("Transcript cleared");
            }
            Command::SetTyping(typing) => self.typing_override = typing,
        }

        self.publish_changes(before, &mut effects);
        effects
    }

    fn stage_files(&mut self, files: Vec<Attachment>, effects: &mut Vec<Effect>) {
        let report = if self.attachments_enabled {
            self.stager.stage(files)
        } else {
            StageReport::all_rejected(&files, RejectReason::AttachmentsDisabled)
        };

        if !report.rejected.is_empty() {
            match self.config.validation {
                ValidationPolicy::Silent => {
                    for rejection in &report.rejected {
                        debug!(reason = ?rejection.reason, "{}", rejection);
                    }
                }
                ValidationPolicy::Warn => {
                    for rejection in &report.rejected {
                        warn!(reason = ?rejection.reason, "{}", rejection);
                    }
                    effects.push(Effect::Notify(HostEvent::StagingWarnings(
                        report.rejected.clone(),
                    )));
                }
            }
        }

        self.last_stage = report;
    }

    fn send(&mut self, effects: &mut Vec<Effect>) {
        if self.is_typing() {
            debug!("Send ignored while a request is in flight");
            return;
        }
        let text = sanitize_input(&self.input);
        if text.is_empty() && self.stager.is_empty() {
            return;
        }

        let files = self.stager.drain();
        let context = self.flow.take_context();
        let message = self.store.push_user(&text, files, context);
        self.input.clear();

        let ticket = self.next_ticket;
        self.next_ticket += 1;
        self.in_flight_send = Some(ticket);

        info!(
            message_id = message.id,
            ticket,
            context = %context,
            files = message.files.len(),
            "Sending message"
        );
        effects.push(Effect::Transmit { ticket, message });
    }

    fn select_option(&mut self, option: DefaultOption, effects: &mut Vec<Effect>) {
        let generation = self.flow.begin(option);
        info!(option = option.label(), generation, "Default option selected");

        match option.prompt() {
            Some(_) => effects.push(Effect::Schedule {
                after: self.config.timings.prompt_delay(),
                timer: Timer::Prompt { generation, option },
            }),
            None => {
                self.push_bot(SEGMENTS_PROMPT, MessageFlags::segments());
                let generation = self.flow.start_request(FlowStep::Segments);
                effects.push(Effect::FetchSegments { generation });
            }
        }
    }

    fn select_segment(&mut self, label: &str, effects: &mut Vec<Effect>) {
        let Some(segment) = self.flow.take_segment(label) else {
            debug!(segment = %label, "Ignoring selection of a segment that is not pending");
            return;
        };

        self.store.push_user(&segment, Vec::new(), self.flow.context());
        let generation = self.flow.next_step(FlowStep::Products {
            segment: segment.clone(),
        });
        info!(segment = %segment, generation, "Segment selected");
        effects.push(Effect::FetchProducts {
            generation,
            segment,
        });
    }

    fn select_product(&mut self, code: &str, effects: &mut Vec<Effect>) {
        let Some(product) = self.flow.take_product(code) else {
            debug!(code = %code, "Ignoring selection of a product that is not pending");
            return;
        };

        self.store
            .push_user(&product.product_name, Vec::new(), self.flow.context());
        let generation = self.flow.next_step(FlowStep::Detail {
            code: product.product_code.clone(),
        });
        info!(code = %product.product_code, generation, "Product selected");
        effects.push(Effect::FetchDetail {
            generation,
            code: product.product_code,
        });
    }

    fn open(&mut self, effects: &mut Vec<Effect>) {
        if self.visibility.open() {
            effects.push(Effect::Schedule {
                after: self.config.timings.open_delay(),
                timer: Timer::FocusInput,
            });
        }
    }

    fn close(&mut self, effects: &mut Vec<Effect>) {
        if self.visibility.close() {
            effects.push(Effect::Schedule {
                after: self.config.timings.close_delay(),
                timer: Timer::CloseFinished,
            });
        }
    }

    fn push_bot(&mut self, content: &str, flags: MessageFlags) {
        let id = self.store.push_bot(content, flags).id;
        if self.visibility.note_bot_message() {
            debug!(message_id = id, "Bot message arrived while closed");
        }
    }

    // ------------------------------------------------------------------
    // Completions
    // ------------------------------------------------------------------

    /// Apply a collaborator completion or a fired timer.
    pub fn handle_event(&mut self, event: Event) -> Vec<Effect> {
        let before = self.observe();
        let mut effects = Vec::new();

        match event {
            Event::Reply { ticket, result } => self.handle_reply(ticket, result),
            Event::Segments { generation, result } => {
                if self.accept_flow_result(generation) {
                    match result {
                        Ok(segments) => {
                            debug!(count = segments.len(), "Segments received");
                            self.flow.set_segments(segments);
                        }
                        Err(e) => {
                            warn!(error = %e, "Segment fetch failed");
                            self.push_bot(SEGMENTS_FAILED, MessageFlags::error());
                        }
                    }
                }
            }
            Event::Products {
                generation,
                segment,
                result,
            } => {
                if self.accept_flow_result(generation) {
                    match result {
                        Ok(products) => {
                            debug!(segment = %segment, count = products.len(), "Products received");
                            self.push_bot(
                                &format!("Here are the products for {}:", segment),
                                MessageFlags::products(),
                            );
                            self.flow.set_products(products);
                        }
                        Err(e) => {
                            warn!(error = %e, segment = %segment, "Product list fetch failed");
                            self.push_bot(PRODUCTS_FAILED, MessageFlags::error());
                        }
                    }
                }
            }
            Event::Detail { generation, result } => {
                if self.accept_flow_result(generation) {
                    match result {
                        Ok(detail) if !sanitize_input(&detail).is_empty() => {
                            self.push_bot(&detail, MessageFlags::default());
                        }
                        Ok(_) => {
                            warn!("Product detail was empty");
                            self.push_bot(DETAIL_FAILED, MessageFlags::error());
                        }
                        Err(e) => {
                            warn!(error = %e, "Product detail fetch failed");
                            self.push_bot(DETAIL_FAILED, MessageFlags::error());
                        }
                    }
                }
            }
            Event::TimerFired(timer) => self.handle_timer(timer, &mut effects),
        }

        self.publish_changes(before, &mut effects);
        effects
    }

    fn accept_flow_result(&mut self, generation: u64) -> bool {
        if self.flow.finish(generation) {
            true
        } else {
            debug!(
                generation,
                current = self.flow.generation(),
                "Dropping stale flow result"
            );
            false
        }
    }

    fn handle_reply(&mut self, ticket: u64, result: Result<ChatReply, TransportError>) {
        if self.in_flight_send != Some(ticket) {
            warn!(ticket, "Reply for a send that is not in flight");
        } else {
            self.in_flight_send = None;
        }

        match result {
            Ok(reply) if !sanitize_input(&reply.response).is_empty() => {
                let enabled = reply.enables_attachments();
                if enabled != self.attachments_enabled {
                    info!(enabled, "Attachment input toggled by server");
                }
                self.attachments_enabled = enabled;
                self.push_bot(&reply.response, MessageFlags::default());
            }
            Ok(_) => {
                warn!(ticket, error = %TransportError::EmptyResponse, "Send failed");
                self.push_bot(GENERAL_ERROR, MessageFlags::error());
            }
            Err(e) => {
                warn!(ticket, error = %e, "Send failed");
                self.push_bot(GENERAL_ERROR, MessageFlags::error());
            }
        }
    }

    fn handle_timer(&mut self, timer: Timer, effects: &mut Vec<Effect>) {
        match timer {
            Timer::FocusInput => {
                if self.visibility.is_open() {
                    effects.push(Effect::Notify(HostEvent::FocusInput));
                }
            }
            Timer::CloseFinished => self.visibility.finish_close(),
            Timer::Prompt { generation, option } => {
                if !self.flow.is_current(generation) {
                    debug!(option = option.label(), "Dropping superseded prompt");
                    return;
                }
                if let Some(prompt) = option.prompt() {
                    self.push_bot(prompt, MessageFlags::default());
                }
            }
        }
    }
}
