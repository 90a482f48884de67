// ABOUTME: Integration tests for floatchat-core.
// ABOUTME: Drives the widget end to end with mock collaborators on a paused clock.

use async_trait::async_trait;
use floatchat_core::flow::{DETAIL_FAILED, PRODUCTS_FAILED, SEGMENTS_FAILED, SEGMENTS_PROMPT};
use floatchat_core::session::GENERAL_ERROR;
use floatchat_core::{
    Attachment, Catalog, ChatReply, Command, Config, ConfigError, ConversationContext,
    DefaultOption, HostEvent, Message, Product, Transport, TransportError, ValidationPolicy,
    Widget, WidgetConfig,
};
use std::io::Write;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::NamedTempFile;
use tokio::sync::mpsc;
use tokio::time::Instant;

// ============================================================================
// Mock collaborators
// ============================================================================

/// Records every message and answers with a scripted outcome
struct ScriptedTransport {
    sent: Mutex<Vec<Message>>,
    replies: Mutex<Vec<Result<ChatReply, TransportError>>>,
    latency: Duration,
}

impl ScriptedTransport {
    fn new(replies: Vec<Result<ChatReply, TransportError>>) -> Arc<Self> {
        Self::with_latency(replies, Duration::from_millis(200))
    }

    fn with_latency(
        replies: Vec<Result<ChatReply, TransportError>>,
        latency: Duration,
    ) -> Arc<Self> {
        Arc::new(Self {
            sent: Mutex::new(Vec::new()),
            replies: Mutex::new(replies),
            latency,
        })
    }

    fn sent(&self) -> Vec<Message> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    fn name(&self) -> &'static str {
        "scripted"
    }

    async fn send(&self, message: &Message) -> Result<ChatReply, TransportError> {
        self.sent.lock().unwrap().push(message.clone());
        let reply = {
            let mut replies = self.replies.lock().unwrap();
            if replies.is_empty() {
                Ok(ChatReply::text("ok"))
            } else {
                replies.remove(0)
            }
        };
        tokio::time::sleep(self.latency).await;
        reply
    }
}

/// Segments answer slower on the first call so a restarted flow overtakes it
struct SlowFirstCatalog {
    calls: AtomicUsize,
}

#[async_trait]
impl Catalog for SlowFirstCatalog {
    async fn fetch_segments(&self) -> Result<Vec<String>, TransportError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        if call == 0 {
            tokio::time::sleep(Duration::from_millis(1000)).await;
            Ok(vec!["Old".to_string()])
        } else {
            tokio::time::sleep(Duration::from_millis(100)).await;
            Ok(vec!["New".to_string()])
        }
    }

    async fn fetch_products(&self, segment: &str) -> Result<Vec<Product>, TransportError> {
        Ok(vec![Product {
            product_name: format!("{} Basic", segment),
            product_code: format!("{}-1", segment),
        }])
    }

    async fn fetch_product_detail(&self, code: &str) -> Result<String, TransportError> {
        Ok(format!("Details for {}", code))
    }
}

/// Answers each catalog call with a fixed outcome; `None` means the call times out
struct FixedCatalog {
    segments: Result<Vec<String>, TransportError>,
    products: Option<Vec<Product>>,
    detail: Option<String>,
}

impl FixedCatalog {
    fn segments(segments: Result<Vec<String>, TransportError>) -> Arc<Self> {
        Arc::new(Self {
            segments,
            products: None,
            detail: None,
        })
    }
}

#[async_trait]
impl Catalog for FixedCatalog {
    async fn fetch_segments(&self) -> Result<Vec<String>, TransportError> {
        match &self.segments {
            Ok(segments) => Ok(segments.clone()),
            Err(_) => Err(TransportError::Status {
                code: 503,
                body: "unavailable".to_string(),
            }),
        }
    }

    async fn fetch_products(&self, _segment: &str) -> Result<Vec<Product>, TransportError> {
        self.products.clone().ok_or(TransportError::Timeout)
    }

    async fn fetch_product_detail(&self, _code: &str) -> Result<String, TransportError> {
        self.detail.clone().ok_or(TransportError::Timeout)
    }
}

fn gold() -> Product {
    Product {
        product_name: "Gold Cover".to_string(),
        product_code: "G1".to_string(),
    }
}

fn config() -> WidgetConfig {
    WidgetConfig {
        welcome_message: "Hello!".to_string(),
        ..WidgetConfig::default()
    }
}

// ============================================================================
// Scenarios
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_claim_info_prompt_after_delay() {
    let mut widget = Widget::new(config()).unwrap();
    let start = Instant::now();

    widget.apply(Command::SelectOption(DefaultOption::ClaimInfo));
    assert_eq!(widget.session().context(), ConversationContext::ClaimInfo);
    assert_eq!(widget.session().store().len(), 1);

    widget.settle().await;
    assert!(start.elapsed() >= Duration::from_millis(500));

    let messages: Vec<&Message> = widget.session().messages().collect();
    assert_eq!(messages.len(), 2);
    assert!(messages[1].is_bot());
    assert_eq!(messages[1].content, "Please provide your Claim Number.");
}

#[tokio::test(start_paused = true)]
async fn test_product_info_lists_segments() {
    let mut widget = Widget::new(config())
        .unwrap()
        .with_catalog(FixedCatalog::segments(Ok(vec![
            "A".to_string(),
            "B".to_string(),
        ])));

    widget.apply(Command::SelectOption(DefaultOption::ProductInfo));
    let prompt = widget.session().store().last().unwrap();
    assert_eq!(prompt.content, SEGMENTS_PROMPT);
    assert!(prompt.flags.show_segments);

    widget.settle().await;
    assert_eq!(
        widget.session().pending_segments().unwrap(),
        ["A".to_string(), "B".to_string()]
    );
    assert!(widget.session().store().last().unwrap().flags.show_segments);
    assert!(!widget.session().is_typing());
}

#[tokio::test(start_paused = true)]
async fn test_segment_fetch_failure() {
    let mut widget = Widget::new(config())
        .unwrap()
        .with_catalog(FixedCatalog::segments(Err(TransportError::Timeout)));

    widget.apply(Command::SelectOption(DefaultOption::ProductInfo));
    widget.settle().await;

    let last = widget.session().store().last().unwrap();
    assert_eq!(last.content, SEGMENTS_FAILED);
    assert!(last.flags.is_error);
    assert!(widget.session().pending_segments().is_none());
}

fn assert_flow_failed(widget: &Widget, notice: &str) {
    let last = widget.session().store().last().unwrap();
    assert_eq!(last.content, notice);
    assert!(last.flags.is_error);
    assert!(!widget.session().is_typing());
    assert!(widget.session().pending_segments().is_none());
    assert!(widget.session().pending_products().is_none());
}

#[tokio::test(start_paused = true)]
async fn test_product_list_fetch_failure() {
    let mut widget = Widget::new(config())
        .unwrap()
        .with_catalog(FixedCatalog::segments(Ok(vec!["Health".to_string()])));

    widget.apply(Command::SelectOption(DefaultOption::ProductInfo));
    widget.settle().await;
    widget.apply(Command::SelectSegment("Health".to_string()));
    assert!(widget.session().is_typing());
    widget.settle().await;

    assert_flow_failed(&widget, PRODUCTS_FAILED);
}

#[tokio::test(start_paused = true)]
async fn test_product_detail_fetch_failure() {
    let mut widget = Widget::new(config())
        .unwrap()
        .with_catalog(Arc::new(FixedCatalog {
            segments: Ok(vec!["Health".to_string()]),
            products: Some(vec![gold()]),
            detail: None,
        }));

    widget.apply(Command::SelectOption(DefaultOption::ProductInfo));
    widget.settle().await;
    widget.apply(Command::SelectSegment("Health".to_string()));
    widget.settle().await;
    assert_eq!(widget.session().pending_products().unwrap(), [gold()]);

    widget.apply(Command::SelectProduct("G1".to_string()));
    assert!(widget.session().is_typing());
    widget.settle().await;

    assert_flow_failed(&widget, DETAIL_FAILED);
}

#[tokio::test(start_paused = true)]
async fn test_blank_product_detail_is_a_failure() {
    let mut widget = Widget::new(config())
        .unwrap()
        .with_catalog(Arc::new(FixedCatalog {
            segments: Ok(vec!["Health".to_string()]),
            products: Some(vec![gold()]),
            detail: Some("  \n ".to_string()),
        }));

    widget.apply(Command::SelectOption(DefaultOption::ProductInfo));
    widget.settle().await;
    widget.apply(Command::SelectSegment("Health".to_string()));
    widget.settle().await;
    widget.apply(Command::SelectProduct("G1".to_string()));
    widget.settle().await;

    assert_flow_failed(&widget, DETAIL_FAILED);
}

#[tokio::test(start_paused = true)]
async fn test_full_product_flow() {
    let mut widget = Widget::new(config())
        .unwrap()
        .with_catalog(Arc::new(SlowFirstCatalog {
            calls: AtomicUsize::new(1),
        }));

    widget.apply(Command::SelectOption(DefaultOption::ProductInfo));
    widget.settle().await;
    widget.apply(Command::SelectSegment("New".to_string()));
    widget.settle().await;

    let listing = widget.session().store().last().unwrap();
    assert_eq!(listing.content, "Here are the products for New:");
    assert!(listing.flags.has_products);

    widget.apply(Command::SelectProduct("New-1".to_string()));
    widget.settle().await;

    let contents: Vec<String> = widget
        .session()
        .messages()
        .map(|m| m.content.clone())
        .collect();
    assert_eq!(
        contents,
        vec![
            "Hello!",
            SEGMENTS_PROMPT,
            "New",
            "Here are the products for New:",
            "New Basic",
            "Details for New-1",
        ]
    );
}

#[tokio::test(start_paused = true)]
async fn test_restarted_flow_wins() {
    let mut widget = Widget::new(config())
        .unwrap()
        .with_catalog(Arc::new(SlowFirstCatalog {
            calls: AtomicUsize::new(0),
        }));

    widget.apply(Command::SelectOption(DefaultOption::ProductInfo));
    widget.apply(Command::SelectOption(DefaultOption::ProductInfo));
    widget.settle().await;

    assert_eq!(
        widget.session().pending_segments().unwrap(),
        ["New".to_string()]
    );
    assert!(!widget.session().is_typing());
}

#[tokio::test(start_paused = true)]
async fn test_transport_failure_appends_generic_error() {
    let transport = ScriptedTransport::new(vec![Err(TransportError::Connection(
        "connection refused".to_string(),
    ))]);
    let mut widget = Widget::new(config()).unwrap().with_transport(transport);
    let before = widget.session().store().len();

    widget.apply(Command::SetInput("hello".to_string()));
    widget.apply(Command::Send);
    assert!(widget.session().is_typing());
    widget.settle().await;

    assert_eq!(widget.session().store().len(), before + 2);
    let last = widget.session().store().last().unwrap();
    assert_eq!(last.content, GENERAL_ERROR);
    assert!(last.flags.is_error);
    assert!(!widget.session().is_typing());
}

#[tokio::test(start_paused = true)]
async fn test_empty_send_does_not_reach_transport() {
    let transport = ScriptedTransport::new(vec![]);
    let mut widget = Widget::new(config())
        .unwrap()
        .with_transport(transport.clone());

    widget.apply(Command::SetInput(" \t ".to_string()));
    widget.apply(Command::Send);
    widget.settle().await;

    assert_eq!(widget.session().store().len(), 1);
    assert!(transport.sent().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_context_resets_after_send() {
    let transport = ScriptedTransport::new(vec![]);
    let mut widget = Widget::new(config())
        .unwrap()
        .with_transport(transport.clone());

    widget.apply(Command::SelectOption(DefaultOption::PolicyInfo));
    widget.settle().await;
    widget.apply(Command::SetInput("POL-123".to_string()));
    widget.apply(Command::Send);
    widget.settle().await;
    widget.apply(Command::SetInput("thanks".to_string()));
    widget.apply(Command::Send);
    widget.settle().await;

    let sent = transport.sent();
    assert_eq!(sent.len(), 2);
    assert_eq!(sent[0].context, Some(ConversationContext::PolicyInfo));
    assert_eq!(sent[1].context, Some(ConversationContext::Default));
}

#[tokio::test(start_paused = true)]
async fn test_documents_required_enables_attachments() {
    let transport = ScriptedTransport::new(vec![
        Ok(ChatReply::text("Please upload your bills")
            .with_stage("CLAIM_SUBMISSION", "DocumentsRequired")),
        Ok(ChatReply::text("Claim received")),
    ]);
    let (host_tx, mut host_rx) = mpsc::unbounded_channel();
    let mut widget = Widget::new(config())
        .unwrap()
        .with_transport(transport.clone())
        .with_host_events(host_tx);

    widget.apply(Command::SelectOption(DefaultOption::SubmitClaim));
    widget.settle().await;
    widget.apply(Command::SetInput("POL-9 broken arm".to_string()));
    widget.apply(Command::Send);
    widget.settle().await;
    assert!(widget.session().attachments_enabled());

    widget.apply(Command::StageFiles(vec![Attachment::from_bytes(
        "xray.png",
        "image/png",
        vec![0u8; 64],
    )]));
    assert_eq!(widget.session().staged().len(), 1);
    widget.apply(Command::Send);
    widget.settle().await;

    let sent = transport.sent();
    assert_eq!(sent[0].context, Some(ConversationContext::ClaimSubmission));
    assert_eq!(sent[1].files.len(), 1);
    assert_eq!(sent[1].content, "");
    assert!(!widget.session().attachments_enabled());

    let mut toggles = Vec::new();
    while let Ok(event) = host_rx.try_recv() {
        if let HostEvent::AttachmentsEnabledChanged(enabled) = event {
            toggles.push(enabled);
        }
    }
    assert_eq!(toggles, vec![true, false]);
}

#[tokio::test(start_paused = true)]
async fn test_late_reply_raises_unread_after_close() {
    // Lands well after the 200ms close animation
    let transport =
        ScriptedTransport::with_latency(vec![Ok(ChatReply::text("done"))], Duration::from_secs(1));
    let mut widget = Widget::new(config()).unwrap().with_transport(transport);

    widget.apply(Command::Open);
    widget.apply(Command::SetInput("question".to_string()));
    widget.apply(Command::Send);
    widget.apply(Command::Close);
    assert!(!widget.session().has_unread());

    widget.settle().await;
    assert!(widget.session().has_unread());
    assert_eq!(widget.session().store().last().unwrap().content, "done");
}

#[tokio::test(start_paused = true)]
async fn test_reply_during_close_animation_leaves_unread_clear() {
    let transport = ScriptedTransport::with_latency(
        vec![Ok(ChatReply::text("arrives mid-animation"))],
        Duration::from_millis(50),
    );
    let mut widget = Widget::new(config()).unwrap().with_transport(transport);

    widget.apply(Command::Open);
    widget.apply(Command::SetInput("question".to_string()));
    widget.apply(Command::Send);
    widget.apply(Command::Close);
    widget.settle().await;

    assert_eq!(
        widget.session().store().last().unwrap().content,
        "arrives mid-animation"
    );
    assert!(!widget.session().has_unread());
}

#[tokio::test(start_paused = true)]
async fn test_overlapping_send_refused() {
    let transport = ScriptedTransport::new(vec![]);
    let mut widget = Widget::new(config())
        .unwrap()
        .with_transport(transport.clone());

    widget.apply(Command::SetInput("first".to_string()));
    widget.apply(Command::Send);
    widget.apply(Command::SetInput("second".to_string()));
    widget.apply(Command::Send);
    widget.settle().await;

    assert_eq!(transport.sent().len(), 1);
    assert_eq!(widget.session().input(), "second");
}

#[tokio::test(start_paused = true)]
async fn test_clear_is_idempotent() {
    let transport = ScriptedTransport::new(vec![]);
    let mut widget = Widget::new(config()).unwrap().with_transport(transport);

    widget.apply(Command::SetInput("hi".to_string()));
    widget.apply(Command::Send);
    widget.settle().await;
    assert_eq!(widget.session().store().len(), 3);

    widget.apply(Command::Clear);
    let once: Vec<(u64, String)> = widget
        .session()
        .messages()
        .map(|m| (m.id, m.content.clone()))
        .collect();
    widget.apply(Command::Clear);
    let twice: Vec<(u64, String)> = widget
        .session()
        .messages()
        .map(|m| (m.id, m.content.clone()))
        .collect();

    assert_eq!(once, vec![(1, "Hello!".to_string())]);
    assert_eq!(once, twice);
}

#[tokio::test(start_paused = true)]
async fn test_transcript_cap_holds_under_traffic() {
    let transport = ScriptedTransport::new(vec![]);
    let mut widget = Widget::new(WidgetConfig {
        max_messages: 4,
        ..config()
    })
    .unwrap()
    .with_transport(transport);

    for i in 0..5 {
        widget.apply(Command::SetInput(format!("message {}", i)));
        widget.apply(Command::Send);
        widget.settle().await;
        assert!(widget.session().store().len() <= 4);
    }
    let last = widget.session().store().last().unwrap();
    assert_eq!(last.content, "ok");
    assert_eq!(last.id, 11);
}

// ============================================================================
// Config Loading Tests
// ============================================================================

#[test]
fn test_config_from_file() {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(
        file,
        r##"
[widget]
title = "Claims Desk"
primary_color = "#112233"
max_messages = 20
validation = "warn"

[widget.timings]
prompt_delay_ms = 50

[endpoint]
base_url = "http://127.0.0.1:9000/api"
retry_attempts = 1
"##
    )
    .unwrap();

    let config = Config::load_from(file.path()).unwrap();
    assert_eq!(config.widget.title, "Claims Desk");
    assert_eq!(config.widget.max_messages, 20);
    assert_eq!(config.widget.validation, ValidationPolicy::Warn);
    assert_eq!(config.widget.timings.prompt_delay(), Duration::from_millis(50));
    // Unset fields keep their defaults
    assert_eq!(config.widget.subtitle, "We're here to help!");
    assert_eq!(config.endpoint.timeout_secs, 30);
    assert_eq!(config.endpoint.retry_attempts, 1);
}

#[test]
fn test_invalid_config_file_rejected() {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(file, "[widget]\nprimary_color = \"blue\"").unwrap();

    match Config::load_from(file.path()) {
        Err(ConfigError::Invalid(msg)) => assert!(msg.contains("primary_color")),
        other => panic!("Expected Invalid error, got {:?}", other),
    }
}

#[test]
fn test_missing_config_file_is_read_error() {
    let dir = tempfile::tempdir().unwrap();
    let result = Config::load(Some(dir.path().join("absent.toml")));
    assert!(matches!(result, Err(ConfigError::Read { .. })));
}

#[test]
fn test_default_template_parses() {
    let config = Config::parse(&Config::default_toml()).unwrap();
    assert_eq!(config.widget.title, "AI Assistant");
    assert!(Widget::new(config.widget).is_ok());
}
