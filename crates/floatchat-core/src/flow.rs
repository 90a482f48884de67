// ABOUTME: Conversation context and multi-step flow bookkeeping
// ABOUTME: Default options, pending segment/product lists, and last-write-wins generations

use crate::types::{ConversationContext, Product};
use tracing::debug;

pub const SEGMENTS_PROMPT: &str = "Please select a product segment.";
pub const SEGMENTS_FAILED: &str = "Failed to fetch product segments. Please try again later.";
pub const PRODUCTS_FAILED: &str = "Failed to fetch products. Please try again later.";
pub const DETAIL_FAILED: &str = "Failed to fetch product details. Please try again later.";

/// Quick-start choices offered alongside the welcome message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DefaultOption {
    PolicyInfo,
    ClaimInfo,
    SubmitClaim,
    ProductInfo,
}

impl DefaultOption {
    pub const ALL: [DefaultOption; 4] = [
        DefaultOption::PolicyInfo,
        DefaultOption::ClaimInfo,
        DefaultOption::SubmitClaim,
        DefaultOption::ProductInfo,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            DefaultOption::PolicyInfo => "Policy Info",
            DefaultOption::ClaimInfo => "Claim Info",
            DefaultOption::SubmitClaim => "Submit Claim",
            DefaultOption::ProductInfo => "Product Info",
        }
    }

    pub fn context(&self) -> ConversationContext {
        match self {
            DefaultOption::PolicyInfo => ConversationContext::PolicyInfo,
            DefaultOption::ClaimInfo => ConversationContext::ClaimInfo,
            DefaultOption::SubmitClaim => ConversationContext::ClaimSubmission,
            DefaultOption::ProductInfo => ConversationContext::ProductInfo,
        }
    }

    /// Delayed bot prompt; Product Info has none, it starts a fetch instead.
    pub fn prompt(&self) -> Option<&'static str> {
        match self {
            DefaultOption::PolicyInfo => Some("Please provide your Policy Number."),
            DefaultOption::ClaimInfo => Some("Please provide your Claim Number."),
            DefaultOption::SubmitClaim => {
                Some("Please provide your medical details along with your Policy Number.")
            }
            DefaultOption::ProductInfo => None,
        }
    }

    /// Case-insensitive match on label, e.g. "claim info"
    pub fn from_label(label: &str) -> Option<Self> {
        let wanted = label.trim();
        Self::ALL
            .into_iter()
            .find(|option| option.label().eq_ignore_ascii_case(wanted))
    }
}

/// Catalog request currently awaited by the Product Info branch
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FlowStep {
    Segments,
    Products { segment: String },
    Detail { code: String },
}

/// Active context plus the selection lists awaiting a user choice.
///
/// Every new branch or branch step bumps `generation`; completions carry
/// the generation they were issued under and only the current one may
/// apply its result.
#[derive(Debug, Default)]
pub struct FlowEngine {
    context: ConversationContext,
    pending_segments: Option<Vec<String>>,
    pending_products: Option<Vec<Product>>,
    generation: u64,
    in_flight: Option<(u64, FlowStep)>,
}

impl FlowEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn context(&self) -> ConversationContext {
        self.context
    }

    /// Return the active context and reset it to `Default`.
    pub fn take_context(&mut self) -> ConversationContext {
        std::mem::take(&mut self.context)
    }

    pub fn pending_segments(&self) -> Option<&[String]> {
        self.pending_segments.as_deref()
    }

    pub fn pending_products(&self) -> Option<&[Product]> {
        self.pending_products.as_deref()
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn in_flight(&self) -> Option<&FlowStep> {
        self.in_flight.as_ref().map(|(_, step)| step)
    }

    pub fn is_current(&self, generation: u64) -> bool {
        self.generation == generation
    }

    fn invalidate(&mut self) -> u64 {
        self.generation += 1;
        self.pending_segments = None;
        self.pending_products = None;
        if let Some((stale, step)) = self.in_flight.take() {
            debug!(generation = stale, step = ?step, "Superseded in-flight flow request");
        }
        self.generation
    }

    /// Start a branch from a default option, discarding stale selections.
    pub fn begin(&mut self, option: DefaultOption) -> u64 {
        self.context = option.context();
        self.invalidate()
    }

    /// Drop all flow state; used when the transcript is cleared.
    pub fn reset(&mut self) {
        self.context = ConversationContext::Default;
        self.invalidate();
    }

    /// Record a catalog request issued under the current generation.
    pub fn start_request(&mut self, step: FlowStep) -> u64 {
        self.in_flight = Some((self.generation, step));
        self.generation
    }

    /// Begin the next step of the branch: new generation, new request.
    pub fn next_step(&mut self, step: FlowStep) -> u64 {
        self.generation += 1;
        self.start_request(step)
    }

    /// Mark the request for `generation` complete. False means the result
    /// is stale and must be dropped.
    pub fn finish(&mut self, generation: u64) -> bool {
        match &self.in_flight {
            Some((current, _)) if *current == generation => {
                self.in_flight = None;
                true
            }
            _ => false,
        }
    }

    pub fn set_segments(&mut self, segments: Vec<String>) {
        self.pending_products = None;
        self.pending_segments = Some(segments);
    }

    pub fn set_products(&mut self, products: Vec<Product>) {
        self.pending_segments = None;
        self.pending_products = Some(products);
    }

    /// Consume a pending segment choice, clearing the list.
    pub fn take_segment(&mut self, label: &str) -> Option<String> {
        let found = self
            .pending_segments
            .as_ref()?
            .iter()
            .find(|segment| segment.as_str() == label)
            .cloned()?;
        self.pending_segments = None;
        Some(found)
    }

    /// Consume a pending product choice by code, clearing the list.
    pub fn take_product(&mut self, code: &str) -> Option<Product> {
        let found = self
            .pending_products
            .as_ref()?
            .iter()
            .find(|product| product.product_code == code)
            .cloned()?;
        self.pending_products = None;
        Some(found)
    }
}
