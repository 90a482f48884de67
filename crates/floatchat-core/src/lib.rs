// ABOUTME: Core library for floatchat - session state machine, transcript, flows, config
// ABOUTME: Shared by the HTTP transport crate and the floatchat CLI

pub mod config;
pub mod error;
pub mod events;
pub mod flow;
pub mod session;
pub mod stager;
pub mod store;
pub mod transport;
pub mod types;
pub mod visibility;
pub mod widget;

pub use config::{Config, EndpointConfig, Position, Theme, Timings, ValidationPolicy, WidgetConfig};
pub use error::{ConfigError, TransportError};
pub use events::{Command, Effect, Event, HostEvent, Timer};
pub use flow::DefaultOption;
pub use session::Session;
pub use stager::{RejectReason, Rejection, StageReport};
pub use store::MessageStore;
pub use transport::{CannedTransport, Catalog, ChatReply, QueryStage, Transport};
pub use types::{
    format_file_size, Attachment, ConversationContext, FileSource, Message, MessageFlags, Product,
    Sender,
};
pub use visibility::Visibility;
pub use widget::Widget;
