// ABOUTME: HTTP collaborators for floatchat: chat transport and product catalog
// ABOUTME: Built on reqwest with per-request timeouts and retry of transient failures

pub mod catalog;
pub mod client;
pub mod transport;

pub use catalog::HttpCatalog;
pub use client::HttpClient;
pub use transport::{HttpTransport, CONTEXT_HEADER};
