// ABOUTME: Chat transport posting user messages as multipart forms
// ABOUTME: Sends the query text, attached files, and the conversation context header

use crate::client::{map_reqwest_error, HttpClient};
use async_trait::async_trait;
use floatchat_core::{
    Attachment, ChatReply, EndpointConfig, FileSource, Message, Transport, TransportError,
};
use reqwest::multipart::{Form, Part};
use std::sync::Arc;
use tracing::{debug, info};

/// Header carrying the active conversation context
pub const CONTEXT_HEADER: &str = "x-user-context";

/// File contents resolved once per send and reused across retries
struct LoadedFile {
    name: String,
    mime_type: String,
    bytes: Arc<[u8]>,
}

/// `POST {base_url}/chat` transport.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: HttpClient,
}

impl HttpTransport {
    pub fn new(config: &EndpointConfig) -> Result<Self, TransportError> {
        Ok(Self {
            client: HttpClient::new(config)?,
        })
    }

    pub fn from_client(client: HttpClient) -> Self {
        Self { client }
    }
}

async fn load_files(files: &[Attachment]) -> Result<Vec<LoadedFile>, TransportError> {
    let mut loaded = Vec::with_capacity(files.len());
    for file in files {
        let bytes: Arc<[u8]> = match &file.source {
            FileSource::Memory(bytes) => bytes.clone(),
            FileSource::Path(path) => tokio::fs::read(path).await?.into(),
        };
        loaded.push(LoadedFile {
            name: file.name.clone(),
            mime_type: file.mime_type.clone(),
            bytes,
        });
    }
    Ok(loaded)
}

fn build_form(query: &str, files: &[LoadedFile]) -> Result<Form, TransportError> {
    let mut form = Form::new().text("query", query.to_string());
    for file in files {
        let part = Part::bytes(file.bytes.to_vec())
            .file_name(file.name.clone())
            .mime_str(&file.mime_type)
            .map_err(|e| {
                TransportError::InvalidRequest(format!(
                    "attachment {} has invalid type {:?}: {}",
                    file.name, file.mime_type, e
                ))
            })?;
        form = form.part("files", part);
    }
    Ok(form)
}

/// Decode a chat reply body, rejecting blank responses.
pub fn parse_reply(body: &str) -> Result<ChatReply, TransportError> {
    let reply: ChatReply =
        serde_json::from_str(body).map_err(|e| TransportError::InvalidResponse(e.to_string()))?;
    if reply.response.trim().is_empty() {
        return Err(TransportError::EmptyResponse);
    }
    Ok(reply)
}

#[async_trait]
impl Transport for HttpTransport {
    fn name(&self) -> &'static str {
        "http"
    }

    async fn send(&self, message: &Message) -> Result<ChatReply, TransportError> {
        let files = load_files(&message.files).await?;
        let context = message.context.unwrap_or_default();

        info!(
            message_id = message.id,
            context = %context,
            files = files.len(),
            "Posting chat message"
        );

        let response = self
            .client
            .execute("chat", || {
                Ok(self
                    .client
                    .post("chat")
                    .header(CONTEXT_HEADER, context.as_str())
                    .multipart(build_form(&message.content, &files)?))
            })
            .await?;

        let body = response.text().await.map_err(map_reqwest_error)?;
        let reply = parse_reply(&body)?;
        debug!(
            message_id = message.id,
            stage = ?reply.query_stage,
            "Chat reply received"
        );
        Ok(reply)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_reply_rejects_blank() {
        assert!(matches!(
            parse_reply(r#"{"response":"  "}"#),
            Err(TransportError::EmptyResponse)
        ));
    }

    #[test]
    fn test_parse_reply_rejects_garbage() {
        assert!(matches!(
            parse_reply("<html>oops</html>"),
            Err(TransportError::InvalidResponse(_))
        ));
        assert!(matches!(
            parse_reply(r#"{"answer":"hi"}"#),
            Err(TransportError::InvalidResponse(_))
        ));
    }

    #[test]
    fn test_build_form_rejects_bad_mime() {
        let files = vec![LoadedFile {
            name: "a.bin".into(),
            mime_type: "not a mime".into(),
            bytes: Arc::from(vec![1u8, 2, 3]),
        }];
        assert!(matches!(
            build_form("hi", &files),
            Err(TransportError::InvalidRequest(_))
        ));
    }

    #[tokio::test]
    async fn test_load_files_reads_paths() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bill.txt");
        std::fs::write(&path, b"total: 42").unwrap();

        let files = vec![
            Attachment::from_path("bill.txt", 9, "text/plain", &path),
            Attachment::from_bytes("inline.txt", "text/plain", b"abc".to_vec()),
        ];
        let loaded = load_files(&files).await.unwrap();
        assert_eq!(&*loaded[0].bytes, b"total: 42");
        assert_eq!(&*loaded[1].bytes, b"abc");
    }

    #[tokio::test]
    async fn test_load_files_missing_path_is_io_error() {
        let files = vec![Attachment::from_path(
            "gone.pdf",
            1,
            "application/pdf",
            "/nonexistent/floatchat/gone.pdf",
        )];
        assert!(matches!(
            load_files(&files).await,
            Err(TransportError::Io(_))
        ));
    }
}
