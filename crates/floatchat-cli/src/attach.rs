// ABOUTME: Builds attachments from files on disk
// ABOUTME: Size comes from file metadata, MIME type is guessed from the extension

use anyhow::{bail, Context, Result};
use floatchat_core::Attachment;
use std::path::Path;

pub async fn attachment_from_path(path: &Path) -> Result<Attachment> {
    let metadata = tokio::fs::metadata(path)
        .await
        .with_context(|| format!("Cannot read {}", path.display()))?;
    if !metadata.is_file() {
        bail!("{} is not a file", path.display());
    }

    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .with_context(|| format!("{} has no file name", path.display()))?;
    let mime_type = mime_guess::from_path(path)
        .first_or_octet_stream()
        .essence_str()
        .to_string();

    Ok(Attachment::from_path(name, metadata.len(), mime_type, path))
}
