//! Converts stored letters into plain UTF-8 text.
//!
//! Text and markdown are returned verbatim. PDFs are read page by page.
//! Malformed payloads never panic through this module; they come back as
//! `ExtractError::Failed` with a readable reason.

mod pdf;

use std::path::Path;

use serde::Serialize;
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt};

#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("extraction failed: {0}")]
    Failed(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FileKind {
    PlainText,
    Markdown,
    Pdf,
}

impl FileKind {
    /// Case-insensitive extension lookup.
    pub fn from_file_name(file_name: &str) -> Option<FileKind> {
        let extension = Path::new(file_name)
            .extension()?
            .to_str()?
            .to_ascii_lowercase();
        match extension.as_str() {
            "txt" => Some(FileKind::PlainText),
            "md" | "markdown" => Some(FileKind::Markdown),
            "pdf" => Some(FileKind::Pdf),
            _ => None,
        }
    }
}

/// Reads the whole stream and returns its text.
pub async fn extract_text<R>(kind: FileKind, mut reader: R) -> Result<String, ExtractError>
where
    R: AsyncRead + Unpin + Send,
{
    let mut bytes = Vec::new();
    reader
        .read_to_end(&mut bytes)
        .await
        .map_err(|e| ExtractError::Failed(format!("could not read stored document: {e}")))?;

    match kind {
        FileKind::PlainText | FileKind::Markdown => String::from_utf8(bytes)
            .map_err(|e| ExtractError::Failed(format!("document is not valid UTF-8: {e}"))),
        FileKind::Pdf => pdf::extract_pdf_text(bytes).await,
    }
}
