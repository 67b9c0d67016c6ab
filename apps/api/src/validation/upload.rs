use crate::extract::FileKind;

use super::ValidationError;

/// 10 MiB.
pub const MAX_FILE_SIZE: u64 = 10 * 1024 * 1024;
pub const MAX_FILE_NAME_BYTES: usize = 255;

const FORBIDDEN_FILE_NAME_PARTS: &[&str] = &["..", "<", ">", ":", "\"", "|", "?", "*"];

const ALLOWED_MIME_TYPES: &[(&str, FileKind)] = &[
    ("text/plain", FileKind::PlainText),
    ("text/markdown", FileKind::Markdown),
    ("text/x-markdown", FileKind::Markdown),
    ("application/pdf", FileKind::Pdf),
    ("application/x-pdf", FileKind::Pdf),
];

/// Strips directory components and rejects names that could escape the blob store.
pub fn sanitize_file_name(raw: &str) -> Result<String, ValidationError> {
    let base = raw.rsplit(|c: char| c == '/' || c == '\\').next().unwrap_or_default().trim();
    if base.is_empty() {
        return Err(ValidationError::new("file_name", "file name cannot be empty"));
    }
    if base.len() > MAX_FILE_NAME_BYTES {
        return Err(ValidationError::new(
            "file_name",
            format!("file name is too long (max {MAX_FILE_NAME_BYTES} bytes)"),
        ));
    }
    if let Some(part) = FORBIDDEN_FILE_NAME_PARTS.iter().find(|p| base.contains(*p)) {
        return Err(ValidationError::new(
            "file_name",
            format!("file name contains invalid character: {part}"),
        ));
    }
    Ok(base.to_string())
}

/// `0 < size <= 10 MiB`.
pub fn validate_file_size(size: u64) -> Result<(), ValidationError> {
    if size == 0 {
        return Err(ValidationError::new("file", "file is empty"));
    }
    if size > MAX_FILE_SIZE {
        return Err(ValidationError::new(
            "file",
            format!("file size {size} exceeds maximum allowed size of {MAX_FILE_SIZE} bytes"),
        ));
    }
    Ok(())
}

/// Decides how an upload will be read. The extension wins; the declared MIME
/// type is consulted only when the extension is not recognised.
pub fn classify_upload(
    file_name: &str,
    content_type: Option<&str>,
) -> Result<FileKind, ValidationError> {
    if let Some(kind) = FileKind::from_file_name(file_name) {
        return Ok(kind);
    }
    if let Some(kind) = content_type.and_then(kind_from_mime) {
        return Ok(kind);
    }
    Err(ValidationError::new(
        "file",
        format!(
            "unsupported file type for '{file_name}' (MIME: {}); accepted: .txt, .md, .markdown, .pdf",
            content_type.unwrap_or("none")
        ),
    ))
}

fn kind_from_mime(content_type: &str) -> Option<FileKind> {
    let essence = content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();
    ALLOWED_MIME_TYPES
        .iter()
        .find(|(mime, _)| *mime == essence)
        .map(|(_, kind)| *kind)
}
