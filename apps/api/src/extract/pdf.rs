use std::panic::{catch_unwind, AssertUnwindSafe};

use lopdf::Document;
use tracing::debug;

use super::ExtractError;

/// Page-by-page extraction on the blocking pool. Pages without a content
/// stream are skipped; the remaining pages are joined with `\n`.
pub(super) async fn extract_pdf_text(bytes: Vec<u8>) -> Result<String, ExtractError> {
    tokio::task::spawn_blocking(move || {
        catch_unwind(AssertUnwindSafe(|| read_pages(&bytes))).unwrap_or_else(|_| {
            Err(ExtractError::Failed(
                "PDF parser aborted on a malformed document".to_string(),
            ))
        })
    })
    .await
    .map_err(|e| ExtractError::Failed(format!("PDF extraction task failed: {e}")))?
}

fn read_pages(bytes: &[u8]) -> Result<String, ExtractError> {
    let document = Document::load_mem(bytes)
        .map_err(|e| ExtractError::Failed(format!("could not open PDF: {e}")))?;

    let mut pages = Vec::new();
    for (page_number, page_id) in document.get_pages() {
        if document.get_page_contents(page_id).is_empty() {
            debug!(page_number, "Skipping PDF page without content stream");
            continue;
        }
        let text = document.extract_text(&[page_number]).map_err(|e| {
            ExtractError::Failed(format!("could not read text on page {page_number}: {e}"))
        })?;
        pages.push(text);
    }
    Ok(pages.join("\n"))
}
