//! Page-structured document text extraction.
//!
//! Documents are parsed with `lopdf`; every page is extracted in page-number order, trimmed,
//! and joined with a single newline. Pages without text are skipped, so a document with no
//! extractable pages yields an empty string rather than an error. Callers decide what an empty
//! document means.

use lopdf::Document;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors raised while reading a document from storage.
#[derive(Debug, Error)]
pub enum ExtractionError {
    /// The file is missing, unreadable, or not a parseable paged document.
    #[error("Failed to read document {path}: {reason}")]
    DocumentRead {
        /// Location of the document that failed to load.
        path: String,
        /// Diagnostic reported by the parser or the runtime.
        reason: String,
    },
}

impl ExtractionError {
    /// Human-readable failure reason without the storage location.
    pub fn reason(&self) -> &str {
        match self {
            Self::DocumentRead { reason, .. } => reason,
        }
    }
}

/// Extract the text of every page of the document at `path`.
///
/// This call is blocking; async callers should prefer [`extract_text_blocking`].
pub fn extract_text(path: &Path) -> Result<String, ExtractionError> {
    let document = Document::load(path).map_err(|error| ExtractionError::DocumentRead {
        path: path.display().to_string(),
        reason: error.to_string(),
    })?;

    let pages = document.get_pages();
    tracing::debug!(
        path = %path.display(),
        page_count = pages.len(),
        "Loaded document"
    );

    let texts = pages
        .keys()
        .map(|&page_number| match document.extract_text(&[page_number]) {
            Ok(text) => text,
            Err(error) => {
                tracing::warn!(page_number, error = %error, "Failed to extract page text; skipping");
                String::new()
            }
        });

    Ok(join_pages(texts))
}

/// Run [`extract_text`] on the blocking thread pool.
pub async fn extract_text_blocking(path: PathBuf) -> Result<String, ExtractionError> {
    let display = path.display().to_string();
    tokio::task::spawn_blocking(move || extract_text(&path))
        .await
        .map_err(|error| ExtractionError::DocumentRead {
            path: display,
            reason: format!("extraction task failed: {error}"),
        })?
}

/// Join per-page texts with single newlines, trimming each page and dropping blank ones.
pub fn join_pages<I, S>(pages: I) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut joined = String::new();
    for page in pages {
        let trimmed = page.as_ref().trim();
        if trimmed.is_empty() {
            continue;
        }
        if !joined.is_empty() {
            joined.push('\n');
        }
        joined.push_str(trimmed);
    }
    joined
}
