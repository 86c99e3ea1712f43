//! Interpretation of the schedule service's submission response.
//!
//! The service normally answers `{"url": "..."}`. Some deployments answer
//! with the bare link as text, and older ones stream the PDF itself; all
//! three are accepted. Anything else is a malformed response.

use std::sync::LazyLock;

use regex::Regex;

use crate::error::PipelineError;

use super::types::{ArtifactLocator, RawResponse};

/// JSON fields that may carry the artifact locator, in priority order.
const LOCATOR_FIELDS: &[&str] = &["url", "pdf_url", "file_url", "download_url"];

/// Magic bytes at the start of every PDF.
const PDF_MAGIC: &[u8] = b"%PDF-";

/// Longest body excerpt quoted back in error messages.
const EXCERPT_LEN: usize = 120;

static DOCUMENT_LINK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^https?://[^\s]+\.pdf(?:[?#][^\s]*)?$").expect("document link regex is valid")
});

/// Decide what the submission response points at.
pub fn interpret(response: &RawResponse) -> Result<ArtifactLocator, PipelineError> {
    if is_pdf(response) {
        return Ok(ArtifactLocator::Inline(response.body.clone()));
    }

    let text = String::from_utf8_lossy(&response.body);
    let text = text.trim();

    if let Ok(value) = serde_json::from_str::<serde_json::Value>(text) {
        if let Some(url) = locator_from_json(&value) {
            return Ok(ArtifactLocator::Remote(url));
        }
    }

    let candidate = strip_quotes(text);
    if looks_like_document_link(candidate) {
        return Ok(ArtifactLocator::Remote(candidate.to_string()));
    }

    Err(PipelineError::MalformedResponse {
        reason: if text.is_empty() {
            "empty body".to_string()
        } else {
            format!("no document link in {:?}", excerpt(text))
        },
    })
}

/// Whether `candidate` is a direct http(s) link to a PDF.
pub fn looks_like_document_link(candidate: &str) -> bool {
    DOCUMENT_LINK.is_match(candidate)
}

fn is_pdf(response: &RawResponse) -> bool {
    let declared = response
        .content_type
        .as_deref()
        .map(|ct| ct.to_ascii_lowercase().starts_with("application/pdf"))
        .unwrap_or(false);
    (declared && !response.body.is_empty()) || response.body.starts_with(PDF_MAGIC)
}

fn locator_from_json(value: &serde_json::Value) -> Option<String> {
    let obj = value.as_object()?;
    LOCATOR_FIELDS
        .iter()
        .filter_map(|field| obj.get(*field).and_then(|v| v.as_str()))
        .map(str::trim)
        .find(|url| url.starts_with("http://") || url.starts_with("https://"))
        .map(String::from)
}

fn strip_quotes(text: &str) -> &str {
    text.trim_matches(|c| c == '"' || c == '\'').trim()
}

fn excerpt(text: &str) -> String {
    if text.chars().count() <= EXCERPT_LEN {
        return text.to_string();
    }
    let cut: String = text.chars().take(EXCERPT_LEN).collect();
    format!("{cut}…")
}
