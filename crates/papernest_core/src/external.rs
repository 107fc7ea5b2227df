//! Contracts for collaborators that live outside the core.
//!
//! # Responsibility
//! - Describe the metadata-fetch and PDF-cache components as traits.
//! - Normalize user-pasted source URLs before they reach either component.
//!
//! # Invariants
//! - Each call is a single opaque request/response; retries are the
//!   implementor's concern.

use crate::model::paper::{Author, PaperId, PaperType};
use once_cell::sync::Lazy;
use regex::Regex;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::PathBuf;

static ARXIV_URL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^(?:https?://)?(?:www\.|export\.)?arxiv\.org/(?:abs|pdf)/([0-9]{4}\.[0-9]{4,5}(?:v[0-9]+)?)(?:\.pdf)?/?$",
    )
    .expect("valid arxiv url regex")
});

/// Errors reported by external collaborators.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchError {
    /// Transport-level failure.
    Network(String),
    /// Remote side has nothing for this URL.
    NotFound(String),
    /// Remote answered with something that cannot be used.
    InvalidResponse(String),
}

impl Display for FetchError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Network(message) => write!(f, "network failure: {message}"),
            Self::NotFound(url) => write!(f, "nothing found for {url}"),
            Self::InvalidResponse(message) => write!(f, "invalid response: {message}"),
        }
    }
}

impl Error for FetchError {}

/// Descriptive fields returned by the metadata service.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PaperMetadata {
    pub title: String,
    pub short_title: Option<String>,
    pub abstract_text: String,
    pub authors: Vec<Author>,
    pub paper_type: Option<PaperType>,
}

/// Remote metadata lookup keyed by normalized URL.
pub trait MetadataSource {
    fn fetch_metadata(&self, normalized_url: &str) -> Result<PaperMetadata, FetchError>;
}

/// Download/cache component resolving a paper's PDF to a local file.
pub trait PdfCache {
    fn resolve_local_path(
        &self,
        paper_id: PaperId,
        remote_url: &str,
    ) -> Result<PathBuf, FetchError>;
}

/// Canonical form of a user-supplied paper URL.
///
/// Returns `None` for blank input. arXiv `abs` and `pdf` links collapse to
/// `https://arxiv.org/abs/<id>`; other URLs get a scheme when missing and lose
/// fragments and trailing slashes.
pub fn normalize_source_url(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }

    let without_fragment = trimmed.split('#').next().unwrap_or(trimmed);
    if let Some(captures) = ARXIV_URL_RE.captures(without_fragment) {
        return Some(format!("https://arxiv.org/abs/{}", &captures[1]));
    }

    let with_scheme = if without_fragment.contains("://") {
        without_fragment.to_string()
    } else {
        format!("https://{without_fragment}")
    };
    Some(with_scheme.trim_end_matches('/').to_string())
}

#[cfg(test)]
mod tests {
    use super::normalize_source_url;

    #[test]
    fn arxiv_pdf_and_abs_links_share_one_form() {
        assert_eq!(
            normalize_source_url("https://arxiv.org/pdf/1706.03762v7.pdf").as_deref(),
            Some("https://arxiv.org/abs/1706.03762v7")
        );
        assert_eq!(
            normalize_source_url(" arxiv.org/abs/1706.03762 ").as_deref(),
            Some("https://arxiv.org/abs/1706.03762")
        );
    }

    #[test]
    fn plain_urls_gain_scheme_and_lose_fragment() {
        assert_eq!(
            normalize_source_url("example.org/paper/#section-2").as_deref(),
            Some("https://example.org/paper")
        );
        assert_eq!(
            normalize_source_url("http://example.org/a").as_deref(),
            Some("http://example.org/a")
        );
    }

    #[test]
    fn blank_input_is_rejected() {
        assert_eq!(normalize_source_url("   "), None);
    }
}
