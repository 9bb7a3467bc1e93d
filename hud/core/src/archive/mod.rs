//! Aozora Bunko Archive
//!
//! Search and full-text retrieval against the public-domain text archive.
//!
//! - [`ArchiveClient`]: raw HTTP access to the `search` and `text` endpoints
//! - [`ArchiveRepository`]: shape checks, text normalization and in-process
//!   caches on top of a client
//!
//! # API
//!
//! - `GET {base}/search?q=<query>&limit=<n>` returns `{total, limit, items}`
//! - `GET {base}/text?id=<id>` returns `{work, text}`

pub mod client;
pub mod repository;

pub use client::{ArchiveClient, HttpArchiveClient, DEFAULT_API_BASE_URL};
pub use repository::{normalize_text, ArchiveRepository};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Archive failures
#[derive(Debug, Error)]
pub enum ArchiveError {
    /// Transport-level failure
    #[error("Archive request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Non-success HTTP status
    #[error("{endpoint} API returned {status}: {body}")]
    Status {
        /// `search` or `text`
        endpoint: &'static str,
        /// HTTP status code
        status: u16,
        /// Response body, as far as it could be read
        body: String,
    },

    /// Response did not have the expected shape
    #[error("Malformed {endpoint} response: {reason}")]
    Malformed {
        /// `search` or `text`
        endpoint: &'static str,
        /// What was wrong
        reason: String,
    },

    /// Text was empty after normalization
    #[error("Work {0} has no extractable text")]
    EmptyText(String),

    /// Content is cached but its summary is not
    #[error("Summary cache miss for work {0}")]
    SummaryCacheMiss(String),
}

/// Catalogue entry for one work
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkSummary {
    /// Opaque archive id
    pub id: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title_reading: Option<String>,
    pub author: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author_reading: Option<String>,
    /// Plain-text download; works without one cannot be read
    pub text_file_url: Option<String>,
    pub xhtml_html_file_url: Option<String>,
}

/// A work with its full, normalized text
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Work {
    pub summary: WorkSummary,
    pub content: String,
}

impl Work {
    /// Archive id
    #[must_use]
    pub fn id(&self) -> &str {
        &self.summary.id
    }

    /// Title
    #[must_use]
    pub fn title(&self) -> &str {
        &self.summary.title
    }
}
