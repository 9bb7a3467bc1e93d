//! Archive HTTP Client

use std::time::Duration;

use async_trait::async_trait;
use tracing::debug;

use super::ArchiveError;

/// Public archive API
pub const DEFAULT_API_BASE_URL: &str = "https://api.sbox.studio/api/aozora-bunko";

/// Raw access to the archive endpoints
///
/// Implementations return the decoded JSON body; shape checks happen in the
/// repository so every client is held to the same rules.
#[async_trait]
pub trait ArchiveClient: Send + Sync {
    /// `GET /search?q=<query>&limit=<limit>`
    async fn search(&self, query: &str, limit: usize) -> Result<serde_json::Value, ArchiveError>;

    /// `GET /text?id=<id>`
    async fn text(&self, id: &str) -> Result<serde_json::Value, ArchiveError>;
}

/// `reqwest`-backed archive client
#[derive(Clone, Debug)]
pub struct HttpArchiveClient {
    base_url: String,
    http_client: reqwest::Client,
}

impl HttpArchiveClient {
    /// Create a client for `base_url` with a per-request timeout
    ///
    /// # Errors
    ///
    /// Fails if the HTTP client cannot be constructed.
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, ArchiveError> {
        let http_client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            base_url: base_url.into(),
            http_client,
        })
    }

    /// Base URL requests are made against
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{path}", self.base_url.trim_end_matches('/'))
    }

    async fn get_json(
        &self,
        endpoint: &'static str,
        query: &[(&str, &str)],
    ) -> Result<serde_json::Value, ArchiveError> {
        let url = self.endpoint(endpoint);
        debug!(%url, ?query, "Archive request");

        let response = self.http_client.get(&url).query(query).send().await?;
        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(ArchiveError::Status {
                endpoint,
                status,
                body,
            });
        }

        response.json().await.map_err(|e| ArchiveError::Malformed {
            endpoint,
            reason: e.to_string(),
        })
    }
}

#[async_trait]
impl ArchiveClient for HttpArchiveClient {
    async fn search(&self, query: &str, limit: usize) -> Result<serde_json::Value, ArchiveError> {
        let limit = limit.to_string();
        self.get_json("search", &[("q", query.trim()), ("limit", &limit)])
            .await
    }

    async fn text(&self, id: &str) -> Result<serde_json::Value, ArchiveError> {
        self.get_json("text", &[("id", id)]).await
    }
}
