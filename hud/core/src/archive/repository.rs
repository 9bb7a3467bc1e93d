//! Archive Repository
//!
//! Caching front for an [`ArchiveClient`]. Summaries are cached from every
//! search result and every fetched work; text is fetched at most once per
//! id for the lifetime of the repository.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use serde_json::Value;
use tracing::{debug, info};

use super::client::ArchiveClient;
use super::{ArchiveError, Work, WorkSummary};

/// Default number of results requested per search
pub const DEFAULT_SEARCH_LIMIT: usize = 100;

/// Normalize archive text
///
/// Line endings become LF, runs of three or more newlines collapse to one
/// blank line, and surrounding whitespace is trimmed.
#[must_use]
pub fn normalize_text(text: &str) -> String {
    let unified = text.replace("\r\n", "\n").replace('\r', "\n");

    let mut out = String::with_capacity(unified.len());
    let mut newlines = 0;
    for c in unified.chars() {
        if c == '\n' {
            newlines += 1;
            if newlines <= 2 {
                out.push(c);
            }
        } else {
            newlines = 0;
            out.push(c);
        }
    }

    out.trim().to_string()
}

/// Accept only objects with string `id`/`title`/`author` and nullable-string urls
fn parse_summary(value: &Value) -> Option<WorkSummary> {
    let item = value.as_object()?;
    let text = |key: &str| item.get(key).and_then(Value::as_str).map(str::to_string);
    let nullable = |key: &str| -> Option<Option<String>> {
        match item.get(key)? {
            Value::Null => Some(None),
            Value::String(s) => Some(Some(s.clone())),
            _ => None,
        }
    };

    Some(WorkSummary {
        id: text("id")?,
        title: text("title")?,
        title_reading: text("titleReading"),
        author: text("author")?,
        author_reading: text("authorReading"),
        text_file_url: nullable("textFileUrl")?,
        xhtml_html_file_url: nullable("xhtmlHtmlFileUrl")?,
    })
}

/// Search and text access with in-process caches
pub struct ArchiveRepository {
    client: Arc<dyn ArchiveClient>,
    search_limit: usize,
    summaries: RwLock<HashMap<String, WorkSummary>>,
    contents: RwLock<HashMap<String, String>>,
}

impl ArchiveRepository {
    /// Create a repository over `client`
    pub fn new(client: Arc<dyn ArchiveClient>) -> Self {
        Self {
            client,
            search_limit: DEFAULT_SEARCH_LIMIT,
            summaries: RwLock::new(HashMap::new()),
            contents: RwLock::new(HashMap::new()),
        }
    }

    /// Set the number of results requested per search
    #[must_use]
    pub fn with_search_limit(mut self, limit: usize) -> Self {
        self.search_limit = limit;
        self
    }

    /// Search works by free text
    ///
    /// Blank queries return nothing without a request. Works with no plain
    /// text download are left out.
    ///
    /// # Errors
    ///
    /// Transport and status failures, or an `items` field that is not an array.
    pub async fn search_works(&self, query: &str) -> Result<Vec<WorkSummary>, ArchiveError> {
        let query = query.trim();
        if query.is_empty() {
            return Ok(Vec::new());
        }

        let data = self.client.search(query, self.search_limit).await?;
        let items = data
            .get("items")
            .and_then(Value::as_array)
            .ok_or_else(|| ArchiveError::Malformed {
                endpoint: "search",
                reason: "items is not an array".to_string(),
            })?;

        let summaries: Vec<WorkSummary> = items.iter().filter_map(parse_summary).collect();
        {
            let mut cache = self.summaries.write();
            for summary in &summaries {
                cache.insert(summary.id.clone(), summary.clone());
            }
        }

        let total = summaries.len();
        let readable: Vec<WorkSummary> = summaries
            .into_iter()
            .filter(|s| s.text_file_url.as_deref().is_some_and(|url| !url.is_empty()))
            .collect();
        info!(query, total, readable = readable.len(), "Archive search");
        Ok(readable)
    }

    /// Everything the catalogue lists without a query (always empty)
    ///
    /// # Errors
    ///
    /// Never fails; kept fallible for parity with [`Self::search_works`].
    pub async fn list_works(&self) -> Result<Vec<WorkSummary>, ArchiveError> {
        self.search_works("").await
    }

    /// Work with its full text, from cache when available
    ///
    /// # Errors
    ///
    /// [`ArchiveError::SummaryCacheMiss`] when the text is cached but the
    /// summary is not; transport, status and shape failures; and
    /// [`ArchiveError::EmptyText`] when nothing is left after normalization.
    pub async fn fetch_work(&self, id: &str) -> Result<Work, ArchiveError> {
        let cached = self.contents.read().get(id).cloned();
        if let Some(content) = cached {
            let summary = self
                .summaries
                .read()
                .get(id)
                .cloned()
                .ok_or_else(|| ArchiveError::SummaryCacheMiss(id.to_string()))?;
            debug!(id, "Work served from cache");
            return Ok(Work { summary, content });
        }

        let data = self.client.text(id).await?;
        let summary = data
            .get("work")
            .and_then(parse_summary)
            .ok_or_else(|| ArchiveError::Malformed {
                endpoint: "text",
                reason: "work is missing or not a summary".to_string(),
            })?;
        let text = data
            .get("text")
            .and_then(Value::as_str)
            .ok_or_else(|| ArchiveError::Malformed {
                endpoint: "text",
                reason: "text is missing or not a string".to_string(),
            })?;

        self.summaries
            .write()
            .insert(summary.id.clone(), summary.clone());

        let content = normalize_text(text);
        if content.is_empty() {
            return Err(ArchiveError::EmptyText(summary.id));
        }

        self.contents
            .write()
            .insert(summary.id.clone(), content.clone());
        info!(id = %summary.id, title = %summary.title, chars = content.chars().count(), "Work fetched");
        Ok(Work { summary, content })
    }

    /// Cached summary for `id`
    #[must_use]
    pub fn cached_summary(&self, id: &str) -> Option<WorkSummary> {
        self.summaries.read().get(id).cloned()
    }

    /// Drop the cached summary for `id`, keeping any cached text
    pub fn evict_summary(&self, id: &str) {
        self.summaries.write().remove(id);
    }
}

impl std::fmt::Debug for ArchiveRepository {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ArchiveRepository")
            .field("search_limit", &self.search_limit)
            .field("summaries", &self.summaries.read().len())
            .field("contents", &self.contents.read().len())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    /// Client answering from fixed payloads and counting requests
    #[derive(Default)]
    pub(crate) struct StubClient {
        pub search_payload: Mutex<Value>,
        pub texts: Mutex<HashMap<String, Value>>,
        pub searches: Mutex<Vec<(String, usize)>>,
        pub text_requests: Mutex<Vec<String>>,
    }

    impl StubClient {
        pub(crate) fn with_text(self, id: &str, title: &str, text: &str) -> Self {
            self.texts.lock().insert(
                id.to_string(),
                json!({ "work": summary_json(id, title, Some("https://t/1.zip")), "text": text }),
            );
            self
        }
    }

    pub(crate) fn summary_json(id: &str, title: &str, text_url: Option<&str>) -> Value {
        json!({
            "id": id,
            "title": title,
            "author": "夏目漱石",
            "textFileUrl": text_url,
            "xhtmlHtmlFileUrl": null
        })
    }

    #[async_trait]
    impl ArchiveClient for StubClient {
        async fn search(&self, query: &str, limit: usize) -> Result<Value, ArchiveError> {
            self.searches.lock().push((query.to_string(), limit));
            Ok(self.search_payload.lock().clone())
        }

        async fn text(&self, id: &str) -> Result<Value, ArchiveError> {
            self.text_requests.lock().push(id.to_string());
            self.texts
                .lock()
                .get(id)
                .cloned()
                .ok_or(ArchiveError::Status {
                    endpoint: "text",
                    status: 404,
                    body: "not found".to_string(),
                })
        }
    }

    #[test]
    fn test_normalize_text() {
        assert_eq!(normalize_text("a\r\nb\rc"), "a\nb\nc");
        assert_eq!(normalize_text("a\n\n\n\nb"), "a\n\nb");
        assert_eq!(normalize_text("a\r\n\r\n\r\nb"), "a\n\nb");
        assert_eq!(normalize_text("a\n\nb"), "a\n\nb");
        assert_eq!(normalize_text("  \n\n本文\n\n\n  "), "本文");
    }

    #[tokio::test]
    async fn test_blank_query_makes_no_request() {
        let client = Arc::new(StubClient::default());
        let repository = ArchiveRepository::new(client.clone());

        assert!(repository.search_works("   ").await.unwrap().is_empty());
        assert!(repository.list_works().await.unwrap().is_empty());
        assert!(client.searches.lock().is_empty());
    }

    #[tokio::test]
    async fn test_search_filters_and_caches() {
        let client = Arc::new(StubClient::default());
        *client.search_payload.lock() = json!({
            "total": 4,
            "limit": 100,
            "items": [
                summary_json("1", "こころ", Some("https://t/1.zip")),
                summary_json("2", "草枕", None),
                { "id": 3, "title": "bad", "author": "x", "textFileUrl": null, "xhtmlHtmlFileUrl": null },
                { "id": "4", "title": "no urls", "author": "x" }
            ]
        });
        let repository = ArchiveRepository::new(client.clone()).with_search_limit(50);

        let results = repository.search_works("  漱石 ").await.unwrap();
        let ids: Vec<&str> = results.iter().map(|s| s.id.as_str()).collect();

        assert_eq!(ids, vec!["1"]);
        assert_eq!(*client.searches.lock(), vec![("漱石".to_string(), 50)]);
        assert!(repository.cached_summary("1").is_some());
        assert!(repository.cached_summary("2").is_some());
        assert!(repository.cached_summary("3").is_none());
        assert!(repository.cached_summary("4").is_none());
    }

    #[tokio::test]
    async fn test_search_rejects_non_array_items() {
        let client = Arc::new(StubClient::default());
        *client.search_payload.lock() = json!({ "total": 0, "items": "nope" });
        let repository = ArchiveRepository::new(client);

        let result = repository.search_works("x").await;
        assert!(matches!(result, Err(ArchiveError::Malformed { endpoint: "search", .. })));
    }

    #[tokio::test]
    async fn test_text_fetched_once_per_id() {
        let client = Arc::new(StubClient::default().with_text("1", "こころ", "上\r\n\r\n\r\n\r\n下\r\n"));
        let repository = ArchiveRepository::new(client.clone());

        let first = repository.fetch_work("1").await.unwrap();
        let second = repository.fetch_work("1").await.unwrap();

        assert_eq!(first, second);
        assert_eq!(first.content, "上\n\n下");
        assert_eq!(first.title(), "こころ");
        assert_eq!(*client.text_requests.lock(), vec!["1".to_string()]);
    }

    #[tokio::test]
    async fn test_summary_cache_miss() {
        let client = Arc::new(StubClient::default().with_text("1", "こころ", "本文"));
        let repository = ArchiveRepository::new(client);

        repository.fetch_work("1").await.unwrap();
        repository.evict_summary("1");

        let result = repository.fetch_work("1").await;
        assert!(matches!(result, Err(ArchiveError::SummaryCacheMiss(id)) if id == "1"));
    }

    #[tokio::test]
    async fn test_empty_text_is_error() {
        let client = Arc::new(StubClient::default().with_text("1", "こころ", " \r\n\r\n "));
        let repository = ArchiveRepository::new(client);

        let result = repository.fetch_work("1").await;
        assert!(matches!(result, Err(ArchiveError::EmptyText(_))));
        // The summary is still cached from the response
        assert!(repository.cached_summary("1").is_some());
    }

    #[tokio::test]
    async fn test_malformed_text_payloads() {
        let client = Arc::new(StubClient::default());
        client
            .texts
            .lock()
            .insert("a".to_string(), json!({ "work": summary_json("a", "t", None), "text": 7 }));
        client
            .texts
            .lock()
            .insert("b".to_string(), json!({ "work": { "id": "b" }, "text": "x" }));
        let repository = ArchiveRepository::new(client);

        assert!(matches!(
            repository.fetch_work("a").await,
            Err(ArchiveError::Malformed { endpoint: "text", .. })
        ));
        assert!(matches!(
            repository.fetch_work("b").await,
            Err(ArchiveError::Malformed { endpoint: "text", .. })
        ));
        assert!(matches!(
            repository.fetch_work("missing").await,
            Err(ArchiveError::Status { status: 404, .. })
        ));
    }
}
