//! Reading Session
//!
//! Host-side glue between the archive, the progress store and the HUD:
//!
//! - open a work at its saved position (or a requested one) as a
//!   [`ReaderPage`], handing the caller a live progress subscription
//! - list the works currently being read, most recent first
//! - forget a work's progress

use std::sync::Arc;

use futures::future::join_all;
use thiserror::Error;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::archive::{ArchiveError, ArchiveRepository, WorkSummary};
use crate::page::PageLoader;
use crate::pages::{clamp_page, ProgressUpdate, ReaderPage};
use crate::pagination::page_count;
use crate::progress::{ProgressStore, ReadingProgress, StoreError};

#[derive(Debug, Error)]
pub enum SessionError {
    #[error(transparent)]
    Archive(#[from] ArchiveError),

    #[error(transparent)]
    Store(#[from] StoreError),

    /// The page manager is gone, so the reader cannot be shown
    #[error("HUD is not running")]
    HudClosed,
}

/// A reader ready to be shown, plus its progress feed
pub struct OpenedReader {
    pub page: ReaderPage,
    pub updates: watch::Receiver<Option<ProgressUpdate>>,
}

impl std::fmt::Debug for OpenedReader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenedReader")
            .field("current_page", &self.page.current_page())
            .field("total_pages", &self.page.total_pages())
            .finish_non_exhaustive()
    }
}

/// One row of the "currently reading" list
#[derive(Clone, Debug, PartialEq)]
pub struct ReadingEntry {
    pub summary: WorkSummary,
    pub progress: ReadingProgress,
}

/// Shared handles for opening and tracking works
#[derive(Clone, Debug)]
pub struct ReadingSession {
    archive: Arc<ArchiveRepository>,
    progress: Arc<ProgressStore>,
}

impl ReadingSession {
    pub fn new(archive: Arc<ArchiveRepository>, progress: Arc<ProgressStore>) -> Self {
        Self { archive, progress }
    }

    #[must_use]
    pub fn archive(&self) -> &Arc<ArchiveRepository> {
        &self.archive
    }

    #[must_use]
    pub fn progress(&self) -> &Arc<ProgressStore> {
        &self.progress
    }

    /// Fetch `work_id` and build a reader for it
    ///
    /// `requested_page` wins over saved progress; either is clamped into the
    /// work's page range. With neither, reading starts at the first page.
    ///
    /// # Errors
    ///
    /// Any archive failure while fetching the work.
    pub async fn open(
        &self,
        work_id: &str,
        requested_page: Option<i64>,
    ) -> Result<OpenedReader, SessionError> {
        let work = self.archive.fetch_work(work_id).await?;
        let total = page_count(&work.content);

        let saved = self.progress.get(work.id()).await.map(|p| p.page_index);
        let start = match (requested_page, saved) {
            (Some(page), _) => page,
            (None, Some(page)) => i64::try_from(page).unwrap_or(i64::MAX),
            (None, None) => 0,
        };
        let start = clamp_page(start, total);

        info!(work = %work.id(), title = %work.title(), start, total, "Opening work");
        let page = ReaderPage::new(work, i64::try_from(start).unwrap_or(0), self.progress.clone());
        let updates = page.subscribe();
        Ok(OpenedReader { page, updates })
    }

    /// [`open`](Self::open) and ask the HUD to show the reader
    ///
    /// # Errors
    ///
    /// Archive failures, or [`SessionError::HudClosed`] when the manager no
    /// longer accepts pages.
    pub async fn open_on(
        &self,
        loader: &PageLoader,
        work_id: &str,
        requested_page: Option<i64>,
    ) -> Result<watch::Receiver<Option<ProgressUpdate>>, SessionError> {
        let OpenedReader { page, updates } = self.open(work_id, requested_page).await?;
        if !loader.load(page) {
            return Err(SessionError::HudClosed);
        }
        Ok(updates)
    }

    /// Works with saved progress, most recently read first
    ///
    /// Works whose summary cannot be resolved are left out.
    pub async fn currently_reading(&self) -> Vec<ReadingEntry> {
        let recent = self.progress.recent().await;
        let lookups = recent.into_iter().map(|(id, progress)| async move {
            match self.resolve_summary(&id).await {
                Ok(summary) => Some(ReadingEntry { summary, progress }),
                Err(e) => {
                    warn!(work = %id, error = %e, "Dropping unresolvable reading entry");
                    None
                }
            }
        });

        join_all(lookups).await.into_iter().flatten().collect()
    }

    /// Forget progress for `work_id`
    ///
    /// # Errors
    ///
    /// Returns an error if the progress blob cannot be rewritten.
    pub async fn remove_from_reading(&self, work_id: &str) -> Result<(), SessionError> {
        self.progress.remove(work_id).await?;
        debug!(work = %work_id, "Removed from currently reading");
        Ok(())
    }

    async fn resolve_summary(&self, work_id: &str) -> Result<WorkSummary, ArchiveError> {
        if let Some(summary) = self.archive.cached_summary(work_id) {
            return Ok(summary);
        }
        Ok(self.archive.fetch_work(work_id).await?.summary)
    }
}
