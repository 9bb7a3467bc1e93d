//! Reader Page
//!
//! Shows one page of a work at a time. Click moves forward, double-click
//! moves back; both stop at the ends. Every move rebuilds the screen, then
//! records the position in the [`ProgressStore`] and publishes it to
//! subscribers.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::archive::Work;
use crate::bridge::{self, SysItemEvent};
use crate::page::{Page, PageContext};
use crate::pagination::paginate;
use crate::progress::{ProgressStore, ReadingProgress};
use crate::render::{
    Frame, RenderDescription, TextContainer, GLASS_SCREEN_HEIGHT, GLASS_SCREEN_WIDTH,
};

const HEADER_HEIGHT: u32 = 34;
const HEADER_ID: u32 = 1;
const BODY_ID: u32 = 2;

/// Body hint shown from the second page on
pub const HINT_BACK: &str = "*ダブルクリックで戻る";

/// Body hint shown on every page
pub const HINT_NEXT: &str = "*クリックで次のページ";

/// Position published after every persisted move
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProgressUpdate {
    pub work_id: String,
    pub progress: ReadingProgress,
}

/// Paged reader for a single work
pub struct ReaderPage {
    work: Work,
    pages: Vec<String>,
    current: usize,
    store: Arc<ProgressStore>,
    updates: watch::Sender<Option<ProgressUpdate>>,
    context: Option<PageContext>,
}

impl ReaderPage {
    /// Open `work` at `initial_page`, clamped into range
    pub fn new(work: Work, initial_page: i64, store: Arc<ProgressStore>) -> Self {
        let pages = paginate(&work.content);
        let current = clamp_page(initial_page, pages.len());
        let (updates, _) = watch::channel(None);

        Self {
            work,
            pages,
            current,
            store,
            updates,
            context: None,
        }
    }

    /// Receive every persisted position
    pub fn subscribe(&self) -> watch::Receiver<Option<ProgressUpdate>> {
        self.updates.subscribe()
    }

    /// Zero-based index of the page on screen
    #[must_use]
    pub fn current_page(&self) -> usize {
        self.current
    }

    /// Number of pages in the work
    #[must_use]
    pub fn total_pages(&self) -> usize {
        self.pages.len()
    }

    /// The work being read
    #[must_use]
    pub fn work(&self) -> &Work {
        &self.work
    }

    /// Text of the page on screen
    #[must_use]
    pub fn page_text(&self) -> &str {
        self.pages.get(self.current).map_or("", String::as_str)
    }

    async fn refresh(&self) {
        let Some(context) = &self.context else {
            debug!(work = %self.work.id(), "Reader not active, refresh skipped");
            return;
        };

        let description = self.render();
        if let Err(e) = bridge::rebuild(context.bridge.as_ref(), &description).await {
            warn!(work = %self.work.id(), error = %e, "Reader rebuild failed");
        }
        self.persist().await;
    }

    async fn persist(&self) {
        match self
            .store
            .save(self.work.id(), self.current, self.pages.len())
            .await
        {
            Ok(progress) => {
                debug!(
                    work = %self.work.id(),
                    page = progress.page_index,
                    total = progress.total_pages,
                    "Reading progress saved"
                );
                self.updates.send_replace(Some(ProgressUpdate {
                    work_id: self.work.id().to_string(),
                    progress,
                }));
            }
            Err(e) => warn!(work = %self.work.id(), error = %e, "Failed to save reading progress"),
        }
    }
}

/// Clamp a requested page index into `[0, total - 1]`
#[must_use]
pub fn clamp_page(requested: i64, total: usize) -> usize {
    let last = total.saturating_sub(1);
    usize::try_from(requested).map_or(0, |index| index.min(last))
}

#[async_trait]
impl Page for ReaderPage {
    fn name(&self) -> &str {
        "reader"
    }

    fn init(&mut self, context: PageContext) {
        info!(work = %self.work.id(), page = self.current, total = self.pages.len(), "Reader opened");
        self.context = Some(context);
    }

    fn render(&self) -> RenderDescription {
        let total = self.pages.len();
        let chunk = self.pages.get(self.current).map_or("", String::as_str);

        let mut body = Vec::with_capacity(3);
        if self.current >= 1 {
            body.push(HINT_BACK);
        }
        if !chunk.is_empty() {
            body.push(chunk);
        }
        body.push(HINT_NEXT);

        RenderDescription::new()
            .with_text(TextContainer::new(
                Frame::new(HEADER_ID, "hdr")
                    .at(12, 0)
                    .size(GLASS_SCREEN_WIDTH - 24, HEADER_HEIGHT)
                    .border(0, 5)
                    .padding(2),
                format!("{}  {}/{}", self.work.title(), self.current + 1, total),
            ))
            .with_text(TextContainer::new(
                Frame::new(BODY_ID, "body")
                    .at(12, HEADER_HEIGHT)
                    .size(GLASS_SCREEN_WIDTH - 24, GLASS_SCREEN_HEIGHT - HEADER_HEIGHT)
                    .border(0, 5)
                    .padding(2)
                    .capture(true),
                body.join("\n\n"),
            ))
    }

    async fn after_render(&mut self) -> anyhow::Result<()> {
        self.persist().await;
        Ok(())
    }

    async fn on_click(&mut self, _event: &SysItemEvent) -> anyhow::Result<()> {
        if self.current + 1 >= self.pages.len() {
            debug!(work = %self.work.id(), "Already on the last page");
            return Ok(());
        }
        self.current += 1;
        self.refresh().await;
        Ok(())
    }

    async fn on_double_click(&mut self, _event: &SysItemEvent) -> anyhow::Result<()> {
        if self.current == 0 {
            debug!(work = %self.work.id(), "Already on the first page");
            return Ok(());
        }
        self.current -= 1;
        self.refresh().await;
        Ok(())
    }
}
