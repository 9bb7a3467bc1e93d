//! Subcommand implementations

use std::sync::Arc;

use anyhow::{Context, Result};
use hud_core::imaging::HttpImageSource;
use hud_core::pages::{DemoKit, DemoMenuPage, ProgressUpdate};
use hud_core::progress::{FileStore, ProgressStore};
use hud_core::search::SearchPipeline;
use hud_core::{
    ArchiveRepository, CompanionConfig, HttpArchiveClient, ReadingSession, WorkSummary,
};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::{mpsc, watch};
use tracing::{info, warn};

use crate::hud::{self, BridgeAvailability, Hud};

/// Long-lived handles shared by every command
pub struct App {
    pub config: CompanionConfig,
    pub session: ReadingSession,
    pub use_hud: bool,
    pub bridge: BridgeAvailability,
}

impl App {
    /// Build the archive client and progress store from `config`
    ///
    /// # Errors
    ///
    /// Fails if the HTTP client cannot be constructed.
    pub fn new(config: CompanionConfig, use_hud: bool) -> Result<Self> {
        let client = HttpArchiveClient::new(config.api_base_url.clone(), config.request_timeout)
            .context("Failed to create archive client")?;
        let archive = Arc::new(
            ArchiveRepository::new(Arc::new(client)).with_search_limit(config.search_limit),
        );

        let progress = match &config.data_dir {
            Some(dir) => {
                info!(dir = %dir.display(), "Reading progress stored on disk");
                ProgressStore::new(Arc::new(FileStore::new(dir)))
            }
            None => {
                warn!("No data directory available, reading progress will not persist");
                ProgressStore::in_memory()
            }
        };

        Ok(Self {
            session: ReadingSession::new(archive, Arc::new(progress)),
            config,
            use_hud,
            bridge: BridgeAvailability::default(),
        })
    }

    /// Make the simulator offer its bridge late, or not at all
    #[must_use]
    pub fn with_bridge(mut self, bridge: BridgeAvailability) -> Self {
        self.bridge = bridge;
        self
    }

    async fn hud(&self) -> Option<Hud> {
        if !self.use_hud {
            info!("HUD disabled, running host-only");
            return None;
        }
        hud::connect(self.config.handshake_timeout, self.bridge).await
    }
}

fn print_summaries(works: &[WorkSummary]) {
    if works.is_empty() {
        println!("(no results)");
        return;
    }
    for work in works {
        println!("{}\t{}\t{}", work.id, work.title, work.author);
    }
}

/// `search <query>`
pub async fn search(app: &App, query: &str) -> Result<()> {
    let works = app
        .session
        .archive()
        .search_works(query)
        .await
        .with_context(|| format!("Search for '{query}' failed"))?;
    print_summaries(&works);
    Ok(())
}

/// `reading`
pub async fn reading(app: &App) -> Result<()> {
    let entries = app.session.currently_reading().await;
    if entries.is_empty() {
        println!("(nothing in progress)");
        return Ok(());
    }

    for entry in entries {
        println!(
            "{}\t{}\t{}/{}\t{:.0}%",
            entry.summary.id,
            entry.summary.title,
            entry.progress.page_index + 1,
            entry.progress.total_pages,
            entry.progress.percent()
        );
    }
    Ok(())
}

/// `forget <id>`
pub async fn forget(app: &App, work_id: &str) -> Result<()> {
    app.session
        .remove_from_reading(work_id)
        .await
        .with_context(|| format!("Failed to forget '{work_id}'"))?;
    println!("forgot {work_id}");
    Ok(())
}

/// `read <id> [--page N]`
///
/// On the HUD the reader is driven from the simulator console; host-only it
/// prints the starting page.
pub async fn read(app: &App, work_id: &str, page: Option<i64>) -> Result<()> {
    let Some(hud) = app.hud().await else {
        return read_host_only(app, work_id, page).await;
    };

    let updates = match app.session.open_on(hud.loader(), work_id, page).await {
        Ok(updates) => updates,
        Err(e) => {
            hud.stop().await;
            return Err(e).with_context(|| format!("Failed to open '{work_id}'"));
        }
    };

    let reporter = tokio::spawn(report_progress(updates));
    let driven = hud.drive_from_stdin().await;
    hud.stop().await;
    reporter.abort();
    driven
}

async fn read_host_only(app: &App, work_id: &str, page: Option<i64>) -> Result<()> {
    let opened = app
        .session
        .open(work_id, page)
        .await
        .with_context(|| format!("Failed to open '{work_id}'"))?;

    let reader = &opened.page;
    println!(
        "{}  {}/{}",
        reader.work().title(),
        reader.current_page() + 1,
        reader.total_pages()
    );
    println!("{}", reader.page_text());
    Ok(())
}

async fn report_progress(mut updates: watch::Receiver<Option<ProgressUpdate>>) {
    while updates.changed().await.is_ok() {
        let update = updates.borrow_and_update().clone();
        if let Some(update) = update {
            eprintln!(
                "progress: {} page {}/{}",
                update.work_id,
                update.progress.page_index + 1,
                update.progress.total_pages
            );
        }
    }
}

/// `demo`
pub async fn demo(app: &App) -> Result<()> {
    let Some(hud) = app.hud().await else {
        anyhow::bail!("The demo needs the HUD; drop --no-hud");
    };

    let images = HttpImageSource::new(app.config.request_timeout)?;
    let kit = DemoKit::new(Arc::new(images));
    if !hud.loader().load(DemoMenuPage::new(kit)) {
        hud.stop().await;
        anyhow::bail!("HUD stopped before the demo menu could load");
    }

    let driven = hud.drive_from_stdin().await;
    hud.stop().await;
    driven
}

/// `live-search`: every stdin line is a query edit
pub async fn live_search(app: &App) -> Result<()> {
    let pipeline = SearchPipeline::new(app.config.search_debounce, app.config.search_throttle);
    let (edits_tx, edits_rx) = mpsc::channel(32);
    let (mut queries, pipeline_task) = pipeline.spawn(edits_rx);

    let reader = tokio::spawn(async move {
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        while let Ok(Some(line)) = lines.next_line().await {
            if edits_tx.send(line).await.is_err() {
                break;
            }
        }
    });

    while let Some(query) = queries.recv().await {
        println!("» {query}");
        match app.session.archive().search_works(&query).await {
            Ok(works) => print_summaries(&works),
            Err(e) => eprintln!("search failed: {e}"),
        }
    }

    reader.abort();
    pipeline_task.await.context("Search pipeline task failed")?;
    Ok(())
}
