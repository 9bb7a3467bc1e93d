//! Page Contract
//!
//! A [`Page`] is one HUD screen together with the state behind it. The
//! [`PageManager`](crate::manager::PageManager) owns exactly one active page,
//! asks it for a [`RenderDescription`] and forwards hardware input to it.
//!
//! # Lifecycle
//!
//! ```text
//! init(context) -> render() -> [bridge create/rebuild] -> after_render()
//!       ... input reactions ...
//! deactivate()   (when another page replaces it)
//! ```
//!
//! Input reactions default to a debug log, so a page only implements the
//! gestures it cares about. The engine never re-renders after a reaction; a
//! page that changes its screen pushes the update itself through the bridge
//! handle in its [`PageContext`].

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::mpsc;
use tracing::debug;

use crate::bridge::{
    AudioEventPayload, BridgeError, DeviceBridge, ListItemEvent, SysItemEvent, TextItemEvent,
};
use crate::render::RenderDescription;

/// Page-swap request channel, as seen by pages and the host
///
/// Requests are queued and applied by the manager's run loop, one at a time,
/// between event dispatches.
#[derive(Clone, Debug)]
pub struct PageLoader {
    tx: mpsc::UnboundedSender<Box<dyn Page>>,
}

impl PageLoader {
    pub(crate) fn new(tx: mpsc::UnboundedSender<Box<dyn Page>>) -> Self {
        Self { tx }
    }

    /// Ask the manager to make `page` the active page
    ///
    /// Returns `false` when the manager is gone.
    pub fn load(&self, page: impl Page + 'static) -> bool {
        self.load_boxed(Box::new(page))
    }

    /// Same as [`PageLoader::load`] for an already boxed page
    pub fn load_boxed(&self, page: Box<dyn Page>) -> bool {
        let name = page.name().to_string();
        if self.tx.send(page).is_err() {
            debug!(page = %name, "Page manager gone, swap request dropped");
            return false;
        }
        true
    }
}

/// Handles given to a page when it becomes active
#[derive(Clone)]
pub struct PageContext {
    /// Page-swap capability
    pub loader: PageLoader,
    /// Bridge for incremental updates
    pub bridge: Arc<dyn DeviceBridge>,
}

impl std::fmt::Debug for PageContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PageContext")
            .field("loader", &self.loader)
            .finish_non_exhaustive()
    }
}

/// A HUD screen with input reactions
#[async_trait]
pub trait Page: Send + Sync {
    /// Label used in logs
    fn name(&self) -> &str;

    /// Receive the manager and bridge handles; called once on activation,
    /// always before the first `render`
    fn init(&mut self, context: PageContext);

    /// Describe the screen for the current state
    ///
    /// Must not change page state; calling it twice yields equal descriptions.
    fn render(&self) -> RenderDescription;

    /// Runs once after each manager-driven render has been delivered
    async fn after_render(&mut self) -> anyhow::Result<()> {
        Ok(())
    }

    /// Single tap
    async fn on_click(&mut self, _event: &SysItemEvent) -> anyhow::Result<()> {
        debug!(page = self.name(), "Click ignored");
        Ok(())
    }

    /// Double tap
    async fn on_double_click(&mut self, _event: &SysItemEvent) -> anyhow::Result<()> {
        debug!(page = self.name(), "Double click ignored");
        Ok(())
    }

    /// Scrolled past the top of the capturing container
    async fn on_scroll_up(&mut self, _event: &TextItemEvent) -> anyhow::Result<()> {
        debug!(page = self.name(), "Scroll up ignored");
        Ok(())
    }

    /// Scrolled past the bottom of the capturing container
    async fn on_scroll_down(&mut self, _event: &TextItemEvent) -> anyhow::Result<()> {
        debug!(page = self.name(), "Scroll down ignored");
        Ok(())
    }

    /// List item chosen
    async fn on_list_select(&mut self, _event: &ListItemEvent) -> anyhow::Result<()> {
        debug!(page = self.name(), "List select ignored");
        Ok(())
    }

    /// Microphone frame
    async fn on_audio(&mut self, event: &AudioEventPayload) -> anyhow::Result<()> {
        debug!(page = self.name(), bytes = event.audio_pcm.len(), "Audio ignored");
        Ok(())
    }

    /// Teardown before another page takes over
    ///
    /// Pages with background work stop it here.
    async fn deactivate(&mut self) {}
}

impl std::fmt::Debug for dyn Page {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Page").field("name", &self.name()).finish()
    }
}

/// Bridge handle of an initialized page
///
/// # Errors
///
/// Returns [`BridgeError::Unavailable`] when the page has not been activated.
pub fn bridge_of(context: Option<&PageContext>) -> Result<Arc<dyn DeviceBridge>, BridgeError> {
    context
        .map(|c| Arc::clone(&c.bridge))
        .ok_or_else(|| BridgeError::Unavailable("page not initialized".to_string()))
}
