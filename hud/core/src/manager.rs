//! Page Manager
//!
//! Owns the single active [`Page`], swaps it, and routes hardware events from
//! the bridge to it.
//!
//! # Routing
//!
//! | Event | Condition | Reaction |
//! |-------|-----------|----------|
//! | list | any | `on_list_select` |
//! | text | `ScrollTop` | `on_scroll_up` |
//! | text | `ScrollBottom` | `on_scroll_down` |
//! | system | `Click` or no sub-type | `on_click` |
//! | system | `DoubleClick` | `on_double_click` |
//! | audio | any | `on_audio` |
//!
//! Anything else is ignored. Exactly one reaction fires per routed event.
//!
//! # Concurrency
//!
//! [`PageManager::run`] is the only consumer of both the hardware-event stream
//! and the page-swap queue fed by [`PageLoader`]. Each reaction and each swap
//! runs to completion before the next item is taken, so an event always
//! lands on the page that was active when its dispatch began.

use std::future::Future;
use std::sync::Arc;

use thiserror::Error;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::bridge::{
    self, BridgeError, DeviceBridge, DeviceConnectType, HubEvent, OsEventType,
};
use crate::page::{Page, PageContext, PageLoader};

/// Manager failures
#[derive(Debug, Error)]
pub enum HudError {
    /// `init` was called a second time
    #[error("Page manager already initialized")]
    AlreadyInitialized,

    /// `load` or `run` was called before `init`
    #[error("Page manager not initialized")]
    NotInitialized,

    /// The bridge failed
    #[error(transparent)]
    Bridge(#[from] BridgeError),
}

/// Which page reaction an event was routed to
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Reaction {
    ListSelect,
    ScrollUp,
    ScrollDown,
    Click,
    DoubleClick,
    Audio,
    /// No reaction (unrouted sub-type, or no active page)
    Ignored,
}

/// Reaction an event maps to, independent of any page
#[must_use]
pub fn route(event: &HubEvent) -> Reaction {
    match event {
        HubEvent::List(_) => Reaction::ListSelect,
        HubEvent::Text(text) => match text.event_type {
            Some(OsEventType::ScrollTop) => Reaction::ScrollUp,
            Some(OsEventType::ScrollBottom) => Reaction::ScrollDown,
            _ => Reaction::Ignored,
        },
        HubEvent::Sys(sys) => match sys.event_type {
            None | Some(OsEventType::Click) => Reaction::Click,
            Some(OsEventType::DoubleClick) => Reaction::DoubleClick,
            _ => Reaction::Ignored,
        },
        HubEvent::Audio(_) => Reaction::Audio,
    }
}

#[derive(Clone, Copy)]
enum Delivery {
    Create,
    Rebuild,
}

/// Active-page owner and event router
pub struct PageManager {
    bridge: Arc<dyn DeviceBridge>,
    active: Option<Box<dyn Page>>,
    loader_tx: mpsc::UnboundedSender<Box<dyn Page>>,
    loader_rx: Option<mpsc::UnboundedReceiver<Box<dyn Page>>>,
    events: Option<mpsc::Receiver<HubEvent>>,
    status_task: Option<JoinHandle<()>>,
    initialized: bool,
}

impl PageManager {
    /// Create a manager bound to `bridge`
    pub fn new(bridge: Arc<dyn DeviceBridge>) -> Self {
        let (loader_tx, loader_rx) = mpsc::unbounded_channel();
        Self {
            bridge,
            active: None,
            loader_tx,
            loader_rx: Some(loader_rx),
            events: None,
            status_task: None,
            initialized: false,
        }
    }

    /// Page-swap handle for the host
    #[must_use]
    pub fn loader(&self) -> PageLoader {
        PageLoader::new(self.loader_tx.clone())
    }

    /// Name of the active page
    #[must_use]
    pub fn active_page_name(&self) -> Option<&str> {
        self.active.as_deref().map(|page| page.name())
    }

    /// Whether `init` has completed its subscriptions
    #[must_use]
    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// Subscribe to the bridge and show the first page
    ///
    /// The subscriptions are made exactly once per manager. If delivering the
    /// first page fails, the manager stays initialized with the page active.
    ///
    /// # Errors
    ///
    /// [`HudError::AlreadyInitialized`] on a second call; bridge failures
    /// from subscribing or from creating the startup container tree.
    pub async fn init(&mut self, initial: Box<dyn Page>) -> Result<(), HudError> {
        if self.initialized {
            return Err(HudError::AlreadyInitialized);
        }

        let mut status = self.bridge.subscribe_device_status().await?;
        let events = self.bridge.subscribe_events().await?;
        self.events = Some(events);
        self.initialized = true;

        self.status_task = Some(tokio::spawn(async move {
            while let Some(status) = status.recv().await {
                info!(sn = %status.sn, connect_type = ?status.connect_type, "Device status changed");
                if status.connect_type == DeviceConnectType::Connected {
                    info!(sn = %status.sn, "Device connected");
                }
            }
            debug!("Device status stream closed");
        }));

        info!(page = initial.name(), "Page manager initialized");
        self.activate(initial, Delivery::Create).await
    }

    /// Replace the active page
    ///
    /// The outgoing page is deactivated before the incoming one is
    /// initialized and rendered.
    ///
    /// # Errors
    ///
    /// [`HudError::NotInitialized`] before `init`; bridge failures from the
    /// rebuild (the new page stays active).
    pub async fn load(&mut self, page: Box<dyn Page>) -> Result<(), HudError> {
        if !self.initialized {
            return Err(HudError::NotInitialized);
        }
        self.activate(page, Delivery::Rebuild).await
    }

    async fn activate(&mut self, mut page: Box<dyn Page>, delivery: Delivery) -> Result<(), HudError> {
        if let Some(mut previous) = self.active.take() {
            previous.deactivate().await;
            debug!(page = previous.name(), "Page deactivated");
        }

        page.init(PageContext {
            loader: self.loader(),
            bridge: Arc::clone(&self.bridge),
        });
        let description = page.render();
        let page = self.active.insert(page);

        match delivery {
            Delivery::Create => bridge::create_startup(self.bridge.as_ref(), &description).await?,
            Delivery::Rebuild => bridge::rebuild(self.bridge.as_ref(), &description).await?,
        }
        debug!(
            page = page.name(),
            containers = description.container_total_num(),
            "Page rendered"
        );

        if let Err(e) = page.after_render().await {
            warn!(page = page.name(), error = %e, "after_render failed");
        }
        Ok(())
    }

    /// Route one event to the active page
    ///
    /// Reaction failures are logged; they never affect the manager.
    pub async fn dispatch(&mut self, event: &HubEvent) -> Reaction {
        let Some(page) = self.active.as_deref_mut() else {
            debug!(?event, "No active page, event dropped");
            return Reaction::Ignored;
        };

        let reaction = route(event);
        let result = match (reaction, event) {
            (Reaction::ListSelect, HubEvent::List(e)) => page.on_list_select(e).await,
            (Reaction::ScrollUp, HubEvent::Text(e)) => page.on_scroll_up(e).await,
            (Reaction::ScrollDown, HubEvent::Text(e)) => page.on_scroll_down(e).await,
            (Reaction::Click, HubEvent::Sys(e)) => page.on_click(e).await,
            (Reaction::DoubleClick, HubEvent::Sys(e)) => page.on_double_click(e).await,
            (Reaction::Audio, HubEvent::Audio(e)) => page.on_audio(e).await,
            _ => {
                debug!(page = page.name(), ?event, "Event not routed");
                return Reaction::Ignored;
            }
        };

        if let Err(e) = result {
            warn!(page = page.name(), ?reaction, error = %e, "Page reaction failed");
        }
        reaction
    }

    /// Drive the manager until the event stream closes
    ///
    /// # Errors
    ///
    /// [`HudError::NotInitialized`] before `init` or when already running.
    pub async fn run(&mut self) -> Result<(), HudError> {
        self.run_until(std::future::pending()).await
    }

    /// Drive the manager until the event stream closes or `shutdown` resolves
    ///
    /// Swap requests queued through [`PageLoader`] are applied ahead of
    /// pending events.
    ///
    /// # Errors
    ///
    /// [`HudError::NotInitialized`] before `init` or when already running.
    pub async fn run_until<F>(&mut self, shutdown: F) -> Result<(), HudError>
    where
        F: Future<Output = ()> + Send,
    {
        let mut events = self.events.take().ok_or(HudError::NotInitialized)?;
        let Some(mut requests) = self.loader_rx.take() else {
            self.events = Some(events);
            return Err(HudError::NotInitialized);
        };
        tokio::pin!(shutdown);

        info!("Page manager running");
        loop {
            tokio::select! {
                biased;
                () = &mut shutdown => {
                    info!("Page manager shutdown requested");
                    break;
                }
                Some(page) = requests.recv() => {
                    let name = page.name().to_string();
                    if let Err(e) = self.load(page).await {
                        warn!(page = %name, error = %e, "Page load failed");
                    }
                }
                event = events.recv() => match event {
                    Some(event) => {
                        self.dispatch(&event).await;
                    }
                    None => {
                        info!("Hardware event stream closed");
                        break;
                    }
                },
            }
        }

        self.loader_rx = Some(requests);
        Ok(())
    }

    /// Apply queued swap requests without waiting for events
    ///
    /// Returns how many swaps were applied.
    pub async fn drain_requests(&mut self) -> usize {
        let Some(mut requests) = self.loader_rx.take() else {
            return 0;
        };

        let mut applied = 0;
        while let Ok(page) = requests.try_recv() {
            let name = page.name().to_string();
            if let Err(e) = self.load(page).await {
                warn!(page = %name, error = %e, "Page load failed");
            }
            applied += 1;
        }

        self.loader_rx = Some(requests);
        applied
    }

    /// Deactivate the active page, if any
    pub async fn shutdown(&mut self) {
        if let Some(mut page) = self.active.take() {
            page.deactivate().await;
            info!(page = page.name(), "Page deactivated on shutdown");
        }
    }
}

impl Drop for PageManager {
    fn drop(&mut self) {
        if let Some(task) = self.status_task.take() {
            task.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bridge::{
        AudioEventPayload, BridgeCall, HeadlessBridge, ListItemEvent, SysItemEvent,
        TextItemEvent,
    };
    use crate::render::{Frame, RenderDescription, TextContainer};
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use pretty_assertions::assert_eq;

    /// Page that records every call into a shared log
    struct Probe {
        label: &'static str,
        log: Arc<Mutex<Vec<String>>>,
        context: Option<PageContext>,
        next: Option<&'static str>,
    }

    impl Probe {
        fn new(label: &'static str, log: &Arc<Mutex<Vec<String>>>) -> Self {
            Self {
                label,
                log: Arc::clone(log),
                context: None,
                next: None,
            }
        }

        fn swapping_to(mut self, next: &'static str) -> Self {
            self.next = Some(next);
            self
        }

        fn note(&self, what: &str) {
            self.log.lock().push(format!("{}:{what}", self.label));
        }
    }

    #[async_trait]
    impl Page for Probe {
        fn name(&self) -> &str {
            self.label
        }

        fn init(&mut self, context: PageContext) {
            self.note("init");
            self.context = Some(context);
        }

        fn render(&self) -> RenderDescription {
            self.note("render");
            RenderDescription::new().with_text(TextContainer::new(
                Frame::new(1, self.label).size(10, 10).capture(true),
                self.label,
            ))
        }

        async fn after_render(&mut self) -> anyhow::Result<()> {
            self.note("after_render");
            Ok(())
        }

        async fn on_click(&mut self, _event: &SysItemEvent) -> anyhow::Result<()> {
            self.note("click");
            if let (Some(next), Some(context)) = (self.next, &self.context) {
                context.loader.load(Probe::new(next, &self.log));
            }
            Ok(())
        }

        async fn on_double_click(&mut self, _event: &SysItemEvent) -> anyhow::Result<()> {
            self.note("double_click");
            anyhow::bail!("double click always fails")
        }

        async fn on_scroll_up(&mut self, _event: &TextItemEvent) -> anyhow::Result<()> {
            self.note("scroll_up");
            Ok(())
        }

        async fn on_scroll_down(&mut self, _event: &TextItemEvent) -> anyhow::Result<()> {
            self.note("scroll_down");
            Ok(())
        }

        async fn on_list_select(&mut self, _event: &ListItemEvent) -> anyhow::Result<()> {
            self.note("list_select");
            Ok(())
        }

        async fn on_audio(&mut self, _event: &AudioEventPayload) -> anyhow::Result<()> {
            self.note("audio");
            Ok(())
        }

        async fn deactivate(&mut self) {
            self.note("deactivate");
        }
    }

    fn setup() -> (Arc<HeadlessBridge>, PageManager, Arc<Mutex<Vec<String>>>) {
        let bridge = Arc::new(HeadlessBridge::new());
        let manager = PageManager::new(bridge.clone());
        (bridge, manager, Arc::new(Mutex::new(Vec::new())))
    }

    #[tokio::test]
    async fn test_init_lifecycle_order() {
        let (bridge, mut manager, log) = setup();
        manager.init(Box::new(Probe::new("a", &log))).await.unwrap();

        assert_eq!(*log.lock(), vec!["a:init", "a:render", "a:after_render"]);
        assert!(matches!(bridge.calls()[..], [BridgeCall::CreateStartup(_)]));
        assert_eq!(manager.active_page_name(), Some("a"));
    }

    #[tokio::test]
    async fn test_double_init_rejected() {
        let (_bridge, mut manager, log) = setup();
        manager.init(Box::new(Probe::new("a", &log))).await.unwrap();

        let result = manager.init(Box::new(Probe::new("b", &log))).await;
        assert!(matches!(result, Err(HudError::AlreadyInitialized)));
        assert_eq!(manager.active_page_name(), Some("a"));
    }

    #[tokio::test]
    async fn test_load_before_init_rejected() {
        let (bridge, mut manager, log) = setup();
        let result = manager.load(Box::new(Probe::new("a", &log))).await;

        assert!(matches!(result, Err(HudError::NotInitialized)));
        assert!(log.lock().is_empty());
        assert!(bridge.calls().is_empty());
    }

    #[tokio::test]
    async fn test_load_deactivates_previous_once() {
        let (bridge, mut manager, log) = setup();
        manager.init(Box::new(Probe::new("a", &log))).await.unwrap();
        log.lock().clear();

        manager.load(Box::new(Probe::new("b", &log))).await.unwrap();

        assert_eq!(
            *log.lock(),
            vec!["a:deactivate", "b:init", "b:render", "b:after_render"]
        );
        assert!(matches!(bridge.calls()[1], BridgeCall::Rebuild(_)));
    }

    #[tokio::test]
    async fn test_each_event_fires_exactly_one_reaction() {
        let (_bridge, mut manager, log) = setup();
        manager.init(Box::new(Probe::new("p", &log))).await.unwrap();

        let cases = [
            (HubEvent::select(0), Reaction::ListSelect, "p:list_select"),
            (HubEvent::scroll_up(), Reaction::ScrollUp, "p:scroll_up"),
            (HubEvent::scroll_down(), Reaction::ScrollDown, "p:scroll_down"),
            (HubEvent::click(), Reaction::Click, "p:click"),
            (HubEvent::Sys(SysItemEvent::default()), Reaction::Click, "p:click"),
            (HubEvent::double_click(), Reaction::DoubleClick, "p:double_click"),
            (HubEvent::audio(vec![0, 0]), Reaction::Audio, "p:audio"),
        ];

        for (event, expected, entry) in cases {
            log.lock().clear();
            assert_eq!(manager.dispatch(&event).await, expected);
            assert_eq!(*log.lock(), vec![entry]);
        }
    }

    #[tokio::test]
    async fn test_unrouted_sub_types_ignored() {
        let (_bridge, mut manager, log) = setup();
        manager.init(Box::new(Probe::new("p", &log))).await.unwrap();
        log.lock().clear();

        let text_click = HubEvent::Text(TextItemEvent::of(OsEventType::Click));
        let sys_scroll = HubEvent::Sys(SysItemEvent::of(OsEventType::ScrollTop));
        let foreground = HubEvent::Sys(SysItemEvent::of(OsEventType::ForegroundEnter));

        assert_eq!(manager.dispatch(&text_click).await, Reaction::Ignored);
        assert_eq!(manager.dispatch(&sys_scroll).await, Reaction::Ignored);
        assert_eq!(manager.dispatch(&foreground).await, Reaction::Ignored);
        assert!(log.lock().is_empty());
    }

    #[tokio::test]
    async fn test_reaction_failure_does_not_poison_manager() {
        let (_bridge, mut manager, log) = setup();
        manager.init(Box::new(Probe::new("p", &log))).await.unwrap();

        assert_eq!(manager.dispatch(&HubEvent::double_click()).await, Reaction::DoubleClick);
        assert_eq!(manager.dispatch(&HubEvent::click()).await, Reaction::Click);
    }

    #[tokio::test]
    async fn test_dispatch_without_page_is_ignored() {
        let (_bridge, mut manager, _log) = setup();
        assert_eq!(manager.dispatch(&HubEvent::click()).await, Reaction::Ignored);
    }

    #[tokio::test]
    async fn test_run_applies_swap_before_next_event() {
        let (bridge, mut manager, log) = setup();
        manager
            .init(Box::new(Probe::new("a", &log).swapping_to("b")))
            .await
            .unwrap();
        log.lock().clear();

        bridge.inject(HubEvent::click()).await.unwrap();
        bridge.inject(HubEvent::scroll_down()).await.unwrap();
        bridge.close();
        manager.run().await.unwrap();

        assert_eq!(
            *log.lock(),
            vec![
                "a:click",
                "a:deactivate",
                "b:init",
                "b:render",
                "b:after_render",
                "b:scroll_down",
            ]
        );
        assert_eq!(manager.active_page_name(), Some("b"));
    }

    #[tokio::test]
    async fn test_run_before_init_rejected() {
        let (_bridge, mut manager, _log) = setup();
        assert!(matches!(manager.run().await, Err(HudError::NotInitialized)));
    }

    #[tokio::test]
    async fn test_run_until_shutdown() {
        let (_bridge, mut manager, log) = setup();
        manager.init(Box::new(Probe::new("a", &log))).await.unwrap();

        manager.run_until(async {}).await.unwrap();
        manager.shutdown().await;

        assert_eq!(log.lock().last().map(String::as_str), Some("a:deactivate"));
        assert_eq!(manager.active_page_name(), None);
    }

    #[tokio::test]
    async fn test_host_loader_and_drain() {
        let (_bridge, mut manager, log) = setup();
        manager.init(Box::new(Probe::new("a", &log))).await.unwrap();

        let loader = manager.loader();
        assert!(loader.load(Probe::new("b", &log)));
        assert_eq!(manager.drain_requests().await, 1);
        assert_eq!(manager.active_page_name(), Some("b"));
    }

    #[tokio::test]
    async fn test_init_subscribes_once() {
        let (bridge, mut manager, log) = setup();
        manager.init(Box::new(Probe::new("a", &log))).await.unwrap();
        let _ = manager.init(Box::new(Probe::new("b", &log))).await;

        // Both streams are already taken by the manager
        assert!(bridge.subscribe_events().await.is_err());
        assert!(bridge.subscribe_device_status().await.is_err());
    }
}
