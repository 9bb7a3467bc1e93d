//! HUD Bring-Up
//!
//! Acquires the device bridge under a deadline, starts the page manager on
//! a background task and hands back a [`Hud`] the commands drive. When the
//! bridge cannot be acquired, or the first screen cannot be shown, the
//! companion carries on host-only.
//!
//! The simulator can be told to answer late, or never, so the host-only
//! fallback can be exercised without a device.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use hud_core::bridge::{BridgeCall, HeadlessBridge, HubEvent, RawHubEvent};
use hud_core::pages::SplashPage;
use hud_core::{with_timeout, PageLoader, PageManager};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::simulator::{self, Input};

/// Banner shown while the first real page is prepared
const LOADING_BANNER: &str = "loading";

/// How long `stop` waits for queued HUD output to be printed
const PRINTER_FLUSH_TIMEOUT: Duration = Duration::from_secs(1);

/// When the simulator offers its bridge
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BridgeAvailability {
    /// Bridge is ready at once
    #[default]
    Immediate,
    /// Bridge shows up after the given latency
    Delayed(Duration),
    /// Bridge never shows up
    Withheld,
}

impl BridgeAvailability {
    /// Map the `--bridge-delay-ms` / `--withhold-bridge` flags
    #[must_use]
    pub fn from_flags(delay_ms: Option<u64>, withheld: bool) -> Self {
        match (withheld, delay_ms) {
            (true, _) => Self::Withheld,
            (false, Some(ms)) if ms > 0 => Self::Delayed(Duration::from_millis(ms)),
            (false, _) => Self::Immediate,
        }
    }
}

/// A running page manager and the simulator bridge it drives
pub struct Hud {
    bridge: Arc<HeadlessBridge>,
    loader: PageLoader,
    shutdown: Option<oneshot::Sender<()>>,
    manager_task: JoinHandle<()>,
    printer_task: JoinHandle<()>,
}

/// Acquire the bridge and start the HUD, or `None` for host-only mode
pub async fn connect(
    handshake_timeout: Duration,
    availability: BridgeAvailability,
) -> Option<Hud> {
    let (observer, calls) = mpsc::unbounded_channel();

    let acquire = acquire_bridge(observer, availability);
    let bridge = match with_timeout(acquire, handshake_timeout, "waitForBridge").await {
        Ok(bridge) => bridge,
        Err(e) => {
            warn!(error = %e, "Bridge unavailable, continuing host-only");
            return None;
        }
    };

    let printer_task = tokio::spawn(print_calls(calls));
    match start(bridge).await {
        Ok((bridge, loader, shutdown, manager_task)) => {
            info!("HUD ready");
            Some(Hud {
                bridge,
                loader,
                shutdown: Some(shutdown),
                manager_task,
                printer_task,
            })
        }
        Err(e) => {
            warn!(error = %e, "HUD setup failed, continuing host-only");
            printer_task.abort();
            None
        }
    }
}

async fn acquire_bridge(
    observer: mpsc::UnboundedSender<BridgeCall>,
    availability: BridgeAvailability,
) -> Arc<HeadlessBridge> {
    match availability {
        BridgeAvailability::Immediate => {}
        BridgeAvailability::Delayed(latency) => {
            debug!(latency_ms = latency.as_millis() as u64, "Simulating bridge latency");
            tokio::time::sleep_until(Instant::now() + latency).await;
        }
        BridgeAvailability::Withheld => {
            debug!("Simulator withholding the bridge");
            std::future::pending::<()>().await;
        }
    }
    debug!("Using simulator bridge");
    Arc::new(HeadlessBridge::new().with_observer(observer))
}

async fn start(
    bridge: Arc<HeadlessBridge>,
) -> Result<(
    Arc<HeadlessBridge>,
    PageLoader,
    oneshot::Sender<()>,
    JoinHandle<()>,
)> {
    let mut manager = PageManager::new(bridge.clone());
    manager
        .init(Box::new(SplashPage::new(LOADING_BANNER)))
        .await
        .context("Failed to show the startup page")?;
    let loader = manager.loader();

    let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
    let manager_task = tokio::spawn(async move {
        let shutdown = async {
            let _ = shutdown_rx.await;
        };
        if let Err(e) = manager.run_until(shutdown).await {
            warn!(error = %e, "Page manager stopped with error");
        }
        manager.shutdown().await;
    });

    Ok((bridge, loader, shutdown_tx, manager_task))
}

async fn print_calls(mut calls: mpsc::UnboundedReceiver<BridgeCall>) {
    while let Some(call) = calls.recv().await {
        println!("{}", simulator::describe(&call));
    }
}

impl Hud {
    /// Page-swap handle for host-side code
    #[must_use]
    pub fn loader(&self) -> &PageLoader {
        &self.loader
    }

    /// Feed stdin commands to the bridge until `quit` or end of input
    ///
    /// # Errors
    ///
    /// Fails if stdin cannot be read.
    pub async fn drive_from_stdin(&self) -> Result<()> {
        eprintln!("{}", simulator::HELP);
        let mut lines = BufReader::new(tokio::io::stdin()).lines();

        while let Some(line) = lines.next_line().await.context("Failed to read stdin")? {
            match simulator::parse_input(&line) {
                Ok(Input::Event(event)) => self.inject(event).await,
                Ok(Input::Raw(raw)) => self.inject_raw(raw).await,
                Ok(Input::Help) => eprintln!("{}", simulator::HELP),
                Ok(Input::Quit) => break,
                Ok(Input::Blank) => {}
                Err(e) => eprintln!("{e}"),
            }
        }
        Ok(())
    }

    async fn inject(&self, event: HubEvent) {
        if let Err(e) = self.bridge.inject(event).await {
            warn!(error = %e, "Event not delivered");
        }
    }

    async fn inject_raw(&self, raw: RawHubEvent) {
        match self.bridge.inject_raw(raw).await {
            Ok(true) => {}
            Ok(false) => eprintln!("envelope carried no event"),
            Err(e) => warn!(error = %e, "Event not delivered"),
        }
    }

    /// Stop the manager, deactivate the active page and flush output
    pub async fn stop(mut self) {
        if let Some(shutdown) = self.shutdown.take() {
            let _ = shutdown.send(());
        }
        if let Err(e) = (&mut self.manager_task).await {
            warn!(error = %e, "Page manager task failed");
        }

        // The printer ends once the bridge (and its observer) is gone
        drop(self.bridge);
        match tokio::time::timeout(PRINTER_FLUSH_TIMEOUT, self.printer_task).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => debug!(error = %e, "Printer task ended abnormally"),
            Err(_) => debug!("Printer still attached to the bridge, leaving it"),
        }
        info!("HUD stopped");
    }
}
