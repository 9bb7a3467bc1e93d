//! Headless Bridge
//!
//! An in-process [`DeviceBridge`] with no device behind it. Every call is
//! recorded (and optionally forwarded to an observer channel), and input
//! events are injected by the host. Used by the companion's simulator mode
//! and as the test double throughout the crate.
//!
//! # Usage
//!
//! ```ignore
//! let bridge = Arc::new(HeadlessBridge::new());
//! let mut manager = PageManager::new(bridge.clone());
//! manager.init(Box::new(SplashPage::new("loading"))).await?;
//!
//! bridge.inject(HubEvent::click()).await?;
//! bridge.close();
//! manager.run().await?;
//! ```

use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::mpsc;
use tracing::debug;

use crate::render::RenderDescription;

use super::events::{DeviceStatus, HubEvent, RawHubEvent};
use super::traits::{BridgeError, DeviceBridge, ImageRawDataUpdate, TextContainerUpgrade};

/// Capacity of the injected event and status channels
const CHANNEL_CAPACITY: usize = 64;

/// One recorded bridge operation
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum BridgeCall {
    /// `create_startup_page_container`
    CreateStartup(RenderDescription),
    /// `rebuild_page_container`
    Rebuild(RenderDescription),
    /// `text_container_upgrade`
    TextUpgrade(TextContainerUpgrade),
    /// `update_image_raw_data`
    ImageUpdate(ImageRawDataUpdate),
    /// `audio_control`
    AudioControl(bool),
}

/// Recording bridge with host-injected input
pub struct HeadlessBridge {
    calls: Mutex<Vec<BridgeCall>>,
    observer: Option<mpsc::UnboundedSender<BridgeCall>>,
    event_tx: Mutex<Option<mpsc::Sender<HubEvent>>>,
    event_rx: Mutex<Option<mpsc::Receiver<HubEvent>>>,
    status_tx: Mutex<Option<mpsc::Sender<DeviceStatus>>>,
    status_rx: Mutex<Option<mpsc::Receiver<DeviceStatus>>>,
    fail_audio: AtomicBool,
    fail_rebuild: AtomicBool,
}

impl Default for HeadlessBridge {
    fn default() -> Self {
        Self::new()
    }
}

impl HeadlessBridge {
    /// Create a bridge with open event and status streams
    #[must_use]
    pub fn new() -> Self {
        let (event_tx, event_rx) = mpsc::channel(CHANNEL_CAPACITY);
        let (status_tx, status_rx) = mpsc::channel(CHANNEL_CAPACITY);

        Self {
            calls: Mutex::new(Vec::new()),
            observer: None,
            event_tx: Mutex::new(Some(event_tx)),
            event_rx: Mutex::new(Some(event_rx)),
            status_tx: Mutex::new(Some(status_tx)),
            status_rx: Mutex::new(Some(status_rx)),
            fail_audio: AtomicBool::new(false),
            fail_rebuild: AtomicBool::new(false),
        }
    }

    /// Forward every recorded call to `observer` as well
    #[must_use]
    pub fn with_observer(mut self, observer: mpsc::UnboundedSender<BridgeCall>) -> Self {
        self.observer = Some(observer);
        self
    }

    /// Deliver a hardware event to the subscriber
    ///
    /// # Errors
    ///
    /// Fails once the event stream has been closed or the subscriber dropped.
    pub async fn inject(&self, event: HubEvent) -> Result<(), BridgeError> {
        let sender = self
            .event_tx
            .lock()
            .clone()
            .ok_or_else(|| BridgeError::Unavailable("event stream closed".to_string()))?;

        sender
            .send(event)
            .await
            .map_err(|_| BridgeError::Unavailable("event subscriber dropped".to_string()))
    }

    /// Narrow a raw envelope and deliver it
    ///
    /// Returns `false` when the envelope carried no payload.
    ///
    /// # Errors
    ///
    /// Same as [`HeadlessBridge::inject`].
    pub async fn inject_raw(&self, raw: RawHubEvent) -> Result<bool, BridgeError> {
        match raw.into_event() {
            Some(event) => {
                self.inject(event).await?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Deliver a device status update
    ///
    /// # Errors
    ///
    /// Fails once the status stream has been closed or the subscriber dropped.
    pub async fn push_status(&self, status: DeviceStatus) -> Result<(), BridgeError> {
        let sender = self
            .status_tx
            .lock()
            .clone()
            .ok_or_else(|| BridgeError::Unavailable("status stream closed".to_string()))?;

        sender
            .send(status)
            .await
            .map_err(|_| BridgeError::Unavailable("status subscriber dropped".to_string()))
    }

    /// End both streams; subscribers see `None` after draining
    pub fn close(&self) {
        self.event_tx.lock().take();
        self.status_tx.lock().take();
    }

    /// Make `audio_control` fail
    pub fn set_fail_audio(&self, fail: bool) {
        self.fail_audio.store(fail, Ordering::SeqCst);
    }

    /// Make `rebuild_page_container` fail
    pub fn set_fail_rebuild(&self, fail: bool) {
        self.fail_rebuild.store(fail, Ordering::SeqCst);
    }

    /// All calls recorded so far
    pub fn calls(&self) -> Vec<BridgeCall> {
        self.calls.lock().clone()
    }

    /// Drain the recorded calls
    pub fn take_calls(&self) -> Vec<BridgeCall> {
        std::mem::take(&mut *self.calls.lock())
    }

    /// Content of every text upgrade sent to `container_id`, oldest first
    pub fn text_upgrades(&self, container_id: u32) -> Vec<String> {
        self.calls
            .lock()
            .iter()
            .filter_map(|call| match call {
                BridgeCall::TextUpgrade(upgrade) if upgrade.container_id == container_id => {
                    Some(upgrade.content.clone())
                }
                _ => None,
            })
            .collect()
    }

    fn record(&self, call: BridgeCall) {
        debug!(?call, "Headless bridge call");
        if let Some(observer) = &self.observer {
            let _ = observer.send(call.clone());
        }
        self.calls.lock().push(call);
    }
}

#[async_trait]
impl DeviceBridge for HeadlessBridge {
    async fn subscribe_device_status(&self) -> Result<mpsc::Receiver<DeviceStatus>, BridgeError> {
        self.status_rx
            .lock()
            .take()
            .ok_or(BridgeError::AlreadySubscribed("device status"))
    }

    async fn subscribe_events(&self) -> Result<mpsc::Receiver<HubEvent>, BridgeError> {
        self.event_rx
            .lock()
            .take()
            .ok_or(BridgeError::AlreadySubscribed("hub event"))
    }

    async fn create_startup_page_container(
        &self,
        description: &RenderDescription,
    ) -> Result<(), BridgeError> {
        self.record(BridgeCall::CreateStartup(description.clone()));
        Ok(())
    }

    async fn rebuild_page_container(
        &self,
        description: &RenderDescription,
    ) -> Result<(), BridgeError> {
        if self.fail_rebuild.load(Ordering::SeqCst) {
            return Err(BridgeError::Rejected {
                operation: "rebuild_page_container",
                reason: "simulated failure".to_string(),
            });
        }
        self.record(BridgeCall::Rebuild(description.clone()));
        Ok(())
    }

    async fn text_container_upgrade(
        &self,
        upgrade: TextContainerUpgrade,
    ) -> Result<(), BridgeError> {
        self.record(BridgeCall::TextUpgrade(upgrade));
        Ok(())
    }

    async fn update_image_raw_data(&self, update: ImageRawDataUpdate) -> Result<(), BridgeError> {
        self.record(BridgeCall::ImageUpdate(update));
        Ok(())
    }

    async fn audio_control(&self, enabled: bool) -> Result<(), BridgeError> {
        if self.fail_audio.load(Ordering::SeqCst) {
            return Err(BridgeError::Rejected {
                operation: "audio_control",
                reason: "simulated failure".to_string(),
            });
        }
        self.record(BridgeCall::AudioControl(enabled));
        Ok(())
    }
}
