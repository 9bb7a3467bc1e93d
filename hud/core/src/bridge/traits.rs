//! Device Bridge Traits
//!
//! The host-side surface of the glasses. The real transport (Bluetooth, host
//! app IPC) lives outside this crate; anything that can deliver the calls
//! below can drive the HUD engine.
//!
//! # Design Philosophy
//!
//! The bridge is deliberately thin:
//! - Two subscriptions (device status, hardware events), each handed out once
//! - Whole-screen operations (create the startup tree, rebuild it)
//! - Incremental operations (patch one text container, push image bytes)
//! - Microphone control
//!
//! Everything stateful about pages stays in the engine.

use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;
use tokio::sync::mpsc;

use crate::render::{RenderDescription, RenderError};

use super::events::{DeviceStatus, HubEvent};

/// Bridge failures
#[derive(Debug, Error)]
pub enum BridgeError {
    /// The bridge cannot be reached
    #[error("Bridge unavailable: {0}")]
    Unavailable(String),

    /// The device refused an operation
    #[error("Bridge rejected {operation}: {reason}")]
    Rejected {
        /// Operation name
        operation: &'static str,
        /// Reason reported by the device
        reason: String,
    },

    /// A subscription was requested twice
    #[error("{0} stream already subscribed")]
    AlreadySubscribed(&'static str),

    /// The description failed validation and was never sent
    #[error("Invalid render description: {0}")]
    InvalidRender(#[from] RenderError),
}

/// Replace the content of one text container in place
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct TextContainerUpgrade {
    /// Target container
    #[serde(rename = "containerID")]
    pub container_id: u32,
    /// New content
    pub content: String,
}

impl TextContainerUpgrade {
    /// Create an upgrade for `container_id`
    pub fn new(container_id: u32, content: impl Into<String>) -> Self {
        Self {
            container_id,
            content: content.into(),
        }
    }
}

/// Encoded image bytes for an image container
#[derive(Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageRawDataUpdate {
    /// Target container
    #[serde(rename = "containerID")]
    pub container_id: u32,
    /// Target container name
    pub container_name: String,
    /// PNG bytes sized to the container
    pub image_data: Vec<u8>,
}

impl std::fmt::Debug for ImageRawDataUpdate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ImageRawDataUpdate")
            .field("container_id", &self.container_id)
            .field("container_name", &self.container_name)
            .field("image_data", &format_args!("{} bytes", self.image_data.len()))
            .finish()
    }
}

/// Device bridge
///
/// Implement this trait to connect the engine to a concrete device transport.
#[async_trait]
pub trait DeviceBridge: Send + Sync {
    /// Stream of device status changes
    ///
    /// May only be called once per bridge.
    async fn subscribe_device_status(&self) -> Result<mpsc::Receiver<DeviceStatus>, BridgeError>;

    /// Stream of hardware input events, already narrowed to one payload each
    ///
    /// May only be called once per bridge.
    async fn subscribe_events(&self) -> Result<mpsc::Receiver<HubEvent>, BridgeError>;

    /// Build the first container tree of the session
    async fn create_startup_page_container(
        &self,
        description: &RenderDescription,
    ) -> Result<(), BridgeError>;

    /// Replace the whole container tree
    async fn rebuild_page_container(
        &self,
        description: &RenderDescription,
    ) -> Result<(), BridgeError>;

    /// Patch the content of one text container
    async fn text_container_upgrade(&self, upgrade: TextContainerUpgrade)
        -> Result<(), BridgeError>;

    /// Send image bytes to an image container
    async fn update_image_raw_data(&self, update: ImageRawDataUpdate) -> Result<(), BridgeError>;

    /// Turn the microphone on or off
    async fn audio_control(&self, enabled: bool) -> Result<(), BridgeError>;
}
