//! Device Bridge
//!
//! Contract between the HUD engine and the glasses:
//! - [`DeviceBridge`]: the async trait any transport implements
//! - [`events`]: device status and hardware input types
//! - [`HeadlessBridge`]: recording in-process implementation
//!
//! Whole-screen descriptions go through [`create_startup`] and [`rebuild`],
//! which validate before anything reaches the device.

pub mod events;
pub mod headless;
pub mod traits;

pub use events::{
    AudioEventPayload, DeviceConnectType, DeviceStatus, HubEvent, ListItemEvent, OsEventType,
    RawHubEvent, SysItemEvent, TextItemEvent,
};
pub use headless::{BridgeCall, HeadlessBridge};
pub use traits::{BridgeError, DeviceBridge, ImageRawDataUpdate, TextContainerUpgrade};

use crate::render::RenderDescription;

/// Validate `description` and send it as the startup container tree
///
/// # Errors
///
/// Returns [`BridgeError::InvalidRender`] without calling the bridge when the
/// description is malformed, or whatever the bridge reports.
pub async fn create_startup(
    bridge: &dyn DeviceBridge,
    description: &RenderDescription,
) -> Result<(), BridgeError> {
    description.validate()?;
    bridge.create_startup_page_container(description).await
}

/// Validate `description` and replace the container tree with it
///
/// # Errors
///
/// Same as [`create_startup`].
pub async fn rebuild(
    bridge: &dyn DeviceBridge,
    description: &RenderDescription,
) -> Result<(), BridgeError> {
    description.validate()?;
    bridge.rebuild_page_container(description).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::{Frame, TextContainer};

    #[tokio::test]
    async fn test_invalid_description_never_reaches_bridge() {
        let bridge = HeadlessBridge::new();
        let description = RenderDescription::new()
            .with_text(TextContainer::new(Frame::new(1, "a"), ""))
            .with_text(TextContainer::new(Frame::new(1, "b"), ""));

        let result = rebuild(&bridge, &description).await;
        assert!(matches!(result, Err(BridgeError::InvalidRender(_))));
        let result = create_startup(&bridge, &description).await;
        assert!(matches!(result, Err(BridgeError::InvalidRender(_))));
        assert!(bridge.calls().is_empty());
    }
}
