//! Concrete Pages
//!
//! - [`ReaderPage`]: the paged work reader
//! - [`SplashPage`]: a single banner line
//! - Demo pages exercising each container kind and input type, reachable
//!   from [`DemoMenuPage`]

pub mod demo_audio;
pub mod demo_image;
pub mod demo_layout;
pub mod demo_menu;
pub mod demo_text;
pub mod reader;
pub mod splash;

pub use demo_audio::DemoAudioPage;
pub use demo_image::DemoImagePage;
pub use demo_layout::DemoLayoutPage;
pub use demo_menu::DemoMenuPage;
pub use demo_text::DemoTextPage;
pub use reader::{clamp_page, ProgressUpdate, ReaderPage};
pub use splash::SplashPage;

use std::sync::Arc;

use anyhow::Context;
use tracing::debug;

use crate::bridge::{DeviceBridge, ImageRawDataUpdate};
use crate::imaging::{fit_png, ImageSource, DEMO_IMAGE_URL};

/// Shared dependencies of the demo pages
#[derive(Clone)]
pub struct DemoKit {
    /// Image fetcher for the image and layout demos
    pub images: Arc<dyn ImageSource>,
    /// Image shown by those demos
    pub image_url: String,
}

impl DemoKit {
    /// Kit fetching [`DEMO_IMAGE_URL`] through `images`
    pub fn new(images: Arc<dyn ImageSource>) -> Self {
        Self {
            images,
            image_url: DEMO_IMAGE_URL.to_string(),
        }
    }

    /// Use a different demo image
    #[must_use]
    pub fn with_image_url(mut self, url: impl Into<String>) -> Self {
        self.image_url = url.into();
        self
    }

    /// Fetch the demo image, fit it to `width` x `height` and send it
    ///
    /// # Errors
    ///
    /// Fetch, decode, encode and bridge failures.
    pub async fn send_image(
        &self,
        bridge: &dyn DeviceBridge,
        container_id: u32,
        container_name: &str,
        width: u32,
        height: u32,
    ) -> anyhow::Result<()> {
        let bytes = self
            .images
            .fetch(&self.image_url)
            .await
            .with_context(|| format!("Failed to fetch {}", self.image_url))?;
        let image_data = fit_png(&bytes, width, height)?;

        debug!(container_id, bytes = image_data.len(), "Sending image data");
        bridge
            .update_image_raw_data(ImageRawDataUpdate {
                container_id,
                container_name: container_name.to_string(),
                image_data,
            })
            .await?;
        Ok(())
    }
}

impl std::fmt::Debug for DemoKit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DemoKit")
            .field("image_url", &self.image_url)
            .finish_non_exhaustive()
    }
}
