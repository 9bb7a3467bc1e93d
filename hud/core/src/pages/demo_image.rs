//! Demo Image Page
//!
//! One centred image container. The image is fetched and fitted after the
//! container exists.

use async_trait::async_trait;

use crate::page::{bridge_of, Page, PageContext};
use crate::render::{Frame, ImageContainer, RenderDescription, GLASS_SCREEN_HEIGHT, GLASS_SCREEN_WIDTH};

use super::DemoKit;

const IMAGE_ID: u32 = 1;
const IMAGE_NAME: &str = "demo-image";
const IMAGE_SIDE: u32 = 100;

/// Centred image demo
pub struct DemoImagePage {
    kit: DemoKit,
    width: u32,
    height: u32,
    context: Option<PageContext>,
}

impl DemoImagePage {
    #[must_use]
    pub fn new(kit: DemoKit) -> Self {
        let side = IMAGE_SIDE.min(GLASS_SCREEN_WIDTH).min(GLASS_SCREEN_HEIGHT);
        Self {
            kit,
            width: side,
            height: side,
            context: None,
        }
    }
}

#[async_trait]
impl Page for DemoImagePage {
    fn name(&self) -> &str {
        "demo-image"
    }

    fn init(&mut self, context: PageContext) {
        self.context = Some(context);
    }

    fn render(&self) -> RenderDescription {
        RenderDescription::new().with_image(ImageContainer::new(
            Frame::new(IMAGE_ID, IMAGE_NAME)
                .at(
                    (GLASS_SCREEN_WIDTH - self.width) / 2,
                    (GLASS_SCREEN_HEIGHT - self.height) / 2,
                )
                .size(self.width, self.height),
        ))
    }

    async fn after_render(&mut self) -> anyhow::Result<()> {
        let bridge = bridge_of(self.context.as_ref())?;
        self.kit
            .send_image(bridge.as_ref(), IMAGE_ID, IMAGE_NAME, self.width, self.height)
            .await
    }
}
