//! Demo Text Page
//!
//! Three text rows. Taps are counted into the first row, double taps into the
//! second, both through incremental text upgrades. Scrolling down returns to
//! the menu.

use async_trait::async_trait;

use crate::bridge::{SysItemEvent, TextContainerUpgrade, TextItemEvent};
use crate::page::{bridge_of, Page, PageContext};
use crate::render::{Frame, RenderDescription, TextContainer, GLASS_SCREEN_HEIGHT, GLASS_SCREEN_WIDTH};

use super::{DemoKit, DemoMenuPage};

const CLICK_ROW: u32 = 1;
const DOUBLE_CLICK_ROW: u32 = 2;
const IDLE_TEXT: &str = "操作待機中";

/// Tap counter demo
pub struct DemoTextPage {
    kit: DemoKit,
    clicks: u32,
    double_clicks: u32,
    context: Option<PageContext>,
}

impl DemoTextPage {
    #[must_use]
    pub fn new(kit: DemoKit) -> Self {
        Self {
            kit,
            clicks: 0,
            double_clicks: 0,
            context: None,
        }
    }
}

#[async_trait]
impl Page for DemoTextPage {
    fn name(&self) -> &str {
        "demo-text"
    }

    fn init(&mut self, context: PageContext) {
        self.context = Some(context);
    }

    fn render(&self) -> RenderDescription {
        let row_height = GLASS_SCREEN_HEIGHT / 3;
        let mut description = RenderDescription::new();

        for id in 1..=3u32 {
            description.push_text(TextContainer::new(
                Frame::new(id, format!("item-{id}"))
                    .at(20, (id - 1) * row_height)
                    .size(GLASS_SCREEN_WIDTH - 40, row_height)
                    .border(0, 5)
                    .padding(2)
                    .capture(id == 2),
                IDLE_TEXT,
            ));
        }
        description
    }

    async fn on_click(&mut self, _event: &SysItemEvent) -> anyhow::Result<()> {
        self.clicks += 1;
        bridge_of(self.context.as_ref())?
            .text_container_upgrade(TextContainerUpgrade::new(
                CLICK_ROW,
                format!("click: {}", self.clicks),
            ))
            .await?;
        Ok(())
    }

    async fn on_double_click(&mut self, _event: &SysItemEvent) -> anyhow::Result<()> {
        self.double_clicks += 1;
        bridge_of(self.context.as_ref())?
            .text_container_upgrade(TextContainerUpgrade::new(
                DOUBLE_CLICK_ROW,
                format!("double click: {}", self.double_clicks),
            ))
            .await?;
        Ok(())
    }

    async fn on_scroll_down(&mut self, _event: &TextItemEvent) -> anyhow::Result<()> {
        if let Some(context) = &self.context {
            context.loader.load(DemoMenuPage::new(self.kit.clone()));
        }
        Ok(())
    }
}
