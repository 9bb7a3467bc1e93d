//! Splash Page

use async_trait::async_trait;

use crate::page::{Page, PageContext};
use crate::render::{Frame, RenderDescription, TextContainer, GLASS_SCREEN_HEIGHT, GLASS_SCREEN_WIDTH};

/// Three stacked text rows with a banner in the middle one
pub struct SplashPage {
    text: String,
}

impl SplashPage {
    /// Splash showing `text`
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }
}

#[async_trait]
impl Page for SplashPage {
    fn name(&self) -> &str {
        "splash"
    }

    fn init(&mut self, _context: PageContext) {}

    fn render(&self) -> RenderDescription {
        let row_height = GLASS_SCREEN_HEIGHT / 3;
        let mut description = RenderDescription::new();

        for (row, id) in (1..=3u32).enumerate() {
            let middle = row == 1;
            description.push_text(TextContainer::new(
                Frame::new(id, format!("splash-item-{id}"))
                    .at(20, id.saturating_sub(1) * row_height)
                    .size(GLASS_SCREEN_WIDTH - 40, row_height)
                    .border(0, 5)
                    .padding(2)
                    .capture(middle),
                if middle { self.text.as_str() } else { "" },
            ));
        }
        description
    }
}
