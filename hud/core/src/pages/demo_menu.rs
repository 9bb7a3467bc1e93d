//! Demo Menu Page
//!
//! A full-screen list. Selecting an entry opens the matching demo page;
//! placeholder entries only log.

use async_trait::async_trait;
use tracing::{debug, info};

use crate::bridge::ListItemEvent;
use crate::page::{Page, PageContext};
use crate::render::{
    Frame, ListContainer, ListItems, RenderDescription, GLASS_SCREEN_HEIGHT, GLASS_SCREEN_WIDTH,
};

use super::{DemoAudioPage, DemoImagePage, DemoKit, DemoLayoutPage, DemoTextPage, SplashPage};

const LIST_ID: u32 = 1;
const LIST_BORDER: u32 = 1;
const LIST_PADDING: u32 = 5;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Entry {
    Placeholder(&'static str),
    Splash,
    Text,
    Image,
    Layout,
    Audio,
}

impl Entry {
    fn label(self) -> &'static str {
        match self {
            Self::Placeholder(label) => label,
            Self::Splash => "splash-text",
            Self::Text => "demo-text",
            Self::Image => "demo-image",
            Self::Layout => "demo-layout",
            Self::Audio => "demo-audio",
        }
    }
}

const ENTRIES: [Entry; 10] = [
    Entry::Placeholder("item-1"),
    Entry::Splash,
    Entry::Text,
    Entry::Image,
    Entry::Layout,
    Entry::Audio,
    Entry::Placeholder("item-7"),
    Entry::Placeholder("item-8"),
    Entry::Placeholder("item-9"),
    Entry::Placeholder("item-10"),
];

/// Entry point of the demo pages
pub struct DemoMenuPage {
    kit: DemoKit,
    context: Option<PageContext>,
}

impl DemoMenuPage {
    /// Menu whose demos share `kit`
    #[must_use]
    pub fn new(kit: DemoKit) -> Self {
        Self { kit, context: None }
    }

    /// Labels in display order
    #[must_use]
    pub fn labels() -> Vec<&'static str> {
        ENTRIES.iter().map(|entry| entry.label()).collect()
    }
}

#[async_trait]
impl Page for DemoMenuPage {
    fn name(&self) -> &str {
        "demo-menu"
    }

    fn init(&mut self, context: PageContext) {
        self.context = Some(context);
    }

    fn render(&self) -> RenderDescription {
        RenderDescription::new().with_list(ListContainer {
            frame: Frame::new(LIST_ID, "demo-menu")
                .size(GLASS_SCREEN_WIDTH, GLASS_SCREEN_HEIGHT)
                .border(LIST_BORDER, 13)
                .padding(LIST_PADDING)
                .capture(true),
            border_radius: 6,
            items: ListItems {
                item_count: 1,
                // Border, padding and item border on both sides
                item_width: GLASS_SCREEN_WIDTH - 2 * (LIST_BORDER + LIST_PADDING + 1),
                select_border: true,
                names: Self::labels().into_iter().map(str::to_string).collect(),
            },
        })
    }

    async fn on_list_select(&mut self, event: &ListItemEvent) -> anyhow::Result<()> {
        let index = event.current_select_item_index.unwrap_or(0);
        let Some(entry) = ENTRIES.get(index).copied() else {
            debug!(index, "Selection outside the menu");
            return Ok(());
        };
        let Some(context) = &self.context else {
            return Ok(());
        };

        let kit = self.kit.clone();
        let loader = &context.loader;
        match entry {
            Entry::Placeholder(label) => {
                info!(item = label, "Item clicked");
                return Ok(());
            }
            Entry::Splash => loader.load(SplashPage::new("loading")),
            Entry::Text => loader.load(DemoTextPage::new(kit)),
            Entry::Image => loader.load(DemoImagePage::new(kit)),
            Entry::Layout => loader.load(DemoLayoutPage::new(kit)),
            Entry::Audio => loader.load(DemoAudioPage::new(kit)),
        };
        info!(item = entry.label(), "Opening demo");
        Ok(())
    }
}
