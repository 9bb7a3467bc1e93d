//! Demo Layout Page
//!
//! Mixed layout: an image in the top-left cell, a short chat log below it and
//! a long chat log filling the right column. A background feed prepends a
//! timestamped line to both logs on a fixed period and patches them in place.
//!
//! ```text
//! +-----------+ +-----------+
//! |  image    | |           |
//! +-----------+ |  right    |
//! |  left     | |  chat     |
//! |  chat     | |           |
//! +-----------+ +-----------+
//! ```
//!
//! Tap moves event capture between the two chat logs. Double tap stops the
//! feed and returns to the menu.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::bridge::{self, DeviceBridge, SysItemEvent, TextContainerUpgrade};
use crate::page::{bridge_of, Page, PageContext};
use crate::render::{
    Frame, ImageContainer, RenderDescription, TextContainer, GLASS_SCREEN_HEIGHT,
    GLASS_SCREEN_WIDTH,
};

use super::{DemoKit, DemoMenuPage};

const IMAGE_ID: u32 = 101;
const LEFT_CHAT_ID: u32 = 102;
const RIGHT_CHAT_ID: u32 = 103;
const IMAGE_NAME: &str = "layout-image-top-left";
const COLUMN_GAP: u32 = 4;

const LEFT_LINES: usize = 5;
const RIGHT_LINES: usize = 12;

/// Default period of the chat feed
pub const FEED_INTERVAL: Duration = Duration::from_millis(1200);

const LEFT_SAMPLES: [&str; 5] = [
    "新着コメントを受信しました",
    "音声認識の結果を整形中です",
    "会話ログをバッファに追加しました",
    "ユーザーの発話を要約しています",
    "イベントストリーム接続は正常です",
];

const RIGHT_SAMPLES: [&str; 5] = [
    "テスト用の日本語テキストを追記します",
    "右ペインは長文表示の確認領域です",
    "スクロール挙動の検証を想定しています",
    "最終的にはリアルタイムイベントに置換します",
    "UIレイアウトのバランスを確認中です",
];

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Side {
    Left,
    Right,
}

#[derive(Debug, Default)]
struct ChatFeed {
    tick: usize,
    left: Vec<String>,
    right: Vec<String>,
}

impl ChatFeed {
    fn push(&mut self, time: &str) {
        self.tick += 1;
        let sample = self.tick % LEFT_SAMPLES.len();

        self.left.insert(0, format!("[{time}] {}", LEFT_SAMPLES[sample]));
        self.right
            .insert(0, format!("[{time}] {} (#{})", RIGHT_SAMPLES[sample], self.tick));
        self.left.truncate(LEFT_LINES);
        self.right.truncate(RIGHT_LINES);
    }

    fn texts(&self) -> (String, String) {
        (self.left.join("\n"), self.right.join("\n"))
    }
}

struct Geometry {
    left_width: u32,
    right_width: u32,
    right_x: u32,
    top_height: u32,
    bottom_height: u32,
}

impl Geometry {
    fn new() -> Self {
        let left_width = (GLASS_SCREEN_WIDTH - COLUMN_GAP) / 2;
        let top_height = GLASS_SCREEN_HEIGHT / 4;
        Self {
            left_width,
            right_width: GLASS_SCREEN_WIDTH - left_width - COLUMN_GAP,
            right_x: left_width + COLUMN_GAP,
            top_height,
            bottom_height: GLASS_SCREEN_HEIGHT - top_height,
        }
    }
}

/// Image plus two live chat logs
pub struct DemoLayoutPage {
    kit: DemoKit,
    geometry: Geometry,
    capture: Side,
    feed: Arc<Mutex<ChatFeed>>,
    feed_task: Option<JoinHandle<()>>,
    interval: Duration,
    context: Option<PageContext>,
}

impl DemoLayoutPage {
    #[must_use]
    pub fn new(kit: DemoKit) -> Self {
        Self {
            kit,
            geometry: Geometry::new(),
            capture: Side::Left,
            feed: Arc::new(Mutex::new(ChatFeed::default())),
            feed_task: None,
            interval: FEED_INTERVAL,
            context: None,
        }
    }

    /// Change the feed period
    #[must_use]
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Whether the chat feed task is running
    #[must_use]
    pub fn feed_running(&self) -> bool {
        self.feed_task.as_ref().is_some_and(|task| !task.is_finished())
    }

    async fn send_image(&self, bridge: &dyn DeviceBridge) -> anyhow::Result<()> {
        self.kit
            .send_image(
                bridge,
                IMAGE_ID,
                IMAGE_NAME,
                self.geometry.left_width,
                self.geometry.top_height,
            )
            .await
    }

    fn start_feed(&mut self, bridge: Arc<dyn DeviceBridge>) {
        self.stop_feed();

        let feed = Arc::clone(&self.feed);
        let period = self.interval;
        self.feed_task = Some(tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            loop {
                ticker.tick().await;
                let (left, right) = {
                    let mut feed = feed.lock();
                    feed.push(&chrono::Local::now().format("%H:%M:%S").to_string());
                    feed.texts()
                };
                if let Err(e) = push_chats(bridge.as_ref(), left, right).await {
                    warn!(error = %e, "Chat feed update failed");
                }
            }
        }));
        debug!(?period, "Chat feed started");
    }

    fn stop_feed(&mut self) {
        if let Some(task) = self.feed_task.take() {
            task.abort();
            debug!("Chat feed stopped");
        }
    }
}

async fn push_chats(bridge: &dyn DeviceBridge, left: String, right: String) -> anyhow::Result<()> {
    bridge
        .text_container_upgrade(TextContainerUpgrade::new(LEFT_CHAT_ID, left))
        .await?;
    bridge
        .text_container_upgrade(TextContainerUpgrade::new(RIGHT_CHAT_ID, right))
        .await?;
    Ok(())
}

#[async_trait]
impl Page for DemoLayoutPage {
    fn name(&self) -> &str {
        "demo-layout"
    }

    fn init(&mut self, context: PageContext) {
        self.context = Some(context);
    }

    fn render(&self) -> RenderDescription {
        let g = &self.geometry;
        let (left, right) = self.feed.lock().texts();
        let or_placeholder = |text: String, placeholder: &str| {
            if text.is_empty() {
                placeholder.to_string()
            } else {
                text
            }
        };

        RenderDescription::new()
            .with_image(ImageContainer::new(
                Frame::new(IMAGE_ID, IMAGE_NAME).size(g.left_width, g.top_height),
            ))
            .with_text(TextContainer::new(
                Frame::new(LEFT_CHAT_ID, "layout-chat-left-bottom")
                    .at(0, g.top_height)
                    .size(g.left_width, g.bottom_height)
                    .padding(4)
                    .capture(self.capture == Side::Left),
                or_placeholder(left, "左チャット: 初期化中…"),
            ))
            .with_text(TextContainer::new(
                Frame::new(RIGHT_CHAT_ID, "layout-chat-right")
                    .at(g.right_x, 0)
                    .size(g.right_width, GLASS_SCREEN_HEIGHT)
                    .padding(4)
                    .capture(self.capture == Side::Right),
                or_placeholder(right, "右チャット: 初期化中…"),
            ))
    }

    async fn after_render(&mut self) -> anyhow::Result<()> {
        let bridge = bridge_of(self.context.as_ref())?;
        let image = self.send_image(bridge.as_ref()).await;
        self.start_feed(bridge);
        image
    }

    async fn on_click(&mut self, _event: &SysItemEvent) -> anyhow::Result<()> {
        let bridge = bridge_of(self.context.as_ref())?;
        self.capture = match self.capture {
            Side::Left => Side::Right,
            Side::Right => Side::Left,
        };

        bridge::rebuild(bridge.as_ref(), &self.render()).await?;
        self.send_image(bridge.as_ref()).await?;
        let (left, right) = self.feed.lock().texts();
        push_chats(bridge.as_ref(), left, right).await?;

        info!(capture = ?self.capture, "Switched event capture");
        Ok(())
    }

    async fn on_double_click(&mut self, _event: &SysItemEvent) -> anyhow::Result<()> {
        self.stop_feed();
        if let Some(context) = &self.context {
            context.loader.load(DemoMenuPage::new(self.kit.clone()));
        }
        Ok(())
    }

    async fn deactivate(&mut self) {
        self.stop_feed();
    }
}

impl Drop for DemoLayoutPage {
    fn drop(&mut self) {
        self.stop_feed();
    }
}
