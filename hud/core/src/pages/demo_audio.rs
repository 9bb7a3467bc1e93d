//! Demo Audio Page
//!
//! Live microphone level meter. The mic is switched on after the first
//! render; every audio frame updates a smoothed volume that is redrawn at a
//! bounded rate.

use std::time::Duration;

use async_trait::async_trait;
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::bridge::{AudioEventPayload, SysItemEvent, TextContainerUpgrade};
use crate::page::{bridge_of, Page, PageContext};
use crate::render::{Frame, RenderDescription, TextContainer, GLASS_SCREEN_HEIGHT, GLASS_SCREEN_WIDTH};

use super::{DemoKit, DemoMenuPage};

const METER_ID: u32 = 1;
const BAR_CELLS: u32 = 24;

/// Minimum spacing between unforced redraws
pub const DRAW_INTERVAL: Duration = Duration::from_millis(120);

/// RMS level of 16-bit little-endian PCM as a percentage of full scale
///
/// A trailing odd byte is ignored.
#[must_use]
pub fn volume_percent(pcm: &[u8]) -> u32 {
    let samples = pcm.len() / 2;
    if samples == 0 {
        return 0;
    }

    let square_sum: f64 = pcm
        .chunks_exact(2)
        .map(|pair| {
            let sample = f64::from(i16::from_le_bytes([pair[0], pair[1]]));
            sample * sample
        })
        .sum();

    #[allow(clippy::cast_precision_loss)]
    let rms = (square_sum / samples as f64).sqrt();
    let normalized = (rms / 32768.0).min(1.0);

    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let percent = (normalized * 100.0).round() as u32;
    percent
}

/// Blend a new reading into the running level (75% old, 25% new)
#[must_use]
pub fn smooth(previous: u32, instant: u32) -> u32 {
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let blended = (f64::from(previous) * 0.75 + f64::from(instant) * 0.25).round() as u32;
    blended
}

/// `BAR_CELLS`-wide bar for a 0..=100 level
#[must_use]
pub fn level_bar(level: u32) -> String {
    let level = level.min(100);
    let filled = (level * BAR_CELLS + 50) / 100;
    format!(
        "{}{}",
        "━".repeat(filled as usize),
        "─".repeat((BAR_CELLS - filled) as usize)
    )
}

/// Microphone level meter
pub struct DemoAudioPage {
    kit: DemoKit,
    mic_enabled: bool,
    level: u32,
    last_draw: Option<Instant>,
    context: Option<PageContext>,
}

impl DemoAudioPage {
    #[must_use]
    pub fn new(kit: DemoKit) -> Self {
        Self {
            kit,
            mic_enabled: false,
            level: 0,
            last_draw: None,
            context: None,
        }
    }

    /// Whether the microphone is believed to be on
    #[must_use]
    pub fn mic_enabled(&self) -> bool {
        self.mic_enabled
    }

    fn compose(&self) -> String {
        let level = self.level.min(100);
        [
            "audio monitor".to_string(),
            if self.mic_enabled {
                "mic: ON (tap=OFF)".to_string()
            } else {
                "mic: OFF (tap=ON)".to_string()
            },
            format!("volume: {level}"),
            level_bar(level),
            "double tap: back".to_string(),
        ]
        .join("\n")
    }

    async fn set_mic(&mut self, enabled: bool) {
        let Ok(bridge) = bridge_of(self.context.as_ref()) else {
            return;
        };

        self.mic_enabled = enabled;
        if let Err(e) = bridge.audio_control(enabled).await {
            warn!(enabled, error = %e, "Failed to toggle mic");
            self.mic_enabled = false;
        }
    }

    async fn redraw(&mut self, force: bool) -> anyhow::Result<()> {
        let bridge = bridge_of(self.context.as_ref())?;

        let now = Instant::now();
        if !force
            && self
                .last_draw
                .is_some_and(|last| now.duration_since(last) < DRAW_INTERVAL)
        {
            return Ok(());
        }
        self.last_draw = Some(now);

        bridge
            .text_container_upgrade(TextContainerUpgrade::new(METER_ID, self.compose()))
            .await?;
        Ok(())
    }
}

#[async_trait]
impl Page for DemoAudioPage {
    fn name(&self) -> &str {
        "demo-audio"
    }

    fn init(&mut self, context: PageContext) {
        self.context = Some(context);
    }

    fn render(&self) -> RenderDescription {
        RenderDescription::new().with_text(TextContainer::new(
            Frame::new(METER_ID, "demo-audio")
                .size(GLASS_SCREEN_WIDTH, GLASS_SCREEN_HEIGHT)
                .border(1, 13)
                .padding(5)
                .capture(true),
            self.compose(),
        ))
    }

    async fn after_render(&mut self) -> anyhow::Result<()> {
        self.set_mic(true).await;
        self.redraw(true).await
    }

    async fn on_audio(&mut self, event: &AudioEventPayload) -> anyhow::Result<()> {
        if event.audio_pcm.len() < 2 {
            return Ok(());
        }
        self.level = smooth(self.level, volume_percent(&event.audio_pcm));
        self.redraw(false).await
    }

    async fn on_click(&mut self, _event: &SysItemEvent) -> anyhow::Result<()> {
        self.set_mic(!self.mic_enabled).await;
        self.redraw(true).await
    }

    async fn on_double_click(&mut self, _event: &SysItemEvent) -> anyhow::Result<()> {
        self.set_mic(false).await;
        if let Some(context) = &self.context {
            context.loader.load(DemoMenuPage::new(self.kit.clone()));
        }
        Ok(())
    }

    async fn deactivate(&mut self) {
        if self.mic_enabled {
            debug!("Turning mic off on exit");
            self.set_mic(false).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bridge::{BridgeCall, HeadlessBridge, HubEvent};
    use crate::manager::PageManager;
    use crate::pages::testing::kit;
    use crate::pages::SplashPage;
    use pretty_assertions::assert_eq;
    use std::sync::Arc;

    fn pcm(sample: i16, count: usize) -> Vec<u8> {
        (0..count).flat_map(|_| sample.to_le_bytes()).collect()
    }

    fn audio_calls(bridge: &HeadlessBridge) -> Vec<bool> {
        bridge
            .calls()
            .into_iter()
            .filter_map(|call| match call {
                BridgeCall::AudioControl(enabled) => Some(enabled),
                _ => None,
            })
            .collect()
    }

    async fn setup() -> (Arc<HeadlessBridge>, PageManager) {
        let bridge = Arc::new(HeadlessBridge::new());
        let mut manager = PageManager::new(bridge.clone());
        let (_images, kit) = kit();
        manager.init(Box::new(DemoAudioPage::new(kit))).await.unwrap();
        (bridge, manager)
    }

    #[test]
    fn test_volume_percent() {
        assert_eq!(volume_percent(&[]), 0);
        assert_eq!(volume_percent(&[7]), 0);
        assert_eq!(volume_percent(&pcm(0, 10)), 0);
        assert_eq!(volume_percent(&pcm(i16::MIN, 10)), 100);
        assert_eq!(volume_percent(&pcm(16384, 10)), 50);
        assert_eq!(volume_percent(&pcm(-16384, 10)), 50);
    }

    #[test]
    fn test_smoothing_and_bar() {
        assert_eq!(smooth(0, 100), 25);
        assert_eq!(smooth(100, 0), 75);
        assert_eq!(level_bar(0), "─".repeat(24));
        assert_eq!(level_bar(100), "━".repeat(24));
        assert_eq!(level_bar(50), format!("{}{}", "━".repeat(12), "─".repeat(12)));
        assert_eq!(level_bar(250).chars().count(), 24);
    }

    #[tokio::test(start_paused = true)]
    async fn test_mic_on_after_render_and_draw_throttled() {
        let (bridge, mut manager) = setup().await;
        assert_eq!(audio_calls(&bridge), vec![true]);
        assert_eq!(bridge.text_upgrades(METER_ID).len(), 1);

        let loud = HubEvent::audio(pcm(i16::MAX, 64));
        manager.dispatch(&loud).await;
        manager.dispatch(&loud).await;
        // Both frames land within the draw interval of the forced draw
        assert_eq!(bridge.text_upgrades(METER_ID).len(), 1);

        tokio::time::advance(DRAW_INTERVAL).await;
        manager.dispatch(&loud).await;
        let draws = bridge.text_upgrades(METER_ID);
        assert_eq!(draws.len(), 2);
        assert!(draws[1].contains("volume: 58"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_click_toggles_mic_and_forces_draw() {
        let (bridge, mut manager) = setup().await;

        manager.dispatch(&HubEvent::click()).await;
        assert_eq!(audio_calls(&bridge), vec![true, false]);
        let draws = bridge.text_upgrades(METER_ID);
        assert_eq!(draws.len(), 2);
        assert!(draws[1].contains("mic: OFF"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_toggle_leaves_mic_off() {
        let (bridge, mut manager) = setup().await;
        bridge.set_fail_audio(true);

        manager.dispatch(&HubEvent::click()).await;
        manager.dispatch(&HubEvent::click()).await;
        let draws = bridge.text_upgrades(METER_ID);
        assert!(draws.last().unwrap().contains("mic: OFF"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_double_click_disables_mic_and_returns() {
        let (bridge, mut manager) = setup().await;

        manager.dispatch(&HubEvent::double_click()).await;
        manager.drain_requests().await;

        assert_eq!(manager.active_page_name(), Some("demo-menu"));
        assert_eq!(audio_calls(&bridge), vec![true, false]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_swap_away_disables_mic() {
        let (bridge, mut manager) = setup().await;

        manager.load(Box::new(SplashPage::new("bye"))).await.unwrap();
        assert_eq!(audio_calls(&bridge), vec![true, false]);
    }

    #[test]
    fn test_meter_text() {
        let (_images, kit) = kit();
        let page = DemoAudioPage::new(kit);
        let description = page.render();
        let content = &description.text(METER_ID).unwrap().content;

        assert_eq!(
            content.lines().collect::<Vec<_>>(),
            vec![
                "audio monitor",
                "mic: OFF (tap=ON)",
                "volume: 0",
                "────────────────────────",
                "double tap: back",
            ]
        );
    }
}
