//! Bridge Event Types
//!
//! Device-status updates and hardware input events delivered by the glasses.
//!
//! The device reports input as a single raw envelope that may carry several
//! payloads at once ([`RawHubEvent`]). The engine works with the narrowed
//! [`HubEvent`], picked by fixed precedence: list, then text, then system,
//! then audio.

use serde::{Deserialize, Serialize};

/// Connection state of the glasses
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DeviceConnectType {
    /// Nothing known yet
    #[default]
    None,
    /// Pairing or reconnecting
    Connecting,
    /// Connected and ready
    Connected,
    /// Connection dropped
    Disconnected,
    /// Connection attempt failed
    ConnectionFailed,
}

/// Status snapshot pushed by the bridge
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceStatus {
    /// Device serial number
    pub sn: String,
    /// Connection state
    pub connect_type: DeviceConnectType,
    /// Battery level in percent, when reported
    #[serde(default)]
    pub battery_level: Option<u8>,
    /// Whether the glasses are being worn, when reported
    #[serde(default)]
    pub is_wearing: Option<bool>,
}

impl DeviceStatus {
    /// Status for a connected device
    pub fn connected(sn: impl Into<String>) -> Self {
        Self {
            sn: sn.into(),
            connect_type: DeviceConnectType::Connected,
            ..Default::default()
        }
    }
}

/// Sub-type of an input event, as numbered by the device OS
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum OsEventType {
    /// Single tap
    Click,
    /// Scrolled past the top of a container
    ScrollTop,
    /// Scrolled past the bottom of a container
    ScrollBottom,
    /// Double tap
    DoubleClick,
    /// App came to the foreground
    ForegroundEnter,
    /// App left the foreground
    ForegroundExit,
    /// App terminated abnormally
    AbnormalExit,
}

impl TryFrom<u8> for OsEventType {
    type Error = String;

    fn try_from(code: u8) -> Result<Self, Self::Error> {
        match code {
            0 => Ok(Self::Click),
            1 => Ok(Self::ScrollTop),
            2 => Ok(Self::ScrollBottom),
            3 => Ok(Self::DoubleClick),
            4 => Ok(Self::ForegroundEnter),
            5 => Ok(Self::ForegroundExit),
            6 => Ok(Self::AbnormalExit),
            other => Err(format!("unknown event type {other}")),
        }
    }
}

impl From<OsEventType> for u8 {
    fn from(event_type: OsEventType) -> Self {
        match event_type {
            OsEventType::Click => 0,
            OsEventType::ScrollTop => 1,
            OsEventType::ScrollBottom => 2,
            OsEventType::DoubleClick => 3,
            OsEventType::ForegroundEnter => 4,
            OsEventType::ForegroundExit => 5,
            OsEventType::AbnormalExit => 6,
        }
    }
}

/// Selection inside a list container
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListItemEvent {
    /// Container the list lives in
    #[serde(default, rename = "containerID")]
    pub container_id: Option<u32>,
    /// Name of that container
    #[serde(default)]
    pub container_name: Option<String>,
    /// Index of the selected item
    #[serde(default)]
    pub current_select_item_index: Option<usize>,
    /// Label of the selected item
    #[serde(default)]
    pub current_select_item_name: Option<String>,
    /// Event sub-type
    #[serde(default)]
    pub event_type: Option<OsEventType>,
}

impl ListItemEvent {
    /// Selection of the item at `index`
    #[must_use]
    pub fn select(index: usize) -> Self {
        Self {
            current_select_item_index: Some(index),
            ..Default::default()
        }
    }
}

/// Scroll gesture on a text container
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextItemEvent {
    /// Container that received the gesture
    #[serde(default, rename = "containerID")]
    pub container_id: Option<u32>,
    /// Name of that container
    #[serde(default)]
    pub container_name: Option<String>,
    /// Event sub-type
    #[serde(default)]
    pub event_type: Option<OsEventType>,
}

impl TextItemEvent {
    /// Text event with the given sub-type
    #[must_use]
    pub fn of(event_type: OsEventType) -> Self {
        Self {
            event_type: Some(event_type),
            ..Default::default()
        }
    }
}

/// System-level tap
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SysItemEvent {
    /// Event sub-type; absent means a plain click
    #[serde(default)]
    pub event_type: Option<OsEventType>,
}

impl SysItemEvent {
    /// System event with the given sub-type
    #[must_use]
    pub fn of(event_type: OsEventType) -> Self {
        Self {
            event_type: Some(event_type),
        }
    }
}

/// One frame of microphone audio
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AudioEventPayload {
    /// 16-bit little-endian PCM samples
    #[serde(default)]
    pub audio_pcm: Vec<u8>,
}

/// Hardware event as delivered on the wire, possibly with several payloads
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawHubEvent {
    #[serde(default)]
    pub list_event: Option<ListItemEvent>,
    #[serde(default)]
    pub text_event: Option<TextItemEvent>,
    #[serde(default)]
    pub sys_event: Option<SysItemEvent>,
    #[serde(default)]
    pub audio_event: Option<AudioEventPayload>,
}

impl RawHubEvent {
    /// Narrow to a single payload (list > text > system > audio)
    ///
    /// Returns `None` for an envelope with no payload at all.
    #[must_use]
    pub fn into_event(self) -> Option<HubEvent> {
        if let Some(event) = self.list_event {
            Some(HubEvent::List(event))
        } else if let Some(event) = self.text_event {
            Some(HubEvent::Text(event))
        } else if let Some(event) = self.sys_event {
            Some(HubEvent::Sys(event))
        } else {
            self.audio_event.map(HubEvent::Audio)
        }
    }
}

/// Hardware event with exactly one payload
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum HubEvent {
    List(ListItemEvent),
    Text(TextItemEvent),
    Sys(SysItemEvent),
    Audio(AudioEventPayload),
}

impl HubEvent {
    /// Plain click
    #[must_use]
    pub fn click() -> Self {
        Self::Sys(SysItemEvent::of(OsEventType::Click))
    }

    /// Double click
    #[must_use]
    pub fn double_click() -> Self {
        Self::Sys(SysItemEvent::of(OsEventType::DoubleClick))
    }

    /// Scroll past the top
    #[must_use]
    pub fn scroll_up() -> Self {
        Self::Text(TextItemEvent::of(OsEventType::ScrollTop))
    }

    /// Scroll past the bottom
    #[must_use]
    pub fn scroll_down() -> Self {
        Self::Text(TextItemEvent::of(OsEventType::ScrollBottom))
    }

    /// List selection of the item at `index`
    #[must_use]
    pub fn select(index: usize) -> Self {
        Self::List(ListItemEvent::select(index))
    }

    /// Audio frame
    #[must_use]
    pub fn audio(pcm: Vec<u8>) -> Self {
        Self::Audio(AudioEventPayload { audio_pcm: pcm })
    }
}

impl From<HubEvent> for RawHubEvent {
    fn from(event: HubEvent) -> Self {
        match event {
            HubEvent::List(e) => Self {
                list_event: Some(e),
                ..Default::default()
            },
            HubEvent::Text(e) => Self {
                text_event: Some(e),
                ..Default::default()
            },
            HubEvent::Sys(e) => Self {
                sys_event: Some(e),
                ..Default::default()
            },
            HubEvent::Audio(e) => Self {
                audio_event: Some(e),
                ..Default::default()
            },
        }
    }
}
