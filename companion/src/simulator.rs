//! Simulator Console
//!
//! Stands in for the glasses when no device is attached. Lines typed on
//! stdin become hardware events; every call the engine makes to the bridge
//! is printed to stdout.
//!
//! | input            | event                                   |
//! |------------------|-----------------------------------------|
//! | `click` / `c`    | single tap                              |
//! | `double` / `d`   | double tap                              |
//! | `up` / `down`    | scroll past the top / bottom            |
//! | `select N`       | list selection of item N                |
//! | `audio N`        | one PCM frame at N% of full scale       |
//! | `{...}`          | raw JSON envelope (`listEvent`, ...)    |
//! | `quit` / `q`     | leave                                   |

use hud_core::bridge::{BridgeCall, HubEvent, RawHubEvent};
use hud_core::render::RenderDescription;
use thiserror::Error;

/// Samples in a synthesized audio frame
const AUDIO_FRAME_SAMPLES: usize = 320;

pub const HELP: &str = "\
commands: click (c), double (d), up, down, select N, audio N, {raw json}, help, quit (q)";

/// One parsed console line
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Input {
    Event(HubEvent),
    Raw(RawHubEvent),
    Help,
    Quit,
    Blank,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum InputError {
    #[error("unknown command '{0}' (try 'help')")]
    Unknown(String),

    #[error("'{command}' needs a number: {reason}")]
    BadArgument {
        command: &'static str,
        reason: String,
    },

    #[error("invalid raw event: {0}")]
    BadJson(String),
}

/// Parse one console line
///
/// # Errors
///
/// Unknown commands, missing or non-numeric arguments, and malformed JSON.
pub fn parse_input(line: &str) -> Result<Input, InputError> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(Input::Blank);
    }
    if line.starts_with('{') {
        return serde_json::from_str(line)
            .map(Input::Raw)
            .map_err(|e| InputError::BadJson(e.to_string()));
    }

    let mut words = line.split_whitespace();
    let command = words.next().unwrap_or_default().to_lowercase();
    let argument = words.next();

    match command.as_str() {
        "click" | "c" => Ok(Input::Event(HubEvent::click())),
        "double" | "d" => Ok(Input::Event(HubEvent::double_click())),
        "up" => Ok(Input::Event(HubEvent::scroll_up())),
        "down" => Ok(Input::Event(HubEvent::scroll_down())),
        "select" | "s" => {
            let index = number(argument, "select")?;
            Ok(Input::Event(HubEvent::select(index)))
        }
        "audio" | "a" => {
            let level: u8 = number(argument, "audio")?;
            Ok(Input::Event(HubEvent::audio(tone(level))))
        }
        "help" | "h" | "?" => Ok(Input::Help),
        "quit" | "q" | "exit" => Ok(Input::Quit),
        other => Err(InputError::Unknown(other.to_string())),
    }
}

fn number<T>(argument: Option<&str>, command: &'static str) -> Result<T, InputError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    let raw = argument.ok_or_else(|| InputError::BadArgument {
        command,
        reason: "missing".to_string(),
    })?;
    raw.parse().map_err(|e: T::Err| InputError::BadArgument {
        command,
        reason: e.to_string(),
    })
}

/// Square wave PCM frame at `level` percent of full scale
#[must_use]
pub fn tone(level: u8) -> Vec<u8> {
    let amplitude = i32::from(i16::MAX) * i32::from(level.min(100)) / 100;
    let amplitude = i16::try_from(amplitude).unwrap_or(i16::MAX);

    (0..AUDIO_FRAME_SAMPLES)
        .flat_map(|i| {
            let sample = if i % 2 == 0 { amplitude } else { -amplitude };
            sample.to_le_bytes()
        })
        .collect()
}

/// Human-readable rendition of a bridge call
#[must_use]
pub fn describe(call: &BridgeCall) -> String {
    match call {
        BridgeCall::CreateStartup(description) => screen("startup", description),
        BridgeCall::Rebuild(description) => screen("rebuild", description),
        BridgeCall::TextUpgrade(upgrade) => {
            format!("── text #{} ──\n{}", upgrade.container_id, upgrade.content)
        }
        BridgeCall::ImageUpdate(update) => format!(
            "── image #{} {} ── {} bytes",
            update.container_id,
            update.container_name,
            update.image_data.len()
        ),
        BridgeCall::AudioControl(enabled) => {
            format!("── mic {} ──", if *enabled { "on" } else { "off" })
        }
    }
}

fn screen(kind: &str, description: &RenderDescription) -> String {
    let mut out = format!(
        "══ {kind}: {} container(s) ══",
        description.container_total_num()
    );

    for text in description.text_objects() {
        let capture = if text.frame.is_event_capture { " *" } else { "" };
        out.push_str(&format!(
            "\n── text #{} {}{capture} ──\n{}",
            text.frame.id, text.frame.name, text.content
        ));
    }
    for image in description.image_objects() {
        out.push_str(&format!(
            "\n── image #{} {} {}x{} ──",
            image.frame.id, image.frame.name, image.frame.width, image.frame.height
        ));
    }
    for list in description.list_objects() {
        out.push_str(&format!("\n── list #{} {} ──", list.frame.id, list.frame.name));
        for (index, name) in list.items.names.iter().enumerate() {
            out.push_str(&format!("\n  {index}: {name}"));
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use hud_core::bridge::{ListItemEvent, TextContainerUpgrade};
    use hud_core::render::{Frame, TextContainer};
    use pretty_assertions::assert_eq;

    #[test]
    fn test_parse_commands() {
        assert_eq!(parse_input("click"), Ok(Input::Event(HubEvent::click())));
        assert_eq!(parse_input("  D "), Ok(Input::Event(HubEvent::double_click())));
        assert_eq!(parse_input("down"), Ok(Input::Event(HubEvent::scroll_down())));
        assert_eq!(parse_input("select 3"), Ok(Input::Event(HubEvent::select(3))));
        assert_eq!(parse_input("q"), Ok(Input::Quit));
        assert_eq!(parse_input(""), Ok(Input::Blank));
    }

    #[test]
    fn test_parse_errors() {
        assert_eq!(
            parse_input("jump"),
            Err(InputError::Unknown("jump".to_string()))
        );
        assert!(matches!(
            parse_input("select"),
            Err(InputError::BadArgument { command: "select", .. })
        ));
        assert!(matches!(
            parse_input("audio loud"),
            Err(InputError::BadArgument { command: "audio", .. })
        ));
        assert!(matches!(parse_input("{not json"), Err(InputError::BadJson(_))));
    }

    #[test]
    fn test_parse_raw_envelope() {
        let input = parse_input(r#"{"listEvent": {"currentSelectItemIndex": 4}}"#).unwrap();
        let Input::Raw(raw) = input else {
            panic!("expected raw envelope");
        };
        assert_eq!(raw.list_event, Some(ListItemEvent::select(4)));
        assert_eq!(raw.sys_event, None);
    }

    #[test]
    fn test_tone_levels() {
        let silent = tone(0);
        assert_eq!(silent.len(), AUDIO_FRAME_SAMPLES * 2);
        assert!(silent.iter().all(|b| *b == 0));

        let full = tone(200);
        assert_eq!(i16::from_le_bytes([full[0], full[1]]), i16::MAX);
        assert_eq!(i16::from_le_bytes([full[2], full[3]]), -i16::MAX);
    }

    #[test]
    fn test_describe_calls() {
        let description = RenderDescription::new().with_text(TextContainer::new(
            Frame::new(2, "body").capture(true),
            "本文",
        ));
        assert_eq!(
            describe(&BridgeCall::Rebuild(description)),
            "══ rebuild: 1 container(s) ══\n── text #2 body * ──\n本文"
        );
        assert_eq!(
            describe(&BridgeCall::TextUpgrade(TextContainerUpgrade::new(1, "click: 1"))),
            "── text #1 ──\nclick: 1"
        );
        assert_eq!(describe(&BridgeCall::AudioControl(false)), "── mic off ──");
    }
}
