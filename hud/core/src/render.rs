//! HUD Render Descriptions
//!
//! A [`RenderDescription`] is the full set of fixed-position containers that
//! make up one HUD screen. Pages build one per `render()` call and the
//! manager ships it to the bridge, either to create the startup container
//! tree or to rebuild it.
//!
//! # Container kinds
//!
//! - [`TextContainer`]: a text box; content can later be patched in place
//! - [`ImageContainer`]: an empty image slot; raw bytes are sent after creation
//! - [`ListContainer`]: a selectable list of item names
//!
//! Every container shares a [`Frame`] (id, name, geometry, border, padding and
//! the event-capture flag). Container ids must be unique within a description
//! and at most one container captures input events.

use std::collections::HashSet;

use serde::{Serialize, Serializer};
use thiserror::Error;

/// Width of the glasses display in HUD units
pub const GLASS_SCREEN_WIDTH: u32 = 576;

/// Height of the glasses display in HUD units
pub const GLASS_SCREEN_HEIGHT: u32 = 288;

/// Problems that make a description unfit for the bridge
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum RenderError {
    /// Two containers share an id
    #[error("Duplicate container id {0}")]
    DuplicateContainerId(u32),

    /// More than one container wants input events
    #[error("Containers {first} and {second} both capture events")]
    MultipleEventCapture {
        /// First capturing container
        first: u32,
        /// Second capturing container
        second: u32,
    },
}

fn serialize_flag<S: Serializer>(flag: &bool, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_u8(u8::from(*flag))
}

/// Geometry and identity shared by every container kind
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Frame {
    /// Unique id within the description
    #[serde(rename = "containerID")]
    pub id: u32,
    /// Human-readable name
    #[serde(rename = "containerName")]
    pub name: String,
    /// Left edge
    #[serde(rename = "xPosition")]
    pub x: u32,
    /// Top edge
    #[serde(rename = "yPosition")]
    pub y: u32,
    /// Width
    pub width: u32,
    /// Height
    pub height: u32,
    /// Border width (0 = none)
    pub border_width: u32,
    /// Border color index
    pub border_color: u32,
    /// Inner padding
    #[serde(rename = "paddingLength")]
    pub padding: u32,
    /// Whether this container receives pointer-style input events
    #[serde(serialize_with = "serialize_flag")]
    pub is_event_capture: bool,
}

impl Frame {
    /// Frame with the given id and name and zeroed geometry
    pub fn new(id: u32, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            ..Default::default()
        }
    }

    /// Set position
    #[must_use]
    pub fn at(mut self, x: u32, y: u32) -> Self {
        self.x = x;
        self.y = y;
        self
    }

    /// Set size
    #[must_use]
    pub fn size(mut self, width: u32, height: u32) -> Self {
        self.width = width;
        self.height = height;
        self
    }

    /// Set border width and color
    #[must_use]
    pub fn border(mut self, width: u32, color: u32) -> Self {
        self.border_width = width;
        self.border_color = color;
        self
    }

    /// Set inner padding
    #[must_use]
    pub fn padding(mut self, padding: u32) -> Self {
        self.padding = padding;
        self
    }

    /// Set whether this container captures input events
    #[must_use]
    pub fn capture(mut self, capture: bool) -> Self {
        self.is_event_capture = capture;
        self
    }
}

/// Text box container
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct TextContainer {
    /// Shared geometry
    #[serde(flatten)]
    pub frame: Frame,
    /// Text shown in the box
    pub content: String,
}

impl TextContainer {
    /// Create a text container
    pub fn new(frame: Frame, content: impl Into<String>) -> Self {
        Self {
            frame,
            content: content.into(),
        }
    }
}

/// Image slot; bytes arrive later via an image update
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ImageContainer {
    /// Shared geometry
    #[serde(flatten)]
    pub frame: Frame,
}

impl ImageContainer {
    /// Create an image container
    #[must_use]
    pub fn new(frame: Frame) -> Self {
        Self { frame }
    }
}

/// Item layout of a list container
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ListItems {
    /// Items per row
    pub item_count: u32,
    /// Width of one item
    pub item_width: u32,
    /// Draw a border around the selected item
    #[serde(rename = "isItemSelectBorderEn", serialize_with = "serialize_flag")]
    pub select_border: bool,
    /// Item labels, in display order
    #[serde(rename = "itemName")]
    pub names: Vec<String>,
}

/// Selectable list container
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ListContainer {
    /// Shared geometry
    #[serde(flatten)]
    pub frame: Frame,
    /// Corner radius of the border
    pub border_radius: u32,
    /// Item layout and labels
    #[serde(rename = "itemContainer")]
    pub items: ListItems,
}

/// One HUD screen's worth of containers
///
/// `containerTotalNum` is kept in step with the containers added, so it can
/// never disagree with what is shipped.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderDescription {
    container_total_num: usize,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    text_object: Vec<TextContainer>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    image_object: Vec<ImageContainer>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    list_object: Vec<ListContainer>,
}

impl RenderDescription {
    /// Empty description
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a text container
    #[must_use]
    pub fn with_text(mut self, container: TextContainer) -> Self {
        self.push_text(container);
        self
    }

    /// Add an image container
    #[must_use]
    pub fn with_image(mut self, container: ImageContainer) -> Self {
        self.image_object.push(container);
        self.container_total_num += 1;
        self
    }

    /// Add a list container
    #[must_use]
    pub fn with_list(mut self, container: ListContainer) -> Self {
        self.list_object.push(container);
        self.container_total_num += 1;
        self
    }

    /// Add a text container in place
    pub fn push_text(&mut self, container: TextContainer) {
        self.text_object.push(container);
        self.container_total_num += 1;
    }

    /// Number of containers in the description
    #[must_use]
    pub fn container_total_num(&self) -> usize {
        self.container_total_num
    }

    /// Text containers
    #[must_use]
    pub fn text_objects(&self) -> &[TextContainer] {
        &self.text_object
    }

    /// Image containers
    #[must_use]
    pub fn image_objects(&self) -> &[ImageContainer] {
        &self.image_object
    }

    /// List containers
    #[must_use]
    pub fn list_objects(&self) -> &[ListContainer] {
        &self.list_object
    }

    /// Frames of every container, texts first, then images, then lists
    pub fn frames(&self) -> impl Iterator<Item = &Frame> {
        self.text_object
            .iter()
            .map(|c| &c.frame)
            .chain(self.image_object.iter().map(|c| &c.frame))
            .chain(self.list_object.iter().map(|c| &c.frame))
    }

    /// Text container with the given id
    #[must_use]
    pub fn text(&self, id: u32) -> Option<&TextContainer> {
        self.text_object.iter().find(|c| c.frame.id == id)
    }

    /// Id of the container that captures input events, if any
    #[must_use]
    pub fn event_capture_id(&self) -> Option<u32> {
        self.frames().find(|f| f.is_event_capture).map(|f| f.id)
    }

    /// Check the description before it is sent to the bridge
    ///
    /// # Errors
    ///
    /// Fails on duplicate container ids or more than one capturing container.
    pub fn validate(&self) -> Result<(), RenderError> {
        let mut seen = HashSet::new();
        let mut capture: Option<u32> = None;

        for frame in self.frames() {
            if !seen.insert(frame.id) {
                return Err(RenderError::DuplicateContainerId(frame.id));
            }
            if frame.is_event_capture {
                if let Some(first) = capture {
                    return Err(RenderError::MultipleEventCapture {
                        first,
                        second: frame.id,
                    });
                }
                capture = Some(frame.id);
            }
        }
        Ok(())
    }
}
