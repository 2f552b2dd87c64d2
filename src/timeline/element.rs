use std::cell::RefCell;
use std::fmt;
use std::path::PathBuf;
use std::rc::Rc;
use std::sync::Arc;

use crate::assets::raster::{FrameSlot, RasterImage};
use crate::foundation::color::Color;
use crate::foundation::core::{ElementRect, TimeRange};
use crate::render::text::FontSpec;

/// Opaque element identifier, fixed at creation.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ElementId(Arc<str>);

impl ElementId {
    pub fn new(id: impl AsRef<str>) -> Self {
        Self(Arc::from(id.as_ref()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for ElementId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for ElementId {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

impl serde::Serialize for ElementId {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

impl fmt::Display for ElementId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Decoded frame sequence of a video source plus the rate it was sampled at.
#[derive(Clone, Debug)]
pub struct VideoFrames {
    /// Ordered frames; a slot may still be empty while extraction is decoding it.
    pub frames: Vec<Arc<FrameSlot>>,
    /// Frames per second used both to extract and to pick a frame for a given time.
    pub sample_rate_hz: f64,
    /// Media file to extract from when `frames` is empty.
    pub source: Option<PathBuf>,
}

impl VideoFrames {
    /// Video that will be filled by frame extraction once added to an engine.
    pub fn from_source(source: impl Into<PathBuf>, sample_rate_hz: f64) -> Self {
        Self {
            frames: Vec::new(),
            sample_rate_hz,
            source: Some(source.into()),
        }
    }

    /// Video made of already decoded frames.
    pub fn from_images(images: impl IntoIterator<Item = RasterImage>, sample_rate_hz: f64) -> Self {
        Self {
            frames: images
                .into_iter()
                .map(|img| Arc::new(FrameSlot::ready(img)))
                .collect(),
            sample_rate_hz,
            source: None,
        }
    }

    pub fn needs_extraction(&self) -> bool {
        self.frames.is_empty() && self.source.is_some()
    }

    pub fn loaded_count(&self) -> usize {
        self.frames.iter().filter(|f| f.is_loaded()).count()
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct TextContent {
    pub text: String,
    /// Falls back to the engine default font.
    pub font: Option<FontSpec>,
    /// Falls back to the engine default text color.
    pub color: Option<Color>,
}

impl TextContent {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            font: None,
            color: None,
        }
    }

    pub fn with_font(mut self, font: FontSpec) -> Self {
        self.font = Some(font);
        self
    }

    pub fn with_color(mut self, color: Color) -> Self {
        self.color = Some(color);
        self
    }
}

/// Content of an element. Each variant has its own draw rule in the renderer.
#[derive(Clone, Debug)]
pub enum ElementKind {
    Image { source: RasterImage },
    VideoFrames(VideoFrames),
    Text(TextContent),
}

impl ElementKind {
    pub fn name(&self) -> &'static str {
        match self {
            ElementKind::Image { .. } => "image",
            ElementKind::VideoFrames(_) => "video-frames",
            ElementKind::Text(_) => "text",
        }
    }
}

/// A timeline-placed visual unit.
#[derive(Clone, Debug)]
pub struct Element {
    id: ElementId,
    pub rect: ElementRect,
    pub time_range: TimeRange,
    pub z_index: i32,
    pub kind: ElementKind,
}

impl Element {
    pub fn new(
        id: impl Into<ElementId>,
        rect: ElementRect,
        time_range: TimeRange,
        kind: ElementKind,
    ) -> Self {
        Self {
            id: id.into(),
            rect,
            time_range,
            z_index: 0,
            kind,
        }
    }

    pub fn with_z_index(mut self, z_index: i32) -> Self {
        self.z_index = z_index;
        self
    }

    pub fn id(&self) -> &ElementId {
        &self.id
    }

    /// Merge the fields present in `patch`. Returns `true` when the z-index changed.
    pub(crate) fn apply(&mut self, patch: &ElementPatch) -> bool {
        if let Some(rect) = patch.rect {
            self.rect = rect;
        }
        if let Some(range) = patch.time_range {
            self.time_range = range;
        }
        if let Some(kind) = &patch.kind {
            self.kind = kind.clone();
        }
        if let (Some(frames), ElementKind::VideoFrames(video)) = (&patch.frames, &mut self.kind) {
            video.frames = frames.clone();
        }
        match patch.z_index {
            Some(z) if z != self.z_index => {
                self.z_index = z;
                true
            }
            _ => false,
        }
    }
}

/// Shared, live reference to an element owned by the store.
///
/// The transform controller keeps one of these for the selected element so a drag mutates the
/// very object the store holds.
pub type ElementHandle = Rc<RefCell<Element>>;

/// Partial update; absent fields are left untouched. The id can never be patched.
#[derive(Clone, Debug, Default)]
pub struct ElementPatch {
    pub rect: Option<ElementRect>,
    pub time_range: Option<TimeRange>,
    pub z_index: Option<i32>,
    pub kind: Option<ElementKind>,
    /// Replaces the frame sequence of a `VideoFrames` element; ignored for other kinds.
    pub frames: Option<Vec<Arc<FrameSlot>>>,
}

impl ElementPatch {
    pub fn rect(rect: ElementRect) -> Self {
        Self {
            rect: Some(rect),
            ..Self::default()
        }
    }

    pub fn time_range(range: TimeRange) -> Self {
        Self {
            time_range: Some(range),
            ..Self::default()
        }
    }

    pub fn z_index(z: i32) -> Self {
        Self {
            z_index: Some(z),
            ..Self::default()
        }
    }

    pub fn kind(kind: ElementKind) -> Self {
        Self {
            kind: Some(kind),
            ..Self::default()
        }
    }

    pub fn frames(frames: Vec<Arc<FrameSlot>>) -> Self {
        Self {
            frames: Some(frames),
            ..Self::default()
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/timeline/element.rs"]
mod tests;
