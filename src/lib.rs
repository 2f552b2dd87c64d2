//! framedeck is a time-driven canvas compositing engine.
//!
//! Elements (still images, decoded video frame sequences and text) live on a timeline. A playback
//! clock advances a current time, the renderer composites every element visible at that time in
//! z order, and a pointer-driven transform controller moves and resizes the selected element.
//!
//! - Build an [`Engine`] with [`EngineBuilder`]
//! - Add [`Element`]s and drive playback with [`Engine::play`] and [`Engine::drive_frame`]
//! - Observe [`EngineEvent`]s with [`Engine::subscribe`]
#![forbid(unsafe_code)]

pub mod assets;
pub mod engine;
pub mod events;
pub mod foundation;
pub mod interact;
pub mod playback;
pub mod render;
pub mod timeline;

pub use crate::foundation::color::Color;
pub use crate::foundation::config::EngineOpts;
pub use crate::foundation::core::{Canvas, ElementRect, Point, Rgba8Premul, TimeRange, Vec2};
pub use crate::foundation::error::{DeckError, DeckResult};

pub use crate::assets::decode::{decode_image, load_image, unpremultiply_rgba8_in_place};
pub use crate::assets::extract::{FfmpegFrameExtractor, FrameExtractor};
pub use crate::assets::raster::{FrameSlot, ImageId, RasterImage};
pub use crate::engine::events::{EngineEvent, EngineEventKind};
pub use crate::engine::session::{Engine, EngineBuilder};
pub use crate::events::hub::{EventHub, HubEvent, SubscriptionId};
pub use crate::interact::transform::{Handle, TransformController, TransformPhase};
pub use crate::playback::clock::{PlaybackClock, PlaybackState};
pub use crate::playback::ticker::{
    FrameQueue, FrameScheduler, ManualTime, MonotonicTime, TickToken, TimeSource,
};
pub use crate::render::backend::{FrameRGBA, Surface};
pub use crate::render::cpu::CpuSurface;
pub use crate::render::recording::{DrawCommand, RecordingSurface};
pub use crate::render::renderer::{RenderStats, Renderer, sample_frame_index};
pub use crate::render::text::FontSpec;
pub use crate::timeline::element::{
    Element, ElementHandle, ElementId, ElementKind, ElementPatch, TextContent, VideoFrames,
};
pub use crate::timeline::store::ElementStore;
