use std::cell::RefCell;
use std::rc::Rc;

use crate::foundation::color::Color;
use crate::foundation::config::EngineOpts;
use crate::foundation::core::{Point, TimeRange};
use crate::foundation::error::{DeckError, DeckResult};
use crate::interact::transform::TransformController;
use crate::playback::clock::PlaybackClock;
use crate::render::backend::{FrameRGBA, Surface};
use crate::render::text::FontSpec;
use crate::timeline::element::{Element, ElementKind};
use crate::timeline::store::ElementStore;

/// Per-frame counters returned by [`Renderer::render_frame`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize)]
pub struct RenderStats {
    /// Elements visible at the frame time.
    pub visible: usize,
    pub drawn: usize,
    /// Video elements whose sampled frame was not decoded yet.
    pub skipped_unloaded: usize,
    /// Draw calls that returned an error and were skipped.
    pub failed: usize,
}

/// Index of the video frame to show at `current_time` for an element spanning `range`.
///
/// `None` when there are no frames. At exactly `range.end` the last frame is shown; otherwise the
/// index is `floor((t - start) / 1000 * rate)` clamped into the frame list.
pub fn sample_frame_index(
    range: TimeRange,
    len: usize,
    sample_rate_hz: f64,
    current_time: f64,
) -> Option<usize> {
    let last = len.checked_sub(1)?;
    if current_time == range.end {
        return Some(last);
    }
    let raw = ((current_time - range.start) / 1000.0 * sample_rate_hz).floor();
    if !raw.is_finite() || raw <= 0.0 {
        return Some(0);
    }
    Some((raw as usize).min(last))
}

/// Composites the elements visible at the clock's current time onto a [`Surface`].
pub struct Renderer {
    store: Rc<ElementStore>,
    clock: Rc<PlaybackClock>,
    transform: Rc<TransformController>,
    surface: RefCell<Box<dyn Surface>>,
    default_font: FontSpec,
    default_text_color: Color,
}

enum Drawn {
    Drawn,
    Unloaded,
    Nothing,
}

impl Renderer {
    pub fn new(
        store: Rc<ElementStore>,
        clock: Rc<PlaybackClock>,
        transform: Rc<TransformController>,
        surface: Box<dyn Surface>,
        opts: &EngineOpts,
    ) -> DeckResult<Self> {
        let default_font = FontSpec::parse(&opts.default_font)
            .map_err(|e| DeckError::config(format!("default_font: {e}")))?;
        Ok(Self {
            store,
            clock,
            transform,
            surface: RefCell::new(surface),
            default_font,
            default_text_color: opts.default_text_color,
        })
    }

    pub fn surface_size(&self) -> (u32, u32) {
        self.surface.borrow().size()
    }

    /// Pixels of the last presented frame, if the surface can read back.
    pub fn snapshot(&self) -> Option<FrameRGBA> {
        self.surface.borrow().snapshot()
    }

    /// Clear, draw every visible element in z order, overlay the selection and present.
    ///
    /// A failing element draw is logged and counted; only `clear` and `present` failures abort
    /// the frame.
    pub fn render_frame(&self) -> DeckResult<RenderStats> {
        let mut guard = self
            .surface
            .try_borrow_mut()
            .map_err(|_| DeckError::render("render_frame re-entered while drawing"))?;
        let surface: &mut dyn Surface = &mut **guard;

        let time = self.clock.current_time();
        let visible = self.store.visible_at(time);
        let mut stats = RenderStats {
            visible: visible.len(),
            ..RenderStats::default()
        };

        surface.clear()?;
        for handle in &visible {
            let element = handle.borrow();
            match self.draw_element(surface, &element, time) {
                Ok(Drawn::Drawn) => stats.drawn += 1,
                Ok(Drawn::Unloaded) => stats.skipped_unloaded += 1,
                Ok(Drawn::Nothing) => {}
                Err(err) => {
                    stats.failed += 1;
                    tracing::warn!(
                        id = %element.id(),
                        kind = element.kind.name(),
                        error = %err,
                        "element draw failed"
                    );
                }
            }
        }
        if let Err(err) = self.transform.draw_selection(surface) {
            stats.failed += 1;
            tracing::warn!(error = %err, "selection overlay failed");
        }
        surface.present()?;

        tracing::trace!(time, ?stats, "frame rendered");
        Ok(stats)
    }

    fn draw_element(
        &self,
        surface: &mut dyn Surface,
        element: &Element,
        time: f64,
    ) -> DeckResult<Drawn> {
        let rect = element.rect;
        match &element.kind {
            ElementKind::Image { source } => {
                surface.draw_image(source, rect)?;
                Ok(Drawn::Drawn)
            }
            ElementKind::Text(content) => {
                let font = content.font.as_ref().unwrap_or(&self.default_font);
                let color = content.color.unwrap_or(self.default_text_color);
                surface.fill_text(&content.text, Point::new(rect.x, rect.y), font, color)?;
                Ok(Drawn::Drawn)
            }
            ElementKind::VideoFrames(video) => {
                let Some(index) = sample_frame_index(
                    element.time_range,
                    video.frames.len(),
                    video.sample_rate_hz,
                    time,
                ) else {
                    return Ok(Drawn::Nothing);
                };
                let Some(frame) = video.frames[index].get() else {
                    return Ok(Drawn::Unloaded);
                };
                surface.draw_image(frame, rect)?;
                Ok(Drawn::Drawn)
            }
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/render/renderer.rs"]
mod tests;
