use crate::foundation::error::{DeckError, DeckResult};

pub use kurbo::{Point, Vec2};

/// Visibility window `[start, end]` in milliseconds of timeline time.
///
/// The window is half-open (`start <= t < end`) with one exception: `t == end` still counts as
/// visible when the window is non-empty, so the final instant of a clip keeps its last frame on
/// screen. Zero-length windows are never visible.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct TimeRange {
    /// Inclusive start in milliseconds.
    pub start: f64,
    /// End in milliseconds (see type docs for the boundary rule).
    pub end: f64,
}

impl TimeRange {
    /// Create a validated range with finite bounds and `start <= end`.
    pub fn new(start: f64, end: f64) -> DeckResult<Self> {
        if !start.is_finite() || !end.is_finite() {
            return Err(DeckError::validation("TimeRange bounds must be finite"));
        }
        if start > end {
            return Err(DeckError::validation("TimeRange start must be <= end"));
        }
        Ok(Self { start, end })
    }

    /// Window length in milliseconds.
    pub fn duration_ms(self) -> f64 {
        self.end - self.start
    }

    /// Return `true` when the window has zero length.
    pub fn is_empty(self) -> bool {
        self.start == self.end
    }

    /// Return `true` when an element with this window should be drawn at `time_ms`.
    pub fn is_visible_at(self, time_ms: f64) -> bool {
        let inside = self.start <= time_ms && time_ms < self.end;
        inside || (time_ms == self.end && self.end > self.start)
    }
}

/// Axis-aligned element rectangle in surface units.
///
/// Width and height are allowed to go negative while a resize drag crosses the opposite edge;
/// nothing in the engine normalizes them.
#[derive(Clone, Copy, Debug, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ElementRect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl ElementRect {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Square of side `size` centred on `p`.
    pub fn centered_square(p: Point, size: f64) -> Self {
        Self::new(p.x - size / 2.0, p.y - size / 2.0, size, size)
    }

    /// Inclusive point containment, evaluated literally on `x..=x+width` / `y..=y+height`.
    ///
    /// A rect with negative width or height contains nothing.
    pub fn contains(&self, p: Point) -> bool {
        p.x >= self.x && p.x <= self.x + self.width && p.y >= self.y && p.y <= self.y + self.height
    }

    pub fn top_left(&self) -> Point {
        Point::new(self.x, self.y)
    }

    pub fn top_right(&self) -> Point {
        Point::new(self.x + self.width, self.y)
    }

    pub fn bottom_left(&self) -> Point {
        Point::new(self.x, self.y + self.height)
    }

    pub fn bottom_right(&self) -> Point {
        Point::new(self.x + self.width, self.y + self.height)
    }

    pub fn translate(self, delta: Vec2) -> Self {
        Self {
            x: self.x + delta.x,
            y: self.y + delta.y,
            ..self
        }
    }

    /// Convert to a `kurbo` rect without normalizing negative extents.
    pub fn to_kurbo(self) -> kurbo::Rect {
        kurbo::Rect::new(self.x, self.y, self.x + self.width, self.y + self.height)
    }
}

/// Drawing surface dimensions in pixels.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Canvas {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

impl Canvas {
    /// Return `true` when either dimension is zero.
    pub fn is_empty(self) -> bool {
        self.width == 0 || self.height == 0
    }
}

/// Premultiplied RGBA8 (r,g,b already multiplied by a).
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Rgba8Premul {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Rgba8Premul {
    /// Fully transparent black.
    pub fn transparent() -> Self {
        Self {
            r: 0,
            g: 0,
            b: 0,
            a: 0,
        }
    }

    /// Convert straight-alpha RGBA8 into premultiplied RGBA8.
    pub fn from_straight_rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
        fn premul(c: u8, a: u8) -> u8 {
            let c = u16::from(c);
            let a = u16::from(a);
            (((c * a) + 127) / 255) as u8
        }

        Self {
            r: premul(r, a),
            g: premul(g, a),
            b: premul(b, a),
            a,
        }
    }

    pub fn to_array(self) -> [u8; 4] {
        [self.r, self.g, self.b, self.a]
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/core.rs"]
mod tests;
