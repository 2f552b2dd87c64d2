use crate::assets::raster::RasterImage;
use crate::foundation::color::Color;
use crate::foundation::core::{ElementRect, Point};
use crate::foundation::error::DeckResult;
use crate::render::text::FontSpec;

/// A presented frame as RGBA8 pixels.
#[derive(Clone, Debug)]
pub struct FrameRGBA {
    /// Frame width in pixels.
    pub width: u32,
    /// Frame height in pixels.
    pub height: u32,
    /// RGBA8 bytes, tightly packed, row-major.
    pub data: Vec<u8>,
    /// Whether `data` is premultiplied alpha.
    pub premultiplied: bool,
}

impl FrameRGBA {
    /// RGBA8 bytes of pixel `(x, y)`, or `None` when out of bounds.
    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let off = (y as usize * self.width as usize + x as usize) * 4;
        let px = self.data.get(off..off + 4)?;
        Some([px[0], px[1], px[2], px[3]])
    }
}

/// Raster drawing capability the renderer composites onto.
///
/// Coordinates are surface units with the origin at the top-left. Every draw call may fail; the
/// renderer logs and skips a failing element rather than aborting the frame.
pub trait Surface {
    /// Width and height in surface units.
    fn size(&self) -> (u32, u32);

    /// Erase everything drawn since the last clear.
    fn clear(&mut self) -> DeckResult<()>;

    /// Stretch `image` to fill `dest`.
    fn draw_image(&mut self, image: &RasterImage, dest: ElementRect) -> DeckResult<()>;

    /// Fill a single line of text with its alphabetic baseline at `origin`.
    fn fill_text(
        &mut self,
        text: &str,
        origin: Point,
        font: &FontSpec,
        color: Color,
    ) -> DeckResult<()>;

    fn stroke_rect(&mut self, rect: ElementRect, color: Color, line_width: f64) -> DeckResult<()>;

    fn fill_rect(&mut self, rect: ElementRect, color: Color) -> DeckResult<()>;

    /// Make the frame drawn since the last clear visible.
    fn present(&mut self) -> DeckResult<()>;

    /// Pixels of the last presented frame, for surfaces that can read back.
    fn snapshot(&self) -> Option<FrameRGBA> {
        None
    }
}
