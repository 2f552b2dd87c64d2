use std::collections::{HashMap, VecDeque};
use std::path::Path;
use std::sync::Arc;

use crate::assets::raster::{ImageId, RasterImage};
use crate::foundation::color::Color;
use crate::foundation::config::EngineOpts;
use crate::foundation::core::{ElementRect, Point};
use crate::foundation::error::{DeckError, DeckResult};
use crate::render::backend::{FrameRGBA, Surface};
use crate::render::text::{FontSpec, TextBrushRgba8, TextLayoutEngine};

/// Software [`Surface`] rendered with `vello_cpu`.
///
/// Draw calls are recorded into a render context between `clear` and `present`; `present`
/// rasterizes them into the pixmap returned by [`Surface::snapshot`].
pub struct CpuSurface {
    width: u16,
    height: u16,
    clear_rgba: Option<[u8; 4]>,
    ctx: vello_cpu::RenderContext,
    presented: vello_cpu::Pixmap,
    text: TextLayoutEngine,
    image_cache: HashMap<ImageId, vello_cpu::Image>,
    lru: VecDeque<ImageId>,
    cache_capacity: usize,
}

impl CpuSurface {
    /// Create a surface of `opts.canvas` size and register `opts.font_paths`.
    pub fn new(opts: &EngineOpts) -> DeckResult<Self> {
        let width: u16 = opts
            .canvas
            .width
            .try_into()
            .map_err(|_| DeckError::config("surface width exceeds u16"))?;
        let height: u16 = opts
            .canvas
            .height
            .try_into()
            .map_err(|_| DeckError::config("surface height exceeds u16"))?;
        if width == 0 || height == 0 {
            return Err(DeckError::config("surface width and height must be > 0"));
        }

        let mut surface = Self {
            width,
            height,
            clear_rgba: opts.clear_rgba,
            ctx: vello_cpu::RenderContext::new(width, height),
            presented: vello_cpu::Pixmap::new(width, height),
            text: TextLayoutEngine::new(),
            image_cache: HashMap::new(),
            lru: VecDeque::new(),
            cache_capacity: opts.image_cache_capacity.max(1),
        };
        for path in &opts.font_paths {
            surface.register_font_file(path)?;
        }
        Ok(surface)
    }

    /// Register a font file; returns the family name text elements can refer to.
    pub fn register_font_file(&mut self, path: &Path) -> DeckResult<String> {
        self.text.register_font_file(path)
    }

    pub fn register_font_bytes(&mut self, bytes: Vec<u8>) -> DeckResult<String> {
        self.text.register_font_bytes(bytes)
    }

    pub fn has_fonts(&self) -> bool {
        self.text.has_fonts()
    }

    fn image_paint_for(&mut self, image: &RasterImage) -> DeckResult<vello_cpu::Image> {
        let id = image.id();
        if let Some(paint) = self.image_cache.get(&id).cloned() {
            self.touch(id);
            return Ok(paint);
        }

        let pixmap = image_premul_bytes_to_pixmap(image.rgba8_premul(), image.width(), image.height())?;
        let paint = vello_cpu::Image {
            image: vello_cpu::ImageSource::Pixmap(Arc::new(pixmap)),
            sampler: vello_cpu::peniko::ImageSampler::default(),
        };
        self.image_cache.insert(id, paint.clone());
        self.touch(id);
        while self.lru.len() > self.cache_capacity {
            if let Some(old) = self.lru.pop_front() {
                self.image_cache.remove(&old);
            }
        }
        Ok(paint)
    }

    fn touch(&mut self, id: ImageId) {
        if let Some(pos) = self.lru.iter().position(|x| *x == id) {
            self.lru.remove(pos);
        }
        self.lru.push_back(id);
    }

    fn set_solid_paint(&mut self, color: Color) {
        let [r, g, b, a] = color.to_rgba8();
        self.ctx.set_paint_transform(vello_cpu::kurbo::Affine::IDENTITY);
        self.ctx.set_transform(vello_cpu::kurbo::Affine::IDENTITY);
        self.ctx
            .set_paint(vello_cpu::peniko::Color::from_rgba8(r, g, b, a));
    }
}

impl Surface for CpuSurface {
    fn size(&self) -> (u32, u32) {
        (u32::from(self.width), u32::from(self.height))
    }

    fn clear(&mut self) -> DeckResult<()> {
        self.ctx = vello_cpu::RenderContext::new(self.width, self.height);
        if let Some([r, g, b, a]) = self.clear_rgba {
            self.set_solid_paint(Color::from_rgba8(r, g, b, a));
            self.ctx.fill_rect(&vello_cpu::kurbo::Rect::new(
                0.0,
                0.0,
                f64::from(self.width),
                f64::from(self.height),
            ));
        }
        Ok(())
    }

    fn draw_image(&mut self, image: &RasterImage, dest: ElementRect) -> DeckResult<()> {
        let paint = self.image_paint_for(image)?;
        let (iw, ih) = (f64::from(image.width()), f64::from(image.height()));
        let transform = vello_cpu::kurbo::Affine::translate((dest.x, dest.y))
            * vello_cpu::kurbo::Affine::scale_non_uniform(dest.width / iw, dest.height / ih);

        self.ctx.set_paint_transform(vello_cpu::kurbo::Affine::IDENTITY);
        self.ctx.set_transform(transform);
        self.ctx.set_paint(paint);
        self.ctx
            .fill_rect(&vello_cpu::kurbo::Rect::new(0.0, 0.0, iw, ih));
        Ok(())
    }

    fn fill_text(
        &mut self,
        text: &str,
        origin: Point,
        font: &FontSpec,
        color: Color,
    ) -> DeckResult<()> {
        let [r, g, b, a] = color.to_rgba8();
        let (layout, resolved) = self
            .text
            .layout_line(text, font, TextBrushRgba8 { r, g, b, a })?;
        let baseline = layout
            .lines()
            .next()
            .map_or(0.0, |line| f64::from(line.metrics().baseline));

        self.ctx.set_paint_transform(vello_cpu::kurbo::Affine::IDENTITY);
        self.ctx.set_transform(vello_cpu::kurbo::Affine::translate((
            origin.x,
            origin.y - baseline,
        )));
        for line in layout.lines() {
            for item in line.items() {
                let parley::layout::PositionedLayoutItem::GlyphRun(run) = item else {
                    continue;
                };
                let brush = run.style().brush;
                self.ctx.set_paint(vello_cpu::peniko::Color::from_rgba8(
                    brush.r, brush.g, brush.b, brush.a,
                ));
                let glyphs = run.positioned_glyphs().map(|g| vello_cpu::Glyph {
                    id: g.id,
                    x: g.x,
                    y: g.y,
                });
                self.ctx
                    .glyph_run(&resolved.data)
                    .font_size(run.run().font_size())
                    .fill_glyphs(glyphs);
            }
        }
        Ok(())
    }

    fn stroke_rect(&mut self, rect: ElementRect, color: Color, line_width: f64) -> DeckResult<()> {
        // Four edge bands centred on the outline, like a canvas stroke.
        let r = rect.to_kurbo();
        let (x0, y0, x1, y1) = (r.x0.min(r.x1), r.y0.min(r.y1), r.x0.max(r.x1), r.y0.max(r.y1));
        let h = line_width.max(0.0) / 2.0;
        self.set_solid_paint(color);
        for band in [
            vello_cpu::kurbo::Rect::new(x0 - h, y0 - h, x1 + h, y0 + h),
            vello_cpu::kurbo::Rect::new(x0 - h, y1 - h, x1 + h, y1 + h),
            vello_cpu::kurbo::Rect::new(x0 - h, y0 + h, x0 + h, y1 - h),
            vello_cpu::kurbo::Rect::new(x1 - h, y0 + h, x1 + h, y1 - h),
        ] {
            self.ctx.fill_rect(&band);
        }
        Ok(())
    }

    fn fill_rect(&mut self, rect: ElementRect, color: Color) -> DeckResult<()> {
        let r = rect.to_kurbo();
        self.set_solid_paint(color);
        self.ctx.fill_rect(&vello_cpu::kurbo::Rect::new(
            r.x0.min(r.x1),
            r.y0.min(r.y1),
            r.x0.max(r.x1),
            r.y0.max(r.y1),
        ));
        Ok(())
    }

    fn present(&mut self) -> DeckResult<()> {
        let mut pixmap = vello_cpu::Pixmap::new(self.width, self.height);
        self.ctx.flush();
        self.ctx.render_to_pixmap(&mut pixmap);
        self.presented = pixmap;
        Ok(())
    }

    fn snapshot(&self) -> Option<FrameRGBA> {
        Some(FrameRGBA {
            width: u32::from(self.width),
            height: u32::from(self.height),
            data: self.presented.data_as_u8_slice().to_vec(),
            premultiplied: true,
        })
    }
}

fn image_premul_bytes_to_pixmap(
    rgba8_premul: &[u8],
    width: u32,
    height: u32,
) -> DeckResult<vello_cpu::Pixmap> {
    let w: u16 = width
        .try_into()
        .map_err(|_| DeckError::render("image width exceeds u16"))?;
    let h: u16 = height
        .try_into()
        .map_err(|_| DeckError::render("image height exceeds u16"))?;
    if rgba8_premul.len() != width as usize * height as usize * 4 {
        return Err(DeckError::render("image byte length mismatch"));
    }

    let mut may_have_opacities = false;
    let mut pixels = Vec::with_capacity(width as usize * height as usize);
    for px in rgba8_premul.chunks_exact(4) {
        let a = px[3];
        may_have_opacities |= a != 255;
        pixels.push(vello_cpu::peniko::color::PremulRgba8 {
            r: px[0],
            g: px[1],
            b: px[2],
            a,
        });
    }

    Ok(vello_cpu::Pixmap::from_parts_with_opacity(
        pixels,
        w,
        h,
        may_have_opacities,
    ))
}

#[cfg(test)]
#[path = "../../tests/unit/render/cpu.rs"]
mod tests;
