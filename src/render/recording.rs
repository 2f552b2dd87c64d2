use std::cell::RefCell;
use std::rc::Rc;

use crate::assets::raster::{ImageId, RasterImage};
use crate::foundation::color::Color;
use crate::foundation::core::{ElementRect, Point};
use crate::foundation::error::{DeckError, DeckResult};
use crate::render::backend::Surface;
use crate::render::text::FontSpec;

/// One call made against a [`RecordingSurface`].
#[derive(Clone, Debug, PartialEq)]
pub enum DrawCommand {
    Clear,
    Image {
        image: ImageId,
        dest: ElementRect,
    },
    Text {
        text: String,
        origin: Point,
        font: FontSpec,
        color: Color,
    },
    StrokeRect {
        rect: ElementRect,
        color: Color,
        line_width: f64,
    },
    FillRect {
        rect: ElementRect,
        color: Color,
    },
    Present,
}

/// Surface that draws nothing and remembers every call.
///
/// Clones share the command log, so a test can keep one clone while the engine owns another.
#[derive(Clone, Debug)]
pub struct RecordingSurface {
    width: u32,
    height: u32,
    log: Rc<RefCell<Vec<DrawCommand>>>,
    fail_text: bool,
}

impl RecordingSurface {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            log: Rc::new(RefCell::new(Vec::new())),
            fail_text: false,
        }
    }

    /// Make every `fill_text` call fail, as a surface without fonts would.
    pub fn failing_text(mut self) -> Self {
        self.fail_text = true;
        self
    }

    pub fn commands(&self) -> Vec<DrawCommand> {
        self.log.borrow().clone()
    }

    /// Commands since the most recent `Clear`, inclusive.
    pub fn last_frame(&self) -> Vec<DrawCommand> {
        let log = self.log.borrow();
        let start = log
            .iter()
            .rposition(|c| *c == DrawCommand::Clear)
            .unwrap_or(0);
        log[start..].to_vec()
    }

    pub fn reset(&self) {
        self.log.borrow_mut().clear();
    }

    fn push(&self, cmd: DrawCommand) {
        self.log.borrow_mut().push(cmd);
    }
}

impl Surface for RecordingSurface {
    fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn clear(&mut self) -> DeckResult<()> {
        self.push(DrawCommand::Clear);
        Ok(())
    }

    fn draw_image(&mut self, image: &RasterImage, dest: ElementRect) -> DeckResult<()> {
        self.push(DrawCommand::Image {
            image: image.id(),
            dest,
        });
        Ok(())
    }

    fn fill_text(
        &mut self,
        text: &str,
        origin: Point,
        font: &FontSpec,
        color: Color,
    ) -> DeckResult<()> {
        if self.fail_text {
            return Err(DeckError::render("text drawing disabled"));
        }
        self.push(DrawCommand::Text {
            text: text.to_owned(),
            origin,
            font: font.clone(),
            color,
        });
        Ok(())
    }

    fn stroke_rect(&mut self, rect: ElementRect, color: Color, line_width: f64) -> DeckResult<()> {
        self.push(DrawCommand::StrokeRect {
            rect,
            color,
            line_width,
        });
        Ok(())
    }

    fn fill_rect(&mut self, rect: ElementRect, color: Color) -> DeckResult<()> {
        self.push(DrawCommand::FillRect { rect, color });
        Ok(())
    }

    fn present(&mut self) -> DeckResult<()> {
        self.push(DrawCommand::Present);
        Ok(())
    }
}
