use std::borrow::Cow;
use std::path::Path;

use anyhow::Context as _;

use crate::foundation::error::{DeckError, DeckResult};

/// Font selection in CSS shorthand form, e.g. `"bold 24px Helvetica"`.
///
/// Only the pixel size and the family are honoured; style/weight keywords before the size are
/// accepted and ignored.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct FontSpec {
    pub size_px: f32,
    pub family: String,
}

impl FontSpec {
    pub fn new(size_px: f32, family: impl Into<String>) -> Self {
        Self {
            size_px,
            family: family.into(),
        }
    }

    pub fn parse(s: &str) -> DeckResult<Self> {
        let mut tokens = s.split_whitespace();
        let size_px = loop {
            let Some(tok) = tokens.next() else {
                return Err(DeckError::validation(format!(
                    "font \"{s}\" has no <n>px size"
                )));
            };
            if let Some(num) = tok.strip_suffix("px") {
                break num.parse::<f32>().map_err(|_| {
                    DeckError::validation(format!("font size \"{tok}\" is not a number"))
                })?;
            }
        };
        if !size_px.is_finite() || size_px <= 0.0 {
            return Err(DeckError::validation("font size must be finite and > 0"));
        }

        let family = tokens
            .collect::<Vec<_>>()
            .join(" ")
            .trim_matches(|c| c == '"' || c == '\'')
            .to_owned();
        if family.is_empty() {
            return Err(DeckError::validation(format!(
                "font \"{s}\" has no family"
            )));
        }
        Ok(Self { size_px, family })
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
/// RGBA8 brush color used by Parley text layout.
pub(crate) struct TextBrushRgba8 {
    pub(crate) r: u8,
    pub(crate) g: u8,
    pub(crate) b: u8,
    pub(crate) a: u8,
}

/// A font registered with the layout engine.
#[derive(Clone)]
pub(crate) struct RegisteredFont {
    pub(crate) family: String,
    pub(crate) data: vello_cpu::peniko::FontData,
}

/// Parley contexts plus the set of fonts the surface can draw with.
pub(crate) struct TextLayoutEngine {
    font_ctx: parley::FontContext,
    layout_ctx: parley::LayoutContext<TextBrushRgba8>,
    fonts: Vec<RegisteredFont>,
}

impl Default for TextLayoutEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl TextLayoutEngine {
    pub(crate) fn new() -> Self {
        Self {
            font_ctx: parley::FontContext::default(),
            layout_ctx: parley::LayoutContext::new(),
            fonts: Vec::new(),
        }
    }

    pub(crate) fn has_fonts(&self) -> bool {
        !self.fonts.is_empty()
    }

    pub(crate) fn register_font_file(&mut self, path: &Path) -> DeckResult<String> {
        let bytes = std::fs::read(path)
            .with_context(|| format!("read font '{}'", path.display()))?;
        self.register_font_bytes(bytes)
    }

    /// Register raw font bytes; returns the family name the font is addressed by.
    pub(crate) fn register_font_bytes(&mut self, bytes: Vec<u8>) -> DeckResult<String> {
        let families = self
            .font_ctx
            .collection
            .register_fonts(parley::fontique::Blob::from(bytes.clone()), None);
        let family_id = families
            .first()
            .map(|(id, _)| *id)
            .ok_or_else(|| DeckError::validation("no font families registered from font bytes"))?;

        let family = self
            .font_ctx
            .collection
            .family_name(family_id)
            .ok_or_else(|| DeckError::validation("registered font family has no name"))?
            .to_string();

        let data = vello_cpu::peniko::FontData::new(vello_cpu::peniko::Blob::from(bytes), 0);
        tracing::debug!(%family, "registered font");
        self.fonts.push(RegisteredFont {
            family: family.clone(),
            data,
        });
        Ok(family)
    }

    /// Case-insensitive family lookup, falling back to the first registered font.
    pub(crate) fn resolve(&self, family: &str) -> Option<&RegisteredFont> {
        self.fonts
            .iter()
            .find(|f| f.family.eq_ignore_ascii_case(family))
            .or_else(|| self.fonts.first())
    }

    /// Shape a single unwrapped line of text with the resolved font.
    pub(crate) fn layout_line(
        &mut self,
        text: &str,
        font: &FontSpec,
        brush: TextBrushRgba8,
    ) -> DeckResult<(parley::Layout<TextBrushRgba8>, RegisteredFont)> {
        let resolved = self
            .resolve(&font.family)
            .cloned()
            .ok_or_else(|| DeckError::render("no fonts registered; cannot draw text"))?;

        let mut builder = self
            .layout_ctx
            .ranged_builder(&mut self.font_ctx, text, 1.0, true);
        builder.push_default(parley::style::StyleProperty::FontStack(
            parley::style::FontStack::Source(Cow::Owned(resolved.family.clone())),
        ));
        builder.push_default(parley::style::StyleProperty::FontSize(font.size_px));
        builder.push_default(parley::style::StyleProperty::Brush(brush));

        let mut layout: parley::Layout<TextBrushRgba8> = builder.build(text);
        layout.break_all_lines(None);
        Ok((layout, resolved))
    }
}

#[cfg(test)]
#[path = "../../tests/unit/render/text.rs"]
mod tests;
