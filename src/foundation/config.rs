use std::path::{Path, PathBuf};

use anyhow::Context as _;

use crate::foundation::color::Color;
use crate::foundation::core::Canvas;
use crate::foundation::error::{DeckError, DeckResult};

/// Engine-wide options.
///
/// Every field has a default, so a JSON file only needs to name what it overrides.
#[derive(Clone, Debug, PartialEq, serde::Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EngineOpts {
    /// Drawing surface size used by [`crate::CpuSurface`].
    pub canvas: Canvas,
    /// If set, the surface is filled with this straight RGBA8 color on every clear.
    pub clear_rgba: Option<[u8; 4]>,
    /// Sampling rate for frame extraction and video frame selection.
    pub sample_rate_hz: f64,
    /// Side of the square corner hit-zones and selection handles.
    pub handle_size: f64,
    pub selection_color: Color,
    pub selection_line_width: f64,
    /// CSS-like font shorthand used when a text element has none (`"30px Arial"`).
    pub default_font: String,
    pub default_text_color: Color,
    /// Font files registered with the CPU surface at construction.
    pub font_paths: Vec<PathBuf>,
    /// Maximum number of decoded images kept as ready-to-draw paints.
    pub image_cache_capacity: usize,
}

impl Default for EngineOpts {
    fn default() -> Self {
        Self {
            canvas: Canvas {
                width: 1280,
                height: 720,
            },
            clear_rgba: None,
            sample_rate_hz: 30.0,
            handle_size: 10.0,
            selection_color: Color::rgba(0.0, 0.0, 1.0, 0.5),
            selection_line_width: 2.0,
            default_font: "30px Arial".to_owned(),
            default_text_color: Color::BLACK,
            font_paths: Vec::new(),
            image_cache_capacity: 64,
        }
    }
}

impl EngineOpts {
    /// Load options from a JSON file, then apply environment overrides.
    pub fn from_json_path(path: &Path) -> DeckResult<Self> {
        let bytes = std::fs::read(path)
            .with_context(|| format!("read engine options '{}'", path.display()))?;
        let opts: EngineOpts = serde_json::from_slice(&bytes)
            .map_err(|e| DeckError::config(format!("parse engine options: {e}")))?;
        opts.with_env_overrides().validated()
    }

    /// Apply `FRAMEDECK_*` environment overrides. Unparseable values are ignored.
    pub fn with_env_overrides(mut self) -> Self {
        if let Some(v) = env_parse::<f64>("FRAMEDECK_SAMPLE_RATE_HZ") {
            self.sample_rate_hz = v;
        }
        if let Some(v) = env_parse::<f64>("FRAMEDECK_HANDLE_SIZE") {
            self.handle_size = v;
        }
        if let Some(v) = env_parse::<usize>("FRAMEDECK_IMAGE_CACHE_CAPACITY").filter(|&n| n > 0) {
            self.image_cache_capacity = v;
        }
        self
    }

    pub fn validated(self) -> DeckResult<Self> {
        if self.canvas.is_empty() {
            return Err(DeckError::config("canvas width and height must be > 0"));
        }
        if !self.sample_rate_hz.is_finite() || self.sample_rate_hz <= 0.0 {
            return Err(DeckError::config("sample_rate_hz must be finite and > 0"));
        }
        if !self.handle_size.is_finite() || self.handle_size < 0.0 {
            return Err(DeckError::config("handle_size must be finite and >= 0"));
        }
        Ok(self)
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|v| v.trim().parse::<T>().ok())
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/config.rs"]
mod tests;
