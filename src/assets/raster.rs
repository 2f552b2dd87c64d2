use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, OnceLock};

use crate::foundation::error::{DeckError, DeckResult};

static NEXT_IMAGE_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique identity of a decoded image, used to key paint caches.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ImageId(pub u64);

impl ImageId {
    fn fresh() -> Self {
        Self(NEXT_IMAGE_ID.fetch_add(1, Ordering::Relaxed))
    }
}

/// Decoded raster image in premultiplied RGBA8 form.
///
/// Cloning is cheap; clones share pixels and identity.
#[derive(Clone, Debug)]
pub struct RasterImage {
    id: ImageId,
    width: u32,
    height: u32,
    rgba8_premul: Arc<Vec<u8>>,
}

impl RasterImage {
    /// Wrap premultiplied RGBA8 pixels, row-major and tightly packed.
    pub fn from_premul_rgba8(width: u32, height: u32, rgba8_premul: Vec<u8>) -> DeckResult<Self> {
        if width == 0 || height == 0 {
            return Err(DeckError::validation("image dimensions must be > 0"));
        }
        let expected = width as usize * height as usize * 4;
        if rgba8_premul.len() != expected {
            return Err(DeckError::validation(format!(
                "image byte length mismatch: got {}, expected {expected}",
                rgba8_premul.len()
            )));
        }
        Ok(Self {
            id: ImageId::fresh(),
            width,
            height,
            rgba8_premul: Arc::new(rgba8_premul),
        })
    }

    /// Single-color image, mostly useful for placeholders and tests.
    pub fn solid(width: u32, height: u32, straight_rgba: [u8; 4]) -> DeckResult<Self> {
        let premul = crate::foundation::core::Rgba8Premul::from_straight_rgba(
            straight_rgba[0],
            straight_rgba[1],
            straight_rgba[2],
            straight_rgba[3],
        )
        .to_array();
        let px = width as usize * height as usize;
        Self::from_premul_rgba8(width, height, premul.repeat(px))
    }

    pub fn id(&self) -> ImageId {
        self.id
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn rgba8_premul(&self) -> &[u8] {
        self.rgba8_premul.as_slice()
    }
}

/// Write-once slot holding one decoded video frame.
///
/// Slots are created empty when an extraction announces the frame count and filled from the
/// extraction worker thread as each frame finishes decoding. An empty slot is "not loaded yet".
#[derive(Debug, Default)]
pub struct FrameSlot(OnceLock<RasterImage>);

impl FrameSlot {
    pub fn pending() -> Self {
        Self(OnceLock::new())
    }

    pub fn ready(image: RasterImage) -> Self {
        let slot = Self::pending();
        let _ = slot.0.set(image);
        slot
    }

    /// Store the decoded frame. Returns `false` if the slot was already filled.
    pub fn fill(&self, image: RasterImage) -> bool {
        self.0.set(image).is_ok()
    }

    pub fn is_loaded(&self) -> bool {
        self.0.get().is_some()
    }

    pub fn get(&self) -> Option<&RasterImage> {
        self.0.get()
    }
}

#[cfg(test)]
#[path = "../../tests/unit/assets/raster.rs"]
mod tests;
