use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use image::RgbaImage;

// Static counter for generating unique IDs
static NEXT_IMAGE_ID: AtomicU64 = AtomicU64::new(1);

/// Handle to the photographed artwork.
///
/// The pixels arrive asynchronously from whoever decodes the upload; until
/// then the handle is "loading" and renders are skipped. Clones share pixels
/// and id, and the id changes whenever the pixels do.
#[derive(Clone, Debug)]
pub struct SourceImage {
    id: u64,
    pixels: Option<Arc<RgbaImage>>,
}

impl SourceImage {
    /// A handle whose pixels are not available yet
    pub fn loading() -> Self {
        Self {
            id: NEXT_IMAGE_ID.fetch_add(1, Ordering::SeqCst),
            pixels: None,
        }
    }

    /// A complete handle with a fresh id
    pub fn loaded(pixels: RgbaImage) -> Self {
        Self {
            id: NEXT_IMAGE_ID.fetch_add(1, Ordering::SeqCst),
            pixels: Some(Arc::new(pixels)),
        }
    }

    /// Marks the image complete. Gets a fresh id.
    pub fn finish_loading(&mut self, pixels: RgbaImage) {
        self.id = NEXT_IMAGE_ID.fetch_add(1, Ordering::SeqCst);
        self.pixels = Some(Arc::new(pixels));
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn is_complete(&self) -> bool {
        self.pixels
            .as_ref()
            .is_some_and(|p| p.width() > 0 && p.height() > 0)
    }

    pub fn pixels(&self) -> Option<&RgbaImage> {
        self.pixels.as_deref()
    }

    /// Natural pixel dimensions, once loaded.
    pub fn natural_size(&self) -> Option<(u32, u32)> {
        self.pixels.as_ref().map(|p| p.dimensions())
    }
}
