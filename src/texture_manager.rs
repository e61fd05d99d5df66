use std::collections::HashMap;

use egui::{ColorImage, Context, TextureHandle, TextureId, TextureOptions};
use image::RgbaImage;
use thiserror::Error;

/// Errors that can occur while turning a raster into an egui texture
#[derive(Error, Debug)]
pub enum TextureError {
    #[error("image has zero width or height")]
    InvalidDimensions,
}

/// What a cached texture shows
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TextureSlot {
    /// The photographed artwork
    Source,
    /// The latest composite preview
    Preview,
    /// The unwarped outline the window is edited over
    Rectified,
}

type CacheKey = (TextureSlot, u64);

/// Caches the viewer's textures by (slot, version) and evicts the least
/// recently used ones.
pub struct TextureManager {
    texture_cache: HashMap<CacheKey, TextureHandle>,
    last_used: HashMap<CacheKey, u64>,
    current_frame: u64,
    max_cache_size: usize,
}

impl TextureManager {
    /// A cache that keeps at most `max_cache_size` textures.
    pub fn new(max_cache_size: usize) -> Self {
        Self {
            texture_cache: HashMap::new(),
            last_used: HashMap::new(),
            current_frame: 0,
            max_cache_size,
        }
    }

    /// Call at the start of each frame.
    pub fn begin_frame(&mut self) {
        self.current_frame += 1;
    }

    /// Returns the cached texture for `(slot, version)`, uploading the
    /// output of `generator` on a miss.
    pub fn get_or_create_texture<F>(
        &mut self,
        slot: TextureSlot,
        version: u64,
        generator: F,
        ctx: &Context,
    ) -> Result<TextureId, TextureError>
    where
        F: FnOnce() -> Result<ColorImage, TextureError>,
    {
        let cache_key = (slot, version);

        if let Some(handle) = self.texture_cache.get(&cache_key) {
            self.last_used.insert(cache_key, self.current_frame);
            return Ok(handle.id());
        }

        let image = generator()?;
        let name = format!("{slot:?}_v{version}");
        let handle = ctx.load_texture(name, image, TextureOptions::LINEAR);

        self.texture_cache.insert(cache_key, handle.clone());
        self.last_used.insert(cache_key, self.current_frame);
        self.prune_cache_if_needed();

        Ok(handle.id())
    }

    fn prune_cache_if_needed(&mut self) {
        if self.texture_cache.len() <= self.max_cache_size {
            return;
        }

        let mut entries: Vec<(CacheKey, u64)> =
            self.last_used.iter().map(|(k, v)| (*k, *v)).collect();
        entries.sort_by_key(|(_, frame)| *frame);

        let to_remove = entries.len() - self.max_cache_size;
        for (key, _) in entries.iter().take(to_remove) {
            self.texture_cache.remove(key);
            self.last_used.remove(key);
        }
    }

    /// Number of textures currently held.
    pub fn cache_size(&self) -> usize {
        self.texture_cache.len()
    }

    #[cfg(test)]
    fn get_texture(&self, slot: TextureSlot, version: u64) -> Option<&TextureHandle> {
        self.texture_cache.get(&(slot, version))
    }
}

/// Converts a straight-alpha raster into an egui image.
pub fn color_image_from_rgba(image: &RgbaImage) -> Result<ColorImage, TextureError> {
    let (w, h) = image.dimensions();
    if w == 0 || h == 0 {
        return Err(TextureError::InvalidDimensions);
    }
    Ok(ColorImage::from_rgba_unmultiplied(
        [w as usize, h as usize],
        image.as_raw(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn white() -> Result<ColorImage, TextureError> {
        Ok(ColorImage::new([10, 10], egui::Color32::WHITE))
    }

    #[test]
    fn test_cache_hit() {
        let ctx = Context::default();
        let mut manager = TextureManager::new(10);

        let first = manager.get_or_create_texture(TextureSlot::Source, 1, white, &ctx).unwrap();
        let second = manager
            .get_or_create_texture(TextureSlot::Source, 1, || panic!("should be cached"), &ctx)
            .unwrap();

        assert_eq!(first, second);
        assert_eq!(manager.cache_size(), 1);
    }

    #[test]
    fn test_slots_are_cached_apart() {
        let ctx = Context::default();
        let mut manager = TextureManager::new(10);
        let source = manager.get_or_create_texture(TextureSlot::Source, 1, white, &ctx).unwrap();
        let preview = manager.get_or_create_texture(TextureSlot::Preview, 1, white, &ctx).unwrap();

        assert_ne!(source, preview);
        assert_eq!(manager.cache_size(), 2);
        assert!(manager.get_texture(TextureSlot::Rectified, 1).is_none());
    }

    #[test]
    fn test_lru_eviction() {
        let ctx = Context::default();
        let mut manager = TextureManager::new(2);

        manager.get_or_create_texture(TextureSlot::Preview, 1, white, &ctx).unwrap();
        manager.begin_frame();
        manager.get_or_create_texture(TextureSlot::Preview, 2, white, &ctx).unwrap();
        manager.begin_frame();
        manager.get_or_create_texture(TextureSlot::Preview, 3, white, &ctx).unwrap();

        assert_eq!(manager.cache_size(), 2);
        assert!(manager.get_texture(TextureSlot::Preview, 1).is_none());
        assert!(manager.get_texture(TextureSlot::Preview, 3).is_some());
    }

    #[test]
    fn test_color_image_conversion() {
        let image = RgbaImage::from_pixel(3, 2, image::Rgba([1, 2, 3, 255]));
        let color = color_image_from_rgba(&image).unwrap();
        assert_eq!(color.size, [3, 2]);
        assert_eq!(color.pixels[0], egui::Color32::from_rgb(1, 2, 3));
        assert!(matches!(
            color_image_from_rgba(&RgbaImage::new(0, 4)),
            Err(TextureError::InvalidDimensions)
        ));
    }
}
