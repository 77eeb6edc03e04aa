use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use image::ColorType;
use log::debug;

use crate::error::{CanvasError, Result};
use crate::raster::Pixmap;

fn asset_error(path: &Path, err: impl ToString) -> CanvasError {
    CanvasError::Asset {
        path: path.to_path_buf(),
        reason: err.to_string(),
    }
}

/// Decode a PNG, JPEG or BMP file into RGBA pixels.
pub fn decode_image(path: &Path) -> Result<Pixmap> {
    let rgba = image::open(path)
        .map_err(|e| asset_error(path, e))?
        .to_rgba8();
    let (width, height) = rgba.dimensions();
    Pixmap::from_rgba(width, height, rgba.into_raw())
}

pub fn save_png(path: &Path, pixels: &Pixmap) -> Result<()> {
    image::save_buffer(
        path,
        pixels.data(),
        pixels.width(),
        pixels.height(),
        ColorType::Rgba8,
    )
    .map_err(|e| asset_error(path, e))
}

/// Decoded images by path, so a file drawn every frame is read once.
#[derive(Default)]
pub struct ImageCache {
    images: HashMap<PathBuf, Arc<Pixmap>>,
}

impl ImageCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_or_load(&mut self, path: &Path) -> Result<Arc<Pixmap>> {
        if let Some(image) = self.images.get(path) {
            return Ok(Arc::clone(image));
        }
        let image = Arc::new(decode_image(path)?);
        debug!(
            "loaded image {} ({}x{})",
            path.display(),
            image.width(),
            image.height()
        );
        self.images.insert(path.to_path_buf(), Arc::clone(&image));
        Ok(image)
    }

    pub fn len(&self) -> usize {
        self.images.len()
    }

    pub fn is_empty(&self) -> bool {
        self.images.is_empty()
    }

    pub fn clear(&mut self) {
        self.images.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::color::Color;

    #[test]
    fn missing_file_is_an_asset_error() {
        let err = decode_image(Path::new("/nonexistent/tsgl.png")).unwrap_err();
        assert!(matches!(err, CanvasError::Asset { .. }));
    }

    #[test]
    fn png_round_trip_and_cache() {
        let dir = std::env::temp_dir().join(format!("tsgl-image-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("square.png");
        save_png(&path, &Pixmap::filled(3, 2, Color::RED)).unwrap();

        let mut cache = ImageCache::new();
        let first = cache.get_or_load(&path).unwrap();
        let second = cache.get_or_load(&path).unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!((first.width(), first.height()), (3, 2));
        assert_eq!(first.pixel(2, 1), Some([255, 0, 0, 255]));
        assert_eq!(cache.len(), 1);
        std::fs::remove_dir_all(&dir).ok();
    }
}
