use std::collections::{HashMap, VecDeque};
use std::fs;
use std::path::Path;
use std::sync::Arc;

use fontdue::{Font, FontSettings, Metrics};

use crate::color::Color;
use crate::error::{CanvasError, Result};
use crate::raster::Pixmap;

/// Glyphs are kept for this many recently used sizes.
const MAX_CACHED_SIZES: usize = 8;

type TextKey = (String, u32, [u8; 4]);

struct CachedText {
    bitmap: Arc<TextBitmap>,
    used: bool,
}

/// A loaded font with a per-size glyph cache and a cache of the text runs
/// drawn in the current frame.
pub struct FontFace {
    font: Font,
    glyphs: HashMap<(char, u32), (Metrics, Vec<u8>)>,
    sizes: VecDeque<u32>,
    texts: HashMap<TextKey, CachedText>,
}

/// Rasterised run of text. The baseline is `ascent` pixels below the top of
/// `pixels`.
pub struct TextBitmap {
    pub pixels: Pixmap,
    pub ascent: f32,
}

impl FontFace {
    pub fn from_bytes(bytes: &[u8]) -> std::result::Result<Self, &'static str> {
        let font = Font::from_bytes(bytes, FontSettings::default())?;
        Ok(Self {
            font,
            glyphs: HashMap::new(),
            sizes: VecDeque::new(),
            texts: HashMap::new(),
        })
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let bytes = fs::read(path).map_err(|e| CanvasError::Asset {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        Self::from_bytes(&bytes).map_err(|reason| CanvasError::Asset {
            path: path.to_path_buf(),
            reason: reason.to_string(),
        })
    }

    /// Mark `size` as recently used, dropping the glyphs of the size used
    /// longest ago once too many are cached.
    fn touch_size(&mut self, size: f32) {
        let bits = size.to_bits();
        if let Some(pos) = self.sizes.iter().position(|&s| s == bits) {
            self.sizes.remove(pos);
        }
        self.sizes.push_back(bits);
        if self.sizes.len() > MAX_CACHED_SIZES {
            if let Some(stale) = self.sizes.pop_front() {
                self.glyphs.retain(|&(_, s), _| s != stale);
            }
        }
    }

    pub fn cached_sizes(&self) -> usize {
        self.sizes.len()
    }

    fn glyph(&mut self, ch: char, size: f32) -> &(Metrics, Vec<u8>) {
        let font = &self.font;
        self.glyphs
            .entry((ch, size.to_bits()))
            .or_insert_with(|| font.rasterize(ch, size))
    }

    pub fn cached_glyphs(&self) -> usize {
        self.glyphs.len()
    }

    fn line_metrics(&self, size: f32) -> (f32, f32) {
        match self.font.horizontal_line_metrics(size) {
            Some(m) => (m.ascent, m.descent),
            None => (size, 0.0),
        }
    }

    /// Width in pixels of `text` at `size`.
    pub fn measure(&mut self, text: &str, size: f32) -> f32 {
        self.touch_size(size);
        text.chars().map(|ch| self.glyph(ch, size).0.advance_width).sum()
    }

    /// Bitmap for `text`, reused from earlier frames while it keeps being
    /// drawn.
    pub fn text_bitmap(&mut self, text: &str, size: f32, color: Color) -> Arc<TextBitmap> {
        let key = (text.to_string(), size.to_bits(), color.to_rgba8());
        if let Some(entry) = self.texts.get_mut(&key) {
            entry.used = true;
            return Arc::clone(&entry.bitmap);
        }
        let bitmap = Arc::new(self.rasterize_text(text, size, color));
        self.texts.insert(
            key,
            CachedText {
                bitmap: Arc::clone(&bitmap),
                used: true,
            },
        );
        bitmap
    }

    /// Forget text runs that were not drawn since the previous call.
    pub fn end_frame(&mut self) {
        self.texts.retain(|_, entry| std::mem::take(&mut entry.used));
    }

    pub fn cached_texts(&self) -> usize {
        self.texts.len()
    }

    pub fn rasterize_text(&mut self, text: &str, size: f32, color: Color) -> TextBitmap {
        let (ascent, descent) = self.line_metrics(size);
        let width = self.measure(text, size).ceil().max(1.0) as u32;
        let height = (ascent - descent).ceil().max(1.0) as u32;
        let mut pixels = Pixmap::new(width, height);

        let mut pen = 0.0f32;
        for ch in text.chars() {
            let (metrics, coverage) = self.glyph(ch, size).clone();
            let left = (pen + metrics.xmin as f32).round() as i64;
            let top = (ascent - (metrics.ymin as f32 + metrics.height as f32)).round() as i64;
            for gy in 0..metrics.height {
                for gx in 0..metrics.width {
                    let cover = coverage[gy * metrics.width + gx];
                    if cover == 0 {
                        continue;
                    }
                    let c = color.with_alpha(color.a * cover as f32 / 255.0);
                    pixels.blend_pixel(left + gx as i64, top + gy as i64, c);
                }
            }
            pen += metrics.advance_width;
        }
        TextBitmap { pixels, ascent }
    }
}
