//! Software rasterisation
//!
//! This file contains the pixel buffer used as a frame, as a drawing layer
//! and as an image, together with the primitive rasteriser that the software
//! backend submits vertices to.

use crate::color::Color;
use crate::error::{CanvasError, Result};
use crate::shape::{Primitive, Vertex};

/// Axis aligned rectangle in pixel coordinates
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RectF {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl RectF {
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }
}

/// RGBA8 pixel buffer, rows top to bottom, not premultiplied.
#[derive(Debug, Clone, PartialEq)]
pub struct Pixmap {
    width: u32,
    height: u32,
    data: Vec<u8>,
}

impl Pixmap {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            data: vec![0; width as usize * height as usize * 4],
        }
    }

    pub fn filled(width: u32, height: u32, color: Color) -> Self {
        let mut pixmap = Self::new(width, height);
        pixmap.fill(color);
        pixmap
    }

    pub fn from_rgba(width: u32, height: u32, data: Vec<u8>) -> Result<Self> {
        let expected = width as usize * height as usize * 4;
        if data.len() != expected {
            return Err(CanvasError::OutOfRange {
                index: data.len(),
                len: expected,
            });
        }
        Ok(Self {
            width,
            height,
            data,
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }

    pub fn into_data(self) -> Vec<u8> {
        self.data
    }

    fn index(&self, x: i64, y: i64) -> Option<usize> {
        if x < 0 || y < 0 || x >= self.width as i64 || y >= self.height as i64 {
            return None;
        }
        Some((y as usize * self.width as usize + x as usize) * 4)
    }

    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        let idx = self.index(x as i64, y as i64)?;
        let mut px = [0; 4];
        px.copy_from_slice(&self.data[idx..idx + 4]);
        Some(px)
    }

    pub fn set_pixel(&mut self, x: u32, y: u32, color: Color) -> bool {
        match self.index(x as i64, y as i64) {
            Some(idx) => {
                self.data[idx..idx + 4].copy_from_slice(&color.to_rgba8());
                true
            }
            None => false,
        }
    }

    /// Source-over blend of `color` onto the pixel. Out of bounds is ignored.
    pub fn blend_pixel(&mut self, x: i64, y: i64, color: Color) {
        let Some(idx) = self.index(x, y) else {
            return;
        };
        let sa = color.a.clamp(0.0, 1.0);
        if sa <= 0.0 {
            return;
        }
        if sa >= 1.0 {
            self.data[idx..idx + 4].copy_from_slice(&color.to_rgba8());
            return;
        }
        let dst = Color::from_rgba8([
            self.data[idx],
            self.data[idx + 1],
            self.data[idx + 2],
            self.data[idx + 3],
        ]);
        let out_a = sa + dst.a * (1.0 - sa);
        let mix = |s: f32, d: f32| (s * sa + d * dst.a * (1.0 - sa)) / out_a;
        let out = Color::rgba(mix(color.r, dst.r), mix(color.g, dst.g), mix(color.b, dst.b), out_a);
        self.data[idx..idx + 4].copy_from_slice(&out.to_rgba8());
    }

    pub fn fill(&mut self, color: Color) {
        let px = color.to_rgba8();
        for pixel in self.data.chunks_exact_mut(4) {
            pixel.copy_from_slice(&px);
        }
    }

    /// Overwrite a rectangle, clipped to the buffer.
    pub fn fill_rect(&mut self, x: i32, y: i32, width: u32, height: u32, color: Color) {
        let x_start = x.max(0) as u32;
        let y_start = y.max(0) as u32;
        let x_end = (x + width as i32).min(self.width as i32).max(0) as u32;
        let y_end = (y + height as i32).min(self.height as i32).max(0) as u32;

        if x_end <= x_start || y_end <= y_start {
            return;
        }

        let px = color.to_rgba8();
        for y in y_start..y_end {
            for x in x_start..x_end {
                let idx = (y * self.width + x) as usize * 4;
                self.data[idx..idx + 4].copy_from_slice(&px);
            }
        }
    }
}

/// Rasterise `vertices` assembled according to `mode` onto `target`.
pub fn rasterize(target: &mut Pixmap, mode: Primitive, vertices: &[Vertex]) {
    match mode {
        Primitive::Points => {
            for v in vertices {
                target.blend_pixel(v.x.floor() as i64, v.y.floor() as i64, v.color);
            }
        }
        Primitive::Lines => {
            for pair in vertices.chunks_exact(2) {
                draw_line(target, &pair[0], &pair[1]);
            }
        }
        Primitive::LineStrip => {
            for pair in vertices.windows(2) {
                draw_line(target, &pair[0], &pair[1]);
            }
        }
        Primitive::LineLoop => {
            for pair in vertices.windows(2) {
                draw_line(target, &pair[0], &pair[1]);
            }
            if let (Some(first), Some(last)) = (vertices.first(), vertices.last()) {
                if vertices.len() > 2 {
                    draw_line(target, last, first);
                }
            }
        }
        Primitive::Triangles => {
            for tri in vertices.chunks_exact(3) {
                fill_triangle(target, &tri[0], &tri[1], &tri[2]);
            }
        }
        Primitive::TriangleStrip => {
            for tri in vertices.windows(3) {
                fill_triangle(target, &tri[0], &tri[1], &tri[2]);
            }
        }
        Primitive::TriangleFan => {
            if let Some((hub, rest)) = vertices.split_first() {
                for pair in rest.windows(2) {
                    fill_triangle(target, hub, &pair[0], &pair[1]);
                }
            }
        }
    }
}

/// Parameter range of `a + t * (b - a)` inside `[min, max]` on both axes,
/// or `None` if the segment misses the box (Liang-Barsky).
fn clip_segment(a: (f32, f32), b: (f32, f32), min: f32, max: (f32, f32)) -> Option<(f32, f32)> {
    let (dx, dy) = (b.0 - a.0, b.1 - a.1);
    let mut t0 = 0.0f32;
    let mut t1 = 1.0f32;
    let edges = [
        (-dx, a.0 - min),
        (dx, max.0 - a.0),
        (-dy, a.1 - min),
        (dy, max.1 - a.1),
    ];
    for (p, q) in edges {
        if p == 0.0 {
            if q < 0.0 {
                return None;
            }
            continue;
        }
        let r = q / p;
        if p < 0.0 {
            t0 = t0.max(r);
        } else {
            t1 = t1.min(r);
        }
        if t0 > t1 {
            return None;
        }
    }
    Some((t0, t1))
}

fn draw_line(target: &mut Pixmap, a: &Vertex, b: &Vertex) {
    if !(a.x.is_finite() && a.y.is_finite() && b.x.is_finite() && b.y.is_finite()) {
        return;
    }
    let bounds = (target.width() as f32 + 1.0, target.height() as f32 + 1.0);
    let Some((t0, t1)) = clip_segment((a.x, a.y), (b.x, b.y), -1.0, bounds) else {
        return;
    };
    let dx = b.x - a.x;
    let dy = b.y - a.y;
    let (x0, y0) = (a.x + dx * t0, a.y + dy * t0);
    let (cx, cy) = (dx * (t1 - t0), dy * (t1 - t0));
    let steps = cx.abs().max(cy.abs()).ceil().max(1.0) as u32;
    for i in 0..=steps {
        let s = i as f32 / steps as f32;
        let x = x0 + cx * s;
        let y = y0 + cy * s;
        let color = Color::blend(a.color, b.color, t0 + (t1 - t0) * s);
        target.blend_pixel(x.floor() as i64, y.floor() as i64, color);
    }
}

fn edge(ax: f32, ay: f32, bx: f32, by: f32, px: f32, py: f32) -> f32 {
    (bx - ax) * (py - ay) - (by - ay) * (px - ax)
}

fn fill_triangle(target: &mut Pixmap, v0: &Vertex, v1: &Vertex, v2: &Vertex) {
    let area = edge(v0.x, v0.y, v1.x, v1.y, v2.x, v2.y);
    if area.abs() < f32::EPSILON {
        return;
    }

    let min_x = v0.x.min(v1.x).min(v2.x).floor().max(0.0) as i64;
    let min_y = v0.y.min(v1.y).min(v2.y).floor().max(0.0) as i64;
    let max_x = (v0.x.max(v1.x).max(v2.x).ceil() as i64).min(target.width() as i64 - 1);
    let max_y = (v0.y.max(v1.y).max(v2.y).ceil() as i64).min(target.height() as i64 - 1);

    let uniform = v0.color == v1.color && v1.color == v2.color;

    for y in min_y..=max_y {
        let py = y as f32 + 0.5;
        for x in min_x..=max_x {
            let px = x as f32 + 0.5;
            let w0 = edge(v1.x, v1.y, v2.x, v2.y, px, py) / area;
            let w1 = edge(v2.x, v2.y, v0.x, v0.y, px, py) / area;
            let w2 = 1.0 - w0 - w1;
            if w0 < 0.0 || w1 < 0.0 || w2 < 0.0 {
                continue;
            }
            let color = if uniform {
                v0.color
            } else {
                Color::rgba(
                    v0.color.r * w0 + v1.color.r * w1 + v2.color.r * w2,
                    v0.color.g * w0 + v1.color.g * w1 + v2.color.g * w2,
                    v0.color.b * w0 + v1.color.b * w1 + v2.color.b * w2,
                    v0.color.a * w0 + v1.color.a * w1 + v2.color.a * w2,
                )
            };
            target.blend_pixel(x, y, color);
        }
    }
}

/// Nearest-neighbour scaled copy of `image` into `dest`, blended with
/// `alpha` applied on top of the image's own alpha.
pub fn blit(target: &mut Pixmap, dest: RectF, image: &Pixmap, alpha: f32) {
    if dest.width <= 0.0 || dest.height <= 0.0 || image.width() == 0 || image.height() == 0 {
        return;
    }
    // Fast path for an unscaled, opaque, pixel aligned copy.
    let aligned = dest.x.fract() == 0.0
        && dest.y.fract() == 0.0
        && dest.width == image.width() as f32
        && dest.height == image.height() as f32;

    let x0 = dest.x.floor().max(0.0) as i64;
    let y0 = dest.y.floor().max(0.0) as i64;
    let x1 = ((dest.x + dest.width).ceil() as i64).min(target.width() as i64);
    let y1 = ((dest.y + dest.height).ceil() as i64).min(target.height() as i64);

    let sx = image.width() as f32 / dest.width;
    let sy = image.height() as f32 / dest.height;

    for y in y0..y1 {
        for x in x0..x1 {
            let (u, v) = if aligned {
                ((x - dest.x as i64) as u32, (y - dest.y as i64) as u32)
            } else {
                let u = ((x as f32 + 0.5 - dest.x) * sx).floor();
                let v = ((y as f32 + 0.5 - dest.y) * sy).floor();
                if u < 0.0 || v < 0.0 {
                    continue;
                }
                (u as u32, v as u32)
            };
            if let Some(px) = image.pixel(u, v) {
                let c = Color::from_rgba8(px);
                target.blend_pixel(x, y, c.with_alpha(c.a * alpha));
            }
        }
    }
}
