//! Drawing in cartesian coordinates
//!
//! [`CartesianCanvas`] maps a rectangle of the plane onto a canvas, with `y`
//! growing upwards, and forwards every drawing call to the wrapped
//! [`Canvas`] in screen coordinates.

use std::path::Path;
use std::sync::{Arc, Mutex};

use crate::canvas::Canvas;
use crate::color::Color;
use crate::error::{CanvasError, Result};
use crate::lock;

/// Length in pixels of the tick marks drawn by [`CartesianCanvas::draw_axes`].
const TICK_PIXELS: f64 = 8.0;

/// Visible part of the plane.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CartesianBounds {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
}

impl CartesianBounds {
    pub fn new(min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> Result<Self> {
        let finite = [min_x, min_y, max_x, max_y].iter().all(|v| v.is_finite());
        if !finite || max_x <= min_x || max_y <= min_y {
            return Err(CanvasError::InvalidGeometry(format!(
                "empty cartesian region ({min_x}, {min_y})..({max_x}, {max_y})"
            )));
        }
        Ok(Self {
            min_x,
            min_y,
            max_x,
            max_y,
        })
    }

    pub fn width(&self) -> f64 {
        self.max_x - self.min_x
    }

    pub fn height(&self) -> f64 {
        self.max_y - self.min_y
    }
}

/// A canvas addressed in cartesian units. Clones share the same view.
#[derive(Clone)]
pub struct CartesianCanvas {
    canvas: Canvas,
    bounds: Arc<Mutex<CartesianBounds>>,
}

impl CartesianCanvas {
    pub fn new(canvas: Canvas, bounds: CartesianBounds) -> Self {
        Self {
            canvas,
            bounds: Arc::new(Mutex::new(bounds)),
        }
    }

    /// View centred on the origin with one unit per pixel.
    pub fn centered(canvas: Canvas) -> Self {
        let (w, h) = (canvas.width() as f64, canvas.height() as f64);
        let bounds = CartesianBounds {
            min_x: -w / 2.0,
            min_y: -h / 2.0,
            max_x: w / 2.0,
            max_y: h / 2.0,
        };
        Self::new(canvas, bounds)
    }

    pub fn canvas(&self) -> &Canvas {
        &self.canvas
    }

    pub fn bounds(&self) -> CartesianBounds {
        *lock(&self.bounds)
    }

    /// Show a different region of the plane from the next drawing call on.
    pub fn recompute_dimensions(&self, min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> Result<()> {
        *lock(&self.bounds) = CartesianBounds::new(min_x, min_y, max_x, max_y)?;
        Ok(())
    }

    /// Cartesian width of one pixel.
    pub fn pixel_width(&self) -> f64 {
        self.bounds().width() / self.canvas.width() as f64
    }

    /// Cartesian height of one pixel.
    pub fn pixel_height(&self) -> f64 {
        self.bounds().height() / self.canvas.height() as f64
    }

    pub fn to_screen(&self, x: f64, y: f64) -> (f32, f32) {
        project(&self.bounds(), &self.canvas, x, y)
    }

    pub fn to_cartesian(&self, screen_x: f32, screen_y: f32) -> (f64, f64) {
        let b = self.bounds();
        let (w, h) = (self.canvas.width() as f64, self.canvas.height() as f64);
        (
            b.min_x + screen_x as f64 / w * b.width(),
            b.min_y + (h - screen_y as f64) / h * b.height(),
        )
    }

    /// Centre the view on `(x, y)` and scale its extent by `scale`; values
    /// below one zoom in.
    pub fn zoom(&self, x: f64, y: f64, scale: f64) -> Result<()> {
        if !(scale.is_finite() && scale > 0.0) {
            return Err(CanvasError::InvalidGeometry(format!(
                "zoom scale {scale} must be positive"
            )));
        }
        let b = self.bounds();
        let (half_w, half_h) = (b.width() * scale / 2.0, b.height() * scale / 2.0);
        self.recompute_dimensions(x - half_w, y - half_h, x + half_w, y + half_h)
    }

    /// Zoom onto the box spanned by two corners, keeping the aspect ratio.
    pub fn zoom_to(&self, x1: f64, y1: f64, x2: f64, y2: f64) -> Result<()> {
        let b = self.bounds();
        let scale = ((x2 - x1).abs() / b.width() + (y2 - y1).abs() / b.height()) / 2.0;
        self.zoom((x1 + x2) / 2.0, (y1 + y2) / 2.0, scale)
    }

    pub fn draw_point(&self, x: f64, y: f64, color: Color) -> Result<()> {
        let (sx, sy) = self.to_screen(x, y);
        self.canvas.draw_point(sx, sy, color)
    }

    pub fn draw_line(&self, x1: f64, y1: f64, x2: f64, y2: f64, color: Color) -> Result<()> {
        let b = self.bounds();
        let (ax, ay) = project(&b, &self.canvas, x1, y1);
        let (bx, by) = project(&b, &self.canvas, x2, y2);
        self.canvas.draw_line(ax, ay, bx, by, color)
    }

    pub fn draw_triangle(
        &self,
        a: (f64, f64),
        b: (f64, f64),
        c: (f64, f64),
        color: Color,
        filled: bool,
    ) -> Result<()> {
        self.canvas.draw_triangle(
            self.to_screen(a.0, a.1),
            self.to_screen(b.0, b.1),
            self.to_screen(c.0, c.1),
            color,
            filled,
        )
    }

    /// Rectangle between two opposite corners.
    pub fn draw_rectangle(
        &self,
        x1: f64,
        y1: f64,
        x2: f64,
        y2: f64,
        color: Color,
        filled: bool,
    ) -> Result<()> {
        let (ax, ay) = self.to_screen(x1, y1);
        let (bx, by) = self.to_screen(x2, y2);
        self.canvas.draw_rectangle(
            ax.min(bx),
            ay.min(by),
            (bx - ax).abs(),
            (by - ay).abs(),
            color,
            filled,
        )
    }

    /// The radius is measured along the x axis.
    pub fn draw_circle(&self, x: f64, y: f64, radius: f64, color: Color, filled: bool) -> Result<()> {
        let (cx, cy) = self.to_screen(x, y);
        let (rx, _) = self.to_screen(x + radius, y);
        self.canvas.draw_circle(cx, cy, (rx - cx).abs(), color, filled)
    }

    pub fn draw_polygon(&self, points: &[(f64, f64)], color: Color, filled: bool) -> Result<()> {
        let screen = self.project_all(points);
        self.canvas.draw_polygon(&screen, color, filled)
    }

    pub fn draw_colored_polygon(&self, points: &[(f64, f64)], colors: &[Color]) -> Result<()> {
        let screen = self.project_all(points);
        self.canvas.draw_colored_polygon(&screen, colors)
    }

    /// Text with its baseline starting at `(x, y)`.
    pub fn draw_text(&self, text: impl Into<String>, x: f64, y: f64, size: f32, color: Color) -> Result<()> {
        let (sx, sy) = self.to_screen(x, y);
        self.canvas.draw_text(text, sx, sy, size, color)
    }

    /// Image with its top left corner at `(x, y)`, extending `width` right
    /// and `height` down.
    pub fn draw_image(
        &self,
        path: impl AsRef<Path>,
        x: f64,
        y: f64,
        width: f64,
        height: f64,
        alpha: f32,
    ) -> Result<()> {
        let (ax, ay) = self.to_screen(x, y);
        let (bx, by) = self.to_screen(x + width, y - height);
        self.canvas.draw_image(path, ax, ay, bx - ax, by - ay, alpha)
    }

    /// Axes through `(x, y)`, with a tick every `dx` / `dy` units. A zero
    /// spacing, or one smaller than a pixel, draws no ticks on that axis.
    pub fn draw_axes(&self, x: f64, y: f64, dx: f64, dy: f64, color: Color) -> Result<()> {
        let b = self.bounds();
        self.draw_line(b.min_x, y, b.max_x, y, color)?;
        self.draw_line(x, b.min_y, x, b.max_y, color)?;

        let (pw, ph) = (self.pixel_width(), self.pixel_height());
        let (tick_w, tick_h) = (TICK_PIXELS * pw, TICK_PIXELS * ph);
        let dx = dx.abs();
        if dx >= pw {
            for tx in ticks(x, dx, b.min_x, b.max_x) {
                self.draw_line(tx, y - tick_h, tx, y + tick_h, color)?;
            }
        }
        let dy = dy.abs();
        if dy >= ph {
            for ty in ticks(y, dy, b.min_y, b.max_y) {
                self.draw_line(x - tick_w, ty, x + tick_w, ty, color)?;
            }
        }
        Ok(())
    }

    /// Plot `f` across the visible x range, one sample per pixel column.
    /// Samples that are not finite in screen space leave a gap.
    pub fn draw_function<F>(&self, f: F, color: Color) -> Result<()>
    where
        F: Fn(f64) -> f64,
    {
        let b = self.bounds();
        let columns = self.canvas.width() as usize;
        let step = b.width() / columns as f64;
        let mut previous: Option<(f32, f32)> = None;
        for i in 0..=columns {
            let x = b.min_x + i as f64 * step;
            let here = project(&b, &self.canvas, x, f(x));
            if !here.0.is_finite() || !here.1.is_finite() {
                previous = None;
                continue;
            }
            if let Some((px, py)) = previous {
                self.canvas.draw_line(px, py, here.0, here.1, color)?;
            }
            previous = Some(here);
        }
        Ok(())
    }

    fn project_all(&self, points: &[(f64, f64)]) -> Vec<(f32, f32)> {
        let b = self.bounds();
        points
            .iter()
            .map(|&(x, y)| project(&b, &self.canvas, x, y))
            .collect()
    }
}

fn project(b: &CartesianBounds, canvas: &Canvas, x: f64, y: f64) -> (f32, f32) {
    let (w, h) = (canvas.width() as f64, canvas.height() as f64);
    (
        ((x - b.min_x) / b.width() * w) as f32,
        (h - (y - b.min_y) / b.height() * h) as f32,
    )
}

/// Tick positions at `origin ± k * step` strictly inside `(min, max)`,
/// the origin itself excluded.
fn ticks(origin: f64, step: f64, min: f64, max: f64) -> impl Iterator<Item = f64> {
    let up = (1..)
        .map(move |k| origin + k as f64 * step)
        .take_while(move |&t| t < max)
        .filter(move |&t| t > min);
    let down = (1..)
        .map(move |k| origin - k as f64 * step)
        .take_while(move |&t| t > min)
        .filter(move |&t| t < max);
    up.chain(down)
}
