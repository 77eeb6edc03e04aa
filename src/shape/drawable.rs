//! Persistent drawables
//!
//! A [`Shape`] is owned by the application. The canvas only keeps weak
//! references in its registry, so dropping every handle to a shape removes it
//! from the picture on the next frame.

use std::fmt;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, Weak};

use crate::asset;
use crate::color::Color;
use crate::error::{CanvasError, Result};
use crate::lock;
use crate::raster::{Pixmap, RectF};
use crate::shape::geometry::{self, DrawItem, Primitive, Transform, Vertex};

/// Tessellation used for spheres, cylinders and cones.
pub const SOLID_RESOLUTION: usize = 24;

static NEXT_ID: AtomicU64 = AtomicU64::new(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ShapeId(u64);

impl ShapeId {
    fn next() -> Self {
        ShapeId(NEXT_ID.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for ShapeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShapeTag {
    Line,
    Polyline,
    Rectangle,
    Triangle,
    RegularPolygon,
    Polygon,
    Text,
    Image,
    Sphere,
    Cylinder,
    Cone,
    Background,
}

impl fmt::Display for ShapeTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ShapeTag::Line => "line",
            ShapeTag::Polyline => "polyline",
            ShapeTag::Rectangle => "rectangle",
            ShapeTag::Triangle => "triangle",
            ShapeTag::RegularPolygon => "regular polygon",
            ShapeTag::Polygon => "polygon",
            ShapeTag::Text => "text",
            ShapeTag::Image => "image",
            ShapeTag::Sphere => "sphere",
            ShapeTag::Cylinder => "cylinder",
            ShapeTag::Cone => "cone",
            ShapeTag::Background => "background",
        };
        f.write_str(name)
    }
}

/// Geometry parameters of a shape.
#[derive(Debug, Clone)]
pub enum ShapeKind {
    Line,
    Polyline,
    Rectangle { width: f32, height: f32 },
    Triangle,
    RegularPolygon { radius: f32, sides: usize },
    /// Convex polygon given by its corners.
    Polygon,
    Text { text: String, size: f32 },
    Image { image: Arc<Pixmap>, width: f32, height: f32 },
    Sphere { radius: f32 },
    Cylinder { radius: f32, height: f32 },
    Cone { radius: f32, height: f32 },
    /// Pixel layer the application paints into.
    Background { pixels: Arc<Pixmap> },
}

impl ShapeKind {
    pub fn tag(&self) -> ShapeTag {
        match self {
            ShapeKind::Line => ShapeTag::Line,
            ShapeKind::Polyline => ShapeTag::Polyline,
            ShapeKind::Rectangle { .. } => ShapeTag::Rectangle,
            ShapeKind::Triangle => ShapeTag::Triangle,
            ShapeKind::RegularPolygon { .. } => ShapeTag::RegularPolygon,
            ShapeKind::Polygon => ShapeTag::Polygon,
            ShapeKind::Text { .. } => ShapeTag::Text,
            ShapeKind::Image { .. } => ShapeTag::Image,
            ShapeKind::Sphere { .. } => ShapeTag::Sphere,
            ShapeKind::Cylinder { .. } => ShapeTag::Cylinder,
            ShapeKind::Cone { .. } => ShapeTag::Cone,
            ShapeKind::Background { .. } => ShapeTag::Background,
        }
    }
}

pub(crate) struct ShapeState {
    kind: ShapeKind,
    local: Vec<[f32; 3]>,
    colors: Vec<Color>,
    outline_color: Color,
    transform: Transform,
    filled: bool,
    outlined: bool,
    alpha: f32,
    dirty: bool,
    cache: Vec<DrawItem>,
}

impl ShapeState {
    fn unsupported(&self, operation: &'static str) -> CanvasError {
        CanvasError::Unsupported {
            operation,
            kind: self.kind.tag(),
        }
    }

    fn color_at(&self, index: usize) -> Color {
        let c = self
            .colors
            .get(index)
            .or_else(|| self.colors.first())
            .copied()
            .unwrap_or_default();
        c.with_alpha(c.a * self.alpha)
    }

    fn regenerate(&mut self) {
        let t = self.transform;
        let world: Vec<[f32; 3]> = self.local.iter().map(|p| t.apply(*p)).collect();
        let colored = |state: &ShapeState| -> Vec<Vertex> {
            world
                .iter()
                .enumerate()
                .map(|(i, p)| Vertex::new(p[0], p[1], p[2], state.color_at(i)))
                .collect()
        };

        let mut items = Vec::new();
        match &self.kind {
            ShapeKind::Line | ShapeKind::Polyline => items.push(DrawItem::Mesh {
                mode: Primitive::LineStrip,
                vertices: colored(self),
            }),
            ShapeKind::Rectangle { .. }
            | ShapeKind::Triangle
            | ShapeKind::RegularPolygon { .. }
            | ShapeKind::Polygon => {
                if self.filled {
                    items.push(DrawItem::Mesh {
                        mode: Primitive::TriangleFan,
                        vertices: colored(self),
                    });
                }
                if self.outlined {
                    let oc = self.outline_color.with_alpha(self.outline_color.a * self.alpha);
                    items.push(DrawItem::Mesh {
                        mode: Primitive::LineLoop,
                        vertices: world.iter().map(|p| Vertex::new(p[0], p[1], p[2], oc)).collect(),
                    });
                }
            }
            ShapeKind::Text { text, size } => items.push(DrawItem::Text {
                x: world[0][0],
                y: world[0][1],
                size: *size,
                text: text.clone(),
                color: self.color_at(0),
            }),
            ShapeKind::Image { image, .. } | ShapeKind::Background { pixels: image } => {
                items.push(DrawItem::Image {
                    dest: bounds(&world),
                    image: Arc::clone(image),
                    alpha: self.alpha,
                })
            }
            ShapeKind::Sphere { .. } | ShapeKind::Cylinder { .. } | ShapeKind::Cone { .. } => {
                let mut vertices = colored(self);
                geometry::sort_back_to_front(&mut vertices);
                items.push(DrawItem::Mesh {
                    mode: Primitive::Triangles,
                    vertices,
                });
            }
        }
        self.cache = items;
        self.dirty = false;
    }
}

fn bounds(points: &[[f32; 3]]) -> RectF {
    let (mut x0, mut y0) = (f32::MAX, f32::MAX);
    let (mut x1, mut y1) = (f32::MIN, f32::MIN);
    for p in points {
        x0 = x0.min(p[0]);
        y0 = y0.min(p[1]);
        x1 = x1.max(p[0]);
        y1 = y1.max(p[1]);
    }
    RectF::new(x0, y0, x1 - x0, y1 - y0)
}

pub(crate) struct ShapeCell {
    id: ShapeId,
    state: Mutex<ShapeState>,
}

impl ShapeCell {
    pub(crate) fn id(&self) -> ShapeId {
        self.id
    }

    /// Current draw output. Regenerates world-space vertices if the shape was
    /// mutated since the last call.
    pub(crate) fn draw_items(&self) -> Vec<DrawItem> {
        let mut state = lock(&self.state);
        if state.dirty {
            state.regenerate();
        }
        state.cache.clone()
    }
}

/// Handle to a persistent drawable. Clones share the same shape.
#[derive(Clone)]
pub struct Shape {
    cell: Arc<ShapeCell>,
}

impl fmt::Debug for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Shape")
            .field("id", &self.cell.id)
            .field("kind", &self.tag())
            .finish()
    }
}

impl PartialEq for Shape {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.cell, &other.cell)
    }
}

impl Eq for Shape {}

fn points3(points: &[(f32, f32)]) -> Vec<[f32; 3]> {
    points.iter().map(|&(x, y)| [x, y, 0.0]).collect()
}

impl Shape {
    fn build(kind: ShapeKind, local: Vec<[f32; 3]>, center: [f32; 3], color: Color, filled: bool) -> Self {
        let state = ShapeState {
            kind,
            local,
            colors: vec![color],
            outline_color: Color::BLACK,
            transform: Transform::at(center),
            filled,
            outlined: !filled,
            alpha: 1.0,
            dirty: true,
            cache: Vec::new(),
        };
        Self {
            cell: Arc::new(ShapeCell {
                id: ShapeId::next(),
                state: Mutex::new(state),
            }),
        }
    }

    /// Shapes given by absolute points keep those points relative to their
    /// centroid.
    fn from_points(kind: ShapeKind, points: Vec<[f32; 3]>, color: Color, filled: bool) -> Self {
        let center = geometry::centroid(&points);
        let local = points
            .iter()
            .map(|p| [p[0] - center[0], p[1] - center[1], p[2] - center[2]])
            .collect();
        Self::build(kind, local, center, color, filled)
    }

    pub fn line(x1: f32, y1: f32, x2: f32, y2: f32, color: Color) -> Self {
        Self::from_points(ShapeKind::Line, points3(&[(x1, y1), (x2, y2)]), color, false)
    }

    pub fn polyline(points: &[(f32, f32)], color: Color) -> Result<Self> {
        if points.len() < 2 {
            return Err(CanvasError::InvalidGeometry(
                "a polyline needs at least two points".into(),
            ));
        }
        Ok(Self::from_points(ShapeKind::Polyline, points3(points), color, false))
    }

    /// Rectangle with its top left corner at `(x, y)`.
    pub fn rectangle(x: f32, y: f32, width: f32, height: f32, color: Color) -> Self {
        Self::build(
            ShapeKind::Rectangle { width, height },
            geometry::rectangle(width, height),
            [x + width / 2.0, y + height / 2.0, 0.0],
            color,
            true,
        )
    }

    pub fn square(x: f32, y: f32, side: f32, color: Color) -> Self {
        Self::rectangle(x, y, side, side, color)
    }

    pub fn triangle(a: (f32, f32), b: (f32, f32), c: (f32, f32), color: Color) -> Self {
        Self::from_points(ShapeKind::Triangle, points3(&[a, b, c]), color, true)
    }

    pub fn circle(x: f32, y: f32, radius: f32, color: Color) -> Self {
        let sides = geometry::circle_sides(radius);
        Self::build(
            ShapeKind::RegularPolygon { radius, sides },
            geometry::regular_polygon(radius, sides),
            [x, y, 0.0],
            color,
            true,
        )
    }

    pub fn regular_polygon(x: f32, y: f32, radius: f32, sides: usize, color: Color) -> Result<Self> {
        if sides < 3 {
            return Err(CanvasError::InvalidGeometry(format!(
                "a regular polygon needs at least three sides, got {sides}"
            )));
        }
        Ok(Self::build(
            ShapeKind::RegularPolygon { radius, sides },
            geometry::regular_polygon(radius, sides),
            [x, y, 0.0],
            color,
            true,
        ))
    }

    /// Convex polygon. Concave outlines are filled as a fan and will not
    /// look right.
    pub fn polygon(points: &[(f32, f32)], color: Color) -> Result<Self> {
        if points.len() < 3 {
            return Err(CanvasError::InvalidGeometry(
                "a polygon needs at least three points".into(),
            ));
        }
        Ok(Self::from_points(ShapeKind::Polygon, points3(points), color, true))
    }

    /// Text whose baseline starts at `(x, y)`. Needs a font set on the canvas.
    pub fn text(text: impl Into<String>, x: f32, y: f32, size: f32, color: Color) -> Self {
        Self::build(
            ShapeKind::Text {
                text: text.into(),
                size,
            },
            vec![[0.0, 0.0, 0.0]],
            [x, y, 0.0],
            color,
            true,
        )
    }

    pub fn image(image: Arc<Pixmap>, x: f32, y: f32, width: f32, height: f32) -> Self {
        Self::build(
            ShapeKind::Image {
                image,
                width,
                height,
            },
            geometry::rectangle(width, height),
            [x + width / 2.0, y + height / 2.0, 0.0],
            Color::WHITE,
            true,
        )
    }

    pub fn image_file(path: impl AsRef<Path>, x: f32, y: f32, width: f32, height: f32) -> Result<Self> {
        let image = asset::decode_image(path.as_ref())?;
        Ok(Self::image(Arc::new(image), x, y, width, height))
    }

    pub fn sphere(x: f32, y: f32, z: f32, radius: f32, color: Color) -> Self {
        Self::build(
            ShapeKind::Sphere { radius },
            geometry::sphere(radius, SOLID_RESOLUTION),
            [x, y, z],
            color,
            true,
        )
    }

    pub fn cylinder(x: f32, y: f32, z: f32, radius: f32, height: f32, color: Color) -> Self {
        Self::build(
            ShapeKind::Cylinder { radius, height },
            geometry::cylinder(radius, height, SOLID_RESOLUTION),
            [x, y, z],
            color,
            true,
        )
    }

    pub fn cone(x: f32, y: f32, z: f32, radius: f32, height: f32, color: Color) -> Self {
        Self::build(
            ShapeKind::Cone { radius, height },
            geometry::cone(radius, height, SOLID_RESOLUTION),
            [x, y, z],
            color,
            true,
        )
    }

    /// Full pixel layer starting at the canvas origin.
    pub fn background(width: u32, height: u32, color: Color) -> Self {
        let (w, h) = (width as f32, height as f32);
        Self::build(
            ShapeKind::Background {
                pixels: Arc::new(Pixmap::filled(width, height, color)),
            },
            geometry::rectangle(w, h),
            [w / 2.0, h / 2.0, 0.0],
            Color::WHITE,
            true,
        )
    }

    pub fn id(&self) -> ShapeId {
        self.cell.id
    }

    pub(crate) fn downgrade(&self) -> Weak<ShapeCell> {
        Arc::downgrade(&self.cell)
    }

    pub(crate) fn cell(&self) -> &ShapeCell {
        &self.cell
    }

    fn read<R>(&self, f: impl FnOnce(&ShapeState) -> R) -> R {
        f(&lock(&self.cell.state))
    }

    fn mutate<R>(&self, f: impl FnOnce(&mut ShapeState) -> R) -> R {
        let mut state = lock(&self.cell.state);
        let out = f(&mut state);
        state.dirty = true;
        out
    }

    fn try_mutate<R>(&self, f: impl FnOnce(&mut ShapeState) -> Result<R>) -> Result<R> {
        let mut state = lock(&self.cell.state);
        let out = f(&mut state)?;
        state.dirty = true;
        Ok(out)
    }

    pub fn tag(&self) -> ShapeTag {
        self.read(|s| s.kind.tag())
    }

    pub fn kind(&self) -> ShapeKind {
        self.read(|s| s.kind.clone())
    }

    /// Number of vertices; fixed for the lifetime of the shape.
    pub fn vertex_count(&self) -> usize {
        self.read(|s| s.local.len())
    }

    /// True when the shape changed since the renderer last drew it.
    pub fn is_dirty(&self) -> bool {
        self.read(|s| s.dirty)
    }

    /// Vertex positions in canvas space.
    pub fn vertices(&self) -> Vec<[f32; 3]> {
        self.read(|s| s.local.iter().map(|p| s.transform.apply(*p)).collect())
    }

    pub fn set_color(&self, color: Color) {
        self.mutate(|s| s.colors = vec![color]);
    }

    /// Per-vertex colors; `colors` must hold one color or one per vertex.
    pub fn set_colors(&self, colors: &[Color]) -> Result<()> {
        self.try_mutate(|s| {
            if colors.len() != 1 && colors.len() != s.local.len() {
                return Err(CanvasError::OutOfRange {
                    index: colors.len(),
                    len: s.local.len(),
                });
            }
            s.colors = colors.to_vec();
            Ok(())
        })
    }

    pub fn colors(&self) -> Vec<Color> {
        self.read(|s| s.colors.clone())
    }

    pub fn color(&self) -> Color {
        self.read(|s| s.colors.first().copied().unwrap_or_default())
    }

    pub fn set_outline_color(&self, color: Color) {
        self.mutate(|s| s.outline_color = color);
    }

    pub fn set_filled(&self, filled: bool) {
        self.mutate(|s| s.filled = filled);
    }

    pub fn is_filled(&self) -> bool {
        self.read(|s| s.filled)
    }

    pub fn set_outlined(&self, outlined: bool) {
        self.mutate(|s| s.outlined = outlined);
    }

    pub fn is_outlined(&self) -> bool {
        self.read(|s| s.outlined)
    }

    pub fn set_alpha(&self, alpha: f32) {
        self.mutate(|s| s.alpha = alpha.clamp(0.0, 1.0));
    }

    pub fn alpha(&self) -> f32 {
        self.read(|s| s.alpha)
    }

    pub fn center(&self) -> [f32; 3] {
        self.read(|s| s.transform.center)
    }

    pub fn set_center(&self, x: f32, y: f32, z: f32) {
        self.mutate(|s| s.transform.center = [x, y, z]);
    }

    pub fn set_center_x(&self, x: f32) {
        self.mutate(|s| s.transform.center[0] = x);
    }

    pub fn set_center_y(&self, y: f32) {
        self.mutate(|s| s.transform.center[1] = y);
    }

    pub fn set_center_z(&self, z: f32) {
        self.mutate(|s| s.transform.center[2] = z);
    }

    pub fn change_x_by(&self, dx: f32) {
        self.change_center_by(dx, 0.0, 0.0);
    }

    pub fn change_y_by(&self, dy: f32) {
        self.change_center_by(0.0, dy, 0.0);
    }

    pub fn change_z_by(&self, dz: f32) {
        self.change_center_by(0.0, 0.0, dz);
    }

    pub fn change_center_by(&self, dx: f32, dy: f32, dz: f32) {
        self.mutate(|s| {
            let c = &mut s.transform.center;
            c[0] += dx;
            c[1] += dy;
            c[2] += dz;
        });
    }

    pub fn yaw_pitch_roll(&self) -> (f32, f32, f32) {
        self.read(|s| (s.transform.yaw, s.transform.pitch, s.transform.roll))
    }

    pub fn set_yaw(&self, yaw: f32) {
        self.mutate(|s| s.transform.yaw = yaw);
    }

    pub fn set_pitch(&self, pitch: f32) {
        self.mutate(|s| s.transform.pitch = pitch);
    }

    pub fn set_roll(&self, roll: f32) {
        self.mutate(|s| s.transform.roll = roll);
    }

    pub fn set_yaw_pitch_roll(&self, yaw: f32, pitch: f32, roll: f32) {
        self.mutate(|s| {
            s.transform.yaw = yaw;
            s.transform.pitch = pitch;
            s.transform.roll = roll;
        });
    }

    pub fn change_yaw_by(&self, delta: f32) {
        self.change_yaw_pitch_roll_by(delta, 0.0, 0.0);
    }

    pub fn change_pitch_by(&self, delta: f32) {
        self.change_yaw_pitch_roll_by(0.0, delta, 0.0);
    }

    pub fn change_roll_by(&self, delta: f32) {
        self.change_yaw_pitch_roll_by(0.0, 0.0, delta);
    }

    pub fn change_yaw_pitch_roll_by(&self, yaw: f32, pitch: f32, roll: f32) {
        self.mutate(|s| {
            s.transform.yaw += yaw;
            s.transform.pitch += pitch;
            s.transform.roll += roll;
        });
    }

    /// Rotate around `(x, y, z)` instead of the center.
    pub fn set_rotation_point(&self, x: f32, y: f32, z: f32) {
        self.mutate(|s| s.transform.rotation_point = Some([x, y, z]));
    }

    pub fn reset_rotation_point(&self) {
        self.mutate(|s| s.transform.rotation_point = None);
    }

    /// Resize a rectangle or image around its center.
    pub fn set_size(&self, width: f32, height: f32) -> Result<()> {
        self.try_mutate(|s| {
            match &mut s.kind {
                ShapeKind::Rectangle { width: w, height: h }
                | ShapeKind::Image {
                    width: w,
                    height: h,
                    ..
                } => {
                    *w = width;
                    *h = height;
                }
                _ => return Err(s.unsupported("set_size")),
            }
            s.local = geometry::rectangle(width, height);
            Ok(())
        })
    }

    /// Move and resize a rectangle or image in one step. `(x, y)` is the new
    /// top left corner.
    pub fn set_bounds(&self, x: f32, y: f32, width: f32, height: f32) -> Result<()> {
        self.try_mutate(|s| {
            match &mut s.kind {
                ShapeKind::Rectangle { width: w, height: h }
                | ShapeKind::Image {
                    width: w,
                    height: h,
                    ..
                } => {
                    *w = width;
                    *h = height;
                }
                _ => return Err(s.unsupported("set_bounds")),
            }
            s.local = geometry::rectangle(width, height);
            s.transform.center = [x + width / 2.0, y + height / 2.0, s.transform.center[2]];
            Ok(())
        })
    }

    /// Change a circle or regular polygon's radius, keeping its side count.
    pub fn set_radius(&self, radius: f32) -> Result<()> {
        self.try_mutate(|s| match &mut s.kind {
            ShapeKind::RegularPolygon { radius: r, sides } => {
                *r = radius;
                s.local = geometry::regular_polygon(radius, *sides);
                Ok(())
            }
            _ => Err(s.unsupported("set_radius")),
        })
    }

    pub fn set_text(&self, text: impl Into<String>) -> Result<()> {
        let text = text.into();
        self.try_mutate(|s| match &mut s.kind {
            ShapeKind::Text { text: t, .. } => {
                *t = text;
                Ok(())
            }
            _ => Err(s.unsupported("set_text")),
        })
    }

    pub fn set_font_size(&self, size: f32) -> Result<()> {
        self.try_mutate(|s| match &mut s.kind {
            ShapeKind::Text { size: sz, .. } => {
                *sz = size;
                Ok(())
            }
            _ => Err(s.unsupported("set_font_size")),
        })
    }

    /// Edit a background's pixels in one locked section.
    pub fn update_pixels<R>(&self, f: impl FnOnce(&mut Pixmap) -> R) -> Result<R> {
        self.try_mutate(|s| match &mut s.kind {
            ShapeKind::Background { pixels } => Ok(f(Arc::make_mut(pixels))),
            _ => Err(s.unsupported("update_pixels")),
        })
    }

    pub fn set_pixel(&self, x: u32, y: u32, color: Color) -> Result<()> {
        self.update_pixels(|pixels| {
            let (w, h) = (pixels.width(), pixels.height());
            if pixels.set_pixel(x, y, color) {
                Ok(())
            } else {
                Err(CanvasError::OutOfRange {
                    index: y as usize * w as usize + x as usize,
                    len: w as usize * h as usize,
                })
            }
        })?
    }

    pub fn pixel(&self, x: u32, y: u32) -> Result<Color> {
        self.read(|s| match &s.kind {
            ShapeKind::Background { pixels } => pixels
                .pixel(x, y)
                .map(Color::from_rgba8)
                .ok_or(CanvasError::OutOfRange {
                    index: y as usize * pixels.width() as usize + x as usize,
                    len: pixels.width() as usize * pixels.height() as usize,
                }),
            _ => Err(s.unsupported("pixel")),
        })
    }

    pub fn clear_pixels(&self, color: Color) -> Result<()> {
        self.update_pixels(|pixels| pixels.fill(color))
    }
}
