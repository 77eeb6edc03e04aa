//! Vertex data and the tessellation helpers shared by shapes and immediate
//! drawing commands.

use std::f32::consts::PI;
use std::sync::Arc;

use crate::color::Color;
use crate::raster::{Pixmap, RectF};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Vertex {
    pub x: f32,
    pub y: f32,
    pub z: f32,
    pub color: Color,
}

impl Vertex {
    pub fn new(x: f32, y: f32, z: f32, color: Color) -> Self {
        Self { x, y, z, color }
    }
}

/// How a run of vertices is assembled into primitives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Primitive {
    Points,
    Lines,
    LineStrip,
    LineLoop,
    Triangles,
    TriangleStrip,
    TriangleFan,
}

/// One unit of work handed to the backend.
#[derive(Debug, Clone)]
pub enum DrawItem {
    Mesh {
        mode: Primitive,
        vertices: Vec<Vertex>,
    },
    Image {
        dest: RectF,
        image: Arc<Pixmap>,
        alpha: f32,
    },
    /// Left end of the baseline at `(x, y)`.
    Text {
        x: f32,
        y: f32,
        size: f32,
        text: String,
        color: Color,
    },
}

/// Position and orientation of a shape. Angles are in degrees; yaw turns in
/// the screen plane, pitch about the horizontal axis, roll about the vertical
/// axis.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform {
    pub center: [f32; 3],
    pub yaw: f32,
    pub pitch: f32,
    pub roll: f32,
    pub rotation_point: Option<[f32; 3]>,
}

impl Transform {
    pub fn at(center: [f32; 3]) -> Self {
        Self {
            center,
            yaw: 0.0,
            pitch: 0.0,
            roll: 0.0,
            rotation_point: None,
        }
    }

    pub fn is_rotated(&self) -> bool {
        self.yaw != 0.0 || self.pitch != 0.0 || self.roll != 0.0
    }

    /// Map a vertex given relative to the center into canvas space.
    pub fn apply(&self, local: [f32; 3]) -> [f32; 3] {
        let p = [
            self.center[0] + local[0],
            self.center[1] + local[1],
            self.center[2] + local[2],
        ];
        if !self.is_rotated() {
            return p;
        }
        let pivot = self.rotation_point.unwrap_or(self.center);
        let mut d = [p[0] - pivot[0], p[1] - pivot[1], p[2] - pivot[2]];

        let (sr, cr) = self.roll.to_radians().sin_cos();
        d = [d[0] * cr + d[2] * sr, d[1], -d[0] * sr + d[2] * cr];
        let (sp, cp) = self.pitch.to_radians().sin_cos();
        d = [d[0], d[1] * cp - d[2] * sp, d[1] * sp + d[2] * cp];
        let (sy, cy) = self.yaw.to_radians().sin_cos();
        d = [d[0] * cy - d[1] * sy, d[0] * sy + d[1] * cy, d[2]];

        [pivot[0] + d[0], pivot[1] + d[1], pivot[2] + d[2]]
    }
}

/// Side count used for circles of the given radius.
pub fn circle_sides(radius: f32) -> usize {
    (radius.abs() as usize).clamp(16, 180)
}

pub fn regular_polygon(radius: f32, sides: usize) -> Vec<[f32; 3]> {
    (0..sides)
        .map(|i| {
            let a = 2.0 * PI * i as f32 / sides as f32;
            [radius * a.cos(), radius * a.sin(), 0.0]
        })
        .collect()
}

/// Corners of a `width` x `height` rectangle around the origin, clockwise
/// from the top left.
pub fn rectangle(width: f32, height: f32) -> Vec<[f32; 3]> {
    let (hw, hh) = (width / 2.0, height / 2.0);
    vec![[-hw, -hh, 0.0], [hw, -hh, 0.0], [hw, hh, 0.0], [-hw, hh, 0.0]]
}

pub fn centroid(points: &[[f32; 3]]) -> [f32; 3] {
    let n = points.len().max(1) as f32;
    let sum = points.iter().fold([0.0; 3], |acc, p| {
        [acc[0] + p[0], acc[1] + p[1], acc[2] + p[2]]
    });
    [sum[0] / n, sum[1] / n, sum[2] / n]
}

/// Triangle list of a UV sphere with `resolution` bands.
pub fn sphere(radius: f32, resolution: usize) -> Vec<[f32; 3]> {
    let point = |band: usize, seg: usize| {
        let theta = PI * band as f32 / resolution as f32;
        let phi = 2.0 * PI * seg as f32 / resolution as f32;
        [
            radius * theta.sin() * phi.cos(),
            radius * theta.cos(),
            radius * theta.sin() * phi.sin(),
        ]
    };
    let mut out = Vec::with_capacity(resolution * resolution * 6);
    for band in 0..resolution {
        for seg in 0..resolution {
            let a = point(band, seg);
            let b = point(band + 1, seg);
            let c = point(band + 1, seg + 1);
            let d = point(band, seg + 1);
            out.extend_from_slice(&[a, b, c, a, c, d]);
        }
    }
    out
}

/// Triangle list of a capped cylinder standing on the vertical axis.
pub fn cylinder(radius: f32, height: f32, resolution: usize) -> Vec<[f32; 3]> {
    let hh = height / 2.0;
    let rim = |i: usize, y: f32| {
        let a = 2.0 * PI * i as f32 / resolution as f32;
        [radius * a.cos(), y, radius * a.sin()]
    };
    let mut out = Vec::with_capacity(resolution * 12);
    for i in 0..resolution {
        let (t0, t1) = (rim(i, -hh), rim(i + 1, -hh));
        let (b0, b1) = (rim(i, hh), rim(i + 1, hh));
        out.extend_from_slice(&[t0, b0, b1, t0, b1, t1]);
        out.extend_from_slice(&[[0.0, -hh, 0.0], t0, t1]);
        out.extend_from_slice(&[[0.0, hh, 0.0], b1, b0]);
    }
    out
}

/// Triangle list of a cone with its apex up.
pub fn cone(radius: f32, height: f32, resolution: usize) -> Vec<[f32; 3]> {
    let hh = height / 2.0;
    let apex = [0.0, -hh, 0.0];
    let base = [0.0, hh, 0.0];
    let rim = |i: usize| {
        let a = 2.0 * PI * i as f32 / resolution as f32;
        [radius * a.cos(), hh, radius * a.sin()]
    };
    let mut out = Vec::with_capacity(resolution * 6);
    for i in 0..resolution {
        let (r0, r1) = (rim(i), rim(i + 1));
        out.extend_from_slice(&[apex, r0, r1]);
        out.extend_from_slice(&[base, r1, r0]);
    }
    out
}

/// Reorder a triangle list so that farther triangles come first. Depth grows
/// toward the viewer.
pub fn sort_back_to_front(vertices: &mut Vec<Vertex>) {
    let mut tris: Vec<[Vertex; 3]> = vertices
        .chunks_exact(3)
        .map(|t| [t[0], t[1], t[2]])
        .collect();
    tris.sort_by(|a, b| {
        let za = a[0].z + a[1].z + a[2].z;
        let zb = b[0].z + b[1].z + b[2].z;
        za.total_cmp(&zb)
    });
    vertices.clear();
    vertices.extend(tris.into_iter().flatten());
}
