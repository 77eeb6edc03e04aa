//! Immediate-mode drawing commands and the bounded buffer that carries them
//! from drawing threads to the render thread.

use std::collections::VecDeque;
use std::mem;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use log::warn;

use crate::color::Color;
use crate::error::{CanvasError, Result};
use crate::lock;
use crate::raster::{Pixmap, RectF};
use crate::shape::geometry::{self, DrawItem, Primitive, Vertex};

#[derive(Debug, Clone)]
pub enum CommandKind {
    Point {
        x: f32,
        y: f32,
    },
    Line {
        x1: f32,
        y1: f32,
        x2: f32,
        y2: f32,
    },
    Triangle {
        points: [(f32, f32); 3],
        filled: bool,
    },
    /// Top left corner at `(x, y)`.
    Rectangle {
        x: f32,
        y: f32,
        width: f32,
        height: f32,
        filled: bool,
    },
    Circle {
        x: f32,
        y: f32,
        radius: f32,
        filled: bool,
    },
    /// Convex polygon in a single color.
    Polygon {
        points: Vec<(f32, f32)>,
        filled: bool,
    },
    /// Convex polygon with one color per corner.
    ColoredPolygon {
        points: Vec<(f32, f32)>,
        colors: Vec<Color>,
    },
    Text {
        text: String,
        x: f32,
        y: f32,
        size: f32,
    },
    Image {
        image: Arc<Pixmap>,
        dest: RectF,
        alpha: f32,
    },
    /// Erase everything drawn so far.
    Clear,
}

#[derive(Debug, Clone)]
pub struct Command {
    pub kind: CommandKind,
    pub color: Color,
    /// Identity of the issuing worker, if any.
    pub owner: Option<u32>,
}

fn fan_or_loop(points: Vec<[f32; 2]>, colors: &[Color], filled: bool) -> DrawItem {
    let vertices = points
        .iter()
        .enumerate()
        .map(|(i, p)| {
            let c = colors.get(i).or_else(|| colors.first()).copied().unwrap_or_default();
            Vertex::new(p[0], p[1], 0.0, c)
        })
        .collect();
    DrawItem::Mesh {
        mode: if filled {
            Primitive::TriangleFan
        } else {
            Primitive::LineLoop
        },
        vertices,
    }
}

fn pairs(points: &[(f32, f32)]) -> Vec<[f32; 2]> {
    points.iter().map(|&(x, y)| [x, y]).collect()
}

impl Command {
    pub fn new(kind: CommandKind, color: Color) -> Self {
        Self {
            kind,
            color,
            owner: None,
        }
    }

    pub fn owned_by(mut self, owner: u32) -> Self {
        self.owner = Some(owner);
        self
    }

    pub fn is_clear(&self) -> bool {
        matches!(self.kind, CommandKind::Clear)
    }

    /// Every coordinate and extent the command carries.
    fn scalars(&self) -> Vec<f32> {
        match &self.kind {
            CommandKind::Point { x, y } => vec![*x, *y],
            CommandKind::Line { x1, y1, x2, y2 } => vec![*x1, *y1, *x2, *y2],
            CommandKind::Triangle { points, .. } => {
                points.iter().flat_map(|&(x, y)| [x, y]).collect()
            }
            CommandKind::Rectangle {
                x, y, width, height, ..
            } => vec![*x, *y, *width, *height],
            CommandKind::Circle { x, y, radius, .. } => vec![*x, *y, *radius],
            CommandKind::Polygon { points, .. } | CommandKind::ColoredPolygon { points, .. } => {
                points.iter().flat_map(|&(x, y)| [x, y]).collect()
            }
            CommandKind::Text { x, y, size, .. } => vec![*x, *y, *size],
            CommandKind::Image { dest, alpha, .. } => {
                vec![dest.x, dest.y, dest.width, dest.height, *alpha]
            }
            CommandKind::Clear => Vec::new(),
        }
    }

    /// Checks that need the caller's attention before the command is queued.
    pub(crate) fn validate(&self) -> Result<()> {
        if self.scalars().iter().any(|v| !v.is_finite()) {
            return Err(CanvasError::InvalidGeometry(
                "coordinates must be finite".into(),
            ));
        }
        match &self.kind {
            CommandKind::Polygon { points, .. } if points.len() < 3 => Err(
                CanvasError::InvalidGeometry("a polygon needs at least three points".into()),
            ),
            CommandKind::ColoredPolygon { points, .. } if points.len() < 3 => Err(
                CanvasError::InvalidGeometry("a polygon needs at least three points".into()),
            ),
            CommandKind::ColoredPolygon { points, colors }
                if colors.len() != 1 && colors.len() != points.len() =>
            {
                Err(CanvasError::OutOfRange {
                    index: colors.len(),
                    len: points.len(),
                })
            }
            _ => Ok(()),
        }
    }

    /// Backend work for all command kinds except [`CommandKind::Clear`].
    pub(crate) fn to_item(&self) -> Option<DrawItem> {
        let color = self.color;
        let item = match &self.kind {
            CommandKind::Point { x, y } => DrawItem::Mesh {
                mode: Primitive::Points,
                vertices: vec![Vertex::new(*x, *y, 0.0, color)],
            },
            CommandKind::Line { x1, y1, x2, y2 } => DrawItem::Mesh {
                mode: Primitive::Lines,
                vertices: vec![
                    Vertex::new(*x1, *y1, 0.0, color),
                    Vertex::new(*x2, *y2, 0.0, color),
                ],
            },
            CommandKind::Triangle { points, filled } => {
                fan_or_loop(pairs(points), &[color], *filled)
            }
            CommandKind::Rectangle {
                x,
                y,
                width,
                height,
                filled,
            } => {
                let corners = geometry::rectangle(*width, *height)
                    .into_iter()
                    .map(|p| [p[0] + x + width / 2.0, p[1] + y + height / 2.0])
                    .collect();
                fan_or_loop(corners, &[color], *filled)
            }
            CommandKind::Circle {
                x,
                y,
                radius,
                filled,
            } => {
                let rim = geometry::regular_polygon(*radius, geometry::circle_sides(*radius))
                    .into_iter()
                    .map(|p| [p[0] + x, p[1] + y])
                    .collect();
                fan_or_loop(rim, &[color], *filled)
            }
            CommandKind::Polygon { points, filled } => {
                fan_or_loop(pairs(points), &[color], *filled)
            }
            CommandKind::ColoredPolygon { points, colors } => {
                fan_or_loop(pairs(points), colors, true)
            }
            CommandKind::Text { text, x, y, size } => DrawItem::Text {
                x: *x,
                y: *y,
                size: *size,
                text: text.clone(),
                color,
            },
            CommandKind::Image { image, dest, alpha } => DrawItem::Image {
                dest: *dest,
                image: Arc::clone(image),
                alpha: *alpha,
            },
            CommandKind::Clear => return None,
        };
        Some(item)
    }
}

/// Fixed capacity FIFO of pending commands. When full, pushing evicts the
/// oldest command.
pub struct CommandBuffer {
    capacity: usize,
    queue: Mutex<VecDeque<Command>>,
    evicted: AtomicU64,
}

impl CommandBuffer {
    pub fn new(capacity: usize) -> Result<Self> {
        if capacity == 0 {
            return Err(CanvasError::InvalidConfig(
                "command capacity must be positive".into(),
            ));
        }
        Ok(Self {
            capacity,
            queue: Mutex::new(VecDeque::with_capacity(capacity)),
            evicted: AtomicU64::new(0),
        })
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        lock(&self.queue).len()
    }

    pub fn is_empty(&self) -> bool {
        lock(&self.queue).is_empty()
    }

    /// Commands dropped to make room since the buffer was created.
    pub fn evicted(&self) -> u64 {
        self.evicted.load(Ordering::Relaxed)
    }

    /// Queue `command`, returning the command it displaced if the buffer was
    /// full.
    pub fn push(&self, command: Command) -> Option<Command> {
        let displaced = {
            let mut queue = lock(&self.queue);
            let displaced = if queue.len() == self.capacity {
                queue.pop_front()
            } else {
                None
            };
            queue.push_back(command);
            displaced
        };
        if displaced.is_some() && self.evicted.fetch_add(1, Ordering::Relaxed) == 0 {
            warn!(
                "command buffer full at {} entries, dropping oldest commands",
                self.capacity
            );
        }
        displaced
    }

    /// Hand every pending command to `sink` in push order. The queue is
    /// swapped out under the lock, so commands pushed while `sink` runs are
    /// kept for the next drain.
    pub fn drain_into(&self, mut sink: impl FnMut(Command)) -> usize {
        let pending = mem::take(&mut *lock(&self.queue));
        let count = pending.len();
        pending.into_iter().for_each(&mut sink);
        count
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn point(i: u32) -> Command {
        Command::new(CommandKind::Point { x: i as f32, y: 0.0 }, Color::RED).owned_by(i)
    }

    #[test]
    fn non_finite_coordinates_are_rejected() {
        let line = Command::new(
            CommandKind::Line {
                x1: 0.0,
                y1: 0.0,
                x2: f32::INFINITY,
                y2: 1.0,
            },
            Color::RED,
        );
        assert!(matches!(line.validate(), Err(CanvasError::InvalidGeometry(_))));
        let circle = Command::new(
            CommandKind::Circle {
                x: 1.0,
                y: f32::NAN,
                radius: 2.0,
                filled: true,
            },
            Color::RED,
        );
        assert!(circle.validate().is_err());
        assert!(point(3).validate().is_ok());
        assert!(Command::new(CommandKind::Clear, Color::WHITE).validate().is_ok());
    }

    #[test]
    fn zero_capacity_is_rejected() {
        assert!(CommandBuffer::new(0).is_err());
    }

    #[test]
    fn drain_preserves_fifo_order() {
        let buf = CommandBuffer::new(8).unwrap();
        for i in 0..5 {
            assert!(buf.push(point(i)).is_none());
        }
        let mut owners = Vec::new();
        assert_eq!(buf.drain_into(|c| owners.push(c.owner.unwrap())), 5);
        assert_eq!(owners, vec![0, 1, 2, 3, 4]);
        assert!(buf.is_empty());
    }

    #[test]
    fn overflow_evicts_oldest() {
        let buf = CommandBuffer::new(3).unwrap();
        for i in 0..5 {
            buf.push(point(i));
        }
        assert_eq!(buf.evicted(), 2);
        let mut owners = Vec::new();
        buf.drain_into(|c| owners.push(c.owner.unwrap()));
        assert_eq!(owners, vec![2, 3, 4]);
    }

    #[test]
    fn push_during_drain_waits_for_next_drain() {
        let buf = CommandBuffer::new(4).unwrap();
        buf.push(point(1));
        buf.drain_into(|_| {
            buf.push(point(2));
        });
        let mut owners = Vec::new();
        buf.drain_into(|c| owners.push(c.owner.unwrap()));
        assert_eq!(owners, vec![2]);
    }

    #[test]
    fn colored_polygon_needs_matching_colors() {
        let cmd = Command::new(
            CommandKind::ColoredPolygon {
                points: vec![(0.0, 0.0), (1.0, 0.0), (0.0, 1.0)],
                colors: vec![Color::RED, Color::BLUE],
            },
            Color::BLACK,
        );
        assert!(matches!(cmd.validate(), Err(CanvasError::OutOfRange { index: 2, len: 3 })));
    }

    #[test]
    fn clear_has_no_draw_item() {
        let cmd = Command::new(CommandKind::Clear, Color::BLACK);
        assert!(cmd.is_clear());
        assert!(cmd.to_item().is_none());
    }
}
