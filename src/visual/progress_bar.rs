use crate::canvas::Canvas;
use crate::color::Color;
use crate::error::{CanvasError, Result};
use crate::shape::Shape;

/// A bar split into equal segments, one per worker. Each segment fills from
/// its left edge as its share of the value range is covered.
pub struct ProgressBar {
    x: f32,
    y: f32,
    width: f32,
    height: f32,
    min: f32,
    max: f32,
    fills: Vec<Shape>,
    borders: Vec<Shape>,
}

impl ProgressBar {
    /// `(x, y)` is the top left corner.
    pub fn new(
        x: f32,
        y: f32,
        width: f32,
        height: f32,
        min: f32,
        max: f32,
        segments: usize,
    ) -> Result<Self> {
        if segments == 0 {
            return Err(CanvasError::InvalidGeometry(
                "a progress bar needs at least one segment".into(),
            ));
        }
        if max <= min {
            return Err(CanvasError::InvalidGeometry(format!(
                "empty progress range {min}..{max}"
            )));
        }
        let seg_width = width / segments as f32;
        let mut fills = Vec::with_capacity(segments);
        let mut borders = Vec::with_capacity(segments);
        for i in 0..segments {
            let left = x + i as f32 * seg_width;
            let fill = Shape::rectangle(
                left,
                y + 1.0,
                0.0,
                height - 2.0,
                Color::high_contrast(i as u32),
            );
            fill.set_outlined(false);
            fills.push(fill);
            borders.push(Shape::polyline(
                &[
                    (left, y),
                    (left + seg_width, y),
                    (left + seg_width, y + height),
                    (left, y + height),
                    (left, y),
                ],
                Color::BLACK,
            )?);
        }
        Ok(Self {
            x,
            y,
            width,
            height,
            min,
            max,
            fills,
            borders,
        })
    }

    pub fn segments(&self) -> usize {
        self.fills.len()
    }

    fn segment_width(&self) -> f32 {
        self.width / self.segments() as f32
    }

    /// Value range covered by `segment`.
    pub fn segment_range(&self, segment: usize) -> (f32, f32) {
        let step = (self.max - self.min) / self.segments() as f32;
        let start = self.min + step * segment as f32;
        (start, start + step)
    }

    /// Show `value` in `segment`, clamped to the segment's range.
    pub fn update(&self, value: f32, segment: usize) -> Result<()> {
        let fill = self.fills.get(segment).ok_or(CanvasError::OutOfRange {
            index: segment,
            len: self.segments(),
        })?;
        let (start, end) = self.segment_range(segment);
        let percent = (value.clamp(start, end) - start) / (end - start);
        let left = self.x + segment as f32 * self.segment_width();
        fill.set_bounds(
            left,
            self.y + 1.0,
            percent * self.segment_width(),
            self.height - 2.0,
        )
    }

    /// Fill fraction of `segment` in `[0, 1]`.
    pub fn progress(&self, segment: usize) -> Option<f32> {
        let fill = self.fills.get(segment)?;
        let xs: Vec<f32> = fill.vertices().iter().map(|v| v[0]).collect();
        let span = xs.iter().cloned().fold(f32::MIN, f32::max) - xs.iter().cloned().fold(f32::MAX, f32::min);
        Some(span / self.segment_width())
    }

    /// Fills first, borders on top.
    pub fn shapes(&self) -> impl Iterator<Item = &Shape> {
        self.fills.iter().chain(self.borders.iter())
    }

    pub fn add_to(&self, canvas: &Canvas) -> Result<()> {
        self.shapes().try_for_each(|s| canvas.add(s))
    }

    pub fn remove_from(&self, canvas: &Canvas) -> Result<()> {
        self.shapes().try_for_each(|s| canvas.remove(s))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_degenerate_bars() {
        assert!(ProgressBar::new(0.0, 0.0, 100.0, 10.0, 0.0, 1.0, 0).is_err());
        assert!(ProgressBar::new(0.0, 0.0, 100.0, 10.0, 5.0, 5.0, 2).is_err());
    }

    #[test]
    fn segments_split_the_range() {
        let bar = ProgressBar::new(0.0, 0.0, 100.0, 10.0, 0.0, 100.0, 4).unwrap();
        assert_eq!(bar.segment_range(0), (0.0, 25.0));
        assert_eq!(bar.segment_range(3), (75.0, 100.0));
        assert_eq!(bar.shapes().count(), 8);
    }

    #[test]
    fn update_clamps_and_keeps_left_edge() {
        let bar = ProgressBar::new(10.0, 0.0, 100.0, 10.0, 0.0, 100.0, 2).unwrap();
        bar.update(25.0, 0).unwrap();
        assert!((bar.progress(0).unwrap() - 0.5).abs() < 1e-5);
        let left = bar.fills[0].vertices().iter().map(|v| v[0]).fold(f32::MAX, f32::min);
        assert!((left - 10.0).abs() < 1e-5);

        bar.update(500.0, 1).unwrap();
        assert!((bar.progress(1).unwrap() - 1.0).abs() < 1e-5);
        bar.update(-3.0, 1).unwrap();
        assert!(bar.progress(1).unwrap().abs() < 1e-5);
    }

    #[test]
    fn unknown_segment_is_out_of_range() {
        let bar = ProgressBar::new(0.0, 0.0, 100.0, 10.0, 0.0, 1.0, 3).unwrap();
        assert!(matches!(
            bar.update(0.5, 3),
            Err(CanvasError::OutOfRange { index: 3, len: 3 })
        ));
    }
}
