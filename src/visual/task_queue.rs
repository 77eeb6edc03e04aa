use crate::canvas::{Canvas, CanvasState};
use crate::color::Color;
use crate::command::{Command, CommandKind};
use crate::config::CanvasSettings;
use crate::error::{CanvasError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskState {
    Running,
    Finished,
}

/// Grid geometry of a task queue window.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct QueueLayout {
    pub elements: usize,
    pub block_size: u32,
    /// Approximate height / width of the grid.
    pub aspect: f32,
    pub spacing: u32,
    pub border: u32,
}

impl Default for QueueLayout {
    fn default() -> Self {
        Self {
            elements: 64,
            block_size: 20,
            aspect: 1.0,
            spacing: 4,
            border: 8,
        }
    }
}

impl QueueLayout {
    pub fn with_elements(elements: usize) -> Self {
        Self {
            elements,
            ..Self::default()
        }
    }

    pub fn row_length(&self) -> usize {
        ((self.elements as f32 / self.aspect).sqrt().ceil() as usize).max(1)
    }

    pub fn rows(&self) -> usize {
        self.elements.div_ceil(self.row_length()).max(1)
    }

    /// Canvas size that fits every block.
    pub fn window_size(&self) -> (u32, u32) {
        let cell = self.block_size + self.spacing;
        (
            2 * self.border + cell * self.row_length() as u32,
            2 * self.border + cell * self.rows() as u32,
        )
    }

    fn block_origin(&self, index: usize) -> (f32, f32) {
        let cell = (self.block_size + self.spacing) as f32;
        let col = index % self.row_length();
        let row = index / self.row_length();
        (
            self.border as f32 + col as f32 * cell,
            self.border as f32 + row as f32 * cell,
        )
    }

    fn validate(&self) -> Result<()> {
        if self.elements == 0 || self.block_size == 0 || self.aspect.is_nan() || self.aspect <= 0.0 {
            return Err(CanvasError::InvalidConfig(format!(
                "invalid task queue layout {self:?}"
            )));
        }
        Ok(())
    }
}

/// Shows which worker handled which task. Each task is a block on its own
/// canvas, colored by the worker's color blended toward black while running
/// and toward white once finished.
pub struct VisualTaskQueue {
    layout: QueueLayout,
    canvas: Canvas,
}

impl VisualTaskQueue {
    /// Settings for a canvas sized to `layout`.
    pub fn settings(layout: &QueueLayout) -> CanvasSettings {
        let (w, h) = layout.window_size();
        CanvasSettings::new(w, h).with_title("Thread colors")
    }

    /// Use `canvas` as the queue's window, starting it if needed.
    pub fn new(layout: QueueLayout, canvas: Canvas) -> Result<Self> {
        layout.validate()?;
        if canvas.state() == CanvasState::Created {
            canvas.start()?;
        }
        let queue = Self { layout, canvas };
        queue.reset()?;
        Ok(queue)
    }

    pub fn layout(&self) -> &QueueLayout {
        &self.layout
    }

    pub fn canvas(&self) -> &Canvas {
        &self.canvas
    }

    pub fn window_size(&self) -> (u32, u32) {
        self.layout.window_size()
    }

    fn block(&self, index: usize, color: Color, owner: Option<u32>) -> Result<()> {
        let (x, y) = self.layout.block_origin(index);
        let size = self.layout.block_size as f32;
        let mut command = Command::new(
            CommandKind::Rectangle {
                x,
                y,
                width: size,
                height: size,
                filled: true,
            },
            color,
        );
        command.owner = owner;
        self.canvas.push_command(command)
    }

    /// Mark task `index` as handled by worker `thread`.
    pub fn update(&self, index: usize, state: TaskState, thread: u32) -> Result<()> {
        if index >= self.layout.elements {
            return Err(CanvasError::OutOfRange {
                index,
                len: self.layout.elements,
            });
        }
        let toward = match state {
            TaskState::Running => Color::BLACK,
            TaskState::Finished => Color::WHITE,
        };
        let color = Color::blend(Color::high_contrast(thread), toward, 0.5);
        self.block(index, color, Some(thread))
    }

    /// Blank every task block.
    pub fn reset(&self) -> Result<()> {
        (0..self.layout.elements).try_for_each(|i| self.block(i, Color::WHITE, None))
    }

    /// Close the queue's canvas and wait for it.
    pub fn close(&self) -> Result<()> {
        self.canvas.stop()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn layout_fits_all_elements() {
        let layout = QueueLayout {
            elements: 10,
            block_size: 10,
            aspect: 1.0,
            spacing: 2,
            border: 5,
        };
        assert_eq!(layout.row_length(), 4);
        assert_eq!(layout.rows(), 3);
        assert_eq!(layout.window_size(), (10 + 12 * 4, 10 + 12 * 3));
        assert_eq!(layout.block_origin(5), (5.0 + 12.0, 5.0 + 12.0));
    }

    #[test]
    fn zero_elements_is_invalid() {
        assert!(QueueLayout::with_elements(0).validate().is_err());
    }
}
