//! Canvas-backed instrumentation for parallel programs

pub mod progress_bar;
pub mod task_queue;

pub use progress_bar::ProgressBar;
pub use task_queue::{QueueLayout, TaskState, VisualTaskQueue};
