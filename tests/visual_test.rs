use std::time::Duration;

use tsgl::{
    Canvas, CanvasError, CanvasState, Color, ProgressBar, QueueLayout, TaskState, VisualTaskQueue,
};

const TIMEOUT: Duration = Duration::from_secs(5);

#[test]
fn layout_fits_every_element() {
    let layout = QueueLayout::with_elements(10);
    assert_eq!(layout.row_length(), 4);
    assert_eq!(layout.rows(), 3);
    let (w, h) = layout.window_size();
    let cell = layout.block_size + layout.spacing;
    assert_eq!(w, 2 * layout.border + 4 * cell);
    assert_eq!(h, 2 * layout.border + 3 * cell);
}

#[test]
fn task_queue_colours_blocks_by_thread() {
    let layout = QueueLayout::with_elements(4);
    let settings = VisualTaskQueue::settings(&layout).with_fps(200);
    let (canvas, capture) = Canvas::headless(settings).unwrap();
    let queue = VisualTaskQueue::new(layout, canvas).unwrap();
    assert_eq!(queue.canvas().state(), CanvasState::Running);

    queue.update(0, TaskState::Running, 1).unwrap();
    queue.update(1, TaskState::Finished, 1).unwrap();
    assert!(matches!(
        queue.update(4, TaskState::Running, 0),
        Err(CanvasError::OutOfRange { index: 4, len: 4 })
    ));

    let target = capture.presented() + 2;
    assert!(capture.wait_for_frames(target, TIMEOUT));
    let inside = layout.border + layout.block_size / 2;
    let running = Color::blend(Color::high_contrast(1), Color::BLACK, 0.5);
    let finished = Color::blend(Color::high_contrast(1), Color::WHITE, 0.5);
    let px = capture.latest_frame().unwrap();
    assert_eq!(px.pixel(inside, inside), Some(running.to_rgba8()));
    let second = inside + layout.block_size + layout.spacing;
    assert_eq!(px.pixel(second, inside), Some(finished.to_rgba8()));

    queue.reset().unwrap();
    let target = capture.presented() + 2;
    assert!(capture.wait_for_frames(target, TIMEOUT));
    assert_eq!(capture.pixel(inside, inside), Some(Color::WHITE));
    queue.close().unwrap();
    assert_eq!(queue.canvas().state(), CanvasState::Closed);
}

#[test]
fn progress_bar_segments_fill_independently() {
    let bar = ProgressBar::new(0.0, 0.0, 100.0, 10.0, 0.0, 40.0, 4).unwrap();
    assert_eq!(bar.segments(), 4);
    assert_eq!(bar.segment_range(1), (10.0, 20.0));
    assert_eq!(bar.progress(0), Some(0.0));

    bar.update(15.0, 1).unwrap();
    bar.update(99.0, 3).unwrap();
    assert!((bar.progress(1).unwrap() - 0.5).abs() < 1e-4);
    assert!((bar.progress(3).unwrap() - 1.0).abs() < 1e-4);
    assert_eq!(bar.progress(0), Some(0.0));
    assert!(bar.update(1.0, 4).is_err());
}

#[test]
fn progress_bar_draws_on_a_canvas() {
    let (canvas, capture) =
        Canvas::headless(tsgl::CanvasSettings::new(100, 20).with_fps(200)).unwrap();
    let bar = ProgressBar::new(0.0, 0.0, 100.0, 20.0, 0.0, 2.0, 2).unwrap();
    bar.add_to(&canvas).unwrap();
    assert_eq!(canvas.shape_count(), 4);

    bar.update(1.0, 0).unwrap();
    canvas.start().unwrap();
    assert!(capture.wait_for_frames(2, TIMEOUT));
    assert_eq!(capture.pixel(25, 10), Some(Color::high_contrast(0)));
    assert_eq!(capture.pixel(75, 10), Some(Color::WHITE));

    bar.remove_from(&canvas).unwrap();
    assert_eq!(canvas.shape_count(), 0);
    canvas.stop().unwrap();
}
