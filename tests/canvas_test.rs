use std::ops::Range;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{mpsc, Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use rand::seq::SliceRandom;
use tsgl::shape::{Primitive, Vertex};
use tsgl::{
    Action, Backend, Canvas, CanvasError, CanvasSettings, CanvasState, Color, FrameCapture,
    InputEvent, Key, MouseButton, Pixmap, RectF, Shape,
};

const TIMEOUT: Duration = Duration::from_secs(5);

fn headless(width: u32, height: u32) -> (Canvas, FrameCapture) {
    Canvas::headless(CanvasSettings::new(width, height).with_fps(200)).unwrap()
}

/// First frame presented after everything queued so far was drawn.
fn settle(capture: &FrameCapture) {
    let target = capture.presented() + 2;
    assert!(capture.wait_for_frames(target, TIMEOUT));
}

#[test]
fn lifecycle_runs_from_created_to_closed() {
    let (canvas, capture) = headless(32, 32);
    assert_eq!(canvas.state(), CanvasState::Created);

    canvas.start().unwrap();
    assert!(canvas.is_open());
    assert!(capture.wait_for_frames(1, TIMEOUT));
    assert!(matches!(canvas.start(), Err(CanvasError::AlreadyStarted)));

    canvas.close();
    canvas.close();
    canvas.wait().unwrap();
    assert_eq!(canvas.state(), CanvasState::Closed);
    assert!(!canvas.is_open());
    assert!(matches!(canvas.start(), Err(CanvasError::Closed)));
}

#[test]
fn later_shapes_paint_over_earlier_ones() {
    let (canvas, capture) = headless(64, 64);
    let square = Shape::square(10.0, 10.0, 40.0, Color::RED);
    let circle = Shape::circle(40.0, 40.0, 12.0, Color::BLUE);
    canvas.add(&square).unwrap();
    canvas.add(&circle).unwrap();

    canvas.start().unwrap();
    assert!(capture.wait_for_frames(2, TIMEOUT));
    assert_eq!(capture.pixel(40, 40), Some(Color::BLUE));
    assert_eq!(capture.pixel(15, 15), Some(Color::RED));
    assert_eq!(capture.pixel(2, 2), Some(Color::WHITE));
    canvas.stop().unwrap();
}

#[test]
fn removed_shape_is_no_longer_drawn() {
    let (canvas, capture) = headless(32, 32);
    let square = Shape::square(0.0, 0.0, 32.0, Color::GREEN);
    canvas.add(&square).unwrap();
    canvas.start().unwrap();
    settle(&capture);
    assert_eq!(capture.pixel(16, 16), Some(Color::GREEN));

    canvas.remove(&square).unwrap();
    assert!(matches!(
        canvas.remove(&square),
        Err(CanvasError::NotRegistered(_))
    ));
    settle(&capture);
    assert_eq!(capture.pixel(16, 16), Some(Color::WHITE));
    canvas.stop().unwrap();
}

#[test]
fn dropped_shape_disappears_from_the_canvas() {
    let (canvas, capture) = headless(32, 32);
    let square = Shape::square(0.0, 0.0, 32.0, Color::RED);
    canvas.add(&square).unwrap();
    canvas.start().unwrap();
    settle(&capture);

    drop(square);
    settle(&capture);
    assert_eq!(canvas.shape_count(), 0);
    assert_eq!(capture.pixel(16, 16), Some(Color::WHITE));
    canvas.stop().unwrap();
}

#[test]
fn close_interrupts_a_sleeping_draw_thread() {
    let (canvas, _capture) = headless(16, 16);
    let (tx, rx) = mpsc::channel();
    canvas
        .start_with(move |canvas| {
            let slept_fully = canvas.sleep_for(Duration::from_secs(30));
            let _ = tx.send(slept_fully);
        })
        .unwrap();

    thread::sleep(Duration::from_millis(50));
    let started = Instant::now();
    canvas.close();
    assert!(!rx.recv_timeout(TIMEOUT).unwrap());
    canvas.wait().unwrap();
    assert!(started.elapsed() < TIMEOUT);
}

#[test]
fn frame_sleep_returns_false_once_closed() {
    let (canvas, _capture) = headless(16, 16);
    let (tx, rx) = mpsc::channel();
    canvas
        .start_with(move |canvas| {
            let mut frames = 0u64;
            while canvas.sleep() {
                frames += 1;
            }
            let _ = tx.send(frames);
        })
        .unwrap();

    thread::sleep(Duration::from_millis(100));
    assert!(canvas.frame_number() > 0);
    canvas.stop().unwrap();
    assert!(rx.recv_timeout(TIMEOUT).unwrap() > 0);
}

#[test]
fn drawing_after_close_is_rejected() {
    let (canvas, _capture) = headless(16, 16);
    canvas.start().unwrap();
    canvas.stop().unwrap();

    assert!(matches!(
        canvas.draw_point(1.0, 1.0, Color::RED),
        Err(CanvasError::Closed)
    ));
    assert!(matches!(
        canvas.add(&Shape::square(0.0, 0.0, 4.0, Color::RED)),
        Err(CanvasError::Closed)
    ));
    assert!(matches!(canvas.clear(), Err(CanvasError::Closed)));
    assert!(matches!(canvas.clear_shapes(), Err(CanvasError::Closed)));
}

/// Runs `f` on its own thread and fails the test if it does not finish.
fn within_timeout<T: Send + 'static>(f: impl FnOnce() -> T + Send + 'static) -> T {
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        let _ = tx.send(f());
    });
    rx.recv_timeout(TIMEOUT).expect("call did not return in time")
}

#[test]
fn stop_from_the_draw_thread_does_not_hang() {
    let (canvas, _capture) = headless(16, 16);
    let handle = canvas.clone();
    let result = within_timeout(move || {
        handle.run(|c| {
            c.sleep();
            c.stop().unwrap();
        })
    });
    result.unwrap();
    assert_eq!(canvas.state(), CanvasState::Closed);
}

#[test]
fn wait_from_the_draw_thread_returns_once_closed() {
    let (canvas, _capture) = headless(16, 16);
    let handle = canvas.clone();
    let result = within_timeout(move || {
        handle.run(|c| {
            let closer = c.clone();
            thread::spawn(move || {
                thread::sleep(Duration::from_millis(20));
                closer.close();
            });
            c.wait().unwrap();
        })
    });
    result.unwrap();
    assert!(!canvas.is_open());
}

#[test]
fn stop_from_an_input_callback_does_not_hang() {
    let (canvas, capture) = headless(16, 16);
    let handle = canvas.clone();
    canvas.bind_to_button(Key::Space, Action::Press, move || {
        handle.stop().unwrap();
    });
    canvas.start().unwrap();
    capture.send_event(InputEvent::Key {
        key: Key::Space,
        action: Action::Press,
    });
    let waiter = canvas.clone();
    within_timeout(move || waiter.wait()).unwrap();
    assert_eq!(canvas.state(), CanvasState::Closed);
}

#[test]
fn close_before_start_needs_no_wait() {
    let (canvas, _capture) = headless(16, 16);
    assert!(matches!(canvas.wait(), Err(CanvasError::NotStarted)));
    canvas.close();
    assert_eq!(canvas.state(), CanvasState::Closed);
    canvas.stop().unwrap();
}

#[test]
fn concurrent_recolouring_never_tears_a_shape() {
    let palette = [Color::RED, Color::GREEN, Color::BLUE, Color::YELLOW];
    let (canvas, capture) = headless(40, 40);
    let square = Shape::square(0.0, 0.0, 40.0, Color::RED);
    canvas.add(&square).unwrap();

    let writer_shape = square.clone();
    canvas
        .start_with(move |canvas| {
            let mut rng = rand::thread_rng();
            while canvas.is_open() {
                let color = *palette.choose(&mut rng).unwrap_or(&Color::RED);
                writer_shape.set_color(color);
                thread::yield_now();
            }
        })
        .unwrap();

    let mut seen = 0;
    while seen < 100 {
        assert!(capture.wait_for_frames(capture.presented() + 1, TIMEOUT));
        let frame = capture.latest_frame().unwrap();
        let corner = frame.pixel(0, 0).map(Color::from_rgba8).unwrap();
        let centre = frame.pixel(20, 20).map(Color::from_rgba8).unwrap();
        let far = frame.pixel(39, 39).map(Color::from_rgba8).unwrap();
        assert!(palette.contains(&centre), "unexpected colour {centre:?}");
        assert_eq!(corner, centre);
        assert_eq!(far, centre);
        seen += 1;
    }
    canvas.stop().unwrap();
}

#[test]
fn escape_closes_the_canvas() {
    let (canvas, capture) = headless(16, 16);
    canvas.start().unwrap();
    capture.send_event(InputEvent::Key {
        key: Key::Escape,
        action: Action::Press,
    });
    canvas.wait().unwrap();
    assert_eq!(canvas.state(), CanvasState::Closed);
}

#[test]
fn close_request_from_the_window_closes_the_canvas() {
    let (canvas, capture) = headless(16, 16);
    canvas.start().unwrap();
    capture.send_event(InputEvent::CloseRequested);
    canvas.wait().unwrap();
    assert!(!canvas.is_open());
}

#[test]
fn bound_callbacks_fire_on_the_render_thread() {
    let (canvas, capture) = headless(16, 16);
    let clicks = Arc::new(AtomicUsize::new(0));
    let scrolled = Arc::new(Mutex::new(Vec::new()));

    let c = Arc::clone(&clicks);
    canvas.bind_to_button(MouseButton::Left, Action::Press, move || {
        c.fetch_add(1, Ordering::SeqCst);
    });
    let s = Arc::clone(&scrolled);
    canvas.bind_to_scroll(move |dx, dy| s.lock().unwrap().push((dx, dy)));

    canvas.start().unwrap();
    capture.send_event(InputEvent::CursorMoved { x: 7.0, y: 9.0 });
    capture.send_event(InputEvent::Button {
        button: MouseButton::Left,
        action: Action::Press,
    });
    capture.send_event(InputEvent::Button {
        button: MouseButton::Left,
        action: Action::Release,
    });
    capture.send_event(InputEvent::Scroll { dx: 0.0, dy: -1.0 });
    settle(&capture);

    assert_eq!(clicks.load(Ordering::SeqCst), 1);
    assert_eq!(*scrolled.lock().unwrap(), vec![(0.0, -1.0)]);
    assert_eq!((canvas.mouse_x(), canvas.mouse_y()), (7.0, 9.0));
    canvas.stop().unwrap();
}

#[test]
fn rebinding_escape_keeps_the_canvas_open() {
    let (canvas, capture) = headless(16, 16);
    let pressed = Arc::new(AtomicUsize::new(0));
    let p = Arc::clone(&pressed);
    canvas.bind_to_button(Key::Escape, Action::Press, move || {
        p.fetch_add(1, Ordering::SeqCst);
    });
    canvas.start().unwrap();
    capture.send_event(InputEvent::Key {
        key: Key::Escape,
        action: Action::Press,
    });
    settle(&capture);
    assert!(canvas.is_open());
    assert_eq!(pressed.load(Ordering::SeqCst), 1);
    canvas.stop().unwrap();
}

#[test]
fn immediate_commands_persist_until_cleared() {
    let (canvas, capture) = headless(32, 32);
    canvas.start().unwrap();
    canvas
        .draw_rectangle(4.0, 4.0, 10.0, 10.0, Color::GREEN, true)
        .unwrap();
    settle(&capture);
    assert_eq!(capture.pixel(8, 8), Some(Color::GREEN));
    settle(&capture);
    assert_eq!(capture.pixel(8, 8), Some(Color::GREEN));

    canvas.clear().unwrap();
    settle(&capture);
    assert_eq!(capture.pixel(8, 8), Some(Color::WHITE));
    canvas.stop().unwrap();
}

#[test]
fn shapes_draw_over_immediate_commands() {
    let (canvas, capture) = headless(32, 32);
    let left_half = Shape::rectangle(0.0, 0.0, 16.0, 32.0, Color::BLUE);
    canvas.add(&left_half).unwrap();
    canvas.start().unwrap();
    canvas
        .draw_rectangle(0.0, 0.0, 32.0, 32.0, Color::RED, true)
        .unwrap();
    settle(&capture);
    assert_eq!(capture.pixel(8, 16), Some(Color::BLUE));
    assert_eq!(capture.pixel(24, 16), Some(Color::RED));
    canvas.stop().unwrap();
}

#[test]
fn background_colour_shows_through() {
    let (canvas, capture) = headless(16, 16);
    canvas.set_background_color(Color::GRAY);
    canvas.start().unwrap();
    settle(&capture);
    assert_eq!(canvas.background_color(), Color::GRAY);
    let px = capture.latest_frame().unwrap().pixel(3, 3).unwrap();
    assert_eq!(px, Color::GRAY.to_rgba8());
    canvas.stop().unwrap();
}

#[test]
fn invalid_commands_are_rejected_up_front() {
    let (canvas, _capture) = headless(16, 16);
    canvas.start().unwrap();
    assert!(matches!(
        canvas.draw_colored_polygon(&[(0.0, 0.0), (4.0, 0.0), (4.0, 4.0)], &[Color::RED, Color::BLUE]),
        Err(CanvasError::OutOfRange { index: 2, len: 3 })
    ));
    assert!(matches!(
        canvas.draw_polygon(&[(0.0, 0.0), (1.0, 1.0)], Color::RED, true),
        Err(CanvasError::InvalidGeometry(_))
    ));
    canvas.stop().unwrap();
}

#[test]
fn pausing_drawing_holds_back_frames() {
    let (canvas, capture) = headless(16, 16);
    canvas.start().unwrap();
    assert!(capture.wait_for_frames(1, TIMEOUT));
    {
        let _pause = canvas.pause_drawing();
        thread::sleep(Duration::from_millis(30));
        let before = capture.presented();
        thread::sleep(Duration::from_millis(60));
        assert_eq!(capture.presented(), before);
    }
    let resumed = capture.presented() + 1;
    assert!(capture.wait_for_frames(resumed, TIMEOUT));
    canvas.stop().unwrap();
}

#[test]
fn screenshot_is_written_as_png() {
    let dir = std::env::temp_dir().join(format!("tsgl-shot-{}", std::process::id()));
    std::fs::create_dir_all(&dir).unwrap();
    let mut settings = CanvasSettings::new(24, 24).with_fps(200);
    settings.screenshot_dir = dir.clone();
    let (canvas, capture) = Canvas::headless(settings).unwrap();
    let fill = Shape::square(0.0, 0.0, 24.0, Color::BLUE);
    canvas.add(&fill).unwrap();
    canvas.start().unwrap();
    settle(&capture);

    canvas.take_screenshot();
    settle(&capture);
    canvas.stop().unwrap();

    let shots: Vec<_> = std::fs::read_dir(&dir)
        .unwrap()
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| p.extension().is_some_and(|ext| ext == "png"))
        .collect();
    assert_eq!(shots.len(), 1);
    let image = tsgl::asset::decode_image(&shots[0]).unwrap();
    assert_eq!((image.width(), image.height()), (24, 24));
    assert_eq!(image.pixel(12, 12), Some(Color::BLUE.to_rgba8()));
    std::fs::remove_dir_all(&dir).unwrap();
}

#[test]
fn workers_stop_with_the_canvas() {
    let (canvas, _capture) = headless(16, 16);
    canvas.start().unwrap();
    let worker = tsgl::Worker::spawn(
        0,
        "painter",
        canvas.token(),
        tsgl::PauseControl::new(),
        |ctx| {
            ctx.sleep(Duration::from_millis(5));
            tsgl::Step::Continue
        },
    )
    .unwrap();
    thread::sleep(Duration::from_millis(30));
    canvas.stop().unwrap();
    assert!(worker.join().unwrap() > 0);
}

/// Backend that records the colour of every primitive it is asked to draw.
struct Recorder {
    vertices: Vec<Vertex>,
    drawn: Arc<Mutex<Vec<Color>>>,
    frames: Arc<AtomicUsize>,
}

impl Backend for Recorder {
    fn size(&self) -> (u32, u32) {
        (16, 16)
    }

    fn clear(&mut self, _color: Color) {
        self.drawn.lock().unwrap().clear();
    }

    fn upload_vertices(&mut self, vertices: &[Vertex]) {
        self.vertices = vertices.to_vec();
    }

    fn draw_primitive(&mut self, _mode: Primitive, range: Range<usize>) -> tsgl::Result<()> {
        if let Some(v) = self.vertices.get(range.start) {
            self.drawn.lock().unwrap().push(v.color);
        }
        Ok(())
    }

    fn draw_image(&mut self, _dest: RectF, _image: &Pixmap, _alpha: f32) {}

    fn present(&mut self) -> tsgl::Result<()> {
        self.frames.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn poll_events(&mut self, _events: &mut Vec<InputEvent>) -> tsgl::Result<()> {
        Ok(())
    }

    fn read_pixels(&self) -> Pixmap {
        Pixmap::new(16, 16)
    }
}

#[test]
fn shapes_are_submitted_in_insertion_order() {
    let drawn = Arc::new(Mutex::new(Vec::new()));
    let frames = Arc::new(AtomicUsize::new(0));
    let (d, f) = (Arc::clone(&drawn), Arc::clone(&frames));
    let canvas = Canvas::new(CanvasSettings::new(16, 16).with_fps(200), move |_| {
        Ok(Box::new(Recorder {
            vertices: Vec::new(),
            drawn: d,
            frames: f,
        }) as Box<dyn Backend>)
    })
    .unwrap();

    let first = Shape::square(0.0, 0.0, 4.0, Color::RED);
    let second = Shape::square(2.0, 2.0, 4.0, Color::BLUE);
    let third = Shape::triangle((0.0, 0.0), (8.0, 0.0), (0.0, 8.0), Color::GREEN);
    canvas.add(&first).unwrap();
    canvas.add(&second).unwrap();
    canvas.add(&third).unwrap();
    canvas.start().unwrap();

    let deadline = Instant::now() + TIMEOUT;
    while frames.load(Ordering::SeqCst) < 3 && Instant::now() < deadline {
        thread::sleep(Duration::from_millis(5));
    }
    let _pause = canvas.pause_drawing();
    assert_eq!(
        *drawn.lock().unwrap(),
        vec![Color::RED, Color::BLUE, Color::GREEN]
    );
    drop(_pause);
    canvas.stop().unwrap();
}

#[test]
fn failing_backend_setup_reports_the_error() {
    let canvas = Canvas::new(CanvasSettings::new(16, 16), |_| {
        Err(CanvasError::Setup("no display".into()))
    })
    .unwrap();
    assert!(matches!(canvas.start(), Err(CanvasError::Setup(_))));
    assert_eq!(canvas.state(), CanvasState::Closed);
}

#[test]
fn far_off_lines_do_not_stall_rendering() {
    let (canvas, capture) = headless(16, 16);
    canvas.start().unwrap();
    assert!(matches!(
        canvas.draw_line(0.0, 0.0, f32::INFINITY, 0.0, Color::RED),
        Err(CanvasError::InvalidGeometry(_))
    ));
    canvas.draw_line(0.0, 8.0, 2e8, 8.0, Color::RED).unwrap();
    let started = Instant::now();
    settle(&capture);
    assert!(started.elapsed() < Duration::from_secs(1));
    assert_eq!(capture.pixel(12, 8), Some(Color::RED));
    canvas.stop().unwrap();
}
