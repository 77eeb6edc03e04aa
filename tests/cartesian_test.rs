use std::time::Duration;

use tsgl::{Canvas, CanvasSettings, CartesianBounds, CartesianCanvas, Color, FrameCapture};

const TIMEOUT: Duration = Duration::from_secs(5);

fn plane(min: f64, max: f64) -> (CartesianCanvas, FrameCapture) {
    let (canvas, capture) = Canvas::headless(CanvasSettings::new(100, 100).with_fps(200)).unwrap();
    let bounds = CartesianBounds::new(min, min, max, max).unwrap();
    (CartesianCanvas::new(canvas, bounds), capture)
}

/// Whether `color` appears within one pixel of `(x, y)`.
fn near(capture: &FrameCapture, (x, y): (f32, f32), color: Color) -> bool {
    let frame = capture.latest_frame().unwrap();
    let (x, y) = (x.round() as i64, y.round() as i64);
    (-1..=1).any(|dy| {
        (-1..=1).any(|dx| {
            let (px, py) = (x + dx, y + dy);
            px >= 0
                && py >= 0
                && frame.pixel(px as u32, py as u32) == Some(color.to_rgba8())
        })
    })
}

fn settle(capture: &FrameCapture) {
    let target = capture.presented() + 2;
    assert!(capture.wait_for_frames(target, TIMEOUT));
}

#[test]
fn axes_cross_at_the_origin() {
    let (plane, capture) = plane(-10.0, 10.0);
    plane.canvas().start().unwrap();
    plane.draw_axes(0.0, 0.0, 2.0, 2.0, Color::BLACK).unwrap();
    settle(&capture);

    assert_eq!(capture.pixel(50, 50), Some(Color::BLACK));
    assert_eq!(capture.pixel(5, 50), Some(Color::BLACK));
    assert_eq!(capture.pixel(50, 95), Some(Color::BLACK));
    // A tick at x = 2 sits 10 pixels right of the y axis.
    assert_eq!(capture.pixel(60, 46), Some(Color::BLACK));
    assert_eq!(capture.pixel(55, 46), Some(Color::WHITE));
    plane.canvas().stop().unwrap();
}

#[test]
fn functions_are_plotted_in_plane_units() {
    let (plane, capture) = plane(-1.0, 1.0);
    plane.canvas().start().unwrap();
    plane.draw_function(|x| x, Color::BLUE).unwrap();
    plane.draw_function(|x| 1.0 / x, Color::RED).unwrap();
    settle(&capture);

    assert!(near(&capture, plane.to_screen(0.5, 0.5), Color::BLUE));
    assert!(near(&capture, plane.to_screen(-0.5, -0.5), Color::BLUE));
    assert!(near(&capture, plane.to_screen(0.8, 1.25), Color::RED));
    assert!(!near(&capture, plane.to_screen(-0.5, 0.5), Color::BLUE));
    assert!(!near(&capture, plane.to_screen(-0.5, 0.5), Color::RED));
    plane.canvas().stop().unwrap();
}

#[test]
fn zooming_changes_where_shapes_land() {
    let (plane, capture) = plane(-10.0, 10.0);
    plane.canvas().start().unwrap();
    plane.zoom(5.0, 5.0, 0.5).unwrap();
    plane
        .draw_rectangle(4.0, 4.0, 6.0, 6.0, Color::GREEN, true)
        .unwrap();
    settle(&capture);

    assert_eq!(plane.to_screen(5.0, 5.0), (50.0, 50.0));
    assert_eq!(capture.pixel(50, 50), Some(Color::GREEN));
    assert_eq!(capture.pixel(30, 50), Some(Color::WHITE));
    let (x, y) = plane.to_cartesian(50.0, 50.0);
    assert!((x - 5.0).abs() < 1e-9 && (y - 5.0).abs() < 1e-9);
    plane.canvas().stop().unwrap();
}
