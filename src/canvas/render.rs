//! The render thread's frame loop

use std::sync::mpsc::Receiver;
use std::sync::Arc;
use std::time::{Duration, Instant};

use log::{debug, error, info, warn};

use crate::asset::{self, FontFace};
use crate::backend::{Backend, SoftwareBackend};
use crate::canvas::shared::Shared;
use crate::color::Color;
use crate::error::Result;
use crate::lock;
use crate::raster::RectF;
use crate::shape::DrawItem;

/// Sends one draw item to a backend. Failures only skip the item.
struct Painter<'a> {
    font: &'a mut Option<FontFace>,
    warned_no_font: &'a mut bool,
}

impl Painter<'_> {
    fn submit(&mut self, backend: &mut dyn Backend, item: &DrawItem) {
        match item {
            DrawItem::Mesh { mode, vertices } => {
                backend.upload_vertices(vertices);
                if let Err(e) = backend.draw_primitive(*mode, 0..vertices.len()) {
                    warn!("skipping {mode:?} primitive: {e}");
                }
            }
            DrawItem::Image { dest, image, alpha } => backend.draw_image(*dest, image, *alpha),
            DrawItem::Text {
                x,
                y,
                size,
                text,
                color,
            } => {
                let Some(font) = self.font.as_mut() else {
                    if !*self.warned_no_font {
                        warn!("no font set, text is not drawn");
                        *self.warned_no_font = true;
                    }
                    return;
                };
                let bitmap = font.text_bitmap(text, *size, *color);
                let dest = RectF::new(
                    *x,
                    *y - bitmap.ascent,
                    bitmap.pixels.width() as f32,
                    bitmap.pixels.height() as f32,
                );
                backend.draw_image(dest, &bitmap.pixels, 1.0);
            }
        }
    }
}

struct FpsCounter {
    window_start: Instant,
    frames: u32,
}

impl FpsCounter {
    const WINDOW: Duration = Duration::from_secs(1);

    fn new() -> Self {
        Self {
            window_start: Instant::now(),
            frames: 0,
        }
    }

    /// Count a frame; yields the rate once per window.
    fn tick(&mut self) -> Option<f32> {
        self.frames += 1;
        let elapsed = self.window_start.elapsed();
        if elapsed < Self::WINDOW {
            return None;
        }
        let fps = self.frames as f32 / elapsed.as_secs_f32();
        self.window_start = Instant::now();
        self.frames = 0;
        Some(fps)
    }
}

/// Draw one frame: immediate commands into the persistent layer, then
/// background color, layer and shapes in paint order.
fn render_frame(
    shared: &Shared,
    backend: &mut dyn Backend,
    layer: &mut SoftwareBackend<()>,
    warned_no_font: &mut bool,
) -> Result<()> {
    let mut font = lock(&shared.font);
    let mut painter = Painter {
        font: &mut font,
        warned_no_font,
    };

    shared.commands.drain_into(|command| {
        if command.is_clear() {
            layer.clear(Color::TRANSPARENT);
        } else if let Some(item) = command.to_item() {
            painter.submit(layer, &item);
        }
    });

    let background = *lock(&shared.background);
    backend.clear(background);
    let (w, h) = layer.size();
    backend.draw_image(RectF::new(0.0, 0.0, w as f32, h as f32), layer.frame(), 1.0);

    shared.registry.for_each_in_order(|shape| {
        for item in shape.draw_items() {
            painter.submit(backend, &item);
        }
    });
    if let Some(font) = font.as_mut() {
        font.end_frame();
    }
    drop(font);

    if lock(&shared.capture).take() {
        let path = shared
            .settings
            .screenshot_dir
            .join(format!("Image{:06}.png", shared.clock.frame_number()));
        match asset::save_png(&path, &backend.read_pixels()) {
            Ok(()) => debug!("saved {}", path.display()),
            Err(e) => warn!("screenshot failed: {e}"),
        }
    }

    backend.present()
}

pub(crate) fn render_loop(shared: Arc<Shared>, mut backend: Box<dyn Backend>, release: Receiver<()>) {
    let (width, height) = backend.size();
    let mut layer = SoftwareBackend::new(width, height, ());
    let mut events = Vec::new();
    let mut fps = FpsCounter::new();
    let mut warned_no_font = false;
    info!("render loop started at {width}x{height}, {:?} per frame", shared.clock.period());

    while shared.is_open() {
        events.clear();
        if let Err(e) = backend.poll_events(&mut events) {
            error!("event polling failed: {e}");
            shared.close();
            break;
        }
        shared.dispatch_events(&events);

        if !shared.gate.enter_frame(|| shared.is_open()) {
            break;
        }
        let result = render_frame(&shared, backend.as_mut(), &mut layer, &mut warned_no_font);
        shared.gate.exit_frame();
        if let Err(e) = result {
            error!("presenting frame failed: {e}");
            shared.close();
            break;
        }

        let frame = shared.clock.advance();
        if let Some(rate) = fps.tick() {
            *lock(&shared.measured_fps) = rate;
            if shared.show_fps() {
                info!("frame {frame}: {rate:.1} fps");
            }
        }
        shared.clock.sleep_until_next();
    }

    shared.clock.wake_all();
    debug!("render loop stopped, waiting for drawing threads");
    // Either an explicit release or the sender being dropped.
    let _ = release.recv();
    drop(backend);
    info!("rendering context released");
}
