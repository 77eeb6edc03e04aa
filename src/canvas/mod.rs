//! The canvas engine
//!
//! A [`Canvas`] owns a render thread that drives the backend and, optionally,
//! a draw thread running application code. Drawing calls from any thread
//! either mutate registered [`Shape`]s or queue immediate [`Command`]s that
//! the render thread drains once per frame.

mod cartesian;
mod clock;
mod gate;
mod lifecycle;
mod render;
mod shared;

use std::path::Path;
use std::sync::atomic::Ordering;
use std::sync::mpsc::{self, Sender};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use log::{error, info, warn};

pub use cartesian::{CartesianBounds, CartesianCanvas};
pub use gate::RenderPause;
pub use lifecycle::CanvasState;

use crate::asset::{FontFace, ImageCache};
use crate::backend::{Backend, BackendFactory, FrameCapture, SoftwareBackend};
use crate::color::Color;
use crate::command::{Command, CommandBuffer, CommandKind};
use crate::config::CanvasSettings;
use crate::error::{CanvasError, Result};
use crate::input::{Action, Bindings, Button};
use crate::lock;
use crate::raster::{Pixmap, RectF};
use crate::shape::{Shape, ShapeRegistry};
use crate::timer::Timer;
use crate::worker::CancellationToken;

use self::clock::FrameClock;
use self::gate::FrameGate;
use self::lifecycle::Lifecycle;
use self::shared::{CaptureRequest, Shared};

#[derive(Default)]
struct Threads {
    factory: Option<BackendFactory>,
    render: Option<JoinHandle<()>>,
    draw: Option<JoinHandle<()>>,
    release: Option<Sender<()>>,
}

impl Threads {
    /// Join the draw thread, let the render thread release its context, then
    /// join it. Handles belonging to the calling thread are left alone.
    fn join_all(&mut self, shared: &Shared) {
        let current = thread::current().id();
        if let Some(draw) = self.draw.take() {
            if draw.thread().id() == current {
                self.draw = Some(draw);
            } else if draw.join().is_err() {
                error!("draw thread panicked");
                shared.close();
            }
        }
        self.release.take();
        if let Some(render) = self.render.take() {
            if render.thread().id() == current {
                self.render = Some(render);
            } else if render.join().is_err() {
                error!("render thread panicked");
            }
        }
    }
}

struct CanvasInner {
    shared: Arc<Shared>,
    threads: Mutex<Threads>,
}

impl Drop for CanvasInner {
    fn drop(&mut self) {
        self.shared.close();
        let threads = match self.threads.get_mut() {
            Ok(t) => t,
            Err(poisoned) => poisoned.into_inner(),
        };
        threads.join_all(&self.shared);
        self.shared.lifecycle.set_closed();
    }
}

/// Handle to a canvas. Clones refer to the same canvas.
#[derive(Clone)]
pub struct Canvas {
    inner: Arc<CanvasInner>,
}

impl Canvas {
    /// Create a canvas whose backend will be built by `factory` on the render
    /// thread when the canvas starts.
    pub fn new<F>(settings: CanvasSettings, factory: F) -> Result<Self>
    where
        F: FnOnce(&CanvasSettings) -> Result<Box<dyn Backend>> + Send + 'static,
    {
        settings.validate()?;
        let timer = Timer::from_fps(settings.fps)?;
        let commands = CommandBuffer::new(settings.command_capacity)?;
        let font = settings.font_path.as_deref().and_then(|path| {
            FontFace::from_file(path)
                .map_err(|e| warn!("font not loaded: {e}"))
                .ok()
        });

        let shared = Shared {
            lifecycle: Lifecycle::new(),
            token: CancellationToken::new(),
            registry: ShapeRegistry::new(),
            commands,
            clock: FrameClock::new(timer),
            gate: FrameGate::default(),
            bindings: Mutex::new(Bindings::default()),
            cursor: Mutex::new((0.0, 0.0)),
            background: Mutex::new(settings.background_color),
            font: Mutex::new(font),
            images: Mutex::new(ImageCache::new()),
            capture: Mutex::new(CaptureRequest::default()),
            show_fps: settings.show_fps.into(),
            measured_fps: Mutex::new(0.0),
            own_threads: Mutex::new(Vec::new()),
            settings,
        };
        let threads = Threads {
            factory: Some(Box::new(factory)),
            ..Threads::default()
        };
        Ok(Self {
            inner: Arc::new(CanvasInner {
                shared: Arc::new(shared),
                threads: Mutex::new(threads),
            }),
        })
    }

    /// Canvas rendered in memory. The returned capture exposes presented
    /// frames and accepts injected input.
    pub fn headless(settings: CanvasSettings) -> Result<(Self, FrameCapture)> {
        let capture = FrameCapture::new();
        let presenter = capture.clone();
        let canvas = Self::new(settings, move |s: &CanvasSettings| {
            Ok(Box::new(SoftwareBackend::new(s.width, s.height, presenter)) as Box<dyn Backend>)
        })?;
        Ok((canvas, capture))
    }

    /// Canvas shown on a Wayland layer surface.
    #[cfg(feature = "wayland")]
    pub fn wayland(settings: CanvasSettings) -> Result<Self> {
        use crate::backend::WaylandPresenter;

        Self::new(settings, |s: &CanvasSettings| {
            let presenter = WaylandPresenter::connect(s)?;
            Ok(Box::new(SoftwareBackend::new(s.width, s.height, presenter)) as Box<dyn Backend>)
        })
    }

    fn shared(&self) -> &Shared {
        &self.inner.shared
    }

    fn ensure_open(&self) -> Result<()> {
        if self.shared().is_open() {
            Ok(())
        } else {
            Err(CanvasError::Closed)
        }
    }

    /// Start rendering without a draw thread.
    pub fn start(&self) -> Result<()> {
        self.launch(None)
    }

    /// Start rendering and run `draw` on its own thread.
    pub fn start_with<F>(&self, draw: F) -> Result<()>
    where
        F: FnOnce(&Canvas) + Send + 'static,
    {
        self.launch(Some(Box::new(draw)))
    }

    #[allow(clippy::type_complexity)]
    fn launch(&self, draw: Option<Box<dyn FnOnce(&Canvas) + Send>>) -> Result<()> {
        let shared = self.shared();
        if !shared
            .lifecycle
            .transition(CanvasState::Created, CanvasState::Started)
        {
            return Err(match shared.state() {
                CanvasState::Closing | CanvasState::Closed => CanvasError::Closed,
                _ => CanvasError::AlreadyStarted,
            });
        }

        let mut threads = lock(&self.inner.threads);
        let factory = threads
            .factory
            .take()
            .ok_or_else(|| CanvasError::Setup("backend factory already used".into()))?;

        let (ready_tx, ready_rx) = mpsc::sync_channel::<Result<()>>(1);
        let (release_tx, release_rx) = mpsc::channel::<()>();
        let render_shared = Arc::clone(&self.inner.shared);
        let render = thread::Builder::new()
            .name("tsgl-render".into())
            .spawn(move || {
                render_shared.register_current_thread();
                let backend = match factory(&render_shared.settings) {
                    Ok(backend) => backend,
                    Err(e) => {
                        let _ = ready_tx.send(Err(e));
                        return;
                    }
                };
                let _ = ready_tx.send(Ok(()));
                render::render_loop(render_shared, backend, release_rx);
            });
        let render = match render {
            Ok(handle) => handle,
            Err(e) => {
                shared.lifecycle.set_closed();
                return Err(e.into());
            }
        };

        let setup = ready_rx.recv().unwrap_or_else(|_| {
            Err(CanvasError::Setup(
                "render thread exited during setup".into(),
            ))
        });
        if let Err(e) = setup {
            error!("canvas setup failed: {e}");
            shared.lifecycle.set_closed();
            shared.token.cancel();
            if render.join().is_err() {
                error!("render thread panicked during setup");
            }
            return Err(e);
        }
        threads.render = Some(render);
        threads.release = Some(release_tx);

        if !shared
            .lifecycle
            .transition(CanvasState::Started, CanvasState::Running)
        {
            // Closed while starting up; wait() will clean up.
            return Ok(());
        }
        info!(
            "canvas running at {}x{}",
            shared.settings.width, shared.settings.height
        );

        if let Some(draw) = draw {
            let canvas = self.clone();
            let handle = thread::Builder::new()
                .name("tsgl-draw".into())
                .spawn(move || {
                    canvas.shared().register_current_thread();
                    draw(&canvas)
                });
            match handle {
                Ok(handle) => threads.draw = Some(handle),
                Err(e) => {
                    shared.close();
                    return Err(e.into());
                }
            }
        }
        Ok(())
    }

    /// `start_with` followed by `wait`.
    pub fn run<F>(&self, draw: F) -> Result<()>
    where
        F: FnOnce(&Canvas) + Send + 'static,
    {
        self.start_with(draw)?;
        self.wait()
    }

    /// Request shutdown. Idempotent and safe from any thread, including the
    /// draw thread and input callbacks.
    pub fn close(&self) {
        self.shared().close();
    }

    /// Block until the canvas is closed and both threads have finished,
    /// then release the rendering context. Called from the draw thread or an
    /// input callback it only waits for the close, so `stop()` is safe there.
    pub fn wait(&self) -> Result<()> {
        let shared = self.shared();
        if shared.state() == CanvasState::Created {
            return Err(CanvasError::NotStarted);
        }
        if shared.on_own_thread() {
            // The joining side is elsewhere; only wait for the close.
            shared.token.wait();
            return Ok(());
        }
        let mut threads = lock(&self.inner.threads);
        threads.join_all(shared);
        if threads.render.is_none() {
            shared.lifecycle.set_closed();
            info!("canvas closed");
        }
        Ok(())
    }

    /// `close` followed by `wait`.
    pub fn stop(&self) -> Result<()> {
        self.close();
        match self.wait() {
            Err(CanvasError::NotStarted) => Ok(()),
            other => other,
        }
    }

    pub fn state(&self) -> CanvasState {
        self.shared().state()
    }

    pub fn is_open(&self) -> bool {
        self.shared().is_open()
    }

    /// Cancelled when the canvas closes. Hand it to workers.
    pub fn token(&self) -> CancellationToken {
        self.shared().token.clone()
    }

    pub fn settings(&self) -> &CanvasSettings {
        &self.shared().settings
    }

    pub fn width(&self) -> u32 {
        self.shared().settings.width
    }

    pub fn height(&self) -> u32 {
        self.shared().settings.height
    }

    /// Wait for the next presented frame. Returns whether the canvas is
    /// still open.
    pub fn sleep(&self) -> bool {
        let shared = self.shared();
        shared.clock.wait_next(|| shared.is_open())
    }

    /// Sleep for `duration` or until the canvas closes. Returns whether the
    /// canvas is still open.
    pub fn sleep_for(&self, duration: Duration) -> bool {
        self.shared().token.sleep(duration)
    }

    /// Frames presented so far.
    pub fn frame_number(&self) -> u64 {
        self.shared().clock.frame_number()
    }

    /// Timer periods elapsed since the timer was last reset.
    pub fn reps(&self) -> u64 {
        self.shared().clock.with_timer(|t| t.reps())
    }

    pub fn time(&self) -> Duration {
        self.shared().clock.with_timer(|t| t.time())
    }

    pub fn time_between_sleeps(&self) -> Option<Duration> {
        self.shared().clock.with_timer(|t| t.time_between_sleeps())
    }

    pub fn reset_timer(&self) {
        self.shared().clock.with_timer(|t| t.reset(None));
    }

    /// Frame rate measured over the last second.
    pub fn fps(&self) -> f32 {
        *lock(&self.shared().measured_fps)
    }

    pub fn set_show_fps(&self, show: bool) {
        self.shared().show_fps.store(show, Ordering::Relaxed);
    }

    /// Stop rendering after the current frame until the guard is dropped.
    /// Do not call from input callbacks while holding the guard.
    pub fn pause_drawing(&self) -> RenderPause<'_> {
        RenderPause::new(&self.shared().gate)
    }

    /// Save the next presented frame.
    pub fn take_screenshot(&self) {
        lock(&self.shared().capture).screenshot = true;
    }

    /// Save each of the next `frames` frames.
    pub fn record_for_frames(&self, frames: u64) {
        lock(&self.shared().capture).record_frames = frames;
    }

    pub fn stop_recording(&self) {
        let mut capture = lock(&self.shared().capture);
        capture.record_frames = 0;
        capture.screenshot = false;
    }

    pub fn background_color(&self) -> Color {
        *lock(&self.shared().background)
    }

    pub fn set_background_color(&self, color: Color) {
        *lock(&self.shared().background) = color;
    }

    pub fn mouse_x(&self) -> f64 {
        lock(&self.shared().cursor).0
    }

    pub fn mouse_y(&self) -> f64 {
        lock(&self.shared().cursor).1
    }

    /// Run `callback` on the render thread whenever `button` sees `action`.
    /// The callback must not register further bindings.
    pub fn bind_to_button<F>(&self, button: impl Into<Button>, action: Action, callback: F)
    where
        F: FnMut() + Send + 'static,
    {
        lock(&self.shared().bindings).bind_button(button.into(), action, Box::new(callback));
    }

    pub fn bind_to_scroll<F>(&self, callback: F)
    where
        F: FnMut(f64, f64) + Send + 'static,
    {
        lock(&self.shared().bindings).bind_scroll(Box::new(callback));
    }

    /// Font used for text shapes and text commands.
    pub fn set_font(&self, path: impl AsRef<Path>) -> Result<()> {
        let font = FontFace::from_file(path.as_ref())?;
        *lock(&self.shared().font) = Some(font);
        Ok(())
    }

    /// Decode `path` once and reuse it on later calls.
    pub fn load_image(&self, path: impl AsRef<Path>) -> Result<Arc<Pixmap>> {
        lock(&self.shared().images).get_or_load(path.as_ref())
    }

    /// Register `shape` on top of everything added before it. The canvas
    /// only holds a weak reference: keep a `Shape` handle alive for as long
    /// as it should be drawn.
    pub fn add(&self, shape: &Shape) -> Result<()> {
        self.ensure_open()?;
        self.shared().registry.add(shape);
        Ok(())
    }

    pub fn remove(&self, shape: &Shape) -> Result<()> {
        self.ensure_open()?;
        self.shared().registry.remove(shape)
    }

    pub fn clear_shapes(&self) -> Result<()> {
        self.ensure_open()?;
        self.shared().registry.clear();
        Ok(())
    }

    pub fn shape_count(&self) -> usize {
        self.shared().registry.len()
    }

    /// Queue an immediate command for the next frame.
    pub fn push_command(&self, command: Command) -> Result<()> {
        self.ensure_open()?;
        command.validate()?;
        self.shared().commands.push(command);
        Ok(())
    }

    fn immediate(&self, kind: CommandKind, color: Color) -> Result<()> {
        self.push_command(Command::new(kind, color))
    }

    /// Commands dropped because the buffer was full.
    pub fn evicted_commands(&self) -> u64 {
        self.shared().commands.evicted()
    }

    pub fn draw_point(&self, x: f32, y: f32, color: Color) -> Result<()> {
        self.immediate(CommandKind::Point { x, y }, color)
    }

    pub fn draw_line(&self, x1: f32, y1: f32, x2: f32, y2: f32, color: Color) -> Result<()> {
        self.immediate(CommandKind::Line { x1, y1, x2, y2 }, color)
    }

    pub fn draw_triangle(
        &self,
        a: (f32, f32),
        b: (f32, f32),
        c: (f32, f32),
        color: Color,
        filled: bool,
    ) -> Result<()> {
        self.immediate(
            CommandKind::Triangle {
                points: [a, b, c],
                filled,
            },
            color,
        )
    }

    pub fn draw_rectangle(
        &self,
        x: f32,
        y: f32,
        width: f32,
        height: f32,
        color: Color,
        filled: bool,
    ) -> Result<()> {
        self.immediate(
            CommandKind::Rectangle {
                x,
                y,
                width,
                height,
                filled,
            },
            color,
        )
    }

    pub fn draw_circle(&self, x: f32, y: f32, radius: f32, color: Color, filled: bool) -> Result<()> {
        self.immediate(
            CommandKind::Circle {
                x,
                y,
                radius,
                filled,
            },
            color,
        )
    }

    pub fn draw_polygon(&self, points: &[(f32, f32)], color: Color, filled: bool) -> Result<()> {
        self.immediate(
            CommandKind::Polygon {
                points: points.to_vec(),
                filled,
            },
            color,
        )
    }

    pub fn draw_colored_polygon(&self, points: &[(f32, f32)], colors: &[Color]) -> Result<()> {
        self.immediate(
            CommandKind::ColoredPolygon {
                points: points.to_vec(),
                colors: colors.to_vec(),
            },
            Color::BLACK,
        )
    }

    pub fn draw_text(&self, text: impl Into<String>, x: f32, y: f32, size: f32, color: Color) -> Result<()> {
        self.immediate(
            CommandKind::Text {
                text: text.into(),
                x,
                y,
                size,
            },
            color,
        )
    }

    /// Draw an image file scaled into the given rectangle. A file that
    /// cannot be decoded is logged and skipped.
    pub fn draw_image(
        &self,
        path: impl AsRef<Path>,
        x: f32,
        y: f32,
        width: f32,
        height: f32,
        alpha: f32,
    ) -> Result<()> {
        self.ensure_open()?;
        match self.load_image(path) {
            Ok(image) => self.draw_pixmap(image, x, y, width, height, alpha),
            Err(e) => {
                warn!("{e}");
                Ok(())
            }
        }
    }

    pub fn draw_pixmap(
        &self,
        image: Arc<Pixmap>,
        x: f32,
        y: f32,
        width: f32,
        height: f32,
        alpha: f32,
    ) -> Result<()> {
        self.immediate(
            CommandKind::Image {
                image,
                dest: RectF::new(x, y, width, height),
                alpha: alpha.clamp(0.0, 1.0),
            },
            Color::WHITE,
        )
    }

    /// Erase everything drawn with immediate commands so far.
    pub fn clear(&self) -> Result<()> {
        self.immediate(CommandKind::Clear, Color::TRANSPARENT)
    }
}
