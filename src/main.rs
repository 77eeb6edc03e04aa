use std::ops::Range;
use std::sync::Mutex;
use std::thread;

use clap::{App, Arg};
use log::{error, info, warn};
use tsgl::config::{DEFAULT_HEIGHT, DEFAULT_WIDTH, MAX_SIDE};
use tsgl::{
    fan_out, Action, Canvas, CanvasConfig, CanvasSettings, Color, Key, PauseControl,
    ProgressBar, Shape,
};

const MAX_THREADS: usize = 64;
const HEADLESS_FRAMES: u64 = 120;
const ROWS_PER_FRAME: usize = 4;
const MAX_ITERATIONS: u32 = 64;

#[derive(Debug)]
struct DemoOptions {
    width: u32,
    height: u32,
    threads: usize,
    headless: bool,
    frames: Option<u64>,
}

fn default_threads() -> usize {
    thread::available_parallelism().map_or(4, |n| n.get())
}

fn parse_options() -> DemoOptions {
    let matches = App::new("tsgl-demo")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Paints the Mandelbrot set with several threads")
        .arg(Arg::with_name("width").index(1).help("Canvas width in pixels"))
        .arg(Arg::with_name("height").index(2).help("Canvas height in pixels"))
        .arg(Arg::with_name("threads").index(3).help("Number of painting threads"))
        .arg(
            Arg::with_name("headless")
                .long("headless")
                .help("Render in memory without opening a window"),
        )
        .arg(
            Arg::with_name("frames")
                .long("frames")
                .takes_value(true)
                .help("Close after this many frames"),
        )
        .get_matches();

    let side = |name: &str, default: u32| {
        matches
            .value_of(name)
            .and_then(|v| v.parse::<u32>().ok())
            .filter(|v| (1..=MAX_SIDE).contains(v))
            .unwrap_or(default)
    };
    let threads = matches
        .value_of("threads")
        .and_then(|v| v.parse::<usize>().ok())
        .filter(|v| (1..=MAX_THREADS).contains(v))
        .unwrap_or_else(default_threads);

    DemoOptions {
        width: side("width", DEFAULT_WIDTH),
        height: side("height", DEFAULT_HEIGHT),
        threads,
        headless: matches.is_present("headless"),
        frames: matches.value_of("frames").and_then(|v| v.parse().ok()),
    }
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let options = parse_options();
    info!("starting tsgl-demo with {options:?}");

    if let Err(e) = run(options) {
        error!("{e}");
        std::process::exit(1);
    }
}

#[cfg(feature = "wayland")]
fn open_window(settings: CanvasSettings) -> tsgl::Result<Canvas> {
    Canvas::wayland(settings)
}

#[cfg(not(feature = "wayland"))]
fn open_window(_settings: CanvasSettings) -> tsgl::Result<Canvas> {
    Err(tsgl::CanvasError::Setup(
        "built without a window backend, run with --headless".into(),
    ))
}

fn run(options: DemoOptions) -> tsgl::Result<()> {
    let config = CanvasConfig::load_from_file().unwrap_or_else(|e| {
        warn!("using default configuration: {e}");
        CanvasConfig::default()
    });
    let mut settings = config.settings();
    settings.width = options.width;
    settings.height = options.height;

    let (canvas, frames) = if options.headless {
        let (canvas, _capture) = Canvas::headless(settings)?;
        (canvas, Some(options.frames.unwrap_or(HEADLESS_FRAMES)))
    } else {
        (open_window(settings)?, options.frames)
    };

    let pause = PauseControl::new();
    let toggle = pause.clone();
    canvas.bind_to_button(Key::Space, Action::Press, move || {
        let paused = toggle.toggle();
        info!("painting {}", if paused { "paused" } else { "resumed" });
    });

    let threads = options.threads;
    canvas.run(move |canvas| {
        if let Err(e) = paint(canvas, threads, &pause, frames) {
            error!("painting stopped: {e}");
            canvas.close();
        }
    })
}

fn mandelbrot(x: u32, y: u32, width: u32, height: u32) -> Color {
    let cx = x as f64 / width as f64 * 3.0 - 2.0;
    let cy = y as f64 / height as f64 * 2.4 - 1.2;
    let (mut zx, mut zy) = (0.0f64, 0.0f64);
    let mut i = 0;
    while i < MAX_ITERATIONS && zx * zx + zy * zy < 4.0 {
        let t = zx * zx - zy * zy + cx;
        zy = 2.0 * zx * zy + cy;
        zx = t;
        i += 1;
    }
    if i == MAX_ITERATIONS {
        Color::BLACK
    } else {
        Color::from_hsv(6.0 * i as f32 / MAX_ITERATIONS as f32, 1.0, 1.0, 1.0)
    }
}

/// Rows `[start, end)` of the image as RGBA bytes.
fn paint_rows(rows: Range<usize>, width: u32, height: u32) -> Vec<u8> {
    let mut out = Vec::with_capacity(rows.len() * width as usize * 4);
    for y in rows {
        for x in 0..width {
            out.extend_from_slice(&mandelbrot(x, y as u32, width, height).to_rgba8());
        }
    }
    out
}

fn paint(
    canvas: &Canvas,
    threads: usize,
    pause: &PauseControl,
    frames: Option<u64>,
) -> tsgl::Result<()> {
    let (width, height) = (canvas.width(), canvas.height());
    let background = Shape::background(width, height, Color::WHITE);
    let (w, h) = (width as f32, height as f32);
    let bar = ProgressBar::new(w * 0.1, h - 30.0, w * 0.8, 20.0, 0.0, h, threads)?;
    canvas.add(&background)?;
    bar.add_to(canvas)?;

    let band = (height as usize).div_ceil(threads);
    let mut painted = vec![0usize; threads];
    let token = canvas.token();
    let row_bytes = width as usize * 4;

    while canvas.is_open() {
        if !pause.wait_while_paused(&token) {
            break;
        }
        if let Some(limit) = frames {
            if canvas.frame_number() >= limit {
                canvas.close();
                break;
            }
        }

        let bands: Mutex<Vec<(usize, Vec<u8>)>> = Mutex::new(Vec::new());
        fan_out(threads, 0..threads, |_, workers| {
            for t in workers {
                let start = (t * band + painted[t]).min(height as usize);
                let end = ((t + 1) * band).min(height as usize).min(start + ROWS_PER_FRAME);
                if start < end {
                    let bytes = paint_rows(start..end, width, height);
                    if let Ok(mut bands) = bands.lock() {
                        bands.push((start, bytes));
                    }
                }
            }
        });
        let bands = bands.into_inner().unwrap_or_default();
        background.update_pixels(|pixels| {
            for (start, bytes) in &bands {
                let offset = start * row_bytes;
                pixels.data_mut()[offset..offset + bytes.len()].copy_from_slice(bytes);
            }
        })?;

        for (t, done) in painted.iter_mut().enumerate() {
            let limit = ((t + 1) * band).min(height as usize).saturating_sub(t * band);
            *done = (*done + ROWS_PER_FRAME).min(limit);
            bar.update((t * band + *done) as f32, t)?;
        }

        canvas.sleep();
    }
    Ok(())
}
