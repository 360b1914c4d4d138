use std::env;
use std::error::Error;
use std::fs;
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use log::{info, warn};
use pixels::{Pixels, SurfaceTexture};
use rand::Rng;
use rusttype::Font;
use serde_json::{json, Value};
use winit::dpi::LogicalSize;
use winit::event::{ElementState, Event, MouseButton, WindowEvent};
use winit::event_loop::{ControlFlow, EventLoop};
use winit::window::WindowBuilder;

use stacked_dual_gauge::{
    DataSnapshot, RasterSurface, Segment, SourceState, StackedDualGauge,
    UpdateOutcome,
};

const WINDOW_WIDTH: f64 = 420.0;
const WINDOW_HEIGHT: f64 = 240.0;
const TARGET_FPS: f64 = 30.0;
const TICK: Duration = Duration::from_millis(1000);
/// Chance per tick that one source disappears from the snapshot.
const DROP_CHANCE: f64 = 0.08;

struct Args {
    config: Option<String>,
    font: Option<String>,
    title: String,
}

fn parse_args() -> Args {
    let mut parsed = Args {
        config: None,
        font: None,
        title: "Stacked Dual Gauge".to_string(),
    };
    let mut args = env::args().skip(1);
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--config" => parsed.config = args.next(),
            "--font" => parsed.font = args.next(),
            "--title" => {
                if let Some(title) = args.next() {
                    parsed.title = title;
                }
            }
            other => warn!("Ignoring unknown argument {other}"),
        }
    }
    parsed
}

fn demo_config() -> Value {
    json!({
        "title": "Power",
        "max": 100,
        "precision": 1,
        "outer": [
            { "entity": "sensor.solar", "label": "Solar" },
            { "entity": "sensor.grid_import", "label": "Grid" },
            { "entity": "sensor.battery", "attribute": "discharge", "label": "Battery" },
        ],
        "inner": [
            { "entity": "sensor.heat_pump", "label": "Heating" },
            { "entity": "sensor.appliances", "label": "Other" },
        ],
    })
}

fn load_config(path: Option<&str>) -> Result<Value, Box<dyn Error>> {
    match path {
        Some(path) => Ok(serde_json::from_str(&fs::read_to_string(path)?)?),
        None => Ok(demo_config()),
    }
}

fn load_font(path: &str) -> Result<Font<'static>, Box<dyn Error>> {
    let data = fs::read(path)?;
    Font::try_from_vec(data).ok_or_else(|| format!("{path} is not a usable font").into())
}

/// Random readings for every configured source, now and then leaving one out
/// or reporting it as unavailable.
fn produce_snapshots(segments: Vec<Segment>, max: f64, tx: Sender<DataSnapshot>) {
    let mut rng = rand::rng();
    let share = max / segments.len().max(1) as f64;
    loop {
        let dropped = (!segments.is_empty() && rng.random_bool(DROP_CHANCE))
            .then(|| rng.random_range(0..segments.len()));
        let mut snapshot = DataSnapshot::new();
        for (index, segment) in segments.iter().enumerate() {
            if Some(index) == dropped {
                continue;
            }
            let value = rng.random_range(0.0..share.max(f64::EPSILON));
            let state = match &segment.attribute {
                Some(attribute) => SourceState::new("on").with_attribute(attribute.as_str(), value),
                None if rng.random_bool(0.05) => SourceState::new("unavailable"),
                None => SourceState::new(value),
            };
            snapshot.insert(segment.entity.as_str(), state);
        }
        if tx.send(snapshot).is_err() {
            return;
        }
        thread::sleep(TICK);
    }
}

fn apply_pending(gauge: &mut StackedDualGauge<RasterSurface>, rx: &Receiver<DataSnapshot>) -> bool {
    let mut changed = false;
    while let Ok(snapshot) = rx.try_recv() {
        match gauge.update(&snapshot) {
            Ok(UpdateOutcome::Rendered { rebuilt: true }) => info!("Gauge rebuilt"),
            Ok(_) => {}
            Err(err) => warn!("Update failed: {err}"),
        }
        changed = true;
    }
    changed
}

fn main() -> Result<(), Box<dyn Error>> {
    env_logger::init();
    let args = parse_args();

    let raw = load_config(args.config.as_deref())?;

    let mut surface = RasterSurface::new();
    match args.font.as_deref().map(load_font) {
        Some(Ok(font)) => surface = surface.with_font(font),
        Some(Err(err)) => warn!("Drawing without text: {err}"),
        None => warn!("No --font given, drawing without text"),
    }

    let mut gauge = StackedDualGauge::new(surface);
    gauge.configure(&raw)?;
    let config = gauge.config().cloned().ok_or("gauge was not configured")?;
    gauge.on_show_details(|source| info!("Details requested for {source}"));
    gauge.mount();

    let (tx, rx) = mpsc::channel();
    let segments: Vec<Segment> = config.outer.iter().chain(&config.inner).cloned().collect();
    let max = config.max - config.min;
    thread::spawn(move || produce_snapshots(segments, max, tx));

    let event_loop = EventLoop::new()?;
    let window = WindowBuilder::new()
        .with_title(&args.title)
        .with_inner_size(LogicalSize::new(WINDOW_WIDTH, WINDOW_HEIGHT))
        .build(&event_loop)?;
    let window = Arc::new(window);
    let redraw_window = Arc::clone(&window);

    let size = window.inner_size();
    let (mut fb_width, mut fb_height) = (size.width as usize, size.height as usize);
    let mut pixels = {
        let surface_texture = SurfaceTexture::new(size.width, size.height, &window);
        Pixels::new(size.width, size.height, surface_texture)?
    };

    let frame_duration = Duration::from_secs_f64(1.0 / TARGET_FPS);
    let mut last_frame = Instant::now();
    let mut cursor = (0.0, 0.0);

    event_loop.run(move |event, window_target| {
        window_target.set_control_flow(ControlFlow::Poll);
        match event {
            Event::WindowEvent { event, .. } => match event {
                WindowEvent::CloseRequested => window_target.exit(),
                WindowEvent::Resized(new_size) => {
                    if new_size.width == 0 || new_size.height == 0 {
                        return;
                    }
                    fb_width = new_size.width as usize;
                    fb_height = new_size.height as usize;
                    let _ = pixels.resize_surface(new_size.width, new_size.height);
                    let _ = pixels.resize_buffer(new_size.width, new_size.height);
                    redraw_window.request_redraw();
                }
                WindowEvent::CursorMoved { position, .. } => {
                    cursor = (position.x, position.y);
                }
                WindowEvent::MouseInput {
                    state: ElementState::Pressed,
                    button: MouseButton::Left,
                    ..
                } => {
                    let hit = gauge
                        .surface()
                        .label_at(cursor.0, cursor.1, fb_width, fb_height);
                    if let Some(target) = hit {
                        gauge.activate(&target);
                    }
                }
                WindowEvent::RedrawRequested => {
                    gauge.surface().draw(pixels.frame_mut(), fb_width, fb_height);
                    if let Err(err) = pixels.render() {
                        warn!("Render failed: {err}");
                        window_target.exit();
                    }
                }
                _ => {}
            },
            Event::AboutToWait => {
                let elapsed = last_frame.elapsed();
                if elapsed < frame_duration {
                    thread::sleep(frame_duration - elapsed);
                }
                last_frame = Instant::now();
                if apply_pending(&mut gauge, &rx) {
                    redraw_window.request_redraw();
                }
            }
            _ => {}
        }
    })?;
    Ok(())
}
