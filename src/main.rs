use std::any::Any;
use std::env;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Instant;

use anyhow::{anyhow, Context, Result};
use pollster::block_on;
use winit::dpi::LogicalSize;
use winit::event::{Event, WindowEvent};
use winit::event_loop::{ControlFlow, EventLoop};
use winit::window::WindowBuilder;

#[cfg(not(target_arch = "wasm32"))]
use drift_scene::text::spawn_text_load;
use drift_scene::{
    load_text, DemoApp, DemoConfig, FontSource, HeadlessRasterizer, PendingText, Rasterizer,
    Renderer, TextRequest, TickOutcome,
};

/// Simulated frame interval of headless runs.
const HEADLESS_FRAME_MS: f64 = 1000.0 / 60.0;
const DEFAULT_HEADLESS_FRAMES: u64 = 120;

#[cfg(not(target_arch = "wasm32"))]
fn main() {
    env_logger::init();
    if let Err(err) = run() {
        eprintln!("Error: {err:?}");
        std::process::exit(1);
    }
}

#[cfg(target_arch = "wasm32")]
fn main() {}

#[cfg(not(target_arch = "wasm32"))]
fn run() -> Result<()> {
    let options = CliOptions::parse(env::args().skip(1))?;
    let mut config = match &options.config {
        Some(path) => DemoConfig::load(path)?,
        None => DemoConfig::default(),
    };
    if let Some(font) = &options.font {
        config.text.font = font.clone();
    }

    if options.headless {
        return run_headless(config, &options);
    }
    match run_interactive(config.clone()) {
        Ok(()) => Ok(()),
        Err(err) => {
            if err.downcast_ref::<WindowInitError>().is_some() {
                eprintln!(
                    "{err}. Falling back to --headless mode (set DISPLAY or install X11 libs to enable rendering)."
                );
                run_headless(config, &options)
            } else {
                Err(err)
            }
        }
    }
}

fn text_request(config: &DemoConfig) -> TextRequest {
    TextRequest::new(
        FontSource::from_location(&config.text.font),
        config.text.content.clone(),
        config.text.params,
    )
}

fn run_headless(config: DemoConfig, options: &CliOptions) -> Result<()> {
    let (width, height) = (config.window.width, config.window.height);
    let request = text_request(&config);
    let mut app = DemoApp::new(config, HeadlessRasterizer::new(width, height), width, height)?;
    app.request_text(PendingText::resolved(load_text(&request)));
    if let Some((x, y)) = options.pointer {
        app.on_pointer_move(x, y);
    }

    app.start();
    let frames = options.frames.unwrap_or(DEFAULT_HEADLESS_FRAMES);
    for frame in 0..frames {
        let outcome = app
            .frame(frame as f64 * HEADLESS_FRAME_MS)
            .with_context(|| format!("frame {frame} failed"))?;
        if outcome == TickOutcome::Halted {
            break;
        }
    }
    app.stop();

    print_summary(&app);
    println!("{}", HeadlessRasterizer::describe(app.scene(), app.camera()).trim_end());
    Ok(())
}

#[cfg(not(target_arch = "wasm32"))]
fn run_interactive(config: DemoConfig) -> Result<()> {
    let default_hook = panic::take_hook();
    panic::set_hook(Box::new(|_| {}));
    let event_loop = panic::catch_unwind(AssertUnwindSafe(EventLoop::new));
    panic::set_hook(default_hook);
    let event_loop = event_loop
        .map_err(|panic| WindowInitError::from_panic("event loop", panic))?
        .map_err(|err| WindowInitError::from_error("event loop", err))?;
    let window = Arc::new(
        WindowBuilder::new()
            .with_title(config.window.title.as_str())
            .with_inner_size(LogicalSize::new(
                config.window.width as f64,
                config.window.height as f64,
            ))
            .build(&event_loop)
            .map_err(|err| WindowInitError::from_error("window", err))?,
    );

    let size = window.inner_size();
    let renderer = block_on(Renderer::new(
        Arc::clone(&window),
        size.width.max(1),
        size.height.max(1),
    ))?;
    let request = text_request(&config);
    let mut app = DemoApp::new(config, renderer, size.width, size.height)?;
    app.request_text(spawn_text_load(request));
    app.start();

    let started = Instant::now();
    let mut last_error = None;
    event_loop.run(|event, elwt| {
        elwt.set_control_flow(ControlFlow::Poll);
        match event {
            Event::WindowEvent { event, window_id } if window_id == window.id() => match event {
                WindowEvent::CloseRequested => {
                    app.stop();
                    elwt.exit();
                }
                WindowEvent::Resized(size) => {
                    app.on_resize(size.width, size.height);
                }
                WindowEvent::CursorMoved { position, .. } => {
                    app.on_pointer_move(position.x as f32, position.y as f32);
                }
                WindowEvent::RedrawRequested => {
                    let now_ms = started.elapsed().as_secs_f64() * 1000.0;
                    match app.frame(now_ms) {
                        Ok(TickOutcome::Halted) => elwt.exit(),
                        Ok(_) => {}
                        Err(err) => {
                            last_error = Some(anyhow!(err));
                            elwt.exit();
                        }
                    }
                }
                _ => {}
            },
            Event::AboutToWait => {
                if app.is_running() {
                    window.request_redraw();
                }
            }
            _ => {}
        }
    })?;

    print_summary(&app);
    if let Some(err) = last_error {
        return Err(err);
    }
    Ok(())
}

fn print_summary<R: Rasterizer>(app: &DemoApp<R>) {
    println!(
        "Rendered {} frame(s) ({} skipped)",
        app.render_loop().ticks() - app.render_loop().skipped(),
        app.render_loop().skipped()
    );
    if let Some(fps) = app.stats().fps() {
        println!("Last measured rate: {fps:.1} fps");
    }
    println!("{}", app.text_status().describe());
}

#[derive(Debug)]
struct WindowInitError {
    message: String,
}

impl WindowInitError {
    fn from_panic(stage: &str, panic: Box<dyn Any + Send>) -> Self {
        Self {
            message: format!("failed to initialize {stage}: {}", panic_message(panic)),
        }
    }

    fn from_error(stage: &str, err: impl fmt::Display) -> Self {
        Self {
            message: format!("failed to initialize {stage}: {err}"),
        }
    }
}

impl fmt::Display for WindowInitError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for WindowInitError {}

fn panic_message(panic: Box<dyn Any + Send>) -> String {
    match panic.downcast::<String>() {
        Ok(msg) => *msg,
        Err(panic) => match panic.downcast::<&'static str>() {
            Ok(msg) => (*msg).to_string(),
            Err(_) => "unknown panic".into(),
        },
    }
}

const USAGE: &str =
    "Usage: drift-scene [--config FILE] [--font FILE] [--headless] [--frames N] [--pointer X Y]";

#[derive(Debug, Default, PartialEq)]
struct CliOptions {
    config: Option<String>,
    font: Option<String>,
    headless: bool,
    frames: Option<u64>,
    pointer: Option<(f32, f32)>,
}

impl CliOptions {
    fn parse(args: impl IntoIterator<Item = String>) -> Result<Self> {
        let mut args = args.into_iter();
        let mut options = Self::default();
        while let Some(arg) = args.next() {
            let mut value = |flag: &str| {
                args.next()
                    .ok_or_else(|| anyhow!("{flag} expects a value. {USAGE}"))
            };
            match arg.as_str() {
                "--config" => options.config = Some(value("--config")?),
                "--font" => options.font = Some(value("--font")?),
                "--headless" => options.headless = true,
                "--frames" => {
                    let raw = value("--frames")?;
                    let frames = raw
                        .parse()
                        .with_context(|| format!("--frames expects a whole number, got {raw:?}"))?;
                    options.frames = Some(frames);
                }
                "--pointer" => {
                    let x = parse_coordinate(&value("--pointer")?)?;
                    let y = parse_coordinate(&value("--pointer")?)?;
                    options.pointer = Some((x, y));
                }
                "--help" | "-h" => return Err(anyhow!(USAGE)),
                other => return Err(anyhow!("Unknown argument: {other}. {USAGE}")),
            }
        }
        Ok(options)
    }
}

fn parse_coordinate(raw: &str) -> Result<f32> {
    raw.parse()
        .with_context(|| format!("--pointer expects two numbers, got {raw:?}"))
}
