use std::any::Any;
use std::env;
use std::fmt;
use std::fs;
use std::panic::{self, AssertUnwindSafe};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use anyhow::{anyhow, Context, Result};
use glam::DVec2;
use log::info;
use pollster::block_on;
use winit::dpi::{LogicalSize, PhysicalSize};
use winit::event::{
    ElementState, Event, KeyboardInput, MouseButton, MouseScrollDelta, TouchPhase,
    VirtualKeyCode, WindowEvent,
};
use winit::event_loop::{ControlFlow, EventLoop};
use winit::platform::run_return::EventLoopExtRunReturn;
use winit::window::{Window, WindowBuilder};

use monocromatica::app::{color_summary, final_state, scene_summary};
use monocromatica::scene::DEFAULT_SCENE_XML;
use monocromatica::{
    HueDial, Hsla, PointerEvent, PointerTarget, RawPointer, Renderer, Scene, Viewer,
};

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

fn run() -> Result<()> {
    let options = CliOptions::parse(env::args().skip(1))?;
    let (scene, asset_dir) = match &options.scene {
        Some(path) => {
            let xml = fs::read_to_string(path)
                .with_context(|| format!("failed to read scene {}", path.display()))?;
            let scene = Scene::from_xml(&xml).context("failed to parse scene XML")?;
            (scene, path.parent().map(PathBuf::from))
        }
        None => (
            Scene::from_xml(DEFAULT_SCENE_XML).context("failed to parse bundled scene")?,
            None,
        ),
    };

    for line in scene_summary(&scene) {
        println!("{line}");
    }

    let viewer = Viewer::new(&scene, options.initial_color())
        .context("scene has nothing to recolor")?;

    if options.summary_only {
        print_summary(&viewer);
        return Ok(());
    }

    match run_interactive(viewer, asset_dir) {
        Ok(()) => Ok(()),
        Err(failure) => match failure.viewer {
            Some(viewer) => {
                eprintln!(
                    "{}. Falling back to --summary-only mode (set DISPLAY or install X11 libs to enable rendering).",
                    failure.error
                );
                print_summary(&viewer);
                Ok(())
            }
            None => Err(failure.error),
        },
    }
}

fn print_summary(viewer: &Viewer) {
    for line in color_summary(viewer.controller()) {
        println!("{line}");
    }
    for line in final_state(viewer.model()) {
        println!("{line}");
    }
}

/// Interactive failure. `viewer` is handed back when the window could not be
/// created so the caller can still report the color state.
struct InteractiveFailure {
    error: anyhow::Error,
    viewer: Option<Viewer>,
}

impl From<anyhow::Error> for InteractiveFailure {
    fn from(error: anyhow::Error) -> Self {
        Self {
            error,
            viewer: None,
        }
    }
}

fn run_interactive(
    viewer: Viewer,
    asset_dir: Option<PathBuf>,
) -> std::result::Result<(), InteractiveFailure> {
    let (mut event_loop, window) = match create_window() {
        Ok(created) => created,
        Err(err) => {
            return Err(InteractiveFailure {
                error: err.into(),
                viewer: Some(viewer),
            })
        }
    };

    let renderer = block_on(Renderer::new(Arc::clone(&window), asset_dir))?;
    let size = window.inner_size();
    let mut app = AppState {
        renderer,
        viewer,
        dial: HueDial::new(window_center(size)),
        orbiting: false,
        last_cursor: None,
        last_frame: Instant::now(),
        last_error: None,
    };
    app.viewer.resize(size.width, size.height);
    info!("Left-drag picks a hue, arrow keys nudge it, right-drag orbits, D toggles the debug panel");

    event_loop.run_return(|event, _, control_flow| {
        *control_flow = ControlFlow::Poll;
        if let Err(err) = app.process_event(&event, control_flow) {
            app.last_error = Some(err);
            control_flow.set_exit();
        }
    });

    print_summary(&app.viewer);

    match app.last_error {
        Some(err) => Err(err.into()),
        None => Ok(()),
    }
}

fn create_window() -> std::result::Result<(EventLoop<()>, Arc<Window>), WindowInitError> {
    let default_hook = panic::take_hook();
    panic::set_hook(Box::new(|_| {}));
    let event_loop = panic::catch_unwind(AssertUnwindSafe(EventLoop::new));
    panic::set_hook(default_hook);
    let event_loop =
        event_loop.map_err(|panic| WindowInitError::from_panic("event loop", panic))?;
    let window = WindowBuilder::new()
        .with_title("Monocromatica")
        .with_inner_size(LogicalSize::new(1280.0, 720.0))
        .build(&event_loop)
        .map_err(|err| WindowInitError::from_error("window", err))?;
    Ok((event_loop, Arc::new(window)))
}

fn window_center(size: PhysicalSize<u32>) -> DVec2 {
    DVec2::new(f64::from(size.width) / 2.0, f64::from(size.height) / 2.0)
}

struct AppState {
    renderer: Renderer,
    viewer: Viewer,
    dial: HueDial,
    orbiting: bool,
    last_cursor: Option<DVec2>,
    last_frame: Instant,
    last_error: Option<anyhow::Error>,
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

impl AppState {
    fn process_event(&mut self, event: &Event<()>, control_flow: &mut ControlFlow) -> Result<()> {
        match event {
            Event::WindowEvent { event, window_id } if *window_id == self.renderer.window_id() => {
                match event {
                    WindowEvent::CloseRequested => {
                        control_flow.set_exit();
                    }
                    WindowEvent::Resized(size) => self.resize(*size),
                    WindowEvent::ScaleFactorChanged { new_inner_size, .. } => {
                        self.resize(**new_inner_size)
                    }
                    WindowEvent::KeyboardInput { input, .. } => self.handle_keyboard(input),
                    WindowEvent::MouseInput {
                        state,
                        button: MouseButton::Left,
                        ..
                    } => {
                        let event = match state {
                            ElementState::Pressed => PointerEvent::Down,
                            ElementState::Released => PointerEvent::Up,
                        };
                        self.dial.drive(&event, self.viewer.controller_mut());
                    }
                    WindowEvent::MouseInput {
                        state,
                        button: MouseButton::Right,
                        ..
                    } => {
                        self.orbiting = *state == ElementState::Pressed;
                    }
                    WindowEvent::CursorMoved { position, .. } => {
                        let cursor = DVec2::new(position.x, position.y);
                        if let (true, Some(last)) = (self.orbiting, self.last_cursor) {
                            let delta = (cursor - last) * 0.005;
                            self.viewer
                                .camera_mut()
                                .rotate(-delta.x as f32, delta.y as f32);
                        }
                        self.last_cursor = Some(cursor);
                        self.pointer_moved(RawPointer::Mouse {
                            x: position.x,
                            y: position.y,
                        });
                    }
                    WindowEvent::Touch(touch) => {
                        let point = DVec2::new(touch.location.x, touch.location.y);
                        let event = match touch.phase {
                            TouchPhase::Started => PointerEvent::Down,
                            TouchPhase::Moved => {
                                self.pointer_moved(RawPointer::Touch(vec![point]));
                                return Ok(());
                            }
                            _ => PointerEvent::Up,
                        };
                        self.dial.drive(&event, self.viewer.controller_mut());
                    }
                    WindowEvent::MouseWheel { delta, .. } => {
                        let lines = match delta {
                            MouseScrollDelta::LineDelta(_, y) => *y,
                            MouseScrollDelta::PixelDelta(pos) => pos.y as f32 / 40.0,
                        };
                        self.viewer.camera_mut().zoom(0.95_f32.powf(lines));
                    }
                    _ => {}
                }
            }
            Event::RedrawRequested(window_id) if *window_id == self.renderer.window_id() => {
                let now = Instant::now();
                let dt = now.duration_since(self.last_frame).as_secs_f32().min(0.1);
                self.last_frame = now;
                let frame = self.viewer.frame(dt);
                if let Err(err) = self.renderer.render(&frame) {
                    match err {
                        wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated => {
                            let size = self.renderer.size();
                            self.renderer.resize(size);
                        }
                        wgpu::SurfaceError::OutOfMemory => {
                            return Err(anyhow!("GPU is out of memory"));
                        }
                        wgpu::SurfaceError::Timeout => {
                            info!("Surface timeout; retrying next frame");
                        }
                    }
                }
            }
            Event::MainEventsCleared => {
                self.renderer.window().request_redraw();
            }
            _ => {}
        }
        Ok(())
    }

    fn resize(&mut self, size: PhysicalSize<u32>) {
        self.renderer.resize(size);
        self.viewer.resize(size.width, size.height);
        self.dial.set_pivot(window_center(size));
    }

    // The whole window acts as the dial handle.
    fn pointer_moved(&mut self, pointer: RawPointer) {
        let event = PointerEvent::Move {
            target: PointerTarget::Handle,
            pointer,
        };
        if self.dial.drive(&event, self.viewer.controller_mut()) {
            self.announce_hue();
        }
    }

    fn handle_keyboard(&mut self, input: &KeyboardInput) {
        if input.state != ElementState::Pressed {
            return;
        }
        let step = match input.virtual_keycode {
            Some(VirtualKeyCode::Left) => -1.0,
            Some(VirtualKeyCode::Right) => 1.0,
            Some(VirtualKeyCode::D) => {
                let panel = self.viewer.panel_mut();
                if panel.toggle() {
                    info!("Debug panel shown");
                    for line in panel.describe() {
                        info!("  {line}");
                    }
                } else {
                    info!("Debug panel hidden");
                }
                return;
            }
            _ => return,
        };
        let hue = self.viewer.controller().hue() + step;
        self.viewer.controller_mut().set_hue(hue);
        self.announce_hue();
    }

    fn announce_hue(&self) {
        let controller = self.viewer.controller();
        self.renderer
            .window()
            .set_title(&format!("Monocromatica #{}", controller.hue()));
        info!("{}", controller.hsl_string());
    }
}

#[derive(Debug, Default)]
struct CliOptions {
    scene: Option<PathBuf>,
    hue: Option<f64>,
    saturation: Option<f64>,
    lightness: Option<f64>,
    summary_only: bool,
}

const USAGE: &str = "Usage: monocromatica [scene.xml] [--hue <deg>] [--saturation <pct>] [--lightness <pct>] [--summary-only]";

impl CliOptions {
    fn parse(mut args: impl Iterator<Item = String>) -> Result<Self> {
        let mut options = Self::default();
        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--summary-only" => options.summary_only = true,
                "--hue" => options.hue = Some(number_arg(&arg, args.next())?),
                "--saturation" => options.saturation = Some(number_arg(&arg, args.next())?),
                "--lightness" => options.lightness = Some(number_arg(&arg, args.next())?),
                "-h" | "--help" => return Err(anyhow!(USAGE)),
                other if other.starts_with("--") => {
                    return Err(anyhow!("Unknown argument: {other}. {USAGE}"));
                }
                path => {
                    if options.scene.is_some() {
                        return Err(anyhow!("Only one scene may be given. {USAGE}"));
                    }
                    options.scene = Some(PathBuf::from(path));
                }
            }
        }
        Ok(options)
    }

    /// A random hue unless one was given on the command line.
    fn initial_color(&self) -> Hsla {
        let defaults = Hsla::default();
        let hue = self.hue.unwrap_or_else(|| Hsla::random_hue().hue);
        if self.hue.is_none() {
            info!("No --hue given; starting from random hue {hue}");
        }
        Hsla::new(
            hue,
            self.saturation.unwrap_or(defaults.saturation),
            self.lightness.unwrap_or(defaults.lightness),
            defaults.alpha,
        )
    }
}

fn number_arg(flag: &str, value: Option<String>) -> Result<f64> {
    let value = value.ok_or_else(|| anyhow!("{flag} expects a number"))?;
    let number: f64 = value
        .parse()
        .with_context(|| format!("{flag} expects a number, got {value:?}"))?;
    if !number.is_finite() {
        return Err(anyhow!("{flag} must be finite, got {value}"));
    }
    Ok(number)
}
