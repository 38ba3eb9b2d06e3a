use std::any::Any;
use std::env;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use glam::Vec4;
use log::{debug, error, info, warn};
use pollster::block_on;
use winit::application::ApplicationHandler;
use winit::dpi::LogicalSize;
use winit::event::{ElementState, WindowEvent};
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::keyboard::{Key, NamedKey};
use winit::window::{Window, WindowId};

use phong_pass::app::{print_mesh_summary, print_raster_summary, FrameClock};
use phong_pass::{
    draw_indexed, load_obj, Framebuffer, LightingUniforms, Mesh, RenderConfig, Renderer,
};

const USAGE: &str = "Usage: phong-pass [model.obj] [--config file.toml] [--headless] \
[--output frame.png] [--time seconds] [--size WIDTHxHEIGHT]";

const CLEAR_COLOR: Vec4 = Vec4::new(0.0, 0.0, 0.0, 1.0);

fn main() {
    env_logger::init();
    if let Err(err) = run() {
        eprintln!("Error: {err:?}");
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let options = CliOptions::parse(env::args().skip(1))?;

    let config = match &options.config {
        Some(path) => RenderConfig::load(path)?,
        None => RenderConfig::default(),
    };
    config.validate().context("invalid configuration")?;

    let mesh = load_mesh(options.model.as_ref(), &config)?;
    print_mesh_summary(&mesh);

    if options.headless {
        return run_headless(&options, &config, &mesh);
    }
    match run_interactive(config.clone(), mesh.clone()) {
        Ok(()) => Ok(()),
        Err(err) => {
            if err.downcast_ref::<WindowInitError>().is_some() {
                eprintln!("{err}. Falling back to --headless mode.");
                run_headless(&options, &config, &mesh)
            } else {
                Err(err)
            }
        }
    }
}

fn load_mesh(model: Option<&PathBuf>, config: &RenderConfig) -> Result<Mesh> {
    let Some(path) = model else {
        info!("no model given, using the built-in cube");
        return Ok(Mesh::cube(config.mesh.color));
    };
    let mut mesh = load_obj(path, config.mesh.color)?;
    if config.mesh.normalize_extent {
        mesh.normalize_extent();
    }
    mesh.validate()
        .with_context(|| format!("invalid mesh in {}", path.display()))?;
    Ok(mesh)
}

fn run_headless(options: &CliOptions, config: &RenderConfig, mesh: &Mesh) -> Result<()> {
    let (width, height) = options
        .size
        .unwrap_or((config.window.width, config.window.height));
    let uniforms =
        LightingUniforms::for_frame(config, options.time, width as f32 / height as f32);
    uniforms
        .validate()
        .context("frame uniforms are unusable")?;

    let mut frame = Framebuffer::new(width, height, CLEAR_COLOR);
    let stats = draw_indexed(&mut frame, &uniforms, mesh);
    print_raster_summary(width, height, &stats);

    if let Some(path) = &options.output {
        frame.save_png(path)?;
        println!("Wrote {}", path.display());
    }
    Ok(())
}

fn run_interactive(config: RenderConfig, mesh: Mesh) -> Result<()> {
    let default_hook = panic::take_hook();
    panic::set_hook(Box::new(|_| {}));
    let event_loop = panic::catch_unwind(AssertUnwindSafe(EventLoop::new));
    panic::set_hook(default_hook);
    let event_loop = event_loop
        .map_err(|panic| WindowInitError::from_panic("event loop", panic))?
        .map_err(|err| WindowInitError::from_error("event loop", err))?;
    event_loop.set_control_flow(ControlFlow::Poll);

    let mut viewer = Viewer {
        config,
        mesh,
        renderer: None,
        clock: FrameClock::start(),
        last_error: None,
    };
    event_loop
        .run_app(&mut viewer)
        .context("event loop terminated abnormally")?;

    match viewer.last_error {
        Some(err) => Err(err),
        None => Ok(()),
    }
}

struct Viewer {
    config: RenderConfig,
    mesh: Mesh,
    renderer: Option<Renderer>,
    clock: FrameClock,
    last_error: Option<anyhow::Error>,
}

impl Viewer {
    fn create_renderer(&self, event_loop: &ActiveEventLoop) -> Result<Renderer> {
        let window = &self.config.window;
        let attributes = Window::default_attributes()
            .with_title(window.title.clone())
            .with_inner_size(LogicalSize::new(window.width, window.height));
        let window = Arc::new(
            event_loop
                .create_window(attributes)
                .map_err(|err| WindowInitError::from_error("window", err))?,
        );
        block_on(Renderer::new(window, &self.mesh))
    }

    fn fail(&mut self, event_loop: &ActiveEventLoop, err: anyhow::Error) {
        self.last_error = Some(err);
        event_loop.exit();
    }

    fn redraw(&mut self) -> Result<()> {
        let Some(renderer) = self.renderer.as_mut() else {
            return Ok(());
        };
        let uniforms =
            LightingUniforms::for_frame(&self.config, self.clock.seconds(), renderer.aspect());
        renderer.update_uniforms(&uniforms);
        if let Err(err) = renderer.render() {
            match err {
                wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated => {
                    debug!("surface {err:?}, reconfiguring");
                    let size = renderer.window().inner_size();
                    renderer.resize(size);
                }
                wgpu::SurfaceError::OutOfMemory => {
                    return Err(anyhow!("GPU is out of memory"));
                }
                wgpu::SurfaceError::Timeout => {
                    info!("Surface timeout; retrying next frame");
                }
                other => error!("failed to render frame: {other}"),
            }
        }
        Ok(())
    }
}

impl ApplicationHandler for Viewer {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.renderer.is_some() {
            return;
        }
        match self.create_renderer(event_loop) {
            Ok(renderer) => {
                renderer.window().request_redraw();
                self.renderer = Some(renderer);
            }
            Err(err) => self.fail(event_loop, err),
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, window_id: WindowId, event: WindowEvent) {
        let Some(renderer) = self.renderer.as_mut() else {
            return;
        };
        if window_id != renderer.window_id() {
            return;
        }
        match event {
            WindowEvent::CloseRequested => event_loop.exit(),
            WindowEvent::KeyboardInput { event, .. } => {
                if event.state == ElementState::Pressed
                    && event.logical_key == Key::Named(NamedKey::Escape)
                {
                    event_loop.exit();
                }
            }
            WindowEvent::Resized(size) => renderer.resize(size),
            WindowEvent::ScaleFactorChanged { .. } => {
                let size = renderer.window().inner_size();
                renderer.resize(size);
            }
            WindowEvent::RedrawRequested => {
                if let Err(err) = self.redraw() {
                    self.fail(event_loop, err);
                }
            }
            _ => {}
        }
    }

    fn about_to_wait(&mut self, _event_loop: &ActiveEventLoop) {
        if let Some(renderer) = &self.renderer {
            renderer.window().request_redraw();
        }
    }
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

#[derive(Debug, Default)]
struct CliOptions {
    model: Option<PathBuf>,
    config: Option<PathBuf>,
    output: Option<PathBuf>,
    size: Option<(u32, u32)>,
    time: f32,
    headless: bool,
}

impl CliOptions {
    fn parse(mut args: impl Iterator<Item = String>) -> Result<Self> {
        let mut options = Self::default();
        while let Some(arg) = args.next() {
            let mut value = |flag: &str| {
                args.next()
                    .ok_or_else(|| anyhow!("{flag} expects a value. {USAGE}"))
            };
            match arg.as_str() {
                "--headless" => options.headless = true,
                "--config" => options.config = Some(value("--config")?.into()),
                "--output" => options.output = Some(value("--output")?.into()),
                "--time" => {
                    let raw = value("--time")?;
                    options.time = raw
                        .parse()
                        .with_context(|| format!("invalid --time value `{raw}`"))?;
                }
                "--size" => options.size = Some(parse_size(&value("--size")?)?),
                other if other.starts_with("--") => {
                    return Err(anyhow!("Unknown argument: {other}. {USAGE}"));
                }
                path if options.model.is_none() => options.model = Some(path.into()),
                extra => {
                    return Err(anyhow!("Unexpected argument: {extra}. {USAGE}"));
                }
            }
        }
        if options.output.is_some() && !options.headless {
            warn!("--output only applies to headless rendering");
        }
        Ok(options)
    }
}

fn parse_size(raw: &str) -> Result<(u32, u32)> {
    let invalid = || anyhow!("invalid --size `{raw}`, expected WIDTHxHEIGHT");
    let (width, height) = raw.split_once(['x', 'X']).ok_or_else(invalid)?;
    let width: u32 = width.trim().parse().map_err(|_| invalid())?;
    let height: u32 = height.trim().parse().map_err(|_| invalid())?;
    if width == 0 || height == 0 {
        return Err(invalid());
    }
    Ok((width, height))
}
