//! tonescope - live instrument EQ with a spectrum display and recorder
//!
//! Keys: Up/Down volume, Q/A bass, W/S mid, E/D treble, R or Space record,
//! Esc quit.

use std::sync::Arc;
use std::time::Instant;

use anyhow::{anyhow, Context};
use clap::Parser;
use winit::{
    application::ApplicationHandler,
    event::*,
    event_loop::{ActiveEventLoop, ControlFlow, EventLoop},
    keyboard::{KeyCode, PhysicalKey},
    window::{Window, WindowId},
};

use tonescope::audio::list_devices;
use tonescope::cli::Args;
use tonescope::controls::ControlEvent;
use tonescope::rendering::RenderSystem;
use tonescope::session::{Session, SessionConfig};

/// Main application state
struct App {
    window: Option<Arc<Window>>,
    render_system: Option<RenderSystem>,
    session: Session,
    config: SessionConfig,
    title: String,

    /// Window/GPU failure that ends the app
    fatal: Option<anyhow::Error>,
}

impl App {
    fn new(session: Session, config: SessionConfig) -> Self {
        Self {
            window: None,
            render_system: None,
            session,
            config,
            title: String::new(),
            fatal: None,
        }
    }

    fn init_window(&mut self, event_loop: &ActiveEventLoop) -> anyhow::Result<()> {
        let window_attributes = Window::default_attributes()
            .with_title("tonescope")
            .with_inner_size(winit::dpi::LogicalSize::new(
                self.config.visualizer.window_width,
                self.config.visualizer.window_height,
            ));

        let window = Arc::new(
            event_loop
                .create_window(window_attributes)
                .context("Failed to create window")?,
        );

        let render_system = pollster::block_on(RenderSystem::new(
            Arc::clone(&window),
            self.config.visualizer.clear_color,
        ))
        .map_err(|e| anyhow!(e))
        .context("Failed to initialise GPU")?;

        self.push_resize(&window, window.inner_size());
        self.session.dispatch_pending(Instant::now());

        self.window = Some(window);
        self.render_system = Some(render_system);
        Ok(())
    }

    fn push_resize(&mut self, window: &Window, size: winit::dpi::PhysicalSize<u32>) {
        let scale_factor = window.scale_factor();
        self.session.push_event(ControlEvent::Resized {
            width: size.width as f64 / scale_factor,
            height: size.height as f64 / scale_factor,
            scale_factor,
        });
    }

    /// Render a single frame
    fn render_frame(&mut self, event_loop: &ActiveEventLoop) {
        let Some(render_system) = self.render_system.as_mut() else {
            return;
        };

        let resolution = self.session.resolution();
        if resolution != render_system.resolution() {
            render_system.resize(resolution);
        }

        if !self.session.frame(render_system) {
            return;
        }

        match render_system.present() {
            Ok(()) => {}
            Err(wgpu::SurfaceError::OutOfMemory) => {
                log::error!("GPU out of memory");
                event_loop.exit();
            }
            Err(e) => log::warn!("Render error: {:?}", e),
        }
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return; // Already initialized
        }

        if let Err(e) = self.init_window(event_loop) {
            self.fatal = Some(e);
            event_loop.exit();
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _window_id: WindowId, event: WindowEvent) {
        match event {
            WindowEvent::CloseRequested
            | WindowEvent::KeyboardInput {
                event:
                    KeyEvent {
                        state: ElementState::Pressed,
                        physical_key: PhysicalKey::Code(KeyCode::Escape),
                        ..
                    },
                ..
            } => event_loop.exit(),
            WindowEvent::KeyboardInput {
                event:
                    KeyEvent {
                        state: ElementState::Pressed,
                        physical_key: PhysicalKey::Code(code),
                        repeat,
                        ..
                    },
                ..
            } => {
                // Holding a range key keeps stepping; holding record must not
                // toggle back and forth
                if let Some(event) = self.session.controls_mut().handle_key(code) {
                    if !(repeat && event == ControlEvent::ToggleRecording) {
                        self.session.push_event(event);
                    }
                }
            }
            WindowEvent::Resized(physical_size) => {
                if let Some(window) = self.window.clone() {
                    self.push_resize(&window, physical_size);
                }
            }
            WindowEvent::RedrawRequested => self.render_frame(event_loop),
            _ => {}
        }
    }

    fn about_to_wait(&mut self, event_loop: &ActiveEventLoop) {
        let now = Instant::now();
        self.session.dispatch_pending(now);
        self.session.poll_timers(now);

        if let Some(window) = &self.window {
            let title = self.session.title();
            if title != self.title {
                window.set_title(&title);
                self.title = title;
            }
            window.request_redraw();
        }

        match self.session.next_deadline() {
            Some(deadline) => event_loop.set_control_flow(ControlFlow::WaitUntil(deadline)),
            None => event_loop.set_control_flow(ControlFlow::Wait),
        }
    }

    fn exiting(&mut self, _event_loop: &ActiveEventLoop) {
        self.session.teardown(Instant::now());
    }
}

fn print_devices() -> anyhow::Result<()> {
    let host = cpal::default_host();
    let (inputs, outputs) = list_devices(&host)?;

    println!("Input devices:");
    for name in inputs {
        println!("  {}", name);
    }
    println!("Output devices:");
    for name in outputs {
        println!("  {}", name);
    }
    Ok(())
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    if args.list_devices {
        return print_devices();
    }

    let config = args.session_config().map_err(|e| anyhow!(e))?;

    log::info!("tonescope starting (fft {} bins)", config.analyser.bin_count());
    let host = cpal::default_host();
    let session = Session::start(config.clone(), &host);

    let event_loop = EventLoop::new().context("Failed to create event loop")?;
    let mut app = App::new(session, config);
    event_loop.run_app(&mut app)?;

    match app.fatal.take() {
        Some(e) => Err(e),
        None => Ok(()),
    }
}
