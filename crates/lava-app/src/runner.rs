//! Application runner and event loop.

use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use ash::vk;
use lava_core::{is_degenerate, Size};
use lava_gpu::GpuContextBuilder;
use tracing::{debug, error, info};
use tracing_subscriber::EnvFilter;
use winit::application::ApplicationHandler;
use winit::dpi::PhysicalSize;
use winit::event::WindowEvent;
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::raw_window_handle::HasDisplayHandle;
use winit::window::{Window, WindowId};

use crate::app::LavaApp;
use crate::context::AppContext;
use crate::frame::FrameContext;

/// Application configuration.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Window title.
    pub title: String,
    /// Initial window width.
    pub width: u32,
    /// Initial window height.
    pub height: u32,
    /// Target frames per second (None for unlimited).
    pub target_fps: Option<u32>,
    /// Enable vsync.
    pub vsync: bool,
    /// Enable Vulkan validation layers (default: debug builds only).
    pub validation: bool,
    /// Frames the CPU may run ahead of the GPU.
    pub queued_frames: u32,
    /// Index of the preferred GPU adapter (None picks automatically).
    pub adapter: Option<usize>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            title: "lava".to_string(),
            width: 1280,
            height: 720,
            target_fps: None,
            vsync: true,
            validation: cfg!(debug_assertions),
            queued_frames: 2,
            adapter: None,
        }
    }
}

impl AppConfig {
    /// Create a new config with the given title.
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Default::default()
        }
    }

    /// Set the window dimensions.
    pub fn with_size(mut self, size: Size) -> Self {
        self.width = size.x;
        self.height = size.y;
        self
    }

    /// Set the target FPS.
    pub fn with_target_fps(mut self, fps: u32) -> Self {
        self.target_fps = Some(fps);
        self
    }

    /// Enable or disable vsync.
    pub fn with_vsync(mut self, vsync: bool) -> Self {
        self.vsync = vsync;
        self
    }

    /// Enable or disable validation layers.
    pub fn with_validation(mut self, validation: bool) -> Self {
        self.validation = validation;
        self
    }

    /// Set the number of frames in flight (at least one).
    pub fn with_queued_frames(mut self, queued_frames: u32) -> Self {
        self.queued_frames = queued_frames.max(1);
        self
    }

    /// Prefer the GPU adapter at `index`.
    pub fn with_adapter(mut self, index: usize) -> Self {
        self.adapter = Some(index);
        self
    }

    /// Minimum time per frame when an FPS cap is set.
    pub fn target_frame_time(&self) -> Option<Duration> {
        self.target_fps
            .filter(|&fps| fps > 0)
            .map(|fps| Duration::from_nanos(1_000_000_000 / u64::from(fps)))
    }
}

/// Run a `LavaApp` with the given configuration.
///
/// Initializes logging (`RUST_LOG` overrides the default `info` filter),
/// creates the window and GPU context, and runs the event loop until the
/// window is closed. Initialization and render errors end the loop and are
/// returned.
pub fn run_app<A: LavaApp + 'static>(config: AppConfig) -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    info!("{} starting...", config.title);

    let event_loop = EventLoop::new()?;
    event_loop.set_control_flow(ControlFlow::Poll);

    let mut runner = AppRunner::<A> {
        config,
        state: None,
        error: None,
    };

    event_loop.run_app(&mut runner)?;

    match runner.error {
        Some(e) => Err(e),
        None => Ok(()),
    }
}

/// Internal application runner that implements winit's `ApplicationHandler`.
struct AppRunner<A: LavaApp> {
    config: AppConfig,
    state: Option<AppState<A>>,
    error: Option<anyhow::Error>,
}

/// Internal application state.
struct AppState<A: LavaApp> {
    app: A,
    ctx: AppContext,
    target_frame_time: Option<Duration>,
    min_fps: f64,
    max_fps: f64,
    fps_sum: f64,
}

impl<A: LavaApp + 'static> ApplicationHandler for AppRunner<A> {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.state.is_some() {
            return;
        }

        info!("Creating application state...");

        match self.create_state(event_loop) {
            Ok(state) => {
                self.state = Some(state);
                info!("Application ready");
            }
            Err(e) => {
                error!("Failed to initialize application: {e}");
                self.error = Some(e);
                event_loop.exit();
            }
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _id: WindowId, event: WindowEvent) {
        if let Some(state) = &mut self.state {
            if state.app.on_event(&mut state.ctx, &event) {
                return;
            }
        }

        let result = match event {
            WindowEvent::CloseRequested => {
                info!("Close requested");
                if let Some(mut state) = self.state.take() {
                    state.cleanup();
                }
                event_loop.exit();
                Ok(())
            }
            WindowEvent::RedrawRequested => match &mut self.state {
                Some(state) => state.render_frame(),
                None => Ok(()),
            },
            WindowEvent::Resized(size) => match &mut self.state {
                Some(state) => state.handle_resize(Size::new(size.width, size.height)),
                None => Ok(()),
            },
            _ => Ok(()),
        };

        if let Err(e) = result {
            error!("Fatal error: {e}");
            if let Some(mut state) = self.state.take() {
                state.cleanup();
            }
            self.error = Some(e);
            event_loop.exit();
        }
    }

    fn about_to_wait(&mut self, _event_loop: &ActiveEventLoop) {
        if let Some(state) = &self.state {
            state.ctx.window.request_redraw();
        }
    }
}

impl<A: LavaApp + 'static> AppRunner<A> {
    fn create_state(&self, event_loop: &ActiveEventLoop) -> anyhow::Result<AppState<A>> {
        let window_attrs = Window::default_attributes()
            .with_title(&self.config.title)
            .with_inner_size(PhysicalSize::new(self.config.width, self.config.height));

        let window = Arc::new(event_loop.create_window(window_attrs)?);

        let gpu = GpuContextBuilder::new()
            .app_name(&self.config.title)
            .validation(self.config.validation)
            .adapter(self.config.adapter)
            .display(window.display_handle()?.as_raw())
            .build()?;

        info!("GPU: {}", gpu.adapter());

        // SAFETY: the window was just created and is owned by the context
        let mut ctx = unsafe { AppContext::new(window, Arc::new(gpu), &self.config)? };

        let app = A::init(&mut ctx)?;

        Ok(AppState {
            app,
            ctx,
            target_frame_time: self.config.target_frame_time(),
            min_fps: f64::MAX,
            max_fps: 0.0,
            fps_sum: 0.0,
        })
    }
}

impl<A: LavaApp> AppState<A> {
    #[cfg_attr(
        feature = "profiling-tracy",
        tracing::instrument(level = "trace", skip_all)
    )]
    fn render_frame(&mut self) -> anyhow::Result<()> {
        let frame_start = Instant::now();

        let now = Instant::now();
        let real_dt = now.duration_since(self.ctx.last_frame_time).as_secs_f32();
        self.ctx.last_frame_time = now;
        let dt = self.ctx.run_time.advance(real_dt);

        if self.ctx.target.must_reload() {
            debug!("Reloading render target");
            let before = self.ctx.target.size();
            self.ctx.target.reload()?;
            let after = self.ctx.target.size();
            if after != before {
                self.app.on_resize(&mut self.ctx, after)?;
            }
        }

        self.app.update(&mut self.ctx, dt);

        let Some(image_index) = self.ctx.target.begin_frame()? else {
            return Ok(());
        };

        let command_buffer = match self.record(image_index, dt) {
            Ok(command_buffer) => command_buffer,
            Err(e) => {
                self.ctx.target.abort_frame()?;
                return Err(e);
            }
        };

        if self.ctx.target.end_frame(&[command_buffer])? {
            self.ctx.frame_count += 1;
            if real_dt > 0.0 {
                let fps = 1.0 / f64::from(real_dt);
                self.min_fps = self.min_fps.min(fps);
                self.max_fps = self.max_fps.max(fps);
                self.fps_sum += fps;
            }
        }

        if let Some(target) = self.target_frame_time {
            let elapsed = frame_start.elapsed();
            if elapsed < target {
                thread::sleep(target - elapsed);
            }
        }

        Ok(())
    }

    /// Record the app's commands for the pending frame.
    fn record(&mut self, image_index: u32, dt: f32) -> anyhow::Result<vk::CommandBuffer> {
        let slot = self.ctx.target.renderer().current_sync();
        let backbuffer = self
            .ctx
            .target
            .backbuffer_image(image_index as usize)
            .ok_or_else(|| anyhow::anyhow!("no backbuffer {image_index}"))?;
        let commands = self
            .ctx
            .commands
            .as_ref()
            .ok_or_else(|| anyhow::anyhow!("render resources already destroyed"))?;

        // SAFETY: begin_frame waited on this slot's fence, so its buffer is
        // no longer pending
        let command_buffer = unsafe { commands.begin(self.ctx.gpu.device(), slot)? };

        let mut frame = FrameContext {
            command_buffer,
            image_index,
            backbuffer,
            size: self.ctx.target.size(),
            format: self.ctx.target.format(),
            clear_color: self.ctx.target.clear_color(),
            dt,
            frame_number: self.ctx.frame_count,
            frame_slot: slot,
        };
        self.app.render(&self.ctx, &mut frame)?;

        // SAFETY: the buffer is recording
        unsafe { commands.end(self.ctx.gpu.device(), command_buffer)? };
        Ok(command_buffer)
    }

    fn handle_resize(&mut self, size: Size) -> anyhow::Result<()> {
        // A minimized window keeps its swapchain; rendering just pauses
        let minimized = is_degenerate(size);
        self.ctx.target.renderer_mut().set_active(!minimized);
        if minimized {
            debug!("Window minimized, rendering paused");
            return Ok(());
        }

        let before = self.ctx.target.size();
        self.ctx.target.resize(size)?;
        let after = self.ctx.target.size();
        if after != before {
            self.app.on_resize(&mut self.ctx, after)?;
            info!("Resized to {}x{}", after.x, after.y);
        }
        Ok(())
    }

    fn cleanup(&mut self) {
        if self.ctx.frame_count > 0 {
            let avg_fps = self.fps_sum / self.ctx.frame_count as f64;
            info!("FPS Statistics:");
            info!("  Min: {:.1}", self.min_fps);
            info!("  Max: {:.1}", self.max_fps);
            info!("  Avg: {avg_fps:.1}");
            info!("  Total frames: {}", self.ctx.frame_count);
        }

        info!("Starting cleanup...");
        if let Err(e) = self.ctx.gpu.wait_idle() {
            error!("Failed to wait idle: {e}");
        }

        self.app.cleanup(&mut self.ctx);
        self.ctx.destroy();

        info!("Cleanup complete");
    }
}
