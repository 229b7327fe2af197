//! Application context.

use std::sync::Arc;
use std::time::Instant;

use ash::vk;
use lava_core::{Area, Size};
use lava_frame::{RenderTarget, TargetConfig};
use lava_gpu::command::FrameCommands;
use lava_gpu::{GpuContext, SurfaceContext, VulkanBackend};
use tracing::{error, info};
use winit::window::Window;

use crate::runner::AppConfig;
use crate::time::RunTime;

/// Application context shared across all app methods.
pub struct AppContext {
    /// Render target presenting to the window.
    pub target: RenderTarget<VulkanBackend>,
    /// Scaled application clock.
    pub run_time: RunTime,
    /// Frames rendered so far.
    pub frame_count: u64,
    /// One command buffer per frame slot; `None` once destroyed.
    pub(crate) commands: Option<FrameCommands>,
    pub(crate) last_frame_time: Instant,
    /// GPU context with device and queue.
    pub gpu: Arc<GpuContext>,
    /// The window. Declared last so it outlives the surface.
    pub window: Arc<Window>,
}

impl AppContext {
    /// Create the surface, the render target and the per-slot command
    /// buffers.
    ///
    /// # Safety
    /// The window must have valid handles.
    pub(crate) unsafe fn new(
        window: Arc<Window>,
        gpu: Arc<GpuContext>,
        config: &AppConfig,
    ) -> anyhow::Result<Self> {
        // SAFETY: caller guarantees the window has valid handles; the
        // window is kept alive by the context for as long as the surface
        let surface = unsafe { SurfaceContext::from_window(&gpu, window.as_ref())? };
        let backend = Arc::new(VulkanBackend::new(gpu.clone(), surface));

        let target_config = TargetConfig::default()
            .with_vsync(config.vsync)
            .with_queued_frames(config.queued_frames);
        let mut target = RenderTarget::new(backend, target_config);

        let size = window.inner_size();
        target.create(Size::new(size.width, size.height))?;

        // SAFETY: device is valid and the queue family exists
        let commands = unsafe {
            FrameCommands::new(
                gpu.device(),
                gpu.graphics_queue_family(),
                target.renderer().queued_frames(),
            )?
        };

        Ok(Self {
            target,
            run_time: RunTime::default(),
            frame_count: 0,
            commands: Some(commands),
            last_frame_time: Instant::now(),
            gpu,
            window,
        })
    }

    /// Current render target size.
    pub fn size(&self) -> Size {
        self.target.size()
    }

    pub fn width(&self) -> u32 {
        self.target.size().x
    }

    pub fn height(&self) -> u32 {
        self.target.size().y
    }

    /// Get the aspect ratio (width / height), 0 while minimized.
    pub fn aspect_ratio(&self) -> f32 {
        Area::from_size(self.target.size()).aspect_ratio()
    }

    pub fn device(&self) -> &ash::Device {
        self.gpu.device()
    }

    /// Get the number of frames in flight.
    pub fn frames_in_flight(&self) -> usize {
        self.target.renderer().queued_frames() as usize
    }

    /// Command buffer owned by frame slot `slot`.
    pub fn command_buffer(&self, slot: usize) -> Option<vk::CommandBuffer> {
        self.commands.as_ref().and_then(|commands| commands.buffer(slot))
    }

    /// Wait for the GPU, then destroy the render target and command buffers.
    /// Does nothing the second time.
    pub(crate) fn destroy(&mut self) {
        let Some(mut commands) = self.commands.take() else {
            return;
        };

        if let Err(e) = self.gpu.wait_idle() {
            error!("Failed to wait idle: {e}");
        }

        self.target.destroy();
        // SAFETY: the device is idle and every buffer from the pool is done
        unsafe { commands.destroy(self.gpu.device()) };

        info!("Render resources destroyed");
    }
}

impl Drop for AppContext {
    fn drop(&mut self) {
        self.destroy();
    }
}
