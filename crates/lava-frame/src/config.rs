//! Swapchain, renderer and render target configuration.

use ash::vk;
use std::time::Duration;

/// Swapchain configuration.
#[derive(Debug, Clone, Copy, Default)]
pub struct SwapchainConfig {
    /// Present with vertical sync (FIFO).
    pub vsync: bool,
    /// Format to use when the surface offers it.
    pub preferred_format: Option<vk::Format>,
}

impl SwapchainConfig {
    /// Enable or disable vsync.
    pub fn with_vsync(mut self, vsync: bool) -> Self {
        self.vsync = vsync;
        self
    }

    /// Prefer a specific backbuffer format.
    pub fn with_preferred_format(mut self, format: vk::Format) -> Self {
        self.preferred_format = Some(format);
        self
    }
}

/// Frame synchronizer configuration.
#[derive(Debug, Clone, Copy)]
pub struct RendererConfig {
    /// Number of frames the CPU may run ahead of the GPU.
    pub queued_frames: u32,
    /// Longest wait on a frame fence before the GPU is considered hung.
    pub fence_timeout: Duration,
    /// Longest wait for a presentable image; `None` waits forever.
    pub acquire_timeout: Option<Duration>,
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            queued_frames: 2,
            fence_timeout: Duration::from_secs(10),
            acquire_timeout: None,
        }
    }
}

impl RendererConfig {
    /// Set the number of frames in flight (at least one).
    pub fn with_queued_frames(mut self, queued_frames: u32) -> Self {
        self.queued_frames = queued_frames.max(1);
        self
    }

    /// Set the fence timeout.
    pub fn with_fence_timeout(mut self, timeout: Duration) -> Self {
        self.fence_timeout = timeout;
        self
    }

    /// Set the image acquisition timeout.
    pub fn with_acquire_timeout(mut self, timeout: Duration) -> Self {
        self.acquire_timeout = Some(timeout);
        self
    }

    pub(crate) fn fence_timeout_ns(&self) -> u64 {
        duration_to_ns(self.fence_timeout)
    }

    pub(crate) fn acquire_timeout_ns(&self) -> u64 {
        self.acquire_timeout.map_or(u64::MAX, duration_to_ns)
    }
}

/// Render target configuration.
#[derive(Debug, Clone, Copy, Default)]
pub struct TargetConfig {
    pub swapchain: SwapchainConfig,
    pub renderer: RendererConfig,
}

impl TargetConfig {
    /// Enable or disable vsync.
    pub fn with_vsync(mut self, vsync: bool) -> Self {
        self.swapchain.vsync = vsync;
        self
    }

    /// Set the number of frames in flight (at least one).
    pub fn with_queued_frames(mut self, queued_frames: u32) -> Self {
        self.renderer = self.renderer.with_queued_frames(queued_frames);
        self
    }
}

fn duration_to_ns(duration: Duration) -> u64 {
    u64::try_from(duration.as_nanos()).unwrap_or(u64::MAX)
}
