//! Swapchain lifecycle.
//!
//! The [`Swapchain`] owns the presentable images and their views. It starts
//! out destroyed, is built by [`Swapchain::create`], and rebuilt in place by
//! [`Swapchain::resize`] or [`Swapchain::reload`]. A zero-sized surface (a
//! minimized window) is not an error: the swapchain simply has no images and
//! reports [`Swapchain::is_ready`] as false until the next resize.

use std::mem;
use std::sync::Arc;

use ash::vk;
use lava_core::{is_degenerate, Size};
use lava_gpu::swapchain::{
    backbuffer_count, backbuffer_usage, calculate_extent, extent_to_size, select_composite_alpha,
    select_present_mode, select_surface_format,
};
use lava_gpu::{GpuError, Result, SurfaceBackend, SwapchainChain, SwapchainDesc};
use tracing::{debug, info};

use crate::config::SwapchainConfig;

/// Presentable image chain for one surface.
pub struct Swapchain<B: SurfaceBackend> {
    backend: Arc<B>,
    config: SwapchainConfig,
    chain: SwapchainChain,
    size: Size,
    surface_format: Option<vk::SurfaceFormatKHR>,
    present_mode: vk::PresentModeKHR,
    /// Bumped for every new image chain; handles may be reused by the driver.
    generation: u64,
    created: bool,
    reload: bool,
}

impl<B: SurfaceBackend> Swapchain<B> {
    /// Create a swapchain manager in the destroyed state.
    pub fn new(backend: Arc<B>, config: SwapchainConfig) -> Self {
        Self {
            backend,
            config,
            chain: SwapchainChain::default(),
            size: Size::ZERO,
            surface_format: None,
            present_mode: vk::PresentModeKHR::FIFO,
            generation: 0,
            created: false,
            reload: false,
        }
    }

    /// Build the swapchain at `size`. Does nothing if already created.
    ///
    /// Fails if the surface offers no formats or the backend cannot create the
    /// swapchain; the manager is then left destroyed.
    pub fn create(&mut self, size: Size) -> Result<()> {
        if self.created {
            return Ok(());
        }

        self.surface_format = None;
        self.build(size, vk::SwapchainKHR::null())?;
        self.created = true;
        Ok(())
    }

    /// Rebuild the swapchain at `new_size`.
    ///
    /// The old swapchain is handed to the backend as a recreation hint and
    /// destroyed afterwards, whether or not the new one could be created. The
    /// caller must make sure no submitted work still references its images.
    pub fn resize(&mut self, new_size: Size) -> Result<()> {
        if !self.created {
            return Err(GpuError::InvalidState(
                "resize on a destroyed swapchain".to_string(),
            ));
        }

        let old = mem::take(&mut self.chain);
        let result = self.build(new_size, old.handle);
        if old.handle != vk::SwapchainKHR::null() {
            self.backend.destroy_swapchain(&old);
        }
        result
    }

    /// Rebuild the swapchain at its current size.
    pub fn reload(&mut self) -> Result<()> {
        self.resize(self.size)
    }

    /// Destroy the swapchain. Does nothing if already destroyed.
    ///
    /// The caller must make sure no submitted work still references its images.
    pub fn destroy(&mut self) {
        if !self.created {
            return;
        }

        let chain = mem::take(&mut self.chain);
        if chain.handle != vk::SwapchainKHR::null() {
            self.backend.destroy_swapchain(&chain);
        }
        self.created = false;
        self.reload = false;
        self.surface_format = None;
    }

    fn build(&mut self, size: Size, old: vk::SwapchainKHR) -> Result<()> {
        self.size = size;
        self.reload = false;

        if is_degenerate(size) {
            debug!("Swapchain not ready: requested size {}x{}", size.x, size.y);
            return Ok(());
        }

        let caps = self.backend.surface_capabilities()?;

        let surface_format = match self.surface_format {
            Some(current) if caps.supports_format(current) => current,
            _ => select_surface_format(&caps.formats, self.config.preferred_format).ok_or_else(
                || GpuError::SwapchainCreation("surface reports no formats".to_string()),
            )?,
        };

        let present_mode = if self.surface_format.is_some()
            && caps.supports_present_mode(self.present_mode)
        {
            self.present_mode
        } else {
            select_present_mode(&caps.present_modes, self.config.vsync)
        };

        let extent = calculate_extent(&caps.capabilities, size);
        if extent.width == 0 || extent.height == 0 {
            debug!("Swapchain not ready: surface extent is zero");
            return Ok(());
        }

        let desc = SwapchainDesc {
            surface_format,
            present_mode,
            extent,
            image_count: backbuffer_count(&caps.capabilities),
            image_usage: backbuffer_usage(caps.capabilities.supported_usage_flags),
            pre_transform: caps.capabilities.current_transform,
            composite_alpha: select_composite_alpha(
                caps.capabilities.supported_composite_alpha,
            ),
        };

        let chain = self.backend.create_swapchain(&desc, old)?;
        if chain.images.is_empty() {
            self.backend.destroy_swapchain(&chain);
            return Err(GpuError::SwapchainCreation(
                "swapchain has no images".to_string(),
            ));
        }

        info!(
            "Swapchain created: {}x{} ({} images, {:?}, {:?})",
            extent.width,
            extent.height,
            chain.images.len(),
            surface_format.format,
            present_mode
        );

        self.chain = chain;
        self.generation += 1;
        self.size = extent_to_size(extent);
        self.surface_format = Some(surface_format);
        self.present_mode = present_mode;
        Ok(())
    }

    /// Flag the swapchain as out of date; the owner reloads it before the
    /// next frame.
    pub fn mark_reload(&mut self) {
        if !self.reload {
            debug!("Swapchain marked for reload");
        }
        self.reload = true;
    }

    /// True if the last acquire or present reported the surface out of date
    /// or suboptimal.
    pub fn must_reload(&self) -> bool {
        self.reload
    }

    /// True between `create` and `destroy`, even while not ready.
    pub fn is_created(&self) -> bool {
        self.created
    }

    /// True if there are images to render into.
    pub fn is_ready(&self) -> bool {
        self.created && !self.chain.images.is_empty()
    }

    /// Identifies the current image chain. Changes with every successful
    /// build, even if the driver hands out a recycled handle.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Get the raw swapchain handle (null while not ready).
    pub fn handle(&self) -> vk::SwapchainKHR {
        self.chain.handle
    }

    /// Current size in pixels.
    pub fn size(&self) -> Size {
        self.size
    }

    /// Backbuffer format, once a swapchain has been built.
    pub fn format(&self) -> vk::Format {
        self.surface_format
            .map_or(vk::Format::UNDEFINED, |format| format.format)
    }

    /// Backbuffer format and color space, once a swapchain has been built.
    pub fn surface_format(&self) -> Option<vk::SurfaceFormatKHR> {
        self.surface_format
    }

    /// Selected present mode.
    pub fn present_mode(&self) -> vk::PresentModeKHR {
        self.present_mode
    }

    /// Number of presentable images.
    pub fn backbuffer_count(&self) -> usize {
        self.chain.images.len()
    }

    /// Presentable images in presentation-engine order.
    pub fn images(&self) -> &[vk::Image] {
        &self.chain.images
    }

    /// One view per presentable image, index-aligned with [`Self::images`].
    pub fn image_views(&self) -> &[vk::ImageView] {
        &self.chain.views
    }

    /// Image at `index`, if in range.
    pub fn image(&self, index: usize) -> Option<vk::Image> {
        self.chain.images.get(index).copied()
    }

    /// Get the backend.
    pub fn backend(&self) -> &Arc<B> {
        &self.backend
    }
}

impl<B: SurfaceBackend> Drop for Swapchain<B> {
    fn drop(&mut self) {
        self.destroy();
    }
}
