//! Backend traits driven by the frame engine, and their Vulkan implementation.
//!
//! The swapchain manager and frame synchronizer never call Vulkan directly;
//! every fence, semaphore, submission and presentation goes through
//! [`DeviceBackend`] and [`SurfaceBackend`]. [`VulkanBackend`] implements both
//! on top of a [`GpuContext`] and a window [`SurfaceContext`].
//!
//! Handles passed to a backend must have been created by that same backend.
//! None of the methods are safe to call concurrently from several threads;
//! queue submission and presentation must stay on one driving thread.

use std::sync::Arc;

use crate::command::submit_command_buffers;
use crate::context::GpuContext;
use crate::error::{GpuError, Result};
use crate::surface::{SurfaceCapabilities, SurfaceContext};
use crate::sync::{create_fence, create_semaphore, reset_fence, wait_for_fence};
use ash::vk;

/// Parameters for creating a swapchain.
#[derive(Debug, Clone, Copy)]
pub struct SwapchainDesc {
    pub surface_format: vk::SurfaceFormatKHR,
    pub present_mode: vk::PresentModeKHR,
    pub extent: vk::Extent2D,
    pub image_count: u32,
    pub image_usage: vk::ImageUsageFlags,
    pub pre_transform: vk::SurfaceTransformFlagsKHR,
    pub composite_alpha: vk::CompositeAlphaFlagsKHR,
}

/// A created swapchain with one view per image, in presentation-engine order.
#[derive(Debug, Clone, Default)]
pub struct SwapchainChain {
    pub handle: vk::SwapchainKHR,
    pub images: Vec<vk::Image>,
    pub views: Vec<vk::ImageView>,
}

/// Outcome of a swapchain image acquisition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AcquireResult {
    /// An image was acquired; the semaphore will be signaled.
    Acquired { index: u32, suboptimal: bool },
    /// The swapchain no longer matches the surface; nothing was acquired.
    OutOfDate,
}

/// Outcome of presenting an image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PresentResult {
    Presented,
    Suboptimal,
    OutOfDate,
}

impl PresentResult {
    /// True if the swapchain should be recreated before the next frame.
    pub fn needs_reload(self) -> bool {
        !matches!(self, Self::Presented)
    }
}

/// A queue submission for one frame.
#[derive(Debug, Clone, Copy)]
pub struct SubmitDesc<'a> {
    pub command_buffers: &'a [vk::CommandBuffer],
    /// Semaphore to wait on at `wait_stage` before executing.
    pub wait_semaphore: Option<vk::Semaphore>,
    pub wait_stage: vk::PipelineStageFlags,
    /// Semaphore signaled when the batch completes.
    pub signal_semaphore: Option<vk::Semaphore>,
    /// Fence signaled when the batch completes.
    pub fence: vk::Fence,
}

/// Device-side synchronization and submission.
pub trait DeviceBackend {
    fn create_fence(&self, signaled: bool) -> Result<vk::Fence>;
    fn create_semaphore(&self) -> Result<vk::Semaphore>;
    fn destroy_fence(&self, fence: vk::Fence);
    fn destroy_semaphore(&self, semaphore: vk::Semaphore);

    /// Block until `fence` is signaled; [`GpuError::FenceTimeout`] on timeout.
    fn wait_for_fence(&self, fence: vk::Fence, timeout_ns: u64) -> Result<()>;
    fn reset_fence(&self, fence: vk::Fence) -> Result<()>;

    /// Submit to the graphics queue; failures map to [`GpuError::Submit`].
    fn submit(&self, desc: &SubmitDesc<'_>) -> Result<()>;
    fn wait_idle(&self) -> Result<()>;
}

/// Presentation surface and swapchain operations.
pub trait SurfaceBackend {
    fn surface_capabilities(&self) -> Result<SurfaceCapabilities>;

    /// Create a swapchain, passing `old` as the recreation hint.
    fn create_swapchain(
        &self,
        desc: &SwapchainDesc,
        old: vk::SwapchainKHR,
    ) -> Result<SwapchainChain>;

    /// Destroy the views and the swapchain. The chain must not be in use.
    fn destroy_swapchain(&self, chain: &SwapchainChain);

    fn acquire_next_image(
        &self,
        swapchain: vk::SwapchainKHR,
        semaphore: vk::Semaphore,
        timeout_ns: u64,
    ) -> Result<AcquireResult>;

    fn present(
        &self,
        swapchain: vk::SwapchainKHR,
        image_index: u32,
        wait_semaphore: vk::Semaphore,
    ) -> Result<PresentResult>;
}

/// Everything the frame engine needs from a GPU.
pub trait FrameBackend: DeviceBackend + SurfaceBackend {}

impl<T: DeviceBackend + SurfaceBackend + ?Sized> FrameBackend for T {}

/// Vulkan implementation of the backend traits for one window surface.
pub struct VulkanBackend {
    surface: SurfaceContext,
    gpu: Arc<GpuContext>,
}

impl VulkanBackend {
    /// Create a backend presenting to `surface`; takes ownership of it.
    pub fn new(gpu: Arc<GpuContext>, surface: SurfaceContext) -> Self {
        Self { surface, gpu }
    }

    /// Get the GPU context.
    pub fn gpu(&self) -> &Arc<GpuContext> {
        &self.gpu
    }

    /// Get the Vulkan device handle.
    pub fn device(&self) -> &ash::Device {
        self.gpu.device()
    }

    /// Get the surface context.
    pub fn surface(&self) -> &SurfaceContext {
        &self.surface
    }
}

impl Drop for VulkanBackend {
    fn drop(&mut self) {
        // SAFETY: every swapchain created by this backend has been destroyed
        // by its owner before the backend is dropped
        unsafe { self.surface.destroy() };
    }
}

impl DeviceBackend for VulkanBackend {
    fn create_fence(&self, signaled: bool) -> Result<vk::Fence> {
        // SAFETY: device is valid for the lifetime of the backend
        unsafe { create_fence(self.device(), signaled) }
    }

    fn create_semaphore(&self) -> Result<vk::Semaphore> {
        // SAFETY: device is valid for the lifetime of the backend
        unsafe { create_semaphore(self.device()) }
    }

    fn destroy_fence(&self, fence: vk::Fence) {
        // SAFETY: callers only destroy fences they no longer wait on
        unsafe { self.device().destroy_fence(fence, None) };
    }

    fn destroy_semaphore(&self, semaphore: vk::Semaphore) {
        // SAFETY: callers only destroy semaphores with no pending operations
        unsafe { self.device().destroy_semaphore(semaphore, None) };
    }

    fn wait_for_fence(&self, fence: vk::Fence, timeout_ns: u64) -> Result<()> {
        // SAFETY: fence was created by this backend
        unsafe { wait_for_fence(self.device(), fence, timeout_ns) }
    }

    fn reset_fence(&self, fence: vk::Fence) -> Result<()> {
        // SAFETY: fence was created by this backend and is not pending
        unsafe { reset_fence(self.device(), fence) }
    }

    fn submit(&self, desc: &SubmitDesc<'_>) -> Result<()> {
        let wait_semaphores: Vec<_> = desc.wait_semaphore.into_iter().collect();
        let wait_stages: Vec<_> = wait_semaphores.iter().map(|_| desc.wait_stage).collect();
        let signal_semaphores: Vec<_> = desc.signal_semaphore.into_iter().collect();

        // SAFETY: all handles were created by this backend or its device
        unsafe {
            submit_command_buffers(
                self.device(),
                self.gpu.graphics_queue(),
                desc.command_buffers,
                &wait_semaphores,
                &wait_stages,
                &signal_semaphores,
                desc.fence,
            )
        }
    }

    fn wait_idle(&self) -> Result<()> {
        self.gpu.wait_idle()
    }
}

impl SurfaceBackend for VulkanBackend {
    fn surface_capabilities(&self) -> Result<SurfaceCapabilities> {
        self.surface.capabilities(&self.gpu)
    }

    fn create_swapchain(
        &self,
        desc: &SwapchainDesc,
        old: vk::SwapchainKHR,
    ) -> Result<SwapchainChain> {
        let create_info = vk::SwapchainCreateInfoKHR::default()
            .surface(self.surface.surface)
            .min_image_count(desc.image_count)
            .image_format(desc.surface_format.format)
            .image_color_space(desc.surface_format.color_space)
            .image_extent(desc.extent)
            .image_array_layers(1)
            .image_usage(desc.image_usage)
            .image_sharing_mode(vk::SharingMode::EXCLUSIVE)
            .pre_transform(desc.pre_transform)
            .composite_alpha(desc.composite_alpha)
            .present_mode(desc.present_mode)
            .clipped(true)
            .old_swapchain(old);

        let loader = &self.surface.swapchain_loader;

        // SAFETY: surface and device are valid; `old` is either null or a
        // swapchain created by this backend
        let handle = unsafe { loader.create_swapchain(&create_info, None) }
            .map_err(|e| GpuError::SwapchainCreation(e.to_string()))?;

        let mut chain = SwapchainChain {
            handle,
            ..Default::default()
        };

        // SAFETY: handle was just created
        chain.images = match unsafe { loader.get_swapchain_images(handle) } {
            Ok(images) => images,
            Err(e) => {
                self.destroy_swapchain(&chain);
                return Err(GpuError::SwapchainCreation(e.to_string()));
            }
        };

        for &image in &chain.images {
            let view_info = vk::ImageViewCreateInfo::default()
                .image(image)
                .view_type(vk::ImageViewType::TYPE_2D)
                .format(desc.surface_format.format)
                .components(vk::ComponentMapping::default())
                .subresource_range(crate::command::color_subresource_range());

            // SAFETY: image belongs to the swapchain created above
            match unsafe { self.device().create_image_view(&view_info, None) } {
                Ok(view) => chain.views.push(view),
                Err(e) => {
                    self.destroy_swapchain(&chain);
                    return Err(GpuError::SwapchainCreation(format!("image view: {e}")));
                }
            }
        }

        Ok(chain)
    }

    fn destroy_swapchain(&self, chain: &SwapchainChain) {
        // SAFETY: caller guarantees the chain is no longer in use
        unsafe {
            for &view in &chain.views {
                self.device().destroy_image_view(view, None);
            }
            if chain.handle != vk::SwapchainKHR::null() {
                self.surface
                    .swapchain_loader
                    .destroy_swapchain(chain.handle, None);
            }
        }
    }

    #[cfg_attr(
        feature = "profiling-tracy",
        tracing::instrument(level = "trace", skip_all)
    )]
    fn acquire_next_image(
        &self,
        swapchain: vk::SwapchainKHR,
        semaphore: vk::Semaphore,
        timeout_ns: u64,
    ) -> Result<AcquireResult> {
        // SAFETY: swapchain and semaphore were created by this backend
        let result = unsafe {
            self.surface.swapchain_loader.acquire_next_image(
                swapchain,
                timeout_ns,
                semaphore,
                vk::Fence::null(),
            )
        };

        match result {
            Ok((index, suboptimal)) => Ok(AcquireResult::Acquired { index, suboptimal }),
            // OUT_OF_DATE means no image was acquired and the semaphore stays unsignaled
            Err(vk::Result::ERROR_OUT_OF_DATE_KHR) => Ok(AcquireResult::OutOfDate),
            Err(e) => Err(GpuError::Acquire(e)),
        }
    }

    #[cfg_attr(
        feature = "profiling-tracy",
        tracing::instrument(level = "trace", skip_all)
    )]
    fn present(
        &self,
        swapchain: vk::SwapchainKHR,
        image_index: u32,
        wait_semaphore: vk::Semaphore,
    ) -> Result<PresentResult> {
        let wait_semaphores = [wait_semaphore];
        let swapchains = [swapchain];
        let image_indices = [image_index];

        let present_info = vk::PresentInfoKHR::default()
            .wait_semaphores(&wait_semaphores)
            .swapchains(&swapchains)
            .image_indices(&image_indices);

        // SAFETY: all handles were created by this backend
        let result = unsafe {
            self.surface
                .swapchain_loader
                .queue_present(self.gpu.graphics_queue(), &present_info)
        };

        match result {
            Ok(false) => Ok(PresentResult::Presented),
            Ok(true) => Ok(PresentResult::Suboptimal),
            Err(vk::Result::ERROR_OUT_OF_DATE_KHR) => Ok(PresentResult::OutOfDate),
            Err(e) => Err(GpuError::Present(e)),
        }
    }
}
