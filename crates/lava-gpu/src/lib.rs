//! Vulkan abstraction layer for lava-rs.
//!
//! This crate provides:
//! - Vulkan instance and device management
//! - Adapter discovery and selection
//! - Surface and raw swapchain handling
//! - Fence, semaphore and command buffer helpers
//! - The backend traits the frame engine drives

pub mod adapter;
pub mod backend;
pub mod command;
pub mod context;
pub mod error;
pub mod instance;
pub mod surface;
pub mod swapchain;
pub mod sync;

pub use adapter::{pick_adapter, Adapter};
pub use backend::{
    AcquireResult, DeviceBackend, FrameBackend, PresentResult, SubmitDesc, SurfaceBackend,
    SwapchainChain, SwapchainDesc, VulkanBackend,
};
pub use context::{GpuContext, GpuContextBuilder};
pub use error::{GpuError, Result};
pub use surface::{SurfaceCapabilities, SurfaceContext};
pub use swapchain::{
    backbuffer_count, backbuffer_usage, calculate_extent, extent_to_size, select_composite_alpha,
    select_present_mode, select_surface_format,
};
