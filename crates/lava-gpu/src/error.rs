//! GPU error types.

use ash::vk;
use thiserror::Error;

/// GPU-related errors.
#[derive(Error, Debug)]
pub enum GpuError {
    /// Vulkan error.
    #[error("Vulkan error: {0}")]
    Vulkan(#[from] vk::Result),

    /// No suitable GPU found.
    #[error("No suitable GPU found")]
    NoSuitableDevice,

    /// Surface creation failed.
    #[error("Surface creation failed: {0}")]
    SurfaceCreation(String),

    /// Swapchain creation failed.
    #[error("Swapchain creation failed: {0}")]
    SwapchainCreation(String),

    /// Synchronization primitive creation failed.
    #[error("Sync object creation failed: {0}")]
    SyncCreation(String),

    /// A fence was not signaled within the timeout (GPU hang or device loss).
    #[error("Fence wait timed out after {0} ns")]
    FenceTimeout(u64),

    /// Swapchain image acquisition failed for a reason other than out-of-date.
    #[error("Image acquisition failed: {0}")]
    Acquire(vk::Result),

    /// Queue submission failed.
    #[error("Queue submission failed: {0}")]
    Submit(vk::Result),

    /// Presentation failed for a reason other than out-of-date.
    #[error("Presentation failed: {0}")]
    Present(vk::Result),

    /// Invalid state.
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// Other error.
    #[error("{0}")]
    Other(String),
}

/// Result type alias.
pub type Result<T> = std::result::Result<T, GpuError>;
