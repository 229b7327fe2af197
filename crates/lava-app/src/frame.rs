//! Per-frame context for rendering.

use ash::vk;
use lava_core::Size;

/// Context for the frame being recorded.
pub struct FrameContext {
    /// Command buffer in the recording state.
    pub command_buffer: vk::CommandBuffer,
    /// Index of the acquired backbuffer.
    pub image_index: u32,
    /// The acquired backbuffer.
    pub backbuffer: vk::Image,
    /// Backbuffer size.
    pub size: Size,
    /// Backbuffer format.
    pub format: vk::Format,
    /// Clear color of the render target.
    pub clear_color: [f32; 4],
    /// Scaled time step in seconds.
    pub dt: f32,
    /// Frames rendered before this one.
    pub frame_number: u64,
    /// Frame slot the command buffer belongs to.
    pub frame_slot: usize,
}
