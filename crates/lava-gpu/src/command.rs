//! Command recording for frame slots.

use crate::error::{GpuError, Result};
use ash::vk;

/// A command pool with one primary command buffer per frame slot.
///
/// A slot's buffer may only be re-recorded once the frame that last used it
/// has completed, which is what waiting on the slot fence guarantees.
pub struct FrameCommands {
    pool: vk::CommandPool,
    buffers: Vec<vk::CommandBuffer>,
}

impl FrameCommands {
    /// Create the pool and `slots` buffers for `queue_family`.
    ///
    /// # Safety
    /// The device must be valid and the queue family must exist.
    pub unsafe fn new(device: &ash::Device, queue_family: u32, slots: u32) -> Result<Self> {
        let create_info = vk::CommandPoolCreateInfo::default()
            .queue_family_index(queue_family)
            .flags(vk::CommandPoolCreateFlags::RESET_COMMAND_BUFFER);
        let pool = unsafe { device.create_command_pool(&create_info, None)? };

        let alloc_info = vk::CommandBufferAllocateInfo::default()
            .command_pool(pool)
            .level(vk::CommandBufferLevel::PRIMARY)
            .command_buffer_count(slots);

        match unsafe { device.allocate_command_buffers(&alloc_info) } {
            Ok(buffers) => Ok(Self { pool, buffers }),
            Err(e) => {
                unsafe { device.destroy_command_pool(pool, None) };
                Err(e.into())
            }
        }
    }

    pub fn len(&self) -> usize {
        self.buffers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffers.is_empty()
    }

    /// Buffer owned by `slot`.
    pub fn buffer(&self, slot: usize) -> Option<vk::CommandBuffer> {
        self.buffers.get(slot).copied()
    }

    /// Reset the buffer of `slot` and begin recording a one-time submission.
    ///
    /// # Safety
    /// The device must be valid and the slot's previous submission must have
    /// completed.
    pub unsafe fn begin(&self, device: &ash::Device, slot: usize) -> Result<vk::CommandBuffer> {
        let cmd = self.buffer(slot).ok_or_else(|| {
            GpuError::InvalidState(format!("no command buffer for frame slot {slot}"))
        })?;

        let begin_info =
            vk::CommandBufferBeginInfo::default().flags(vk::CommandBufferUsageFlags::ONE_TIME_SUBMIT);
        unsafe {
            device.reset_command_buffer(cmd, vk::CommandBufferResetFlags::empty())?;
            device.begin_command_buffer(cmd, &begin_info)?;
        }
        Ok(cmd)
    }

    /// Finish recording `cmd`.
    ///
    /// # Safety
    /// `cmd` must come from [`Self::begin`] and still be recording.
    pub unsafe fn end(&self, device: &ash::Device, cmd: vk::CommandBuffer) -> Result<()> {
        unsafe { device.end_command_buffer(cmd)? };
        Ok(())
    }

    /// Free the buffers and the pool.
    ///
    /// # Safety
    /// The device must be valid and none of the buffers may be pending.
    pub unsafe fn destroy(&mut self, device: &ash::Device) {
        self.buffers.clear();
        unsafe { device.destroy_command_pool(self.pool, None) };
        self.pool = vk::CommandPool::null();
    }
}

/// Submit command buffers to a queue.
///
/// # Safety
/// All handles must be valid.
#[cfg_attr(feature = "profiling-tracy", tracing::instrument(level = "trace", skip_all))]
pub unsafe fn submit_command_buffers(
    device: &ash::Device,
    queue: vk::Queue,
    command_buffers: &[vk::CommandBuffer],
    wait_semaphores: &[vk::Semaphore],
    wait_stages: &[vk::PipelineStageFlags],
    signal_semaphores: &[vk::Semaphore],
    fence: vk::Fence,
) -> Result<()> {
    let submit_info = vk::SubmitInfo::default()
        .command_buffers(command_buffers)
        .wait_semaphores(wait_semaphores)
        .wait_dst_stage_mask(wait_stages)
        .signal_semaphores(signal_semaphores);

    unsafe { device.queue_submit(queue, &[submit_info], fence) }.map_err(GpuError::Submit)
}

/// Record a full-image color layout transition.
///
/// # Safety
/// The device, command buffer and image must be valid and the command
/// buffer must be recording.
#[allow(clippy::too_many_arguments)]
pub unsafe fn transition_color_image(
    device: &ash::Device,
    cmd: vk::CommandBuffer,
    image: vk::Image,
    old_layout: vk::ImageLayout,
    new_layout: vk::ImageLayout,
    src_access: vk::AccessFlags,
    dst_access: vk::AccessFlags,
    src_stage: vk::PipelineStageFlags,
    dst_stage: vk::PipelineStageFlags,
) {
    let barrier = vk::ImageMemoryBarrier::default()
        .old_layout(old_layout)
        .new_layout(new_layout)
        .src_access_mask(src_access)
        .dst_access_mask(dst_access)
        .src_queue_family_index(vk::QUEUE_FAMILY_IGNORED)
        .dst_queue_family_index(vk::QUEUE_FAMILY_IGNORED)
        .image(image)
        .subresource_range(color_subresource_range());

    unsafe {
        device.cmd_pipeline_barrier(
            cmd,
            src_stage,
            dst_stage,
            vk::DependencyFlags::empty(),
            &[],
            &[],
            &[barrier],
        );
    }
}

/// Subresource range covering the single mip and layer of a color image.
pub fn color_subresource_range() -> vk::ImageSubresourceRange {
    vk::ImageSubresourceRange::default()
        .aspect_mask(vk::ImageAspectFlags::COLOR)
        .base_mip_level(0)
        .level_count(1)
        .base_array_layer(0)
        .layer_count(1)
}
