//! GPU context management.

use crate::adapter::{enumerate_adapters, pick_adapter, Adapter};
use crate::error::{GpuError, Result};
use crate::instance::create_instance;
use ash::vk;
use raw_window_handle::RawDisplayHandle;

/// Vulkan instance, device and graphics queue.
///
/// The graphics queue is also used for presentation. Submissions to it are
/// not synchronized internally; only one thread may submit at a time.
pub struct GpuContext {
    entry: ash::Entry,
    instance: ash::Instance,
    adapter: Adapter,
    device: ash::Device,
    graphics_queue_family: u32,
    graphics_queue: vk::Queue,
}

impl GpuContext {
    pub fn entry(&self) -> &ash::Entry {
        &self.entry
    }

    pub fn instance(&self) -> &ash::Instance {
        &self.instance
    }

    pub fn device(&self) -> &ash::Device {
        &self.device
    }

    /// The adapter the device was created on.
    pub fn adapter(&self) -> &Adapter {
        &self.adapter
    }

    pub fn physical_device(&self) -> vk::PhysicalDevice {
        self.adapter.physical_device
    }

    /// Queue used for both rendering and presentation.
    pub fn graphics_queue(&self) -> vk::Queue {
        self.graphics_queue
    }

    pub fn graphics_queue_family(&self) -> u32 {
        self.graphics_queue_family
    }

    /// Wait for device to be idle.
    #[cfg_attr(
        feature = "profiling-tracy",
        tracing::instrument(level = "trace", skip_all)
    )]
    pub fn wait_idle(&self) -> Result<()> {
        // SAFETY: the device lives as long as the context
        unsafe { self.device.device_wait_idle()? };
        Ok(())
    }
}

impl Drop for GpuContext {
    fn drop(&mut self) {
        // SAFETY: every object created from the device is owned by something
        // that holds an Arc to this context and is therefore gone already
        unsafe {
            let _ = self.device.device_wait_idle();
            self.device.destroy_device(None);
            self.instance.destroy_instance(None);
        }
    }
}

/// Builder for creating a GPU context.
pub struct GpuContextBuilder {
    app_name: String,
    enable_validation: bool,
    adapter_index: Option<usize>,
    display: Option<RawDisplayHandle>,
}

impl Default for GpuContextBuilder {
    fn default() -> Self {
        Self {
            app_name: "lava".to_string(),
            enable_validation: cfg!(debug_assertions),
            adapter_index: None,
            display: None,
        }
    }
}

impl GpuContextBuilder {
    /// Create a new builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the application name.
    pub fn app_name(mut self, name: impl Into<String>) -> Self {
        self.app_name = name.into();
        self
    }

    /// Enable or disable validation layers.
    pub fn validation(mut self, enable: bool) -> Self {
        self.enable_validation = enable;
        self
    }

    /// Prefer the adapter at `index` in enumeration order. Ignored when that
    /// adapter cannot present.
    pub fn adapter(mut self, index: Option<usize>) -> Self {
        self.adapter_index = index;
        self
    }

    /// Enable the surface extensions for windows on `display`. Without it
    /// the context can only render offscreen.
    pub fn display(mut self, display: RawDisplayHandle) -> Self {
        self.display = Some(display);
        self
    }

    /// Build the GPU context.
    pub fn build(self) -> Result<GpuContext> {
        // SAFETY: loading the system Vulkan library has no preconditions
        let entry = unsafe { ash::Entry::load() }
            .map_err(|e| GpuError::Other(format!("Failed to load Vulkan: {e}")))?;

        // SAFETY: entry was just loaded
        let instance = unsafe {
            create_instance(
                &entry,
                &self.app_name,
                self.display,
                self.enable_validation,
            )
        }?;

        // SAFETY: instance is valid; it is destroyed again on every error path
        match unsafe { self.open_device(&instance) } {
            Ok((adapter, device, graphics_queue_family)) => {
                tracing::info!("Selected GPU: {adapter}");
                // SAFETY: the device was created with one queue in this family
                let graphics_queue = unsafe { device.get_device_queue(graphics_queue_family, 0) };
                Ok(GpuContext {
                    entry,
                    instance,
                    adapter,
                    device,
                    graphics_queue_family,
                    graphics_queue,
                })
            }
            Err(e) => {
                // SAFETY: nothing else was created from the instance
                unsafe { instance.destroy_instance(None) };
                Err(e)
            }
        }
    }

    unsafe fn open_device(&self, instance: &ash::Instance) -> Result<(Adapter, ash::Device, u32)> {
        let adapters = unsafe { enumerate_adapters(instance)? };
        for (index, adapter) in adapters.iter().enumerate() {
            tracing::debug!("Adapter {index}: {adapter}");
        }

        let adapter = pick_adapter(&adapters, self.adapter_index)
            .cloned()
            .ok_or(GpuError::NoSuitableDevice)?;
        let family = adapter
            .graphics_queue_family
            .ok_or(GpuError::NoSuitableDevice)?;

        let device = unsafe { create_device(instance, adapter.physical_device, family)? };
        Ok((adapter, device, family))
    }
}

/// Create the logical device with a single graphics queue and the swapchain
/// extension.
///
/// # Safety
/// The instance and physical device must be valid.
unsafe fn create_device(
    instance: &ash::Instance,
    physical_device: vk::PhysicalDevice,
    graphics_queue_family: u32,
) -> Result<ash::Device> {
    let queue_priority = 1.0_f32;
    let queue_create_infos = [vk::DeviceQueueCreateInfo::default()
        .queue_family_index(graphics_queue_family)
        .queue_priorities(std::slice::from_ref(&queue_priority))];

    let extension_names = [ash::khr::swapchain::NAME.as_ptr()];

    let device_create_info = vk::DeviceCreateInfo::default()
        .queue_create_infos(&queue_create_infos)
        .enabled_extension_names(&extension_names);

    let device = unsafe { instance.create_device(physical_device, &device_create_info, None)? };
    Ok(device)
}
