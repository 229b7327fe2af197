//! Physical device discovery and selection.

use std::ffi::CStr;
use std::fmt;

use ash::vk;

use crate::error::Result;

/// Lowest Vulkan version an adapter must report to be considered.
pub const MIN_API_VERSION: u32 = vk::API_VERSION_1_1;

/// A physical device and the properties used to choose between adapters.
#[derive(Debug, Clone)]
pub struct Adapter {
    pub physical_device: vk::PhysicalDevice,
    pub name: String,
    pub vendor_id: u32,
    pub device_type: vk::PhysicalDeviceType,
    pub api_version: u32,
    /// First queue family with graphics support.
    pub graphics_queue_family: Option<u32>,
    /// Whether `VK_KHR_swapchain` is available.
    pub has_swapchain: bool,
}

impl Adapter {
    /// Read the properties of `physical_device`.
    ///
    /// # Safety
    /// The instance and physical device must be valid.
    pub unsafe fn query(instance: &ash::Instance, physical_device: vk::PhysicalDevice) -> Result<Self> {
        let properties = unsafe { instance.get_physical_device_properties(physical_device) };
        let families =
            unsafe { instance.get_physical_device_queue_family_properties(physical_device) };
        let extensions =
            unsafe { instance.enumerate_device_extension_properties(physical_device)? };

        // SAFETY: device_name is a NUL-terminated string filled in by the driver
        let name = unsafe { CStr::from_ptr(properties.device_name.as_ptr()) }
            .to_string_lossy()
            .into_owned();

        let has_swapchain = extensions.iter().any(|ext| {
            // SAFETY: extension_name is a NUL-terminated string filled in by the driver
            let name = unsafe { CStr::from_ptr(ext.extension_name.as_ptr()) };
            name == ash::khr::swapchain::NAME
        });

        let graphics_queue_family = families
            .iter()
            .position(|family| family.queue_flags.contains(vk::QueueFlags::GRAPHICS))
            .and_then(|index| u32::try_from(index).ok());

        Ok(Self {
            physical_device,
            name,
            vendor_id: properties.vendor_id,
            device_type: properties.device_type,
            api_version: properties.api_version,
            graphics_queue_family,
            has_swapchain,
        })
    }

    /// Rank for automatic selection, `None` if the adapter cannot present.
    pub fn score(&self) -> Option<u32> {
        if self.api_version < MIN_API_VERSION
            || !self.has_swapchain
            || self.graphics_queue_family.is_none()
        {
            return None;
        }

        Some(match self.device_type {
            vk::PhysicalDeviceType::DISCRETE_GPU => 4,
            vk::PhysicalDeviceType::INTEGRATED_GPU => 3,
            vk::PhysicalDeviceType::VIRTUAL_GPU => 2,
            vk::PhysicalDeviceType::CPU => 1,
            _ => 0,
        })
    }

    pub fn vendor(&self) -> &'static str {
        match self.vendor_id {
            0x10DE => "NVIDIA",
            0x1002 => "AMD",
            0x8086 => "Intel",
            0x106B => "Apple",
            0x13B5 => "ARM",
            0x5143 => "Qualcomm",
            _ => "unknown vendor",
        }
    }
}

impl fmt::Display for Adapter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} ({}, {:?}) - Vulkan {}.{}.{}",
            self.name,
            self.vendor(),
            self.device_type,
            vk::api_version_major(self.api_version),
            vk::api_version_minor(self.api_version),
            vk::api_version_patch(self.api_version),
        )
    }
}

/// Query every physical device of `instance`.
///
/// # Safety
/// The instance must be valid.
pub unsafe fn enumerate_adapters(instance: &ash::Instance) -> Result<Vec<Adapter>> {
    let devices = unsafe { instance.enumerate_physical_devices()? };
    devices
        .into_iter()
        // SAFETY: the handles come straight from the instance
        .map(|device| unsafe { Adapter::query(instance, device) })
        .collect()
}

/// Pick the adapter to create the device on.
///
/// A usable `preferred` index wins; otherwise the highest ranked adapter,
/// the earliest one on ties.
pub fn pick_adapter(adapters: &[Adapter], preferred: Option<usize>) -> Option<&Adapter> {
    if let Some(adapter) = preferred.and_then(|index| adapters.get(index)) {
        if adapter.score().is_some() {
            return Some(adapter);
        }
        tracing::warn!("Requested adapter {} cannot present, picking another", adapter.name);
    }

    adapters
        .iter()
        .filter_map(|adapter| adapter.score().map(|score| (score, adapter)))
        .rev()
        .max_by_key(|(score, _)| *score)
        .map(|(_, adapter)| adapter)
}
