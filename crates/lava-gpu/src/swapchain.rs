//! Swapchain format, present mode and extent selection.

use ash::vk;
use lava_core::Size;

/// Format used when the surface reports no preference.
const FALLBACK_FORMAT: vk::SurfaceFormatKHR = vk::SurfaceFormatKHR {
    format: vk::Format::B8G8R8A8_UNORM,
    color_space: vk::ColorSpaceKHR::SRGB_NONLINEAR,
};

/// Select the best surface format.
///
/// Returns `None` if the surface offers no formats at all. A requested
/// format wins whenever the surface offers it with the sRGB color space.
pub fn select_surface_format(
    available: &[vk::SurfaceFormatKHR],
    preferred: Option<vk::Format>,
) -> Option<vk::SurfaceFormatKHR> {
    // A single UNDEFINED entry means the surface takes anything
    if let [only] = available {
        if only.format == vk::Format::UNDEFINED {
            return Some(preferred.map_or(FALLBACK_FORMAT, |format| vk::SurfaceFormatKHR {
                format,
                color_space: vk::ColorSpaceKHR::SRGB_NONLINEAR,
            }));
        }
    }

    let find = |format: vk::Format| {
        available
            .iter()
            .find(|f| f.format == format && f.color_space == vk::ColorSpaceKHR::SRGB_NONLINEAR)
            .copied()
    };

    preferred
        .and_then(find)
        .or_else(|| find(vk::Format::B8G8R8A8_UNORM))
        .or_else(|| find(vk::Format::B8G8R8A8_SRGB))
        .or_else(|| available.first().copied())
}

/// Select the best present mode.
pub fn select_present_mode(available: &[vk::PresentModeKHR], vsync: bool) -> vk::PresentModeKHR {
    if vsync {
        return vk::PresentModeKHR::FIFO;
    }

    // Prefer mailbox (triple buffering without tearing), then immediate
    [vk::PresentModeKHR::MAILBOX, vk::PresentModeKHR::IMMEDIATE]
        .into_iter()
        .find(|mode| available.contains(mode))
        .unwrap_or(vk::PresentModeKHR::FIFO)
}

/// Number of backbuffers to request: one above the minimum, clamped to the
/// maximum when the surface reports one.
pub fn backbuffer_count(capabilities: &vk::SurfaceCapabilitiesKHR) -> u32 {
    let count = capabilities.min_image_count.max(1) + 1;
    if capabilities.max_image_count > 0 {
        count.min(capabilities.max_image_count)
    } else {
        count
    }
}

/// Select how the presentation engine blends with other surfaces, preferring
/// opaque.
pub fn select_composite_alpha(
    supported: vk::CompositeAlphaFlagsKHR,
) -> vk::CompositeAlphaFlagsKHR {
    [
        vk::CompositeAlphaFlagsKHR::OPAQUE,
        vk::CompositeAlphaFlagsKHR::INHERIT,
        vk::CompositeAlphaFlagsKHR::PRE_MULTIPLIED,
        vk::CompositeAlphaFlagsKHR::POST_MULTIPLIED,
    ]
    .into_iter()
    .find(|flag| supported.contains(*flag))
    .unwrap_or(vk::CompositeAlphaFlagsKHR::OPAQUE)
}

/// Image usage for backbuffers: always a color attachment, plus transfer
/// destination when the surface allows clearing and blitting into it.
pub fn backbuffer_usage(supported: vk::ImageUsageFlags) -> vk::ImageUsageFlags {
    let mut usage = vk::ImageUsageFlags::COLOR_ATTACHMENT;
    if supported.contains(vk::ImageUsageFlags::TRANSFER_DST) {
        usage |= vk::ImageUsageFlags::TRANSFER_DST;
    }
    usage
}

/// Calculate the swapchain extent for a requested size.
///
/// The surface's current extent wins when it is defined; otherwise the
/// request is clamped to the supported range. A zero dimension in the
/// result means the surface is minimized.
pub fn calculate_extent(capabilities: &vk::SurfaceCapabilitiesKHR, size: Size) -> vk::Extent2D {
    if capabilities.current_extent.width != u32::MAX {
        capabilities.current_extent
    } else {
        vk::Extent2D {
            width: size.x.clamp(
                capabilities.min_image_extent.width,
                capabilities.max_image_extent.width,
            ),
            height: size.y.clamp(
                capabilities.min_image_extent.height,
                capabilities.max_image_extent.height,
            ),
        }
    }
}

/// Convert a Vulkan extent to a size.
#[inline]
pub fn extent_to_size(extent: vk::Extent2D) -> Size {
    Size::new(extent.width, extent.height)
}
