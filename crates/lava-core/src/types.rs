//! Size and area types.

use crate::error::{Error, Result};
use glam::{IVec2, UVec2};

/// Pixel size of a surface or render target.
pub type Size = UVec2;

/// Returns true if either dimension is zero (e.g. a minimized window).
#[inline]
pub fn is_degenerate(size: Size) -> bool {
    size.x == 0 || size.y == 0
}

/// Rectangular region of a render target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Area {
    /// Top-left corner in pixels.
    pub offset: IVec2,
    /// Extent in pixels.
    pub size: Size,
}

impl Area {
    /// Create an area at the origin covering `size`.
    pub fn from_size(size: Size) -> Self {
        Self {
            offset: IVec2::ZERO,
            size,
        }
    }

    /// Width divided by height, or 0 for a degenerate area.
    pub fn aspect_ratio(&self) -> f32 {
        if is_degenerate(self.size) {
            return 0.0;
        }
        self.size.x as f32 / self.size.y as f32
    }
}

/// Parse a size written as `WIDTHxHEIGHT` (e.g. `1280x720`).
pub fn parse_size(text: &str) -> Result<Size> {
    let (w, h) = text
        .trim()
        .split_once(['x', 'X'])
        .ok_or_else(|| Error::InvalidSize(format!("expected WIDTHxHEIGHT, got {text:?}")))?;

    let width = w
        .trim()
        .parse::<u32>()
        .map_err(|e| Error::InvalidData(format!("width {w:?}: {e}")))?;
    let height = h
        .trim()
        .parse::<u32>()
        .map_err(|e| Error::InvalidData(format!("height {h:?}: {e}")))?;

    let size = Size::new(width, height);
    if is_degenerate(size) {
        return Err(Error::InvalidSize(format!("{width}x{height} has no area")));
    }
    Ok(size)
}
