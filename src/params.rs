// Blur parameters as the user/app sets them, plus the dirty flag the buffer
// manager consumes when it re-applies the radius to the engine.

use crate::error::{Error, Result};

pub const DEFAULT_BLUR_RADIUS: f32 = 10.0;
pub const DEFAULT_DOWNSAMPLE_FACTOR: f32 = 4.0;
pub const DEFAULT_OVERLAY_COLOR: u32 = 0xAAFF_FFFF;

#[derive(Debug, Clone, PartialEq)]
pub struct ParameterStore {
    radius: f32,
    downsample: f32,
    overlay_color: u32,
    dirty: bool,
}

impl Default for ParameterStore {
    fn default() -> Self {
        Self {
            radius: DEFAULT_BLUR_RADIUS,
            downsample: DEFAULT_DOWNSAMPLE_FACTOR,
            overlay_color: DEFAULT_OVERLAY_COLOR,
            dirty: false,
        }
    }
}

impl ParameterStore {
    /// Store a new radius. No range check here; clamping happens when the
    /// radius is handed to the engine. Returns true if the value changed;
    /// NaN counts as equal to NaN.
    pub fn set_radius(&mut self, radius: f32) -> bool {
        if self.radius == radius || (self.radius.is_nan() && radius.is_nan()) {
            return false;
        }
        self.radius = radius;
        self.dirty = true;
        true
    }

    /// Store a new downsample factor. Non-positive (or NaN) factors are
    /// rejected and leave the store untouched. Returns true if the value changed.
    pub fn set_downsample_factor(&mut self, factor: f32) -> Result<bool> {
        if !(factor > 0.0) {
            return Err(Error::InvalidArgument(format!(
                "downsample factor must be greater than 0, got {factor}"
            )));
        }
        if self.downsample == factor {
            return Ok(false);
        }
        self.downsample = factor;
        // May also change the effective radius.
        self.dirty = true;
        Ok(true)
    }

    /// Tint drawn over the blurred backdrop (0xAARRGGBB).
    pub fn set_overlay_color(&mut self, color: u32) -> bool {
        let changed = self.overlay_color != color;
        self.overlay_color = color;
        changed
    }

    pub fn radius(&self) -> f32 {
        self.radius
    }

    pub fn downsample_factor(&self) -> f32 {
        self.downsample
    }

    pub fn overlay_color(&self) -> u32 {
        self.overlay_color
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub(crate) fn clear_dirty(&mut self) {
        self.dirty = false;
    }
}
