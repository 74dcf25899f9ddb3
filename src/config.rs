use crate::error::{Error, Result};
use crate::params::{DEFAULT_BLUR_RADIUS, DEFAULT_DOWNSAMPLE_FACTOR, DEFAULT_OVERLAY_COLOR};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Starting parameters for a blur region.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BlurConfig {
    pub blur_radius: f32,
    pub downsample_factor: f32,
    /// 0xAARRGGBB
    pub overlay_color: u32,
    /// Report a missing blur engine as an error instead of quietly falling
    /// back to tint-only. Defaults to on in debug builds.
    pub strict_engine_errors: bool,
}

impl Default for BlurConfig {
    fn default() -> Self {
        Self {
            blur_radius: DEFAULT_BLUR_RADIUS,
            downsample_factor: DEFAULT_DOWNSAMPLE_FACTOR,
            overlay_color: DEFAULT_OVERLAY_COLOR,
            strict_engine_errors: cfg!(debug_assertions),
        }
    }
}

impl BlurConfig {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| Error::Config(format!("{}: {e}", path.display())))?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content).map_err(|e| Error::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let content = toml::to_string_pretty(self).map_err(|e| Error::Config(e.to_string()))?;
        fs::write(path, content).map_err(|e| Error::Config(format!("{}: {e}", path.display())))
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.downsample_factor > 0.0) {
            return Err(Error::InvalidArgument(format!(
                "downsample factor must be greater than 0, got {}",
                self.downsample_factor
            )));
        }
        Ok(())
    }
}
