use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result, ensure};
use serde::Deserialize;

use crate::processing::chroma_key::{DEFAULT_KEY_COLOR, DEFAULT_THRESHOLD};
use crate::schedule::QualityProfile;
use crate::surface::MAX_SURFACE_DIM;
use crate::transform::DEFAULT_MIN_SPAN;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct SurfaceConfig {
    pub width: u32,
    pub height: u32,
}

impl Default for SurfaceConfig {
    fn default() -> Self {
        Self {
            width: 640,
            height: 480,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct ChromaKeyConfig {
    /// Initial state of the live toggle.
    pub enabled: bool,
    pub key_color: [u8; 3],
    pub threshold: f64,
}

impl Default for ChromaKeyConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            key_color: DEFAULT_KEY_COLOR,
            threshold: DEFAULT_THRESHOLD,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct Configuration {
    pub quality: QualityProfile,
    pub surface: SurfaceConfig,
    pub chroma_key: ChromaKeyConfig,
    /// Cadence of the driving loop; frames are still gated by `quality`.
    #[serde(with = "humantime_serde")]
    pub driver_interval: Duration,
    /// Minimum on-screen width/height a resize commit may produce.
    pub min_span: f32,
}

impl Default for Configuration {
    fn default() -> Self {
        Self {
            quality: QualityProfile::default(),
            surface: SurfaceConfig::default(),
            chroma_key: ChromaKeyConfig::default(),
            driver_interval: Self::default_driver_interval(),
            min_span: DEFAULT_MIN_SPAN,
        }
    }
}

impl Configuration {
    const fn default_driver_interval() -> Duration {
        Duration::from_nanos(16_666_667)
    }

    pub fn from_yaml_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        let cfg: Self = serde_yaml::from_str(&raw)
            .with_context(|| format!("failed to parse {}", path.display()))?;
        Ok(cfg)
    }

    pub fn validated(self) -> Result<Self> {
        self.validate()?;
        Ok(self)
    }

    pub fn validate(&self) -> Result<()> {
        let SurfaceConfig { width, height } = self.surface;
        ensure!(
            (1..=MAX_SURFACE_DIM).contains(&width) && (1..=MAX_SURFACE_DIM).contains(&height),
            "surface size {}x{} must be within 1..={}",
            width,
            height,
            MAX_SURFACE_DIM
        );
        ensure!(
            self.chroma_key.threshold.is_finite() && self.chroma_key.threshold >= 0.0,
            "chroma-key.threshold must be a finite, non-negative number"
        );
        ensure!(
            !self.driver_interval.is_zero(),
            "driver-interval must be greater than zero"
        );
        ensure!(
            self.min_span.is_finite() && self.min_span > 0.0,
            "min-span must be a positive number"
        );
        Ok(())
    }
}
