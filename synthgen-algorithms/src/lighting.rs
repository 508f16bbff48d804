//! Light intensity randomization

use crate::sampling::Distribution;
use rand::Rng;
use rand_distr::{Distribution as _, Normal};
use serde::{Deserialize, Serialize};
use synthgen_core::{Error, Light, Result};

/// Per-frame intensity randomization for dynamic lights
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IntensityRandomization {
    /// `Uniform` draws within the light's intensity range, `Normal` around its initial intensity
    pub distribution: Distribution,
    /// Standard deviation of normal draws
    pub sigma: f32,
}

impl Default for IntensityRandomization {
    fn default() -> Self {
        Self {
            distribution: Distribution::Uniform,
            sigma: 10.0,
        }
    }
}

impl IntensityRandomization {
    /// Check the settings before a run starts
    pub fn validate(&self) -> Result<()> {
        if !(self.sigma.is_finite() && self.sigma >= 0.0) {
            return Err(Error::Configuration(format!(
                "intensity sigma must be non-negative, got {}",
                self.sigma
            )));
        }
        Ok(())
    }
}

/// Draw a new intensity for `light`.
///
/// `initial` is the light's intensity before the run. Lights without an
/// intensity range are left at `initial`. Normal draws are clamped at zero.
pub fn randomize_intensity<R: Rng + ?Sized>(
    light: &Light,
    initial: f32,
    settings: &IntensityRandomization,
    rng: &mut R,
) -> Result<f32> {
    let Some([lo, hi]) = light.intensity_range else {
        return Ok(initial);
    };

    match settings.distribution {
        Distribution::Uniform => {
            if !(lo.is_finite() && hi.is_finite()) || lo > hi {
                return Err(Error::Configuration(format!(
                    "light '{}' has invalid intensity range [{}, {}]",
                    light.name, lo, hi
                )));
            }
            Ok(rng.gen_range(lo..=hi))
        }
        Distribution::Normal => {
            let normal = Normal::new(initial, settings.sigma)
                .map_err(|e| Error::Configuration(format!("intensity distribution: {}", e)))?;
            Ok(normal.sample(rng).max(0.0))
        }
    }
}
