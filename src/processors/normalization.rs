//! Pixel normalization applied to integer-typed images before batching.
//!
//! The policy is applied per image, on interleaved HWC data, in a fixed
//! order: rescale first, then mean subtraction.

use serde::{Deserialize, Serialize};

use crate::core::batch::IMAGE_CHANNELS;
use crate::core::config::ConfigError;

/// Divisor mapping [0, 255] onto [0, 2] before the shift to [-1, 1].
const RESCALE_DIVISOR: f32 = 127.5;

/// How a mean value is removed from an image.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(tag = "mode", content = "means", rename_all = "snake_case")]
pub enum MeanSubtraction {
    /// Leave values as they are.
    #[default]
    None,
    /// Subtract a fixed value per channel. A single value applies to every channel.
    PerChannel(Vec<f32>),
    /// Subtract the image's own scalar mean over all of its values.
    PerImage,
}

/// Normalization settings for raw `uint8` images.
///
/// Images stored as `float32` are taken as already normalized and never pass
/// through this policy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct NormalizationPolicy {
    /// Rescale pixel values from [0, 255] to [-1, 1].
    #[serde(default)]
    pub normalize: bool,
    /// Mean subtraction applied after rescaling.
    #[serde(default)]
    pub subtract_mean: MeanSubtraction,
}

impl NormalizationPolicy {
    /// Creates a policy from its two settings.
    pub fn new(normalize: bool, subtract_mean: MeanSubtraction) -> Self {
        Self {
            normalize,
            subtract_mean,
        }
    }

    /// Builds the policy from the boolean flags and optional mean vector used
    /// by the environment configuration.
    ///
    /// An empty mean vector with `subtract_mean` set falls back to per-image means.
    pub fn from_flags(normalize: bool, subtract_mean: bool, channel_means: Vec<f32>) -> Self {
        let subtract_mean = match (subtract_mean, channel_means.is_empty()) {
            (false, _) => MeanSubtraction::None,
            (true, true) => MeanSubtraction::PerImage,
            (true, false) => MeanSubtraction::PerChannel(channel_means),
        };
        Self::new(normalize, subtract_mean)
    }

    /// Returns true when applying the policy leaves values unchanged.
    pub fn is_identity(&self) -> bool {
        !self.normalize && self.subtract_mean == MeanSubtraction::None
    }

    /// Checks that a fixed mean vector broadcasts over RGB and is finite.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if let MeanSubtraction::PerChannel(means) = &self.subtract_mean {
            if means.len() != 1 && means.len() != IMAGE_CHANNELS {
                return Err(ConfigError::InvalidConfig {
                    message: format!(
                        "per-channel means must hold 1 or {} values, got {}",
                        IMAGE_CHANNELS,
                        means.len()
                    ),
                });
            }
            for (i, &m) in means.iter().enumerate() {
                if !m.is_finite() {
                    return Err(ConfigError::InvalidConfig {
                        message: format!("channel mean at index {i} is not finite: {m}"),
                    });
                }
            }
        }
        Ok(())
    }

    /// Applies the policy in place to one image in interleaved HWC order.
    pub fn apply(&self, pixels: &mut [f32]) {
        if self.normalize {
            for v in pixels.iter_mut() {
                *v = *v / RESCALE_DIVISOR - 1.0;
            }
        }

        match &self.subtract_mean {
            MeanSubtraction::None => {}
            MeanSubtraction::PerChannel(means) if means.len() == 1 => {
                let m = means[0];
                pixels.iter_mut().for_each(|v| *v -= m);
            }
            MeanSubtraction::PerChannel(means) => {
                for pixel in pixels.chunks_exact_mut(IMAGE_CHANNELS) {
                    for (v, m) in pixel.iter_mut().zip(means) {
                        *v -= m;
                    }
                }
            }
            MeanSubtraction::PerImage => {
                if pixels.is_empty() {
                    return;
                }
                let sum: f64 = pixels.iter().map(|&v| v as f64).sum();
                let mean = (sum / pixels.len() as f64) as f32;
                pixels.iter_mut().for_each(|v| *v -= mean);
            }
        }
    }
}
