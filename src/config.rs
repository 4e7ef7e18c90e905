//! QC thresholds shared by the variant and coverage components.

use thiserror::Error;

/// Numeric thresholds applied across a run.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct QcConfig {
    /// Minimum QUAL for a variant to be sent for annotation.
    pub min_variant_quality: f64,

    /// Minimum INFO/DP for a variant to be sent for annotation.
    pub min_variant_depth: u32,

    /// Minimum per-base depth for a panel region to pass.
    pub min_panel_depth: u32,

    /// Minimum mapped reads for a genotyping amplicon to pass.
    pub min_amplicon_depth: u32,
}

impl Default for QcConfig {
    fn default() -> Self {
        Self {
            min_variant_quality: 30.0,
            min_variant_depth: 1000,
            min_panel_depth: 160,
            min_amplicon_depth: 1000,
        }
    }
}

impl QcConfig {
    /// Override the variant QUAL threshold.
    pub fn with_min_variant_quality(mut self, quality: f64) -> Self {
        self.min_variant_quality = quality;
        self
    }

    /// Override the variant DP threshold.
    pub fn with_min_variant_depth(mut self, depth: u32) -> Self {
        self.min_variant_depth = depth;
        self
    }

    /// Override the per-base panel depth threshold.
    pub fn with_min_panel_depth(mut self, depth: u32) -> Self {
        self.min_panel_depth = depth;
        self
    }

    /// Override the amplicon read depth threshold.
    pub fn with_min_amplicon_depth(mut self, depth: u32) -> Self {
        self.min_amplicon_depth = depth;
        self
    }

    /// Reject thresholds no run could use.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.min_variant_quality.is_finite() || self.min_variant_quality < 0.0 {
            return Err(ConfigError::InvalidQuality(self.min_variant_quality));
        }
        Ok(())
    }
}

/// Invalid threshold configuration.
#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    /// Quality threshold is negative or not finite.
    #[error("variant quality threshold must be a finite, non-negative number, got {0}")]
    InvalidQuality(f64),
}
