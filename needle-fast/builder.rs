use needle_core::OrbConfig;
use crate::config::DetectorConfig;
use crate::detector::FastDetector;
use crate::error::FastResult;

/// Fluent builder for a validated `FastDetector`
#[derive(Debug, Clone)]
pub struct DetectorBuilder {
    config: OrbConfig,
    nms_distance: f32,
    subpixel_refinement: bool,
}

impl Default for DetectorBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl DetectorBuilder {
    /// Create a new builder with default settings
    pub fn new() -> Self {
        Self::from_config(DetectorConfig::new())
    }

    /// Set the FAST threshold (1-127) of a standalone detector. The
    /// needle pipeline takes its threshold from the per-call sensitivity.
    pub fn threshold(mut self, threshold: u8) -> Self {
        self.config.threshold = threshold;
        self
    }

    /// Set the patch size for orientation calculation
    pub fn patch_size(mut self, patch_size: usize) -> Self {
        self.config.patch_size = patch_size;
        self
    }

    /// Set the number of threads for parallel processing
    pub fn threads(mut self, n_threads: usize) -> Self {
        self.config.n_threads = n_threads;
        self
    }

    /// Set the maximum number of pyramid levels
    pub fn levels(mut self, n_levels: usize) -> Self {
        self.config.n_levels = n_levels;
        self
    }

    /// Cap the number of keypoints kept per image (0 = unlimited)
    pub fn max_keypoints(mut self, max_keypoints: usize) -> Self {
        self.config.max_keypoints = max_keypoints;
        self
    }

    /// Set the non-maximum suppression (NMS) distance
    pub fn nms_distance(mut self, distance: f32) -> Self {
        self.nms_distance = distance;
        self
    }

    /// Enable or disable subpixel refinement
    pub fn subpixel_refinement(mut self, enable: bool) -> Self {
        self.subpixel_refinement = enable;
        self
    }

    /// Apply the fast preset
    pub fn preset_fast(self) -> Self {
        Self::from_config(DetectorConfig::fast_preset())
    }

    /// Apply the balanced preset
    pub fn preset_balanced(self) -> Self {
        Self::from_config(DetectorConfig::balanced_preset())
    }

    /// Apply the precision preset
    pub fn preset_precision(self) -> Self {
        Self::from_config(DetectorConfig::precision_preset())
    }

    /// Build the `FastDetector`
    pub fn build(self) -> FastResult<FastDetector> {
        FastDetector::new(self.to_config())
    }

    /// Generate a summary of the builder's configuration
    pub fn summary(&self) -> String {
        self.clone().to_config().summary()
    }

    /// Create a builder from an existing `DetectorConfig`
    pub fn from_config(config: DetectorConfig) -> Self {
        Self {
            config: config.core,
            nms_distance: config.nms_distance,
            subpixel_refinement: config.subpixel_refinement,
        }
    }

    /// Convert the builder into a `DetectorConfig`
    pub fn to_config(self) -> DetectorConfig {
        DetectorConfig {
            core: self.config,
            nms_distance: self.nms_distance,
            subpixel_refinement: self.subpixel_refinement,
            name: None,
            description: None,
            version: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FastError;

    #[test]
    fn test_builder_round_trip() {
        let cfg = DetectorBuilder::new()
            .threshold(33)
            .patch_size(21)
            .threads(2)
            .levels(5)
            .max_keypoints(64)
            .nms_distance(4.0)
            .subpixel_refinement(false)
            .to_config();
        assert_eq!(cfg.core.threshold, 33);
        assert_eq!(cfg.core.patch_size, 21);
        assert_eq!(cfg.core.n_threads, 2);
        assert_eq!(cfg.core.n_levels, 5);
        assert_eq!(cfg.core.max_keypoints, 64);
        assert_eq!(cfg.nms_distance, 4.0);
        assert!(!cfg.subpixel_refinement);
    }

    #[test]
    fn test_build_validates() {
        assert!(DetectorBuilder::new().preset_precision().build().is_ok());
        let err = DetectorBuilder::new().patch_size(8).build().unwrap_err();
        assert_eq!(err, FastError::InvalidPatchSize(8));
    }

    #[test]
    fn test_preset_then_override() {
        let detector = DetectorBuilder::new().preset_fast().threshold(45).build().unwrap();
        assert_eq!(detector.config().core.threshold, 45);
        assert_eq!(detector.config().core.n_levels, 4);
    }
}
