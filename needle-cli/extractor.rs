use log::{debug, warn};
use needle_brief::BriefGenerator;
use needle_core::{FeatureExtractor, Features, Image};
use needle_fast::{DetectorConfig, FastDetector, FastError, FastResult};
use rayon::prelude::*;

/// Lowest and highest FAST thresholds a sensitivity can map to
pub const MIN_THRESHOLD: u8 = 1;
pub const MAX_THRESHOLD: u8 = 127;

/// Multi-scale FAST keypoints described with rotated BRIEF
#[derive(Debug, Clone)]
pub struct OrbExtractor {
    detector: FastDetector,
    brief: BriefGenerator,
}

impl OrbExtractor {
    pub fn new(cfg: DetectorConfig) -> FastResult<Self> {
        Ok(Self {
            detector: FastDetector::new(cfg)?,
            brief: BriefGenerator::new(),
        })
    }

    /// FAST intensity threshold for a sensitivity: rounded, then clamped to
    /// `MIN_THRESHOLD..=MAX_THRESHOLD`
    pub fn threshold_for(sensitivity: f64) -> u8 {
        // max() also maps NaN to the lower bound
        sensitivity.round().max(MIN_THRESHOLD as f64).min(MAX_THRESHOLD as f64) as u8
    }

    pub fn config(&self) -> &DetectorConfig {
        self.detector.config()
    }
}

impl FeatureExtractor for OrbExtractor {
    type Error = FastError;

    fn normalize_sensitivity(&self, sensitivity: f64) -> f64 {
        let threshold = Self::threshold_for(sensitivity);
        if sensitivity.round() > MAX_THRESHOLD as f64 {
            warn!("sensitivity {} exceeds the FAST range, clamped to {}", sensitivity, MAX_THRESHOLD);
        }
        threshold as f64
    }

    fn extract(&self, img: &Image, sensitivity: f64) -> Result<Features, FastError> {
        let detector = self.detector.with_threshold(Self::threshold_for(sensitivity))?;
        let pyramid = detector.build_pyramid(img)?;
        let keypoints = detector.detect_in_pyramid(&pyramid);
        if keypoints.is_empty() {
            return Ok(Features::empty());
        }

        let smoothed: Vec<Image> = pyramid
            .par_iter()
            .map(|level| BriefGenerator::smooth(&level.image))
            .collect();
        let descriptors = self.brief.generate_descriptors_multiscale(&smoothed, &keypoints);

        debug!(
            "extracted {} features from {}x{} image over {} levels",
            descriptors.len(),
            img.width(),
            img.height(),
            pyramid.len()
        );
        Ok(Features::new(keypoints, descriptors))
    }
}
