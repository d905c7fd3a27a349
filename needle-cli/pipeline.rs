use std::path::Path;

use image::ImageReader;
use log::{debug, info, warn};
use needle_core::{build_thread_pool, DetectParams, FeatureExtractor, Image, Keypoint, DEFAULT_THRESHOLD};
use needle_fast::DetectorConfig;
use needle_match::{
    is_found, knn_match, localize, ratio_test, DMatch, Localization, RatioTest, DEFAULT_K, MIN_CORRESPONDENCES,
};
use serde::{Deserialize, Serialize};

use crate::error::{DetectError, DetectResult};
use crate::extractor::OrbExtractor;

/// Everything a `NeedleDetector` needs besides the per-call parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub detector: DetectorConfig,
    pub ratio: RatioTest,
    /// Fit a homography to the accepted matches for diagnostics
    pub localize: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            detector: DetectorConfig::new(),
            ratio: RatioTest::default(),
            localize: true,
        }
    }
}

/// Load a detector configuration, format chosen by file extension
pub fn load_detector_config(path: &Path) -> DetectResult<DetectorConfig> {
    let loaded = match path.extension().and_then(|e| e.to_str()) {
        Some("json") => DetectorConfig::load_json(path),
        Some("toml") => DetectorConfig::load_toml(path),
        _ => {
            return Err(DetectError::Config(format!(
                "{}: expected a .json or .toml file",
                path.display()
            )))
        }
    };
    loaded.map_err(|e| DetectError::Config(format!("{}: {}", path.display(), e)))
}

/// Decode an image file and convert it to 8-bit grayscale
pub fn load_image(path: &Path) -> DetectResult<Image> {
    let decoded = ImageReader::open(path)
        .map_err(|e| DetectError::InvalidInput(format!("cannot open {}: {}", path.display(), e)))?
        .decode()
        .map_err(|e| DetectError::InvalidInput(format!("cannot decode {}: {}", path.display(), e)))?;
    let luma = decoded.to_luma8();
    let (width, height) = luma.dimensions();
    Image::new(width as usize, height as usize, luma.into_raw())
        .map_err(|e| DetectError::InvalidInput(format!("{}: {}", path.display(), e)))
}

/// Outcome of one needle/haystack comparison
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Detection {
    pub found: bool,
    pub accepted_matches: usize,
    pub point_threshold: f64,
    pub needle_keypoints: Vec<Keypoint>,
    pub haystack_keypoints: Vec<Keypoint>,
    /// Accepted matches in needle keypoint order
    pub matches: Vec<DMatch>,
    pub localization: Option<Localization>,
}

/// Compact, serialisable summary of a `Detection`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Report {
    pub found: bool,
    pub accepted_matches: usize,
    pub point_threshold: f64,
    pub needle_keypoints: usize,
    pub haystack_keypoints: usize,
    pub corners: Option<[(f64, f64); 4]>,
}

impl Detection {
    pub fn report(&self) -> Report {
        Report {
            found: self.found,
            accepted_matches: self.accepted_matches,
            point_threshold: self.point_threshold,
            needle_keypoints: self.needle_keypoints.len(),
            haystack_keypoints: self.haystack_keypoints.len(),
            corners: self.localization.map(|l| l.corners),
        }
    }
}

/// Needle-in-haystack detector running on its own thread pool
pub struct NeedleDetector<E = OrbExtractor> {
    extractor: E,
    ratio: RatioTest,
    localize: bool,
    pool: rayon::ThreadPool,
}

impl NeedleDetector<OrbExtractor> {
    /// The FAST threshold comes from each call's sensitivity, so a config
    /// that sets `detector.core.threshold` is rejected rather than ignored.
    pub fn new(config: PipelineConfig) -> DetectResult<Self> {
        if config.detector.core.threshold != DEFAULT_THRESHOLD {
            return Err(DetectError::Config(format!(
                "detector threshold {} is not used by the pipeline; pass it as the sensitivity instead",
                config.detector.core.threshold
            )));
        }
        let n_threads = config.detector.core.n_threads;
        let extractor = OrbExtractor::new(config.detector).map_err(|e| DetectError::Config(e.to_string()))?;
        Self::with_extractor(extractor, config.ratio, config.localize, n_threads)
    }
}

impl<E: FeatureExtractor + Sync> NeedleDetector<E> {
    /// Detector around any feature extractor
    pub fn with_extractor(extractor: E, ratio: RatioTest, localize: bool, n_threads: usize) -> DetectResult<Self> {
        ratio.validate()?;
        Ok(Self {
            extractor,
            ratio,
            localize,
            pool: build_thread_pool(n_threads)?,
        })
    }

    pub fn extractor(&self) -> &E {
        &self.extractor
    }

    pub fn ratio(&self) -> &RatioTest {
        &self.ratio
    }

    fn validate(needle: &Image, haystack: &Image, params: &DetectParams) -> DetectResult<()> {
        for (name, img) in [("needle", needle), ("haystack", haystack)] {
            if img.is_empty() {
                return Err(DetectError::InvalidInput(format!(
                    "{} image is empty ({}x{})",
                    name,
                    img.width(),
                    img.height()
                )));
            }
        }
        if !params.sensitivity.is_finite() || params.sensitivity <= 0.0 {
            return Err(DetectError::InvalidInput(format!(
                "sensitivity must be positive and finite, got {}",
                params.sensitivity
            )));
        }
        if !params.point_threshold.is_finite() {
            return Err(DetectError::InvalidInput(format!(
                "point threshold must be finite, got {}",
                params.point_threshold
            )));
        }
        Ok(())
    }

    /// Decide whether `needle` appears in `haystack`
    pub fn detect(&self, needle: &Image, haystack: &Image, params: &DetectParams) -> DetectResult<Detection> {
        Self::validate(needle, haystack, params)?;
        let params = DetectParams {
            sensitivity: self.extractor.normalize_sensitivity(params.sensitivity),
            ..*params
        };
        self.pool.install(|| self.run(needle, haystack, &params))
    }

    /// Load both images from disk, then `detect`
    pub fn detect_paths(
        &self,
        needle_path: impl AsRef<Path>,
        haystack_path: impl AsRef<Path>,
        params: &DetectParams,
    ) -> DetectResult<Detection> {
        let needle = load_image(needle_path.as_ref())?;
        let haystack = load_image(haystack_path.as_ref())?;
        self.detect(&needle, &haystack, params)
    }

    fn run(&self, needle: &Image, haystack: &Image, params: &DetectParams) -> DetectResult<Detection> {
        let needle_features = self
            .extractor
            .extract(needle, params.sensitivity)
            .map_err(|e| DetectError::Extraction { image: "needle", source: Box::new(e) })?;
        let haystack_features = self
            .extractor
            .extract(haystack, params.sensitivity)
            .map_err(|e| DetectError::Extraction { image: "haystack", source: Box::new(e) })?;
        debug!(
            "features: needle {}, haystack {}",
            needle_features.len(),
            haystack_features.len()
        );

        let knn = knn_match(&needle_features.descriptors, &haystack_features.descriptors, DEFAULT_K);
        let matches = ratio_test(&knn, &self.ratio, haystack_features.len());
        let found = is_found(matches.len(), params.point_threshold);

        let localization = if self.localize {
            let result = localize(
                &matches,
                &needle_features.keypoints,
                &haystack_features.keypoints,
                needle.dimensions(),
            );
            if result.is_none() && matches.len() >= MIN_CORRESPONDENCES {
                warn!("could not localise the needle from {} matches", matches.len());
            }
            result
        } else {
            None
        };

        info!(
            "needle {}: {} accepted matches, threshold {} (min_distance {} not consulted)",
            if found { "found" } else { "not found" },
            matches.len(),
            params.point_threshold,
            params.min_distance
        );

        Ok(Detection {
            found,
            accepted_matches: matches.len(),
            point_threshold: params.point_threshold,
            needle_keypoints: needle_features.keypoints,
            haystack_keypoints: haystack_features.keypoints,
            matches,
            localization,
        })
    }
}

/// Whether the needle image appears in the haystack image, using the
/// default pipeline
pub fn detect_object(
    needle_path: impl AsRef<Path>,
    haystack_path: impl AsRef<Path>,
    sensitivity: f64,
    min_distance: f64,
    point_threshold: f64,
) -> DetectResult<bool> {
    let detector = NeedleDetector::new(PipelineConfig::default())?;
    let params = DetectParams::new(sensitivity, min_distance, point_threshold);
    Ok(detector.detect_paths(needle_path, haystack_path, &params)?.found)
}
