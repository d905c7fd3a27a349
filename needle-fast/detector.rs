use log::debug;
use needle_core::{Image, Keypoint};
use crate::config::DetectorConfig;
use crate::corner_detection::CornerDetector;
use crate::error::{FastError, FastResult};
use crate::pyramid::ImagePyramid;
use crate::refinement::KeypointRefinement;
use crate::types::{PyramidLevel, ScoredKeypoint};
use rayon::prelude::*;

/// Main FAST corner detector with multi-scale capability
#[derive(Debug, Clone)]
pub struct FastDetector {
    cfg: DetectorConfig,
}

impl FastDetector {
    /// Creates a new FAST detector with validation
    pub fn new(cfg: DetectorConfig) -> FastResult<Self> {
        cfg.validate()?;
        Ok(Self { cfg })
    }

    /// Same configuration with a different FAST threshold
    pub fn with_threshold(&self, threshold: u8) -> FastResult<Self> {
        let mut cfg = self.cfg.clone();
        cfg.core.threshold = threshold;
        Self::new(cfg)
    }

    /// Validates image data before processing
    fn validate_image(img: &Image) -> FastResult<()> {
        let (width, height) = img.dimensions();
        if width == 0 || height == 0 {
            return Err(FastError::InvalidImageSize { width, height });
        }
        Ok(())
    }

    /// Build the scale pyramid this detector searches
    pub fn build_pyramid(&self, img: &Image) -> FastResult<Vec<PyramidLevel>> {
        Self::validate_image(img)?;
        let (width, height) = img.dimensions();
        let scale_levels = ImagePyramid::generate_scale_levels(width, height, self.cfg.core.n_levels);
        ImagePyramid::build(img, &scale_levels)
    }

    /// Detect keypoints with multi-scale detection
    pub fn detect_keypoints(&self, img: &Image) -> FastResult<Vec<Keypoint>> {
        let pyramid = self.build_pyramid(img)?;
        Ok(self.detect_in_pyramid(&pyramid))
    }

    /// Detect keypoints on an already built pyramid.
    ///
    /// Output is ordered strongest first; equal responses keep level order,
    /// then raster order, so repeated calls return identical sequences.
    pub fn detect_in_pyramid(&self, pyramid: &[PyramidLevel]) -> Vec<Keypoint> {
        let per_level: Vec<Vec<Keypoint>> = pyramid
            .par_iter()
            .map(|level| self.detect_at_level(level))
            .collect();

        let mut keypoints: Vec<Keypoint> = per_level.into_iter().flatten().collect();
        keypoints.sort_by(|a, b| b.response.total_cmp(&a.response));

        let max_keypoints = self.cfg.core.max_keypoints;
        if max_keypoints > 0 && keypoints.len() > max_keypoints {
            keypoints.truncate(max_keypoints);
        }

        debug!(
            "FAST: {} keypoints over {} levels (threshold {})",
            keypoints.len(),
            pyramid.len(),
            self.cfg.core.threshold
        );
        keypoints
    }

    /// Raw FAST corners of one level, level coordinates, before suppression
    pub fn detect_keypoints_with_response(&self, level: &PyramidLevel) -> Vec<ScoredKeypoint> {
        CornerDetector::detect(&level.image, self.cfg.core.threshold)
    }

    /// Suppress, refine and orient the corners of one level, then map them
    /// to base image coordinates
    fn detect_at_level(&self, level: &PyramidLevel) -> Vec<Keypoint> {
        let scored = self.detect_keypoints_with_response(level);
        let suppressed = KeypointRefinement::non_maximum_suppression(&scored, self.cfg.nms_distance);
        let scale_level = level.scale_level;

        suppressed
            .into_iter()
            .map(|sk| {
                let mut kp = sk.keypoint;
                if self.cfg.subpixel_refinement {
                    kp = KeypointRefinement::refine_keypoint_subpixel(&level.image, kp);
                }
                let angle = KeypointRefinement::compute_orientation(&level.image, kp.x, kp.y, self.cfg.core.patch_size);
                let (x, y) = scale_level.to_base(kp.x, kp.y);
                Keypoint {
                    x,
                    y,
                    angle,
                    octave: scale_level.level,
                    scale: scale_level.scale,
                    response: sk.response,
                }
            })
            .collect()
    }

    /// Get detector configuration
    pub fn config(&self) -> &DetectorConfig {
        &self.cfg
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_test_config() -> DetectorConfig {
        let mut cfg = DetectorConfig::new();
        cfg.core.patch_size = 15;
        cfg.core.n_threads = 1;
        cfg
    }

    /// Several bright squares of different sizes on a dark background
    fn create_multiple_corners_image(width: usize, height: usize) -> Image {
        let squares = [(width / 4, height / 4, 4), (3 * width / 4, height / 4, 6), (width / 2, 2 * height / 3, 9)];
        Image::from_fn(width, height, |x, y| {
            let inside = squares
                .iter()
                .any(|&(cx, cy, r)| x.abs_diff(cx) <= r && y.abs_diff(cy) <= r);
            if inside { 230 } else { 30 }
        })
    }

    #[test]
    fn test_valid_constructor() {
        assert!(FastDetector::new(create_test_config()).is_ok());
    }

    #[test]
    fn test_invalid_threshold() {
        let mut cfg = create_test_config();
        cfg.core.threshold = 0;
        assert!(matches!(FastDetector::new(cfg), Err(FastError::InvalidThreshold(0))));

        let detector = FastDetector::new(create_test_config()).unwrap();
        assert!(matches!(detector.with_threshold(128), Err(FastError::InvalidThreshold(128))));
    }

    #[test]
    fn test_invalid_dimensions() {
        let detector = FastDetector::new(create_test_config()).unwrap();
        let result = detector.detect_keypoints(&Image::filled(0, 100, 0));
        assert!(matches!(result, Err(FastError::InvalidImageSize { .. })));
    }

    #[test]
    fn test_too_small_image_yields_nothing() {
        let detector = FastDetector::new(create_test_config()).unwrap();
        let keypoints = detector.detect_keypoints(&Image::filled(5, 5, 0)).unwrap();
        assert!(keypoints.is_empty());
    }

    #[test]
    fn test_uniform_image_detection() {
        let detector = FastDetector::new(create_test_config()).unwrap();
        let keypoints = detector.detect_keypoints(&Image::filled(64, 64, 128)).unwrap();
        assert!(keypoints.is_empty());
    }

    #[test]
    fn test_corner_detection_across_levels() {
        let detector = FastDetector::new(create_test_config()).unwrap();
        let img = create_multiple_corners_image(160, 120);
        let keypoints = detector.detect_keypoints(&img).unwrap();

        assert!(!keypoints.is_empty());
        assert!(keypoints.iter().any(|kp| kp.octave > 0));
        for kp in &keypoints {
            assert!(kp.x >= -0.5 && kp.x < 160.0);
            assert!(kp.y >= -0.5 && kp.y < 120.0);
            assert!(kp.response > 0.0 && kp.response.is_finite());
            assert!(kp.angle.is_finite());
        }
        for pair in keypoints.windows(2) {
            assert!(pair[0].response >= pair[1].response);
        }
    }

    #[test]
    fn test_max_keypoints_cap() {
        let mut cfg = create_test_config();
        cfg.core.max_keypoints = 3;
        let detector = FastDetector::new(cfg).unwrap();
        let img = create_multiple_corners_image(160, 120);
        assert!(detector.detect_keypoints(&img).unwrap().len() <= 3);
    }

    #[test]
    fn test_lower_threshold_admits_more_corners() {
        let img = Image::from_fn(96, 96, |x, y| ((x * 31 + y * 17 + (x * y) % 13) % 200) as u8);
        let detector = FastDetector::new(create_test_config()).unwrap();
        let pyramid = detector.build_pyramid(&img).unwrap();
        let weak = detector.with_threshold(10).unwrap().detect_keypoints_with_response(&pyramid[0]);
        let strong = detector.with_threshold(60).unwrap().detect_keypoints_with_response(&pyramid[0]);
        assert!(strong.len() <= weak.len());
        // Every strong corner is also a weak corner
        for s in &strong {
            assert!(weak.iter().any(|w| w.keypoint.x == s.keypoint.x && w.keypoint.y == s.keypoint.y));
        }
    }

    #[test]
    fn test_parallel_determinism() {
        let detector = FastDetector::new(create_test_config()).unwrap();
        let img = create_multiple_corners_image(200, 150);
        let first = detector.detect_keypoints(&img).unwrap();

        for _ in 0..10 {
            assert_eq!(detector.detect_keypoints(&img).unwrap(), first);
        }
    }
}
