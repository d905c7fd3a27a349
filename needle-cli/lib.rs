//! Needle-in-haystack detection.
//!
//! Features are extracted from both images, every needle descriptor is
//! matched against its two nearest haystack descriptors, the ratio test
//! keeps the distinctive ones and the needle counts as found when at least
//! `point_threshold` matches survive.

pub mod annotate;
pub mod error;
pub mod extractor;
pub mod pipeline;

pub use error::{DetectError, DetectResult};
pub use extractor::OrbExtractor;
pub use pipeline::{
    detect_object, load_detector_config, load_image, Detection, NeedleDetector, PipelineConfig, Report,
};

pub use needle_core::{self, DetectParams, FeatureExtractor, Features, Image, Keypoint};
pub use needle_fast::{DetectorBuilder, DetectorConfig};
pub use needle_match::{DMatch, Localization, RatioTest, DEFAULT_RATIO};
