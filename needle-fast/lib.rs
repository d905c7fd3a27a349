//! Multi-scale FAST keypoint detection.
//!
//! Corners are found with the FAST-9 segment test on every level of a
//! 1.2-factor image pyramid, suppressed per level, oriented by intensity
//! centroid and reported in base image coordinates.

pub mod builder;
pub mod config;
pub mod corner_detection;
pub mod detector;
pub mod error;
pub mod pyramid;
pub mod refinement;
pub mod types;
pub mod utils;

pub use builder::DetectorBuilder;
pub use config::DetectorConfig;
pub use detector::FastDetector;
pub use error::{FastError, FastResult};
pub use pyramid::{bilinear_sample, ImagePyramid};
pub use types::{PyramidLevel, ScaleLevel, ScoredKeypoint};
