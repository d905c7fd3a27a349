//! Descriptor matching and the detection decision.
//!
//! * [`BruteForceMatcher`] finds the k nearest train descriptors of every
//!   query by Hamming distance.
//! * [`RatioTest`] keeps only distinctive matches.
//! * [`is_found`] turns the surviving match count into a verdict.
//! * [`localize`] optionally projects the needle outline into the haystack.

pub mod decision;
pub mod error;
pub mod knn;
pub mod localize;
pub mod ratio;

pub use decision::is_found;
pub use error::{MatchError, MatchResult};
pub use knn::{knn_match, BruteForceMatcher, KnnMatch, Neighbor, DEFAULT_K};
pub use localize::{estimate_homography, localize, needle_corners, project, Localization, MIN_CORRESPONDENCES};
pub use ratio::{ratio_test, DMatch, RatioTest, DEFAULT_RATIO};

/// k-NN match `query` against `train` and apply the ratio test
pub fn match_descriptors(
    query: &[needle_core::Descriptor],
    train: &[needle_core::Descriptor],
    ratio: &RatioTest,
) -> Vec<DMatch> {
    let knn = knn_match(query, train, DEFAULT_K);
    ratio_test(&knn, ratio, train.len())
}
