use log::debug;
use crate::error::{MatchError, MatchResult};
use crate::knn::KnnMatch;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Nearest neighbour must be closer than this fraction of the second nearest
pub const DEFAULT_RATIO: f64 = 0.6;

/// A query descriptor paired with its accepted nearest train descriptor
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct DMatch {
    pub query_idx: usize,
    pub train_idx: usize,
    pub distance: f32,
    /// Distance to the runner-up, `+inf` when the train set had one descriptor
    pub second_distance: f32,
}

/// Lowe-style distinctiveness filter over k-NN results
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct RatioTest {
    pub ratio: f64,
    /// Only examine the first `min(train_len - 1, matches)` queries, the
    /// iteration window older builds of the detector used
    pub legacy_window: bool,
}

impl Default for RatioTest {
    fn default() -> Self {
        Self {
            ratio: DEFAULT_RATIO,
            legacy_window: false,
        }
    }
}

impl RatioTest {
    pub fn new(ratio: f64) -> MatchResult<Self> {
        let test = Self {
            ratio,
            ..Self::default()
        };
        test.validate()?;
        Ok(test)
    }

    pub fn with_legacy_window(mut self, legacy_window: bool) -> Self {
        self.legacy_window = legacy_window;
        self
    }

    pub fn validate(&self) -> MatchResult<()> {
        if !self.ratio.is_finite() || self.ratio <= 0.0 || self.ratio > 1.0 {
            return Err(MatchError::InvalidRatio(self.ratio));
        }
        Ok(())
    }

    /// Accept a k-NN result with one or two neighbours whose nearest distance
    /// is strictly below `ratio` times the second. Any other neighbour count
    /// is malformed and rejected.
    pub fn accepts(&self, knn: &KnnMatch) -> Option<DMatch> {
        if !(1..=2).contains(&knn.neighbors.len()) {
            return None;
        }
        let nearest = knn.neighbors[0];
        let second_distance = knn.second_distance();
        // Compared in f64 so that e.g. 30 < 0.6 * 50 stays false
        if (nearest.distance as f64) < self.ratio * second_distance as f64 {
            Some(DMatch {
                query_idx: knn.query_idx,
                train_idx: nearest.train_idx,
                distance: nearest.distance,
                second_distance,
            })
        } else {
            None
        }
    }

    /// Number of leading k-NN results examined for a train set of
    /// `train_len` descriptors
    pub fn window(&self, matches: usize, train_len: usize) -> usize {
        if self.legacy_window {
            train_len.saturating_sub(1).min(matches)
        } else {
            matches
        }
    }

    /// Filter k-NN results, keeping query order
    pub fn filter(&self, matches: &[KnnMatch], train_len: usize) -> Vec<DMatch> {
        let window = self.window(matches.len(), train_len);
        let accepted: Vec<DMatch> = matches[..window].iter().filter_map(|m| self.accepts(m)).collect();

        debug!(
            "ratio test {:.2}: {} of {} examined matches accepted",
            self.ratio,
            accepted.len(),
            window
        );
        accepted
    }
}

/// Apply `test` to k-NN results against a train set of `train_len` descriptors
pub fn ratio_test(matches: &[KnnMatch], test: &RatioTest, train_len: usize) -> Vec<DMatch> {
    test.filter(matches, train_len)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::knn::Neighbor;

    fn knn(query_idx: usize, distances: &[f32]) -> KnnMatch {
        KnnMatch {
            query_idx,
            neighbors: distances
                .iter()
                .enumerate()
                .map(|(i, &distance)| Neighbor { train_idx: 10 + i, distance })
                .collect(),
        }
    }

    #[test]
    fn test_ratio_boundary_is_strict() {
        let test = RatioTest::default();
        assert!(test.accepts(&knn(0, &[59.0, 100.0])).is_some());
        assert!(test.accepts(&knn(0, &[60.0, 100.0])).is_none());
        assert!(test.accepts(&knn(0, &[61.0, 100.0])).is_none());
    }

    #[test]
    fn test_zero_distances() {
        let test = RatioTest::default();
        // 0 < 0.6 * 0 is false: two identical candidates are ambiguous
        assert!(test.accepts(&knn(0, &[0.0, 0.0])).is_none());
        assert!(test.accepts(&knn(0, &[0.0, 1.0])).is_some());
    }

    #[test]
    fn test_single_neighbor_always_accepted() {
        let m = RatioTest::default().accepts(&knn(3, &[200.0])).unwrap();
        assert_eq!(m.query_idx, 3);
        assert_eq!(m.train_idx, 10);
        assert_eq!(m.second_distance, f32::INFINITY);
    }

    #[test]
    fn test_malformed_neighbor_counts_rejected() {
        let test = RatioTest::default();
        assert!(test.accepts(&knn(0, &[])).is_none());
        assert!(test.accepts(&knn(0, &[1.0, 50.0, 60.0])).is_none());
    }

    #[test]
    fn test_filter_keeps_query_order() {
        let matches = vec![knn(0, &[10.0, 50.0]), knn(1, &[40.0, 50.0]), knn(2, &[5.0, 90.0])];
        let accepted = RatioTest::default().filter(&matches, 100);
        let idx: Vec<usize> = accepted.iter().map(|m| m.query_idx).collect();
        assert_eq!(idx, vec![0, 2]);
    }

    #[test]
    fn test_legacy_window() {
        let matches: Vec<KnnMatch> = (0..5).map(|i| knn(i, &[1.0, 100.0])).collect();
        let legacy = RatioTest::default().with_legacy_window(true);
        // Train set of 3 descriptors: only the first 2 queries are examined
        assert_eq!(legacy.filter(&matches, 3).len(), 2);
        assert_eq!(legacy.filter(&matches, 100).len(), 5);
        assert!(legacy.filter(&matches, 0).is_empty());
        assert_eq!(RatioTest::default().filter(&matches, 3).len(), 5);
    }

    #[test]
    fn test_invalid_ratio() {
        assert_eq!(RatioTest::new(0.0), Err(MatchError::InvalidRatio(0.0)));
        assert_eq!(RatioTest::new(1.5), Err(MatchError::InvalidRatio(1.5)));
        assert!(RatioTest::new(f64::NAN).is_err());
        assert_eq!(RatioTest::new(0.75).map(|t| t.ratio), Ok(0.75));
    }
}
