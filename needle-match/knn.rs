use log::debug;
use needle_core::{hamming_distance, Descriptor};
use crate::error::{MatchError, MatchResult};
use rayon::prelude::*;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Neighbours searched per query for the ratio test
pub const DEFAULT_K: usize = 2;

/// One candidate train descriptor for a query
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Neighbor {
    pub train_idx: usize,
    pub distance: f32,
}

/// The k nearest train descriptors of one query descriptor, nearest first
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct KnnMatch {
    pub query_idx: usize,
    pub neighbors: Vec<Neighbor>,
}

impl KnnMatch {
    pub fn nearest(&self) -> Option<&Neighbor> {
        self.neighbors.first()
    }

    /// Distance to the second-nearest neighbour, `+inf` if there is none
    pub fn second_distance(&self) -> f32 {
        self.neighbors.get(1).map_or(f32::INFINITY, |n| n.distance)
    }
}

/// Exhaustive Hamming-distance k-NN matcher.
///
/// Neighbours are ordered by `(distance, train_idx)`, so ties always go to
/// the lowest train index. Queries are searched in parallel and collected in
/// query order.
#[derive(Debug, Clone, Copy)]
pub struct BruteForceMatcher {
    k: usize,
}

impl Default for BruteForceMatcher {
    fn default() -> Self {
        Self { k: DEFAULT_K }
    }
}

impl BruteForceMatcher {
    pub fn new(k: usize) -> MatchResult<Self> {
        if k == 0 {
            return Err(MatchError::InvalidK(k));
        }
        Ok(Self { k })
    }

    pub fn k(&self) -> usize {
        self.k
    }

    /// Find the `min(k, train.len())` nearest train descriptors of every query
    pub fn knn_match(&self, query: &[Descriptor], train: &[Descriptor]) -> Vec<KnnMatch> {
        let matches: Vec<KnnMatch> = query
            .par_iter()
            .enumerate()
            .map(|(query_idx, q)| KnnMatch {
                query_idx,
                neighbors: self.nearest_neighbors(q, train),
            })
            .collect();

        debug!(
            "knn: {} queries against {} train descriptors (k = {})",
            query.len(),
            train.len(),
            self.k
        );
        matches
    }

    fn nearest_neighbors(&self, query: &Descriptor, train: &[Descriptor]) -> Vec<Neighbor> {
        if self.k == 0 {
            return Vec::new();
        }
        // Sorted ascending by (distance, train_idx), at most k entries
        let mut best: Vec<(u32, usize)> = Vec::with_capacity(self.k + 1);

        for (train_idx, t) in train.iter().enumerate() {
            let distance = hamming_distance(query, t);
            if best.len() == self.k && distance >= best[self.k - 1].0 {
                continue;
            }
            // Equal distances stay behind earlier (lower index) entries
            let pos = best.partition_point(|&(d, _)| d <= distance);
            best.insert(pos, (distance, train_idx));
            best.truncate(self.k);
        }

        best.into_iter()
            .map(|(distance, train_idx)| Neighbor {
                train_idx,
                distance: distance as f32,
            })
            .collect()
    }
}

/// k-NN match every query descriptor against `train`
pub fn knn_match(query: &[Descriptor], train: &[Descriptor], k: usize) -> Vec<KnnMatch> {
    BruteForceMatcher { k }.knn_match(query, train)
}
