use std::collections::HashMap;

use needle_core::{Image, Keypoint};
use crate::types::ScoredKeypoint;

/// Subpixel refinement, orientation and suppression of detected corners
pub struct KeypointRefinement;

impl KeypointRefinement {
    /// Refine keypoint to subpixel accuracy using quadratic surface fitting
    pub fn refine_keypoint_subpixel(img: &Image, kp: Keypoint) -> Keypoint {
        let x = kp.x.round() as usize;
        let y = kp.y.round() as usize;
        let (width, height) = img.dimensions();

        // Ensure we have enough border for 3x3 sampling
        if x < 1 || y < 1 || x + 1 >= width || y + 1 >= height {
            return kp;
        }

        let s = |dx: i32, dy: i32| img.get((x as i32 + dx) as usize, (y as i32 + dy) as usize) as f32;

        // Fit f(x,y) = Ax² + By² + Cxy + Dx + Ey + F by finite differences
        let dx = (s(1, 0) - s(-1, 0)) / 2.0;
        let dy = (s(0, 1) - s(0, -1)) / 2.0;
        let dxx = s(1, 0) - 2.0 * s(0, 0) + s(-1, 0);
        let dyy = s(0, 1) - 2.0 * s(0, 0) + s(0, -1);
        let dxy = (s(1, 1) - s(-1, 1) - s(1, -1) + s(-1, -1)) / 4.0;

        let det = dxx * dyy - dxy * dxy;
        if det.abs() < 1e-6 {
            return kp;
        }

        // Newton step towards the extremum, at most half a pixel
        let offset_x = (-(dyy * dx - dxy * dy) / det).clamp(-0.5, 0.5);
        let offset_y = (-(dxx * dy - dxy * dx) / det).clamp(-0.5, 0.5);

        Keypoint {
            x: kp.x + offset_x,
            y: kp.y + offset_y,
            ..kp
        }
    }

    /// Compute orientation for keypoint using the intensity centroid of a
    /// circular patch of diameter `patch_size`
    pub fn compute_orientation(img: &Image, x: f32, y: f32, patch_size: usize) -> f32 {
        let half = (patch_size / 2) as i32;
        let radius_sq = half * half;
        let (cx, cy) = (x.round() as i32, y.round() as i32);
        let mut m10 = 0i64;
        let mut m01 = 0i64;

        for dy in -half..=half {
            for dx in -half..=half {
                if dx * dx + dy * dy > radius_sq {
                    continue;
                }
                let val = img.get_clamped(cx + dx, cy + dy) as i64;
                m10 += dx as i64 * val;
                m01 += dy as i64 * val;
            }
        }

        if m10 == 0 && m01 == 0 {
            0.0
        } else {
            (m01 as f32).atan2(m10 as f32)
        }
    }

    /// Non-maximum suppression to reduce duplicate keypoints.
    ///
    /// Candidates are visited strongest first; the sort is stable so equal
    /// responses keep their input order and the result is deterministic.
    pub fn non_maximum_suppression(keypoints: &[ScoredKeypoint], min_distance: f32) -> Vec<ScoredKeypoint> {
        if keypoints.is_empty() {
            return Vec::new();
        }

        let mut sorted_keypoints = keypoints.to_vec();
        sorted_keypoints.sort_by(|a, b| b.response.total_cmp(&a.response));

        if min_distance <= 0.0 {
            return sorted_keypoints;
        }

        // Kept keypoints bucketed by a grid of `min_distance` cells: a
        // conflicting neighbour can only sit in the 3×3 surrounding cells
        let mut suppressed: Vec<ScoredKeypoint> = Vec::new();
        let mut grid: HashMap<(i64, i64), Vec<usize>> = HashMap::new();
        let min_distance_sq = min_distance * min_distance;
        let cell_of = |kp: &Keypoint| {
            ((kp.x / min_distance).floor() as i64, (kp.y / min_distance).floor() as i64)
        };

        for candidate in sorted_keypoints {
            let (cx, cy) = cell_of(&candidate.keypoint);
            let is_local_max = (cy - 1..=cy + 1).all(|gy| {
                (cx - 1..=cx + 1).all(|gx| {
                    grid.get(&(gx, gy)).map_or(true, |kept| {
                        kept.iter().all(|&i| {
                            let dx = candidate.keypoint.x - suppressed[i].keypoint.x;
                            let dy = candidate.keypoint.y - suppressed[i].keypoint.y;
                            dx * dx + dy * dy >= min_distance_sq
                        })
                    })
                })
            });

            if is_local_max {
                grid.entry((cx, cy)).or_default().push(suppressed.len());
                suppressed.push(candidate);
            }
        }

        suppressed
    }
}
