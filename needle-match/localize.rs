use log::debug;
use nalgebra::{DMatrix, Matrix3, Vector3};
use needle_core::Keypoint;
use crate::ratio::DMatch;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Correspondences needed to fix the eight degrees of freedom of a homography
pub const MIN_CORRESPONDENCES: usize = 4;

/// Relative singular value below which the DLT system counts as rank deficient
const RANK_TOLERANCE: f64 = 1e-8;

/// Where the needle's outline lands in the haystack
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Localization {
    /// Row-major needle → haystack homography, normalised so `h[2][2] = 1`
    pub homography: [[f64; 3]; 3],
    /// Needle corners (0,0), (w,0), (w,h), (0,h) projected into the haystack
    pub corners: [(f64, f64); 4],
}

impl Localization {
    pub fn matrix(&self) -> Matrix3<f64> {
        let h = &self.homography;
        Matrix3::new(
            h[0][0], h[0][1], h[0][2],
            h[1][0], h[1][1], h[1][2],
            h[2][0], h[2][1], h[2][2],
        )
    }
}

/// Needle outline in its own coordinates, clockwise from the origin
pub fn needle_corners(width: usize, height: usize) -> [(f64, f64); 4] {
    let (w, h) = (width as f64, height as f64);
    [(0.0, 0.0), (w, 0.0), (w, h), (0.0, h)]
}

/// Apply a homography to a point, `None` when it maps to infinity
pub fn project(h: &Matrix3<f64>, (x, y): (f64, f64)) -> Option<(f64, f64)> {
    let p = h * Vector3::new(x, y, 1.0);
    if p.z.abs() < f64::EPSILON {
        return None;
    }
    let (px, py) = (p.x / p.z, p.y / p.z);
    (px.is_finite() && py.is_finite()).then_some((px, py))
}

/// Similarity transform moving the centroid to the origin with mean distance √2
fn normalizing_transform(points: &[(f64, f64)]) -> Option<(Matrix3<f64>, Matrix3<f64>)> {
    let n = points.len() as f64;
    let cx = points.iter().map(|p| p.0).sum::<f64>() / n;
    let cy = points.iter().map(|p| p.1).sum::<f64>() / n;
    let mean_dist = points
        .iter()
        .map(|p| ((p.0 - cx).powi(2) + (p.1 - cy).powi(2)).sqrt())
        .sum::<f64>()
        / n;
    if mean_dist < f64::EPSILON {
        return None;
    }

    let s = std::f64::consts::SQRT_2 / mean_dist;
    let t = Matrix3::new(
        s, 0.0, -s * cx,
        0.0, s, -s * cy,
        0.0, 0.0, 1.0,
    );
    let t_inv = Matrix3::new(
        1.0 / s, 0.0, cx,
        0.0, 1.0 / s, cy,
        0.0, 0.0, 1.0,
    );
    Some((t, t_inv))
}

/// Least-squares homography over all correspondences with the normalised
/// direct linear transform. `None` for fewer than four pairs or a
/// degenerate configuration (coincident or collinear points).
pub fn estimate_homography(src: &[(f64, f64)], dst: &[(f64, f64)]) -> Option<Matrix3<f64>> {
    if src.len() != dst.len() || src.len() < MIN_CORRESPONDENCES {
        return None;
    }
    let (t_src, _) = normalizing_transform(src)?;
    let (t_dst, t_dst_inv) = normalizing_transform(dst)?;

    let n_rows = 2 * src.len();
    let mut a = vec![0.0f64; n_rows * 9];
    for (i, (&s, &d)) in src.iter().zip(dst).enumerate() {
        let p = t_src * Vector3::new(s.0, s.1, 1.0);
        let q = t_dst * Vector3::new(d.0, d.1, 1.0);
        let (x1, y1, x2, y2) = (p.x, p.y, q.x, q.y);

        let r = 2 * i * 9;
        a[r..r + 9].copy_from_slice(&[-x1, -y1, -1.0, 0.0, 0.0, 0.0, x2 * x1, x2 * y1, x2]);
        let r = r + 9;
        a[r..r + 9].copy_from_slice(&[0.0, 0.0, 0.0, -x1, -y1, -1.0, y2 * x1, y2 * y1, y2]);
    }

    let mut system = DMatrix::from_row_slice(n_rows, 9, &a);
    // Four pairs give 8 rows; pad so the SVD yields all nine right singular vectors
    if n_rows < 9 {
        let mut padded = DMatrix::zeros(9, 9);
        padded.view_mut((0, 0), (n_rows, 9)).copy_from(&system);
        system = padded;
    }

    let svd = system.svd(false, true);
    let v_t = svd.v_t?;
    let mut order: Vec<usize> = (0..svd.singular_values.len()).collect();
    order.sort_by(|&i, &j| svd.singular_values[i].total_cmp(&svd.singular_values[j]));

    let largest = svd.singular_values[order[order.len() - 1]];
    let second_smallest = svd.singular_values[order[1]];
    if largest <= 0.0 || second_smallest <= RANK_TOLERANCE * largest {
        return None;
    }

    let h = v_t.row(order[0]);
    let h_norm = Matrix3::new(
        h[0], h[1], h[2],
        h[3], h[4], h[5],
        h[6], h[7], h[8],
    );
    let mut h_full = t_dst_inv * h_norm * t_src;
    let scale = h_full[(2, 2)];
    if scale.abs() < f64::EPSILON {
        return None;
    }
    h_full /= scale;
    h_full.iter().all(|v| v.is_finite()).then_some(h_full)
}

/// Fit a homography to the accepted matches and project the needle outline.
///
/// Query indices refer to `needle_kps`, train indices to `haystack_kps`.
/// Purely diagnostic: the detection decision never depends on it.
pub fn localize(
    matches: &[DMatch],
    needle_kps: &[Keypoint],
    haystack_kps: &[Keypoint],
    needle_size: (usize, usize),
) -> Option<Localization> {
    if matches.len() < MIN_CORRESPONDENCES {
        debug!("localize: {} matches, need {}", matches.len(), MIN_CORRESPONDENCES);
        return None;
    }

    let mut src = Vec::with_capacity(matches.len());
    let mut dst = Vec::with_capacity(matches.len());
    for m in matches {
        let s = needle_kps.get(m.query_idx)?;
        let d = haystack_kps.get(m.train_idx)?;
        src.push((s.x as f64, s.y as f64));
        dst.push((d.x as f64, d.y as f64));
    }

    let Some(h) = estimate_homography(&src, &dst) else {
        debug!("localize: degenerate correspondence set");
        return None;
    };

    let outline = needle_corners(needle_size.0, needle_size.1);
    let mut corners = [(0.0, 0.0); 4];
    for (corner, &p) in corners.iter_mut().zip(outline.iter()) {
        *corner = project(&h, p)?;
    }

    let mut homography = [[0.0; 3]; 3];
    for (r, row) in homography.iter_mut().enumerate() {
        for (c, v) in row.iter_mut().enumerate() {
            *v = h[(r, c)];
        }
    }
    Some(Localization { homography, corners })
}

#[cfg(test)]
mod tests {
    use super::*;

    const SRC: [(f64, f64); 6] = [(3.0, 4.0), (40.0, 7.0), (38.0, 35.0), (6.0, 30.0), (20.0, 18.0), (12.0, 25.0)];

    fn assert_close(a: (f64, f64), b: (f64, f64)) {
        assert!((a.0 - b.0).abs() < 1e-6 && (a.1 - b.1).abs() < 1e-6, "{:?} != {:?}", a, b);
    }

    fn keypoints(points: &[(f64, f64)]) -> Vec<Keypoint> {
        points.iter().map(|&(x, y)| Keypoint::new(x as f32, y as f32)).collect()
    }

    fn identity_matches(n: usize) -> Vec<DMatch> {
        (0..n)
            .map(|i| DMatch { query_idx: i, train_idx: i, distance: 0.0, second_distance: 64.0 })
            .collect()
    }

    #[test]
    fn test_translation_recovered() {
        let dst: Vec<(f64, f64)> = SRC.iter().map(|&(x, y)| (x + 30.0, y + 20.0)).collect();
        let h = estimate_homography(&SRC, &dst).unwrap();
        for (&s, &d) in SRC.iter().zip(&dst) {
            assert_close(project(&h, s).unwrap(), d);
        }
        assert!((h[(0, 2)] - 30.0).abs() < 1e-6);
        assert!((h[(1, 2)] - 20.0).abs() < 1e-6);
    }

    #[test]
    fn test_four_point_perspective() {
        let src = [(0.0, 0.0), (10.0, 0.0), (10.0, 10.0), (0.0, 10.0)];
        let dst = [(100.0, 50.0), (130.0, 52.0), (126.0, 85.0), (98.0, 80.0)];
        let h = estimate_homography(&src, &dst).unwrap();
        for (&s, &d) in src.iter().zip(&dst) {
            assert_close(project(&h, s).unwrap(), d);
        }
    }

    #[test]
    fn test_too_few_or_degenerate() {
        assert!(estimate_homography(&SRC[..3], &SRC[..3]).is_none());
        let collinear: Vec<(f64, f64)> = (0..6).map(|i| (i as f64, 2.0 * i as f64)).collect();
        assert!(estimate_homography(&collinear, &collinear).is_none());
        let same = [(5.0, 5.0); 4];
        assert!(estimate_homography(&same, &SRC[..4]).is_none());
    }

    #[test]
    fn test_localize_projects_outline() {
        let needle = keypoints(&SRC);
        let haystack: Vec<Keypoint> = SRC
            .iter()
            .map(|&(x, y)| Keypoint::new((2.0 * x + 50.0) as f32, (2.0 * y + 10.0) as f32))
            .collect();
        let loc = localize(&identity_matches(SRC.len()), &needle, &haystack, (44, 40)).unwrap();
        let expected = [(50.0, 10.0), (138.0, 10.0), (138.0, 90.0), (50.0, 90.0)];
        for (&c, &e) in loc.corners.iter().zip(&expected) {
            assert!((c.0 - e.0).abs() < 1e-3 && (c.1 - e.1).abs() < 1e-3, "{:?} != {:?}", c, e);
        }
        assert!((loc.matrix()[(2, 2)] - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_localize_rejects_bad_input() {
        let needle = keypoints(&SRC);
        assert!(localize(&identity_matches(3), &needle, &needle, (10, 10)).is_none());
        // Train index past the haystack keypoints
        let mut matches = identity_matches(5);
        matches[4].train_idx = 99;
        assert!(localize(&matches, &needle, &needle, (10, 10)).is_none());
    }
}
