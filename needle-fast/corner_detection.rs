use needle_core::{Image, Keypoint};
use crate::types::{CornerType, ScoredKeypoint};
use crate::utils::has_contiguous_arc;
use rayon::prelude::*;

/// FAST requires a 3-pixel border on each side
pub const FAST_BORDER: usize = 3;

/// Minimum contiguous arc length for a FAST-9 corner
pub const FAST_ARC: u32 = 9;

/// FAST-9 segment test on a single pyramid level
pub struct CornerDetector;

impl CornerDetector {
    /// FAST circle offsets for corner detection, clockwise from 12 o'clock
    pub const FAST_OFFSETS: [(i32, i32); 16] = [
        (0, -3), (1, -3), (2, -2), (3, -1),
        (3, 0), (3, 1), (2, 2), (1, 3),
        (0, 3), (-1, 3), (-2, 2), (-3, 1),
        (-3, 0), (-3, -1), (-2, -2), (-1, -3),
    ];

    /// Detect corners on one image, rows processed in parallel.
    ///
    /// Row results are collected in row order, so the output is in raster
    /// order regardless of thread count.
    pub fn detect(img: &Image, threshold: u8) -> Vec<ScoredKeypoint> {
        let (width, height) = img.dimensions();
        if width < 2 * FAST_BORDER + 1 || height < 2 * FAST_BORDER + 1 {
            return Vec::new();
        }

        (FAST_BORDER..height - FAST_BORDER)
            .into_par_iter()
            .flat_map_iter(|y| {
                let mut row_keypoints = Vec::new();
                for x in FAST_BORDER..width - FAST_BORDER {
                    if let Some(corner) = Self::classify(img, x, y, threshold) {
                        let response = Self::compute_intensity_response(img, x, y, threshold, corner);
                        row_keypoints.push(ScoredKeypoint {
                            keypoint: Keypoint {
                                response,
                                ..Keypoint::new(x as f32, y as f32)
                            },
                            response,
                        });
                    }
                }
                row_keypoints
            })
            .collect()
    }

    /// Segment test: nine contiguous circle pixels all brighter or all darker
    fn classify(img: &Image, x: usize, y: usize, threshold: u8) -> Option<CornerType> {
        let center = img.get(x, y);

        // Cardinal pixels 0, 4, 8, 12: a 9-arc must cover at least two of them
        let mut quick = 0;
        for &i in &[0usize, 4, 8, 12] {
            let q = Self::circle_pixel(img, x, y, i);
            if q >= center.saturating_add(threshold) || q.saturating_add(threshold) <= center {
                quick += 1;
            }
        }
        if quick < 2 {
            return None;
        }

        let (bright, dark) = Self::circle_masks(img, x, y, center, threshold);
        if has_contiguous_arc(bright, FAST_ARC) {
            Some(CornerType::Bright)
        } else if has_contiguous_arc(dark, FAST_ARC) {
            Some(CornerType::Dark)
        } else {
            None
        }
    }

    #[inline]
    fn circle_pixel(img: &Image, x: usize, y: usize, i: usize) -> u8 {
        let (dx, dy) = Self::FAST_OFFSETS[i];
        img.get((x as i32 + dx) as usize, (y as i32 + dy) as usize)
    }

    /// Bit i of `bright`/`dark` is set when circle pixel i passes the threshold
    fn circle_masks(img: &Image, x: usize, y: usize, center: u8, threshold: u8) -> (u16, u16) {
        let mut bright = 0u16;
        let mut dark = 0u16;
        for i in 0..16 {
            let q = Self::circle_pixel(img, x, y, i);
            if q >= center.saturating_add(threshold) {
                bright |= 1 << i;
            } else if q.saturating_add(threshold) <= center {
                dark |= 1 << i;
            }
        }
        (bright, dark)
    }

    /// Mean squared difference of the circle pixels that pass the segment
    /// test with the corner's polarity
    fn compute_intensity_response(img: &Image, x: usize, y: usize, threshold: u8, corner: CornerType) -> f32 {
        let center = img.get(x, y);
        let mut sum_diff = 0.0f32;
        let mut count = 0;

        for i in 0..16 {
            let pixel = Self::circle_pixel(img, x, y, i);
            let passes = match corner {
                CornerType::Bright => pixel >= center.saturating_add(threshold),
                CornerType::Dark => pixel.saturating_add(threshold) <= center,
            };
            if passes {
                let diff = pixel as f32 - center as f32;
                sum_diff += diff * diff;
                count += 1;
            }
        }

        if count > 0 {
            sum_diff / count as f32
        } else {
            0.0
        }
    }
}
