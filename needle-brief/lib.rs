use needle_core::{Descriptor, Image, Keypoint, DESCRIPTOR_BITS, DESCRIPTOR_BYTES};
use needle_fast::{bilinear_sample, ScaleLevel};
use rayon::prelude::*;

/// One intensity comparison: sample at (x1, y1) < sample at (x2, y2)
pub type SamplePair = (i8, i8, i8, i8);

/// Sampling coordinates stay within ±13 so a rotated pair fits a 31×31 patch
const PATTERN_RADIUS: i32 = 13;

const PATTERN_SEED: u64 = 0x9E37_79B9_7F4A_7C15;

/// Fixed sampling pattern shared by every generator.
///
/// Coordinates follow a triangular distribution (sum of two uniform draws),
/// which concentrates samples near the keypoint as the BRIEF paper suggests.
pub static PATTERN: [SamplePair; DESCRIPTOR_BITS] = build_pattern();

const fn xorshift(state: u64) -> u64 {
    let mut x = state;
    x ^= x << 13;
    x ^= x >> 7;
    x ^= x << 17;
    x
}

/// Draw a coordinate in [-PATTERN_RADIUS, PATTERN_RADIUS]
const fn draw(state: u64) -> (u64, i8) {
    let a = xorshift(state);
    let b = xorshift(a);
    let half = PATTERN_RADIUS / 2;
    let u = (a % (2 * half as u64 + 1)) as i32 - half;
    let v = (b % (2 * (PATTERN_RADIUS - half) as u64 + 1)) as i32 - (PATTERN_RADIUS - half);
    (b, (u + v) as i8)
}

const fn build_pattern() -> [SamplePair; DESCRIPTOR_BITS] {
    let mut pattern = [(0i8, 0i8, 0i8, 0i8); DESCRIPTOR_BITS];
    let mut state = PATTERN_SEED;
    let mut i = 0;
    while i < DESCRIPTOR_BITS {
        let (s, x1) = draw(state);
        let (s, y1) = draw(s);
        let (s, x2) = draw(s);
        let (s, mut y2) = draw(s);
        state = s;
        // A pair comparing a point with itself carries no information
        if x1 == x2 && y1 == y2 {
            y2 = if y2 < PATTERN_RADIUS as i8 { y2 + 1 } else { y2 - 1 };
        }
        pattern[i] = (x1, y1, x2, y2);
        i += 1;
    }
    pattern
}

/// 5-tap binomial kernel, sums to 16
const SMOOTH_KERNEL: [u32; 5] = [1, 4, 6, 4, 1];

/// Rotated BRIEF descriptor generator
#[derive(Debug, Clone, Copy)]
pub struct BriefGenerator {
    pattern: &'static [SamplePair; DESCRIPTOR_BITS],
}

impl Default for BriefGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl BriefGenerator {
    pub fn new() -> Self {
        Self { pattern: &PATTERN }
    }

    pub fn pattern(&self) -> &[SamplePair] {
        self.pattern
    }

    /// Separable binomial blur applied before sampling; BRIEF tests on raw
    /// pixels are too noise sensitive
    pub fn smooth(img: &Image) -> Image {
        let (w, h) = img.dimensions();
        if w == 0 || h == 0 {
            return img.clone();
        }

        let horizontal: Vec<u32> = (0..h)
            .into_par_iter()
            .flat_map_iter(|y| {
                (0..w).map(move |x| {
                    SMOOTH_KERNEL
                        .iter()
                        .enumerate()
                        .map(|(k, &wk)| wk * img.get_clamped(x as i32 + k as i32 - 2, y as i32) as u32)
                        .sum::<u32>()
                })
            })
            .collect();

        let pixels: Vec<u8> = (0..h)
            .into_par_iter()
            .flat_map_iter(|y| {
                let horizontal = &horizontal;
                (0..w).map(move |x| {
                    let sum: u32 = SMOOTH_KERNEL
                        .iter()
                        .enumerate()
                        .map(|(k, &wk)| {
                            let yy = (y as i32 + k as i32 - 2).clamp(0, h as i32 - 1) as usize;
                            wk * horizontal[yy * w + x]
                        })
                        .sum();
                    ((sum + 128) / 256) as u8
                })
            })
            .collect();

        Image::from_fn(w, h, |x, y| pixels[y * w + x])
    }

    /// Generate descriptors for keypoints found on a single image, keypoint
    /// coordinates taken as-is
    pub fn generate_descriptors(&self, img: &Image, kps: &[Keypoint]) -> Vec<Descriptor> {
        kps.par_iter()
            .map(|kp| self.describe_at(img, kp.x, kp.y, kp.angle))
            .collect()
    }

    /// Generate descriptors for multi-scale keypoints.
    ///
    /// `levels[o]` must be the (smoothed) pyramid image for octave `o`;
    /// keypoint coordinates are in base image space and are mapped onto
    /// their level by `scale`. Octaves past the last level use the last one.
    /// Returns one descriptor per keypoint, in keypoint order.
    pub fn generate_descriptors_multiscale(&self, levels: &[Image], kps: &[Keypoint]) -> Vec<Descriptor> {
        if levels.is_empty() {
            return Vec::new();
        }

        kps.par_iter()
            .map(|kp| {
                let level = &levels[kp.octave.min(levels.len() - 1)];
                let (width, height) = level.dimensions();
                let scale_level = ScaleLevel { level: kp.octave, scale: kp.scale, width, height };
                let (x, y) = scale_level.to_level(kp.x, kp.y);
                self.describe_at(level, x, y, kp.angle)
            })
            .collect()
    }

    fn describe_at(&self, img: &Image, cx: f32, cy: f32, angle: f32) -> Descriptor {
        let (s, c) = angle.sin_cos();
        let mut d = [0u8; DESCRIPTOR_BYTES];

        for (i, &(dx1, dy1, dx2, dy2)) in self.pattern.iter().enumerate() {
            // Apply rotation and translation for subpixel coordinates
            let (dx1, dy1, dx2, dy2) = (dx1 as f32, dy1 as f32, dx2 as f32, dy2 as f32);
            let (rx1, ry1) = (cx + c * dx1 - s * dy1, cy + s * dx1 + c * dy1);
            let (rx2, ry2) = (cx + c * dx2 - s * dy2, cy + s * dx2 + c * dy2);

            let val1 = bilinear_sample(img, rx1, ry1);
            let val2 = bilinear_sample(img, rx2, ry2);

            let bit = (val1 < val2) as u8;
            d[i / 8] |= bit << (i % 8);
        }
        d
    }
}
