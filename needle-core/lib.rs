#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ImageError {
    #[error("Image data length mismatch: expected {expected_len}, got {actual_len}")]
    DataLength { expected_len: usize, actual_len: usize },
}

/// Row-major 8-bit grayscale image
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Image {
    width: usize,
    height: usize,
    pixels: Vec<u8>,
}

impl Image {
    /// Wrap a row-major pixel buffer, checking it matches the dimensions
    pub fn new(width: usize, height: usize, pixels: Vec<u8>) -> Result<Self, ImageError> {
        let expected_len = width * height;
        if pixels.len() != expected_len {
            return Err(ImageError::DataLength {
                expected_len,
                actual_len: pixels.len(),
            });
        }
        Ok(Self { width, height, pixels })
    }

    /// Uniform image with every sample set to `value`
    pub fn filled(width: usize, height: usize, value: u8) -> Self {
        Self {
            width,
            height,
            pixels: vec![value; width * height],
        }
    }

    /// Build an image by evaluating `f(x, y)` for every pixel
    pub fn from_fn(width: usize, height: usize, mut f: impl FnMut(usize, usize) -> u8) -> Self {
        let mut pixels = Vec::with_capacity(width * height);
        for y in 0..height {
            for x in 0..width {
                pixels.push(f(x, y));
            }
        }
        Self { width, height, pixels }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn dimensions(&self) -> (usize, usize) {
        (self.width, self.height)
    }

    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    /// True when the image has no samples at all
    pub fn is_empty(&self) -> bool {
        self.pixels.is_empty()
    }

    /// Sample at integer coordinates. Panics when out of bounds.
    #[inline]
    pub fn get(&self, x: usize, y: usize) -> u8 {
        self.pixels[y * self.width + x]
    }

    /// Sample with coordinates clamped to the image border
    #[inline]
    pub fn get_clamped(&self, x: i32, y: i32) -> u8 {
        let cx = x.clamp(0, self.width as i32 - 1) as usize;
        let cy = y.clamp(0, self.height as i32 - 1) as usize;
        self.pixels[cy * self.width + cx]
    }

    pub fn into_pixels(self) -> Vec<u8> {
        self.pixels
    }
}

/// Key-point ≙ FAST corner + orientation (radians) with subpixel precision.
///
/// Coordinates are always expressed in the base (level 0) image; `octave`
/// and `scale` record the pyramid level the corner was found on.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Keypoint {
    pub x: f32,
    pub y: f32,
    pub angle: f32,
    pub octave: usize,
    pub scale: f32,
    pub response: f32,
}

impl Keypoint {
    pub fn new(x: f32, y: f32) -> Self {
        Self {
            x,
            y,
            angle: 0.0,
            octave: 0,
            scale: 1.0,
            response: 0.0,
        }
    }
}

/// 256-bit binary descriptor = 32 bytes
pub type Descriptor = [u8; 32];

pub const DESCRIPTOR_BYTES: usize = 32;
pub const DESCRIPTOR_BITS: usize = DESCRIPTOR_BYTES * 8;

/// Number of differing bits between two descriptors
#[inline]
pub fn hamming_distance(a: &Descriptor, b: &Descriptor) -> u32 {
    a.iter().zip(b.iter()).map(|(x, y)| (x ^ y).count_ones()).sum()
}

/// Keypoints of one image and their index-aligned descriptors
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Features {
    pub keypoints: Vec<Keypoint>,
    pub descriptors: Vec<Descriptor>,
}

impl Features {
    pub fn new(keypoints: Vec<Keypoint>, descriptors: Vec<Descriptor>) -> Self {
        debug_assert_eq!(keypoints.len(), descriptors.len());
        Self { keypoints, descriptors }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.descriptors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }
}

/// Source of keypoints and descriptors for one image.
///
/// Implementations must be deterministic for a fixed image and sensitivity,
/// and may return empty `Features` for blank or tiny images. An `Err` means
/// the extractor could not run at all.
pub trait FeatureExtractor {
    type Error: std::error::Error + Send + Sync + 'static;

    fn extract(&self, img: &Image, sensitivity: f64) -> Result<Features, Self::Error>;

    /// Map a caller's sensitivity onto the range this extractor honours.
    /// Called once per detection, before either image is extracted.
    fn normalize_sensitivity(&self, sensitivity: f64) -> f64 {
        sensitivity
    }
}

impl<E: FeatureExtractor + ?Sized> FeatureExtractor for &E {
    type Error = E::Error;

    fn extract(&self, img: &Image, sensitivity: f64) -> Result<Features, Self::Error> {
        (**self).extract(img, sensitivity)
    }

    fn normalize_sensitivity(&self, sensitivity: f64) -> f64 {
        (**self).normalize_sensitivity(sensitivity)
    }
}

/// FAST intensity threshold used when nothing else sets one
pub const DEFAULT_THRESHOLD: u8 = 20;

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct OrbConfig {
    /// FAST threshold of a standalone detector. Extractors that take a
    /// sensitivity per call replace it.
    pub threshold: u8,
    pub patch_size: usize,
    pub n_threads: usize,
    /// Maximum number of pyramid levels
    pub n_levels: usize,
    /// Keep only the strongest corners after suppression (0 = unlimited).
    /// A global cap starves regions of large images, so it is off by default.
    pub max_keypoints: usize,
}

impl Default for OrbConfig {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_THRESHOLD,
            patch_size: 31,
            n_threads: num_cpus::get().max(1),
            n_levels: 8,
            max_keypoints: 0,
        }
    }
}

/// Per-call numeric parameters of a detection
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct DetectParams {
    /// Detector admission threshold; lower admits weaker corners
    pub sensitivity: f64,
    /// Reserved for geometric verification, not consulted by the decision
    pub min_distance: f64,
    /// Minimum number of accepted matches for a positive detection
    pub point_threshold: f64,
}

impl DetectParams {
    pub fn new(sensitivity: f64, min_distance: f64, point_threshold: f64) -> Self {
        Self {
            sensitivity,
            min_distance,
            point_threshold,
        }
    }

    /// Narrow every parameter to a 32-bit integer, truncating toward zero
    /// (NaN becomes 0). Used for integer-only compatibility mode.
    pub fn truncated(self) -> Self {
        let narrow = |v: f64| (v as i32) as f64;
        Self {
            sensitivity: narrow(self.sensitivity),
            min_distance: narrow(self.min_distance),
            point_threshold: narrow(self.point_threshold),
        }
    }
}

/// Build a dedicated Rayon thread pool with the specified number of threads
pub fn build_thread_pool(n_threads: usize) -> Result<rayon::ThreadPool, rayon::ThreadPoolBuildError> {
    rayon::ThreadPoolBuilder::new()
        .num_threads(n_threads.max(1))
        .thread_name(|i| format!("needle-worker-{}", i))
        .build()
}
