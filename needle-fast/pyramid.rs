use needle_core::Image;
use crate::error::FastResult;
use crate::types::{PyramidLevel, ScaleLevel};

/// Standard ORB scale factor between consecutive levels
pub const SCALE_FACTOR: f32 = 1.2;

/// Levels above the base stop once either side would drop below this
pub const MIN_LEVEL_SIZE: usize = 32;

/// Image pyramid operations for multi-scale feature detection
pub struct ImagePyramid;

impl ImagePyramid {
    /// Generate scale levels for an image pyramid.
    ///
    /// The base level is always present, however small the image.
    pub fn generate_scale_levels(width: usize, height: usize, max_levels: usize) -> Vec<ScaleLevel> {
        let mut levels = vec![ScaleLevel {
            level: 0,
            scale: 1.0,
            width,
            height,
        }];
        let mut current_scale = SCALE_FACTOR;

        for level in 1..max_levels {
            let scaled_width = ((width as f32) / current_scale) as usize;
            let scaled_height = ((height as f32) / current_scale) as usize;

            if scaled_width < MIN_LEVEL_SIZE || scaled_height < MIN_LEVEL_SIZE {
                break;
            }

            levels.push(ScaleLevel {
                level,
                scale: current_scale,
                width: scaled_width,
                height: scaled_height,
            });
            current_scale *= SCALE_FACTOR;
        }

        levels
    }

    /// Build image pyramid from base image
    pub fn build(img: &Image, scale_levels: &[ScaleLevel]) -> FastResult<Vec<PyramidLevel>> {
        let mut pyramid = Vec::with_capacity(scale_levels.len());

        for scale_level in scale_levels {
            let image = if scale_level.level == 0 {
                img.clone()
            } else {
                Self::downsample_image(img, scale_level.width, scale_level.height)?
            };
            pyramid.push(PyramidLevel {
                scale_level: *scale_level,
                image,
            });
        }

        Ok(pyramid)
    }

    /// Downsample image using bilinear interpolation
    fn downsample_image(img: &Image, target_width: usize, target_height: usize) -> FastResult<Image> {
        let x_ratio = img.width() as f32 / target_width as f32;
        let y_ratio = img.height() as f32 / target_height as f32;

        let mut pixels = Vec::with_capacity(target_width * target_height);
        for y in 0..target_height {
            for x in 0..target_width {
                // Sample at the centre of the covered source area
                let src_x = (x as f32 + 0.5) * x_ratio - 0.5;
                let src_y = (y as f32 + 0.5) * y_ratio - 0.5;
                let value = bilinear_sample(img, src_x.max(0.0), src_y.max(0.0));
                pixels.push(value.round().clamp(0.0, 255.0) as u8);
            }
        }

        Ok(Image::new(target_width, target_height, pixels)?)
    }
}

/// Sample image at fractional coordinates using bilinear interpolation.
/// Coordinates past the last row/column reuse the border sample.
pub fn bilinear_sample(img: &Image, x: f32, y: f32) -> f32 {
    let (width, height) = img.dimensions();
    let x1 = (x.floor() as usize).min(width - 1);
    let y1 = (y.floor() as usize).min(height - 1);
    let x2 = (x1 + 1).min(width - 1);
    let y2 = (y1 + 1).min(height - 1);

    let fx = (x - x1 as f32).clamp(0.0, 1.0);
    let fy = (y - y1 as f32).clamp(0.0, 1.0);

    let p11 = img.get(x1, y1) as f32;
    let p12 = img.get(x2, y1) as f32;
    let p21 = img.get(x1, y2) as f32;
    let p22 = img.get(x2, y2) as f32;

    let interpolated_top = p11 * (1.0 - fx) + p12 * fx;
    let interpolated_bottom = p21 * (1.0 - fx) + p22 * fx;

    interpolated_top * (1.0 - fy) + interpolated_bottom * fy
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_small_image_keeps_base_level() {
        let levels = ImagePyramid::generate_scale_levels(20, 20, 8);
        assert_eq!(levels.len(), 1);
        assert_eq!(levels[0].scale, 1.0);
    }

    #[test]
    fn test_levels_shrink_geometrically() {
        let levels = ImagePyramid::generate_scale_levels(640, 480, 8);
        assert_eq!(levels.len(), 8);
        for pair in levels.windows(2) {
            assert!(pair[1].width < pair[0].width);
            assert!((pair[1].scale / pair[0].scale - SCALE_FACTOR).abs() < 1e-4);
        }
    }

    #[test]
    fn test_level_limit() {
        assert_eq!(ImagePyramid::generate_scale_levels(640, 480, 3).len(), 3);
        assert_eq!(ImagePyramid::generate_scale_levels(40, 40, 8).len(), 2);
    }

    #[test]
    fn test_uniform_image_stays_uniform() {
        let img = Image::filled(100, 80, 77);
        let levels = ImagePyramid::generate_scale_levels(100, 80, 4);
        let pyramid = ImagePyramid::build(&img, &levels).unwrap();
        assert_eq!(pyramid.len(), levels.len());
        for level in &pyramid {
            assert_eq!(level.image.dimensions(), (level.scale_level.width, level.scale_level.height));
            assert!(level.image.pixels().iter().all(|&p| p == 77));
        }
    }

    #[test]
    fn test_bilinear_midpoint() {
        let img = Image::new(2, 1, vec![0, 100]).unwrap();
        assert!((bilinear_sample(&img, 0.5, 0.0) - 50.0).abs() < 1e-4);
        assert_eq!(bilinear_sample(&img, 5.0, 3.0), 100.0);
    }
}
