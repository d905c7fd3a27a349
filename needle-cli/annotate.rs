use std::path::Path;

use image::{DynamicImage, GrayImage, Rgba, RgbaImage};
use imageproc::drawing::{draw_hollow_circle_mut, draw_line_segment_mut};
use needle_core::Image;

use crate::error::{DetectError, DetectResult};
use crate::pipeline::Detection;

const MATCH_COLOR: Rgba<u8> = Rgba([255, 0, 0, 255]);
const OUTLINE_COLOR: Rgba<u8> = Rgba([0, 255, 0, 255]);

/// Haystack with accepted keypoints circled and the localised needle outlined
pub fn render(haystack: &Image, detection: &Detection) -> DetectResult<RgbaImage> {
    let (width, height) = haystack.dimensions();
    let gray = GrayImage::from_raw(width as u32, height as u32, haystack.pixels().to_vec())
        .ok_or_else(|| DetectError::InvalidInput(format!("haystack buffer does not fit {}x{}", width, height)))?;
    let mut canvas = DynamicImage::ImageLuma8(gray).into_rgba8();

    for m in &detection.matches {
        if let Some(kp) = detection.haystack_keypoints.get(m.train_idx) {
            let radius = (3.0 * kp.scale).round().max(3.0) as i32;
            draw_hollow_circle_mut(&mut canvas, (kp.x.round() as i32, kp.y.round() as i32), radius, MATCH_COLOR);
        }
    }

    if let Some(loc) = &detection.localization {
        for i in 0..4 {
            let (x0, y0) = loc.corners[i];
            let (x1, y1) = loc.corners[(i + 1) % 4];
            draw_line_segment_mut(&mut canvas, (x0 as f32, y0 as f32), (x1 as f32, y1 as f32), OUTLINE_COLOR);
        }
    }

    Ok(canvas)
}

/// Render and save the annotated haystack; format follows the extension
pub fn write_annotated(haystack: &Image, detection: &Detection, path: &Path) -> DetectResult<()> {
    render(haystack, detection)?
        .save(path)
        .map_err(|e| DetectError::Output(format!("{}: {}", path.display(), e)))
}
