use needle_core::{Image, Keypoint};

/// Keypoint with corner response score for NMS
#[derive(Debug, Clone, Copy)]
pub struct ScoredKeypoint {
    pub keypoint: Keypoint,
    pub response: f32,
}

/// Scale information for pyramid levels
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScaleLevel {
    pub level: usize,
    pub scale: f32,
    pub width: usize,
    pub height: usize,
}

impl ScaleLevel {
    /// Map level pixel coordinates to the base image (pixel-centre convention)
    #[inline]
    pub fn to_base(&self, x: f32, y: f32) -> (f32, f32) {
        ((x + 0.5) * self.scale - 0.5, (y + 0.5) * self.scale - 0.5)
    }

    /// Map base image coordinates onto this level
    #[inline]
    pub fn to_level(&self, x: f32, y: f32) -> (f32, f32) {
        ((x + 0.5) / self.scale - 0.5, (y + 0.5) / self.scale - 0.5)
    }
}

/// One downsampled image of the pyramid together with its scale
#[derive(Debug, Clone)]
pub struct PyramidLevel {
    pub scale_level: ScaleLevel,
    pub image: Image,
}

/// Polarity of a FAST corner relative to its circle
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum CornerType {
    Bright,
    Dark,
}
