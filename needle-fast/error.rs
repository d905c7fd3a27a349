use needle_core::ImageError;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum FastError {
    #[error("Invalid image dimensions: {width}x{height} (must be > 0)")]
    InvalidImageSize { width: usize, height: usize },
    #[error("Invalid threshold: {0} (must be 1-127)")]
    InvalidThreshold(u8),
    #[error("Invalid patch size {0} (must be odd and within 3-63)")]
    InvalidPatchSize(usize),
    #[error("Invalid pyramid level count {0} (must be 1-16)")]
    InvalidLevels(usize),
    #[error("Invalid NMS distance {0} (must be finite and >= 0)")]
    InvalidNmsDistance(f32),
    #[error("Pyramid level could not be built: {0}")]
    Image(#[from] ImageError),
}

pub type FastResult<T> = Result<T, FastError>;
