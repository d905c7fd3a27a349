use needle_match::MatchError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DetectError {
    /// Empty image, unusable parameter, or an image path that cannot be read
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    #[error("Feature extraction failed on the {image} image: {source}")]
    Extraction {
        image: &'static str,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    #[error("Matching error: {0}")]
    Match(#[from] MatchError),
    #[error("Thread pool error: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
    #[error("Configuration error: {0}")]
    Config(String),
    #[error("Could not write {0}")]
    Output(String),
}

pub type DetectResult<T> = Result<T, DetectError>;
