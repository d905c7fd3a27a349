use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum MatchError {
    #[error("Invalid ratio threshold: {0} (must be in (0, 1])")]
    InvalidRatio(f64),
    #[error("Invalid neighbour count k = {0} (must be >= 1)")]
    InvalidK(usize),
}

pub type MatchResult<T> = Result<T, MatchError>;
