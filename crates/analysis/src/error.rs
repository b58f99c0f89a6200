use thiserror::Error;

/// Errors an analysis backend can surface.
///
/// The pipeline converts all of these into the fallback verdict, but
/// they stay typed so logs and tests can tell a bad payload from a
/// broken backend.
#[derive(Debug, Error, PartialEq, Eq)]
#[non_exhaustive]
pub enum AnalysisError {
    #[error("empty image payload")]
    EmptyImage,

    #[error("invalid image payload: {0}")]
    InvalidImage(String),

    #[error("analysis engine error: {0}")]
    Engine(String),
}
