use thiserror::Error;

/// Failure kinds surfaced by the classification and generation paths.
///
/// Only [`GuideError::ModelLoad`] is fatal; every other variant is caught by the
/// session orchestrator and turned into a user-visible message.
#[derive(Debug, Error)]
pub enum GuideError {
    /// A model could not be loaded at startup. The process must not serve.
    #[error("failed to load model: {0}")]
    ModelLoad(String),

    /// The vision service endpoint could not be reached.
    #[error("vision service is unreachable: {0}")]
    ServiceUnavailable(String),

    /// The image payload was missing, malformed, or could not be decoded.
    #[error("invalid image: {0}")]
    InvalidImage(String),

    /// The vision service answered with an error or a malformed body.
    #[error("classification failed: {0}")]
    Classification(String),

    /// The language model failed while decoding an answer.
    #[error("generation failed: {0}")]
    Generation(String),

    /// A configuration value violated its documented range.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

impl GuideError {
    /// Whether the condition should terminate the process.
    pub const fn is_fatal(&self) -> bool {
        matches!(self, Self::ModelLoad(_))
    }
}
