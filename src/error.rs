use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Navigation failed: {0}")]
    NavigationError(String),

    #[error("Element not found: {0}")]
    ElementNotFound(String),

    #[error("Element detached: {0}")]
    Detached(String),

    #[error("Timeout waiting for: {0}")]
    Timeout(String),

    #[error("JavaScript error: {0}")]
    JsError(String),

    #[error("Frame unavailable: {0}")]
    FrameUnavailable(String),

    #[error("Answer backend error: {0}")]
    Backend(String),

    #[error("Answer store error: {0}")]
    AnswerStore(String),

    #[error("CDP error: {0}")]
    CdpError(#[from] chromiumoxide::error::CdpError),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Errors that a re-acquisition of the control may cure.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Error::Detached(_) | Error::ElementNotFound(_) | Error::FrameUnavailable(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, Error>;
