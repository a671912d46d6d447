//! Error taxonomy shared by the analysis, rewrite and benchmark layers.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, CoreError>;

#[derive(Error, Debug)]
pub enum CoreError {
    /// An identity that does not resolve to a corpus entry.
    #[error("Not found: {0}")]
    NotFound(String),

    /// A no-op or malformed request.
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// An operation attempted before the component was ready.
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// The generation backend was unreachable or returned an error.
    #[error("Transport failure: {0}")]
    TransportFailure(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl CoreError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, CoreError::NotFound(_))
    }

    pub fn is_invalid_request(&self) -> bool {
        matches!(self, CoreError::InvalidRequest(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_messages() {
        assert_eq!(
            CoreError::NotFound("openai/gpt-4".to_string()).to_string(),
            "Not found: openai/gpt-4"
        );
        assert_eq!(
            CoreError::InvalidRequest("empty".to_string()).to_string(),
            "Invalid request: empty"
        );
    }

    #[test]
    fn test_io_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let err: CoreError = io.into();
        assert!(matches!(err, CoreError::Io(_)));
        assert!(!err.is_not_found());
    }
}
