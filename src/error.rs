//! Error types for report composition.
//!
//! Input errors abort a whole run. Render errors are isolated per target by
//! [`crate::compose::Composer`], so one failing format never hides the others.

use crate::compose::Target;

/// Result type alias for composition operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error types that can occur while composing a report.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The report record is missing a required field or is malformed
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// A photo selected for the document cannot be decoded
    #[error("Image {index} cannot be decoded: {reason}")]
    UndecodableImage {
        /// Index of the image in the input list
        index: usize,
        /// Reason reported by the decoder
        reason: String,
    },

    /// A target renderer failed
    #[error("{target} rendering failed: {reason}")]
    Render {
        /// Target that failed
        target: Target,
        /// Failure description
        reason: String,
    },

    /// The page state machine was driven out of order
    #[error("Layout error: {0}")]
    Layout(String),

    /// Image embedding error
    #[error("Image error: {0}")]
    Image(String),

    /// XML emission error
    #[error("XML error: {0}")]
    Xml(String),

    /// Archive (DOCX package) error
    #[error("Archive error: {0}")]
    Archive(String),

    /// Unsupported feature
    #[error("Unsupported feature: {0}")]
    Unsupported(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON (de)serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Whether this error aborts the whole run rather than a single target.
    pub fn is_input_error(&self) -> bool {
        matches!(self, Error::InvalidInput(_) | Error::UndecodableImage { .. } | Error::Json(_))
    }

    /// Wrap this error as a failure of `target`, keeping render errors as they are.
    pub fn for_target(self, target: Target) -> Self {
        match self {
            Error::Render { .. } => self,
            other => Error::Render {
                target,
                reason: other.to_string(),
            },
        }
    }
}

impl From<quick_xml::Error> for Error {
    fn from(err: quick_xml::Error) -> Self {
        Error::Xml(err.to_string())
    }
}

#[cfg(feature = "office")]
impl From<zip::result::ZipError> for Error {
    fn from(err: zip::result::ZipError) -> Self {
        Error::Archive(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_input_error() {
        let err = Error::InvalidInput("client.nom is required".to_string());
        let msg = format!("{}", err);
        assert!(msg.contains("Invalid input"));
        assert!(msg.contains("client.nom"));
        assert!(err.is_input_error());
    }

    #[test]
    fn test_undecodable_image_error() {
        let err = Error::UndecodableImage {
            index: 3,
            reason: "truncated header".to_string(),
        };
        let msg = format!("{}", err);
        assert!(msg.contains("Image 3"));
        assert!(msg.contains("truncated header"));
        assert!(err.is_input_error());
    }

    #[test]
    fn test_for_target_wraps_once() {
        let err = Error::Image("unsupported codec".to_string()).for_target(Target::Canvas);
        match &err {
            Error::Render { target, reason } => {
                assert_eq!(*target, Target::Canvas);
                assert!(reason.contains("unsupported codec"));
            },
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(!err.is_input_error());

        let again = err.for_target(Target::Office);
        assert!(matches!(again, Error::Render { target: Target::Canvas, .. }));
    }

    #[test]
    fn test_error_is_send_and_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Error>();
    }
}
