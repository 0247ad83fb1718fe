//! Error types for the render-and-export pipeline

use thiserror::Error;

/// Result type alias for workspace and export operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while editing, rendering or exporting
#[derive(Error, Debug)]
pub enum Error {
    /// The rasterizer could not produce a bitmap
    #[error("Capture failed: {0}")]
    Capture(#[from] CaptureError),

    /// Building or saving the page container failed
    #[error("Document assembly failed: {0}")]
    Assembly(String),

    /// A markup file could not be loaded into the document
    #[error("File load failed: {0}")]
    FileLoad(#[from] FileLoadError),

    /// A second export was requested while one is in flight
    #[error("An export is already in progress")]
    AlreadyInProgress,

    /// A snapshot or layout violated its size invariants
    #[error("Rendering failed: {0}")]
    RenderError(String),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    ConfigError(String),

    /// Theme persistence failed
    #[error("Theme persistence failed: {0}")]
    Persistence(String),

    /// An export job received an event that is not valid in its current state
    #[error("Invalid export transition from {from} on {event}")]
    InvalidTransition { from: String, event: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Why the rasterizer refused to produce a snapshot.
///
/// `DetachedRegion` is a precondition bug (nothing mounted to capture) while
/// `UnsupportedStyle` is actionable by the user, usually by switching theme or
/// removing a custom colour.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CaptureError {
    #[error("the render region is not attached")]
    DetachedRegion,

    #[error("unsupported {property} value `{value}`")]
    UnsupportedStyle { property: String, value: String },
}

impl CaptureError {
    pub fn unsupported(property: impl Into<String>, value: impl Into<String>) -> Self {
        Self::UnsupportedStyle {
            property: property.into(),
            value: value.into(),
        }
    }

    /// True for the oklch sub-case of `UnsupportedStyle`, which only changes logging.
    pub fn mentions_oklch(&self) -> bool {
        match self {
            Self::UnsupportedStyle { value, .. } => value.to_ascii_lowercase().contains("oklch"),
            Self::DetachedRegion => false,
        }
    }
}

/// Reasons a file could not become the document source
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FileLoadError {
    #[error("`{name}` is not a Markdown file (.md)")]
    UnsupportedType { name: String },

    #[error("could not read `{name}`: {reason}")]
    Read { name: String, reason: String },
}

impl Error {
    /// Text suitable for a user-facing notification.
    ///
    /// Full detail goes to the log; this stays short and, where the user can do
    /// something about the failure, says what.
    pub fn user_message(&self) -> String {
        match self {
            Error::Capture(CaptureError::UnsupportedStyle { .. }) => {
                "The preview uses a colour format that cannot be exported. \
                 Try switching between light and dark theme, or remove custom colours, then export again."
                    .to_string()
            }
            Error::Capture(CaptureError::DetachedRegion) => {
                "There was a problem generating the PDF. Please try again.".to_string()
            }
            Error::Assembly(_) | Error::RenderError(_) | Error::InvalidTransition { .. } | Error::Io(_) => {
                "There was a problem generating the PDF. Please try again.".to_string()
            }
            Error::FileLoad(FileLoadError::UnsupportedType { .. }) => {
                "Please select a valid Markdown file (.md).".to_string()
            }
            Error::FileLoad(FileLoadError::Read { name, .. }) => {
                format!("The file `{}` could not be read.", name)
            }
            Error::AlreadyInProgress => "An export is already running.".to_string(),
            Error::ConfigError(msg) => format!("Invalid configuration: {}", msg),
            Error::Persistence(_) => "Your theme preference could not be saved.".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unsupported_style_message_is_actionable() {
        let err = Error::from(CaptureError::unsupported("color", "oklch(0.2 0.03 264)"));
        assert!(err.user_message().contains("theme"));
        assert!(err.to_string().contains("oklch"));
    }

    #[test]
    fn detached_region_is_generic() {
        let err = Error::from(CaptureError::DetachedRegion);
        assert!(!err.user_message().contains("theme"));
    }

    #[test]
    fn oklch_is_a_sub_case_of_unsupported_style() {
        assert!(CaptureError::unsupported("color", "OKLCH(50% 0.1 30)").mentions_oklch());
        assert!(!CaptureError::unsupported("color", "lab(50 20 30)").mentions_oklch());
        assert!(!CaptureError::DetachedRegion.mentions_oklch());
    }

    #[test]
    fn file_load_messages_name_the_reason() {
        let wrong = Error::from(FileLoadError::UnsupportedType { name: "notes.txt".into() });
        assert!(wrong.user_message().contains(".md"));
        let unreadable = Error::from(FileLoadError::Read {
            name: "notes.md".into(),
            reason: "permission denied".into(),
        });
        assert!(unreadable.user_message().contains("notes.md"));
    }
}
