//! Error types shared by every backend

use std::io;
use thiserror::Error;

/// Errors raised by renderer operations
///
/// Out-of-bounds drawing, clipboard failures and drag cancellation are never
/// reported through this type; they degrade silently.
#[derive(Error, Debug)]
pub enum Error {
    #[error("invalid color pair id {0}: expected 1-255 (0 is reserved for default colors)")]
    InvalidColorPair(i32),

    #[error("invalid RGB component {value} in {channel}: expected 0-255")]
    InvalidRgb { channel: &'static str, value: i32 },

    #[error("invalid dimensions {height}x{width}: height and width must not be negative")]
    InvalidDimensions { height: i32, width: i32 },

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("renderer is not running (state: {0})")]
    NotRunning(&'static str),

    #[error("event callback must be set before running the event loop")]
    CallbackNotSet,

    #[error("{backend} backend failed to initialize: {message}")]
    Initialization {
        backend: &'static str,
        message: String,
    },

    #[error(
        "Font '{name}' not found. Please specify a valid monospace font. \
         Common monospace fonts: Menlo, Monaco, Courier New, SF Mono, DejaVu Sans Mono"
    )]
    FontNotFound { name: String },

    #[error(
        "Font '{name}' is not monospace. Character widths vary: {widths:?}. \
         Please use a monospace font like Menlo, Monaco, Courier New or DejaVu Sans Mono"
    )]
    FontNotMonospace { name: String, widths: Vec<f32> },

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl Error {
    /// Build an initialization error for the named backend
    pub fn init(backend: &'static str, message: impl Into<String>) -> Self {
        Error::Initialization {
            backend,
            message: message.into(),
        }
    }

    /// Whether the error is a programmer/deployment error rather than a platform failure
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            Error::InvalidColorPair(_)
                | Error::InvalidRgb { .. }
                | Error::InvalidDimensions { .. }
                | Error::InvalidArgument(_)
                | Error::FontNotFound { .. }
                | Error::FontNotMonospace { .. }
                | Error::CallbackNotSet
        )
    }
}

/// Result type for renderer operations
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_font_errors_name_the_font() {
        let err = Error::FontNotFound {
            name: "Comic Sans".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("Comic Sans"));
        assert!(msg.contains("Menlo"));

        let err = Error::FontNotMonospace {
            name: "Helvetica".to_string(),
            widths: vec![3.5, 11.0],
        };
        let msg = err.to_string();
        assert!(msg.contains("Helvetica"));
        assert!(msg.contains("not monospace"));
    }

    #[test]
    fn test_configuration_classification() {
        assert!(Error::InvalidColorPair(0).is_configuration());
        assert!(Error::CallbackNotSet.is_configuration());
        assert!(!Error::init("gpu", "no adapter").is_configuration());
        assert!(!Error::NotRunning("Uninitialized").is_configuration());
    }
}
