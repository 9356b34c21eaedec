use thiserror::Error;

use super::formats::OutputFormat;

#[derive(Debug, Error)]
pub enum WatermarkError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Decode error: {0}")]
    DecodeError(#[from] image::ImageError),

    #[error("Encode error ({format:?}): {source}")]
    EncodeError {
        format: OutputFormat,
        #[source]
        source: image::ImageError,
    },

    #[error("Invalid date format pattern {pattern:?}: {reason}")]
    InvalidFormatPattern { pattern: String, reason: String },

    #[error("Invalid settings: {0}")]
    InvalidSettings(String),

    #[error("No font face available for family {0:?}")]
    FontNotFound(String),

    #[error("Font data could not be parsed")]
    FontParse,
}

impl WatermarkError {
    pub(crate) fn pattern(pattern: &str, reason: impl Into<String>) -> Self {
        Self::InvalidFormatPattern {
            pattern: pattern.to_string(),
            reason: reason.into(),
        }
    }
}
