//! Error types for the transform pipeline
//!
//! Provides structured error handling with HTTP status mapping and an
//! environment-aware response body for callers that surface errors to
//! end users.

use std::fmt;

use serde::Serialize;

use crate::config::Environment;

/// Errors that can occur while validating, configuring, or transforming
/// an image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RepixError {
    // === Parameter errors ===
    /// A required option is missing or failed to parse
    InvalidParameter { param: String, message: String },
    /// Requested output format is not recognized
    UnsupportedFormat { format: String },
    /// Quality value or compression preset name is not recognized
    InvalidCompressionSpecifier { value: String },

    // === Source errors ===
    /// Source bytes do not identify as an image
    NotAnImage { mime_type: String },
    /// Source host is not in the configured allowlist
    HostNotAllowed { host: String },

    // === Configuration errors ===
    /// A required configuration value is absent
    ConfigurationMissing { name: String },

    // === Codec errors ===
    /// Failed to decode source image data
    DecodeFailed { message: String },
    /// Encoding to the output format failed
    EncodeFailed { format: String, message: String },
    /// Resize operation failed
    ResizeFailed { message: String },
    /// Filesystem error while materializing or reading a source
    Io { message: String },
}

impl fmt::Display for RepixError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RepixError::InvalidParameter { param, message } => {
                write!(f, "The {} parameter is missing or invalid: {}", param, message)
            }
            RepixError::UnsupportedFormat { format } => {
                write!(f, "Unsupported image format: {}", format)
            }
            RepixError::InvalidCompressionSpecifier { value } => {
                write!(f, "Unrecognized compression specifier: {}", value)
            }
            RepixError::NotAnImage { mime_type } => {
                write!(f, "The file is not an image (detected {})", mime_type)
            }
            RepixError::HostNotAllowed { host } => {
                write!(f, "The requested host is not allowed: {}", host)
            }
            RepixError::ConfigurationMissing { name } => {
                write!(f, "The {} configuration is missing", name)
            }
            RepixError::DecodeFailed { message } => {
                write!(f, "Failed to decode image: {}", message)
            }
            RepixError::EncodeFailed { format, message } => {
                write!(f, "Failed to encode to {}: {}", format, message)
            }
            RepixError::ResizeFailed { message } => {
                write!(f, "Resize failed: {}", message)
            }
            RepixError::Io { message } => {
                write!(f, "I/O error: {}", message)
            }
        }
    }
}

impl std::error::Error for RepixError {}

impl From<std::io::Error> for RepixError {
    fn from(err: std::io::Error) -> Self {
        RepixError::Io {
            message: err.to_string(),
        }
    }
}

impl RepixError {
    /// Maps errors to HTTP status codes
    ///
    /// Status mapping:
    /// - InvalidParameter, InvalidCompressionSpecifier, NotAnImage,
    ///   DecodeFailed → 400 (Bad Request)
    /// - HostNotAllowed → 403 (Forbidden)
    /// - UnsupportedFormat → 415 (Unsupported Media Type)
    /// - ConfigurationMissing, EncodeFailed, ResizeFailed, Io → 500
    pub fn to_http_status(&self) -> u16 {
        match self {
            RepixError::InvalidParameter { .. }
            | RepixError::InvalidCompressionSpecifier { .. }
            | RepixError::NotAnImage { .. }
            | RepixError::DecodeFailed { .. } => 400,

            RepixError::HostNotAllowed { .. } => 403,

            RepixError::UnsupportedFormat { .. } => 415,

            RepixError::ConfigurationMissing { .. }
            | RepixError::EncodeFailed { .. }
            | RepixError::ResizeFailed { .. }
            | RepixError::Io { .. } => 500,
        }
    }

    /// True for errors caused by the caller's request rather than the
    /// service itself. Client errors keep their message in production.
    pub fn is_client_error(&self) -> bool {
        self.to_http_status() < 500
    }

    /// Stable machine-readable code for the response body
    pub fn code(&self) -> &'static str {
        match self {
            RepixError::InvalidParameter { .. } => "invalid_parameter",
            RepixError::UnsupportedFormat { .. } => "unsupported_format",
            RepixError::InvalidCompressionSpecifier { .. } => "invalid_compression",
            RepixError::NotAnImage { .. } => "not_an_image",
            RepixError::HostNotAllowed { .. } => "host_not_allowed",
            RepixError::ConfigurationMissing { .. } => "configuration_missing",
            RepixError::DecodeFailed { .. } => "decode_failed",
            RepixError::EncodeFailed { .. } => "encode_failed",
            RepixError::ResizeFailed { .. } => "resize_failed",
            RepixError::Io { .. } => "io_error",
        }
    }

    /// Helper constructors for common error patterns
    pub fn invalid_param(param: impl Into<String>, message: impl Into<String>) -> Self {
        RepixError::InvalidParameter {
            param: param.into(),
            message: message.into(),
        }
    }

    pub fn unsupported_format(format: impl Into<String>) -> Self {
        RepixError::UnsupportedFormat {
            format: format.into(),
        }
    }

    pub fn invalid_compression(value: impl Into<String>) -> Self {
        RepixError::InvalidCompressionSpecifier {
            value: value.into(),
        }
    }

    pub fn not_an_image(mime_type: impl Into<String>) -> Self {
        RepixError::NotAnImage {
            mime_type: mime_type.into(),
        }
    }

    pub fn decode_failed(message: impl Into<String>) -> Self {
        RepixError::DecodeFailed {
            message: message.into(),
        }
    }

    pub fn encode_failed(format: impl Into<String>, message: impl Into<String>) -> Self {
        RepixError::EncodeFailed {
            format: format.into(),
            message: message.into(),
        }
    }

    pub fn resize_failed(message: impl Into<String>) -> Self {
        RepixError::ResizeFailed {
            message: message.into(),
        }
    }
}

/// Serializable error body for callers that render errors to end users.
///
/// Client-class errors always carry their message. Internal errors are
/// rendered opaque in production and verbatim in development.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl ErrorResponse {
    pub fn from_error(err: &RepixError, environment: Environment) -> Self {
        if err.is_client_error() {
            return Self {
                error: err.code().to_string(),
                message: err.to_string(),
                detail: None,
            };
        }

        match environment {
            Environment::Production => Self {
                error: "unknown".to_string(),
                message: "Unknown Error".to_string(),
                detail: None,
            },
            Environment::Development => Self {
                error: err.code().to_string(),
                message: err.to_string(),
                detail: Some(format!("{:?}", err)),
            },
        }
    }
}
