//! Error types for keyswap-config.

use std::fmt;

/// Result type alias for keyswap-config operations.
pub type Result<T> = std::result::Result<T, ConfigError>;

/// Errors that can occur when loading or reading keyed configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// No configuration is stored under the requested key.
    #[error("No configuration found for key {0}")]
    KeyNotFound(String),

    /// A configuration file, or a section inside it, does not exist.
    #[error("Configuration source not found: {0}")]
    SourceNotFound(String),

    /// Failed to parse configuration content.
    #[error("Failed to parse configuration: {0}")]
    ParseError(String),

    /// The format identifier or file extension has no registered parser.
    #[error("Unsupported configuration format: {0}")]
    UnsupportedFormat(String),

    /// Configuration validation failed.
    #[error("Configuration validation failed: {0}")]
    ValidationError(String),

    /// File watching could not be set up.
    #[error("File watching error: {0}")]
    WatchError(String),

    /// IO error occurred.
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// Generic error for other cases.
    #[error("Configuration error: {0}")]
    Other(String),
}

impl ConfigError {
    /// Returns `true` for both a missing key and a missing source.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::KeyNotFound(_) | Self::SourceNotFound(_))
    }
}

/// Validation error for configuration validation.
#[derive(Debug)]
pub enum ValidationError {
    /// Custom validation error with a message.
    Custom(String),

    /// A specific field has an invalid value.
    InvalidField {
        /// The field name/path
        field: String,
        /// The reason why it's invalid
        reason: String,
    },

    /// Multiple validation errors occurred.
    Multiple(Vec<ValidationError>),
}

impl ValidationError {
    /// Create a custom validation error.
    pub fn custom(msg: impl Into<String>) -> Self {
        Self::Custom(msg.into())
    }

    /// Create an invalid field error.
    pub fn invalid_field(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidField {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Custom(msg) => write!(f, "{}", msg),
            Self::InvalidField { field, reason } => {
                write!(f, "Field '{}' is invalid: {}", field, reason)
            }
            Self::Multiple(errors) => {
                writeln!(f, "Multiple validation errors:")?;
                for (i, err) in errors.iter().enumerate() {
                    writeln!(f, "  {}. {}", i + 1, err)?;
                }
                Ok(())
            }
        }
    }
}

impl std::error::Error for ValidationError {}

impl From<ValidationError> for ConfigError {
    fn from(err: ValidationError) -> Self {
        ConfigError::ValidationError(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_variants() {
        assert!(ConfigError::KeyNotFound("\"a\"".into()).is_not_found());
        assert!(ConfigError::SourceNotFound("app.config".into()).is_not_found());
        assert!(!ConfigError::ParseError("bad".into()).is_not_found());
    }

    #[test]
    fn test_validation_error_display() {
        let err = ValidationError::Multiple(vec![
            ValidationError::invalid_field("port", "must be >= 1024"),
            ValidationError::custom("bad secret"),
        ]);
        let text = err.to_string();
        assert!(text.contains("1. Field 'port' is invalid: must be >= 1024"));
        assert!(text.contains("2. bad secret"));

        let converted: ConfigError = ValidationError::custom("nope").into();
        assert!(matches!(converted, ConfigError::ValidationError(msg) if msg == "nope"));
    }
}
