//! Error types for xmlconvert
//!
//! This module defines all error types used throughout the library, plus the
//! [`Diagnostic`] record that validators collect while checking a document.

use std::fmt;
use thiserror::Error;

/// Result type alias using xmlconvert Error
pub type Result<T> = std::result::Result<T, Error>;

/// Reason carried by a failed DTD validation
pub const DTD_VALIDATION_FAILED: &str = "XML failed DTD validation";

/// Reason carried when the document cannot be parsed before XSD validation
pub const INVALID_XML_FOR_SCHEMA: &str = "Invalid XML for schema validation";

/// Reason carried by a failed XSD validation
pub const XSD_VALIDATION_FAILED: &str = "XML failed XSD validation";

/// Main error type for xmlconvert operations
#[derive(Error, Debug)]
pub enum Error {
    /// A required parsing or validation engine was not compiled in
    #[error("required capability not available: {0}")]
    CapabilityMissing(String),

    /// DTD or XSD validation failed
    #[error("{reason}")]
    SchemaValidation {
        /// Human-readable failure reason
        reason: String,
        /// Diagnostics collected during the failed validation
        diagnostics: Vec<Diagnostic>,
    },

    /// The XML document is not well-formed
    #[error("Invalid XML: {0}")]
    InvalidInput(String),

    /// A single child element could not be converted
    #[error("failed to convert element '{element}': {source}")]
    ChildConversion {
        /// Name of the skipped element
        element: String,
        /// Underlying cause
        #[source]
        source: Box<Error>,
    },

    /// Limit exceeded error
    #[error("limit exceeded: {0}")]
    LimitExceeded(String),

    /// Resource loading error
    #[error("resource error: {0}")]
    Resource(String),

    /// The schema document itself is unusable
    #[error("schema error: {0}")]
    Schema(String),

    /// JSON encoding error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// URL parsing error
    #[error("URL error: {0}")]
    Url(#[from] url::ParseError),
}

impl Error {
    /// Create a schema validation error without diagnostics
    pub fn schema_validation(reason: impl Into<String>) -> Self {
        Error::SchemaValidation {
            reason: reason.into(),
            diagnostics: Vec::new(),
        }
    }

    /// Create an invalid input error, substituting a placeholder for empty messages
    pub fn invalid_input(message: impl Into<String>) -> Self {
        let message = message.into();
        if message.trim().is_empty() {
            Error::InvalidInput("Unknown error".to_string())
        } else {
            Error::InvalidInput(message)
        }
    }

    /// Diagnostics attached to a schema validation failure
    pub fn diagnostics(&self) -> &[Diagnostic] {
        match self {
            Error::SchemaValidation { diagnostics, .. } => diagnostics,
            _ => &[],
        }
    }
}

/// Severity of a validation diagnostic
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Recoverable problem
    Warning,
    /// Validity error
    Error,
    /// The document could not be processed further
    Fatal,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Warning => write!(f, "warning"),
            Severity::Error => write!(f, "error"),
            Severity::Fatal => write!(f, "fatal"),
        }
    }
}

/// A single message reported while validating a document
#[derive(Debug, Clone, PartialEq)]
pub struct Diagnostic {
    /// Severity
    pub severity: Severity,
    /// Error message
    pub message: String,
    /// 1-based line in the instance document
    pub line: Option<u32>,
    /// 1-based column in the instance document
    pub column: Option<u32>,
    /// Path to the element that failed validation
    pub path: Option<String>,
}

impl Diagnostic {
    /// Create a new error diagnostic
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Error,
            message: message.into(),
            line: None,
            column: None,
            path: None,
        }
    }

    /// Create a new warning diagnostic
    pub fn warning(message: impl Into<String>) -> Self {
        Self::new(message).with_severity(Severity::Warning)
    }

    /// Set the severity
    pub fn with_severity(mut self, severity: Severity) -> Self {
        self.severity = severity;
        self
    }

    /// Set the position in the instance document
    pub fn with_position(mut self, line: u32, column: u32) -> Self {
        self.line = Some(line);
        self.column = Some(column);
        self
    }

    /// Set the path where validation failed
    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }

    /// Whether this diagnostic makes the document invalid
    pub fn is_error(&self) -> bool {
        self.severity != Severity::Warning
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let (Some(line), Some(column)) = (self.line, self.column) {
            write!(f, "{}:{}: ", line, column)?;
        }

        write!(f, "{}: {}", self.severity, self.message)?;

        if let Some(ref path) = self.path {
            write!(f, " (at {})", path)?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_diagnostic_display() {
        let diag = Diagnostic::new("Element 'age': 'thirty' is not a valid value")
            .with_position(3, 9)
            .with_path("/person/age");

        let msg = format!("{}", diag);
        assert!(msg.starts_with("3:9: error:"));
        assert!(msg.contains("'thirty'"));
        assert!(msg.contains("(at /person/age)"));
    }

    #[test]
    fn test_warning_is_not_error() {
        assert!(!Diagnostic::warning("ignored").is_error());
        assert!(Diagnostic::new("bad").is_error());
        assert!(Diagnostic::new("worse").with_severity(Severity::Fatal).is_error());
    }

    #[test]
    fn test_schema_validation_display() {
        let err = Error::schema_validation(XSD_VALIDATION_FAILED);
        assert_eq!(err.to_string(), "XML failed XSD validation");
        assert!(err.diagnostics().is_empty());
    }

    #[test]
    fn test_invalid_input_defaults_message() {
        let err = Error::invalid_input("");
        assert_eq!(err.to_string(), "Invalid XML: Unknown error");
    }

    #[test]
    fn test_child_conversion_source() {
        use std::error::Error as _;

        let err = Error::ChildConversion {
            element: "item".to_string(),
            source: Box::new(Error::LimitExceeded("element depth 5 is over the limit of 4".into())),
        };
        assert!(err.to_string().contains("'item'"));
        assert!(err.source().is_some());
    }
}
