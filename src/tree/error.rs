// ABOUTME: Error types for hardware tree construction, lookup and access
// ABOUTME: Provides no_std compatible error handling built on thiserror

use super::binding::BindingError;
use super::dirent::DirentKind;
use alloc::string::String;
use core::fmt;

/// Result alias used throughout the crate
pub type Result<T> = core::result::Result<T, Error>;

/// A dirent or path element was used as the wrong kind
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversionError {
    /// Kind the caller asked for
    pub requested: DirentKind,
    /// Kind that was actually found
    pub actual: DirentKind,
    /// Path element being resolved, when the mismatch happened during lookup
    pub element: Option<String>,
}

impl ConversionError {
    /// Create a conversion error for a direct downcast
    pub fn new(requested: DirentKind, actual: DirentKind) -> Self {
        Self {
            requested,
            actual,
            element: None,
        }
    }

    /// Attach the path element that failed to convert
    pub fn at_element(mut self, element: &str) -> Self {
        self.element = Some(element.into());
        self
    }
}

impl fmt::Display for ConversionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.element {
            Some(element) => write!(
                f,
                "path element '{}' is not {} (found {})",
                element,
                self.requested.with_article(),
                self.actual
            ),
            None => write!(f, "cannot convert {} to {}", self.actual, self.requested),
        }
    }
}

impl core::error::Error for ConversionError {}

/// Main error type for hardware tree operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Wrong dirent kind for the requested operation
    #[error(transparent)]
    Conversion(#[from] ConversionError),
    /// Malformed or semantically illegal path construct
    #[error("invalid path: {0}")]
    InvalidPath(String),
    /// Array index out of bounds
    #[error("index {index} out of bounds for array of size {size}")]
    Index { index: usize, size: usize },
    /// Operation required a non-empty path
    #[error("path is empty")]
    EmptyPath,
    /// Alias chain revisits an alias it already followed
    #[error("alias cycle detected while resolving '{target}'")]
    AliasCycle { target: String },
    /// Value access on a path that does not resolve
    #[error("path '{path}' not found")]
    NotFound { path: String },
    /// Value access on something that is neither a register nor a field
    #[error("'{path}' is {kind}, not a register or field")]
    NotAccessible { path: String, kind: DirentKind },
    /// Register declared where no scope provides a binding
    #[error("no binding available for register '{name}'")]
    NoBinding { name: String },
    /// Write to a field that cannot be written
    #[error("field is read-only")]
    ReadOnly,
    /// Datatype has no value for the given text
    #[error("unknown value '{text}'")]
    UnknownValue { text: String },
    /// Driver level failure from a binding
    #[error(transparent)]
    Binding(#[from] BindingError),
}

impl Error {
    /// Whether this error is a kind mismatch
    pub fn is_conversion(&self) -> bool {
        matches!(self, Error::Conversion(_))
    }

    /// The conversion details, if this is a kind mismatch
    pub fn as_conversion(&self) -> Option<&ConversionError> {
        match self {
            Error::Conversion(err) => Some(err),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::string::ToString;

    #[test]
    fn test_conversion_display() {
        let err = ConversionError::new(DirentKind::Register, DirentKind::Field);
        assert_eq!(err.to_string(), "cannot convert field to register");

        let err = err.at_element("eax");
        assert_eq!(
            err.to_string(),
            "path element 'eax' is not a register (found field)"
        );
    }

    #[test]
    fn test_error_classification() {
        let err: Error = ConversionError::new(DirentKind::Array, DirentKind::Scope).into();
        assert!(err.is_conversion());
        assert_eq!(err.as_conversion().unwrap().actual, DirentKind::Scope);
        assert!(!Error::EmptyPath.is_conversion());
        assert_eq!(
            Error::Index { index: 3, size: 2 }.to_string(),
            "index 3 out of bounds for array of size 2"
        );
    }
}
