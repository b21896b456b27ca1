use std::fmt;

use serde::Serialize;
use thiserror::Error;

/// Top-level error type returned by querygate.
#[derive(Debug, Error)]
pub enum QueryError {
    /// Registry lookup miss. Recoverable at the caller boundary.
    #[error("unknown entity: {name}")]
    UnknownEntity { name: String },

    /// A field descriptor names a kind outside the closed kind set.
    #[error("invalid field kind '{kind}' for field '{field}' on entity '{entity}'")]
    InvalidFieldKind {
        entity: String,
        field: String,
        kind: String,
    },

    /// The same field name was registered twice on one entity.
    #[error("duplicate field '{field}' on entity '{entity}'")]
    DuplicateField { entity: String, field: String },

    /// The same entity name was registered twice.
    #[error("duplicate entity '{name}' in registry")]
    DuplicateEntity { name: String },

    /// An entity without fields has no sort key domain.
    #[error("entity '{entity}' declares no fields")]
    EmptyEntity { entity: String },

    /// A schema node could not be compiled into a validator.
    #[error("schema compilation failed at '{path}': {message}")]
    SchemaCompilation { path: String, message: String },

    /// Registry configuration could not be parsed.
    #[error("invalid registry configuration: {message}")]
    Config { message: String },

    /// Registry file could not be read.
    #[error("failed to read registry file: {0}")]
    Io(#[from] std::io::Error),

    /// A query object failed validation.
    #[error("query validation failed")]
    Validation(#[from] ValidationError),
}

impl QueryError {
    /// Returns `true` for registry and schema integrity failures.
    ///
    /// These indicate a configuration or programming defect and are meant to halt
    /// startup. Lookup misses and rejected query objects are not fatal.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, QueryError::UnknownEntity { .. } | QueryError::Validation(_))
    }
}

/// Collection of validation issues found on a single query object.
#[derive(Debug, Clone, Error)]
#[error("validation errors: {issues:?}")]
pub struct ValidationError {
    pub issues: Vec<ValidationIssue>,
}

impl ValidationError {
    pub fn new<I>(issues: I) -> Self
    where
        I: IntoIterator<Item = ValidationIssue>,
    {
        Self {
            issues: issues.into_iter().collect(),
        }
    }

    /// Convenience helper for constructing a single-path validation error.
    pub fn single(path: impl Into<String>, code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new([ValidationIssue::new(path, code, message)])
    }
}

/// Detailed validation failure at a single JSON pointer path.
///
/// The root value has the empty path; object properties and array elements
/// append `/<name>` and `/<index>` segments.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationIssue {
    pub path: String,
    pub code: String,
    pub message: String,
}

impl ValidationIssue {
    pub fn new(path: impl Into<String>, code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            code: code.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.path.is_empty() {
            write!(f, "(root): {}", self.message)
        } else {
            write!(f, "{}: {}", self.path, self.message)
        }
    }
}

/// Convenience alias for operations that either pass or report issues.
pub type ValidationResult<T> = Result<T, ValidationError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_and_validation_failures_are_recoverable() {
        let missing = QueryError::UnknownEntity {
            name: "baz".to_string(),
        };
        assert!(!missing.is_fatal());

        let invalid = QueryError::from(ValidationError::single("/page", "minimum", "too small"));
        assert!(!invalid.is_fatal());
    }

    #[test]
    fn integrity_failures_are_fatal() {
        let kind = QueryError::InvalidFieldKind {
            entity: "foo".to_string(),
            field: "flag".to_string(),
            kind: "boolean".to_string(),
        };
        assert!(kind.is_fatal());
        assert_eq!(
            kind.to_string(),
            "invalid field kind 'boolean' for field 'flag' on entity 'foo'"
        );

        let compile = QueryError::SchemaCompilation {
            path: "/properties/a".to_string(),
            message: "empty union".to_string(),
        };
        assert!(compile.is_fatal());
    }

    #[test]
    fn issue_display_marks_root() {
        let root = ValidationIssue::new("", "type", "Expected object");
        assert_eq!(root.to_string(), "(root): Expected object");

        let nested = ValidationIssue::new("/columns/1", "union", "Expected one of \"a\"");
        assert_eq!(nested.to_string(), "/columns/1: Expected one of \"a\"");
    }
}
