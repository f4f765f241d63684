//! Engine error types.
//!
//! A single caller-facing enum covers parse, catalog, constraint, type,
//! runtime and storage failures. Errors short-circuit operator streams;
//! the few places that recover (`ON CONFLICT`, `IF EXISTS`) test the error
//! class through the `is_*` helpers rather than matching variants
//! themselves.

use thiserror::Error;

use crate::object::Path;

/// Errors surfaced by the SQL engine.
#[derive(Debug, Error)]
pub enum Error {
    /// Malformed or unsupported SQL.
    #[error("parse error: {0}")]
    Parse(String),

    /// A catalog object was not found.
    #[error("{kind} not found: {name}")]
    NotFound { kind: &'static str, name: String },

    /// A catalog object already exists.
    #[error("{kind} already exists: {name}")]
    AlreadyExists { kind: &'static str, name: String },

    /// A table constraint was violated.
    #[error("{0}")]
    Constraint(String),

    /// A value had or produced the wrong type.
    #[error("type error: {0}")]
    Type(String),

    /// A field was missing from an object.
    #[error("field not found: {0}")]
    FieldNotFound(String),

    /// Expression evaluation failed at runtime.
    #[error("{0}")]
    Runtime(String),

    /// Error from the byte store.
    #[error(transparent)]
    Storage(#[from] silt_storage::StorageError),

    /// Internal sentinel used by `Take` to stop its upstream early. Never
    /// surfaced to callers: the stream root converts it to clean EOF.
    #[error("stream closed")]
    #[doc(hidden)]
    StreamClosed,
}

impl Error {
    /// Builds the primary-key conflict error for the given key paths.
    pub fn primary_key_conflict(paths: &[Path]) -> Self {
        Error::Constraint(format!(
            "PRIMARY KEY constraint error: [{}]",
            join_paths(paths)
        ))
    }

    /// Builds the unique-index conflict error for the given index paths.
    pub fn unique_conflict(paths: &[Path]) -> Self {
        Error::Constraint(format!("UNIQUE constraint error: [{}]", join_paths(paths)))
    }

    /// Builds the NOT NULL violation error for one path.
    pub fn not_null(path: &Path) -> Self {
        Error::Constraint(format!("NOT NULL constraint error: [{path}]"))
    }

    /// Builds the CHECK violation error for one check expression.
    pub fn check_failed(check: &str) -> Self {
        Error::Constraint(format!("CHECK constraint error: [{check}]"))
    }

    /// Returns whether this is a uniqueness/constraint conflict that an
    /// `ON CONFLICT` clause may recover.
    pub fn is_constraint_violation(&self) -> bool {
        matches!(self, Error::Constraint(_))
    }

    /// Returns whether this is a catalog not-found error, the class that
    /// `IF EXISTS` forms swallow.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::NotFound { .. })
    }

    /// Returns whether this is the key-not-found storage error.
    pub fn is_key_not_found(&self) -> bool {
        matches!(
            self,
            Error::Storage(silt_storage::StorageError::KeyNotFound)
        )
    }
}

fn join_paths(paths: &[Path]) -> String {
    paths
        .iter()
        .map(|p| p.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Result type for engine operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constraint_error_texts() {
        let a: Path = "a".parse().unwrap();
        let b: Path = "b".parse().unwrap();

        assert_eq!(
            Error::primary_key_conflict(&[a.clone(), b.clone()]).to_string(),
            "PRIMARY KEY constraint error: [a, b]"
        );
        assert_eq!(
            Error::unique_conflict(&[a.clone()]).to_string(),
            "UNIQUE constraint error: [a]"
        );
        assert_eq!(
            Error::not_null(&b).to_string(),
            "NOT NULL constraint error: [b]"
        );
    }

    #[test]
    fn test_error_classes() {
        assert!(Error::primary_key_conflict(&[]).is_constraint_violation());
        assert!(!Error::Parse("x".into()).is_constraint_violation());
        assert!(Error::NotFound {
            kind: "table",
            name: "t".into()
        }
        .is_not_found());
    }
}
