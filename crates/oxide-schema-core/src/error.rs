//! Error types for the schema engine.

use crate::engine::Engine;

/// Structural errors. Any of these aborts the whole operation; nothing is
/// partially applied.
#[derive(Debug, thiserror::Error)]
pub enum SchemaError {
    /// The input text could not be parsed.
    #[error("Syntax error at line {line}: {message}")]
    Syntax {
        /// Parser message.
        message: String,
        /// 1-based line of the offending token.
        line: usize,
    },

    /// The engine name is not recognized.
    #[error("Unknown engine: {0}")]
    UnknownEngine(String),

    /// No dialect is registered for the engine.
    #[error("Unsupported engine: {0}")]
    UnsupportedEngine(Engine),

    /// A dialect was registered twice for the same engine.
    #[error("Dialect already registered for engine {0}")]
    DuplicateDialect(Engine),

    /// The same object was declared twice.
    #[error("Multiple {kind} names found: {name}")]
    DuplicateObject {
        /// Object kind (`table`, `column`, `index`, ...).
        kind: &'static str,
        /// The repeated name.
        name: String,
    },

    /// Statements name more than one database.
    #[error("Multiple database names found: {first}, {second}")]
    MultipleDatabases {
        /// The first database name seen.
        first: String,
        /// The conflicting name.
        second: String,
    },

    /// A partition clause is inconsistent.
    #[error("Invalid partition: {0}")]
    InvalidPartition(String),

    /// The construct cannot be expressed for the target dialect.
    #[error("Unsupported: {0}")]
    Unsupported(String),

    /// An argument is outside the accepted range.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// An internal invariant does not hold.
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// Serialization/deserialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl SchemaError {
    /// Shorthand for [`SchemaError::DuplicateObject`].
    #[must_use]
    pub fn duplicate(kind: &'static str, name: impl Into<String>) -> Self {
        Self::DuplicateObject {
            kind,
            name: name.into(),
        }
    }
}

/// Result type for schema engine operations.
pub type Result<T> = std::result::Result<T, SchemaError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_messages() {
        let err = SchemaError::duplicate("table", "t1");
        assert_eq!(err.to_string(), "Multiple table names found: t1");

        let err = SchemaError::MultipleDatabases {
            first: "a".into(),
            second: "b".into(),
        };
        assert_eq!(err.to_string(), "Multiple database names found: a, b");

        let err = SchemaError::UnsupportedEngine(Engine::Redis);
        assert_eq!(err.to_string(), "Unsupported engine: redis");
    }
}
