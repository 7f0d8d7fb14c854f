//! Walk-through findings.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Severity of an [`Advice`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AdviceStatus {
    Error,
    Warning,
}

/// Stable advice codes.
///
/// The numeric values are part of the external contract: the hundreds
/// digit groups codes by object kind (2xx statement, 4xx column,
/// 6xx table, 7xx database, 8xx index, 19xx schema).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AdviceCode {
    Internal,
    StatementCreateTableAs,
    ColumnNotExists,
    ColumnExists,
    InvalidColumnDefault,
    AutoIncrementExists,
    SetNullDefaultForNotNullColumn,
    OnUpdateColumnNotDatetimeOrTimestamp,
    TableNotExists,
    TableExists,
    NotCurrentDatabase,
    IndexExists,
    PrimaryKeyExists,
    IndexEmptyKeys,
    IndexNotExists,
    SpatialIndexKeyNullable,
    SchemaNotExists,
}

impl AdviceCode {
    const TABLE: [(Self, i32); 17] = [
        (Self::Internal, 1),
        (Self::StatementCreateTableAs, 205),
        (Self::ColumnNotExists, 405),
        (Self::ColumnExists, 412),
        (Self::InvalidColumnDefault, 423),
        (Self::AutoIncrementExists, 426),
        (Self::SetNullDefaultForNotNullColumn, 427),
        (Self::OnUpdateColumnNotDatetimeOrTimestamp, 428),
        (Self::TableNotExists, 604),
        (Self::TableExists, 607),
        (Self::NotCurrentDatabase, 702),
        (Self::IndexExists, 805),
        (Self::PrimaryKeyExists, 806),
        (Self::IndexEmptyKeys, 807),
        (Self::IndexNotExists, 809),
        (Self::SpatialIndexKeyNullable, 811),
        (Self::SchemaNotExists, 1901),
    ];

    /// Returns the numeric code.
    #[must_use]
    pub fn code(self) -> i32 {
        Self::TABLE
            .iter()
            .find(|(c, _)| *c == self)
            .map_or(1, |(_, n)| *n)
    }

    /// Looks up a code by its numeric value.
    #[must_use]
    pub fn from_code(code: i32) -> Option<Self> {
        Self::TABLE.iter().find(|(_, n)| *n == code).map(|(c, _)| *c)
    }
}

impl fmt::Display for AdviceCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

impl Serialize for AdviceCode {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_i32(self.code())
    }
}

impl<'de> Deserialize<'de> for AdviceCode {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let code = i32::deserialize(deserializer)?;
        Self::from_code(code)
            .ok_or_else(|| serde::de::Error::custom(format!("unknown advice code {code}")))
    }
}

/// Source position of an advice.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Position {
    /// 1-based line.
    pub line: usize,
}

/// A single classified validation finding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Advice {
    pub status: AdviceStatus,
    pub code: AdviceCode,
    pub title: String,
    pub content: String,
    pub position: Position,
}

impl Advice {
    /// Creates an error advice. The title is derived from the code.
    #[must_use]
    pub fn error(code: AdviceCode, content: impl Into<String>, line: usize) -> Self {
        Self::new(AdviceStatus::Error, code, content, line)
    }

    /// Creates a warning advice.
    #[must_use]
    pub fn warning(code: AdviceCode, content: impl Into<String>, line: usize) -> Self {
        Self::new(AdviceStatus::Warning, code, content, line)
    }

    fn new(status: AdviceStatus, code: AdviceCode, content: impl Into<String>, line: usize) -> Self {
        Self {
            status,
            code,
            title: title_for(code).to_string(),
            content: content.into(),
            position: Position { line },
        }
    }

    /// Returns true for error severity.
    #[must_use]
    pub const fn is_error(&self) -> bool {
        matches!(self.status, AdviceStatus::Error)
    }
}

impl fmt::Display for Advice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let status = match self.status {
            AdviceStatus::Error => "ERROR",
            AdviceStatus::Warning => "WARNING",
        };
        write!(
            f,
            "{status} [{}] line {}: {}",
            self.code, self.position.line, self.content
        )
    }
}

fn title_for(code: AdviceCode) -> &'static str {
    match code {
        AdviceCode::Internal => "Internal error",
        AdviceCode::StatementCreateTableAs => "CREATE TABLE AS is not supported",
        AdviceCode::ColumnNotExists => "Column does not exist",
        AdviceCode::ColumnExists => "Column already exists",
        AdviceCode::InvalidColumnDefault => "Invalid column default",
        AdviceCode::AutoIncrementExists => "Auto-increment column exists",
        AdviceCode::SetNullDefaultForNotNullColumn => "NULL default for NOT NULL column",
        AdviceCode::OnUpdateColumnNotDatetimeOrTimestamp => "Invalid ON UPDATE column",
        AdviceCode::TableNotExists => "Table does not exist",
        AdviceCode::TableExists => "Table already exists",
        AdviceCode::NotCurrentDatabase => "Not the current database",
        AdviceCode::IndexExists => "Index already exists",
        AdviceCode::PrimaryKeyExists => "Primary key already exists",
        AdviceCode::IndexEmptyKeys => "Index has empty keys",
        AdviceCode::IndexNotExists => "Index does not exist",
        AdviceCode::SpatialIndexKeyNullable => "Nullable spatial index key",
        AdviceCode::SchemaNotExists => "Schema does not exist",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes_are_stable() {
        assert_eq!(AdviceCode::TableExists.code(), 607);
        assert_eq!(AdviceCode::SpatialIndexKeyNullable.code(), 811);
        assert_eq!(AdviceCode::SchemaNotExists.code(), 1901);
        assert_eq!(AdviceCode::from_code(805), Some(AdviceCode::IndexExists));
        assert_eq!(AdviceCode::from_code(999), None);
    }

    #[test]
    fn test_codes_are_unique() {
        for (i, (_, a)) in AdviceCode::TABLE.iter().enumerate() {
            for (_, b) in &AdviceCode::TABLE[i + 1..] {
                assert_ne!(a, b);
            }
        }
    }

    #[test]
    fn test_advice_json() {
        let advice = Advice::error(AdviceCode::TableExists, "Table `t` already exists", 3);
        let json = serde_json::to_value(&advice).unwrap();
        assert_eq!(json["status"], "ERROR");
        assert_eq!(json["code"], 607);
        assert_eq!(json["position"]["line"], 3);
        let back: Advice = serde_json::from_value(json).unwrap();
        assert_eq!(back, advice);
    }

    #[test]
    fn test_display() {
        let advice = Advice::warning(AdviceCode::NotCurrentDatabase, "nope", 1);
        assert_eq!(advice.to_string(), "WARNING [702] line 1: nope");
        assert!(!advice.is_error());
    }
}
