//! Database engine identifiers.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::SchemaError;

/// A database engine. Dialect implementations register under one or
/// more of these keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Engine {
    Mysql,
    Mariadb,
    Tidb,
    Oceanbase,
    Postgres,
    Sqlite,
    Mssql,
    Oracle,
    Clickhouse,
    Snowflake,
    Redshift,
    Spanner,
    Mongodb,
    Redis,
}

impl Engine {
    /// Every known engine.
    pub const ALL: [Self; 14] = [
        Self::Mysql,
        Self::Mariadb,
        Self::Tidb,
        Self::Oceanbase,
        Self::Postgres,
        Self::Sqlite,
        Self::Mssql,
        Self::Oracle,
        Self::Clickhouse,
        Self::Snowflake,
        Self::Redshift,
        Self::Spanner,
        Self::Mongodb,
        Self::Redis,
    ];

    /// Returns the lower-case name of the engine.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Mysql => "mysql",
            Self::Mariadb => "mariadb",
            Self::Tidb => "tidb",
            Self::Oceanbase => "oceanbase",
            Self::Postgres => "postgres",
            Self::Sqlite => "sqlite",
            Self::Mssql => "mssql",
            Self::Oracle => "oracle",
            Self::Clickhouse => "clickhouse",
            Self::Snowflake => "snowflake",
            Self::Redshift => "redshift",
            Self::Spanner => "spanner",
            Self::Mongodb => "mongodb",
            Self::Redis => "redis",
        }
    }

    /// Returns the identifier quote character used by the engine, or
    /// `None` for engines without SQL identifiers.
    #[must_use]
    pub const fn identifier_quote(self) -> Option<char> {
        match self {
            Self::Mysql | Self::Mariadb | Self::Tidb | Self::Oceanbase | Self::Spanner => {
                Some('`')
            }
            Self::Clickhouse
            | Self::Mssql
            | Self::Oracle
            | Self::Postgres
            | Self::Redshift
            | Self::Sqlite
            | Self::Snowflake => Some('"'),
            Self::Mongodb | Self::Redis => None,
        }
    }
}

impl fmt::Display for Engine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Engine {
    type Err = SchemaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|e| e.as_str() == lower)
            .ok_or(SchemaError::UnknownEngine(lower))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_str_is_case_insensitive() {
        assert_eq!("MySQL".parse::<Engine>().unwrap(), Engine::Mysql);
        assert_eq!(" postgres ".parse::<Engine>().unwrap(), Engine::Postgres);
        assert!("db2".parse::<Engine>().is_err());
    }

    #[test]
    fn test_display_round_trips() {
        for engine in Engine::ALL {
            assert_eq!(engine.to_string().parse::<Engine>().unwrap(), engine);
        }
    }

    #[test]
    fn test_identifier_quote() {
        assert_eq!(Engine::Mysql.identifier_quote(), Some('`'));
        assert_eq!(Engine::Postgres.identifier_quote(), Some('"'));
        assert_eq!(Engine::Redis.identifier_quote(), None);
    }

    #[test]
    fn test_serde_name() {
        assert_eq!(serde_json::to_string(&Engine::Oceanbase).unwrap(), "\"OCEANBASE\"");
    }
}
