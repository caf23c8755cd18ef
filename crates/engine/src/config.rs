//! Engine configuration loaded from environment variables.

use std::env;
use std::fmt;
use std::str::FromStr;

use anyhow::{Context, Result};
use sea_query::{MysqlQueryBuilder, PostgresQueryBuilder, SelectStatement, SqliteQueryBuilder};
use serde::{Deserialize, Serialize};

/// SQL dialect the composed query will run against.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    /// PostgreSQL. Text search uses `ILIKE`.
    #[default]
    Postgres,
    /// MySQL / MariaDB. Collations make `LIKE` case-insensitive already.
    Mysql,
    /// SQLite. `LIKE` is case-insensitive for ASCII.
    Sqlite,
}

impl Backend {
    /// Whether pattern matching should use `ILIKE` instead of `LIKE`.
    pub fn case_insensitive_like(self) -> bool {
        matches!(self, Backend::Postgres)
    }

    /// Render a statement in this dialect.
    pub fn render(self, statement: &SelectStatement) -> String {
        match self {
            Backend::Postgres => statement.to_string(PostgresQueryBuilder),
            Backend::Mysql => statement.to_string(MysqlQueryBuilder),
            Backend::Sqlite => statement.to_string(SqliteQueryBuilder),
        }
    }
}

impl FromStr for Backend {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "postgres" | "postgresql" | "pgsql" => Ok(Backend::Postgres),
            "mysql" | "mariadb" => Ok(Backend::Mysql),
            "sqlite" => Ok(Backend::Sqlite),
            other => anyhow::bail!("unknown backend '{other}'"),
        }
    }
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Backend::Postgres => "postgres",
            Backend::Mysql => "mysql",
            Backend::Sqlite => "sqlite",
        };
        f.write_str(name)
    }
}

/// Filter engine configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct EngineConfig {
    /// Target dialect (default: postgres).
    #[serde(default)]
    pub backend: Backend,

    /// Escape `%`, `_` and `\` in user values before building LIKE
    /// patterns (default: false, so user wildcards stay live).
    #[serde(default)]
    pub escape_wildcards: bool,
}

impl EngineConfig {
    /// Load configuration from environment variables.
    ///
    /// - `GRIDFILTER_BACKEND`: `postgres`, `mysql` or `sqlite`
    /// - `GRIDFILTER_ESCAPE_WILDCARDS`: `true` or `false`
    pub fn from_env() -> Result<Self> {
        let backend = env::var("GRIDFILTER_BACKEND")
            .unwrap_or_else(|_| "postgres".to_string())
            .parse()
            .context("GRIDFILTER_BACKEND must be one of postgres, mysql, sqlite")?;

        let escape_wildcards = env::var("GRIDFILTER_ESCAPE_WILDCARDS")
            .unwrap_or_else(|_| "false".to_string())
            .trim()
            .to_lowercase()
            .parse()
            .context("GRIDFILTER_ESCAPE_WILDCARDS must be true or false")?;

        Ok(Self {
            backend,
            escape_wildcards,
        })
    }

    /// Set the backend.
    pub fn with_backend(mut self, backend: Backend) -> Self {
        self.backend = backend;
        self
    }

    /// Enable or disable LIKE wildcard escaping.
    pub fn with_escape_wildcards(mut self, escape: bool) -> Self {
        self.escape_wildcards = escape;
        self
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn backend_parses_aliases() {
        assert_eq!("pgsql".parse::<Backend>().unwrap(), Backend::Postgres);
        assert_eq!("MariaDB".parse::<Backend>().unwrap(), Backend::Mysql);
        assert_eq!(" sqlite ".parse::<Backend>().unwrap(), Backend::Sqlite);
        assert!("oracle".parse::<Backend>().is_err());
    }

    #[test]
    fn only_postgres_uses_ilike() {
        assert!(Backend::Postgres.case_insensitive_like());
        assert!(!Backend::Mysql.case_insensitive_like());
        assert!(!Backend::Sqlite.case_insensitive_like());
    }

    #[test]
    fn config_defaults() {
        let config = EngineConfig::default();
        assert_eq!(config.backend, Backend::Postgres);
        assert!(!config.escape_wildcards);
    }

    #[test]
    fn config_missing_fields_deserialize_to_defaults() {
        let config: EngineConfig = serde_json::from_str(r#"{"backend": "sqlite"}"#).unwrap();
        assert_eq!(config.backend, Backend::Sqlite);
        assert!(!config.escape_wildcards);
    }
}
