//! Schema and relation metadata consulted while building search predicates.
//!
//! The engine never introspects a live database. Callers hand it something
//! that answers two questions: does `table.column` exist, and what does the
//! relation `name` declared on `table` point at. [`Catalog`] is the in-memory
//! answer, loadable from TOML or YAML.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::FilterResult;

/// Column existence check.
pub trait SchemaInspector {
    /// Whether `table` has a column named `column`.
    fn has_column(&self, table: &str, column: &str) -> bool;
}

/// Relation lookup.
pub trait RelationResolver {
    /// Resolve the relation `name` declared on `table`, if any.
    fn relation(&self, table: &str, name: &str) -> Option<Relation>;
}

/// A declared association from a parent table to a related table.
///
/// Rows are related when `related.foreign_key = parent.local_key`. A
/// belongs-to relation simply swaps which side holds the id.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Relation {
    /// Related table name.
    pub table: String,

    /// Column on the parent table.
    #[serde(default = "default_local_key")]
    pub local_key: String,

    /// Column on the related table.
    pub foreign_key: String,
}

fn default_local_key() -> String {
    "id".to_string()
}

impl Relation {
    /// Has-many / has-one style relation keyed on the parent's `id`.
    pub fn new(table: impl Into<String>, foreign_key: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            local_key: default_local_key(),
            foreign_key: foreign_key.into(),
        }
    }

    /// Override the parent-side key.
    pub fn with_local_key(mut self, local_key: impl Into<String>) -> Self {
        self.local_key = local_key.into();
        self
    }
}

/// Columns and relations of one table.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct TableSchema {
    #[serde(default)]
    pub columns: Vec<String>,

    #[serde(default)]
    pub relations: BTreeMap<String, Relation>,
}

/// In-memory schema catalog.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Catalog {
    #[serde(default)]
    pub tables: BTreeMap<String, TableSchema>,
}

impl Catalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a catalog from TOML.
    ///
    /// ```toml
    /// [tables.users]
    /// columns = ["id", "name"]
    ///
    /// [tables.users.relations.posts]
    /// table = "posts"
    /// foreign_key = "user_id"
    /// ```
    pub fn from_toml_str(input: &str) -> FilterResult<Self> {
        Ok(toml::from_str(input)?)
    }

    /// Parse a catalog from YAML (same layout as TOML).
    pub fn from_yaml_str(input: &str) -> FilterResult<Self> {
        Ok(serde_yml::from_str(input)?)
    }

    /// Declare a table with its columns, replacing any earlier column list.
    pub fn with_table<I, S>(mut self, table: &str, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let entry = self.tables.entry(table.to_string()).or_default();
        entry.columns = columns.into_iter().map(Into::into).collect();
        self
    }

    /// Declare a relation `name` on `table`.
    pub fn with_relation(mut self, table: &str, name: &str, relation: Relation) -> Self {
        self.tables
            .entry(table.to_string())
            .or_default()
            .relations
            .insert(name.to_string(), relation);
        self
    }
}

impl SchemaInspector for Catalog {
    fn has_column(&self, table: &str, column: &str) -> bool {
        self.tables
            .get(table)
            .is_some_and(|t| t.columns.iter().any(|c| c == column))
    }
}

impl RelationResolver for Catalog {
    fn relation(&self, table: &str, name: &str) -> Option<Relation> {
        self.tables.get(table)?.relations.get(name).cloned()
    }
}
