//! Gridfilter engine library.
//!
//! Turns the filters and search term a data grid posts into SeaQuery
//! predicates on a caller-owned SELECT statement. Nothing here talks to a
//! database: column and relation lookups go through [`SchemaInspector`] and
//! [`RelationResolver`], and the composed statement is handed back unexecuted.
//!
//! ```
//! use gridfilter_engine::{Backend, Catalog, FilterEngine, FilterKind, FilterQuery, FilterSpec};
//! use serde_json::json;
//!
//! let catalog = Catalog::new().with_table("users", ["id", "status"]);
//! let filters = FilterSpec::new().with_filter(FilterKind::Select, "status", json!("active"));
//!
//! let sql = FilterEngine::new(FilterQuery::new("users"), &catalog)
//!     .with_filters(filters)
//!     .filter()
//!     .into_query()
//!     .to_sql(Backend::Postgres);
//!
//! assert!(sql.contains(r#""users"."status" = 'active'"#));
//! ```

pub mod catalog;
pub mod config;
pub mod error;
pub mod filter;
pub mod query;

pub use catalog::{Catalog, Relation, RelationResolver, SchemaInspector, TableSchema};
pub use config::{Backend, EngineConfig};
pub use error::{FilterError, FilterResult};
pub use filter::{
    Column, FieldFilter, FilterEngine, FilterKind, FilterSpec, RelationEntry, RelationSearchMap,
    RelationTarget, TextOperator,
};
pub use query::FilterQuery;
