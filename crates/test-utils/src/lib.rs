//! Gridfilter test utilities.
//!
//! Helpers for integration testing: a sample schema catalog, grid columns,
//! SQL rendering and assertion utilities for generated queries.

use std::sync::Once;

use gridfilter_engine::{Backend, Catalog, Column, FilterEngine, FilterQuery};
use tracing_subscriber::EnvFilter;

/// Sample schema: users with posts, posts with comments, users belonging to
/// a team.
pub const SAMPLE_CATALOG_TOML: &str = r#"
[tables.users]
columns = ["id", "name", "email", "status", "active", "team_id", "created_at", "balance"]

[tables.users.relations.posts]
table = "posts"
foreign_key = "user_id"

[tables.users.relations.team]
table = "teams"
local_key = "team_id"
foreign_key = "id"

[tables.posts]
columns = ["id", "user_id", "title", "body"]

[tables.posts.relations.comments]
table = "comments"
foreign_key = "post_id"

[tables.comments]
columns = ["id", "post_id", "text"]

[tables.teams]
columns = ["id", "name"]

[tables.orders]
columns = ["id", "user_id", "status"]
"#;

/// Parse [`SAMPLE_CATALOG_TOML`].
pub fn sample_catalog() -> Catalog {
    match Catalog::from_toml_str(SAMPLE_CATALOG_TOML) {
        Ok(catalog) => catalog,
        Err(e) => panic!("sample catalog fixture is invalid: {e}"),
    }
}

/// Grid columns over `users`: name and email searchable, status not.
pub fn sample_columns() -> Vec<Column> {
    vec![
        Column::new("name").searchable(),
        Column::new("email").searchable(),
        Column::new("status"),
    ]
}

/// Engine over a fresh `SELECT "users".* FROM "users"`.
pub fn users_engine(catalog: &Catalog) -> FilterEngine<'_> {
    FilterEngine::new(FilterQuery::new("users"), catalog)
}

/// Render a query handle as PostgreSQL.
pub fn sql(query: &FilterQuery) -> String {
    query.to_sql(Backend::Postgres)
}

/// Install a test subscriber honouring `RUST_LOG`. Safe to call repeatedly.
pub fn init_tracing() {
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(
                EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
            )
            .with_test_writer()
            .try_init();
    });
}

/// Assertion helpers for generated SQL.
pub mod assert {
    /// Assert that a string contains a substring.
    pub fn contains(haystack: &str, needle: &str) {
        assert!(
            haystack.contains(needle),
            "Expected string to contain '{needle}'\nActual: {haystack}"
        );
    }

    /// Assert that a string does not contain a substring.
    pub fn not_contains(haystack: &str, needle: &str) {
        assert!(
            !haystack.contains(needle),
            "Expected string to NOT contain '{needle}'\nActual: {haystack}"
        );
    }

    /// Assert how often a substring occurs.
    pub fn occurrences(haystack: &str, needle: &str, expected: usize) {
        let actual = haystack.matches(needle).count();
        assert_eq!(
            actual, expected,
            "Expected '{needle}' {expected} time(s), found {actual}\nActual: {haystack}"
        );
    }
}
