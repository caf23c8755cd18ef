//! The query handle predicates are composed onto.

use sea_query::{Alias, Asterisk, Condition, Query, SelectStatement};

use crate::config::Backend;

/// A caller-owned SELECT statement plus the table unqualified fields resolve
/// against.
///
/// The engine takes the handle by value, ANDs predicate groups onto it and
/// hands it back. It never executes it.
#[derive(Debug, Clone)]
pub struct FilterQuery {
    statement: SelectStatement,
    base_table: String,
    predicate_count: usize,
}

impl FilterQuery {
    /// `SELECT "base_table".* FROM "base_table"`.
    pub fn new(base_table: &str) -> Self {
        let mut statement = Query::select();
        statement
            .column((Alias::new(base_table), Asterisk))
            .from(Alias::new(base_table));

        Self::from_statement(statement, base_table)
    }

    /// Wrap an existing statement whose primary table is `base_table`.
    pub fn from_statement(statement: SelectStatement, base_table: impl Into<String>) -> Self {
        Self {
            statement,
            base_table: base_table.into(),
            predicate_count: 0,
        }
    }

    /// Primary table name.
    pub fn base_table(&self) -> &str {
        &self.base_table
    }

    /// Number of predicate groups composed onto the statement so far.
    pub fn predicate_count(&self) -> usize {
        self.predicate_count
    }

    pub fn statement(&self) -> &SelectStatement {
        &self.statement
    }

    pub fn into_statement(self) -> SelectStatement {
        self.statement
    }

    /// Render the statement in the given dialect with values inlined.
    pub fn to_sql(&self, backend: Backend) -> String {
        backend.render(&self.statement)
    }

    /// AND a predicate group onto the statement. Empty groups are dropped.
    pub(crate) fn and_group(mut self, group: Condition) -> Self {
        if group.is_empty() {
            return self;
        }
        self.statement.cond_where(group);
        self.predicate_count += 1;
        self
    }
}
