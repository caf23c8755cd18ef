//! Filter engine using SeaQuery.
//!
//! Composes grid filters and free-text search onto a [`FilterQuery`]:
//! - one AND group per filter kind, one predicate per posted field
//! - one OR group for the search term across columns and relations
//! - ILIKE on PostgreSQL, LIKE elsewhere; user wildcards are escaped only
//!   when [`EngineConfig::escape_wildcards`] is set

use sea_query::extension::postgres::PgExpr;
use sea_query::{Alias, Cond, Condition, Expr, LikeExpr, SimpleExpr};
use tracing::debug;

use super::normalize::{FieldFilter, NumberRange, Scalar};
use super::types::{Column, FilterGroup, FilterSpec, RelationSearchMap, TextOperator};
use crate::catalog::{RelationResolver, SchemaInspector};
use crate::config::{Backend, EngineConfig};
use crate::query::FilterQuery;

/// Applies a [`FilterSpec`] and a search term to a query.
///
/// Configuration setters only assign; nothing is validated until
/// [`filter`](Self::filter) or [`filter_contains`](Self::filter_contains)
/// runs. One engine serves one request.
pub struct FilterEngine<'a> {
    pub(super) query: FilterQuery,
    pub(super) schema: &'a dyn SchemaInspector,
    pub(super) relations: &'a dyn RelationResolver,
    pub(super) columns: Vec<Column>,
    pub(super) search: String,
    pub(super) filters: FilterSpec,
    pub(super) relation_search: RelationSearchMap,
    pub(super) config: EngineConfig,
}

impl<'a> FilterEngine<'a> {
    /// Create an engine over `query`, resolving columns and relations
    /// through `catalog`.
    pub fn new<C>(query: FilterQuery, catalog: &'a C) -> Self
    where
        C: SchemaInspector + RelationResolver,
    {
        Self {
            query,
            schema: catalog,
            relations: catalog,
            columns: Vec::new(),
            search: String::new(),
            filters: FilterSpec::default(),
            relation_search: RelationSearchMap::default(),
            config: EngineConfig::default(),
        }
    }

    /// Set the grid columns considered by free-text search.
    pub fn with_columns(mut self, columns: Vec<Column>) -> Self {
        self.columns = columns;
        self
    }

    /// Set the free-text search term.
    pub fn with_search(mut self, search: impl Into<String>) -> Self {
        self.search = search.into();
        self
    }

    /// Set the filters to apply.
    pub fn with_filters(mut self, filters: FilterSpec) -> Self {
        self.filters = filters;
        self
    }

    /// Set the related tables searched by free-text search.
    pub fn with_relation_search(mut self, relation_search: RelationSearchMap) -> Self {
        self.relation_search = relation_search;
        self
    }

    pub fn with_config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    pub fn query(&self) -> &FilterQuery {
        &self.query
    }

    pub fn into_query(self) -> FilterQuery {
        self.query
    }

    /// Apply every filter group, ANDing one parenthesized group per kind.
    pub fn filter(mut self) -> Self {
        let groups: Vec<Condition> = self
            .filters
            .groups()
            .iter()
            .map(|group| self.build_group(group))
            .collect();

        self.query = groups
            .into_iter()
            .fold(self.query, |query, group| query.and_group(group));
        self
    }

    fn build_group(&self, group: &FilterGroup) -> Condition {
        group
            .fields
            .iter()
            .fold(Cond::all(), |cond, (field, raw)| {
                match FieldFilter::normalize(group.kind, field, raw, &self.filters) {
                    Some(filter) => {
                        debug!(kind = %group.kind, field = filter.field(), "applying filter");
                        self.apply(cond, filter)
                    }
                    None => {
                        debug!(kind = %group.kind, field = %field, "filter adds no constraint");
                        cond
                    }
                }
            })
    }

    fn apply(&self, cond: Condition, filter: FieldFilter) -> Condition {
        match filter {
            FieldFilter::DateRange { field, start, end } => {
                cond.add(self.column(&field).between(start, end))
            }
            FieldFilter::MultiSelect { field, values } => {
                self.filter_multi_select(cond, &field, values)
            }
            FieldFilter::Select { field, value } => self.filter_select(cond, &field, value),
            FieldFilter::Boolean { field, value } => cond.add(self.column(&field).eq(value)),
            FieldFilter::InputText {
                field,
                operator,
                value,
            } => self.filter_input_text(cond, &field, operator, &value),
            FieldFilter::Number { field, range } => self.filter_number(cond, &field, range),
        }
    }

    fn filter_multi_select(&self, cond: Condition, field: &str, values: Vec<Scalar>) -> Condition {
        let values: Vec<sea_query::Value> = values.into_iter().map(Into::into).collect();
        cond.add(self.column(field).is_in(values))
    }

    fn filter_select(&self, cond: Condition, field: &str, value: Scalar) -> Condition {
        cond.add(self.column(field).eq(sea_query::Value::from(value)))
    }

    fn filter_input_text(
        &self,
        cond: Condition,
        field: &str,
        operator: TextOperator,
        value: &str,
    ) -> Condition {
        let col = self.column(field);
        match operator {
            TextOperator::Is => cond.add(col.eq(value)),
            TextOperator::IsNot => cond.add(col.ne(value)),
            TextOperator::StartsWith => cond.add(self.like(col, self.pattern("", value, "%"))),
            TextOperator::EndsWith => cond.add(self.like(col, self.pattern("%", value, ""))),
            TextOperator::Contains => cond.add(self.like(col, self.pattern("%", value, "%"))),
            TextOperator::ContainsNot => {
                cond.add(self.not_like(col, self.pattern("%", value, "%")))
            }
            TextOperator::IsEmpty => {
                cond.add(Cond::any().add(col.clone().eq("")).add(col.is_null()))
            }
            TextOperator::IsNotEmpty => {
                cond.add(Cond::all().add(col.clone().ne("")).add(col.is_not_null()))
            }
            TextOperator::IsNull => cond.add(col.is_null()),
            TextOperator::IsNotNull => cond.add(col.is_not_null()),
            TextOperator::IsBlank => cond.add(col.eq("")),
            TextOperator::IsNotBlank => {
                cond.add(Cond::any().add(col.clone().ne("")).add(col.is_null()))
            }
        }
    }

    fn filter_number(&self, cond: Condition, field: &str, range: NumberRange) -> Condition {
        let col = self.column(field);
        match range {
            NumberRange::AtLeast(start) => cond.add(col.gte(start)),
            NumberRange::AtMost(end) => cond.add(col.lte(end)),
            NumberRange::Between(start, end) => cond.add(col.between(
                sea_query::Value::from(start),
                sea_query::Value::from(end),
            )),
        }
    }

    /// Column expression for a filter field. Dotted fields name their table;
    /// plain fields belong to the base table.
    fn column(&self, field: &str) -> Expr {
        match field.split_once('.') {
            Some((table, column)) => Expr::col((Alias::new(table), Alias::new(column))),
            None => Expr::col((Alias::new(self.query.base_table()), Alias::new(field))),
        }
    }

    /// Build a LIKE pattern around `value`, escaping its wildcards when
    /// configured to.
    pub(super) fn pattern(&self, prefix: &str, value: &str, suffix: &str) -> String {
        if self.config.escape_wildcards {
            format!("{prefix}{}{suffix}", escape_like_wildcards(value))
        } else {
            format!("{prefix}{value}{suffix}")
        }
    }

    pub(super) fn like(&self, col: Expr, pattern: String) -> SimpleExpr {
        let pattern = self.like_expr(pattern);
        if self.config.backend.case_insensitive_like() {
            col.ilike(pattern)
        } else {
            col.like(pattern)
        }
    }

    fn not_like(&self, col: Expr, pattern: String) -> SimpleExpr {
        let pattern = self.like_expr(pattern);
        if self.config.backend.case_insensitive_like() {
            col.not_ilike(pattern)
        } else {
            col.not_like(pattern)
        }
    }

    /// SQLite has no default escape character, so name it explicitly.
    fn like_expr(&self, pattern: String) -> LikeExpr {
        let expr = LikeExpr::new(pattern);
        if self.config.escape_wildcards && self.config.backend == Backend::Sqlite {
            expr.escape('\\')
        } else {
            expr
        }
    }
}

/// Escape SQL LIKE wildcard characters (`%`, `_`, `\`) in a value.
pub(super) fn escape_like_wildcards(value: &str) -> String {
    value
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_")
}
