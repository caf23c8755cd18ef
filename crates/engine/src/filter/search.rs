//! Free-text search across grid columns and related tables.

use sea_query::{Alias, Cond, Condition, Expr, Query, SimpleExpr};
use tracing::{debug, warn};

use super::engine::FilterEngine;
use super::types::{RelationEntry, RelationTarget};
use crate::catalog::Relation;

impl FilterEngine<'_> {
    /// OR the search term across searchable columns and related tables,
    /// then AND the whole group onto the query. An empty term does nothing.
    pub fn filter_contains(mut self) -> Self {
        if self.search.is_empty() {
            return self;
        }

        let mut group = self.search_columns(Cond::any());
        if !self.relation_search.is_empty() {
            group = self.search_relations(group);
        }

        debug!(
            term = %self.search,
            predicates = group.len(),
            "applying search"
        );
        self.query = self.query.and_group(group);
        self
    }

    fn search_columns(&self, mut group: Condition) -> Condition {
        let base_table = self.query.base_table();

        for column in self.columns.iter().filter(|c| c.searchable) {
            let Some(field) = column.search_field() else {
                continue;
            };

            let (table, name) = match field.split('.').collect::<Vec<_>>()[..] {
                [table, name, ..] => (table, name),
                _ => (base_table, field),
            };

            if !self.schema.has_column(table, name) {
                debug!(table, column = name, "search column not in schema; skipped");
                continue;
            }

            group = group.add(self.search_like(table, name));
        }
        group
    }

    fn search_relations(&self, mut group: Condition) -> Condition {
        let base_table = self.query.base_table();

        for (name, entry) in self.relation_search.entries() {
            let targets = match entry {
                RelationEntry::Targets(targets) => targets,
                RelationEntry::Malformed => {
                    warn!(
                        relation = %name,
                        "malformed relation search entry; remaining relations skipped"
                    );
                    break;
                }
            };

            for target in targets {
                match target {
                    RelationTarget::Column(column) => {
                        let Some(relation) = self.relations.relation(base_table, name) else {
                            debug!(relation = %name, "relation not found; skipped");
                            continue;
                        };
                        let alias = related_alias(&relation, 1);
                        let matches = self.search_like(&alias, column);
                        group = group.add(exists_related(base_table, &relation, &alias, matches));
                    }
                    RelationTarget::Nested {
                        relation: nested,
                        columns,
                    } => {
                        let resolved = self.relations.relation(base_table, name).and_then(|outer| {
                            let inner = self.relations.relation(&outer.table, nested)?;
                            Some((outer, inner))
                        });
                        let Some((outer, inner)) = resolved else {
                            debug!(
                                relation = %name,
                                nested = %nested,
                                "nested relation not found; skipped"
                            );
                            continue;
                        };

                        let outer_alias = related_alias(&outer, 1);
                        let inner_alias = related_alias(&inner, 2);
                        for column in columns {
                            let matches = self.search_like(&inner_alias, column);
                            let inner_exists =
                                exists_related(&outer_alias, &inner, &inner_alias, matches);
                            group = group.add(exists_related(
                                base_table,
                                &outer,
                                &outer_alias,
                                inner_exists,
                            ));
                        }
                    }
                }
            }
        }
        group
    }

    fn search_like(&self, table: &str, column: &str) -> SimpleExpr {
        let col = Expr::col((Alias::new(table), Alias::new(column)));
        self.like(col, self.pattern("%", &self.search, "%"))
    }
}

/// Subquery alias for a related table at the given nesting depth. Distinct
/// from the outer table even when a relation points back at its own table.
fn related_alias(relation: &Relation, depth: usize) -> String {
    format!("{}_rel{depth}", relation.table)
}

/// `EXISTS (SELECT 1 FROM related AS alias WHERE alias.fk = parent.lk AND condition)`.
fn exists_related(
    parent: &str,
    relation: &Relation,
    alias: &str,
    condition: SimpleExpr,
) -> SimpleExpr {
    let mut subquery = Query::select();
    subquery
        .expr(Expr::val(1))
        .from_as(Alias::new(&relation.table), Alias::new(alias))
        .and_where(
            Expr::col((Alias::new(alias), Alias::new(&relation.foreign_key)))
                .equals((Alias::new(parent), Alias::new(&relation.local_key))),
        )
        .and_where(condition);
    Expr::exists(subquery)
}
