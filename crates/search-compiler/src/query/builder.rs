//! The query value search builders compose onto.
//!
//! A [`Query`] holds a root table binding, optional joins, an AND-combined
//! list of filters, ordering terms, a projection and an optional row cap.
//! Every modifier consumes the query and returns the augmented one; callers
//! that need to keep the original clone it first, which is what the
//! compiler entry points do.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{SearchError, SearchResult};

use super::fragment::{SqlFragment, SqlParam, number_placeholders};
use super::qualifier::{Qualifiers, quote_ident};

/// A table bound to an alias.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Binding {
    /// Table name.
    pub table: String,
    /// Alias used by qualifiers.
    pub alias: String,
}

/// Join flavour.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinKind {
    /// `INNER JOIN`.
    Inner,
    /// `LEFT JOIN`.
    Left,
}

impl fmt::Display for JoinKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JoinKind::Inner => write!(f, "INNER JOIN"),
            JoinKind::Left => write!(f, "LEFT JOIN"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
struct Join {
    kind: JoinKind,
    binding: Binding,
    on: SqlFragment,
}

/// Sort direction of an ordering term.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    /// Ascending.
    Asc,
    /// Descending.
    Desc,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Asc => write!(f, "ASC"),
            Direction::Desc => write!(f, "DESC"),
        }
    }
}

/// One `ORDER BY` term.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderTerm {
    /// The ordering expression.
    pub expr: SqlFragment,
    /// Its direction.
    pub direction: Direction,
}

/// An in-progress query over one or more bound aliases.
#[derive(Debug, Clone, PartialEq)]
pub struct Query {
    root: Binding,
    joins: Vec<Join>,
    filters: Vec<SqlFragment>,
    order: Vec<OrderTerm>,
    merged: Vec<(String, SqlFragment)>,
    limit: Option<i64>,
}

impl Query {
    /// Starts a query selecting from `table AS alias`.
    pub fn table(table: impl Into<String>, alias: impl Into<String>) -> Self {
        Self {
            root: Binding {
                table: table.into(),
                alias: alias.into(),
            },
            joins: Vec::new(),
            filters: Vec::new(),
            order: Vec::new(),
            merged: Vec::new(),
            limit: None,
        }
    }

    /// Binds another table through a join.
    pub fn join(
        mut self,
        kind: JoinKind,
        table: impl Into<String>,
        alias: impl Into<String>,
        on: SqlFragment,
    ) -> Self {
        self.joins.push(Join {
            kind,
            binding: Binding {
                table: table.into(),
                alias: alias.into(),
            },
            on,
        });
        self
    }

    /// Adds a filter, AND-combined with existing filters.
    pub fn filter(mut self, predicate: SqlFragment) -> Self {
        debug_assert!(predicate.is_aligned(), "misaligned filter: {}", predicate.sql);
        self.filters.push(predicate);
        self
    }

    /// Appends an ordering term after any existing ones.
    pub fn order_by(mut self, expr: SqlFragment, direction: Direction) -> Self {
        debug_assert!(expr.is_aligned(), "misaligned order: {}", expr.sql);
        self.order.push(OrderTerm { expr, direction });
        self
    }

    /// Merges a computed column into the projection under `key`.
    ///
    /// A later merge under the same key replaces the earlier one.
    pub fn select_merge(mut self, key: impl Into<String>, expr: SqlFragment) -> Self {
        let key = key.into();
        self.merged.retain(|(existing, _)| *existing != key);
        self.merged.push((key, expr));
        self
    }

    /// Caps the number of returned rows.
    pub fn limit(mut self, limit: i64) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Returns all bindings, root first.
    pub fn bindings(&self) -> Vec<&Binding> {
        std::iter::once(&self.root)
            .chain(self.joins.iter().map(|j| &j.binding))
            .collect()
    }

    /// Returns true if `alias` is bound.
    pub fn has_binding(&self, alias: &str) -> bool {
        self.bindings().iter().any(|b| b.alias == alias)
    }

    /// Checks that every qualifier references a bound alias.
    pub fn check_bindings(&self, qualifiers: &Qualifiers) -> SearchResult<()> {
        match qualifiers.iter().find(|q| !self.has_binding(q.alias())) {
            Some(unbound) => Err(SearchError::UnknownBinding {
                alias: unbound.alias().to_string(),
            }),
            None => Ok(()),
        }
    }

    /// The filters, in the order they were added.
    pub fn filters(&self) -> &[SqlFragment] {
        &self.filters
    }

    /// The ordering terms, in priority order.
    pub fn order_terms(&self) -> &[OrderTerm] {
        &self.order
    }

    /// The merged projection columns.
    pub fn merged_columns(&self) -> impl Iterator<Item = (&str, &SqlFragment)> {
        self.merged.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// The row cap, if any.
    pub fn row_limit(&self) -> Option<i64> {
        self.limit
    }

    /// Assembles the whole statement as one fragment with `?` placeholders.
    pub fn to_fragment(&self) -> SqlFragment {
        let root_alias = quote_ident(&self.root.alias);

        let mut projection = vec![SqlFragment::new(format!("{}.*", root_alias))];
        for (key, expr) in &self.merged {
            projection.push(expr.clone().wrap("(", &format!(") AS {}", quote_ident(key))));
        }

        let mut stmt = SqlFragment::join(projection, ", ")
            .wrap("SELECT ", "")
            .push_sql(&format!(
                " FROM {} AS {}",
                quote_ident(&self.root.table),
                root_alias
            ));

        for join in &self.joins {
            stmt = stmt
                .push_sql(&format!(
                    " {} {} AS {} ON ",
                    join.kind,
                    quote_ident(&join.binding.table),
                    quote_ident(&join.binding.alias)
                ))
                .concat(join.on.clone());
        }

        if !self.filters.is_empty() {
            let wheres = self.filters.iter().cloned().map(|f| f.wrap("(", ")"));
            stmt = stmt
                .push_sql(" WHERE ")
                .concat(SqlFragment::join(wheres, " AND "));
        }

        if !self.order.is_empty() {
            let terms = self
                .order
                .iter()
                .map(|t| t.expr.clone().push_sql(&format!(" {}", t.direction)));
            stmt = stmt
                .push_sql(" ORDER BY ")
                .concat(SqlFragment::join(terms, ", "));
        }

        if let Some(limit) = self.limit {
            stmt = stmt
                .push_sql(" LIMIT ")
                .concat(SqlFragment::param(SqlParam::Integer(limit)));
        }

        stmt
    }

    /// Renders the statement with PostgreSQL `$N` placeholders.
    pub fn to_sql(&self) -> (String, Vec<SqlParam>) {
        let stmt = self.to_fragment();
        let (sql, last) = number_placeholders(&stmt.sql, 0);
        tracing::trace!(
            filters = self.filters.len(),
            order_terms = self.order.len(),
            params = last,
            "rendered query"
        );
        (sql, stmt.params)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::Qualifier;

    #[test]
    fn test_plain_select() {
        let (sql, params) = Query::table("posts", "p").to_sql();
        assert_eq!(sql, "SELECT \"p\".* FROM \"posts\" AS \"p\"");
        assert!(params.is_empty());
    }

    #[test]
    fn test_full_statement_numbering() {
        let query = Query::table("posts", "p")
            .join(
                JoinKind::Inner,
                "authors",
                "a",
                SqlFragment::new("\"a\".\"id\" = \"p\".\"author_id\""),
            )
            .select_merge(
                "score",
                SqlFragment::with_params("1 + ?", vec![SqlParam::Integer(1)]),
            )
            .filter(SqlFragment::with_params(
                "\"p\".\"title\" = ?",
                vec![SqlParam::text("x")],
            ))
            .filter(SqlFragment::with_params(
                "\"a\".\"name\" = ?",
                vec![SqlParam::text("y")],
            ))
            .order_by(
                SqlFragment::with_params(
                    "similarity(\"p\".\"title\", ?)",
                    vec![SqlParam::text("z")],
                ),
                Direction::Desc,
            )
            .limit(10);

        let (sql, params) = query.to_sql();
        assert_eq!(
            sql,
            "SELECT \"p\".*, (1 + $1) AS \"score\" FROM \"posts\" AS \"p\" \
             INNER JOIN \"authors\" AS \"a\" ON \"a\".\"id\" = \"p\".\"author_id\" \
             WHERE (\"p\".\"title\" = $2) AND (\"a\".\"name\" = $3) \
             ORDER BY similarity(\"p\".\"title\", $4) DESC LIMIT $5"
        );
        assert_eq!(
            params,
            vec![
                SqlParam::Integer(1),
                SqlParam::text("x"),
                SqlParam::text("y"),
                SqlParam::text("z"),
                SqlParam::Integer(10),
            ]
        );
    }

    #[test]
    fn test_select_merge_replaces_key() {
        let query = Query::table("posts", "p")
            .select_merge("d", SqlFragment::new("1"))
            .select_merge("d", SqlFragment::new("2"));
        let merged: Vec<_> = query.merged_columns().collect();
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].1.sql, "2");
    }

    #[test]
    fn test_check_bindings() {
        let query = Query::table("posts", "p").join(
            JoinKind::Left,
            "comments",
            "c",
            SqlFragment::new("true"),
        );
        assert!(query.has_binding("c"));

        let ok: Qualifiers = vec![
            Qualifier::column("p", "title"),
            Qualifier::column("c", "body"),
        ]
        .into();
        assert!(query.check_bindings(&ok).is_ok());

        let bad: Qualifiers = Qualifier::column("x", "title").into();
        assert_eq!(
            query.check_bindings(&bad),
            Err(SearchError::UnknownBinding {
                alias: "x".to_string()
            })
        );
    }
}
