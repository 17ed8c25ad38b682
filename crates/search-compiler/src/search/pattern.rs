//! Pattern-match search: `LIKE`, `ILIKE` and `SIMILAR TO`.
//!
//! The term is bound as-is. Wildcards and metacharacters in it keep their
//! pattern meaning, so callers pass user input through [`sanitize`] first
//! and add their own `%`/`_` where wanted.

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;

use crate::pipeline::QueryPipeline;
use crate::query::{Qualifiers, Query, SqlFragment, SqlParam};

static PATTERN_META: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[%_\\]").expect("static pattern"));

/// Which pattern operator to match with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PatternMode {
    /// Case-sensitive `LIKE`.
    Like,
    /// Case-insensitive `ILIKE`.
    ILike,
    /// SQL-standard regular expression, `SIMILAR TO`.
    SimilarTo,
}

impl PatternMode {
    /// The SQL operator for this mode.
    pub fn operator(&self) -> &'static str {
        match self {
            PatternMode::Like => "LIKE",
            PatternMode::ILike => "ILIKE",
            PatternMode::SimilarTo => "SIMILAR TO",
        }
    }
}

impl fmt::Display for PatternMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PatternMode::Like => write!(f, "like"),
            PatternMode::ILike => write!(f, "ilike"),
            PatternMode::SimilarTo => write!(f, "similar_to"),
        }
    }
}

/// Removes `%`, `_` and `\` from a term.
pub fn sanitize(term: &str) -> String {
    PATTERN_META.replace_all(term, "").into_owned()
}

/// Builds `false OR q1 <op> ? OR q2 <op> ? ...`.
pub fn predicate(mode: PatternMode, qualifiers: &Qualifiers, term: &str) -> SqlFragment {
    qualifiers
        .fragments()
        .into_iter()
        .fold(SqlFragment::falsy(), |acc, qualifier| {
            let clause = qualifier
                .push_sql(&format!(" {} ", mode.operator()))
                .concat(SqlFragment::param(SqlParam::text(term)));
            acc.or(clause)
        })
}

/// Adds the pattern-match disjunction as a filter.
pub fn build(query: Query, mode: PatternMode, qualifiers: &Qualifiers, term: &str) -> Query {
    query.apply_case(predicate(mode, qualifiers, term), Query::filter)
}
