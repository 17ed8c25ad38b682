//! Trigram similarity search (`pg_trgm`).
//!
//! Each similarity type pairs an exact scoring function with the boolean
//! operator that compares the same score against the `pg_trgm` threshold
//! setting. The operator can use a trigram index, so it is the pre-filter;
//! the function is computed per row and only used for ordering.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::config::CompilerConfig;
use crate::error::SearchResult;
use crate::options::{
    OptionChoice, SearchConfig, reject_unknown_keys, validate_bool, validate_choice,
    validate_positive_int,
};
use crate::pipeline::QueryPipeline;
use crate::query::{Qualifiers, Query, SqlFragment, SqlParam};

use super::SortOrder;

/// Which trigram similarity to compute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SimilarityType {
    /// Whole-string similarity: `similarity` / `%`.
    Full,
    /// Best match of the term within the text: `word_similarity` / `<%`.
    Word,
    /// Like `Word`, aligned to word boundaries:
    /// `strict_word_similarity` / `<<%`.
    Strict,
}

impl SimilarityType {
    /// The scoring function name.
    pub fn function(&self) -> &'static str {
        match self {
            SimilarityType::Full => "similarity",
            SimilarityType::Word => "word_similarity",
            SimilarityType::Strict => "strict_word_similarity",
        }
    }

    /// The index-eligible boolean operator.
    pub fn operator(&self) -> &'static str {
        match self {
            SimilarityType::Full => "%",
            SimilarityType::Word => "<%",
            SimilarityType::Strict => "<<%",
        }
    }

    /// Orders the term and target as the function and operator expect.
    ///
    /// `similarity` is symmetric and takes the target first; the word
    /// variants look for the first argument inside the second.
    fn arguments(&self, target: SqlFragment, term: SqlFragment) -> [SqlFragment; 2] {
        match self {
            SimilarityType::Full => [target, term],
            SimilarityType::Word | SimilarityType::Strict => [term, target],
        }
    }

    /// `a <op> b`, the pre-filter predicate.
    pub fn predicate(&self, target: SqlFragment, term: &str) -> SqlFragment {
        let [left, right] = self.arguments(target, SqlFragment::param(SqlParam::text(term)));
        left.push_sql(&format!(" {} ", self.operator())).concat(right)
    }

    /// `fn(a, b)`, the exact score.
    pub fn score(&self, target: SqlFragment, term: &str) -> SqlFragment {
        SqlFragment::call(
            self.function(),
            self.arguments(target, SqlFragment::param(SqlParam::text(term))),
        )
    }
}

impl OptionChoice for SimilarityType {
    const ALL: &'static [Self] = &[
        SimilarityType::Full,
        SimilarityType::Word,
        SimilarityType::Strict,
    ];

    fn as_str(&self) -> &'static str {
        match self {
            SimilarityType::Full => "full",
            SimilarityType::Word => "word",
            SimilarityType::Strict => "strict",
        }
    }
}

impl fmt::Display for SimilarityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Resolved similarity options.
#[derive(Debug, Clone, PartialEq)]
pub struct SimilarityOptions {
    /// Similarity flavour.
    pub kind: SimilarityType,
    /// Score ordering.
    pub order: SortOrder,
    /// Whether to add the operator pre-filter.
    pub pre_filter: bool,
    /// Optional row cap.
    pub limit: Option<i64>,
}

impl SimilarityOptions {
    /// Option keys understood by similarity search.
    pub const KEYS: &'static [&'static str] = &["type", "order", "pre_filter", "limit"];

    /// Validates `config` against the similarity schema.
    pub fn resolve(config: &SearchConfig, defaults: &CompilerConfig) -> SearchResult<Self> {
        reject_unknown_keys(config, Self::KEYS)?;
        Ok(Self {
            kind: validate_choice(config, "type", defaults.similarity_type)?,
            order: validate_choice(config, "order", SortOrder::Desc)?,
            pre_filter: validate_bool(config, "pre_filter", false)?,
            limit: validate_positive_int(config, "limit")?,
        })
    }
}

/// The searched text: one qualifier, or all of them joined by spaces.
///
/// `concat_ws` skips null arguments, so a null column does not null out
/// the whole target.
pub fn target(qualifiers: &Qualifiers) -> SqlFragment {
    let mut fragments = qualifiers.fragments();
    if fragments.len() == 1 {
        return fragments.remove(0);
    }
    let args = std::iter::once(SqlFragment::new("' '")).chain(fragments);
    SqlFragment::call("concat_ws", args)
}

/// Adds the pre-filter, score ordering and limit steps.
pub fn build(
    query: Query,
    qualifiers: &Qualifiers,
    term: &str,
    options: &SimilarityOptions,
) -> Query {
    let target = target(qualifiers);
    let kind = options.kind;

    query
        .apply_if(options.pre_filter, |q| {
            q.filter(kind.predicate(target.clone(), term))
        })
        .apply_some(options.order.direction(), |q, direction| {
            q.order_by(kind.score(target.clone(), term), direction)
        })
        .apply_some(options.limit, Query::limit)
}
