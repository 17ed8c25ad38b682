//! Vector distance search (`pgvector`).
//!
//! The term is a pre-computed vector. It is bound as text and cast in SQL,
//! so no client-side vector type is needed.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::config::CompilerConfig;
use crate::error::{SearchError, SearchResult};
use crate::options::{
    OptionChoice, SearchConfig, reject_unknown_keys, validate_choice, validate_name_or_none,
    validate_threshold,
};
use crate::pipeline::QueryPipeline;
use crate::query::{Qualifier, Query, SqlFragment, SqlParam};

use super::{SortOrder, VectorValue};

/// Vector distance metric.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Distance {
    /// Euclidean distance, `<->`.
    #[serde(rename = "l2_distance")]
    L2,
    /// Negative inner product, `<#>`.
    #[serde(rename = "max_inner_product")]
    MaxInnerProduct,
    /// Cosine distance, `<=>`.
    #[serde(rename = "cosine_distance")]
    Cosine,
    /// Taxicab distance, `<+>`.
    #[serde(rename = "l1_distance")]
    L1,
    /// Hamming distance over bit vectors, `<~>`.
    #[serde(rename = "hamming_distance")]
    Hamming,
    /// Jaccard distance over bit vectors, `<%>`.
    #[serde(rename = "jaccard_distance")]
    Jaccard,
}

impl Distance {
    /// The pgvector operator computing this distance.
    pub fn operator(&self) -> &'static str {
        match self {
            Distance::L2 => "<->",
            Distance::MaxInnerProduct => "<#>",
            Distance::Cosine => "<=>",
            Distance::L1 => "<+>",
            Distance::Hamming => "<~>",
            Distance::Jaccard => "<%>",
        }
    }

    /// Returns true if the metric works on bit vectors.
    pub fn is_binary(&self) -> bool {
        matches!(self, Distance::Hamming | Distance::Jaccard)
    }

    /// Checks that `vector` is usable with this metric.
    pub fn check(&self, vector: &VectorValue) -> SearchResult<()> {
        vector.validate()?;
        if self.is_binary() != vector.is_binary() {
            let expected = if self.is_binary() { "bit" } else { "dense" };
            return Err(SearchError::shape_mismatch(format!(
                "{} needs a {} vector, got a {} vector",
                self,
                expected,
                vector.kind()
            )));
        }
        Ok(())
    }
}

impl OptionChoice for Distance {
    const ALL: &'static [Self] = &[
        Distance::L2,
        Distance::MaxInnerProduct,
        Distance::Cosine,
        Distance::L1,
        Distance::Hamming,
        Distance::Jaccard,
    ];

    fn as_str(&self) -> &'static str {
        match self {
            Distance::L2 => "l2_distance",
            Distance::MaxInnerProduct => "max_inner_product",
            Distance::Cosine => "cosine_distance",
            Distance::L1 => "l1_distance",
            Distance::Hamming => "hamming_distance",
            Distance::Jaccard => "jaccard_distance",
        }
    }
}

impl fmt::Display for Distance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Resolved semantic options.
#[derive(Debug, Clone, PartialEq)]
pub struct SemanticOptions {
    /// Distance metric.
    pub distance: Distance,
    /// Distance ordering; ascending is nearest first.
    pub order: SortOrder,
    /// Distance threshold for the pre-filter.
    pub pre_filter: Option<f64>,
    /// Projection key for the computed distance.
    pub distance_key: Option<String>,
}

impl SemanticOptions {
    /// Option keys understood by semantic search.
    pub const KEYS: &'static [&'static str] = &["distance", "order", "pre_filter", "distance_key"];

    /// Validates `config` against the semantic schema.
    pub fn resolve(config: &SearchConfig, defaults: &CompilerConfig) -> SearchResult<Self> {
        reject_unknown_keys(config, Self::KEYS)?;
        Ok(Self {
            distance: validate_choice(config, "distance", defaults.distance)?,
            order: validate_choice(config, "order", SortOrder::Asc)?,
            pre_filter: validate_threshold(config, "pre_filter")?,
            distance_key: validate_name_or_none(config, "distance_key")?,
        })
    }

    /// Comparison keeping rows on the near side of the threshold for
    /// ascending order and on the far side for descending order.
    pub fn threshold_comparator(&self) -> &'static str {
        match self.order {
            SortOrder::Desc => ">",
            SortOrder::Asc | SortOrder::None => "<",
        }
    }
}

/// `(q <op> ?::text::vector)`
pub fn distance_expr(
    qualifier: &Qualifier,
    vector: &VectorValue,
    distance: Distance,
) -> SqlFragment {
    let term = SqlFragment::param(vector.to_param()).push_sql(&vector.cast());
    qualifier
        .to_fragment()
        .push_sql(&format!(" {} ", distance.operator()))
        .concat(term)
        .wrap("(", ")")
}

/// Adds the threshold pre-filter, distance ordering and distance projection.
pub fn build(
    query: Query,
    qualifier: &Qualifier,
    vector: &VectorValue,
    options: &SemanticOptions,
) -> Query {
    let distance = distance_expr(qualifier, vector, options.distance);
    let comparator = options.threshold_comparator();

    query
        .apply_some(options.pre_filter, |q, threshold| {
            q.filter(
                distance
                    .clone()
                    .push_sql(&format!(" {} ", comparator))
                    .concat(SqlFragment::param(SqlParam::Float(threshold))),
            )
        })
        .apply_some(options.order.direction(), |q, direction| {
            q.order_by(distance.clone(), direction)
        })
        .apply_some(options.distance_key.clone(), |q, key| {
            q.select_merge(key, distance.clone())
        })
}
