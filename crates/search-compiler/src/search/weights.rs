//! Rank weights, null coalescing and rank normalization for full-text
//! search.

use std::fmt;

use crate::error::{SearchError, SearchResult};
use crate::options::{OptionChoice, SearchConfig, validate_bool, validate_string_list};
use crate::query::Qualifiers;

/// A `setweight` label, highest (`A`) to lowest (`D`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum RankWeight {
    /// Highest weight.
    A,
    /// Second weight.
    B,
    /// Third weight.
    C,
    /// Lowest weight.
    D,
}

impl OptionChoice for RankWeight {
    const ALL: &'static [Self] = &[RankWeight::A, RankWeight::B, RankWeight::C, RankWeight::D];

    fn as_str(&self) -> &'static str {
        match self {
            RankWeight::A => "A",
            RankWeight::B => "B",
            RankWeight::C => "C",
            RankWeight::D => "D",
        }
    }
}

impl fmt::Display for RankWeight {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Default weights for `count` qualifiers: A, B, C, D, then D for the rest.
pub fn default_weights(count: usize) -> Vec<RankWeight> {
    (0..count)
        .map(|i| RankWeight::ALL[i.min(RankWeight::ALL.len() - 1)])
        .collect()
}

/// Resolves `rank_weights`, which must name one weight per qualifier.
pub fn resolve_weights(config: &SearchConfig, count: usize) -> SearchResult<Vec<RankWeight>> {
    let Some(letters) = validate_string_list(config, "rank_weights")? else {
        return Ok(default_weights(count));
    };

    let invalid = |allowed: String| {
        SearchError::invalid_option(
            "rank_weights",
            config.get("rank_weights").cloned().unwrap_or_default(),
            allowed,
        )
    };

    if letters.len() != count {
        return Err(invalid(format!(
            "a list of {} weights, one per qualifier",
            count
        )));
    }

    letters
        .iter()
        .map(|letter| {
            RankWeight::parse(letter)
                .ok_or_else(|| invalid(format!("weights from {}", RankWeight::allowed())))
        })
        .collect()
}

/// Decides, per qualifier, whether to wrap it in `coalesce(.., '')`.
///
/// With `nullable_columns` set only the named qualifiers are coalesced;
/// otherwise `coalesce` applies to all of them. Coalescing must mirror the
/// expression of any index the search is meant to hit.
pub fn resolve_coalescing(
    config: &SearchConfig,
    qualifiers: &Qualifiers,
) -> SearchResult<Vec<bool>> {
    let coalesce = validate_bool(config, "coalesce", true)?;
    let Some(nullable) = validate_string_list(config, "nullable_columns")? else {
        return Ok(vec![coalesce; qualifiers.len()]);
    };

    if let Some(unknown) = nullable
        .iter()
        .find(|name| !qualifiers.iter().any(|q| q.name() == name.as_str()))
    {
        let known: Vec<&str> = qualifiers.iter().map(|q| q.name()).collect();
        return Err(SearchError::invalid_option(
            "nullable_columns",
            format!("\"{}\"", unknown),
            format!("names of searched qualifiers ({})", known.join(", ")),
        ));
    }

    Ok(qualifiers
        .iter()
        .map(|q| nullable.iter().any(|name| name == q.name()))
        .collect())
}

/// Ranking function for ordering full-text matches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RankFunction {
    /// Cover density ranking, `ts_rank_cd`.
    TsRankCd,
    /// Frequency ranking, `ts_rank`.
    TsRank,
}

impl RankFunction {
    /// The default normalization bitmask for this function.
    pub fn default_normalization(&self) -> i64 {
        match self {
            RankFunction::TsRankCd => Normalization::MEAN_HARMONIC_DISTANCE,
            RankFunction::TsRank => Normalization::LOG_LENGTH,
        }
    }
}

impl OptionChoice for RankFunction {
    const ALL: &'static [Self] = &[RankFunction::TsRankCd, RankFunction::TsRank];

    fn as_str(&self) -> &'static str {
        match self {
            RankFunction::TsRankCd => "ts_rank_cd",
            RankFunction::TsRank => "ts_rank",
        }
    }
}

impl fmt::Display for RankFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// PostgreSQL rank normalization bits. Combine with `|`.
pub struct Normalization;

impl Normalization {
    /// Ignore document length.
    pub const NONE: i64 = 0;
    /// Divide by 1 + log of document length.
    pub const LOG_LENGTH: i64 = 1;
    /// Divide by document length.
    pub const LENGTH: i64 = 2;
    /// Divide by mean harmonic distance between extents (`ts_rank_cd` only).
    pub const MEAN_HARMONIC_DISTANCE: i64 = 4;
    /// Divide by number of unique words.
    pub const UNIQUE_WORDS: i64 = 8;
    /// Divide by 1 + log of number of unique words.
    pub const LOG_UNIQUE_WORDS: i64 = 16;
    /// Divide by rank + 1.
    pub const RANK_PLUS_ONE: i64 = 32;
    /// Every bit set.
    pub const ALL: i64 = 63;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::Qualifier;
    use serde_json::json;

    fn qualifiers(names: &[&str]) -> Qualifiers {
        names.iter().map(|n| Qualifier::column("p", *n)).collect()
    }

    #[test]
    fn test_default_weights_cycle_and_pad() {
        use RankWeight::*;
        assert_eq!(default_weights(1), vec![A]);
        assert_eq!(default_weights(4), vec![A, B, C, D]);
        assert_eq!(default_weights(6), vec![A, B, C, D, D, D]);
        assert!(default_weights(0).is_empty());
    }

    #[test]
    fn test_resolve_weights_explicit() {
        let config = SearchConfig::new().set("rank_weights", json!(["B", "A"]));
        assert_eq!(
            resolve_weights(&config, 2),
            Ok(vec![RankWeight::B, RankWeight::A])
        );
    }

    #[test]
    fn test_resolve_weights_length_mismatch() {
        let config = SearchConfig::new().set("rank_weights", json!(["A"]));
        let err = resolve_weights(&config, 2).unwrap_err();
        assert_eq!(err.option_key(), Some("rank_weights"));
        let config = SearchConfig::new().set("rank_weights", json!(["A", "B", "C"]));
        assert!(resolve_weights(&config, 2).is_err());
    }

    #[test]
    fn test_resolve_weights_bad_letter() {
        let config = SearchConfig::new().set("rank_weights", json!(["A", "E"]));
        assert!(resolve_weights(&config, 2).is_err());
        let config = SearchConfig::new().set("rank_weights", json!("A"));
        assert!(resolve_weights(&config, 1).is_err());
    }

    #[test]
    fn test_coalescing_defaults_to_all() {
        let q = qualifiers(&["title", "body"]);
        assert_eq!(resolve_coalescing(&SearchConfig::new(), &q), Ok(vec![true, true]));
        let off = SearchConfig::new().set("coalesce", false);
        assert_eq!(resolve_coalescing(&off, &q), Ok(vec![false, false]));
    }

    #[test]
    fn test_coalescing_nullable_columns() {
        let q = qualifiers(&["title", "body"]);
        let config = SearchConfig::new().set("nullable_columns", json!(["body"]));
        assert_eq!(resolve_coalescing(&config, &q), Ok(vec![false, true]));

        let typo = SearchConfig::new().set("nullable_columns", json!(["bdy"]));
        let err = resolve_coalescing(&typo, &q).unwrap_err();
        assert_eq!(err.option_key(), Some("nullable_columns"));
    }

    #[test]
    fn test_normalization_defaults() {
        assert_eq!(RankFunction::TsRankCd.default_normalization(), 4);
        assert_eq!(RankFunction::TsRank.default_normalization(), 1);
        assert_eq!(
            Normalization::LOG_LENGTH | Normalization::RANK_PLUS_ONE,
            33
        );
    }
}
