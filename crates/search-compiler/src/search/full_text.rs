//! Full-text search over `tsvector`/`tsquery`.
//!
//! Each qualifier is vectorized in the configured language and tagged with
//! its rank weight. The term is parsed once per use with the configured
//! parser function and, for prefix search, re-parsed with `:*` appended so
//! the last lexeme matches as a prefix.
//!
//! A term can parse to an empty query (stop words only, punctuation). Both
//! the predicate and the rank expression test for that with the same guard
//! and short-circuit to a constant instead of matching or ranking against
//! an empty `tsquery`.

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;

use crate::config::CompilerConfig;
use crate::error::{SearchError, SearchResult};
use crate::options::{
    OptionChoice, SearchConfig, reject_unknown_keys, validate_bool, validate_choice,
    validate_int_in, validate_string,
};
use crate::pipeline::QueryPipeline;
use crate::query::{Qualifiers, Query, SqlFragment, SqlParam};

use super::SortOrder;
use super::weights::{
    Normalization, RankFunction, RankWeight, resolve_coalescing, resolve_weights,
};

static LANGUAGE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[a-z_][a-z0-9_]*(\.[a-z_][a-z0-9_]*)?$").expect("static pattern")
});

/// Rank of rows whose term parsed to an empty query.
const EMPTY_RANK: &str = "0";

/// Parser turning the raw term into a `tsquery`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TermFunction {
    /// Web search syntax: quotes, `or`, `-`.
    Websearch,
    /// Plain text, all words ANDed.
    Plain,
    /// Plain text, words must be adjacent in order.
    Phrase,
}

impl OptionChoice for TermFunction {
    const ALL: &'static [Self] = &[
        TermFunction::Websearch,
        TermFunction::Plain,
        TermFunction::Phrase,
    ];

    fn as_str(&self) -> &'static str {
        match self {
            TermFunction::Websearch => "websearch_to_tsquery",
            TermFunction::Plain => "plainto_tsquery",
            TermFunction::Phrase => "phraseto_tsquery",
        }
    }
}

impl fmt::Display for TermFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How the predicate combines qualifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FilterType {
    /// Match any qualifier's own vector.
    Or,
    /// Match the concatenation of all qualifier vectors.
    Concat,
    /// Add no predicate; rank only.
    None,
}

impl OptionChoice for FilterType {
    const ALL: &'static [Self] = &[FilterType::Or, FilterType::Concat, FilterType::None];

    fn as_str(&self) -> &'static str {
        match self {
            FilterType::Or => "or",
            FilterType::Concat => "concat",
            FilterType::None => "none",
        }
    }
}

/// Resolved full-text options.
#[derive(Debug, Clone, PartialEq)]
pub struct FullTextOptions {
    /// Text search configuration name.
    pub language: String,
    /// Match the last lexeme as a prefix.
    pub prefix_search: bool,
    /// Term parser.
    pub term_function: TermFunction,
    /// Ranking function.
    pub rank_function: RankFunction,
    /// One weight per qualifier.
    pub rank_weights: Vec<RankWeight>,
    /// Rank normalization bitmask.
    pub rank_normalization: i64,
    /// Rank ordering.
    pub order: SortOrder,
    /// Predicate shape.
    pub filter_type: FilterType,
    /// Predicate result when the term parses to an empty query.
    pub empty_return: bool,
    /// Per qualifier, whether to coalesce nulls to `''`.
    pub coalesce: Vec<bool>,
}

impl FullTextOptions {
    /// Option keys understood by full-text search.
    pub const KEYS: &'static [&'static str] = &[
        "language",
        "prefix_search",
        "term_function",
        "rank_function",
        "rank_weights",
        "rank_normalization",
        "order",
        "filter_type",
        "empty_return",
        "coalesce",
        "nullable_columns",
    ];

    /// Validates `config` against the full-text schema for `qualifiers`.
    pub fn resolve(
        config: &SearchConfig,
        qualifiers: &Qualifiers,
        defaults: &CompilerConfig,
    ) -> SearchResult<Self> {
        reject_unknown_keys(config, Self::KEYS)?;

        let language = validate_string(config, "language")?
            .unwrap_or_else(|| defaults.language.clone());
        check_language(&language)?;

        let rank_function = validate_choice(config, "rank_function", RankFunction::TsRankCd)?;

        Ok(Self {
            language,
            prefix_search: validate_bool(config, "prefix_search", true)?,
            term_function: validate_choice(config, "term_function", TermFunction::Websearch)?,
            rank_function,
            rank_weights: resolve_weights(config, qualifiers.len())?,
            rank_normalization: validate_int_in(
                config,
                "rank_normalization",
                rank_function.default_normalization(),
                Normalization::NONE..=Normalization::ALL,
            )?,
            order: validate_choice(config, "order", SortOrder::Desc)?,
            filter_type: validate_choice(config, "filter_type", FilterType::Or)?,
            empty_return: validate_bool(config, "empty_return", defaults.empty_return)?,
            coalesce: resolve_coalescing(config, qualifiers)?,
        })
    }
}

fn check_language(language: &str) -> SearchResult<()> {
    if LANGUAGE.is_match(language) {
        Ok(())
    } else {
        Err(SearchError::invalid_option(
            "language",
            format!("\"{}\"", language),
            "a text search configuration name",
        ))
    }
}

impl FullTextOptions {
    /// Checks that the options fit `qualifiers` before anything is rendered.
    ///
    /// The per-qualifier lists must have one entry per qualifier and the
    /// language must still be a configuration name, since it is written
    /// into the SQL.
    pub fn check_shape(&self, qualifiers: &Qualifiers) -> SearchResult<()> {
        check_language(&self.language)?;
        let count = qualifiers.len();
        if self.rank_weights.len() != count || self.coalesce.len() != count {
            return Err(SearchError::shape_mismatch(format!(
                "full-text options hold {} weights and {} coalesce flags for {} qualifiers",
                self.rank_weights.len(),
                self.coalesce.len(),
                count
            )));
        }
        Ok(())
    }
}

/// Fragment factory for one full-text search.
struct TextSearch<'a> {
    options: &'a FullTextOptions,
    term: &'a str,
}

impl TextSearch<'_> {
    /// `'english'::regconfig`. Written inline so the expression matches
    /// index definitions; `check_shape` vetted the name.
    fn language(&self) -> SqlFragment {
        SqlFragment::new(format!("'{}'::regconfig", self.options.language))
    }

    /// `setweight(to_tsvector(lang, coalesce(q, '')), 'W')`
    fn weighted_vector(&self, qualifier: SqlFragment, index: usize) -> SqlFragment {
        let text = if self.options.coalesce[index] {
            SqlFragment::call("coalesce", [qualifier, SqlFragment::new("''")])
        } else {
            qualifier
        };
        let vector = SqlFragment::call("to_tsvector", [self.language(), text]);
        SqlFragment::call(
            "setweight",
            [
                vector,
                SqlFragment::new(format!("'{}'", self.options.rank_weights[index])),
            ],
        )
    }

    fn vectors(&self, qualifiers: &Qualifiers) -> Vec<SqlFragment> {
        qualifiers
            .fragments()
            .into_iter()
            .enumerate()
            .map(|(i, q)| self.weighted_vector(q, i))
            .collect()
    }

    /// All weighted vectors joined with `||`.
    fn combined_vector(&self, qualifiers: &Qualifiers) -> SqlFragment {
        SqlFragment::join(self.vectors(qualifiers), " || ").wrap("(", ")")
    }

    /// The term as parsed by the term function.
    fn parsed(&self) -> SqlFragment {
        SqlFragment::call(
            self.options.term_function.as_str(),
            [self.language(), SqlFragment::param(SqlParam::text(self.term))],
        )
    }

    /// The query matched against: the parsed term, prefixed if enabled.
    fn tsquery(&self) -> SqlFragment {
        if !self.options.prefix_search {
            return self.parsed();
        }
        let prefixed = self.parsed().push_sql("::text || ':*'");
        SqlFragment::call("to_tsquery", [self.language(), prefixed])
    }

    /// `CASE WHEN <parsed>::text = '' THEN <when_empty> ELSE <otherwise> END`
    fn guarded(&self, when_empty: &str, otherwise: SqlFragment) -> SqlFragment {
        self.parsed()
            .wrap("CASE WHEN ", &format!("::text = '' THEN {} ELSE ", when_empty))
            .concat(otherwise)
            .push_sql(" END")
    }

    fn matches(&self, vector: SqlFragment) -> SqlFragment {
        let empty = if self.options.empty_return { "TRUE" } else { "FALSE" };
        self.guarded(empty, vector.push_sql(" @@ ").concat(self.tsquery()))
    }

    /// A match against any qualifier's own vector.
    fn any_match(&self, qualifiers: &Qualifiers) -> SqlFragment {
        self.vectors(qualifiers)
            .into_iter()
            .fold(SqlFragment::falsy(), |acc, vector| acc.or(self.matches(vector)))
    }

    /// A match against the combined vector.
    fn combined_match(&self, qualifiers: &Qualifiers) -> SqlFragment {
        self.matches(self.combined_vector(qualifiers))
    }

    /// `rank_fn(<combined>, <query>, N)`, guarded.
    fn rank(&self, qualifiers: &Qualifiers) -> SqlFragment {
        let normalization = SqlFragment::new(self.options.rank_normalization.to_string());
        let rank = SqlFragment::call(
            self.options.rank_function.as_str(),
            [self.combined_vector(qualifiers), self.tsquery(), normalization],
        );
        self.guarded(EMPTY_RANK, rank)
    }
}

/// Builds the full-text match predicate, or `None` for `filter_type: none`.
pub fn predicate(
    qualifiers: &Qualifiers,
    term: &str,
    options: &FullTextOptions,
) -> SearchResult<Option<SqlFragment>> {
    options.check_shape(qualifiers)?;
    let search = TextSearch { options, term };
    Ok(match options.filter_type {
        FilterType::Or => Some(search.any_match(qualifiers)),
        FilterType::Concat => Some(search.combined_match(qualifiers)),
        FilterType::None => None,
    })
}

/// Builds the guarded rank expression.
pub fn rank(
    qualifiers: &Qualifiers,
    term: &str,
    options: &FullTextOptions,
) -> SearchResult<SqlFragment> {
    options.check_shape(qualifiers)?;
    Ok(TextSearch { options, term }.rank(qualifiers))
}

/// Adds the match predicate and rank ordering.
pub fn build(
    query: Query,
    qualifiers: &Qualifiers,
    term: &str,
    options: &FullTextOptions,
) -> SearchResult<Query> {
    let filter = predicate(qualifiers, term, options)?;
    let order = match options.order.direction() {
        Some(direction) => Some((rank(qualifiers, term, options)?, direction)),
        None => None,
    };
    Ok(query
        .apply_some(filter, Query::filter)
        .apply_some(order, |q, (expr, direction)| q.order_by(expr, direction)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::Qualifier;
    use serde_json::json;

    fn qualifiers(names: &[&str]) -> Qualifiers {
        names.iter().map(|n| Qualifier::column("p", *n)).collect()
    }

    fn resolve(config: SearchConfig, q: &Qualifiers) -> FullTextOptions {
        FullTextOptions::resolve(&config, q, &CompilerConfig::default()).unwrap()
    }

    const LANG: &str = "'english'::regconfig";

    #[test]
    fn test_resolve_defaults() {
        let q = qualifiers(&["title", "body"]);
        let options = resolve(SearchConfig::new(), &q);
        assert_eq!(options.language, "english");
        assert!(options.prefix_search);
        assert_eq!(options.term_function, TermFunction::Websearch);
        assert_eq!(options.rank_function, RankFunction::TsRankCd);
        assert_eq!(options.rank_weights, vec![RankWeight::A, RankWeight::B]);
        assert_eq!(options.rank_normalization, 4);
        assert_eq!(options.order, SortOrder::Desc);
        assert_eq!(options.filter_type, FilterType::Or);
        assert!(options.empty_return);
        assert_eq!(options.coalesce, vec![true, true]);
    }

    #[test]
    fn test_normalization_follows_rank_function() {
        let q = qualifiers(&["title"]);
        let options = resolve(SearchConfig::new().set("rank_function", "ts_rank"), &q);
        assert_eq!(options.rank_normalization, 1);

        let explicit = resolve(
            SearchConfig::new()
                .set("rank_function", "ts_rank")
                .set("rank_normalization", 32),
            &q,
        );
        assert_eq!(explicit.rank_normalization, 32);
    }

    #[test]
    fn test_resolve_rejects_bad_language() {
        let q = qualifiers(&["title"]);
        let config = SearchConfig::new().set("language", "english'); drop table x; --");
        let err =
            FullTextOptions::resolve(&config, &q, &CompilerConfig::default()).unwrap_err();
        assert_eq!(err.option_key(), Some("language"));

        let schema_qualified =
            resolve(SearchConfig::new().set("language", "public.my_english"), &q);
        assert_eq!(schema_qualified.language, "public.my_english");
    }

    #[test]
    fn test_rank_weights_mismatch_every_combination() {
        let q = qualifiers(&["title", "body", "summary"]);
        for order in ["asc", "desc", "none"] {
            for filter in ["or", "concat", "none"] {
                let config = SearchConfig::new()
                    .set("order", order)
                    .set("filter_type", filter)
                    .set("rank_weights", json!(["A", "B"]));
                let err =
                    FullTextOptions::resolve(&config, &q, &CompilerConfig::default()).unwrap_err();
                assert!(matches!(err, SearchError::InvalidOption { .. }));
                assert_eq!(err.option_key(), Some("rank_weights"));
            }
        }
    }

    #[test]
    fn test_single_qualifier_predicate_sql() {
        let q = qualifiers(&["title"]);
        let options = resolve(SearchConfig::new(), &q);
        let frag = predicate(&q, "hogwarts", &options).unwrap().unwrap();
        let parsed = format!("websearch_to_tsquery({LANG}, ?)");
        let expected = format!(
            "(false) OR (CASE WHEN {parsed}::text = '' THEN TRUE ELSE \
             setweight(to_tsvector({LANG}, coalesce(\"p\".\"title\", '')), 'A') @@ \
             to_tsquery({LANG}, {parsed}::text || ':*') END)"
        );
        assert_eq!(frag.sql, expected);
        assert!(frag.is_aligned());
        assert_eq!(frag.params, vec![SqlParam::text("hogwarts"); 2]);
    }

    #[test]
    fn test_no_prefix_search_uses_parsed_term() {
        let q = qualifiers(&["title"]);
        let options = resolve(
            SearchConfig::new()
                .set("prefix_search", false)
                .set("term_function", "plainto_tsquery")
                .set("coalesce", false),
            &q,
        );
        let frag = predicate(&q, "x", &options).unwrap().unwrap();
        assert!(!frag.sql.contains(":*"));
        assert!(!frag.sql.contains("coalesce"));
        assert!(frag.sql.contains(&format!(
            "@@ plainto_tsquery({LANG}, ?) END"
        )));
    }

    #[test]
    fn test_or_has_guard_per_qualifier() {
        for n in 1..=5 {
            let names: Vec<String> = (0..n).map(|i| format!("c{i}")).collect();
            let refs: Vec<&str> = names.iter().map(String::as_str).collect();
            let q = qualifiers(&refs);
            let options = resolve(SearchConfig::new().set("empty_return", false), &q);
            let frag = predicate(&q, "", &options).unwrap().unwrap();
            assert_eq!(frag.sql.matches("THEN FALSE ELSE").count(), n);
            assert_eq!(frag.sql.matches(" @@ ").count(), n);
            assert!(frag.is_aligned());
        }
    }

    #[test]
    fn test_concat_single_match_with_all_weights() {
        let q = qualifiers(&["a", "b", "c", "d", "e"]);
        let options = resolve(SearchConfig::new().set("filter_type", "concat"), &q);
        let frag = predicate(&q, "x", &options).unwrap().unwrap();
        assert_eq!(frag.sql.matches(" @@ ").count(), 1);
        assert_eq!(frag.sql.matches("CASE WHEN").count(), 1);
        for weight in ["'A'", "'B'", "'C'", "'D'"] {
            assert!(frag.sql.contains(weight));
        }
        assert_eq!(frag.sql.matches("'D'").count(), 2);
        assert_eq!(frag.sql.matches(" || setweight").count(), 4);
    }

    #[test]
    fn test_filter_none_adds_no_predicate() {
        let q = qualifiers(&["title"]);
        let options = resolve(SearchConfig::new().set("filter_type", "none"), &q);
        assert_eq!(predicate(&q, "x", &options), Ok(None));
        let query = build(Query::table("posts", "p"), &q, "x", &options).unwrap();
        assert!(query.filters().is_empty());
        assert_eq!(query.order_terms().len(), 1);
    }

    #[test]
    fn test_rank_is_guarded_with_neutral_constant() {
        let q = qualifiers(&["title", "body"]);
        let options = resolve(SearchConfig::new().set("rank_normalization", 33), &q);
        let frag = rank(&q, "", &options).unwrap();
        assert!(frag.sql.starts_with(&format!(
            "CASE WHEN websearch_to_tsquery({LANG}, ?)::text = '' THEN 0 ELSE ts_rank_cd(("
        )));
        assert!(frag.sql.ends_with(", 33) END"));
        assert!(frag.is_aligned());
    }

    #[test]
    fn test_nullable_columns_coalesce_only_named() {
        let q = qualifiers(&["title", "body"]);
        let options = resolve(
            SearchConfig::new()
                .set("nullable_columns", json!(["body"]))
                .set("filter_type", "concat"),
            &q,
        );
        let frag = predicate(&q, "x", &options).unwrap().unwrap();
        assert!(frag.sql.contains(&format!("to_tsvector({LANG}, \"p\".\"title\")")));
        assert!(frag.sql.contains("coalesce(\"p\".\"body\", '')"));
    }

    #[test]
    fn test_order_none_skips_rank() {
        let q = qualifiers(&["title"]);
        let options = resolve(SearchConfig::new().set("order", "none"), &q);
        let query = build(Query::table("posts", "p"), &q, "x", &options).unwrap();
        assert_eq!(query.filters().len(), 1);
        assert!(query.order_terms().is_empty());
    }
    #[test]
    fn test_language_is_inlined_for_index_matching() {
        let q = qualifiers(&["title"]);
        let options = resolve(SearchConfig::new().set("language", "public.my_english"), &q);
        let frag = predicate(&q, "x", &options).unwrap().unwrap();
        assert!(frag.sql.contains(
            "setweight(to_tsvector('public.my_english'::regconfig, coalesce(\"p\".\"title\", '')), 'A')"
        ));
        assert!(!frag.params.contains(&SqlParam::text("public.my_english")));
        assert!(frag.is_aligned());
    }

    #[test]
    fn test_options_for_other_qualifiers_are_rejected() {
        let two = qualifiers(&["title", "body"]);
        let options = resolve(SearchConfig::new(), &qualifiers(&["title"]));

        for result in [
            predicate(&two, "x", &options).map(|_| ()),
            rank(&two, "x", &options).map(|_| ()),
            build(Query::table("posts", "p"), &two, "x", &options).map(|_| ()),
        ] {
            assert!(matches!(result, Err(SearchError::ShapeMismatch { .. })));
        }

        let lopsided = FullTextOptions {
            coalesce: vec![true],
            ..resolve(SearchConfig::new(), &two)
        };
        assert!(matches!(
            predicate(&two, "x", &lopsided),
            Err(SearchError::ShapeMismatch { .. })
        ));

        let injected = FullTextOptions {
            language: "english'::regconfig, 'x')) OR TRUE --".to_string(),
            ..resolve(SearchConfig::new(), &two)
        };
        assert!(matches!(
            rank(&two, "x", &injected),
            Err(SearchError::InvalidOption { .. })
        ));
    }
}
