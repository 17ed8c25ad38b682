//! Search compilation.
//!
//! [`SearchCompiler`] turns a base [`Query`], qualifiers, a term and a
//! [`SearchConfig`] into an augmented query for one of four modalities:
//!
//! - [`pattern`] - `LIKE`, `ILIKE`, `SIMILAR TO`
//! - [`similarity`] - `pg_trgm` trigram similarity
//! - [`full_text`] - `tsvector`/`tsquery` matching and ranking
//! - [`semantic`] - `pgvector` distance
//!
//! Each call checks bindings, resolves every option, and only then builds
//! fragments onto a copy of the base query. The base query is never touched.

pub mod full_text;
pub mod pattern;
pub mod semantic;
pub mod similarity;
pub mod weights;

use std::fmt;
use std::str::FromStr;

use crate::config::CompilerConfig;
use crate::error::{SearchError, SearchResult};
use crate::options::{OptionChoice, SearchConfig, reject_unknown_keys};
use crate::query::{Direction, Qualifier, Qualifiers, Query, SqlParam};

use self::full_text::FullTextOptions;
use self::pattern::PatternMode;
use self::semantic::SemanticOptions;
use self::similarity::SimilarityOptions;

/// The `order` option shared by the ranking modalities.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SortOrder {
    /// Ascending score.
    Asc,
    /// Descending score.
    Desc,
    /// No ordering step.
    None,
}

impl SortOrder {
    /// The query direction, or `None` when no ordering is wanted.
    pub fn direction(&self) -> Option<Direction> {
        match self {
            SortOrder::Asc => Some(Direction::Asc),
            SortOrder::Desc => Some(Direction::Desc),
            SortOrder::None => None,
        }
    }
}

impl OptionChoice for SortOrder {
    const ALL: &'static [Self] = &[SortOrder::Asc, SortOrder::Desc, SortOrder::None];

    fn as_str(&self) -> &'static str {
        match self {
            SortOrder::Asc => "asc",
            SortOrder::Desc => "desc",
            SortOrder::None => "none",
        }
    }
}

/// A vector search term.
#[derive(Debug, Clone, PartialEq)]
pub enum VectorValue {
    /// A dense `vector`.
    Dense(Vec<f32>),
    /// A `bit` vector.
    Binary(Vec<bool>),
}

impl VectorValue {
    /// Number of dimensions.
    pub fn dimensions(&self) -> usize {
        match self {
            VectorValue::Dense(v) => v.len(),
            VectorValue::Binary(b) => b.len(),
        }
    }

    /// Returns true for bit vectors.
    pub fn is_binary(&self) -> bool {
        matches!(self, VectorValue::Binary(_))
    }

    /// `dense` or `bit`.
    pub fn kind(&self) -> &'static str {
        if self.is_binary() { "bit" } else { "dense" }
    }

    /// Rejects empty vectors and non-finite components.
    pub fn validate(&self) -> SearchResult<()> {
        if self.dimensions() == 0 {
            return Err(SearchError::shape_mismatch("vector has no dimensions"));
        }
        if let VectorValue::Dense(values) = self
            && let Some(pos) = values.iter().position(|v| !v.is_finite())
        {
            return Err(SearchError::shape_mismatch(format!(
                "vector component {} is not finite",
                pos
            )));
        }
        Ok(())
    }

    /// The bound parameter.
    pub fn to_param(&self) -> SqlParam {
        match self {
            VectorValue::Dense(v) => SqlParam::Vector(v.clone()),
            VectorValue::Binary(b) => SqlParam::Bits(b.clone()),
        }
    }

    /// The SQL cast applied to the text-bound parameter.
    pub fn cast(&self) -> String {
        match self {
            VectorValue::Dense(_) => "::text::vector".to_string(),
            VectorValue::Binary(b) => format!("::text::bit({})", b.len()),
        }
    }
}

impl From<Vec<f32>> for VectorValue {
    fn from(values: Vec<f32>) -> Self {
        VectorValue::Dense(values)
    }
}

/// A search term: text, or a vector for semantic search.
#[derive(Debug, Clone, PartialEq)]
pub enum SearchTerm {
    /// Text for the textual modalities.
    Text(String),
    /// Vector for semantic search.
    Vector(VectorValue),
}

impl SearchTerm {
    fn as_text(&self, modality: Modality) -> SearchResult<&str> {
        match self {
            SearchTerm::Text(text) => Ok(text.as_str()),
            SearchTerm::Vector(_) => Err(SearchError::shape_mismatch(format!(
                "{} search needs a text term, got a vector",
                modality
            ))),
        }
    }

    fn as_vector(&self) -> SearchResult<&VectorValue> {
        match self {
            SearchTerm::Vector(vector) => Ok(vector),
            SearchTerm::Text(_) => Err(SearchError::shape_mismatch(
                "semantic search needs a vector term, got text",
            )),
        }
    }
}

impl From<&str> for SearchTerm {
    fn from(text: &str) -> Self {
        SearchTerm::Text(text.to_string())
    }
}

impl From<String> for SearchTerm {
    fn from(text: String) -> Self {
        SearchTerm::Text(text)
    }
}

impl From<VectorValue> for SearchTerm {
    fn from(vector: VectorValue) -> Self {
        SearchTerm::Vector(vector)
    }
}

impl From<Vec<f32>> for SearchTerm {
    fn from(values: Vec<f32>) -> Self {
        SearchTerm::Vector(VectorValue::Dense(values))
    }
}

/// Search modality.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Modality {
    /// Case-sensitive `LIKE`.
    Like,
    /// Case-insensitive `ILIKE`.
    ILike,
    /// `SIMILAR TO`.
    SimilarTo,
    /// Trigram similarity.
    Similarity,
    /// Full-text search.
    FullText,
    /// Vector distance search.
    Semantic,
}

impl fmt::Display for Modality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Modality::Like => write!(f, "like"),
            Modality::ILike => write!(f, "ilike"),
            Modality::SimilarTo => write!(f, "similar_to"),
            Modality::Similarity => write!(f, "similarity"),
            Modality::FullText => write!(f, "full_text"),
            Modality::Semantic => write!(f, "semantic"),
        }
    }
}

impl FromStr for Modality {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "like" => Ok(Modality::Like),
            "ilike" => Ok(Modality::ILike),
            "similar_to" => Ok(Modality::SimilarTo),
            "similarity" => Ok(Modality::Similarity),
            "full_text" => Ok(Modality::FullText),
            "semantic" => Ok(Modality::Semantic),
            _ => Err(format!("unknown search modality: {}", s)),
        }
    }
}

/// Compiles searches onto queries.
#[derive(Debug, Clone, Default)]
pub struct SearchCompiler {
    config: CompilerConfig,
}

impl SearchCompiler {
    /// Creates a compiler with the given defaults.
    pub fn new(config: CompilerConfig) -> Self {
        Self { config }
    }

    /// The compiler's defaults.
    pub fn config(&self) -> &CompilerConfig {
        &self.config
    }

    /// Compiles a search of any modality.
    pub fn compile(
        &self,
        query: &Query,
        modality: Modality,
        qualifiers: &Qualifiers,
        term: &SearchTerm,
        options: &SearchConfig,
    ) -> SearchResult<Query> {
        match modality {
            Modality::Like | Modality::ILike | Modality::SimilarTo => {
                let mode = match modality {
                    Modality::Like => PatternMode::Like,
                    Modality::ILike => PatternMode::ILike,
                    _ => PatternMode::SimilarTo,
                };
                self.pattern(query, mode, qualifiers, term.as_text(modality)?, options)
            }
            Modality::Similarity => {
                self.similarity(query, qualifiers, term.as_text(modality)?, options)
            }
            Modality::FullText => {
                self.full_text(query, qualifiers, term.as_text(modality)?, options)
            }
            Modality::Semantic => {
                let vector = term.as_vector()?;
                let qualifier = qualifiers.single().ok_or_else(|| {
                    SearchError::unsupported(
                        modality.to_string(),
                        format!("expected exactly one qualifier, got {}", qualifiers.len()),
                    )
                })?;
                self.semantic(query, qualifier, vector, options)
            }
        }
    }

    /// `LIKE` over the qualifiers. The term is not escaped.
    pub fn like(&self, query: &Query, qualifiers: &Qualifiers, term: &str) -> SearchResult<Query> {
        self.pattern(query, PatternMode::Like, qualifiers, term, &SearchConfig::new())
    }

    /// `ILIKE` over the qualifiers. The term is not escaped.
    pub fn ilike(&self, query: &Query, qualifiers: &Qualifiers, term: &str) -> SearchResult<Query> {
        self.pattern(query, PatternMode::ILike, qualifiers, term, &SearchConfig::new())
    }

    /// `SIMILAR TO` over the qualifiers. The term is not escaped.
    pub fn similar_to(
        &self,
        query: &Query,
        qualifiers: &Qualifiers,
        term: &str,
    ) -> SearchResult<Query> {
        self.pattern(query, PatternMode::SimilarTo, qualifiers, term, &SearchConfig::new())
    }

    fn pattern(
        &self,
        query: &Query,
        mode: PatternMode,
        qualifiers: &Qualifiers,
        term: &str,
        options: &SearchConfig,
    ) -> SearchResult<Query> {
        reject_unknown_keys(options, &[])?;
        query.check_bindings(qualifiers)?;

        tracing::debug!(mode = %mode, qualifiers = qualifiers.len(), "compiling pattern search");
        Ok(pattern::build(query.clone(), mode, qualifiers, term))
    }

    /// Trigram similarity search.
    pub fn similarity(
        &self,
        query: &Query,
        qualifiers: &Qualifiers,
        term: &str,
        options: &SearchConfig,
    ) -> SearchResult<Query> {
        let options = SimilarityOptions::resolve(options, &self.config)?;
        Self::require_qualifiers(Modality::Similarity, qualifiers)?;
        query.check_bindings(qualifiers)?;

        tracing::debug!(
            kind = %options.kind,
            order = options.order.as_str(),
            pre_filter = options.pre_filter,
            limit = ?options.limit,
            qualifiers = qualifiers.len(),
            "compiling similarity search"
        );
        Ok(similarity::build(query.clone(), qualifiers, term, &options))
    }

    /// Full-text search.
    pub fn full_text(
        &self,
        query: &Query,
        qualifiers: &Qualifiers,
        term: &str,
        options: &SearchConfig,
    ) -> SearchResult<Query> {
        Self::require_qualifiers(Modality::FullText, qualifiers)?;
        let options = FullTextOptions::resolve(options, qualifiers, &self.config)?;
        query.check_bindings(qualifiers)?;

        tracing::debug!(
            language = %options.language,
            term_function = %options.term_function,
            rank_function = %options.rank_function,
            normalization = options.rank_normalization,
            filter_type = options.filter_type.as_str(),
            order = options.order.as_str(),
            qualifiers = qualifiers.len(),
            "compiling full-text search"
        );
        full_text::build(query.clone(), qualifiers, term, &options)
    }

    /// Vector distance search on one qualifier.
    pub fn semantic(
        &self,
        query: &Query,
        qualifier: &Qualifier,
        vector: &VectorValue,
        options: &SearchConfig,
    ) -> SearchResult<Query> {
        let options = SemanticOptions::resolve(options, &self.config)?;
        options.distance.check(vector)?;
        query.check_bindings(&Qualifiers::from(qualifier.clone()))?;

        tracing::debug!(
            distance = %options.distance,
            order = options.order.as_str(),
            pre_filter = ?options.pre_filter,
            distance_key = ?options.distance_key,
            dimensions = vector.dimensions(),
            "compiling semantic search"
        );
        Ok(semantic::build(query.clone(), qualifier, vector, &options))
    }

    /// Embeds `text` with `provider`, then runs [`semantic`](Self::semantic).
    #[cfg(feature = "embeddings")]
    pub async fn semantic_with_provider(
        &self,
        query: &Query,
        qualifier: &Qualifier,
        text: &str,
        provider: &dyn crate::embedding::EmbeddingProvider,
        embedding_options: &crate::embedding::EmbeddingOptions,
        options: &SearchConfig,
    ) -> SearchResult<Query> {
        // Fail on bad options or bindings before paying for an embedding.
        SemanticOptions::resolve(options, &self.config)?;
        query.check_bindings(&Qualifiers::from(qualifier.clone()))?;
        let vector = crate::embedding::embed_one(provider, text, embedding_options).await?;
        self.semantic(query, qualifier, &vector, options)
    }

    fn require_qualifiers(modality: Modality, qualifiers: &Qualifiers) -> SearchResult<()> {
        if qualifiers.is_empty() {
            return Err(SearchError::unsupported(
                modality.to_string(),
                "at least one qualifier is required",
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sort_order_direction() {
        assert_eq!(SortOrder::Asc.direction(), Some(Direction::Asc));
        assert_eq!(SortOrder::Desc.direction(), Some(Direction::Desc));
        assert_eq!(SortOrder::None.direction(), None);
        assert_eq!(SortOrder::parse("none"), Some(SortOrder::None));
    }

    #[test]
    fn test_modality_round_trip() {
        for modality in [
            Modality::Like,
            Modality::ILike,
            Modality::SimilarTo,
            Modality::Similarity,
            Modality::FullText,
            Modality::Semantic,
        ] {
            assert_eq!(modality.to_string().parse::<Modality>(), Ok(modality));
        }
        assert!("fuzzy".parse::<Modality>().is_err());
    }

    #[test]
    fn test_vector_validation() {
        assert!(VectorValue::Dense(vec![1.0, 2.0]).validate().is_ok());
        assert!(VectorValue::Dense(vec![]).validate().is_err());
        assert!(VectorValue::Dense(vec![1.0, f32::NAN]).validate().is_err());
        assert!(VectorValue::Binary(vec![]).validate().is_err());
        assert_eq!(VectorValue::Binary(vec![true, false]).cast(), "::text::bit(2)");
    }

    #[test]
    fn test_term_shapes() {
        let text = SearchTerm::from("hello");
        assert_eq!(text.as_text(Modality::Like), Ok("hello"));
        assert!(matches!(
            text.as_vector(),
            Err(SearchError::ShapeMismatch { .. })
        ));

        let vector = SearchTerm::from(vec![0.5_f32]);
        assert!(vector.as_vector().is_ok());
        assert!(matches!(
            vector.as_text(Modality::FullText),
            Err(SearchError::ShapeMismatch { .. })
        ));
    }
}
