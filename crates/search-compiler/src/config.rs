//! Compiler-wide defaults.
//!
//! [`CompilerConfig`] carries the defaults an application wants for options
//! a search call leaves unset. It is plain data: load it from whatever
//! configuration source the application uses and hand it to
//! [`SearchCompiler::new`](crate::SearchCompiler::new).

use serde::{Deserialize, Serialize};

use crate::search::semantic::Distance;
use crate::search::similarity::SimilarityType;

/// Defaults applied when a search call does not set an option.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompilerConfig {
    /// Text search configuration used by full-text search.
    #[serde(default = "default_language")]
    pub language: String,

    /// Trigram similarity flavour.
    #[serde(default = "default_similarity_type")]
    pub similarity_type: SimilarityType,

    /// Vector distance metric.
    #[serde(default = "default_distance")]
    pub distance: Distance,

    /// Full-text predicate result for terms that parse to an empty query.
    #[serde(default = "default_empty_return")]
    pub empty_return: bool,
}

fn default_language() -> String {
    "english".to_string()
}

fn default_similarity_type() -> SimilarityType {
    SimilarityType::Full
}

fn default_distance() -> Distance {
    Distance::L2
}

fn default_empty_return() -> bool {
    true
}

impl Default for CompilerConfig {
    fn default() -> Self {
        Self {
            language: default_language(),
            similarity_type: default_similarity_type(),
            distance: default_distance(),
            empty_return: default_empty_return(),
        }
    }
}
