//! Error types for the search compiler.
//!
//! Every error is raised synchronously, before any fragment of the affected
//! search is attached to a query. There is no partial success: a compiler
//! call either returns a fully augmented query or one of these errors.

// Error enum variant fields are self-documenting via their #[error(...)] messages
#![allow(missing_docs)]

use thiserror::Error;

/// The primary error type for all compiler operations.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SearchError {
    /// An option value is outside its enumerated or typed domain.
    #[error("invalid value {value} for option `{key}`, expected {allowed}")]
    InvalidOption {
        key: String,
        value: String,
        allowed: String,
    },

    /// The shape of an input does not fit the requested search.
    #[error("shape mismatch: {message}")]
    ShapeMismatch { message: String },

    /// The modality does not support the requested combination of inputs.
    #[error("unsupported combination for {modality} search: {message}")]
    UnsupportedCombination { modality: String, message: String },

    /// A qualifier references an alias that is not bound in the query.
    #[error("qualifier references unbound alias `{alias}`")]
    UnknownBinding { alias: String },

    /// The embedding provider failed to produce a vector for the term.
    #[cfg(feature = "embeddings")]
    #[error(transparent)]
    Embedding(#[from] EmbeddingError),
}

impl SearchError {
    /// Creates an invalid option error from anything displayable.
    pub fn invalid_option(
        key: impl Into<String>,
        value: impl std::fmt::Display,
        allowed: impl Into<String>,
    ) -> Self {
        SearchError::InvalidOption {
            key: key.into(),
            value: value.to_string(),
            allowed: allowed.into(),
        }
    }

    /// Creates a shape mismatch error.
    pub fn shape_mismatch(message: impl Into<String>) -> Self {
        SearchError::ShapeMismatch {
            message: message.into(),
        }
    }

    /// Creates an unsupported combination error.
    pub fn unsupported(modality: impl Into<String>, message: impl Into<String>) -> Self {
        SearchError::UnsupportedCombination {
            modality: modality.into(),
            message: message.into(),
        }
    }

    /// Returns the offending option key, if this is an option error.
    pub fn option_key(&self) -> Option<&str> {
        match self {
            SearchError::InvalidOption { key, .. } => Some(key),
            _ => None,
        }
    }
}

/// Errors raised by embedding providers.
#[cfg(feature = "embeddings")]
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EmbeddingError {
    /// The provider could not generate embeddings.
    #[error("embedding provider {provider} failed: {message}")]
    ProviderFailed { provider: String, message: String },

    /// The provider returned a different number of vectors than requested.
    #[error("embedding provider {provider} returned {actual} vectors, expected {expected}")]
    UnexpectedCount {
        provider: String,
        expected: usize,
        actual: usize,
    },
}

/// Result type alias for compiler operations.
pub type SearchResult<T> = Result<T, SearchError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_option_display() {
        let err = SearchError::invalid_option("order", "\"sideways\"", "one of asc, desc, none");
        assert_eq!(
            err.to_string(),
            "invalid value \"sideways\" for option `order`, expected one of asc, desc, none"
        );
        assert_eq!(err.option_key(), Some("order"));
    }

    #[test]
    fn test_shape_mismatch_display() {
        let err = SearchError::shape_mismatch("term is not a vector");
        assert_eq!(err.to_string(), "shape mismatch: term is not a vector");
        assert!(err.option_key().is_none());
    }

    #[test]
    fn test_unknown_binding_display() {
        let err = SearchError::UnknownBinding {
            alias: "c".to_string(),
        };
        assert_eq!(err.to_string(), "qualifier references unbound alias `c`");
    }

    #[cfg(feature = "embeddings")]
    #[test]
    fn test_embedding_error_converts() {
        let err: SearchError = EmbeddingError::UnexpectedCount {
            provider: "static".to_string(),
            expected: 1,
            actual: 0,
        }
        .into();
        assert!(matches!(err, SearchError::Embedding(_)));
        assert!(err.to_string().contains("returned 0 vectors"));
    }
}
