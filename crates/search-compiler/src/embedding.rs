//! Embedding provider seam for semantic search.
//!
//! The compiler consumes vectors; it does not produce them. Applications
//! inject an [`EmbeddingProvider`] (a remote API client, a local model
//! server, a batching or caching wrapper) into
//! [`SearchCompiler::semantic_with_provider`](crate::SearchCompiler::semantic_with_provider).
//!
//! [`StubEmbeddingProvider`] generates deterministic unit vectors from a
//! hash of the text, for development and tests.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::{EmbeddingError, SearchError, SearchResult};
use crate::search::VectorValue;

/// Per-request embedding options.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EmbeddingOptions {
    /// Provider model identifier, when the provider serves several.
    #[serde(default)]
    pub model: Option<String>,

    /// Expected vector dimensions. Vectors of another size are rejected.
    #[serde(default)]
    pub dimensions: Option<usize>,
}

/// Turns texts into vectors.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Generates one vector per input text, in input order.
    async fn generate(
        &self,
        terms: &[String],
        options: &EmbeddingOptions,
    ) -> Result<Vec<VectorValue>, EmbeddingError>;

    /// Provider name, for errors and logs.
    fn name(&self) -> &str;
}

/// Embeds a single text and checks the result's shape.
pub async fn embed_one(
    provider: &dyn EmbeddingProvider,
    text: &str,
    options: &EmbeddingOptions,
) -> SearchResult<VectorValue> {
    let mut vectors = provider.generate(&[text.to_string()], options).await?;

    if vectors.len() != 1 {
        tracing::warn!(
            provider = provider.name(),
            returned = vectors.len(),
            "embedding provider returned an unexpected number of vectors"
        );
        return Err(EmbeddingError::UnexpectedCount {
            provider: provider.name().to_string(),
            expected: 1,
            actual: vectors.len(),
        }
        .into());
    }

    let vector = vectors.remove(0);
    if let Some(expected) = options.dimensions
        && vector.dimensions() != expected
    {
        return Err(SearchError::shape_mismatch(format!(
            "{} returned {} dimensions, expected {}",
            provider.name(),
            vector.dimensions(),
            expected
        )));
    }

    tracing::trace!(
        provider = provider.name(),
        dimensions = vector.dimensions(),
        "embedded term"
    );
    Ok(vector)
}

/// Deterministic hash-based embeddings.
///
/// The same text always yields the same unit vector.
#[derive(Debug, Clone)]
pub struct StubEmbeddingProvider {
    dimensions: usize,
}

impl StubEmbeddingProvider {
    /// Creates a stub producing `dimensions`-sized vectors.
    pub fn new(dimensions: usize) -> Self {
        Self { dimensions }
    }

    fn embed(&self, text: &str) -> Vec<f32> {
        let mut embedding: Vec<f32> = (0..self.dimensions)
            .map(|i| {
                let mut hasher = DefaultHasher::new();
                text.hash(&mut hasher);
                (i as u64).hash(&mut hasher);
                ((hasher.finish() as f64 / u64::MAX as f64) * 2.0 - 1.0) as f32
            })
            .collect();

        let norm: f32 = embedding.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            for v in &mut embedding {
                *v /= norm;
            }
        }
        embedding
    }
}

#[async_trait]
impl EmbeddingProvider for StubEmbeddingProvider {
    async fn generate(
        &self,
        terms: &[String],
        _options: &EmbeddingOptions,
    ) -> Result<Vec<VectorValue>, EmbeddingError> {
        Ok(terms
            .iter()
            .map(|t| VectorValue::Dense(self.embed(t)))
            .collect())
    }

    fn name(&self) -> &str {
        "stub"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct EmptyProvider;

    #[async_trait]
    impl EmbeddingProvider for EmptyProvider {
        async fn generate(
            &self,
            _terms: &[String],
            _options: &EmbeddingOptions,
        ) -> Result<Vec<VectorValue>, EmbeddingError> {
            Ok(Vec::new())
        }

        fn name(&self) -> &str {
            "empty"
        }
    }

    #[tokio::test]
    async fn test_stub_is_deterministic_unit_vector() {
        let provider = StubEmbeddingProvider::new(8);
        let a = embed_one(&provider, "hogwarts", &EmbeddingOptions::default())
            .await
            .unwrap();
        let b = embed_one(&provider, "hogwarts", &EmbeddingOptions::default())
            .await
            .unwrap();
        assert_eq!(a, b);

        let VectorValue::Dense(values) = a else {
            panic!("stub returns dense vectors");
        };
        assert_eq!(values.len(), 8);
        let norm: f32 = values.iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-5);
    }

    #[tokio::test]
    async fn test_unexpected_count() {
        let err = embed_one(&EmptyProvider, "x", &EmbeddingOptions::default())
            .await
            .unwrap_err();
        assert_eq!(
            err,
            SearchError::Embedding(EmbeddingError::UnexpectedCount {
                provider: "empty".to_string(),
                expected: 1,
                actual: 0,
            })
        );
    }

    #[tokio::test]
    async fn test_dimension_check() {
        let provider = StubEmbeddingProvider::new(4);
        let options = EmbeddingOptions {
            dimensions: Some(3),
            ..Default::default()
        };
        let err = embed_one(&provider, "x", &options).await.unwrap_err();
        assert!(matches!(err, SearchError::ShapeMismatch { .. }));
    }
}
