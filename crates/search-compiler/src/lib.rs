//! PostgreSQL Search Query Compiler
//!
//! This crate compiles search requests into parameterized PostgreSQL query
//! fragments and composes them onto a base query. It covers four search
//! modalities behind one validated options surface.
//!
//! # Features
//!
//! - **Pattern matching**: `LIKE`, `ILIKE` and `SIMILAR TO` over one or more columns
//! - **Trigram similarity**: `pg_trgm` full, word and strict-word similarity
//! - **Full-text search**: weighted `tsvector`s, prefix matching, empty-query guards, ranking
//! - **Semantic search**: `pgvector` distance operators over dense and bit vectors
//! - **Composition**: conditional and tag-driven pipeline steps over a [`Query`]
//!
//! # Crate Features
//!
//! ```toml
//! [dependencies]
//! pg-search-compiler = { version = "0.1", features = ["postgres"] }
//! ```
//!
//! - `embeddings` (default) - the [`embedding::EmbeddingProvider`] seam and
//!   [`SearchCompiler::semantic_with_provider`]
//! - `postgres` - binds [`SqlParam`]s as `tokio-postgres` parameters
//!
//! # Architecture
//!
//! - [`query`] - fragments, qualifiers and the base query they compose onto
//! - [`options`] - option map and validators
//! - [`search`] - the compiler and per-modality builders
//! - [`pipeline`] - `apply_if` and `apply_case`
//! - [`config`] - compiler-wide defaults
//! - [`error`] - error types
//!
//! # Quick Start
//!
//! ```
//! use pg_search_compiler::{Qualifier, Qualifiers, Query, SearchCompiler, SearchConfig};
//! use serde_json::json;
//!
//! let compiler = SearchCompiler::default();
//! let base = Query::table("posts", "p");
//! let qualifiers = Qualifiers::from(vec![
//!     Qualifier::column("p", "title"),
//!     Qualifier::column("p", "body"),
//! ]);
//!
//! let options = SearchConfig::new().set("rank_weights", json!(["A", "B"]));
//! let query = compiler.full_text(&base, &qualifiers, "hogwarts", &options)?;
//!
//! let (sql, params) = query.to_sql();
//! assert!(sql.contains("websearch_to_tsquery"));
//! assert!(sql.contains("ORDER BY"));
//! assert!(!params.is_empty());
//!
//! // The base query is left as it was.
//! assert!(base.filters().is_empty());
//! # Ok::<(), pg_search_compiler::SearchError>(())
//! ```
//!
//! # Composition
//!
//! ```
//! use pg_search_compiler::{Qualifier, Qualifiers, Query, QueryPipeline, SearchCompiler};
//!
//! let compiler = SearchCompiler::default();
//! let title: Qualifiers = Qualifier::column("p", "title").into();
//! let term: Option<&str> = None;
//!
//! let query = Query::table("posts", "p")
//!     .apply_some(term, |q, term| compiler.ilike(&q, &title, term).unwrap_or(q))
//!     .apply_if(true, |q| q.limit(10));
//!
//! assert!(query.filters().is_empty());
//! assert_eq!(query.row_limit(), Some(10));
//! ```

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

#[cfg(feature = "postgres")]
pub mod backends;
pub mod config;
#[cfg(feature = "embeddings")]
pub mod embedding;
pub mod error;
pub mod options;
pub mod pipeline;
pub mod query;
pub mod search;

// Re-export commonly used types at crate root
pub use config::CompilerConfig;
pub use error::{SearchError, SearchResult};
pub use options::SearchConfig;
pub use pipeline::{QueryPipeline, apply_case, apply_if};
pub use query::{Direction, Qualifier, Qualifiers, Query, SqlFragment, SqlParam};
pub use search::pattern::sanitize;
pub use search::{Modality, SearchCompiler, SearchTerm, SortOrder, VectorValue};

#[cfg(feature = "embeddings")]
pub use error::EmbeddingError;

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Crate name.
pub const NAME: &str = env!("CARGO_PKG_NAME");
