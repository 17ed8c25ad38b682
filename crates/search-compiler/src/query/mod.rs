//! Query value model.
//!
//! The compiler's only output channel: a [`Query`] over bound aliases,
//! [`Qualifier`]s scoped to those aliases, and the [`SqlFragment`] primitive
//! used to build predicates, ordering terms and projected columns.

pub mod builder;
pub mod fragment;
pub mod qualifier;

pub use builder::{Binding, Direction, JoinKind, OrderTerm, Query};
pub use fragment::{SqlFragment, SqlParam};
pub use qualifier::{Qualifier, Qualifiers, quote_ident};
