//! Conditional query composition.
//!
//! Every search builder is an ordered chain of two combinators:
//! [`apply_if`] runs a transform only when a condition holds, and
//! [`apply_case`] hands a tag to a transform that picks what to do with it.
//! Both always return a query value; a skipped step returns its input
//! untouched, so independent options (pre-filter, ordering, limit) never
//! interact.

use crate::query::Query;

/// Applies `transform` to `query` when `condition` is true.
pub fn apply_if<F>(query: Query, condition: bool, transform: F) -> Query
where
    F: FnOnce(Query) -> Query,
{
    if condition { transform(query) } else { query }
}

/// Dispatches `query` and `tag` to `transform`.
pub fn apply_case<T, F>(query: Query, tag: T, transform: F) -> Query
where
    F: FnOnce(Query, T) -> Query,
{
    transform(query, tag)
}

/// Method-call form of the combinators, for chaining.
pub trait QueryPipeline: Sized {
    /// See [`apply_if`].
    fn apply_if<F>(self, condition: bool, transform: F) -> Self
    where
        F: FnOnce(Self) -> Self;

    /// Applies `transform` with the contained value when `value` is `Some`.
    fn apply_some<T, F>(self, value: Option<T>, transform: F) -> Self
    where
        F: FnOnce(Self, T) -> Self;

    /// See [`apply_case`].
    fn apply_case<T, F>(self, tag: T, transform: F) -> Self
    where
        F: FnOnce(Self, T) -> Self;
}

impl QueryPipeline for Query {
    fn apply_if<F>(self, condition: bool, transform: F) -> Self
    where
        F: FnOnce(Self) -> Self,
    {
        apply_if(self, condition, transform)
    }

    fn apply_some<T, F>(self, value: Option<T>, transform: F) -> Self
    where
        F: FnOnce(Self, T) -> Self,
    {
        match value {
            Some(value) => transform(self, value),
            None => self,
        }
    }

    fn apply_case<T, F>(self, tag: T, transform: F) -> Self
    where
        F: FnOnce(Self, T) -> Self,
    {
        apply_case(self, tag, transform)
    }
}
