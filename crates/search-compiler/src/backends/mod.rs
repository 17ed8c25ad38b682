//! Database client adapters.
//!
//! The compiler renders plain SQL text and a [`SqlParam`](crate::SqlParam)
//! list. Adapters here turn that list into a specific client's parameter
//! types. Each adapter is gated behind a feature flag.
//!
//! | Client | Feature |
//! |--------|---------|
//! | tokio-postgres | `postgres` |

#[cfg(feature = "postgres")]
pub mod postgres;
