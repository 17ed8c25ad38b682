//! `tokio-postgres` parameter binding.
//!
//! Vectors and bit strings are bound as text. The SQL the compiler emits
//! casts them (`$1::text::vector`, `$1::text::bit(N)`), so no client-side
//! pgvector type is required.

use tokio_postgres::types::ToSql;
use tokio_postgres::{Client, Row};

use crate::query::{Query, SqlParam};

/// A boxed parameter value.
pub type PgParam = Box<dyn ToSql + Sync + Send>;

/// Converts compiler parameters into `tokio-postgres` values.
pub fn to_sql_params(params: &[SqlParam]) -> Vec<PgParam> {
    params
        .iter()
        .map(|param| -> PgParam {
            match param {
                SqlParam::Text(s) => Box::new(s.clone()),
                SqlParam::Float(f) => Box::new(*f),
                SqlParam::Integer(i) => Box::new(*i),
                SqlParam::Bool(b) => Box::new(*b),
                SqlParam::Vector(v) => Box::new(SqlParam::vector_literal(v)),
                SqlParam::Bits(b) => Box::new(SqlParam::bits_literal(b)),
            }
        })
        .collect()
}

/// A rendered statement ready to execute.
pub struct PgStatement {
    /// SQL text with `$N` placeholders.
    pub sql: String,
    params: Vec<PgParam>,
}

impl PgStatement {
    /// Renders `query` and converts its parameters.
    pub fn from_query(query: &Query) -> Self {
        let (sql, params) = query.to_sql();
        Self {
            sql,
            params: to_sql_params(&params),
        }
    }

    /// Number of bound parameters.
    pub fn param_count(&self) -> usize {
        self.params.len()
    }

    /// Parameter references in the form `Client::query` takes.
    pub fn param_refs(&self) -> Vec<&(dyn ToSql + Sync)> {
        self.params
            .iter()
            .map(|p| p.as_ref() as &(dyn ToSql + Sync))
            .collect()
    }

    /// Runs the statement and returns all rows.
    pub async fn query(&self, client: &Client) -> Result<Vec<Row>, tokio_postgres::Error> {
        tracing::trace!(params = self.params.len(), "executing compiled search");
        client.query(&self.sql, &self.param_refs()).await
    }
}

impl std::fmt::Debug for PgStatement {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PgStatement")
            .field("sql", &self.sql)
            .field("params", &self.params.len())
            .finish()
    }
}
