//! Library layer for the campaign finance API: SQLite store, connection pool,
//! and the query components behind each endpoint.
//!
//! Every query component takes a [`HandleProvider`] and holds exactly one
//! pooled connection for the duration of the call.

pub mod aggregate;
pub mod contributions;
pub mod db;
pub mod error;
pub mod import;
pub mod pool;
pub mod search;
pub mod similarity;
pub mod validation;

#[cfg(test)]
mod testutil;

pub use aggregate::{aggregate_by_postal_prefix, AggregateFilter, ZipAggregateRow};
pub use contributions::{page_contributions, ContributionRow, Page, Relation};
pub use db::{Db, DbError};
pub use error::QueryError;
pub use pool::{Handle, HandleProvider, PoolConfig, PooledConnection, SqlitePool};
pub use search::{search, CommitteeMatch, ContributorMatch, SearchKind, SearchResults};
pub use validation::PageRequest;
