//! Connection pool collaborator contract.
//!
//! The access layer consumes pool creation and closing only; sizing,
//! eviction, and health checks are whatever the implementation behind these
//! traits does. The production implementation is
//! [`SqlxConnectionPool`](crate::sqlx_backend::SqlxConnectionPool).

use crate::config::DbConfig;
use crate::driver::Connection;
use crate::error::DbResult;
use async_trait::async_trait;

/// A factory capability producing connections, typically backed by a pool.
#[async_trait]
pub trait DataSource: Send + Sync {
    /// Lease a connection. Ownership transfers to the caller.
    async fn acquire(&self) -> DbResult<Box<dyn Connection>>;

    /// Tear the data source down. Called through
    /// [`ConnectionPool::close`], not directly.
    async fn close(&self) -> DbResult<()>;
}

impl std::fmt::Debug for dyn DataSource + '_ {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DataSource").finish_non_exhaustive()
    }
}

/// External collaborator that creates and closes pooled data sources.
#[async_trait]
pub trait ConnectionPool: Send + Sync {
    /// Build a pooled data source for the named database from its
    /// configuration.
    async fn create(&self, name: &str, config: &DbConfig) -> DbResult<std::sync::Arc<dyn DataSource>>;

    /// Close a data source previously produced by `create`.
    async fn close(&self, data_source: &dyn DataSource) -> DbResult<()>;
}
