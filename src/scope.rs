//! Self-closing connection decorator for scoped execution.
//!
//! `with_connection` and `with_transaction` hand blocks a
//! [`ScopedConnection`] instead of the raw lease. The wrapper delegates the
//! session operations and guarantees that `close` releases the connection
//! together with any resources derived from it, on every exit path.

use crate::driver::Connection;
use crate::error::{DbError, DbResult};
use tracing::{debug, warn};

/// Connection wrapper owned by the scoped-execution helpers.
///
/// Blocks receive `&mut ScopedConnection`; the helper that created it calls
/// [`ScopedConnection::close`] after the block exits, normally or not.
pub struct ScopedConnection {
    inner: Option<Box<dyn Connection>>,
    statements: u64,
}

impl ScopedConnection {
    pub(crate) fn new(inner: Box<dyn Connection>) -> Self {
        Self {
            inner: Some(inner),
            statements: 0,
        }
    }

    fn conn(&mut self) -> DbResult<&mut Box<dyn Connection>> {
        self.inner
            .as_mut()
            .ok_or_else(|| DbError::internal("scoped connection already closed"))
    }

    /// Execute a statement, returning the number of affected rows.
    pub async fn execute(&mut self, sql: &str) -> DbResult<u64> {
        self.statements += 1;
        self.conn()?.execute(sql).await
    }

    /// Fetch a single integer scalar, if any row matched.
    pub async fn query_scalar(&mut self, sql: &str) -> DbResult<Option<i64>> {
        self.statements += 1;
        self.conn()?.query_scalar(sql).await
    }

    /// Set the autocommit mode.
    pub async fn set_autocommit(&mut self, enabled: bool) -> DbResult<()> {
        self.conn()?.set_autocommit(enabled).await
    }

    /// Current autocommit mode.
    pub fn autocommit(&self) -> bool {
        self.inner.as_ref().is_some_and(|c| c.autocommit())
    }

    /// Commit the current manual transaction unit.
    pub async fn commit(&mut self) -> DbResult<()> {
        self.conn()?.commit().await
    }

    /// Roll back the current manual transaction unit.
    pub async fn rollback(&mut self) -> DbResult<()> {
        self.conn()?.rollback().await
    }

    /// The connection URL this session reports.
    pub fn server_url(&mut self) -> DbResult<String> {
        self.conn()?.server_url()
    }

    /// Release the connection and everything derived from it.
    pub(crate) async fn close(&mut self) -> DbResult<()> {
        match self.inner.take() {
            Some(conn) => {
                debug!(statements = self.statements, "Releasing scoped connection");
                conn.close().await
            }
            None => Ok(()),
        }
    }
}

impl Drop for ScopedConnection {
    fn drop(&mut self) {
        // Only reachable when the owning helper unwound before closing; the
        // underlying lease cleans itself up when dropped.
        if self.inner.is_some() {
            warn!("Scoped connection dropped without explicit close");
        }
    }
}
