//! Driver and connection capabilities.
//!
//! A [`Driver`] knows how to open sessions against one database engine. A
//! [`Connection`] is a leased session handle; whoever holds the box owns it
//! and is responsible for closing it. [`DriverShim`] is the delegating proxy
//! a [`Database`](crate::Database) registers instead of the loader-provided
//! driver, so deregistration stays unambiguous.

use crate::error::DbResult;
use async_trait::async_trait;

/// A pluggable implementation that knows how to open sessions against a
/// specific database engine.
#[async_trait]
pub trait Driver: Send + Sync {
    /// Engine name this driver was loaded under (e.g. "postgres").
    fn name(&self) -> &str;

    /// Whether this driver can handle the given connection URL.
    fn accepts(&self, url: &str) -> bool;

    /// Open a direct, unpooled session.
    async fn connect(&self, url: &str) -> DbResult<Box<dyn Connection>>;
}

/// A leased handle to an underlying database session.
///
/// Connections are exclusively owned; they are never shared across tasks.
/// `close` must be called on every path; the scoped helpers on `Database`
/// guarantee this for blocks they run.
#[async_trait]
pub trait Connection: Send {
    /// Execute a statement, returning the number of affected rows.
    async fn execute(&mut self, sql: &str) -> DbResult<u64>;

    /// Fetch a single integer scalar, if any row matched.
    async fn query_scalar(&mut self, sql: &str) -> DbResult<Option<i64>>;

    /// Set the autocommit mode. Disabling it opens a manual transaction
    /// unit; `commit`/`rollback` end the current unit and start the next.
    async fn set_autocommit(&mut self, enabled: bool) -> DbResult<()>;

    /// Current autocommit mode.
    fn autocommit(&self) -> bool;

    /// Commit the current manual transaction unit.
    /// Errors if the connection is in autocommit mode.
    async fn commit(&mut self) -> DbResult<()>;

    /// Roll back the current manual transaction unit.
    /// Errors if the connection is in autocommit mode.
    async fn rollback(&mut self) -> DbResult<()>;

    /// The connection URL this session reports.
    fn server_url(&self) -> DbResult<String>;

    /// Release the session and any resources derived from it (cached
    /// statements, open manual transaction unit).
    async fn close(self: Box<Self>) -> DbResult<()>;
}

impl std::fmt::Debug for dyn Driver + '_ {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Driver").field("name", &self.name()).finish()
    }
}

impl std::fmt::Debug for dyn Connection + '_ {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection")
            .field("autocommit", &self.autocommit())
            .finish()
    }
}

/// Delegating proxy around a loader-provided driver.
///
/// The loader may hand out an instance shared with other `Database` handles.
/// Registering this wrapper instead gives each handle a registry entry with
/// its own identity, so `deregister` removes exactly the entry this handle
/// added and never a driver another handle still uses.
pub struct DriverShim {
    delegate: std::sync::Arc<dyn Driver>,
}

impl DriverShim {
    pub fn new(delegate: std::sync::Arc<dyn Driver>) -> Self {
        Self { delegate }
    }
}

#[async_trait]
impl Driver for DriverShim {
    fn name(&self) -> &str {
        self.delegate.name()
    }

    fn accepts(&self, url: &str) -> bool {
        self.delegate.accepts(url)
    }

    async fn connect(&self, url: &str) -> DbResult<Box<dyn Connection>> {
        self.delegate.connect(url).await
    }
}

impl std::fmt::Debug for DriverShim {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DriverShim")
            .field("driver", &self.delegate.name())
            .finish()
    }
}
