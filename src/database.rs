//! The public-facing database handle.
//!
//! A [`Database`] owns a lazily created driver, a lazily created pooled data
//! source, and a lazily computed URL. All three are initialized at most once
//! under concurrent first access via `tokio::sync::OnceCell`. Callers either
//! acquire raw connections (and own them) or pass a block into
//! [`Database::with_connection`] / [`Database::with_transaction`], which
//! guarantee release on every exit path.

use crate::config::{DRIVER_KEY, DbConfig, URL_KEY};
use crate::driver::{Connection, Driver, DriverShim};
use crate::error::{BlockError, BlockResult, DbError, DbResult};
use crate::loader::{DriverLoader, StaticDriverLoader};
use crate::pool::{ConnectionPool, DataSource};
use crate::registry::{DriverRegistry, SharedDriverRegistry};
use crate::scope::ScopedConnection;
use crate::sqlx_backend::SqlxConnectionPool;
use futures_util::future::BoxFuture;
use std::sync::Arc;
use tokio::sync::OnceCell;
use tracing::{info, warn};

/// Handle to one logical database.
///
/// Shareable across tasks via `Arc`; every operation takes `&self`. After
/// [`Database::shutdown`] the instance must not be reused.
pub struct Database {
    name: String,
    config: Arc<DbConfig>,
    loader: Arc<dyn DriverLoader>,
    registry: Arc<dyn DriverRegistry>,
    pool: Arc<dyn ConnectionPool>,
    driver: OnceCell<Arc<dyn Driver>>,
    data_source: OnceCell<Arc<dyn DataSource>>,
    url: OnceCell<String>,
}

impl Database {
    /// Create a handle with the production collaborators: the built-in
    /// driver loader, the process-wide driver registry, and the sqlx-backed
    /// pool.
    pub fn new(name: impl Into<String>, config: Arc<DbConfig>) -> Self {
        Self::with_collaborators(
            name,
            config,
            Arc::new(StaticDriverLoader::with_builtin_drivers()),
            SharedDriverRegistry::global(),
            Arc::new(SqlxConnectionPool::new()),
        )
    }

    /// Create a handle with injected collaborators.
    pub fn with_collaborators(
        name: impl Into<String>,
        config: Arc<DbConfig>,
        loader: Arc<dyn DriverLoader>,
        registry: Arc<dyn DriverRegistry>,
        pool: Arc<dyn ConnectionPool>,
    ) -> Self {
        Self {
            name: name.into(),
            config,
            loader,
            registry,
            pool,
            driver: OnceCell::new(),
            data_source: OnceCell::new(),
            url: OnceCell::new(),
        }
    }

    /// The logical database name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Lazily resolve, wrap, and register the configured driver.
    /// Single-flight; the registry is mutated exactly once per handle.
    async fn driver(&self) -> DbResult<&Arc<dyn Driver>> {
        self.driver
            .get_or_try_init(|| async {
                let driver_name = self.config.require(&self.name, DRIVER_KEY)?.to_string();
                let delegate = self.loader.load(&driver_name)?;
                let shim: Arc<dyn Driver> = Arc::new(DriverShim::new(delegate));
                self.registry.register(Arc::clone(&shim))?;
                info!(database = %self.name, driver = %driver_name, "Registered driver");
                Ok(shim)
            })
            .await
    }

    /// The pooled data source for this database, created on first use.
    ///
    /// Driver registration happens before pool creation; concurrent first
    /// callers perform pool creation exactly once.
    pub async fn data_source(&self) -> DbResult<Arc<dyn DataSource>> {
        let data_source = self
            .data_source
            .get_or_try_init(|| async {
                let driver = self.driver().await?;
                if let Some(url) = self.config.get(&self.name, URL_KEY) {
                    if !driver.accepts(url) {
                        return Err(DbError::connection(format!(
                            "Driver '{}' does not accept the configured URL for database '{}'",
                            driver.name(),
                            self.name
                        )));
                    }
                }
                self.pool.create(&self.name, &self.config).await
            })
            .await?;
        Ok(Arc::clone(data_source))
    }

    /// The URL the database reports for its connections, materialized once
    /// by leasing a single connection and releasing it unconditionally.
    pub async fn url(&self) -> DbResult<&str> {
        self.url
            .get_or_try_init(|| async {
                let data_source = self.data_source().await?;
                let conn = data_source.acquire().await?;
                let url = conn.server_url();
                if let Err(e) = conn.close().await {
                    warn!(database = %self.name, error = %e, "Failed to release metadata connection");
                }
                url
            })
            .await
            .map(String::as_str)
    }

    /// Acquire a connection with autocommit enabled.
    /// Ownership transfers to the caller, who must close it.
    pub async fn get_connection(&self) -> DbResult<Box<dyn Connection>> {
        self.get_connection_with(true).await
    }

    /// Acquire a connection with the requested autocommit mode.
    /// Ownership transfers to the caller, who must close it.
    pub async fn get_connection_with(&self, autocommit: bool) -> DbResult<Box<dyn Connection>> {
        let data_source = self.data_source().await?;
        let mut conn = data_source.acquire().await?;
        if let Err(e) = conn.set_autocommit(autocommit).await {
            if let Err(close_err) = conn.close().await {
                warn!(database = %self.name, error = %close_err, "Failed to release connection");
            }
            return Err(e);
        }
        Ok(conn)
    }

    /// Run a block against a scoped connection (autocommit default).
    ///
    /// The connection and its derived resources are released on every exit
    /// path; the block's result or error propagates unchanged.
    pub async fn with_connection<T, F>(&self, block: F) -> BlockResult<T>
    where
        F: for<'c> FnOnce(&'c mut ScopedConnection) -> BoxFuture<'c, BlockResult<T>>,
    {
        let conn = self.get_connection().await?;
        let mut scoped = ScopedConnection::new(conn);
        let result = block(&mut scoped).await;
        if let Err(e) = scoped.close().await {
            warn!(database = %self.name, error = %e, "Failed to release scoped connection");
        }
        result
    }

    /// Run a block inside a transaction.
    ///
    /// Three outcomes:
    /// - the block returns `Ok`: commit, return the value;
    /// - the block fails (`Db` or `App` error): roll back, re-raise the
    ///   original error unchanged;
    /// - the block exits with a [`ControlSignal`](crate::ControlSignal):
    ///   the work is valid, so commit, then re-raise the signal.
    ///
    /// The connection is released on every exit path. A commit failure on
    /// the signal path surfaces the commit error instead of the signal.
    pub async fn with_transaction<T, F>(&self, block: F) -> BlockResult<T>
    where
        F: for<'c> FnOnce(&'c mut ScopedConnection) -> BoxFuture<'c, BlockResult<T>>,
    {
        let conn = self.get_connection_with(false).await?;
        let mut scoped = ScopedConnection::new(conn);
        let outcome = match block(&mut scoped).await {
            Ok(value) => match scoped.commit().await {
                Ok(()) => Ok(value),
                Err(e) => Err(BlockError::from(e)),
            },
            Err(BlockError::Signal(signal)) => match scoped.commit().await {
                Ok(()) => Err(BlockError::Signal(signal)),
                Err(e) => Err(BlockError::from(e)),
            },
            Err(failure) => {
                if let Err(e) = scoped.rollback().await {
                    warn!(database = %self.name, error = %e, "Rollback failed; propagating block error");
                }
                Err(failure)
            }
        };
        if let Err(e) = scoped.close().await {
            warn!(database = %self.name, error = %e, "Failed to release transaction connection");
        }
        outcome
    }

    /// Close the pooled data source, then deregister the driver.
    ///
    /// Not safe concurrently with in-flight acquisition and not idempotent;
    /// call once, then drop the handle. Fields never initialized are
    /// skipped, so shutting down an unused handle is a no-op.
    pub async fn shutdown(&self) -> DbResult<()> {
        if let Some(data_source) = self.data_source.get() {
            self.pool.close(data_source.as_ref()).await?;
        }
        if let Some(driver) = self.driver.get() {
            self.registry.deregister(driver)?;
        }
        info!(database = %self.name, "Database shut down");
        Ok(())
    }
}

impl std::fmt::Debug for Database {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Database")
            .field("name", &self.name)
            .field("driver_initialized", &self.driver.initialized())
            .field("data_source_initialized", &self.data_source.initialized())
            .finish_non_exhaustive()
    }
}
