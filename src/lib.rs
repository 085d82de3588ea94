//! Thin database access layer.
//!
//! Provides `Database` handles over driver registration and pooled data
//! sources: lazy single-flight initialization, raw connection acquisition,
//! scoped execution with guaranteed release, and scoped transactions with
//! commit/rollback decided by the block's exit kind. Pooling itself is an
//! external collaborator; the production implementation delegates to sqlx.

pub mod config;
pub mod database;
pub mod driver;
pub mod error;
pub mod loader;
pub mod pool;
pub mod registry;
pub mod scope;
pub mod sqlx_backend;

pub use config::{DbConfig, PoolOptions};
pub use database::Database;
pub use driver::{Connection, Driver, DriverShim};
pub use error::{BlockError, BlockResult, ControlSignal, DbError, DbResult};
pub use loader::{DriverLoader, StaticDriverLoader};
pub use pool::{ConnectionPool, DataSource};
pub use registry::{DriverRegistry, SharedDriverRegistry};
pub use scope::ScopedConnection;
pub use sqlx_backend::{SqlxConnectionPool, SqlxDriver};
