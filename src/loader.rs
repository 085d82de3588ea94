//! Driver loading.
//!
//! The loader resolves a configured driver name to a driver instance. It is
//! the Rust counterpart of loading a driver class through a class loader:
//! the set of loadable drivers is fixed at loader construction time, and an
//! unknown name surfaces as a driver-not-found error naming the cause.

use crate::driver::Driver;
use crate::error::{DbError, DbResult};
use crate::sqlx_backend::SqlxDriver;
use std::collections::HashMap;
use std::sync::Arc;

/// Capability that produces driver instances from configured names.
pub trait DriverLoader: Send + Sync {
    fn load(&self, driver: &str) -> DbResult<Arc<dyn Driver>>;
}

/// Loader over a fixed name-to-instance table.
pub struct StaticDriverLoader {
    drivers: HashMap<String, Arc<dyn Driver>>,
}

impl StaticDriverLoader {
    /// An empty loader. Useful for embedders that only install their own
    /// drivers via [`StaticDriverLoader::insert`].
    pub fn empty() -> Self {
        Self {
            drivers: HashMap::new(),
        }
    }

    /// Loader knowing the sqlx-backed engines: `postgres` (alias
    /// `postgresql`), `mysql` (alias `mariadb`), and `sqlite`.
    pub fn with_builtin_drivers() -> Self {
        let mut loader = Self::empty();
        let postgres: Arc<dyn Driver> = Arc::new(SqlxDriver::postgres());
        let mysql: Arc<dyn Driver> = Arc::new(SqlxDriver::mysql());
        let sqlite: Arc<dyn Driver> = Arc::new(SqlxDriver::sqlite());
        loader.insert("postgres", Arc::clone(&postgres));
        loader.insert("postgresql", postgres);
        loader.insert("mysql", Arc::clone(&mysql));
        loader.insert("mariadb", mysql);
        loader.insert("sqlite", sqlite);
        loader
    }

    /// Make a driver loadable under the given name.
    pub fn insert(&mut self, name: impl Into<String>, driver: Arc<dyn Driver>) {
        self.drivers.insert(name.into(), driver);
    }
}

impl Default for StaticDriverLoader {
    fn default() -> Self {
        Self::with_builtin_drivers()
    }
}

impl DriverLoader for StaticDriverLoader {
    fn load(&self, driver: &str) -> DbResult<Arc<dyn Driver>> {
        self.drivers.get(driver).map(Arc::clone).ok_or_else(|| {
            let known: Vec<&str> = {
                let mut names: Vec<&str> = self.drivers.keys().map(String::as_str).collect();
                names.sort_unstable();
                names
            };
            DbError::driver_not_found(
                driver,
                format!("unknown driver name (known: {})", known.join(", ")),
            )
        })
    }
}
