//! Driver registry.
//!
//! The registry is an injected capability rather than a hidden global: a
//! process-wide shared instance exists for production use, and tests can
//! construct isolated instances. Deregistration is identity-based, which is
//! why `Database` registers a [`DriverShim`](crate::DriverShim) with its own
//! identity instead of the loader-provided driver.

use crate::driver::Driver;
use crate::error::{DbError, DbResult};
use std::sync::{Arc, Mutex, OnceLock};
use tracing::{debug, warn};

/// Registry capability for process-wide driver state.
pub trait DriverRegistry: Send + Sync {
    /// Add a driver. The same underlying engine may be registered more than
    /// once (by distinct handles); entries are distinguished by identity.
    fn register(&self, driver: Arc<dyn Driver>) -> DbResult<()>;

    /// Remove a previously registered driver by identity.
    fn deregister(&self, driver: &Arc<dyn Driver>) -> DbResult<()>;

    /// Number of registered drivers.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether any registered driver accepts the given URL.
    fn accepts(&self, url: &str) -> bool;
}

/// Mutex-guarded driver list; the default `DriverRegistry` implementation.
#[derive(Default)]
pub struct SharedDriverRegistry {
    drivers: Mutex<Vec<Arc<dyn Driver>>>,
}

impl SharedDriverRegistry {
    /// Create an isolated registry (used by tests and embedders that do not
    /// want process-wide state).
    pub fn new() -> Self {
        Self::default()
    }

    /// The process-wide registry instance.
    pub fn global() -> Arc<SharedDriverRegistry> {
        static GLOBAL: OnceLock<Arc<SharedDriverRegistry>> = OnceLock::new();
        Arc::clone(GLOBAL.get_or_init(|| Arc::new(SharedDriverRegistry::new())))
    }
}

impl DriverRegistry for SharedDriverRegistry {
    fn register(&self, driver: Arc<dyn Driver>) -> DbResult<()> {
        let mut drivers = self
            .drivers
            .lock()
            .map_err(|_| DbError::internal("driver registry lock poisoned"))?;
        debug!(driver = driver.name(), "Registering driver");
        drivers.push(driver);
        Ok(())
    }

    fn deregister(&self, driver: &Arc<dyn Driver>) -> DbResult<()> {
        let mut drivers = self
            .drivers
            .lock()
            .map_err(|_| DbError::internal("driver registry lock poisoned"))?;
        let before = drivers.len();
        drivers.retain(|d| !Arc::ptr_eq(d, driver));
        if drivers.len() == before {
            warn!(driver = driver.name(), "Deregister: driver was not registered");
        } else {
            debug!(driver = driver.name(), "Deregistered driver");
        }
        Ok(())
    }

    fn len(&self) -> usize {
        self.drivers.lock().map(|d| d.len()).unwrap_or(0)
    }

    fn accepts(&self, url: &str) -> bool {
        self.drivers
            .lock()
            .map(|drivers| drivers.iter().any(|d| d.accepts(url)))
            .unwrap_or(false)
    }
}
