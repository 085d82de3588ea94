//! Scoped execution and transaction semantics against fake collaborators.
//!
//! The fakes count acquire/close/commit/rollback so the release and
//! commit/rollback guarantees can be asserted exactly.

use async_trait::async_trait;
use db_access::{
    BlockError, Connection, ConnectionPool, Database, DataSource, DbConfig, DbError, DbResult,
    Driver, SharedDriverRegistry, StaticDriverLoader,
};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

#[derive(Default)]
struct Counters {
    acquires: AtomicUsize,
    closes: AtomicUsize,
    commits: AtomicUsize,
    rollbacks: AtomicUsize,
}

struct FakeConnection {
    counters: Arc<Counters>,
    autocommit: bool,
}

#[async_trait]
impl Connection for FakeConnection {
    async fn execute(&mut self, _sql: &str) -> DbResult<u64> {
        Ok(1)
    }

    async fn query_scalar(&mut self, _sql: &str) -> DbResult<Option<i64>> {
        Ok(None)
    }

    async fn set_autocommit(&mut self, enabled: bool) -> DbResult<()> {
        self.autocommit = enabled;
        Ok(())
    }

    fn autocommit(&self) -> bool {
        self.autocommit
    }

    async fn commit(&mut self) -> DbResult<()> {
        if self.autocommit {
            return Err(DbError::transaction("commit in autocommit mode"));
        }
        self.counters.commits.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn rollback(&mut self) -> DbResult<()> {
        if self.autocommit {
            return Err(DbError::transaction("rollback in autocommit mode"));
        }
        self.counters.rollbacks.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn server_url(&self) -> DbResult<String> {
        Ok("fake://db".to_string())
    }

    async fn close(self: Box<Self>) -> DbResult<()> {
        self.counters.closes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

struct FakeDataSource {
    counters: Arc<Counters>,
}

#[async_trait]
impl DataSource for FakeDataSource {
    async fn acquire(&self) -> DbResult<Box<dyn Connection>> {
        self.counters.acquires.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(FakeConnection {
            counters: Arc::clone(&self.counters),
            autocommit: true,
        }))
    }

    async fn close(&self) -> DbResult<()> {
        Ok(())
    }
}

struct FakePool {
    counters: Arc<Counters>,
}

#[async_trait]
impl ConnectionPool for FakePool {
    async fn create(&self, _name: &str, _config: &DbConfig) -> DbResult<Arc<dyn DataSource>> {
        Ok(Arc::new(FakeDataSource {
            counters: Arc::clone(&self.counters),
        }))
    }

    async fn close(&self, data_source: &dyn DataSource) -> DbResult<()> {
        data_source.close().await
    }
}

struct FakeDriver;

#[async_trait]
impl Driver for FakeDriver {
    fn name(&self) -> &str {
        "fake"
    }

    fn accepts(&self, url: &str) -> bool {
        url.starts_with("fake:")
    }

    async fn connect(&self, _url: &str) -> DbResult<Box<dyn Connection>> {
        Err(DbError::connection("fake driver is pool-only"))
    }
}

fn fake_database(counters: Arc<Counters>) -> Database {
    let mut config = DbConfig::new();
    config.set("default", "driver", "fake");
    let mut loader = StaticDriverLoader::empty();
    loader.insert("fake", Arc::new(FakeDriver));
    Database::with_collaborators(
        "default",
        Arc::new(config),
        Arc::new(loader),
        Arc::new(SharedDriverRegistry::new()),
        Arc::new(FakePool { counters }),
    )
}

#[tokio::test]
async fn test_with_connection_closes_once_and_returns_value() {
    let counters = Arc::new(Counters::default());
    let db = fake_database(Arc::clone(&counters));

    let value = db
        .with_connection(|conn| {
            Box::pin(async move {
                conn.execute("INSERT INTO t VALUES (1)").await?;
                Ok(42)
            })
        })
        .await
        .unwrap();

    assert_eq!(value, 42);
    assert_eq!(counters.acquires.load(Ordering::SeqCst), 1);
    assert_eq!(counters.closes.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_with_connection_closes_once_on_error_and_reraises() {
    let counters = Arc::new(Counters::default());
    let db = fake_database(Arc::clone(&counters));

    let err = db
        .with_connection::<(), _>(|_conn| {
            Box::pin(async move { Err(BlockError::app(std::io::Error::other("boom"))) })
        })
        .await
        .unwrap_err();

    match err {
        BlockError::App(source) => assert_eq!(source.to_string(), "boom"),
        other => panic!("expected App error, got {:?}", other),
    }
    assert_eq!(counters.closes.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_with_transaction_commits_on_success() {
    let counters = Arc::new(Counters::default());
    let db = fake_database(Arc::clone(&counters));

    let value = db
        .with_transaction(|conn| {
            Box::pin(async move {
                conn.execute("INSERT INTO t VALUES (1)").await?;
                Ok("done")
            })
        })
        .await
        .unwrap();

    assert_eq!(value, "done");
    assert_eq!(counters.commits.load(Ordering::SeqCst), 1);
    assert_eq!(counters.rollbacks.load(Ordering::SeqCst), 0);
    assert_eq!(counters.closes.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_with_transaction_rolls_back_on_failure_and_never_commits() {
    let counters = Arc::new(Counters::default());
    let db = fake_database(Arc::clone(&counters));

    let err = db
        .with_transaction::<(), _>(|conn| {
            Box::pin(async move {
                conn.execute("INSERT INTO t VALUES (1)").await?;
                Err(BlockError::app(std::io::Error::other("constraint violated")))
            })
        })
        .await
        .unwrap_err();

    match err {
        BlockError::App(source) => assert_eq!(source.to_string(), "constraint violated"),
        other => panic!("expected App error, got {:?}", other),
    }
    assert_eq!(counters.commits.load(Ordering::SeqCst), 0);
    assert_eq!(counters.rollbacks.load(Ordering::SeqCst), 1);
    assert_eq!(counters.closes.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_with_transaction_commits_on_control_signal_and_reraises_it() {
    let counters = Arc::new(Counters::default());
    let db = fake_database(Arc::clone(&counters));

    let err = db
        .with_transaction::<(), _>(|conn| {
            Box::pin(async move {
                conn.execute("INSERT INTO t VALUES (1)").await?;
                Err(BlockError::signal("early-exit"))
            })
        })
        .await
        .unwrap_err();

    match err {
        BlockError::Signal(signal) => assert_eq!(signal.label(), "early-exit"),
        other => panic!("expected Signal, got {:?}", other),
    }
    assert_eq!(counters.commits.load(Ordering::SeqCst), 1);
    assert_eq!(counters.rollbacks.load(Ordering::SeqCst), 0);
    assert_eq!(counters.closes.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_with_transaction_db_error_rolls_back() {
    let counters = Arc::new(Counters::default());
    let db = fake_database(Arc::clone(&counters));

    let err = db
        .with_transaction::<(), _>(|_conn| {
            Box::pin(async move { Err(BlockError::from(DbError::database("duplicate key", None))) })
        })
        .await
        .unwrap_err();

    assert!(err.is_failure());
    assert_eq!(counters.commits.load(Ordering::SeqCst), 0);
    assert_eq!(counters.rollbacks.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_get_connection_autocommit_modes() {
    let counters = Arc::new(Counters::default());
    let db = fake_database(Arc::clone(&counters));

    let conn = db.get_connection().await.unwrap();
    assert!(conn.autocommit());
    conn.close().await.unwrap();

    let conn = db.get_connection_with(false).await.unwrap();
    assert!(!conn.autocommit());
    conn.close().await.unwrap();

    assert_eq!(counters.closes.load(Ordering::SeqCst), 2);
}
