use rusqlite::Connection;
use std::path::{Path, PathBuf};
use tokio::task;
use crate::error::{Result, CatalogError};

pub mod migrate;

/// WAL for concurrent readers during an upload, foreign keys for the cascade rules,
/// and a busy timeout so racing get-or-create writers wait instead of failing.
const CONNECTION_PRAGMAS: &str = "PRAGMA journal_mode = WAL; \
     PRAGMA synchronous = NORMAL; \
     PRAGMA foreign_keys = ON; \
     PRAGMA busy_timeout = 5000; \
     PRAGMA temp_store = MEMORY;";

/// Database connection wrapper
#[derive(Debug, Clone)]
pub struct Db {
    path: PathBuf,
}

impl Db {
    /// Create a new database connection manager
    pub fn new<P: AsRef<Path>>(db_path: P) -> Self {
        Self {
            path: db_path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Open a new database connection with the catalog pragmas applied
    pub fn open_connection(&self) -> Result<Connection> {
        open(&self.path)
    }

    /// Execute a closure with a database connection in a blocking task
    pub async fn with_connection<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut Connection) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let path = self.path.clone();
        task::spawn_blocking(move || {
            let mut conn = open(&path)?;
            f(&mut conn)
        })
        .await
        .map_err(|e| CatalogError::Io(std::io::Error::new(std::io::ErrorKind::Other, e)))?
    }

    /// Apply pending migrations from `migrations_dir`
    pub async fn migrate(&self, migrations_dir: &Path) -> Result<()> {
        let migrations_dir = migrations_dir.to_path_buf();
        self.with_connection(move |conn| migrate::run_migrations(conn, &migrations_dir))
            .await
    }
}

fn open(path: &Path) -> Result<Connection> {
    let conn = Connection::open(path).map_err(CatalogError::Database)?;
    conn.execute_batch(CONNECTION_PRAGMAS)?;
    Ok(conn)
}

/// Migrated database in a fresh temp dir, for tests across the crate.
#[cfg(test)]
pub(crate) async fn test_db() -> (Db, tempfile::TempDir) {
    let temp_dir = tempfile::TempDir::new().unwrap();
    let db = Db::new(temp_dir.path().join("test.db"));
    db.migrate(&Path::new(env!("CARGO_MANIFEST_DIR")).join("migrations"))
        .await
        .unwrap();
    (db, temp_dir)
}

/// Synchronous counterpart of [`test_db`] for store-level tests.
#[cfg(test)]
pub(crate) fn test_connection() -> (Connection, tempfile::TempDir) {
    let temp_dir = tempfile::TempDir::new().unwrap();
    let mut conn = open(&temp_dir.path().join("test.db")).unwrap();
    migrate::run_migrations(&mut conn, &Path::new(env!("CARGO_MANIFEST_DIR")).join("migrations"))
        .unwrap();
    (conn, temp_dir)
}
