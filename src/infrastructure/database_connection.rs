// Database connection and pool management
// This module handles SQLite database connections using sqlx

use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::{PoisonError, RwLock};
use std::time::Duration;

use async_trait::async_trait;
use sqlx::migrate::Migrator;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::SqlitePool;
use tracing::{info, warn};

use super::schema_guardian::SchemaBackend;
use super::storage_error::StorageError;
use crate::domain::constants::storage::REQUIRED_TABLES;

/// Embedded schema migrations (`./migrations`)
static MIGRATOR: Migrator = sqlx::migrate!("./migrations");

const MAX_CONNECTIONS: u32 = 10;
const DEFAULT_BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Owns the SQLite pool. The pool is swappable so the storage file can be
/// destroyed and recreated while the process keeps running.
pub struct DatabaseConnection {
    options: SqliteConnectOptions,
    in_memory: bool,
    pool: RwLock<SqlitePool>,
}

impl DatabaseConnection {
    pub async fn new(database_url: &str) -> Result<Self, StorageError> {
        Self::with_busy_timeout(database_url, DEFAULT_BUSY_TIMEOUT).await
    }

    pub async fn with_busy_timeout(database_url: &str, busy_timeout: Duration) -> Result<Self, StorageError> {
        let in_memory = is_in_memory_url(database_url);
        let mut options = SqliteConnectOptions::from_str(database_url)?
            .create_if_missing(true)
            .busy_timeout(busy_timeout)
            .foreign_keys(true);
        if !in_memory {
            options = options.journal_mode(SqliteJournalMode::Wal);

            // Create database file directory if it doesn't exist
            if let Some(parent) = options.get_filename().parent() {
                if !parent.as_os_str().is_empty() {
                    tokio::fs::create_dir_all(parent).await?;
                }
            }
        }

        let pool = Self::connect(&options, in_memory).await?;
        info!("🗄️ Database connected: {}", database_url);

        Ok(Self {
            options,
            in_memory,
            pool: RwLock::new(pool),
        })
    }

    async fn connect(options: &SqliteConnectOptions, in_memory: bool) -> Result<SqlitePool, StorageError> {
        let pool_options = if in_memory {
            // Every connection to `:memory:` is its own database, so keep exactly one alive
            SqlitePoolOptions::new()
                .max_connections(1)
                .min_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
        } else {
            SqlitePoolOptions::new().max_connections(MAX_CONNECTIONS)
        };

        Ok(pool_options.connect_with(options.clone()).await?)
    }

    /// Current pool handle (cheap clone)
    pub fn pool(&self) -> SqlitePool {
        self.pool
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn database_path(&self) -> Option<PathBuf> {
        (!self.in_memory).then(|| self.options.get_filename().to_path_buf())
    }

    /// Apply pending embedded migrations
    pub async fn migrate(&self) -> Result<(), StorageError> {
        MIGRATOR.run(&self.pool()).await?;
        Ok(())
    }

    /// Required tables that `sqlite_master` does not know about
    pub async fn missing_tables(&self) -> Result<Vec<String>, StorageError> {
        let pool = self.pool();
        let mut missing = Vec::new();

        for table in REQUIRED_TABLES {
            let found = sqlx::query("SELECT name FROM sqlite_master WHERE type = 'table' AND name = ?")
                .bind(table)
                .fetch_optional(&pool)
                .await?;

            if found.is_none() {
                missing.push(table.to_string());
            }
        }

        Ok(missing)
    }

    /// Throw the whole database away and start from an empty one
    ///
    /// A fresh pool is installed even when removing a file fails, so callers
    /// never keep talking to the closed one.
    pub async fn recreate_storage(&self) -> Result<(), StorageError> {
        if self.in_memory {
            return self.drop_all_tables().await;
        }

        let old_pool = self.pool();
        old_pool.close().await;

        let path = self.options.get_filename().to_path_buf();
        let mut removal = Ok(());
        for file in storage_files(&path) {
            match tokio::fs::remove_file(&file).await {
                Ok(()) => info!("🗑️ Removed database file: {}", file.display()),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => {
                    warn!("⚠️ Could not remove {}: {}", file.display(), e);
                    if removal.is_ok() {
                        removal = Err(e);
                    }
                }
            }
        }

        self.install_new_pool().await?;
        removal?;

        warn!("♻️ Database recreated at {}", path.display());
        Ok(())
    }

    /// Reconnect when the current pool was closed (shutdown or an
    /// interrupted rebuild).
    pub async fn reopen_if_closed(&self) -> Result<(), StorageError> {
        if !self.pool().is_closed() {
            return Ok(());
        }
        info!("🔌 Database pool was closed; reconnecting");
        self.install_new_pool().await
    }

    async fn install_new_pool(&self) -> Result<(), StorageError> {
        let new_pool = Self::connect(&self.options, self.in_memory).await?;
        *self.pool.write().unwrap_or_else(PoisonError::into_inner) = new_pool;
        Ok(())
    }

    async fn drop_all_tables(&self) -> Result<(), StorageError> {
        let pool = self.pool();
        let tables: Vec<String> = sqlx::query_scalar(
            "SELECT name FROM sqlite_master WHERE type = 'table' AND name NOT LIKE 'sqlite_%'",
        )
        .fetch_all(&pool)
        .await?;

        for table in &tables {
            sqlx::query(&format!("DROP TABLE IF EXISTS \"{}\"", table.replace('"', "\"\"")))
                .execute(&pool)
                .await?;
        }

        warn!("♻️ Dropped {} tables from in-memory database", tables.len());
        Ok(())
    }

    /// Close the pool, waiting for checked-out connections to return
    pub async fn close(&self) {
        self.pool().close().await;
        info!("🔒 Database connection closed");
    }
}

#[async_trait]
impl SchemaBackend for DatabaseConnection {
    async fn apply_migrations(&self) -> Result<(), StorageError> {
        self.reopen_if_closed().await?;
        self.migrate().await
    }

    async fn missing_tables(&self) -> Result<Vec<String>, StorageError> {
        Self::missing_tables(self).await
    }

    async fn recreate_storage(&self) -> Result<(), StorageError> {
        Self::recreate_storage(self).await
    }
}

fn is_in_memory_url(database_url: &str) -> bool {
    database_url.contains(":memory:") || database_url.contains("mode=memory")
}

/// Main file plus WAL side files
fn storage_files(path: &Path) -> [PathBuf; 3] {
    let with_suffix = |suffix: &str| {
        let mut name = path.as_os_str().to_owned();
        name.push(suffix);
        PathBuf::from(name)
    };
    [path.to_path_buf(), with_suffix("-wal"), with_suffix("-shm")]
}
