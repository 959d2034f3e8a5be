//! Storage error types
//!
//! SQLite failures are classified once, here, so that callers branch on
//! variants instead of inspecting driver error codes.

use thiserror::Error;

/// SQLite primary result codes we care about
const SQLITE_ERROR: i32 = 1;
const SQLITE_BUSY: i32 = 5;
const SQLITE_LOCKED: i32 = 6;

#[derive(Error, Debug)]
pub enum StorageError {
    /// Contention-driven, worth retrying (BUSY / LOCKED)
    #[error("Transient storage fault: {message}")]
    Transient { message: String, code: Option<String> },

    #[error("Transient storage fault persisted after {attempts} attempts: {last}")]
    RetriesExhausted {
        attempts: usize,
        #[source]
        last: Box<StorageError>,
    },

    /// A table the schema promises is not there ("no such table")
    #[error("Storage schema is missing: {message}")]
    SchemaMissing { message: String },

    #[error("Storage schema is corrupt, missing tables after repair: {}", missing_tables.join(", "))]
    SchemaCorrupt { missing_tables: Vec<String> },

    #[error("Schema migration failed: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("Storage I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Database error: {0}")]
    Database(#[source] sqlx::Error),

    #[error("Schema initialization task failed: {0}")]
    InitTask(#[from] tokio::task::JoinError),

    #[error("Storage operation was cancelled")]
    Cancelled,
}

impl StorageError {
    pub const fn is_transient(&self) -> bool {
        matches!(self, Self::Transient { .. })
    }

    pub const fn is_schema_missing(&self) -> bool {
        matches!(self, Self::SchemaMissing { .. })
    }
}

impl From<sqlx::Error> for StorageError {
    fn from(error: sqlx::Error) -> Self {
        match &error {
            sqlx::Error::Database(db_error) => {
                let code = db_error.code().map(|c| c.to_string());
                let message = db_error.message().to_string();
                let primary = code
                    .as_deref()
                    .and_then(|c| c.parse::<i32>().ok())
                    .map(|c| c & 0xff);

                match primary {
                    Some(SQLITE_BUSY | SQLITE_LOCKED) => Self::Transient { message, code },
                    Some(SQLITE_ERROR) if is_missing_table_message(&message) => {
                        Self::SchemaMissing { message }
                    }
                    _ => Self::Database(error),
                }
            }
            // PoolClosed: the pool was swapped out by a storage rebuild;
            // the next attempt picks up the new one.
            sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed => Self::Transient {
                message: error.to_string(),
                code: None,
            },
            _ => Self::Database(error),
        }
    }
}

fn is_missing_table_message(message: &str) -> bool {
    message.to_ascii_lowercase().contains("no such table")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_table_message_is_case_insensitive() {
        assert!(is_missing_table_message("no such table: youtube_comments"));
        assert!(is_missing_table_message("No Such Table: api_request_logs"));
        assert!(!is_missing_table_message("no such column: foo"));
    }

    #[test]
    fn pool_timeout_is_transient() {
        assert!(StorageError::from(sqlx::Error::PoolTimedOut).is_transient());
    }

    #[test]
    fn pool_closed_is_transient() {
        assert!(StorageError::from(sqlx::Error::PoolClosed).is_transient());
    }

    #[test]
    fn row_not_found_is_not_transient() {
        let err = StorageError::from(sqlx::Error::RowNotFound);
        assert!(!err.is_transient());
        assert!(!err.is_schema_missing());
    }

    #[test]
    fn corrupt_lists_tables() {
        let err = StorageError::SchemaCorrupt {
            missing_tables: vec!["a".to_string(), "b".to_string()],
        };
        assert!(err.to_string().ends_with("a, b"));
    }
}
