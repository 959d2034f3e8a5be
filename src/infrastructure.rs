//! Infrastructure layer: SQLite storage, the upstream comment API, config and logging
//!
//! Storage errors are classified once in `storage_error`; everything above
//! this layer branches on those variants instead of driver codes.

pub mod comment_repository;
pub mod comment_sanitizer;
pub mod config;
pub mod database_connection;
pub mod logging;
pub mod request_audit_repository;
pub mod retry_policy;
pub mod schema_guardian;
pub mod storage_error;
pub mod youtube_client;

// Re-export commonly used items
pub use comment_repository::CommentRepository;
pub use config::{AppConfig, ConfigError, DatabaseConfig, LoggingConfig, YoutubeApiConfig};
pub use database_connection::DatabaseConnection;
pub use request_audit_repository::{RequestAuditRepository, RequestAuditor};
pub use retry_policy::RetrySchedule;
pub use schema_guardian::{SchemaBackend, SchemaGuardian, SchemaState};
pub use storage_error::StorageError;
pub use youtube_client::{CommentSource, FetchError, YoutubeClient};
