//! Best-effort request audit log (`api_request_logs`)

use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use super::database_connection::DatabaseConnection;
use super::storage_error::StorageError;
use crate::domain::request_audit::RequestAudit;

/// Receives one record per successful retrieval
#[async_trait]
pub trait RequestAuditor: Send + Sync {
    async fn record(&self, audit: &RequestAudit) -> Result<(), StorageError>;
}

#[derive(Clone)]
pub struct RequestAuditRepository {
    db: Arc<DatabaseConnection>,
}

impl RequestAuditRepository {
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    pub async fn count_for_video(&self, video_id: &str) -> Result<i64, StorageError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM api_request_logs WHERE video_id = ?")
            .bind(video_id)
            .fetch_one(&self.db.pool())
            .await?;
        Ok(count)
    }
}

#[async_trait]
impl RequestAuditor for RequestAuditRepository {
    async fn record(&self, audit: &RequestAudit) -> Result<(), StorageError> {
        sqlx::query(
            r#"
            INSERT INTO api_request_logs
            (video_id, timestamp_utc, requested_page, returned_count, request_ip)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(&audit.video_id)
        .bind(audit.timestamp_utc)
        .bind(i64::from(audit.page))
        .bind(i64::try_from(audit.returned_count).unwrap_or(i64::MAX))
        .bind(&audit.requester_address)
        .execute(&self.db.pool())
        .await?;

        debug!(
            "📝 Request logged: video={} page={} returned={}",
            audit.video_id, audit.page, audit.returned_count
        );
        Ok(())
    }
}
