//! Comment retrieval use case
//!
//! One call drains the upstream comment API for a video, replaces what is
//! stored for it, and answers with one page of the author-deduplicated view.
//!
//! Order of work:
//! 1. argument / configuration checks
//! 2. schema readiness
//! 3. upstream drain + natural-key dedup
//! 4. replace under the per-video lock, then read the page
//!
//! Step 4 recovers once from a vanished table by resetting the schema
//! guardian and repeating the step.

#![allow(clippy::uninlined_format_args)]

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use super::errors::CommentServiceError;
use super::video_locks::VideoLockTable;
use crate::domain::comment::{CommentsPage, YoutubeComment};
use crate::domain::comment_view::{CommentPageBuilder, normalize_page};
use crate::domain::constants::{storage, view};
use crate::domain::deduplication::deduplicate_comments;
use crate::domain::request_audit::RequestAudit;
use crate::infrastructure::comment_repository::CommentRepository;
use crate::infrastructure::config::AppConfig;
use crate::infrastructure::database_connection::DatabaseConnection;
use crate::infrastructure::request_audit_repository::{RequestAuditRepository, RequestAuditor};
use crate::infrastructure::retry_policy::RetrySchedule;
use crate::infrastructure::schema_guardian::{SchemaBackend, SchemaGuardian};
use crate::infrastructure::storage_error::StorageError;
use crate::infrastructure::youtube_client::{CommentSource, YoutubeClient};

pub struct CommentService {
    db: Arc<DatabaseConnection>,
    source: Arc<dyn CommentSource>,
    repository: CommentRepository,
    schema: Arc<SchemaGuardian>,
    video_locks: VideoLockTable,
    auditor: Option<Arc<dyn RequestAuditor>>,
    api_key_configured: bool,
    page_size: usize,
}

impl CommentService {
    /// Service over an already connected database.
    ///
    /// `api_key_configured == false` makes every retrieval fail with
    /// `Misconfigured` before anything else runs.
    pub fn new(source: Arc<dyn CommentSource>, db: Arc<DatabaseConnection>, api_key_configured: bool) -> Self {
        Self {
            source,
            repository: CommentRepository::new(Arc::clone(&db)),
            schema: Arc::new(SchemaGuardian::new(Arc::clone(&db) as Arc<dyn SchemaBackend>)),
            db,
            video_locks: VideoLockTable::new(),
            auditor: None,
            api_key_configured,
            page_size: view::PAGE_SIZE,
        }
    }

    /// Wire the full service from configuration: YouTube client, SQLite
    /// storage and the request audit log.
    pub async fn connect(config: &AppConfig) -> Result<Self, CommentServiceError> {
        let source = Arc::new(YoutubeClient::new(&config.youtube)?);
        let db = Arc::new(
            DatabaseConnection::with_busy_timeout(
                &config.database.url,
                Duration::from_millis(config.database.busy_timeout_ms),
            )
            .await?,
        );
        let auditor = Arc::new(RequestAuditRepository::new(Arc::clone(&db)));

        Ok(Self::new(source, db, config.youtube.has_api_key()).with_auditor(auditor))
    }

    #[must_use]
    pub fn with_auditor(mut self, auditor: Arc<dyn RequestAuditor>) -> Self {
        self.auditor = Some(auditor);
        self
    }

    /// Verify the schema through `backend` instead of the service database,
    /// e.g. when migrations are owned by a separate deployment step.
    #[must_use]
    pub fn with_schema_backend(mut self, backend: Arc<dyn SchemaBackend>) -> Self {
        self.schema = Arc::new(SchemaGuardian::new(backend));
        self
    }

    #[must_use]
    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    #[must_use]
    pub fn with_retry_schedule(mut self, schedule: RetrySchedule) -> Self {
        self.repository = self.repository.with_retry_schedule(schedule);
        self
    }

    pub fn schema(&self) -> &SchemaGuardian {
        &self.schema
    }

    pub fn repository(&self) -> &CommentRepository {
        &self.repository
    }

    /// Close the database pool once no more requests will be served.
    pub async fn shutdown(&self) {
        self.db.close().await;
    }

    // ===============================
    // RETRIEVAL
    // ===============================

    /// Refresh the stored comments of `video_id` from upstream and return the
    /// requested page (pages below 1 are treated as 1).
    pub async fn get_top_level_comments(
        &self,
        video_id: &str,
        page: i64,
        cancel: &CancellationToken,
    ) -> Result<CommentsPage, CommentServiceError> {
        let video_id = validate_video_id(video_id)?;

        if !self.api_key_configured {
            return Err(CommentServiceError::Misconfigured(
                "YouTube API key is not configured".to_string(),
            ));
        }

        self.schema.ensure_ready(cancel).await?;

        let page = normalize_page(page);
        let fetched = self.source.fetch_all_comments(video_id, cancel).await?;
        let fetched_count = fetched.len();
        let comments = deduplicate_comments(fetched);
        if comments.len() != fetched_count {
            info!(
                "🧹 Collapsed {} duplicate comments for {}",
                fetched_count - comments.len(),
                video_id
            );
        }

        match self.store_and_read(video_id, &comments, page, cancel).await {
            Err(e) if e.is_schema_missing() => {
                warn!("🩹 Comment table vanished during request for {}; rebuilding schema: {}", video_id, e);
                self.schema.reset();
                self.schema.ensure_ready(cancel).await?;
                Ok(self.store_and_read(video_id, &comments, page, cancel).await?)
            }
            other => Ok(other?),
        }
    }

    /// [`Self::get_top_level_comments`] plus a best-effort request audit.
    pub async fn retrieve_and_audit(
        &self,
        video_id: &str,
        page: i64,
        requester_address: Option<String>,
        cancel: &CancellationToken,
    ) -> Result<CommentsPage, CommentServiceError> {
        let result = self.get_top_level_comments(video_id, page, cancel).await?;

        if let Some(auditor) = &self.auditor {
            let audit = RequestAudit::now(&result.video_id, result.page, result.comments.len(), requester_address);
            if let Err(e) = auditor.record(&audit).await {
                warn!("⚠️ Failed to record request audit for {}: {}", result.video_id, e);
            }
        }

        Ok(result)
    }

    /// Replace under the video lock, then read the page without it.
    async fn store_and_read(
        &self,
        video_id: &str,
        comments: &[YoutubeComment],
        page: u32,
        cancel: &CancellationToken,
    ) -> Result<CommentsPage, StorageError> {
        {
            let _lock = self
                .video_locks
                .acquire(video_id, cancel)
                .await
                .ok_or(StorageError::Cancelled)?;
            self.repository.replace_for_video(video_id, comments, cancel).await?;
        }

        let builder = CommentPageBuilder::with_page_size(page, self.page_size);
        let result = self.repository.load_page(video_id, builder, cancel).await?;
        info!(
            "📤 Page {} of {}: {} comments (has_more: {})",
            result.page,
            video_id,
            result.comments.len(),
            result.has_more
        );
        Ok(result)
    }
}

fn validate_video_id(video_id: &str) -> Result<&str, CommentServiceError> {
    let video_id = video_id.trim();
    if video_id.is_empty() {
        return Err(CommentServiceError::InvalidArgument("videoId is required".to_string()));
    }
    if video_id.chars().count() > storage::MAX_VIDEO_ID_CHARS {
        return Err(CommentServiceError::InvalidArgument(format!(
            "videoId must be at most {} characters",
            storage::MAX_VIDEO_ID_CHARS
        )));
    }
    Ok(video_id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn video_id_is_trimmed_and_bounded() {
        assert_eq!(validate_video_id("  dQw4w9WgXcQ ").unwrap(), "dQw4w9WgXcQ");
        assert!(matches!(validate_video_id("   "), Err(CommentServiceError::InvalidArgument(_))));
        assert!(validate_video_id(&"v".repeat(64)).is_ok());
        assert!(validate_video_id(&"v".repeat(65)).is_err());
    }
}
