//! Repository for stored top-level comments
//!
//! Writes are whole-video replacements inside one transaction; reads stream
//! rows newest-first into [`CommentPageBuilder`] and stop as soon as the page
//! and its `has_more` flag are known.

#![allow(clippy::uninlined_format_args)]

use std::sync::Arc;

use futures::TryStreamExt;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, Sqlite, Transaction};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use super::database_connection::DatabaseConnection;
use super::retry_policy::{RetrySchedule, retry_transient};
use super::storage_error::StorageError;
use crate::domain::comment::{CommentsPage, YoutubeComment};
use crate::domain::comment_view::CommentPageBuilder;

const SELECT_COLUMNS: &str = "video_id, comment_id, author_channel_id, author_display_name, \
     author_channel_url, comment_text, published_at, retrieved_at";

#[derive(Clone)]
pub struct CommentRepository {
    db: Arc<DatabaseConnection>,
    retry_schedule: RetrySchedule,
}

impl CommentRepository {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self {
            db,
            retry_schedule: RetrySchedule::default(),
        }
    }

    #[must_use]
    pub fn with_retry_schedule(mut self, retry_schedule: RetrySchedule) -> Self {
        self.retry_schedule = retry_schedule;
        self
    }

    // ===============================
    // WRITE OPERATIONS
    // ===============================

    /// Replace every stored comment of `video_id` with `comments`, retrying
    /// the whole transaction on transient faults.
    ///
    /// Callers must already hold the per-video lock.
    pub async fn replace_for_video(
        &self,
        video_id: &str,
        comments: &[YoutubeComment],
        cancel: &CancellationToken,
    ) -> Result<(), StorageError> {
        retry_transient(&self.retry_schedule, cancel, "comment replace", || {
            self.replace_once(video_id, comments, cancel)
        })
        .await?;

        info!("💾 Stored {} comments for video {}", comments.len(), video_id);
        Ok(())
    }

    /// One transactional attempt: delete all rows for the video, insert the new set, commit.
    async fn replace_once(
        &self,
        video_id: &str,
        comments: &[YoutubeComment],
        cancel: &CancellationToken,
    ) -> Result<(), StorageError> {
        let pool = self.db.pool();

        let work = async {
            let mut tx = pool.begin().await?;

            let deleted = sqlx::query("DELETE FROM youtube_comments WHERE video_id = ?")
                .bind(video_id)
                .execute(&mut *tx)
                .await?
                .rows_affected();

            for comment in comments {
                Self::insert_comment(&mut tx, comment).await?;
            }

            tx.commit().await?;
            debug!(
                "Replaced comments for {}: {} deleted, {} inserted",
                video_id,
                deleted,
                comments.len()
            );
            Ok::<(), StorageError>(())
        };

        // Dropping an uncommitted transaction rolls it back
        tokio::select! {
            result = work => result,
            () = cancel.cancelled() => Err(StorageError::Cancelled),
        }
    }

    async fn insert_comment(tx: &mut Transaction<'_, Sqlite>, comment: &YoutubeComment) -> Result<(), StorageError> {
        sqlx::query(
            r#"
            INSERT INTO youtube_comments
            (video_id, comment_id, author_channel_id, author_display_name,
             author_channel_url, comment_text, published_at, retrieved_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&comment.video_id)
        .bind(&comment.comment_id)
        .bind(&comment.author_channel_id)
        .bind(&comment.author_display_name)
        .bind(&comment.author_channel_url)
        .bind(&comment.comment_text)
        .bind(comment.published_at)
        .bind(comment.retrieved_at)
        .execute(&mut **tx)
        .await?;
        Ok(())
    }

    // ===============================
    // READ OPERATIONS
    // ===============================

    /// Build one page of the author-deduplicated view straight from storage.
    pub async fn load_page(
        &self,
        video_id: &str,
        mut builder: CommentPageBuilder,
        cancel: &CancellationToken,
    ) -> Result<CommentsPage, StorageError> {
        let pool = self.db.pool();
        let sql = format!(
            "SELECT {} FROM youtube_comments WHERE video_id = ? ORDER BY published_at DESC, id ASC",
            SELECT_COLUMNS
        );

        let scan = async {
            let mut rows = sqlx::query(&sql).bind(video_id).fetch(&pool);
            while let Some(row) = rows.try_next().await? {
                let comment = map_row(&row)?;
                if builder.push(&comment).is_break() {
                    break;
                }
            }
            Ok::<(), StorageError>(())
        };

        tokio::select! {
            result = scan => result?,
            () = cancel.cancelled() => return Err(StorageError::Cancelled),
        }

        Ok(builder.finish(video_id))
    }

    /// All stored comments for a video, newest first
    pub async fn list_for_video(&self, video_id: &str) -> Result<Vec<YoutubeComment>, StorageError> {
        let sql = format!(
            "SELECT {} FROM youtube_comments WHERE video_id = ? ORDER BY published_at DESC, id ASC",
            SELECT_COLUMNS
        );
        let rows = sqlx::query(&sql).bind(video_id).fetch_all(&self.db.pool()).await?;

        rows.iter().map(|row| map_row(row).map_err(StorageError::from)).collect()
    }

    pub async fn count_for_video(&self, video_id: &str) -> Result<i64, StorageError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM youtube_comments WHERE video_id = ?")
            .bind(video_id)
            .fetch_one(&self.db.pool())
            .await?;
        Ok(count)
    }
}

fn map_row(row: &SqliteRow) -> Result<YoutubeComment, sqlx::Error> {
    Ok(YoutubeComment {
        video_id: row.try_get("video_id")?,
        comment_id: row.try_get("comment_id")?,
        author_channel_id: row.try_get("author_channel_id")?,
        author_display_name: row.try_get("author_display_name")?,
        author_channel_url: row.try_get("author_channel_url")?,
        comment_text: row.try_get("comment_text")?,
        published_at: row.try_get("published_at")?,
        retrieved_at: row.try_get("retrieved_at")?,
    })
}
