//! YouTube Data API client for top-level comment threads
//!
//! Drains `commentThreads` for one video by following `nextPageToken` until
//! the upstream stops returning one. Every field is read defensively: items
//! without a comment snippet are skipped, missing fields fall back to
//! defaults, and nothing short of a transport failure, a non-success status
//! or a non-JSON body aborts the drain.

#![allow(clippy::uninlined_format_args)]

use std::num::NonZeroU32;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use governor::{
    Quota, RateLimiter,
    clock::DefaultClock,
    state::{InMemoryState, direct::NotKeyed},
};
use reqwest::Client;
use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};
use serde_json::Value;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use url::Url;
use uuid::Uuid;

use super::comment_sanitizer::{parse_published_at, sanitize_comment};
use super::config::YoutubeApiConfig;
use crate::domain::comment::{YoutubeComment, truncate_chars};
use crate::domain::constants::{storage, youtube};

#[derive(Error, Debug)]
pub enum FetchError {
    /// Connection failure, timeout or unreadable body
    #[error("Request to the comment API failed: {0}")]
    RequestFailed(#[from] reqwest::Error),

    #[error("Comment API returned status {status_code}: {body}")]
    Upstream { status_code: u16, body: String },

    #[error("Comment API returned a body that is not JSON: {0}")]
    InvalidPayload(#[from] serde_json::Error),

    #[error("Invalid comment API configuration: {0}")]
    InvalidConfig(String),

    #[error("Comment fetch was cancelled")]
    Cancelled,
}

/// Anything able to produce every top-level comment of a video
#[async_trait]
pub trait CommentSource: Send + Sync {
    async fn fetch_all_comments(
        &self,
        video_id: &str,
        cancel: &CancellationToken,
    ) -> Result<Vec<YoutubeComment>, FetchError>;
}

pub struct YoutubeClient {
    client: Client,
    rate_limiter: RateLimiter<NotKeyed, InMemoryState, DefaultClock>,
    threads_url: Url,
    api_key: String,
    page_size: u32,
}

impl YoutubeClient {
    pub fn new(config: &YoutubeApiConfig) -> Result<Self, FetchError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(&config.user_agent)
                .map_err(|e| FetchError::InvalidConfig(format!("invalid user agent: {}", e)))?,
        );

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .default_headers(headers)
            .build()?;

        let quota = Quota::per_second(
            NonZeroU32::new(config.max_requests_per_second)
                .ok_or_else(|| FetchError::InvalidConfig("rate limit must be greater than 0".to_string()))?,
        );

        Ok(Self {
            client,
            rate_limiter: RateLimiter::direct(quota),
            threads_url: threads_endpoint(&config.base_url)?,
            api_key: config.api_key.clone(),
            page_size: config.effective_page_size(),
        })
    }

    /// Fetch one continuation page and return its parsed body.
    async fn fetch_page(
        &self,
        video_id: &str,
        page_token: Option<&str>,
        cancel: &CancellationToken,
    ) -> Result<Value, FetchError> {
        if cancel.is_cancelled() {
            return Err(FetchError::Cancelled);
        }

        tokio::select! {
            _ = self.rate_limiter.until_ready() => {},
            () = cancel.cancelled() => return Err(FetchError::Cancelled),
        }

        let page_size = self.page_size.to_string();
        let mut query: Vec<(&str, &str)> = vec![
            ("part", "snippet"),
            ("videoId", video_id),
            ("maxResults", page_size.as_str()),
            ("textFormat", "plainText"),
            ("order", "time"),
            ("key", self.api_key.as_str()),
        ];
        if let Some(token) = page_token {
            query.push(("pageToken", token));
        }

        let request = self.client.get(self.threads_url.clone()).query(&query);
        let response = tokio::select! {
            result = request.send() => result?,
            () = cancel.cancelled() => {
                warn!("🛑 Comment request cancelled for video {}", video_id);
                return Err(FetchError::Cancelled);
            }
        };

        let status = response.status();
        let body = tokio::select! {
            result = response.text() => result?,
            () = cancel.cancelled() => {
                warn!("🛑 Comment response read cancelled for video {}", video_id);
                return Err(FetchError::Cancelled);
            }
        };

        if !status.is_success() {
            return Err(FetchError::Upstream {
                status_code: status.as_u16(),
                body,
            });
        }

        Ok(serde_json::from_str(&body)?)
    }
}

#[async_trait]
impl CommentSource for YoutubeClient {
    async fn fetch_all_comments(
        &self,
        video_id: &str,
        cancel: &CancellationToken,
    ) -> Result<Vec<YoutubeComment>, FetchError> {
        let retrieved_at = Utc::now();
        let mut comments = Vec::new();
        let mut page_token: Option<String> = None;
        let mut pages = 0usize;

        loop {
            let body = self.fetch_page(video_id, page_token.as_deref(), cancel).await?;
            pages += 1;

            let items = body.get("items").and_then(Value::as_array);
            for item in items.into_iter().flatten() {
                match extract_comment(item, video_id, retrieved_at) {
                    Some(comment) => comments.push(comment),
                    None => debug!("Skipping comment thread without a top-level snippet: video={}", video_id),
                }
            }

            page_token = body
                .get("nextPageToken")
                .and_then(Value::as_str)
                .filter(|token| !token.is_empty())
                .map(str::to_string);

            debug!("📄 Page {} drained for {}: {} comments so far", pages, video_id, comments.len());
            if page_token.is_none() {
                break;
            }
        }

        info!("📥 Fetched {} top-level comments for {} over {} page(s)", comments.len(), video_id, pages);
        Ok(comments)
    }
}

fn threads_endpoint(base_url: &str) -> Result<Url, FetchError> {
    let base = base_url.trim_end_matches('/');
    Url::parse(&format!("{}/commentThreads", base))
        .map_err(|e| FetchError::InvalidConfig(format!("invalid base url '{}': {}", base_url, e)))
}

/// Non-blank string at `pointer`
fn text_at<'a>(value: &'a Value, pointer: &str) -> Option<&'a str> {
    value
        .pointer(pointer)
        .and_then(Value::as_str)
        .filter(|s| !s.trim().is_empty())
}

fn fits(value: &str, max_chars: usize) -> bool {
    value.chars().count() <= max_chars
}

fn clamp(value: &str, max_chars: usize) -> String {
    truncate_chars(value, max_chars).to_string()
}

/// Map one `commentThread` item, `None` when it has no top-level snippet.
fn extract_comment(item: &Value, video_id: &str, retrieved_at: DateTime<Utc>) -> Option<YoutubeComment> {
    let top_level = item.pointer("/snippet/topLevelComment")?;
    let snippet = top_level.get("snippet").filter(|s| s.is_object())?;

    // Over-long ids are rejected rather than cut: two ids sharing a prefix must stay distinct
    let comment_id = match text_at(top_level, "/id") {
        Some(id) if fits(id, storage::MAX_COMMENT_ID_CHARS) => id.to_string(),
        Some(id) => {
            debug!("Skipping comment with oversized id ({} chars)", id.chars().count());
            return None;
        }
        None => Uuid::new_v4().simple().to_string(),
    };

    let author_channel_id = text_at(snippet, "/authorChannelId/value")
        .filter(|id| fits(id, storage::MAX_AUTHOR_CHANNEL_ID_CHARS))
        .map(str::to_string);

    // A present but blank name is kept; the view skips blank author keys
    let author_display_name = clamp(
        snippet
            .get("authorDisplayName")
            .and_then(Value::as_str)
            .unwrap_or(youtube::UNKNOWN_AUTHOR),
        storage::MAX_AUTHOR_DISPLAY_NAME_CHARS,
    );

    let author_channel_url = match (
        text_at(snippet, "/authorChannelUrl").filter(|url| fits(url, storage::MAX_AUTHOR_CHANNEL_URL_CHARS)),
        &author_channel_id,
    ) {
        (Some(url), _) => url.to_string(),
        (None, Some(channel_id)) => format!("{}{}", youtube::CHANNEL_URL_PREFIX, channel_id),
        (None, None) => youtube::FALLBACK_CHANNEL_URL.to_string(),
    };

    let comment_text = sanitize_comment(snippet.get("textDisplay").and_then(Value::as_str).unwrap_or_default());

    let published_at = snippet
        .get("publishedAt")
        .and_then(Value::as_str)
        .and_then(parse_published_at)
        .unwrap_or_else(Utc::now);

    Some(YoutubeComment {
        video_id: video_id.to_string(),
        comment_id,
        author_channel_id,
        author_display_name,
        author_channel_url,
        comment_text,
        published_at,
        retrieved_at,
    })
}
