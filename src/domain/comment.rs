//! Comment entities
//!
//! `YoutubeComment` is the persisted row, `CommentDto` / `CommentsPage` are the
//! shapes handed back to callers of the retrieval entry point.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A normalized top-level comment as stored in `youtube_comments`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct YoutubeComment {
    pub video_id: String,
    pub comment_id: String,
    pub author_channel_id: Option<String>,
    pub author_display_name: String,
    pub author_channel_url: String,
    pub comment_text: String,
    pub published_at: DateTime<Utc>,
    pub retrieved_at: DateTime<Utc>,
}

impl YoutubeComment {
    /// Natural key: `(video_id, comment_id)`.
    pub fn natural_key(&self) -> (&str, &str) {
        (&self.video_id, &self.comment_id)
    }

    /// Key used by the "one comment per author" display policy.
    ///
    /// Channel id when present, display name otherwise; `None` when the chosen
    /// value is blank.
    pub fn author_key(&self) -> Option<String> {
        author_key(self.author_channel_id.as_deref(), &self.author_display_name)
    }

    /// Response shape with the text cut to `max_chars` characters.
    pub fn to_dto(&self, max_chars: usize) -> CommentDto {
        CommentDto {
            author_display_name: self.author_display_name.clone(),
            author_channel_url: self.author_channel_url.clone(),
            comment_text: truncate_chars(&self.comment_text, max_chars).to_string(),
            published_at: self.published_at,
        }
    }
}

/// Case-insensitive author key (see [`YoutubeComment::author_key`]).
pub fn author_key(author_channel_id: Option<&str>, author_display_name: &str) -> Option<String> {
    let raw = match author_channel_id {
        Some(id) if !id.trim().is_empty() => id,
        _ => author_display_name,
    };

    if raw.trim().is_empty() {
        None
    } else {
        Some(raw.to_lowercase())
    }
}

/// Hard cut at `max_chars` Unicode scalar values. No ellipsis.
pub fn truncate_chars(value: &str, max_chars: usize) -> &str {
    match value.char_indices().nth(max_chars) {
        Some((byte_idx, _)) => &value[..byte_idx],
        None => value,
    }
}

/// A single comment as returned to the caller
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommentDto {
    pub author_display_name: String,
    pub author_channel_url: String,
    pub comment_text: String,
    pub published_at: DateTime<Utc>,
}

/// One page of author-deduplicated comments
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommentsPage {
    pub video_id: String,
    pub page: u32,
    pub page_size: usize,
    pub has_more: bool,
    pub comments: Vec<CommentDto>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn comment(channel_id: Option<&str>, name: &str) -> YoutubeComment {
        let ts = Utc.with_ymd_and_hms(2024, 7, 12, 0, 0, 0).unwrap();
        YoutubeComment {
            video_id: "vid".to_string(),
            comment_id: "c1".to_string(),
            author_channel_id: channel_id.map(str::to_string),
            author_display_name: name.to_string(),
            author_channel_url: "https://www.youtube.com".to_string(),
            comment_text: "hello".to_string(),
            published_at: ts,
            retrieved_at: ts,
        }
    }

    #[test]
    fn author_key_prefers_channel_id() {
        assert_eq!(comment(Some("UCabc"), "Alice").author_key().as_deref(), Some("ucabc"));
        assert_eq!(comment(None, "Alice").author_key().as_deref(), Some("alice"));
        assert_eq!(comment(Some("  "), "Alice").author_key().as_deref(), Some("alice"));
    }

    #[test]
    fn blank_author_has_no_key() {
        assert_eq!(comment(None, "   ").author_key(), None);
    }

    #[test]
    fn truncate_is_a_hard_cut() {
        let long = "a".repeat(80);
        assert_eq!(truncate_chars(&long, 50), "a".repeat(50));
        assert_eq!(truncate_chars("short", 50), "short");
        assert_eq!(truncate_chars("가나다라", 2), "가나");
    }

    #[test]
    fn dto_serializes_camel_case() {
        let dto = comment(None, "Alice").to_dto(50);
        let json = serde_json::to_value(&dto).unwrap();
        assert_eq!(json["authorDisplayName"], "Alice");
        assert!(json.get("authorChannelUrl").is_some());
        assert!(json.get("publishedAt").is_some());
    }
}
