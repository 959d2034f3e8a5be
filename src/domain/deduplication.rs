//! Write-time deduplication by natural key.
//!
//! Upstream can hand back the same comment twice across continuation pages
//! (new comments shift the window while we drain). The stored set must hold one
//! row per `(video_id, comment_id)`, so we collapse duplicates before persisting.
//! This is separate from the read-time "one comment per author" policy in
//! [`crate::domain::comment_view`].

use std::collections::HashMap;
use std::collections::hash_map::Entry;

use super::comment::YoutubeComment;

/// Keep one comment per `(video_id, comment_id)`.
///
/// A later record replaces an earlier one only when its `published_at` is
/// strictly greater; on exact ties the first one seen stays. Output order is
/// unspecified.
pub fn deduplicate_comments<I>(comments: I) -> Vec<YoutubeComment>
where
    I: IntoIterator<Item = YoutubeComment>,
{
    let mut unique: HashMap<(String, String), YoutubeComment> = HashMap::new();

    for comment in comments {
        let key = (comment.video_id.clone(), comment.comment_id.clone());
        match unique.entry(key) {
            Entry::Vacant(slot) => {
                slot.insert(comment);
            }
            Entry::Occupied(mut slot) => {
                if comment.published_at > slot.get().published_at {
                    slot.insert(comment);
                }
            }
        }
    }

    unique.into_values().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};
    use proptest::prelude::*;

    fn comment(id: &str, offset_secs: i64, text: &str) -> YoutubeComment {
        let base = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        YoutubeComment {
            video_id: "vid".to_string(),
            comment_id: id.to_string(),
            author_channel_id: None,
            author_display_name: "Alice".to_string(),
            author_channel_url: "https://www.youtube.com".to_string(),
            comment_text: text.to_string(),
            published_at: base + Duration::seconds(offset_secs),
            retrieved_at: base,
        }
    }

    #[test]
    fn newer_duplicate_wins() {
        let out = deduplicate_comments(vec![comment("a", 10, "old"), comment("a", 20, "new")]);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].comment_text, "new");
    }

    #[test]
    fn older_duplicate_is_dropped() {
        let out = deduplicate_comments(vec![comment("a", 20, "new"), comment("a", 10, "old")]);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].comment_text, "new");
    }

    #[test]
    fn first_seen_wins_exact_tie() {
        let out = deduplicate_comments(vec![comment("a", 5, "first"), comment("a", 5, "second")]);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].comment_text, "first");
    }

    #[test]
    fn same_comment_id_on_other_video_is_kept() {
        let mut other = comment("a", 5, "other video");
        other.video_id = "vid2".to_string();
        let out = deduplicate_comments(vec![comment("a", 5, "x"), other]);
        assert_eq!(out.len(), 2);
    }

    #[test]
    fn empty_input_gives_empty_output() {
        assert!(deduplicate_comments(Vec::new()).is_empty());
    }

    proptest! {
        #[test]
        fn one_record_per_key_with_latest_timestamp(
            entries in prop::collection::vec((0u8..6, 0i64..50), 0..60)
        ) {
            let input: Vec<YoutubeComment> = entries
                .iter()
                .enumerate()
                .map(|(i, (id, ts))| comment(&format!("c{id}"), *ts, &format!("#{i}")))
                .collect();

            let out = deduplicate_comments(input.clone());

            let mut expected: HashMap<String, &YoutubeComment> = HashMap::new();
            for c in &input {
                let keep = expected
                    .get(&c.comment_id)
                    .is_none_or(|existing| c.published_at > existing.published_at);
                if keep {
                    expected.insert(c.comment_id.clone(), c);
                }
            }

            prop_assert_eq!(out.len(), expected.len());
            for c in &out {
                prop_assert_eq!(Some(&c), expected.get(&c.comment_id));
            }
        }
    }
}
