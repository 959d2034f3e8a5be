//! Read-time view building: one comment per author, fixed-size pages.
//!
//! [`CommentPageBuilder`] is fed stored rows newest-first, one at a time, and
//! decides per row whether to skip it, place it on the requested page, or stop
//! the scan. The storage layer streams rows into it so that a request for page
//! 1 never materializes the whole video.

use std::collections::HashSet;
use std::ops::ControlFlow;

use super::comment::{CommentDto, CommentsPage, YoutubeComment};
use super::constants::view::{COMMENT_PREVIEW_CHARS, PAGE_SIZE};

/// Clamp a caller-supplied page number to the 1-based range.
pub fn normalize_page(page: i64) -> u32 {
    u32::try_from(page.max(1)).unwrap_or(u32::MAX)
}

/// Streaming accumulator for one page of the author-deduplicated view
#[derive(Debug)]
pub struct CommentPageBuilder {
    page: u32,
    page_size: usize,
    preview_chars: usize,
    skip: usize,
    seen_authors: HashSet<String>,
    unique_count: usize,
    comments: Vec<CommentDto>,
    has_more: bool,
}

impl CommentPageBuilder {
    /// Builder with the deployment page size and preview length
    pub fn new(page: u32) -> Self {
        Self::with_page_size(page, PAGE_SIZE)
    }

    pub fn with_page_size(page: u32, page_size: usize) -> Self {
        let page = page.max(1);
        let skip = (page as usize - 1).saturating_mul(page_size);
        Self {
            page,
            page_size,
            preview_chars: COMMENT_PREVIEW_CHARS,
            skip,
            seen_authors: HashSet::new(),
            unique_count: 0,
            comments: Vec::with_capacity(page_size.min(PAGE_SIZE)),
            has_more: false,
        }
    }

    pub const fn page(&self) -> u32 {
        self.page
    }

    /// Offer the next row (rows must arrive in `published_at` descending order).
    ///
    /// Returns `ControlFlow::Break` once the page is full and one more
    /// qualifying row proved that a further page exists.
    pub fn push(&mut self, comment: &YoutubeComment) -> ControlFlow<()> {
        let Some(author) = comment.author_key() else {
            return ControlFlow::Continue(());
        };

        if !self.seen_authors.insert(author) {
            return ControlFlow::Continue(());
        }

        self.unique_count += 1;

        if self.unique_count <= self.skip {
            return ControlFlow::Continue(());
        }

        if self.comments.len() < self.page_size {
            self.comments.push(comment.to_dto(self.preview_chars));
            return ControlFlow::Continue(());
        }

        self.has_more = true;
        ControlFlow::Break(())
    }

    /// Finish the scan and produce the page for `video_id`.
    pub fn finish(self, video_id: &str) -> CommentsPage {
        CommentsPage {
            video_id: video_id.to_string(),
            page: self.page,
            page_size: self.page_size,
            has_more: self.has_more,
            comments: self.comments,
        }
    }
}

/// Build a page from an in-memory, already ordered row sequence.
pub fn build_page<'a, I>(video_id: &str, page: u32, page_size: usize, rows: I) -> CommentsPage
where
    I: IntoIterator<Item = &'a YoutubeComment>,
{
    let mut builder = CommentPageBuilder::with_page_size(page, page_size);
    for row in rows {
        if builder.push(row).is_break() {
            break;
        }
    }
    builder.finish(video_id)
}
