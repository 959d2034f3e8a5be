//! Domain module - comment entities and the pure algorithms over them
//!
//! Nothing in here performs I/O:
//! - `deduplication`: write-time collapse by natural key
//! - `comment_view`: read-time author dedup + page windowing

pub mod comment;
pub mod comment_view;
pub mod constants;
pub mod deduplication;
pub mod request_audit;

// Re-export commonly used items for convenience
pub use comment::{CommentDto, CommentsPage, YoutubeComment};
pub use comment_view::{CommentPageBuilder, normalize_page};
pub use deduplication::deduplicate_comments;
pub use request_audit::RequestAudit;
