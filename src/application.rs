//! Application layer - the retrieval use case and its coordination state
//!
//! `CommentService` owns the schema guardian and the per-video lock table;
//! both are created with the service and dropped with it.

pub mod comment_service;
pub mod errors;
pub mod video_locks;

// Re-export commonly used items
pub use comment_service::CommentService;
pub use errors::CommentServiceError;
pub use video_locks::{VideoLockGuard, VideoLockTable};
