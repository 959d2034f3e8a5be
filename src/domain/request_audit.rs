//! Request audit record handed to the request logger after each retrieval.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// `{video_id, page, returned_count, requester_address, timestamp_utc}`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestAudit {
    pub video_id: String,
    pub page: u32,
    pub returned_count: usize,
    pub requester_address: Option<String>,
    pub timestamp_utc: DateTime<Utc>,
}

impl RequestAudit {
    pub fn now(
        video_id: impl Into<String>,
        page: u32,
        returned_count: usize,
        requester_address: Option<String>,
    ) -> Self {
        Self {
            video_id: video_id.into(),
            page,
            returned_count,
            requester_address,
            timestamp_utc: Utc::now(),
        }
    }
}
