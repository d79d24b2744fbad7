//! Queue item metadata carried by every invalidation.
//!
//! The durable queue owns these values; the engine never touches them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::ids::QueueItemId;
use super::invalidation::InvalidationType;

/// Queue payload: kind tag plus representation, serialized as `["tag", "node:1"]`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueItemData(pub InvalidationType, pub String);

/// `item_id`, `created` and `data` as the queue sees them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueueItemInfo {
    pub item_id: Option<QueueItemId>,
    pub created: Option<DateTime<Utc>>,
    pub data: QueueItemData,
}

impl QueueItemInfo {
    pub(crate) fn new(data: QueueItemData) -> Self {
        Self {
            item_id: None,
            created: None,
            data,
        }
    }
}
