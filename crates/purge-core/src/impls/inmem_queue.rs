//! InMemoryQueue - 開発・テスト用の永続キュー（揮発性）
//!
//! # 実装詳細
//! - IndexMap<QueueItemId, Entry> で投入順を保ったまま管理
//! - tokio::sync::Mutex で排他制御（await を跨いでロックを持たない）
//! - release されたアイテムは purger ごとの結果ごと保存し直すので、
//!   次の claim では成功済みの purger を飛ばせる

use async_trait::async_trait;
use indexmap::IndexMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::debug;
use ulid::Ulid;

use crate::domain::{Invalidation, LifecycleState, PurgeError, QueueItemId, Result};
use crate::ports::{Clock, DurableQueue, SystemClock};

#[derive(Debug)]
struct Entry {
    invalidation: Invalidation,
    claimed: bool,
}

pub struct InMemoryQueue {
    items: Mutex<IndexMap<QueueItemId, Entry>>,
    clock: Arc<dyn Clock>,
}

impl InMemoryQueue {
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            items: Mutex::new(IndexMap::new()),
            clock,
        }
    }

    /// Items currently held by the queue (claimed or not).
    pub async fn snapshot(&self) -> Vec<Invalidation> {
        let items = self.items.lock().await;
        items.values().map(|entry| entry.invalidation.clone()).collect()
    }
}

impl Default for InMemoryQueue {
    fn default() -> Self {
        Self::new()
    }
}

fn queue_item_id(invalidation: &Invalidation) -> Result<QueueItemId> {
    invalidation
        .queue_item()
        .item_id
        .ok_or_else(|| PurgeError::Queue(format!("{invalidation} was never added to the queue")))
}

#[async_trait]
impl DurableQueue for InMemoryQueue {
    async fn add_multiple(&self, items: Vec<Invalidation>) -> Result<()> {
        let mut queue = self.items.lock().await;
        let count = items.len();
        for mut invalidation in items {
            invalidation.set_lifecycle(LifecycleState::Adding);
            let item_id = QueueItemId::from_ulid(Ulid::new());
            invalidation.set_queue_item_info(item_id, self.clock.now());
            invalidation.set_lifecycle(LifecycleState::Added);
            queue.insert(
                item_id,
                Entry {
                    invalidation,
                    claimed: false,
                },
            );
        }
        debug!(count, total = queue.len(), "added invalidations to the queue");
        Ok(())
    }

    async fn claim(&self, max: usize) -> Result<Vec<Invalidation>> {
        let mut queue = self.items.lock().await;
        let mut claimed = Vec::new();
        for entry in queue.values_mut().filter(|entry| !entry.claimed).take(max) {
            entry.invalidation.set_lifecycle(LifecycleState::Claiming);
            entry.claimed = true;
            entry.invalidation.set_lifecycle(LifecycleState::Claimed);
            claimed.push(entry.invalidation.clone());
        }
        Ok(claimed)
    }

    async fn release(&self, items: &mut [Invalidation]) -> Result<()> {
        let mut queue = self.items.lock().await;
        for invalidation in items.iter_mut() {
            let item_id = queue_item_id(invalidation)?;
            let entry = queue
                .get_mut(&item_id)
                .ok_or_else(|| PurgeError::Queue(format!("unknown queue item {item_id}")))?;
            invalidation.set_lifecycle(LifecycleState::Releasing);
            entry.invalidation = invalidation.clone();
            entry.claimed = false;
            invalidation.set_lifecycle(LifecycleState::Released);
            entry.invalidation.set_lifecycle(LifecycleState::Released);
        }
        Ok(())
    }

    async fn delete(&self, items: &mut [Invalidation]) -> Result<()> {
        let mut queue = self.items.lock().await;
        for invalidation in items.iter_mut() {
            let item_id = queue_item_id(invalidation)?;
            invalidation.set_lifecycle(LifecycleState::Deleting);
            queue
                .shift_remove(&item_id)
                .ok_or_else(|| PurgeError::Queue(format!("unknown queue item {item_id}")))?;
            invalidation.set_lifecycle(LifecycleState::Deleted);
        }
        Ok(())
    }

    async fn number_of_items(&self) -> Result<usize> {
        Ok(self.items.lock().await.len())
    }
}
