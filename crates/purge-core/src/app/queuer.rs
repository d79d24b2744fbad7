//! CacheTagsQueuer - キャッシュタグの無効化シグナルをキューに積む
//!
//! 同じ queuer が既に積んだタグは二度と積みません（queuer を
//! 作り直すと忘れます）。1 回の呼び出しで新しいタグがあれば
//! `add_multiple()` を 1 回だけ呼び、成功したものだけを「積んだ」とみなします。

use indexmap::IndexSet;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::debug;

use crate::domain::{Invalidation, InvalidationType, Result};
use crate::ports::DurableQueue;

pub struct CacheTagsQueuer {
    id: String,
    title: String,
    enabled: bool,
    kind: InvalidationType,
    queue: Arc<dyn DurableQueue>,
    seen: HashSet<String>,
}

impl CacheTagsQueuer {
    pub fn new(queue: Arc<dyn DurableQueue>) -> Self {
        Self {
            id: "coretags".to_string(),
            title: "Core tags queuer".to_string(),
            enabled: true,
            kind: InvalidationType::tag(),
            queue,
            seen: HashSet::new(),
        }
    }

    pub fn with_kind(mut self, kind: InvalidationType) -> Self {
        self.kind = kind;
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    pub fn kind(&self) -> &InvalidationType {
        &self.kind
    }

    /// Queue the tags not seen before. Returns how many were queued.
    pub async fn invalidate_tags<I, S>(&mut self, tags: I) -> Result<usize>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        if !self.enabled {
            return Ok(0);
        }
        let mut fresh: IndexSet<String> = IndexSet::new();
        for tag in tags {
            let tag = tag.into();
            if !self.seen.contains(&tag) {
                fresh.insert(tag);
            }
        }
        if fresh.is_empty() {
            return Ok(0);
        }
        let invalidations = fresh
            .iter()
            .map(|tag| Invalidation::new(self.kind.clone(), tag.as_str()))
            .collect();
        self.queue.add_multiple(invalidations).await?;
        let count = fresh.len();
        self.seen.extend(fresh);
        debug!(queuer = %self.id, count, "queued invalidations");
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::PurgeError;
    use crate::impls::InMemoryQueue;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicBool, Ordering};

    /// Rejects `add_multiple` while `down` is set, otherwise forwards.
    struct FlakyQueue {
        inner: InMemoryQueue,
        down: AtomicBool,
    }

    #[async_trait]
    impl DurableQueue for FlakyQueue {
        async fn add_multiple(&self, items: Vec<Invalidation>) -> Result<()> {
            if self.down.load(Ordering::SeqCst) {
                return Err(PurgeError::Queue("storage offline".into()));
            }
            self.inner.add_multiple(items).await
        }

        async fn claim(&self, max: usize) -> Result<Vec<Invalidation>> {
            self.inner.claim(max).await
        }

        async fn release(&self, items: &mut [Invalidation]) -> Result<()> {
            self.inner.release(items).await
        }

        async fn delete(&self, items: &mut [Invalidation]) -> Result<()> {
            self.inner.delete(items).await
        }

        async fn number_of_items(&self) -> Result<usize> {
            self.inner.number_of_items().await
        }
    }

    fn representations(items: &[Invalidation]) -> Vec<&str> {
        items.iter().map(Invalidation::representation).collect()
    }

    #[tokio::test]
    async fn duplicates_are_queued_once() {
        let queue = Arc::new(InMemoryQueue::new());
        let mut queuer = CacheTagsQueuer::new(queue.clone());

        let queued = queuer.invalidate_tags(["node:1", "node:2", "node:1"]).await.unwrap();
        assert_eq!(queued, 2);
        assert_eq!(queuer.invalidate_tags(["node:2"]).await.unwrap(), 0);
        assert_eq!(queuer.invalidate_tags(["node:3"]).await.unwrap(), 1);

        let items = queue.snapshot().await;
        assert_eq!(representations(&items), vec!["node:1", "node:2", "node:3"]);
        assert!(items.iter().all(|i| *i.invalidation_type() == InvalidationType::tag()));
    }

    #[tokio::test]
    async fn a_new_queuer_forgets_what_was_seen() {
        let queue = Arc::new(InMemoryQueue::new());
        CacheTagsQueuer::new(queue.clone())
            .invalidate_tags(["config:system.site"])
            .await
            .unwrap();
        let queued = CacheTagsQueuer::new(queue.clone())
            .invalidate_tags(["config:system.site"])
            .await
            .unwrap();
        assert_eq!(queued, 1);
        assert_eq!(queue.number_of_items().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn disabled_queuer_ignores_signals() {
        let queue = Arc::new(InMemoryQueue::new());
        let mut queuer = CacheTagsQueuer::new(queue.clone());
        queuer.set_enabled(false);

        assert_eq!(queuer.invalidate_tags(["node:1"]).await.unwrap(), 0);
        assert_eq!(queue.number_of_items().await.unwrap(), 0);

        queuer.set_enabled(true);
        assert_eq!(queuer.invalidate_tags(["node:1"]).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn produced_kind_is_configurable() {
        let queue = Arc::new(InMemoryQueue::new());
        let mut queuer = CacheTagsQueuer::new(queue.clone()).with_kind(InvalidationType::path());
        queuer.invalidate_tags(["/node/1"]).await.unwrap();
        assert_eq!(queuer.id(), "coretags");
        assert_eq!(
            queue.snapshot().await[0].invalidation_type(),
            &InvalidationType::path()
        );
    }

    #[tokio::test]
    async fn tags_rejected_by_the_queue_are_retried() {
        let queue = Arc::new(FlakyQueue {
            inner: InMemoryQueue::new(),
            down: AtomicBool::new(true),
        });
        let mut queuer = CacheTagsQueuer::new(queue.clone());

        let err = queuer.invalidate_tags(["node:1"]).await.unwrap_err();
        assert!(matches!(err, PurgeError::Queue(_)));

        queue.down.store(false, Ordering::SeqCst);
        assert_eq!(queuer.invalidate_tags(["node:1", "node:1"]).await.unwrap(), 1);
        assert_eq!(queue.number_of_items().await.unwrap(), 1);
    }
}
