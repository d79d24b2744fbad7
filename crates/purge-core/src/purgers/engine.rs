//! PurgeEngine - invalidation バッチを purger に配る
//!
//! # フロー（`invalidate()`）
//! 1. 空バッチなら何もしない
//! 2. preflight（入力検証・診断・容量）。失敗したら何も触らない
//! 3. type を控え、状態コンテキストを集約に戻し、lifecycle を PURGING に
//! 4. 有効な purger ごとに（registry の順で）
//!    - コンテキストをその purger に切り替える
//!    - 成功済みのものは飛ばし、未サポートの type は NOT_SUPPORTED にする
//!    - 処理メソッドごとにグループ化して purger に渡す
//!    - 1 件でも渡したら cooldown
//! 5. コンテキストを集約に戻し、lifecycle を PURGED / PURGEFAILED に
//! 6. 使用量を記録
//!
//! purger のエラーはそのまま呼び出し元へ返します。それまでに記録された
//! purger ごとの結果は残り、使用量は記録しません。

use indexmap::IndexMap;
use std::sync::Arc;

use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::domain::{
    InstanceId, Invalidation, InvalidationState, InvalidationType, LifecycleState, Result,
    StateContext,
};
use crate::ports::Purger;

use super::capacity::CapacityTracker;
use super::registry::PurgerRegistry;

pub struct PurgeEngine {
    registry: PurgerRegistry,
    capacity: CapacityTracker,
    synced_generation: Option<u64>,
}

impl PurgeEngine {
    pub fn new(registry: PurgerRegistry, capacity: CapacityTracker) -> Self {
        Self {
            registry,
            capacity,
            synced_generation: None,
        }
    }

    pub fn registry(&self) -> &PurgerRegistry {
        &self.registry
    }

    /// Configuration changes (enable, reorder) go through here.
    pub fn registry_mut(&mut self) -> &mut PurgerRegistry {
        &mut self.registry
    }

    pub fn capacity(&self) -> &CapacityTracker {
        &self.capacity
    }

    pub fn capacity_mut(&mut self) -> &mut CapacityTracker {
        &mut self.capacity
    }

    /// Dispatch `batch` to every enabled purger.
    pub async fn invalidate(&mut self, batch: &mut [Invalidation]) -> Result<()> {
        if batch.is_empty() {
            return Ok(());
        }
        let started = Instant::now();

        self.sync_cooldowns();
        self.capacity.preflight(batch)?;

        // 無効化された instance の結果は集約に含めない
        let enabled = self.registry.enabled();
        let types: Vec<InvalidationType> = batch
            .iter_mut()
            .map(|invalidation| {
                invalidation.retain_states(|id| enabled.contains_key(id));
                invalidation.set_state_context(StateContext::Aggregate);
                invalidation.set_lifecycle(LifecycleState::Purging);
                invalidation.invalidation_type().clone()
            })
            .collect();

        if let Err(err) = self.dispatch(batch, &types).await {
            warn!(error = %err, "purger failed, aborting the remaining purgers");
            finish(batch, true);
            return Err(err);
        }
        finish(batch, false);

        let elapsed = started.elapsed();
        self.capacity.record_usage(batch.len(), elapsed);
        info!(
            count = batch.len(),
            ?elapsed,
            remaining = %self.capacity.remaining_invalidation_allowance(),
            "invalidation batch processed"
        );
        Ok(())
    }

    async fn dispatch(&mut self, batch: &mut [Invalidation], types: &[InvalidationType]) -> Result<()> {
        let purgers: Vec<(InstanceId, Arc<dyn Purger>)> = self
            .registry
            .purgers()
            .map(|(id, purger)| (id.clone(), Arc::clone(purger)))
            .collect();

        for (id, purger) in purgers {
            let supported = self
                .registry
                .supported_types_by_instance()
                .get(&id)
                .cloned()
                .unwrap_or_default();

            // 各アイテムの送り先メソッド（None は今回この purger に渡さない）
            let mut routes: Vec<Option<&'static str>> = Vec::with_capacity(batch.len());
            let mut methods: IndexMap<&'static str, usize> = IndexMap::new();
            for (invalidation, kind) in batch.iter_mut().zip(types) {
                invalidation.set_state_context(StateContext::Purger(id.clone()));
                if invalidation.state() == InvalidationState::Succeeded {
                    routes.push(None);
                    continue;
                }
                if !supported.contains(kind) {
                    invalidation.set_state(InvalidationState::NotSupported)?;
                    routes.push(None);
                    continue;
                }
                let method = purger.route_type_to_method(kind);
                *methods.entry(method).or_default() += 1;
                routes.push(Some(method));
            }

            for (method, count) in &methods {
                let mut offers: Vec<&mut Invalidation> = batch
                    .iter_mut()
                    .zip(&routes)
                    .filter(|(_, route)| **route == Some(*method))
                    .map(|(invalidation, _)| invalidation)
                    .collect();
                for offer in offers.iter_mut() {
                    offer.set_state(InvalidationState::Processing)?;
                }
                debug!(purger = %id, method, count, "offering invalidations");
                purger.invoke(method, &mut offers).await?;
            }

            if !methods.is_empty() {
                self.capacity.cooldown(&id).await;
            }
        }
        Ok(())
    }

    fn sync_cooldowns(&mut self) {
        let generation = self.registry.generation();
        if self.synced_generation == Some(generation) {
            return;
        }
        for (id, purger) in self.registry.purgers() {
            self.capacity.advertise_cooldown(id, purger.cooldown_time());
        }
        self.synced_generation = Some(generation);
    }
}

/// Reset contexts to aggregate and settle the lifecycle from the outcome.
///
/// An aborted run never settles to PURGED: later purgers did not get the items.
fn finish(batch: &mut [Invalidation], aborted: bool) {
    for invalidation in batch.iter_mut() {
        invalidation.set_state_context(StateContext::Aggregate);
        let lifecycle = match invalidation.state() {
            InvalidationState::Succeeded if !aborted => LifecycleState::Purged,
            _ => LifecycleState::PurgeFailed,
        };
        invalidation.set_lifecycle(lifecycle);
    }
}
