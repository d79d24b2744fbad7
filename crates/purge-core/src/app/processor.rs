//! QueueProcessor - キューから取り出して purger に配る 1 サイクル
//!
//! # フロー（`run_cycle()`）
//! 1. 新しい容量サイクルを始める
//! 2. 残り容量（とバッチサイズ）の範囲で claim
//! 3. `PurgeEngine::invalidate()`
//! 4. PURGED になったものは delete、それ以外は release
//!
//! 配送が失敗したら claim したものを全部 release してからエラーを返します。

use std::sync::Arc;
use tracing::{debug, info};

use crate::domain::{Invalidation, LifecycleState, Result};
use crate::ports::DurableQueue;
use crate::purgers::PurgeEngine;

/// What one cycle did with the queue.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CycleReport {
    pub claimed: usize,
    pub succeeded: usize,
    pub released: usize,
}

pub struct QueueProcessor {
    engine: PurgeEngine,
    queue: Arc<dyn DurableQueue>,
    batch_size: usize,
}

impl QueueProcessor {
    pub fn new(engine: PurgeEngine, queue: Arc<dyn DurableQueue>, batch_size: usize) -> Self {
        Self {
            engine,
            queue,
            batch_size,
        }
    }

    pub fn engine(&self) -> &PurgeEngine {
        &self.engine
    }

    pub fn engine_mut(&mut self) -> &mut PurgeEngine {
        &mut self.engine
    }

    pub async fn run_cycle(&mut self) -> Result<CycleReport> {
        self.engine.capacity_mut().start_cycle();
        let max = self
            .engine
            .capacity()
            .remaining_invalidation_allowance()
            .cap(self.batch_size);
        if max == 0 {
            debug!("nothing to claim this cycle");
            return Ok(CycleReport::default());
        }

        let mut claimed = self.queue.claim(max).await?;
        if claimed.is_empty() {
            return Ok(CycleReport::default());
        }
        let count = claimed.len();

        if let Err(err) = self.engine.invalidate(&mut claimed).await {
            self.queue.release(&mut claimed).await?;
            return Err(err);
        }

        let (mut purged, mut rest): (Vec<Invalidation>, Vec<Invalidation>) = claimed
            .into_iter()
            .partition(|invalidation| invalidation.lifecycle() == LifecycleState::Purged);
        if !purged.is_empty() {
            self.queue.delete(&mut purged).await?;
        }
        if !rest.is_empty() {
            self.queue.release(&mut rest).await?;
        }

        let report = CycleReport {
            claimed: count,
            succeeded: purged.len(),
            released: rest.len(),
        };
        info!(
            claimed = report.claimed,
            succeeded = report.succeeded,
            released = report.released,
            "queue processing cycle finished"
        );
        Ok(report)
    }
}
