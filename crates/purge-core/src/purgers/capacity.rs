//! CapacityTracker - 1 サイクルあたりの処理量の上限と purger 間の cooldown
//!
//! # 上限
//! - invalidation 件数と実行時間の 2 つ
//! - 設定値 `0` は「上限なし」で、「容量ゼロ」ではない
//! - 使用量はサイクル内では増えるだけ（`start_cycle()` で新しいサイクルを始める）
//!
//! # cooldown の決め方
//! 1. 設定の instance ごとの上書き
//! 2. purger 自身が申告する cooldown
//! 3. 設定のデフォルト値

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use tokio::time::Instant;
use tracing::debug;

use crate::domain::{InstanceId, Invalidation, PurgeError, Result};
use crate::ports::{HealthSignal, Pacer};
use crate::settings::CapacitySettings;

/// How many more invalidations the current cycle may process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Allowance {
    Unlimited,
    Remaining(usize),
}

impl Allowance {
    pub fn permits(self, count: usize) -> bool {
        match self {
            Self::Unlimited => true,
            Self::Remaining(remaining) => count <= remaining,
        }
    }

    /// Cap `wanted` by the allowance.
    pub fn cap(self, wanted: usize) -> usize {
        match self {
            Self::Unlimited => wanted,
            Self::Remaining(remaining) => wanted.min(remaining),
        }
    }
}

impl fmt::Display for Allowance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unlimited => f.write_str("unlimited"),
            Self::Remaining(n) => write!(f, "{n}"),
        }
    }
}

pub struct CapacityTracker {
    limits: CapacitySettings,
    health: Arc<dyn HealthSignal>,
    pacer: Arc<dyn Pacer>,
    advertised_cooldowns: HashMap<InstanceId, Duration>,
    spent_invalidations: usize,
    spent_execution_time: Duration,
    last_run: HashMap<InstanceId, Instant>,
    cycle: u64,
}

impl CapacityTracker {
    pub fn new(limits: CapacitySettings, health: Arc<dyn HealthSignal>, pacer: Arc<dyn Pacer>) -> Self {
        Self {
            limits,
            health,
            pacer,
            advertised_cooldowns: HashMap::new(),
            spent_invalidations: 0,
            spent_execution_time: Duration::ZERO,
            last_run: HashMap::new(),
            cycle: 1,
        }
    }

    pub fn limits(&self) -> &CapacitySettings {
        &self.limits
    }

    /// Begin a new processing cycle with fresh usage counters.
    pub fn start_cycle(&mut self) {
        self.cycle += 1;
        self.spent_invalidations = 0;
        self.spent_execution_time = Duration::ZERO;
        debug!(cycle = self.cycle, "capacity cycle started");
    }

    pub fn cycle(&self) -> u64 {
        self.cycle
    }

    pub fn spent_invalidations(&self) -> usize {
        self.spent_invalidations
    }

    pub fn spent_execution_time(&self) -> Duration {
        self.spent_execution_time
    }

    pub fn remaining_invalidation_allowance(&self) -> Allowance {
        match self.limits.max_invalidations {
            0 => Allowance::Unlimited,
            limit => Allowance::Remaining(limit.saturating_sub(self.spent_invalidations)),
        }
    }

    /// `None` when no execution-time ceiling is configured.
    pub fn remaining_execution_time(&self) -> Option<Duration> {
        let limit = self.limits.max_execution_time();
        if limit.is_zero() {
            return None;
        }
        Some(limit.saturating_sub(self.spent_execution_time))
    }

    /// Checks that must pass before anything in `batch` is touched.
    pub fn preflight(&self, batch: &[Invalidation]) -> Result<()> {
        for (i, invalidation) in batch.iter().enumerate() {
            if !invalidation.is_dispatchable() {
                return Err(PurgeError::BadInput(format!(
                    "item {i} ({invalidation}, {}) is not a dispatchable invalidation",
                    invalidation.lifecycle()
                )));
            }
        }
        if let Some(fire) = self.health.is_system_on_fire() {
            return Err(PurgeError::SystemUnhealthy(fire.recommendation));
        }
        if self.remaining_execution_time() == Some(Duration::ZERO) {
            return Err(PurgeError::CapacityExceeded(
                "execution time limit exhausted".into(),
            ));
        }
        match self.remaining_invalidation_allowance() {
            Allowance::Remaining(0) => Err(PurgeError::CapacityExceeded(
                "capacity limits exceeded".into(),
            )),
            allowance if !allowance.permits(batch.len()) => {
                Err(PurgeError::CapacityExceeded(format!(
                    "capacity limit allows {allowance} invalidations during this cycle, {} given",
                    batch.len()
                )))
            }
            _ => Ok(()),
        }
    }

    pub fn record_usage(&mut self, invalidations: usize, elapsed: Duration) {
        self.spent_invalidations += invalidations;
        self.spent_execution_time += elapsed;
    }

    /// Remember the cooldown a purger asks for itself. Zero means "no preference".
    pub fn advertise_cooldown(&mut self, instance: &InstanceId, cooldown: Duration) {
        if cooldown.is_zero() {
            self.advertised_cooldowns.remove(instance);
        } else {
            self.advertised_cooldowns.insert(instance.clone(), cooldown);
        }
    }

    pub fn cooldown_time(&self, instance: &InstanceId) -> Duration {
        self.limits
            .cooldown_override(instance)
            .or_else(|| self.advertised_cooldowns.get(instance).copied())
            .unwrap_or_else(|| self.limits.default_cooldown())
    }

    pub fn last_run(&self, instance: &InstanceId) -> Option<Instant> {
        self.last_run.get(instance).copied()
    }

    /// Wait the instance's cooldown before the next purger runs.
    pub async fn cooldown(&mut self, instance: &InstanceId) {
        self.last_run.insert(instance.clone(), Instant::now());
        let cooldown = self.cooldown_time(instance);
        if cooldown.is_zero() {
            return;
        }
        debug!(%instance, ?cooldown, "waiting cooldown time");
        self.pacer.pause(cooldown).await;
    }
}
