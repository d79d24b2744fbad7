//! State - invalidation の状態
//!
//! 2 種類の状態を持ちます。
//! - **InvalidationState**: purger ごとの結果（と、それらを合成した集約結果）
//! - **LifecycleState**: durable queue 側から見たアイテムのライフサイクル

use serde::{Deserialize, Serialize};
use std::fmt;

use super::ids::InstanceId;

/// Outcome of an invalidation at one purger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum InvalidationState {
    /// Not routed to the purger yet.
    New,

    /// Handed to the purger, no verdict reported (yet).
    Processing,

    Succeeded,

    Failed,

    /// The purger does not support the invalidation type.
    NotSupported,
}

impl InvalidationState {
    /// Combine per-purger outcomes into the aggregate outcome.
    ///
    /// - nothing recorded: `New`
    /// - only `NotSupported` recorded: `NotSupported`
    /// - any `Failed`: `Failed`
    /// - any `New`/`Processing`: `Processing`
    /// - otherwise every supporting purger succeeded: `Succeeded`
    pub fn aggregate<I>(states: I) -> Self
    where
        I: IntoIterator<Item = InvalidationState>,
    {
        let mut recorded = false;
        let mut supported = false;
        let mut failed = false;
        let mut pending = false;

        for state in states {
            recorded = true;
            match state {
                Self::NotSupported => {}
                Self::Succeeded => supported = true,
                Self::Failed => {
                    supported = true;
                    failed = true;
                }
                Self::New | Self::Processing => {
                    supported = true;
                    pending = true;
                }
            }
        }

        match (recorded, supported) {
            (false, _) => Self::New,
            (true, false) => Self::NotSupported,
            _ if failed => Self::Failed,
            _ if pending => Self::Processing,
            _ => Self::Succeeded,
        }
    }
}

impl fmt::Display for InvalidationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::New => "NEW",
            Self::Processing => "PROCESSING",
            Self::Succeeded => "SUCCEEDED",
            Self::Failed => "FAILED",
            Self::NotSupported => "NOT_SUPPORTED",
        };
        f.write_str(s)
    }
}

/// Which outcome slot `state()` / `set_state()` operate on.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub enum StateContext {
    /// Combined outcome across all purgers (read-only).
    #[default]
    Aggregate,

    Purger(InstanceId),
}

impl StateContext {
    pub fn purger(id: impl Into<InstanceId>) -> Self {
        Self::Purger(id.into())
    }
}

impl From<Option<InstanceId>> for StateContext {
    fn from(value: Option<InstanceId>) -> Self {
        value.map_or(Self::Aggregate, Self::Purger)
    }
}

/// Durable-queue lifecycle of an invalidation.
///
/// State transitions:
/// - NEW -> ADDING -> ADDED -> CLAIMING -> CLAIMED -> PURGING
/// - PURGING -> PURGED | PURGEFAILED
/// - -> RELEASING -> RELEASED (back to the queue)
/// - -> DELETING -> DELETED (gone for good)
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LifecycleState {
    #[default]
    New,
    Adding,
    Added,
    Claiming,
    Claimed,
    Purging,
    Purged,
    #[serde(rename = "PURGEFAILED")]
    PurgeFailed,
    Releasing,
    Released,
    Deleting,
    Deleted,
}

impl LifecycleState {
    /// Constant name, e.g. `"PURGEFAILED"`.
    pub fn as_constant(self) -> &'static str {
        match self {
            Self::New => "NEW",
            Self::Adding => "ADDING",
            Self::Added => "ADDED",
            Self::Claiming => "CLAIMING",
            Self::Claimed => "CLAIMED",
            Self::Purging => "PURGING",
            Self::Purged => "PURGED",
            Self::PurgeFailed => "PURGEFAILED",
            Self::Releasing => "RELEASING",
            Self::Released => "RELEASED",
            Self::Deleting => "DELETING",
            Self::Deleted => "DELETED",
        }
    }

    /// The item left (or is leaving) the queue and must not be dispatched anymore.
    pub fn is_deleted(self) -> bool {
        matches!(self, Self::Deleting | Self::Deleted)
    }
}

impl fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_constant())
    }
}
