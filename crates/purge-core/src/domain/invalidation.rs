//! Invalidation - purge 対象 1 件を表すエンティティ
//!
//! 1 つの Invalidation は「どの purger でどうなったか」を purger ごとに記録します。
//! `set_state_context()` で読み書きするスロットを切り替え、
//! 集約コンテキストでは各 purger の結果を合成した値を返します。

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;

use super::errors::{PurgeError, Result};
use super::ids::{InstanceId, QueueItemId};
use super::queue_item::{QueueItemData, QueueItemInfo};
use super::state::{InvalidationState, LifecycleState, StateContext};

/// Kind of representation; drives routing to purgers.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InvalidationType(String);

impl InvalidationType {
    pub fn new(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    pub fn tag() -> Self {
        Self::new("tag")
    }

    pub fn path() -> Self {
        Self::new("path")
    }

    pub fn url() -> Self {
        Self::new("url")
    }

    pub fn wildcard_url() -> Self {
        Self::new("wildcardurl")
    }

    pub fn domain() -> Self {
        Self::new("domain")
    }

    pub fn everything() -> Self {
        Self::new("everything")
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for InvalidationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// One request to purge one representation from the external caches.
#[derive(Debug, Clone)]
pub struct Invalidation {
    representation: String,
    kind: InvalidationType,
    states: IndexMap<InstanceId, InvalidationState>,
    context: StateContext,
    lifecycle: LifecycleState,
    queue_item: QueueItemInfo,
}

impl Invalidation {
    pub fn new(kind: InvalidationType, representation: impl Into<String>) -> Self {
        let representation = representation.into();
        let data = QueueItemData(kind.clone(), representation.clone());
        Self {
            representation,
            kind,
            states: IndexMap::new(),
            context: StateContext::Aggregate,
            lifecycle: LifecycleState::New,
            queue_item: QueueItemInfo::new(data),
        }
    }

    /// Build from untyped input (queue payloads, external signals).
    pub fn from_value(kind: InvalidationType, representation: &serde_json::Value) -> Result<Self> {
        match representation {
            serde_json::Value::String(s) => Ok(Self::new(kind, s.as_str())),
            other => Err(PurgeError::InvalidRepresentation(format!(
                "the representation of the thing you want to purge is not a string: {other}"
            ))),
        }
    }

    /// Rebuild from a queue payload shaped like `["tag", "node:1"]`.
    pub fn from_payload(payload: &serde_json::Value) -> Result<Self> {
        let Some([kind, representation]) = payload.as_array().map(Vec::as_slice) else {
            return Err(PurgeError::InvalidRepresentation(format!(
                "queue payload is not a [type, representation] pair: {payload}"
            )));
        };
        let kind = kind.as_str().ok_or_else(|| {
            PurgeError::InvalidRepresentation(format!("invalidation type is not a string: {kind}"))
        })?;
        Self::from_value(InvalidationType::new(kind), representation)
    }

    pub fn representation(&self) -> &str {
        &self.representation
    }

    pub fn invalidation_type(&self) -> &InvalidationType {
        &self.kind
    }

    pub fn state_context(&self) -> &StateContext {
        &self.context
    }

    pub fn set_state_context(&mut self, context: StateContext) {
        self.context = context;
    }

    /// Outcome in the active context; computed when the context is aggregate.
    pub fn state(&self) -> InvalidationState {
        match &self.context {
            StateContext::Aggregate => InvalidationState::aggregate(self.states.values().copied()),
            StateContext::Purger(id) => self
                .states
                .get(id)
                .copied()
                .unwrap_or(InvalidationState::New),
        }
    }

    pub fn set_state(&mut self, state: InvalidationState) -> Result<()> {
        match &self.context {
            StateContext::Aggregate => Err(PurgeError::InvalidProperty("state".into())),
            StateContext::Purger(id) => {
                self.states.insert(id.clone(), state);
                Ok(())
            }
        }
    }

    /// Per-purger outcomes in the order purgers reported them.
    pub fn states(&self) -> &IndexMap<InstanceId, InvalidationState> {
        &self.states
    }

    /// Drop the outcomes of purgers for which `keep` returns false.
    pub fn retain_states<F>(&mut self, mut keep: F)
    where
        F: FnMut(&InstanceId) -> bool,
    {
        self.states.retain(|id, _| keep(id));
    }

    pub fn lifecycle(&self) -> LifecycleState {
        self.lifecycle
    }

    pub fn set_lifecycle(&mut self, lifecycle: LifecycleState) {
        self.lifecycle = lifecycle;
    }

    pub fn queue_item(&self) -> &QueueItemInfo {
        &self.queue_item
    }

    pub fn set_queue_item_info(&mut self, item_id: QueueItemId, created: DateTime<Utc>) {
        self.queue_item.item_id = Some(item_id);
        self.queue_item.created = Some(created);
    }

    pub fn set_queue_item_id(&mut self, item_id: QueueItemId) {
        self.queue_item.item_id = Some(item_id);
    }

    pub fn set_queue_item_created(&mut self, created: DateTime<Utc>) {
        self.queue_item.created = Some(created);
    }

    /// Read one of the queue properties (`item_id`, `created`, `data`) by name.
    pub fn property(&self, name: &str) -> Result<serde_json::Value> {
        let value = match name {
            "item_id" => serde_json::to_value(self.queue_item.item_id.map(|id| id.to_string())),
            "created" => serde_json::to_value(self.queue_item.created),
            "data" => serde_json::to_value(&self.queue_item.data),
            _ => return Err(PurgeError::InvalidProperty(name.to_string())),
        };
        value.map_err(|e| PurgeError::Queue(format!("encode {name}: {e}")))
    }

    /// Setting a property by name is never allowed; use the named setters.
    pub fn set_property(&mut self, name: &str, _value: serde_json::Value) -> Result<()> {
        Err(PurgeError::InvalidProperty(name.to_string()))
    }

    /// Whether the engine may hand this item to purgers.
    pub fn is_dispatchable(&self) -> bool {
        !self.representation.is_empty() && !self.lifecycle.is_deleted()
    }
}

impl fmt::Display for Invalidation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{{}:{}}}", self.kind, self.representation)
    }
}
