//! Purger port - 外部キャッシュへの invalidation の送り先
//!
//! Purger はブラックボックスです。エンジンが知っているのは次のことだけです。
//! - どの invalidation type をサポートするか（`types()`）
//! - type ごとにどの処理メソッドへ回すか（`route_type_to_method()`）
//! - 処理メソッドは受け取った invalidation の状態を自分で書き込む（副作用）
//!
//! PurgerPlugin は purger の実装（plugin）そのもので、定義情報と
//! instance を生成する factory を持ちます。

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

use crate::domain::{InstanceId, Invalidation, InvalidationType, PluginId, Result};

/// Method name used when a purger does not route types anywhere else.
pub const DEFAULT_METHOD: &str = "invalidate";

/// A configured destination that can invalidate content in one external cache.
#[async_trait]
pub trait Purger: Send + Sync {
    fn id(&self) -> &InstanceId;

    fn label(&self) -> String;

    /// Invalidation types this instance supports.
    fn types(&self) -> Vec<InvalidationType>;

    fn route_type_to_method(&self, _kind: &InvalidationType) -> &'static str {
        DEFAULT_METHOD
    }

    /// Handle one group of invalidations routed to `method`.
    ///
    /// The state context of every item is already set to this purger; the
    /// implementation records its verdict with `set_state()`.
    async fn invoke(&self, method: &str, invalidations: &mut [&mut Invalidation]) -> Result<()>;

    /// Pause the backend wants between its run and the next purger.
    fn cooldown_time(&self) -> Duration {
        Duration::ZERO
    }

    /// Cleanup hook, called when the instance is removed from the enabled set.
    async fn delete(&self) {}
}

/// Static description of a purger plugin.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PurgerDefinition {
    pub id: PluginId,
    pub label: String,
    pub description: String,
    pub types: Vec<InvalidationType>,
    /// Whether more than one instance of this plugin may be enabled.
    pub multi_instance: bool,
}

impl PurgerDefinition {
    pub fn new(id: impl Into<PluginId>, label: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
            description: String::new(),
            types: Vec::new(),
            multi_instance: false,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_types(mut self, types: impl IntoIterator<Item = InvalidationType>) -> Self {
        self.types = types.into_iter().collect();
        self
    }

    pub fn multi_instance(mut self) -> Self {
        self.multi_instance = true;
        self
    }

    /// Turn the definition into a plugin backed by a factory closure.
    pub fn into_plugin<F>(self, factory: F) -> FactoryPlugin
    where
        F: Fn(InstanceId, &PurgerDefinition) -> Arc<dyn Purger> + Send + Sync + 'static,
    {
        FactoryPlugin {
            definition: self,
            factory: Box::new(factory),
        }
    }
}

/// A purger implementation: definition + instance factory.
pub trait PurgerPlugin: Send + Sync {
    fn definition(&self) -> &PurgerDefinition;

    fn create(&self, instance_id: InstanceId) -> Arc<dyn Purger>;
}

type Factory = Box<dyn Fn(InstanceId, &PurgerDefinition) -> Arc<dyn Purger> + Send + Sync>;

/// PurgerPlugin built from a definition and a closure.
pub struct FactoryPlugin {
    definition: PurgerDefinition,
    factory: Factory,
}

impl PurgerPlugin for FactoryPlugin {
    fn definition(&self) -> &PurgerDefinition {
        &self.definition
    }

    fn create(&self, instance_id: InstanceId) -> Arc<dyn Purger> {
        (self.factory)(instance_id, &self.definition)
    }
}
