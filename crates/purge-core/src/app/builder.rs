//! EngineBuilder - PurgeEngine の構築とワイヤリング
//!
//! # 起動時検証（Fail-fast）
//! - `expect_plugins()` で必要な plugin id を宣言
//! - `build()` 時に「期待集合 ⊆ 登録済み集合」をチェック
//! - 不足があれば `PurgeError::InvalidConfiguration`
//!
//! health signal を指定しなければ、有効な purger が 1 つもないときに
//! 処理を止める `DiagnosticsService` を使います。このチェックは registry の
//! 現在の有効数を見るので、build 後の `set_enabled()` にも追従します。

use std::sync::Arc;
use tracing::info;

use crate::domain::{PurgeError, Result};
use crate::impls::InMemoryConfigStore;
use crate::ports::{ConfigStore, HealthSignal, Pacer, PurgerPlugin, TokioPacer};
use crate::purgers::{CapacityTracker, PluginCatalog, PurgeEngine, PurgerRegistry};
use crate::settings::CapacitySettings;

use super::diagnostics::{DiagnosticsService, PurgersConfiguredCheck};

/// Wires catalog, store, health signal and pacer into a `PurgeEngine`.
///
/// # 使用例
/// ```ignore
/// let engine = EngineBuilder::new()
///     .register(varnish_plugin)?
///     .expect_plugins(&["varnish"])
///     .with_store(store)
///     .build()?;
/// ```
pub struct EngineBuilder {
    catalog: PluginCatalog,
    expected_plugins: Option<Vec<String>>,
    store: Option<Arc<dyn ConfigStore>>,
    health: Option<Arc<dyn HealthSignal>>,
    pacer: Option<Arc<dyn Pacer>>,
    limits: CapacitySettings,
}

impl EngineBuilder {
    pub fn new() -> Self {
        Self {
            catalog: PluginCatalog::new(),
            expected_plugins: None,
            store: None,
            health: None,
            pacer: None,
            limits: CapacitySettings::default(),
        }
    }

    pub fn register(mut self, plugin: impl PurgerPlugin + 'static) -> Result<Self> {
        self.catalog.register(plugin)?;
        Ok(self)
    }

    pub fn expect_plugins(mut self, plugin_ids: &[&str]) -> Self {
        self.expected_plugins = Some(plugin_ids.iter().map(|id| id.to_string()).collect());
        self
    }

    pub fn with_store(mut self, store: Arc<dyn ConfigStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn with_health(mut self, health: Arc<dyn HealthSignal>) -> Self {
        self.health = Some(health);
        self
    }

    pub fn with_pacer(mut self, pacer: Arc<dyn Pacer>) -> Self {
        self.pacer = Some(pacer);
        self
    }

    pub fn with_limits(mut self, limits: CapacitySettings) -> Self {
        self.limits = limits;
        self
    }

    pub fn build(self) -> Result<PurgeEngine> {
        if let Some(expected) = &self.expected_plugins {
            let registered = self.catalog.plugin_ids();
            let missing: Vec<String> = expected
                .iter()
                .filter(|id| !registered.iter().any(|plugin_id| plugin_id.as_str() == id.as_str()))
                .cloned()
                .collect();
            if !missing.is_empty() {
                return Err(PurgeError::InvalidConfiguration(format!(
                    "missing purger plugins: {missing:?}"
                )));
            }
        }

        let store = self
            .store
            .unwrap_or_else(|| Arc::new(InMemoryConfigStore::new()));
        let registry = PurgerRegistry::load(Arc::new(self.catalog), store)?;
        let health = self.health.unwrap_or_else(|| {
            Arc::new(
                DiagnosticsService::new()
                    .with_check(PurgersConfiguredCheck::new(registry.enabled_count())),
            )
        });
        let pacer = self.pacer.unwrap_or_else(|| Arc::new(TokioPacer));

        info!(
            plugins = registry.catalog().len(),
            enabled = registry.enabled().len(),
            "purge engine built"
        );
        Ok(PurgeEngine::new(
            registry,
            CapacityTracker::new(self.limits, health, pacer),
        ))
    }
}

impl Default for EngineBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{
        InstanceId, Invalidation, InvalidationState, InvalidationType, PluginId,
    };
    use crate::testing::{RecordingPacer, RecordingPlugin};

    #[test]
    fn build_success() {
        let engine = EngineBuilder::new()
            .register(RecordingPlugin::new("varnish", [InvalidationType::tag()]))
            .unwrap()
            .expect_plugins(&["varnish"])
            .with_store(Arc::new(InMemoryConfigStore::with_enabled(&[("a", "varnish")])))
            .build()
            .unwrap();
        assert_eq!(engine.registry().enabled().len(), 1);
    }

    #[test]
    fn build_reports_missing_plugins() {
        let result = EngineBuilder::new()
            .register(RecordingPlugin::new("varnish", [InvalidationType::tag()]))
            .unwrap()
            .expect_plugins(&["varnish", "cloudflare"])
            .build();
        assert!(matches!(
            result,
            Err(PurgeError::InvalidConfiguration(msg)) if msg.contains("cloudflare") && !msg.contains("varnish")
        ));
    }

    #[test]
    fn duplicate_registration_fails() {
        let result = EngineBuilder::new()
            .register(RecordingPlugin::new("varnish", [InvalidationType::tag()]))
            .unwrap()
            .register(RecordingPlugin::new("varnish", [InvalidationType::path()]));
        assert!(matches!(result, Err(PurgeError::DuplicatePlugin(_))));
    }

    #[tokio::test]
    async fn default_health_blocks_without_purgers() {
        let mut engine = EngineBuilder::new()
            .register(RecordingPlugin::new("varnish", [InvalidationType::tag()]))
            .unwrap()
            .with_pacer(Arc::new(RecordingPacer::default()))
            .build()
            .unwrap();
        let mut batch = vec![Invalidation::new(InvalidationType::tag(), "node:1")];
        let err = engine.invalidate(&mut batch).await.unwrap_err();
        assert!(matches!(err, PurgeError::SystemUnhealthy(_)));
    }

    #[tokio::test]
    async fn default_health_follows_purgers_enabled_after_build() {
        let mut engine = EngineBuilder::new()
            .register(RecordingPlugin::new("varnish", [InvalidationType::tag()]))
            .unwrap()
            .with_pacer(Arc::new(RecordingPacer::default()))
            .build()
            .unwrap();

        engine
            .registry_mut()
            .set_enabled([(InstanceId::new("a"), PluginId::new("varnish"))])
            .await
            .unwrap();
        let mut batch = vec![Invalidation::new(InvalidationType::tag(), "node:1")];
        engine.invalidate(&mut batch).await.unwrap();
        assert_eq!(batch[0].state(), InvalidationState::Succeeded);

        engine
            .registry_mut()
            .set_enabled(Vec::<(InstanceId, PluginId)>::new())
            .await
            .unwrap();
        let mut batch = vec![Invalidation::new(InvalidationType::tag(), "node:2")];
        let err = engine.invalidate(&mut batch).await.unwrap_err();
        assert!(matches!(err, PurgeError::SystemUnhealthy(_)));
    }
}
