//! PurgerRegistry - 有効な purger instance とその順序
//!
//! # 派生キャッシュ
//! 有効 instance の一覧・ラベル・サポート type・生成済み purger は
//! まとめて 1 つの `Derived` に入れ、`reload()` で丸ごと作り直します。
//! 作り直すたびに `generation` が 1 増えます。
//!
//! # 読み飛ばし
//! アンインストールされた plugin を参照するレコードはエラーにせず、
//! warn ログを出して無視します。

use indexmap::{IndexMap, IndexSet};
use std::collections::HashSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tracing::{debug, info, warn};

use crate::domain::{InstanceId, InvalidationType, PluginId, PurgeError, Result};
use crate::ports::{ConfigStore, Purger, PurgerRecord};

use super::catalog::PluginCatalog;

/// Everything computed from the stored records, rebuilt together.
#[derive(Default)]
struct Derived {
    enabled: IndexMap<InstanceId, PluginId>,
    purgers: IndexMap<InstanceId, Arc<dyn Purger>>,
    labels: IndexMap<InstanceId, String>,
    types: Vec<InvalidationType>,
    types_by_instance: IndexMap<InstanceId, Vec<InvalidationType>>,
}

impl Derived {
    fn build(catalog: &PluginCatalog, records: Vec<PurgerRecord>) -> Self {
        let mut records: Vec<PurgerRecord> = records
            .into_iter()
            .filter(|record| {
                let known = catalog.contains(&record.plugin_id);
                if !known {
                    warn!(
                        instance_id = %record.instance_id,
                        plugin_id = %record.plugin_id,
                        "ignoring purger instance of an unknown plugin"
                    );
                }
                known
            })
            .collect();
        records.sort_by_key(|record| record.order_index);

        let mut derived = Derived::default();
        let mut types = IndexSet::new();
        for record in records {
            let Some(plugin) = catalog.get(&record.plugin_id) else {
                continue;
            };
            let purger = plugin.create(record.instance_id.clone());
            let purger_types = purger.types();
            types.extend(purger_types.iter().cloned());

            derived.labels.insert(record.instance_id.clone(), purger.label());
            derived
                .types_by_instance
                .insert(record.instance_id.clone(), purger_types);
            derived.purgers.insert(record.instance_id.clone(), purger);
            derived.enabled.insert(record.instance_id, record.plugin_id);
        }
        derived.types = types.into_iter().collect();
        derived
    }
}

/// Number of enabled instances, kept current by every `reload()`.
#[derive(Debug, Clone, Default)]
pub struct EnabledPurgers(Arc<AtomicUsize>);

impl EnabledPurgers {
    pub fn new(count: usize) -> Self {
        Self(Arc::new(AtomicUsize::new(count)))
    }

    pub fn get(&self) -> usize {
        self.0.load(Ordering::Acquire)
    }

    fn set(&self, count: usize) {
        self.0.store(count, Ordering::Release);
    }
}

/// Ordered set of enabled purger instances.
pub struct PurgerRegistry {
    catalog: Arc<PluginCatalog>,
    store: Arc<dyn ConfigStore>,
    generation: u64,
    derived: Derived,
    enabled_count: EnabledPurgers,
}

impl PurgerRegistry {
    pub fn load(catalog: Arc<PluginCatalog>, store: Arc<dyn ConfigStore>) -> Result<Self> {
        let mut registry = Self {
            catalog,
            store,
            generation: 0,
            derived: Derived::default(),
            enabled_count: EnabledPurgers::default(),
        };
        registry.reload()?;
        Ok(registry)
    }

    /// Drop every derived cache and rebuild from the store.
    pub fn reload(&mut self) -> Result<()> {
        let records = self.store.load_purgers()?;
        self.derived = Derived::build(&self.catalog, records);
        self.enabled_count.set(self.derived.enabled.len());
        self.generation += 1;
        debug!(
            generation = self.generation,
            enabled = self.derived.enabled.len(),
            "purger registry loaded"
        );
        Ok(())
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Handle that follows the enabled count across reloads.
    pub fn enabled_count(&self) -> EnabledPurgers {
        self.enabled_count.clone()
    }

    pub fn catalog(&self) -> &PluginCatalog {
        &self.catalog
    }

    /// Enabled instances in processing order: instance id -> plugin id.
    pub fn enabled(&self) -> &IndexMap<InstanceId, PluginId> {
        &self.derived.enabled
    }

    /// Plugins that can still be instantiated.
    pub fn available(&self) -> Vec<PluginId> {
        let in_use: HashSet<&PluginId> = self.derived.enabled.values().collect();
        self.catalog
            .definitions()
            .filter(|definition| definition.multi_instance || !in_use.contains(&definition.id))
            .map(|definition| definition.id.clone())
            .collect()
    }

    pub fn purgers(&self) -> impl Iterator<Item = (&InstanceId, &Arc<dyn Purger>)> {
        self.derived.purgers.iter()
    }

    pub fn purger(&self, id: &InstanceId) -> Option<&Arc<dyn Purger>> {
        self.derived.purgers.get(id)
    }

    pub fn labels(&self) -> &IndexMap<InstanceId, String> {
        &self.derived.labels
    }

    /// Union of the types supported by all enabled purgers.
    pub fn supported_types(&self) -> &[InvalidationType] {
        &self.derived.types
    }

    pub fn supported_types_by_instance(&self) -> &IndexMap<InstanceId, Vec<InvalidationType>> {
        &self.derived.types_by_instance
    }

    /// Fresh instance id that is not enabled yet.
    pub fn create_id(&self) -> InstanceId {
        loop {
            let candidate = InstanceId::new(format!("{:010x}", rand::random::<u64>() >> 24));
            if !self.derived.enabled.contains_key(&candidate) {
                return candidate;
            }
        }
    }

    /// Replace the enabled set; order of `enabled` becomes the processing order.
    ///
    /// Instances that disappear get their cleanup hook called before the new
    /// set is persisted. Nothing is touched when validation fails.
    pub async fn set_enabled<I>(&mut self, enabled: I) -> Result<()>
    where
        I: IntoIterator<Item = (InstanceId, PluginId)>,
    {
        let mut validated: IndexMap<InstanceId, PluginId> = IndexMap::new();
        for (instance_id, plugin_id) in enabled {
            if instance_id.is_empty() {
                return Err(PurgeError::InvalidConfiguration(
                    "invalid instance id (empty)".into(),
                ));
            }
            if !self.catalog.contains(&plugin_id) {
                return Err(PurgeError::InvalidConfiguration(format!(
                    "invalid plugin id '{plugin_id}' for instance '{instance_id}'"
                )));
            }
            if validated.contains_key(&instance_id) {
                return Err(PurgeError::InvalidConfiguration(format!(
                    "duplicate instance id '{instance_id}'"
                )));
            }
            validated.insert(instance_id, plugin_id);
        }

        for (instance_id, purger) in &self.derived.purgers {
            if !validated.contains_key(instance_id) {
                info!(%instance_id, "removing purger instance");
                purger.delete().await;
            }
        }

        let records = validated
            .into_iter()
            .zip(1u32..)
            .map(|((instance_id, plugin_id), order_index)| PurgerRecord {
                order_index,
                instance_id,
                plugin_id,
            })
            .collect();
        self.store.save_purgers(records)?;
        self.reload()
    }

    /// Move one instance a single position towards the front.
    pub async fn move_up(&mut self, id: &InstanceId) -> Result<()> {
        let mut order = self.ordered_for_move(id)?;
        if let Some(index) = order.get_index_of(id)
            && index > 0
        {
            order.move_index(index, index - 1);
        }
        self.set_enabled(order).await
    }

    /// Move one instance a single position towards the back.
    pub async fn move_down(&mut self, id: &InstanceId) -> Result<()> {
        let mut order = self.ordered_for_move(id)?;
        if let Some(index) = order.get_index_of(id)
            && index + 1 < order.len()
        {
            order.move_index(index, index + 1);
        }
        self.set_enabled(order).await
    }

    fn ordered_for_move(&self, id: &InstanceId) -> Result<IndexMap<InstanceId, PluginId>> {
        if !self.derived.enabled.contains_key(id) {
            return Err(PurgeError::UnknownInstance(id.clone()));
        }
        Ok(self.derived.enabled.clone())
    }
}
