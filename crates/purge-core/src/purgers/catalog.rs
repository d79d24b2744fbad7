//! PluginCatalog - インストール済み purger plugin の一覧
//!
//! plugin の検出・登録の仕組み自体はコアの外にあります。
//! ここでは起動時に登録された plugin を plugin id で引けるようにするだけです。
//!
//! # 内部実装
//! - 登録順を保つため IndexMap<PluginId, Arc<dyn PurgerPlugin>> で管理
//! - 二重登録は `PurgeError::DuplicatePlugin`

use indexmap::IndexMap;
use std::sync::Arc;

use crate::domain::{PluginId, PurgeError, Result};
use crate::ports::{PurgerDefinition, PurgerPlugin};

#[derive(Default)]
pub struct PluginCatalog {
    plugins: IndexMap<PluginId, Arc<dyn PurgerPlugin>>,
}

impl PluginCatalog {
    pub fn new() -> Self {
        Self {
            plugins: IndexMap::new(),
        }
    }

    pub fn register(&mut self, plugin: impl PurgerPlugin + 'static) -> Result<()> {
        let plugin_id = plugin.definition().id.clone();
        if self.plugins.contains_key(&plugin_id) {
            return Err(PurgeError::DuplicatePlugin(plugin_id));
        }
        self.plugins.insert(plugin_id, Arc::new(plugin));
        Ok(())
    }

    pub fn get(&self, plugin_id: &PluginId) -> Option<&Arc<dyn PurgerPlugin>> {
        self.plugins.get(plugin_id)
    }

    pub fn contains(&self, plugin_id: &PluginId) -> bool {
        self.plugins.contains_key(plugin_id)
    }

    pub fn definitions(&self) -> impl Iterator<Item = &PurgerDefinition> {
        self.plugins.values().map(|plugin| plugin.definition())
    }

    pub fn plugin_ids(&self) -> Vec<PluginId> {
        self.plugins.keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.plugins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.plugins.is_empty()
    }
}
