//! ConfigStore port - 有効な purger の並び順を保存する設定ストア
//!
//! 保存形式は `{order_index, instance_id, plugin_id}` のレコード列です。
//! 書き込みは 1 writer に直列化されている前提です（registry は `&mut self` で書く）。

use serde::{Deserialize, Serialize};

use crate::domain::{InstanceId, PluginId, Result};

/// One persisted purger instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PurgerRecord {
    pub order_index: u32,
    pub instance_id: InstanceId,
    pub plugin_id: PluginId,
}

pub trait ConfigStore: Send + Sync {
    fn load_purgers(&self) -> Result<Vec<PurgerRecord>>;

    /// Replace the stored records.
    fn save_purgers(&self, records: Vec<PurgerRecord>) -> Result<()>;
}
