//! InMemoryConfigStore - 開発・テスト用の設定ストア

use parking_lot::RwLock;

use crate::domain::Result;
use crate::ports::{ConfigStore, PurgerRecord};

#[derive(Debug, Default)]
pub struct InMemoryConfigStore {
    records: RwLock<Vec<PurgerRecord>>,
}

impl InMemoryConfigStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_records(records: Vec<PurgerRecord>) -> Self {
        Self {
            records: RwLock::new(records),
        }
    }

    /// `(instance_id, plugin_id)` pairs, numbered from 1 in the given order.
    pub fn with_enabled(pairs: &[(&str, &str)]) -> Self {
        let records = pairs
            .iter()
            .zip(1u32..)
            .map(|((instance_id, plugin_id), order_index)| PurgerRecord {
                order_index,
                instance_id: (*instance_id).into(),
                plugin_id: (*plugin_id).into(),
            })
            .collect();
        Self::with_records(records)
    }
}

impl ConfigStore for InMemoryConfigStore {
    fn load_purgers(&self) -> Result<Vec<PurgerRecord>> {
        Ok(self.records.read().clone())
    }

    fn save_purgers(&self, records: Vec<PurgerRecord>) -> Result<()> {
        *self.records.write() = records;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn save_replaces_records() {
        let store = InMemoryConfigStore::with_enabled(&[("a", "varnish"), ("b", "cdn")]);
        let loaded = store.load_purgers().unwrap();
        assert_eq!(loaded.len(), 2);
        assert_eq!(loaded[1].order_index, 2);

        store.save_purgers(Vec::new()).unwrap();
        assert!(store.load_purgers().unwrap().is_empty());
    }
}
