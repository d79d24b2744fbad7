//! Domain identifiers (strongly-typed IDs).
//!
//! # Queue item ID: ULID + Phantom type
//! キューに積まれたアイテムの ID は ULID を使用します。
//! - **時刻でソート可能**: 投入順に並ぶ
//! - **分散生成可能**: 調整なしで複数ノードで生成できる
//!
//! `Id<T>` のジェネリック実装で共通部分をまとめ、`T` はコンパイル時の
//! 型安全性のためだけのマーカー型（PhantomData）です。
//!
//! # Instance / Plugin ID
//! Purger の instance id と plugin id は設定ストアに文字列で保存されるため、
//! String の newtype として表現します。両者を取り違えないように型を分けています。

use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::fmt;
use std::marker::PhantomData;
use ulid::Ulid;

/// IdMarker は各 ID 型のマーカー trait
///
/// Display で使うプレフィックス（"item-" など）を提供します。
pub trait IdMarker: Send + Sync + 'static {
    fn prefix() -> &'static str;
}

/// ジェネリック ID 型
#[repr(transparent)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Id<T: IdMarker> {
    ulid: Ulid,
    #[serde(skip)]
    _marker: PhantomData<T>,
}

impl<T: IdMarker> Id<T> {
    pub fn from_ulid(ulid: Ulid) -> Self {
        Self {
            ulid,
            _marker: PhantomData,
        }
    }

    pub fn as_ulid(&self) -> Ulid {
        self.ulid
    }
}

impl<T: IdMarker> From<Ulid> for Id<T> {
    fn from(ulid: Ulid) -> Self {
        Self::from_ulid(ulid)
    }
}

impl<T: IdMarker> fmt::Display for Id<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", T::prefix(), self.ulid)
    }
}

/// Queue item のマーカー型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum QueueItem {}

impl IdMarker for QueueItem {
    fn prefix() -> &'static str {
        "item-"
    }
}

/// Identifier assigned by the durable queue when an invalidation is added.
pub type QueueItemId = Id<QueueItem>;

/// Identifier of one configured purger instance (e.g. `"a1b2c3d4e5"`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InstanceId(String);

impl InstanceId {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Identifier of a purger implementation (the plugin that instances are created from).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PluginId(String);

impl PluginId {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

macro_rules! string_id_impls {
    ($ty:ty) => {
        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                self.0.fmt(f)
            }
        }

        impl From<&str> for $ty {
            fn from(value: &str) -> Self {
                Self::new(value)
            }
        }

        impl From<String> for $ty {
            fn from(value: String) -> Self {
                Self::new(value)
            }
        }

        impl Borrow<str> for $ty {
            fn borrow(&self) -> &str {
                &self.0
            }
        }
    };
}

string_id_impls!(InstanceId);
string_id_impls!(PluginId);

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn queue_item_ids_display_with_prefix() {
        let ulid = Ulid::new();
        let id = QueueItemId::from_ulid(ulid);
        assert_eq!(id.as_ulid(), ulid);
        assert!(id.to_string().starts_with("item-"));
    }

    #[test]
    fn queue_item_ids_are_sortable() {
        let id1 = QueueItemId::from_ulid(Ulid::new());
        std::thread::sleep(std::time::Duration::from_millis(2));
        let id2 = QueueItemId::from_ulid(Ulid::new());
        assert!(id1 < id2);
    }

    #[test]
    fn phantom_data_does_not_consume_memory() {
        assert_eq!(std::mem::size_of::<QueueItemId>(), std::mem::size_of::<Ulid>());
    }

    #[test]
    fn instance_ids_serialize_as_plain_strings() {
        let id = InstanceId::new("a1b2c3");
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"a1b2c3\"");

        let back: InstanceId = serde_json::from_str("\"a1b2c3\"").unwrap();
        assert_eq!(back, id);
    }

    #[test]
    fn string_ids_can_be_looked_up_by_str() {
        let mut map = HashMap::new();
        map.insert(PluginId::new("varnish"), 1);
        assert_eq!(map.get("varnish"), Some(&1));
    }
}
