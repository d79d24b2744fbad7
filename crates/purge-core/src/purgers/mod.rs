//! Purgers - purger の登録・順序・容量管理・配送
//!
//! # 主要コンポーネント
//! - **PluginCatalog**: インストール済み plugin の一覧
//! - **PurgerRegistry**: 有効な instance とその処理順
//! - **CapacityTracker**: サイクルあたりの上限と cooldown
//! - **PurgeEngine**: invalidation バッチを purger に配る

pub mod capacity;
pub mod catalog;
pub mod engine;
pub mod registry;

pub use self::capacity::{Allowance, CapacityTracker};
pub use self::catalog::PluginCatalog;
pub use self::engine::PurgeEngine;
pub use self::registry::{EnabledPurgers, PurgerRegistry};
