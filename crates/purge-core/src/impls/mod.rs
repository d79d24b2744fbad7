//! Impls - 実装（開発用・テスト用）
//!
//! このモジュールには ports の実装を含めます。
//!
//! # 含まれる実装
//! - **InMemoryQueue**: 揮発性の永続キュー
//! - **InMemoryConfigStore**: purger の並び順を保持する設定ストア
//!
//! # 本番用実装
//! 本番用のキューや設定ストアは別クレートで ports を実装します。

pub mod inmem_config;
pub mod inmem_queue;

// 主要な型を再エクスポート
pub use self::inmem_config::InMemoryConfigStore;
pub use self::inmem_queue::InMemoryQueue;
