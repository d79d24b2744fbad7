//! DurableQueue port - invalidation の永続キュー
//!
//! キューの保存方式はコアの関心外です。コアは claim したバッチを受け取り、
//! 結果に応じて delete / release するだけです。
//!
//! # 実装
//! - **InMemoryQueue**: 開発・テスト用（`impls::inmem_queue`）

use async_trait::async_trait;

use crate::domain::{Invalidation, Result};

/// DurableQueue は invalidation を保持し、claim / release / delete を提供
///
/// # 設計原則
/// - lifecycle の ADDING/ADDED, CLAIMING/CLAIMED, RELEASING/RELEASED,
///   DELETING/DELETED はキュー側が進める
/// - release / delete は呼び出し元のアイテムの lifecycle も更新する
#[async_trait]
pub trait DurableQueue: Send + Sync {
    async fn add_multiple(&self, items: Vec<Invalidation>) -> Result<()>;

    /// Claim up to `max` unclaimed items.
    async fn claim(&self, max: usize) -> Result<Vec<Invalidation>>;

    /// Hand claimed items back so they can be claimed again later.
    async fn release(&self, items: &mut [Invalidation]) -> Result<()>;

    async fn delete(&self, items: &mut [Invalidation]) -> Result<()>;

    async fn number_of_items(&self) -> Result<usize>;
}
