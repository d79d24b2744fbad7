//! purge-core
//!
//! Core building blocks for dispatching cache invalidations to external purgers.
//!
//! # モジュール構成
//! - **domain**: ドメインモデル（ids, invalidation, state, queue_item, errors）
//! - **ports**: 抽象化レイヤー（Purger, DurableQueue, ConfigStore, HealthSignal, Pacer, Clock）
//! - **purgers**: plugin カタログ・registry・容量管理・配送エンジン
//! - **app**: アプリケーションロジック（builder, processor, queuer, diagnostics）
//! - **impls**: 実装（InMemoryQueue など開発用）
//! - **settings**: 階層的な設定読み込み

pub mod app;
pub mod domain;
pub mod impls;
pub mod ports;
pub mod purgers;
pub mod settings;

#[cfg(test)]
mod testing;
