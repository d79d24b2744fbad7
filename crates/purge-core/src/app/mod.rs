//! App - アプリケーション層
//!
//! このモジュールは、ports と purgers を組み合わせてアプリケーションロジックを実装します。
//!
//! # 主要コンポーネント
//! - **EngineBuilder**: PurgeEngine の構築とワイヤリング
//! - **QueueProcessor**: キューからの claim → 配送 → delete / release
//! - **CacheTagsQueuer**: キャッシュタグのシグナルをキューに積む
//! - **DiagnosticsService**: 診断チェックと health signal

pub mod builder;
pub mod diagnostics;
pub mod processor;
pub mod queuer;

// 主要な型を再エクスポート
pub use self::builder::EngineBuilder;
pub use self::diagnostics::{
    DiagnosticCheck, DiagnosticReport, DiagnosticsService, PurgersConfiguredCheck, Severity,
};
pub use self::processor::{CycleReport, QueueProcessor};
pub use self::queuer::CacheTagsQueuer;
