//! Pacer port - purger 間の cooldown 待機
//!
//! cooldown は「次の purger を呼ぶ前に待つ」だけの処理ですが、
//! trait にしておくとテストで待機の有無と長さを観測できます。

use async_trait::async_trait;
use std::time::Duration;

#[async_trait]
pub trait Pacer: Send + Sync {
    async fn pause(&self, duration: Duration);
}

/// tokio のタイマーで待機する Pacer
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioPacer;

#[async_trait]
impl Pacer for TokioPacer {
    async fn pause(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}
