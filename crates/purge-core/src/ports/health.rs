//! HealthSignal port - 処理を止めるべき状態かどうか
//!
//! 診断チェックの詳細はコアの関心外で、コアは
//! 「燃えているか（+ 推奨対応）」だけを受け取ります。

/// A critical condition reported by the health signal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnosis {
    pub recommendation: String,
}

impl Diagnosis {
    pub fn new(recommendation: impl Into<String>) -> Self {
        Self {
            recommendation: recommendation.into(),
        }
    }
}

pub trait HealthSignal: Send + Sync {
    /// `Some` when processing must not start.
    fn is_system_on_fire(&self) -> Option<Diagnosis>;
}

/// Health signal that never reports a problem.
#[derive(Debug, Clone, Copy, Default)]
pub struct AlwaysHealthy;

impl HealthSignal for AlwaysHealthy {
    fn is_system_on_fire(&self) -> Option<Diagnosis> {
        None
    }
}
