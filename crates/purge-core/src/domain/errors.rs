//! Errors - エラー型
//!
//! すべての操作は検出したエラーを呼び出し元へ同期的に返します。
//! コア内部で握りつぶすのは「アンインストール済み plugin を参照する設定」だけで、
//! それは registry がログを出して読み飛ばします。

use thiserror::Error;

use super::ids::{InstanceId, PluginId};

#[derive(Debug, Error)]
pub enum PurgeError {
    /// The thing to purge was not given as a string.
    #[error("invalid representation: {0}")]
    InvalidRepresentation(String),

    #[error("invalid property '{0}', use the setter methods")]
    InvalidProperty(String),

    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("purger instance '{0}' is not enabled")]
    UnknownInstance(InstanceId),

    /// A batch element cannot be dispatched.
    #[error("bad input: {0}")]
    BadInput(String),

    /// The health signal reported a critical condition.
    #[error("system unhealthy: {0}")]
    SystemUnhealthy(String),

    #[error("capacity exceeded: {0}")]
    CapacityExceeded(String),

    #[error("duplicate purger plugin: {0}")]
    DuplicatePlugin(PluginId),

    /// A destination failed while handling a group of invalidations.
    #[error("purger '{instance}' failed: {message}")]
    Purger {
        instance: InstanceId,
        message: String,
    },

    #[error("queue error: {0}")]
    Queue(String),

    #[error(transparent)]
    Settings(#[from] config::ConfigError),
}

impl PurgeError {
    pub fn purger(instance: &InstanceId, message: impl Into<String>) -> Self {
        Self::Purger {
            instance: instance.clone(),
            message: message.into(),
        }
    }
}

pub type Result<T, E = PurgeError> = std::result::Result<T, E>;
