//! Settings - 処理量の上限・cooldown・バッチサイズの設定
//!
//! 設定は次の順で読み込み、後のものが前のものを上書きします。
//! 1. コード上のデフォルト値
//! 2. `PURGE_CONFIG_PATH` で指定された TOML ファイル（あれば）
//! 3. `PURGE__` プレフィックスの環境変数（例: `PURGE__CAPACITY__MAX_INVALIDATIONS=100`）
//!
//! purger の並び順はここではなく `ConfigStore` に保存します。

use std::collections::HashMap;
use std::env;
use std::time::Duration;

use config::{Config, Environment, File, FileFormat};
use serde::{Deserialize, Serialize};

use crate::domain::{InstanceId, Result};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PurgeSettings {
    pub capacity: CapacitySettings,
    pub processor: ProcessorSettings,
}

/// Per-cycle ceilings and pacing. A ceiling of `0` means "no limit".
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CapacitySettings {
    pub max_invalidations: usize,
    pub max_execution_time_ms: u64,
    /// Cooldown for purgers that neither have an override nor advertise one.
    pub default_cooldown_ms: u64,
    /// Per-instance cooldown overrides, keyed by instance id.
    pub cooldowns_ms: HashMap<String, u64>,
}

impl CapacitySettings {
    pub fn max_execution_time(&self) -> Duration {
        Duration::from_millis(self.max_execution_time_ms)
    }

    pub fn default_cooldown(&self) -> Duration {
        Duration::from_millis(self.default_cooldown_ms)
    }

    pub fn cooldown_override(&self, instance: &InstanceId) -> Option<Duration> {
        self.cooldowns_ms
            .get(instance.as_str())
            .map(|ms| Duration::from_millis(*ms))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProcessorSettings {
    /// Upper bound on items claimed per cycle.
    pub batch_size: usize,
}

impl Default for ProcessorSettings {
    fn default() -> Self {
        Self { batch_size: 50 }
    }
}

impl PurgeSettings {
    /// Load defaults, then `PURGE_CONFIG_PATH`, then `PURGE__*` variables.
    pub fn load() -> Result<Self> {
        let mut builder = Config::builder().add_source(Config::try_from(&Self::default())?);

        if let Ok(path) = env::var("PURGE_CONFIG_PATH") {
            builder = builder.add_source(File::with_name(&path).required(true));
        }

        builder = builder.add_source(
            Environment::with_prefix("PURGE")
                .separator("__")
                .ignore_empty(true)
                .try_parsing(true),
        );

        Ok(builder.build()?.try_deserialize()?)
    }

    /// Defaults overridden by a TOML document.
    pub fn from_toml_str(toml: &str) -> Result<Self> {
        let config = Config::builder()
            .add_source(Config::try_from(&Self::default())?)
            .add_source(File::from_str(toml, FileFormat::Toml))
            .build()?;
        Ok(config.try_deserialize()?)
    }
}
