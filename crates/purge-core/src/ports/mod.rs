//! Ports - 抽象化レイヤー
//!
//! このモジュールは Hexagonal Architecture の「ポート」を定義します。
//! 各 trait はコアの外にある協調相手（永続キュー、設定ストア、診断、
//! purger の実装）へのインターフェースで、実装の詳細を隠蔽します。

pub mod clock;
pub mod config_store;
pub mod health;
pub mod pacer;
pub mod purger;
pub mod queue;

// 主要な trait を再エクスポート
pub use self::clock::{Clock, FixedClock, SystemClock};
pub use self::config_store::{ConfigStore, PurgerRecord};
pub use self::health::{AlwaysHealthy, Diagnosis, HealthSignal};
pub use self::pacer::{Pacer, TokioPacer};
pub use self::purger::{DEFAULT_METHOD, FactoryPlugin, Purger, PurgerDefinition, PurgerPlugin};
pub use self::queue::DurableQueue;
