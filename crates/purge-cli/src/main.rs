use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

use purge_core::app::{CacheTagsQueuer, EngineBuilder, QueueProcessor};
use purge_core::domain::{
    InstanceId, Invalidation, InvalidationState, InvalidationType, PluginId, PurgeError, Result,
};
use purge_core::impls::{InMemoryConfigStore, InMemoryQueue};
use purge_core::ports::{DEFAULT_METHOD, DurableQueue, Purger, PurgerDefinition};
use purge_core::settings::PurgeSettings;
use tracing::info;

/// Demo purger that "invalidates" by printing.
struct ConsolePurger {
    id: InstanceId,
    label: String,
    types: Vec<InvalidationType>,
    cooldown: Duration,
}

impl ConsolePurger {
    fn create(id: InstanceId, definition: &PurgerDefinition, cooldown: Duration) -> Arc<dyn Purger> {
        Arc::new(Self {
            label: format!("{} ({id})", definition.label),
            types: definition.types.clone(),
            id,
            cooldown,
        })
    }
}

#[async_trait]
impl Purger for ConsolePurger {
    fn id(&self) -> &InstanceId {
        &self.id
    }

    fn label(&self) -> String {
        self.label.clone()
    }

    fn types(&self) -> Vec<InvalidationType> {
        self.types.clone()
    }

    fn route_type_to_method(&self, kind: &InvalidationType) -> &'static str {
        if *kind == InvalidationType::tag() {
            "invalidate_tags"
        } else {
            DEFAULT_METHOD
        }
    }

    async fn invoke(&self, method: &str, invalidations: &mut [&mut Invalidation]) -> Result<()> {
        for invalidation in invalidations.iter_mut() {
            println!("  [{}] {method}: {invalidation}", self.label);
            invalidation.set_state(InvalidationState::Succeeded)?;
        }
        Ok(())
    }

    fn cooldown_time(&self) -> Duration {
        self.cooldown
    }
}

#[tokio::main]
async fn main() -> std::result::Result<(), PurgeError> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let settings = PurgeSettings::load()?;

    // (A) plugin と設定ストアを用意
    let varnish = PurgerDefinition::new("varnish", "Varnish")
        .with_description("Tag based invalidation")
        .with_types([InvalidationType::tag()])
        .multi_instance()
        .into_plugin(|id, definition| ConsolePurger::create(id, definition, Duration::ZERO));
    let cdn = PurgerDefinition::new("cdn", "CDN")
        .with_types([InvalidationType::path(), InvalidationType::url()])
        .into_plugin(|id, definition| {
            ConsolePurger::create(id, definition, Duration::from_millis(200))
        });
    let store = Arc::new(InMemoryConfigStore::new());

    let mut engine = EngineBuilder::new()
        .register(varnish)?
        .register(cdn)?
        .expect_plugins(&["varnish", "cdn"])
        .with_store(store)
        .with_limits(settings.capacity.clone())
        .build()?;

    // (B) purger を有効化（並び順 = 処理順）
    let registry = engine.registry_mut();
    let edge = registry.create_id();
    registry
        .set_enabled([
            (InstanceId::new("cdn1"), PluginId::new("cdn")),
            (edge.clone(), PluginId::new("varnish")),
        ])
        .await?;
    registry.move_up(&edge).await?;
    for (id, label) in registry.labels() {
        info!(%id, %label, "purger enabled");
    }

    // (C) シグナルをキューに積む
    let queue = Arc::new(InMemoryQueue::new());
    let mut queuer = CacheTagsQueuer::new(queue.clone());
    queuer
        .invalidate_tags(["node:1", "node_list", "node:1", "config:system.site"])
        .await?;
    let mut paths = CacheTagsQueuer::new(queue.clone()).with_kind(InvalidationType::path());
    paths.invalidate_tags(["/about", "/contact"]).await?;
    queue
        .add_multiple(vec![Invalidation::new(InvalidationType::domain(), "example.com")])
        .await?;

    // (D) キューが空になるか進まなくなるまで処理
    let mut processor = QueueProcessor::new(engine, queue.clone(), settings.processor.batch_size);
    loop {
        let report = processor.run_cycle().await?;
        println!(
            "cycle: claimed={} succeeded={} released={}",
            report.claimed, report.succeeded, report.released
        );
        if report.succeeded == 0 {
            break;
        }
    }

    for invalidation in queue.snapshot().await {
        let data = invalidation.property("data")?;
        println!(
            "left in queue: {data} state={} lifecycle={}",
            invalidation.state(),
            invalidation.lifecycle()
        );
    }
    Ok(())
}
