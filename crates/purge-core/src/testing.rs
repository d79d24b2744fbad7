//! テスト用の purger・pacer・health signal

use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;

use crate::domain::{
    InstanceId, Invalidation, InvalidationState, InvalidationType, PurgeError, Result,
};
use crate::ports::{
    DEFAULT_METHOD, Diagnosis, HealthSignal, Pacer, Purger, PurgerDefinition, PurgerPlugin,
};

/// One `invoke()` observed by a recording purger.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Call {
    pub instance: String,
    pub method: String,
    pub items: Vec<String>,
}

impl Call {
    pub fn new(instance: &str, method: &str, items: &[&str]) -> Self {
        Self {
            instance: instance.to_string(),
            method: method.to_string(),
            items: items.iter().map(|s| s.to_string()).collect(),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub(crate) struct CallLog(Arc<Mutex<Vec<Call>>>);

impl CallLog {
    pub fn calls(&self) -> Vec<Call> {
        self.0.lock().clone()
    }

    pub fn for_instance(&self, instance: &str) -> Vec<Call> {
        self.0
            .lock()
            .iter()
            .filter(|call| call.instance == instance)
            .cloned()
            .collect()
    }

    pub fn clear(&self) {
        self.0.lock().clear();
    }

    fn push(&self, call: Call) {
        self.0.lock().push(call);
    }
}

#[derive(Debug, Clone)]
struct Behaviour {
    outcome: Option<InvalidationState>,
    failing: bool,
    cooldown: Duration,
}

/// Plugin whose purgers record every call and answer with a fixed outcome.
pub(crate) struct RecordingPlugin {
    definition: PurgerDefinition,
    behaviour: Behaviour,
    log: CallLog,
    deleted: Arc<Mutex<Vec<InstanceId>>>,
}

impl RecordingPlugin {
    pub fn new(plugin_id: &str, types: impl IntoIterator<Item = InvalidationType>) -> Self {
        Self {
            definition: PurgerDefinition::new(plugin_id, plugin_id).with_types(types),
            behaviour: Behaviour {
                outcome: Some(InvalidationState::Succeeded),
                failing: false,
                cooldown: Duration::ZERO,
            },
            log: CallLog::default(),
            deleted: Arc::default(),
        }
    }

    pub fn multi_instance(mut self) -> Self {
        self.definition = self.definition.multi_instance();
        self
    }

    pub fn with_outcome(mut self, outcome: InvalidationState) -> Self {
        self.behaviour.outcome = Some(outcome);
        self
    }

    /// Leave the offered items untouched.
    pub fn silent(mut self) -> Self {
        self.behaviour.outcome = None;
        self
    }

    /// Every call returns an error.
    pub fn failing(mut self) -> Self {
        self.behaviour.failing = true;
        self
    }

    pub fn with_cooldown(mut self, cooldown: Duration) -> Self {
        self.behaviour.cooldown = cooldown;
        self
    }

    pub fn with_log(mut self, log: CallLog) -> Self {
        self.log = log;
        self
    }

    /// Instances whose cleanup hook ran.
    pub fn deleted(&self) -> Arc<Mutex<Vec<InstanceId>>> {
        Arc::clone(&self.deleted)
    }
}

impl PurgerPlugin for RecordingPlugin {
    fn definition(&self) -> &PurgerDefinition {
        &self.definition
    }

    fn create(&self, instance_id: InstanceId) -> Arc<dyn Purger> {
        Arc::new(RecordingPurger {
            id: instance_id,
            label: self.definition.label.clone(),
            types: self.definition.types.clone(),
            behaviour: self.behaviour.clone(),
            log: self.log.clone(),
            deleted: Arc::clone(&self.deleted),
        })
    }
}

struct RecordingPurger {
    id: InstanceId,
    label: String,
    types: Vec<InvalidationType>,
    behaviour: Behaviour,
    log: CallLog,
    deleted: Arc<Mutex<Vec<InstanceId>>>,
}

#[async_trait]
impl Purger for RecordingPurger {
    fn id(&self) -> &InstanceId {
        &self.id
    }

    fn label(&self) -> String {
        format!("{} {}", self.label, self.id)
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
        self.log.push(Call {
            instance: self.id.to_string(),
            method: method.to_string(),
            items: invalidations
                .iter()
                .map(|i| i.representation().to_string())
                .collect(),
        });
        if self.behaviour.failing {
            return Err(PurgeError::purger(&self.id, "backend unavailable"));
        }
        if let Some(outcome) = self.behaviour.outcome {
            for invalidation in invalidations.iter_mut() {
                invalidation.set_state(outcome)?;
            }
        }
        Ok(())
    }

    fn cooldown_time(&self) -> Duration {
        self.behaviour.cooldown
    }

    async fn delete(&self) {
        self.deleted.lock().push(self.id.clone());
    }
}

/// Pacer that records requested pauses instead of sleeping.
#[derive(Debug, Clone, Default)]
pub(crate) struct RecordingPacer(Arc<Mutex<Vec<Duration>>>);

impl RecordingPacer {
    pub fn pauses(&self) -> Vec<Duration> {
        self.0.lock().clone()
    }
}

#[async_trait]
impl Pacer for RecordingPacer {
    async fn pause(&self, duration: Duration) {
        self.0.lock().push(duration);
    }
}

/// Health signal that is always on fire with the given recommendation.
pub(crate) struct OnFire(pub String);

impl HealthSignal for OnFire {
    fn is_system_on_fire(&self) -> Option<Diagnosis> {
        Some(Diagnosis::new(self.0.clone()))
    }
}
