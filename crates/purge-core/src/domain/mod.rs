//! Domain model (invalidations, states, identifiers, errors).

pub mod errors;
pub mod ids;
pub mod invalidation;
pub mod queue_item;
pub mod state;

pub use errors::{PurgeError, Result};
pub use ids::{InstanceId, PluginId, QueueItemId};
pub use invalidation::{Invalidation, InvalidationType};
pub use queue_item::{QueueItemData, QueueItemInfo};
pub use state::{InvalidationState, LifecycleState, StateContext};
