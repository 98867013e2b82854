use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::broadcast;

/// Buffered events per subscriber before it starts lagging
pub const EVENT_CHANNEL_CAPACITY: usize = 256;

/// Notification that a goal-side resource changed, so clients can drop
/// whatever they cached for it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ResourceEventPayload {
    pub resource_type: String,
    pub action: String,
    pub payload: Value,
}

impl ResourceEventPayload {
    pub fn new(resource_type: &str, action: &str, payload: Value) -> Self {
        Self {
            resource_type: resource_type.to_string(),
            action: action.to_string(),
            payload,
        }
    }
}

pub fn event_channel() -> broadcast::Sender<ResourceEventPayload> {
    broadcast::channel(EVENT_CHANNEL_CAPACITY).0
}
