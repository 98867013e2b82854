use crate::events::ResourceEventPayload;
use crate::main_lib::AppState;

/// Publish a change to every `/events` subscriber. Having no subscribers is
/// not an error.
pub fn emit_resource_changed(state: &AppState, payload: ResourceEventPayload) {
    tracing::debug!(
        resource = %payload.resource_type,
        action = %payload.action,
        "resource changed"
    );
    let _ = state.events.send(payload);
}
