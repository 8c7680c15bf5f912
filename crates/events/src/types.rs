use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// An event plus the identity and timestamp it was published with.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventEnvelope {
    pub id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub event: Event,
}

impl EventEnvelope {
    pub fn new(event: Event) -> Self {
        Self {
            id: Uuid::new_v4(),
            timestamp: Utc::now(),
            event,
        }
    }
}

/// All notifications the orchestration engine emits. Delivery is
/// fire-and-forget; an event with no subscribers is dropped.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    /// A task was submitted and persisted.
    #[serde(rename = "task.created")]
    TaskCreated { task_id: Uuid, plugin_id: String },

    /// A task moved between lifecycle states.
    #[serde(rename = "task.status_changed")]
    TaskStatusChanged {
        task_id: Uuid,
        from_status: String,
        to_status: String,
    },

    /// Task output is parked at a human review checkpoint
    #[serde(rename = "task.awaiting_review")]
    TaskAwaitingReview { task_id: Uuid, plugin_id: String },

    /// A task reached the terminal error state.
    #[serde(rename = "task.failed")]
    TaskFailed { task_id: Uuid, message: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_envelope_has_identity() {
        let envelope = EventEnvelope::new(Event::TaskCreated {
            task_id: Uuid::new_v4(),
            plugin_id: "code-modifier".to_string(),
        });
        assert_ne!(envelope.id, Uuid::nil());
    }

    #[test]
    fn test_event_serialization_tag() {
        let event = Event::TaskStatusChanged {
            task_id: Uuid::new_v4(),
            from_status: "pending".to_string(),
            to_status: "analyzing".to_string(),
        };
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("\"task.status_changed\""));
    }
}
