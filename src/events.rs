//! # events
//!
//! Defines [`DashboardEvent`]: everything the core reports outward: action
//! outcomes for the notification surface and per-resource sync telemetry.
//!
//! Events travel over a `tokio::sync::broadcast` channel as pre-serialized
//! JSON strings, so subscribers never need the concrete Rust types.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::broadcast;
use uuid::Uuid;

use crate::error::ActionKind;

/// Capacity of the broadcast channel. Slow subscribers skip older events.
const EVENT_BUFFER_SIZE: usize = 256;

// ─── Event ────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DashboardEvent {
    /// A mutating call succeeded; its form was cleared.
    ActionSucceeded {
        action: ActionKind,
    },

    /// A mutating call failed; its form keeps the user's input.
    ActionFailed {
        action:  ActionKind,
        message: String,
    },

    /// One resource of a view failed to refresh. Its previous slice stays.
    ResourceFailed {
        view:     &'static str,
        resource: &'static str,
        message:  String,
    },

    /// One resource of a view applied a fresh slice.
    SnapshotUpdated {
        view:       &'static str,
        resource:   &'static str,
        generation: u64,
    },
}

impl DashboardEvent {
    pub fn name(&self) -> &'static str {
        match self {
            DashboardEvent::ActionSucceeded { .. } => "ACTION_SUCCEEDED",
            DashboardEvent::ActionFailed { .. }    => "ACTION_FAILED",
            DashboardEvent::ResourceFailed { .. }  => "RESOURCE_FAILED",
            DashboardEvent::SnapshotUpdated { .. } => "SNAPSHOT_UPDATED",
        }
    }
}

/// An event with identity and time, as delivered to subscribers.
#[derive(Debug, Clone, Serialize)]
pub struct Envelope {
    pub id: Uuid,
    pub at: DateTime<Utc>,
    #[serde(flatten)]
    pub event: DashboardEvent,
}

impl Envelope {
    pub fn new(event: DashboardEvent) -> Self {
        Self { id: Uuid::new_v4(), at: Utc::now(), event }
    }

    #[inline]
    pub fn to_json(&self) -> String {
        serde_json::to_string(self)
            .unwrap_or_else(|_| r#"{"event":"SERIALIZATION_ERROR"}"#.to_string())
    }
}

// ─── Bus ──────────────────────────────────────────────────────────────────────

/// Cheaply clonable handle onto the event channel.
#[derive(Debug, Clone)]
pub struct EventBus {
    tx: broadcast::Sender<String>,
}

impl EventBus {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(EVENT_BUFFER_SIZE);
        Self { tx }
    }

    /// Publish to every subscriber. Having none is not an error.
    pub fn publish(&self, event: DashboardEvent) {
        let _ = self.tx.send(Envelope::new(event).to_json());
    }

    pub fn subscribe(&self) -> broadcast::Receiver<String> {
        self.tx.subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self { Self::new() }
}
