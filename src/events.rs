use crate::camera::CameraSessionState;
use serde::{Deserialize, Serialize};
use std::time::SystemTime;
use tokio::sync::broadcast;
use tracing::{debug, trace};

/// Events that can occur in the viewfinder pipeline
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ViewfinderEvent {
    /// Camera session moved between lifecycle states
    SessionStateChanged {
        from: CameraSessionState,
        to: CameraSessionState,
        timestamp: SystemTime,
    },
    /// A permission request round-trip completed
    PermissionResult {
        granted: bool,
        missing: Vec<String>,
        timestamp: SystemTime,
    },
    /// Preview and analysis sinks were bound to the camera provider
    StreamBound { timestamp: SystemTime },
    /// A system error occurred in a component
    SystemError { component: String, error: String },
}

impl ViewfinderEvent {
    /// Get the timestamp of the event
    pub fn timestamp(&self) -> SystemTime {
        match self {
            ViewfinderEvent::SessionStateChanged { timestamp, .. } => *timestamp,
            ViewfinderEvent::PermissionResult { timestamp, .. } => *timestamp,
            ViewfinderEvent::StreamBound { timestamp } => *timestamp,
            ViewfinderEvent::SystemError { .. } => SystemTime::now(),
        }
    }

    /// Get a human-readable description of the event
    pub fn description(&self) -> String {
        match self {
            ViewfinderEvent::SessionStateChanged { from, to, .. } => {
                format!("Session state {:?} -> {:?}", from, to)
            }
            ViewfinderEvent::PermissionResult {
                granted, missing, ..
            } => {
                if *granted {
                    "Permissions granted".to_string()
                } else {
                    format!("Permissions missing: {:?}", missing)
                }
            }
            ViewfinderEvent::StreamBound { .. } => "Camera stream bound".to_string(),
            ViewfinderEvent::SystemError { component, error } => {
                format!("Error in {}: {}", component, error)
            }
        }
    }

    /// Get the event type as a string for filtering
    pub fn event_type(&self) -> &'static str {
        match self {
            ViewfinderEvent::SessionStateChanged { .. } => "session_state_changed",
            ViewfinderEvent::PermissionResult { .. } => "permission_result",
            ViewfinderEvent::StreamBound { .. } => "stream_bound",
            ViewfinderEvent::SystemError { .. } => "system_error",
        }
    }
}

/// Broadcast event bus for component coordination
pub struct EventBus {
    sender: broadcast::Sender<ViewfinderEvent>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Subscribe to events and get a receiver
    pub fn subscribe(&self) -> broadcast::Receiver<ViewfinderEvent> {
        self.sender.subscribe()
    }

    /// Publish an event to all current subscribers. An event with no
    /// subscribers is dropped silently.
    pub fn publish(&self, event: ViewfinderEvent) {
        trace!("Publishing event: {}", event.description());
        if self.sender.send(event).is_err() {
            debug!("Event published with no active subscribers");
        }
    }

    /// Number of active subscribers
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}
