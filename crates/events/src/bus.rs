//! In-process event bus backed by a `tokio::sync::broadcast` channel.
//!
//! [`EventBus`] is the publish/subscribe hub for [`ReviewEvent`]s. It is
//! shared via `Arc<EventBus>` across the application.

use chrono::{DateTime, Utc};
use medreview_core::types::DbId;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

// ---------------------------------------------------------------------------
// ReviewEvent
// ---------------------------------------------------------------------------

/// What happened to a case.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReviewEventKind {
    CaseAssigned,
    CaseUnassigned,
    CaseStarted,
    CaseCompleted,
    CaseReopened,
    IrrGenerated,
}

impl ReviewEventKind {
    /// Dot-separated event name.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::CaseAssigned => "case.assigned",
            Self::CaseUnassigned => "case.unassigned",
            Self::CaseStarted => "case.started",
            Self::CaseCompleted => "case.completed",
            Self::CaseReopened => "case.reopened",
            Self::IrrGenerated => "case.irr_generated",
        }
    }
}

/// A workflow event on one case.
///
/// Constructed via [`ReviewEvent::new`] and enriched with the builder
/// methods.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReviewEvent {
    pub kind: ReviewEventKind,
    pub case_id: DbId,
    pub record_id: Option<DbId>,

    /// User whose request caused the event.
    pub actor_user_id: Option<DbId>,

    /// User the case now sits with, when there is one.
    pub recipient_user_id: Option<DbId>,
    pub recipient_email: Option<String>,

    pub due_date: Option<DateTime<Utc>>,

    /// Free-form JSON payload carrying event-specific data.
    pub payload: serde_json::Value,

    pub timestamp: DateTime<Utc>,
}

impl ReviewEvent {
    pub fn new(kind: ReviewEventKind, case_id: DbId) -> Self {
        Self {
            kind,
            case_id,
            record_id: None,
            actor_user_id: None,
            recipient_user_id: None,
            recipient_email: None,
            due_date: None,
            payload: serde_json::Value::Object(Default::default()),
            timestamp: Utc::now(),
        }
    }

    pub fn with_record(mut self, record_id: DbId) -> Self {
        self.record_id = Some(record_id);
        self
    }

    pub fn with_actor(mut self, user_id: DbId) -> Self {
        self.actor_user_id = Some(user_id);
        self
    }

    /// Attach the user the case now sits with and where to reach them.
    pub fn with_recipient(mut self, user_id: DbId, email: impl Into<String>) -> Self {
        self.recipient_user_id = Some(user_id);
        self.recipient_email = Some(email.into());
        self
    }

    pub fn with_due_date(mut self, due_date: Option<DateTime<Utc>>) -> Self {
        self.due_date = due_date;
        self
    }

    pub fn with_payload(mut self, payload: serde_json::Value) -> Self {
        self.payload = payload;
        self
    }
}

// ---------------------------------------------------------------------------
// EventBus
// ---------------------------------------------------------------------------

/// Default buffer capacity for the broadcast channel.
const DEFAULT_CAPACITY: usize = 1024;

/// In-process fan-out event bus.
///
/// ```rust
/// use medreview_events::bus::{EventBus, ReviewEvent, ReviewEventKind};
///
/// let bus = EventBus::default();
/// let mut rx = bus.subscribe();
///
/// bus.publish(ReviewEvent::new(ReviewEventKind::CaseAssigned, 1));
/// ```
pub struct EventBus {
    sender: broadcast::Sender<ReviewEvent>,
}

impl EventBus {
    /// Create a bus with a specific channel capacity.
    ///
    /// When the buffer is full the oldest un-consumed messages are dropped
    /// and slow receivers observe `RecvError::Lagged`.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publish an event to all current subscribers.
    ///
    /// With no subscribers the event is dropped.
    pub fn publish(&self, event: ReviewEvent) {
        // A SendError only means there are zero receivers.
        let _ = self.sender.send(event);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ReviewEvent> {
        self.sender.subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
