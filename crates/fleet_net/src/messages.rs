//! Message types exchanged between the dispatch server, vehicles and riders.
//!
//! Every payload on either channel is one [`Envelope`]. The envelope carries
//! the schema version, checked before anything else, and a [`Message`] whose
//! variant name is the discriminator.

use fleet_model::{RideCompletionReport, RideRequest, TaskAssignment, VehicleState};
use serde::{Deserialize, Serialize};

/// Current wire schema version.
pub const PROTOCOL_VERSION: u16 = 1;

/// Versioned wrapper around every message on the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    pub version: u16,
    pub message: Message,
}

impl Envelope {
    /// Wrap a message in an envelope stamped with [`PROTOCOL_VERSION`].
    #[must_use]
    pub fn new(message: Message) -> Self {
        Self {
            version: PROTOCOL_VERSION,
            message,
        }
    }
}

/// The closed set of message kinds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Message {
    /// Rider → server. Ask for a ride.
    RideRequest(RideRequest),
    /// Server → rider. Human-readable progress or denial.
    Notification(Notification),
    /// Server → vehicle. Go pick this rider up.
    TaskAssignment(TaskAssignment),
    /// Vehicle → server. Position and status after a step.
    VehicleReport(VehicleState),
    /// Vehicle → server. The rider has been dropped off.
    RideCompleted(RideCompletionReport),
    /// Free text from either side; logged and acknowledged, never acted on.
    Diagnostic(String),
}

impl Message {
    /// Short name of the variant, for logs.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::RideRequest(_) => "ride_request",
            Self::Notification(_) => "notification",
            Self::TaskAssignment(_) => "task_assignment",
            Self::VehicleReport(_) => "vehicle_report",
            Self::RideCompleted(_) => "ride_completed",
            Self::Diagnostic(_) => "diagnostic",
        }
    }
}

// ── Notifications ───────────────────────────────────────────────────────────

/// What a notification is about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NoticeKind {
    /// A vehicle was assigned; carries the initial ETA.
    Acknowledged,
    /// Throttled progress while the vehicle drives to the pickup.
    Approaching,
    /// The vehicle is at the pickup point.
    ArrivedAtPickup,
    /// The ride finished; carries the fare.
    Completed,
    /// The request was refused.
    Denied,
    /// The assignment could not be delivered to the vehicle.
    Failed,
    /// The vehicle dropped out mid-ride.
    Canceled,
    /// Reply to a diagnostic message.
    Receipt,
}

impl NoticeKind {
    /// Returns `true` if no further notices follow for this request.
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            Self::Completed | Self::Denied | Self::Failed | Self::Canceled
        )
    }
}

/// Text shown to a rider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    pub kind: NoticeKind,
    pub text: String,
}

impl Notification {
    #[must_use]
    pub fn new(kind: NoticeKind, text: impl Into<String>) -> Self {
        Self {
            kind,
            text: text.into(),
        }
    }
}

impl From<Notification> for Message {
    fn from(notice: Notification) -> Self {
        Message::Notification(notice)
    }
}
