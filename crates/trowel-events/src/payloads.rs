//! Event payload types carried between a screen session and its observers.

use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Identifier assigned to each event emitted by a bus.
pub type EventId = u64;

/// Default buffer size for the in-memory replay ring.
pub const DEFAULT_REPLAY_CAPACITY: usize = 256;

/// Record actions a screen can request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    /// Create a fresh server-side row and move to it.
    New,
    /// Write the current record back.
    Save,
    /// Replace the current record with the stored row.
    Revert,
    /// Remove the current record.
    Delete,
}

impl ActionKind {
    /// Every action, in declaration order.
    pub const ALL: [Self; 4] = [Self::New, Self::Save, Self::Revert, Self::Delete];

    /// Wire name of the action.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::New => "new",
            Self::Save => "save",
            Self::Revert => "revert",
            Self::Delete => "delete",
        }
    }
}

impl Display for ActionKind {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.as_str())
    }
}

/// Returned when parsing an unknown action name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownAction(pub String);

impl Display for UnknownAction {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        write!(formatter, "unknown action '{}'", self.0)
    }
}

impl std::error::Error for UnknownAction {}

impl FromStr for ActionKind {
    type Err = UnknownAction;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|action| action.as_str().eq_ignore_ascii_case(value.trim()))
            .ok_or_else(|| UnknownAction(value.to_string()))
    }
}

/// Severity of a user-facing notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageType {
    /// The action succeeded.
    Success,
    /// Informational outcome.
    Info,
    /// The action failed.
    Error,
}

/// Transient message surfaced once after an action completes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    /// Action that produced the message.
    pub action_type: ActionKind,
    /// Severity of the message.
    pub message_type: MessageType,
    /// Text shown to the user.
    pub message_text: String,
}

impl Notification {
    /// Success notification for the given action.
    #[must_use]
    pub fn success(action_type: ActionKind, message_text: impl Into<String>) -> Self {
        Self {
            action_type,
            message_type: MessageType::Success,
            message_text: message_text.into(),
        }
    }

    /// Informational notification for the given action.
    #[must_use]
    pub fn info(action_type: ActionKind, message_text: impl Into<String>) -> Self {
        Self {
            action_type,
            message_type: MessageType::Info,
            message_text: message_text.into(),
        }
    }

    /// Error notification for the given action.
    #[must_use]
    pub fn error(action_type: ActionKind, message_text: impl Into<String>) -> Self {
        Self {
            action_type,
            message_type: MessageType::Error,
            message_text: message_text.into(),
        }
    }

    /// Whether the notification reports a failure.
    #[must_use]
    pub fn is_error(&self) -> bool {
        self.message_type == MessageType::Error
    }
}

/// Where the host should move after an action or load.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum NavigationTarget {
    /// A record relative to the current list (`./<id>`).
    Record {
        /// Record identifier (uuid or entry id).
        id: String,
    },
    /// A record under a named top-level section (`/<section>/<id>`).
    Section {
        /// Section route name.
        section: String,
        /// Entry identifier.
        id: String,
    },
    /// A record under a typed sub-route (`<route_type>/<id>`).
    Nested {
        /// Sub-route of the hosting screen.
        route_type: String,
        /// Record identifier.
        id: String,
    },
    /// The list root of the current screen (`./`).
    ListRoot,
}

impl NavigationTarget {
    /// Route path for the target.
    #[must_use]
    pub fn path(&self) -> String {
        match self {
            Self::Record { id } => format!("./{id}"),
            Self::Section { section, id } => format!("/{section}/{id}"),
            Self::Nested { route_type, id } => format!("{route_type}/{id}"),
            Self::ListRoot => "./".to_string(),
        }
    }
}

/// Typed store events surfaced to observers of a screen.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    /// The current record was replaced (or cleared when `None`).
    RecordReplaced {
        /// New current record.
        record: Option<Map<String, Value>>,
    },
    /// The host should open the record list so the user can pick one.
    ListOpened,
    /// The acting user changed.
    ActiveActorChanged {
        /// Identifier of the actor, `None` when signed out.
        actor_id: Option<String>,
    },
    /// An action left the queue and started executing.
    ActionStarted {
        /// Action being executed.
        action: ActionKind,
    },
    /// An action finished executing.
    ActionFinished {
        /// Action that finished.
        action: ActionKind,
        /// Whether it succeeded.
        succeeded: bool,
    },
    /// A notification should be shown.
    Notified {
        /// Notification payload.
        notification: Notification,
    },
    /// The host should navigate.
    Navigated {
        /// Navigation target.
        target: NavigationTarget,
    },
}

impl Event {
    /// Machine-friendly discriminator for log fields and filters.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::RecordReplaced { .. } => "record_replaced",
            Self::ListOpened => "list_opened",
            Self::ActiveActorChanged { .. } => "active_actor_changed",
            Self::ActionStarted { .. } => "action_started",
            Self::ActionFinished { .. } => "action_finished",
            Self::Notified { .. } => "notified",
            Self::Navigated { .. } => "navigated",
        }
    }
}

/// Metadata wrapper around events. Each envelope tracks the event id and
/// emission timestamp.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EventEnvelope {
    /// Sequential identifier, starting at 1.
    pub id: EventId,
    /// Emission time.
    pub timestamp: DateTime<Utc>,
    /// Event payload.
    pub event: Event,
}
