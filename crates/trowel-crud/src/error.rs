//! Error type for the CRUD engine.

use thiserror::Error;
use trowel_events::ActionKind;
use trowel_rest::RestError;

/// Failure of one action or load.
#[derive(Debug, Error)]
pub enum CrudError {
    /// The action needs a current record with a `uuid`.
    #[error("{action} requires a current record with a uuid")]
    MissingUuid {
        /// Action that was requested.
        action: ActionKind,
    },
    /// The screen has no write path.
    #[error("{action} requires an edit path for screen '{screen}'")]
    ReadOnly {
        /// Action that was requested.
        action: ActionKind,
        /// Screen name.
        screen: String,
    },
    /// The backend answered without the expected row.
    #[error("{action} returned no rows")]
    EmptyResponse {
        /// Action that was requested.
        action: ActionKind,
    },
    /// The backend call failed.
    #[error(transparent)]
    Rest(#[from] RestError),
    /// A record could not be converted to or from a typed view.
    #[error("record does not match the expected shape")]
    Shape {
        /// Underlying serde error.
        #[source]
        source: serde_json::Error,
    },
    /// The screen's action queue has no room for another run.
    #[error("action queue of screen '{screen}' is full; {action} was not queued")]
    QueueFull {
        /// Action that was requested.
        action: ActionKind,
        /// Screen name.
        screen: String,
    },
    /// The dispatcher task of the screen has stopped.
    #[error("screen session '{screen}' is closed")]
    SessionClosed {
        /// Screen name.
        screen: String,
    },
}

/// Result alias for CRUD operations.
pub type CrudResult<T> = Result<T, CrudError>;

impl CrudError {
    /// Primary error text.
    #[must_use]
    pub fn message(&self) -> String {
        match self {
            Self::Rest(err) => err.message(),
            _ => self.to_string(),
        }
    }

    /// The backend's own message, when the server answered with one.
    #[must_use]
    pub fn response_message(&self) -> Option<&str> {
        match self {
            Self::Rest(err) => err.response_message(),
            _ => None,
        }
    }

    /// Notification text: `"<prefix>: \n\n<message>"`, followed by
    /// `" \n <response message>"` when the backend sent one.
    #[must_use]
    pub fn notification_text(&self, prefix: &str) -> String {
        let mut text = format!("{prefix}: \n\n{}", self.message());
        if let Some(detail) = self.response_message() {
            text.push_str(" \n ");
            text.push_str(detail);
        }
        text
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn precondition_errors_name_the_action() {
        let err = CrudError::MissingUuid {
            action: ActionKind::Save,
        };
        assert_eq!(err.message(), "save requires a current record with a uuid");
        assert_eq!(err.response_message(), None);
        assert_eq!(
            err.notification_text("Save failed"),
            "Save failed: \n\nsave requires a current record with a uuid"
        );
    }

    #[test]
    fn full_queues_are_not_reported_as_closed() {
        let err = CrudError::QueueFull {
            action: ActionKind::Delete,
            screen: "find".into(),
        };
        assert_eq!(
            err.message(),
            "action queue of screen 'find' is full; delete was not queued"
        );
    }

    #[test]
    fn rest_errors_keep_their_message() {
        let err = CrudError::from(RestError::InvalidMethod {
            method: "X Y".into(),
        });
        assert_eq!(err.message(), "invalid HTTP method 'X Y'");
    }
}
