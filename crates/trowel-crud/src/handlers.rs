//! The four record actions.
//!
//! Handlers never fail outward: every error becomes an error notification
//! and is reported in the returned [`ActionOutcome`].

use std::sync::Arc;

use chrono::Utc;
use tracing::{error, info};
use trowel_events::{ActionKind, NavigationTarget, Notification};
use trowel_rest::{Prefer, ResourcePath, RestRequest};

use crate::binding::{ScreenConfig, ScreenHooks};
use crate::error::{CrudError, CrudResult};
use crate::gateway::RecordGateway;
use crate::record::{AuditFields, Record, display_id, first_record, record_uuid};
use crate::store::RecordStore;

/// Result of one executed action.
#[derive(Debug, Clone, PartialEq)]
pub struct ActionOutcome {
    /// Action that ran.
    pub action: ActionKind,
    /// Notification surfaced for it.
    pub notification: Notification,
    /// Navigation requested by it, if any.
    pub navigation: Option<NavigationTarget>,
    /// Row returned by the backend, if any.
    pub record: Option<Record>,
    /// Error text when the action failed.
    pub error: Option<String>,
}

impl ActionOutcome {
    /// Whether the action succeeded.
    #[must_use]
    pub const fn succeeded(&self) -> bool {
        self.error.is_none()
    }
}

struct Completed {
    notification: Notification,
    navigation: Option<NavigationTarget>,
    record: Option<Record>,
}

const fn failure_prefix(action: ActionKind) -> &'static str {
    match action {
        ActionKind::New => "Record creation failed",
        ActionKind::Save => "Save failed",
        ActionKind::Revert => "Revert failed",
        ActionKind::Delete => "Delete failed",
    }
}

/// Runs actions for one screen against its gateway and store.
#[derive(Clone)]
pub struct ActionRunner {
    config: Arc<ScreenConfig>,
    gateway: Arc<dyn RecordGateway>,
    store: RecordStore,
    hooks: Arc<dyn ScreenHooks>,
}

impl ActionRunner {
    /// Runner for `config`.
    #[must_use]
    pub fn new(
        config: Arc<ScreenConfig>,
        gateway: Arc<dyn RecordGateway>,
        store: RecordStore,
        hooks: Arc<dyn ScreenHooks>,
    ) -> Self {
        Self {
            config,
            gateway,
            store,
            hooks,
        }
    }

    /// Screen configuration.
    #[must_use]
    pub fn config(&self) -> &ScreenConfig {
        &self.config
    }

    /// Execute `action` once and publish its navigation and notification.
    pub async fn run(&self, action: ActionKind) -> ActionOutcome {
        info!(action = %action, screen = %self.config.name, "running action");
        let result = match action {
            ActionKind::New => self.create().await,
            ActionKind::Save => self.save().await,
            ActionKind::Revert => self.revert().await,
            ActionKind::Delete => self.delete().await,
        };

        match result {
            Ok(done) => {
                if let Some(target) = &done.navigation {
                    self.store.navigate(target.clone());
                }
                self.store.notify(done.notification.clone());
                ActionOutcome {
                    action,
                    notification: done.notification,
                    navigation: done.navigation,
                    record: done.record,
                    error: None,
                }
            }
            Err(err) => {
                error!(action = %action, screen = %self.config.name, error = %err, "action failed");
                let notification =
                    Notification::error(action, err.notification_text(failure_prefix(action)));
                self.store.notify(notification.clone());
                ActionOutcome {
                    action,
                    notification,
                    navigation: None,
                    record: None,
                    error: Some(err.message()),
                }
            }
        }
    }

    fn edit_table(&self, action: ActionKind) -> CrudResult<&str> {
        self.config
            .binding
            .edit_table
            .as_deref()
            .ok_or_else(|| CrudError::ReadOnly {
                action,
                screen: self.config.name.clone(),
            })
    }

    fn current_with_uuid(&self, action: ActionKind) -> CrudResult<(Record, String)> {
        let record = self.store.current().unwrap_or_default();
        let uuid = record_uuid(&record)
            .map(str::to_string)
            .ok_or(CrudError::MissingUuid { action })?;
        Ok((record, uuid))
    }

    async fn create(&self) -> CrudResult<Completed> {
        let edit_table = self.edit_table(ActionKind::New)?;
        let request = RestRequest::post(edit_table).prefer(Prefer::ReturnRepresentation);
        let row = first_record(self.gateway.send(request).await?).ok_or(CrudError::EmptyResponse {
            action: ActionKind::New,
        })?;
        let navigation = self.hooks.navigation_for_created(&self.config, &row);
        Ok(Completed {
            notification: Notification::success(ActionKind::New, "Record created."),
            navigation,
            record: Some(row),
        })
    }

    async fn save(&self) -> CrudResult<Completed> {
        let edit_table = self.edit_table(ActionKind::Save)?;
        let (record, uuid) = self.current_with_uuid(ActionKind::Save)?;
        let actor = self.store.active_actor_id();
        let previous = AuditFields::of(&record).updated_at;
        let body = AuditFields::stamp(Utc::now(), previous.as_deref(), actor.as_deref())
            .apply_to(&record);
        let request = RestRequest::patch(ResourcePath::by_uuid(edit_table, &uuid))
            .body(body)
            .prefer(Prefer::ReturnRepresentation);
        let updated = first_record(self.gateway.send(request).await?);
        Ok(Completed {
            notification: Notification::success(ActionKind::Save, "Data saved."),
            navigation: None,
            record: updated,
        })
    }

    async fn revert(&self) -> CrudResult<Completed> {
        let (_, uuid) = self.current_with_uuid(ActionKind::Revert)?;
        let request = RestRequest::get(ResourcePath::by_uuid(&self.config.binding.view_table, &uuid));
        let stored = first_record(self.gateway.send(request).await?);
        self.store.replace(stored.clone());
        Ok(Completed {
            notification: Notification::info(ActionKind::Revert, "Data reverted."),
            navigation: None,
            record: stored,
        })
    }

    async fn delete(&self) -> CrudResult<Completed> {
        let edit_table = self.edit_table(ActionKind::Delete)?;
        let (record, uuid) = self.current_with_uuid(ActionKind::Delete)?;
        let request = RestRequest::delete(ResourcePath::by_uuid(edit_table, &uuid))
            .prefer(Prefer::ReturnRepresentation);
        let deleted = first_record(self.gateway.send(request).await?);
        let shown = deleted
            .as_ref()
            .and_then(display_id)
            .or_else(|| display_id(&record))
            .unwrap_or(&uuid)
            .to_string();
        self.store.replace(None);
        Ok(Completed {
            notification: Notification::success(ActionKind::Delete, format!("Row {shown} deleted.")),
            navigation: Some(NavigationTarget::ListRoot),
            record: deleted,
        })
    }
}
