//! Per-screen configuration: resource paths and hooks.

use trowel_events::NavigationTarget;

use crate::navigation::go_to_record;
use crate::record::{Record, display_id, record_uuid};

/// Read and write paths of one record type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceBinding {
    /// Path records are read from (a view).
    pub view_table: String,
    /// Path records are written to; `None` for read-only screens.
    pub edit_table: Option<String>,
}

impl ResourceBinding {
    /// Binding with separate read and write paths.
    #[must_use]
    pub fn new(view_table: impl Into<String>, edit_table: impl Into<String>) -> Self {
        Self {
            view_table: view_table.into(),
            edit_table: Some(edit_table.into()),
        }
    }

    /// Binding that only reads.
    #[must_use]
    pub fn read_only(view_table: impl Into<String>) -> Self {
        Self {
            view_table: view_table.into(),
            edit_table: None,
        }
    }
}

/// Everything a session needs to know about its screen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScreenConfig {
    /// Screen name, used in logs and metrics.
    pub name: String,
    /// Resource paths.
    pub binding: ResourceBinding,
    /// Typed sub-route of the screen (for example `topo` under a context).
    pub route_type: Option<String>,
}

impl ScreenConfig {
    /// Screen with no sub-route.
    #[must_use]
    pub fn new(name: impl Into<String>, binding: ResourceBinding) -> Self {
        Self {
            name: name.into(),
            binding,
            route_type: None,
        }
    }

    /// Attach a typed sub-route.
    #[must_use]
    pub fn with_route_type(mut self, route_type: impl Into<String>) -> Self {
        self.route_type = Some(route_type.into());
        self
    }
}

/// Resource-specific rules the generic handlers defer to.
pub trait ScreenHooks: Send + Sync {
    /// Id used to address a freshly created row.
    fn created_record_id(&self, row: &Record) -> Option<String> {
        display_id(row).map(str::to_string)
    }

    /// Where to go after a row was created.
    ///
    /// Screens with a sub-route go to `<route_type>/<uuid>`; others follow
    /// [`go_to_record`] for the created id.
    fn navigation_for_created(&self, config: &ScreenConfig, row: &Record) -> Option<NavigationTarget> {
        match &config.route_type {
            Some(route_type) => record_uuid(row).map(|uuid| NavigationTarget::Nested {
                route_type: route_type.clone(),
                id: uuid.to_string(),
            }),
            None => self.created_record_id(row).map(|id| go_to_record(&id)),
        }
    }
}

/// Hooks with the default behaviour.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultHooks;

impl ScreenHooks for DefaultHooks {}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn row(value: serde_json::Value) -> Record {
        crate::record::first_record(value).unwrap_or_default()
    }

    #[test]
    fn created_rows_route_by_entry_id_then_uuid() {
        let config = ScreenConfig::new("find", ResourceBinding::new("list_finds", "edit_find"));
        let hooks = DefaultHooks;
        let find = row(json!({"uuid": "u1", "entry_id": "A-7"}));
        assert_eq!(
            hooks.navigation_for_created(&config, &find).map(|t| t.path()),
            Some("/Archaeological/A-7".to_string())
        );
        let bare = row(json!({"uuid": "u2"}));
        assert_eq!(
            hooks.navigation_for_created(&config, &bare).map(|t| t.path()),
            Some("./u2".to_string())
        );
        assert_eq!(hooks.navigation_for_created(&config, &Record::new()), None);
    }

    #[test]
    fn sub_routes_always_use_the_uuid() {
        let config = ScreenConfig::new("topo", ResourceBinding::new("v_topo", "edit_topo"))
            .with_route_type("topo");
        let created = row(json!({"uuid": "u3", "entry_id": "A-9"}));
        assert_eq!(
            DefaultHooks.navigation_for_created(&config, &created),
            Some(NavigationTarget::Nested {
                route_type: "topo".into(),
                id: "u3".into()
            })
        );
    }

    #[test]
    fn custom_hooks_override_the_created_id() {
        struct ByUuid;
        impl ScreenHooks for ByUuid {
            fn created_record_id(&self, row: &Record) -> Option<String> {
                record_uuid(row).map(str::to_string)
            }
        }
        let config = ScreenConfig::new("actor", ResourceBinding::new("list_actors", "edit_actor"));
        let created = row(json!({"uuid": "u4", "entry_id": "A-1"}));
        assert_eq!(
            ByUuid.navigation_for_created(&config, &created).map(|t| t.path()),
            Some("./u4".to_string())
        );
        assert!(ResourceBinding::read_only("v_place").edit_table.is_none());
    }
}
