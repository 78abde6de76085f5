//! Decides what a screen shows when it mounts or its route id changes.

use std::collections::BTreeMap;
use std::sync::Arc;

use futures_util::future::try_join_all;
use serde_json::Value;
use tracing::{debug, error};
use trowel_events::NavigationTarget;
use trowel_rest::{Filter, ResourcePath, RestRequest};

use crate::error::CrudResult;
use crate::gateway::RecordGateway;
use crate::record::{Record, all_records, first_record, record_uuid};
use crate::store::RecordStore;

/// Resource holding actor rows.
pub const ACTOR_PATH: &str = "edit_actor";

/// What [`DataLoader::load_current`] did.
#[derive(Debug, Clone, PartialEq)]
pub enum LoadOutcome {
    /// The record for the route id was fetched; `None` when no row matched.
    Loaded(Option<Record>),
    /// No route id, but a record was in memory; the route follows it.
    Navigated(NavigationTarget),
    /// Nothing to show; the record list was opened.
    ListOpened,
}

/// Loads records for a screen.
#[derive(Clone)]
pub struct DataLoader {
    gateway: Arc<dyn RecordGateway>,
    store: RecordStore,
}

impl DataLoader {
    /// Loader writing into `store`.
    #[must_use]
    pub fn new(gateway: Arc<dyn RecordGateway>, store: RecordStore) -> Self {
        Self { gateway, store }
    }

    /// Store this loader writes into.
    #[must_use]
    pub const fn store(&self) -> &RecordStore {
        &self.store
    }

    /// Resolve what to show for route id `id` on resource `path`.
    ///
    /// - With an id: fetch `path?uuid=eq.<id>` and make the first row current.
    ///   Extra rows are ignored; no row clears the current record.
    /// - Without an id but with a record in memory: navigate to its uuid.
    /// - Otherwise: open the record list.
    ///
    /// # Errors
    ///
    /// Returns the fetch failure; the store is left unchanged.
    pub async fn load_current(&self, id: Option<&str>, path: &str) -> CrudResult<LoadOutcome> {
        if let Some(id) = id.filter(|id| !id.is_empty()) {
            let request = RestRequest::get(ResourcePath::by_uuid(path, id));
            let rows = self.gateway.send(request).await.inspect_err(|err| {
                error!(path, id, error = %err, "could not load data for record");
            })?;
            if let Value::Array(items) = &rows {
                if items.len() > 1 {
                    debug!(path, id, rows = items.len(), "ignoring extra rows");
                }
            }
            let record = first_record(rows);
            self.store.replace(record.clone());
            return Ok(LoadOutcome::Loaded(record));
        }

        if let Some(uuid) = self.store.current_uuid() {
            let target = NavigationTarget::Record { id: uuid };
            self.store.navigate(target.clone());
            return Ok(LoadOutcome::Navigated(target));
        }

        self.store.open_list();
        Ok(LoadOutcome::ListOpened)
    }

    /// Fetch every row of `path`. No call is made when `path` is `None`.
    ///
    /// # Errors
    ///
    /// Returns the fetch failure.
    pub async fn load_all(&self, path: Option<&str>) -> CrudResult<Option<Vec<Record>>> {
        let Some(path) = path.filter(|path| !path.is_empty()) else {
            return Ok(None);
        };
        let rows = self
            .gateway
            .send(RestRequest::get(path))
            .await
            .inspect_err(|err| error!(path, error = %err, "could not load list"))?;
        Ok(Some(all_records(rows)))
    }

    /// Fetch several lookup lists concurrently, keyed by name.
    ///
    /// # Errors
    ///
    /// Fails as a whole when any single fetch fails.
    pub async fn load_reference_data(
        &self,
        sources: &[(&str, &str)],
    ) -> CrudResult<BTreeMap<String, Value>> {
        let fetches = sources.iter().map(|(name, path)| async move {
            let value = self.gateway.send(RestRequest::get(*path)).await?;
            Ok::<_, crate::error::CrudError>(((*name).to_string(), value))
        });
        let loaded = try_join_all(fetches).await.inspect_err(|err| {
            error!(error = %err, "an error occurred while fetching reference data");
        })?;
        Ok(loaded.into_iter().collect())
    }

    /// Look up the actor by e-mail and make the first match the active actor.
    ///
    /// # Errors
    ///
    /// Returns the fetch failure; the active actor is left unchanged.
    pub async fn resolve_active_actor(&self, email: &str) -> CrudResult<Option<Record>> {
        let path = ResourcePath::new(ACTOR_PATH).filter(Filter::ilike("email", email));
        let rows = self.gateway.send(RestRequest::get(path)).await?;
        let actor = first_record(rows);
        debug!(actor = ?actor.as_ref().and_then(record_uuid), "active actor resolved");
        self.store.set_active_actor(actor.clone());
        Ok(actor)
    }
}
