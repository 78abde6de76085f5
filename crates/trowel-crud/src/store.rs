//! Observable state of one screen.
//!
//! Every mutation publishes an [`Event`] on the screen's bus while the state
//! lock is held, so the event order matches the order of state changes.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use trowel_events::{Event, EventBus, EventStream, EventId, NavigationTarget, Notification};

use crate::record::{Record, record_uuid};

#[derive(Debug, Default)]
struct StoreState {
    current: Option<Record>,
    list_open: bool,
    active_actor: Option<Record>,
    last_notification: Option<Notification>,
    last_navigation: Option<NavigationTarget>,
}

/// Shared, cloneable handle to a screen's state.
#[derive(Clone)]
pub struct RecordStore {
    state: Arc<Mutex<StoreState>>,
    events: EventBus,
}

impl RecordStore {
    /// Empty store with its own event bus.
    #[must_use]
    pub fn new() -> Self {
        Self::with_bus(EventBus::new())
    }

    /// Empty store publishing on `events`.
    #[must_use]
    pub fn with_bus(events: EventBus) -> Self {
        Self {
            state: Arc::new(Mutex::new(StoreState::default())),
            events,
        }
    }

    /// The bus state changes are published on.
    #[must_use]
    pub const fn events(&self) -> &EventBus {
        &self.events
    }

    /// Subscribe to state changes, replaying buffered events after `since`.
    #[must_use]
    pub fn subscribe(&self, since: Option<EventId>) -> EventStream {
        self.events.subscribe(since)
    }

    fn lock(&self) -> MutexGuard<'_, StoreState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Copy of the current record.
    #[must_use]
    pub fn current(&self) -> Option<Record> {
        self.lock().current.clone()
    }

    /// `uuid` of the current record.
    #[must_use]
    pub fn current_uuid(&self) -> Option<String> {
        self.lock()
            .current
            .as_ref()
            .and_then(record_uuid)
            .map(str::to_string)
    }

    /// Replace (or clear) the current record.
    pub fn replace(&self, record: Option<Record>) {
        let mut state = self.lock();
        state.current.clone_from(&record);
        self.events.publish(Event::RecordReplaced { record });
        drop(state);
    }

    /// Edit the current record in place. Does nothing when there is none.
    ///
    /// Returns whether an edit was applied.
    pub fn update<F>(&self, edit: F) -> bool
    where
        F: FnOnce(&mut Record),
    {
        let mut state = self.lock();
        let Some(current) = state.current.as_mut() else {
            return false;
        };
        edit(current);
        let record = Some(current.clone());
        self.events.publish(Event::RecordReplaced { record });
        drop(state);
        true
    }

    /// Whether the host was asked to show the record list.
    #[must_use]
    pub fn list_open(&self) -> bool {
        self.lock().list_open
    }

    /// Ask the host to show the record list.
    pub fn open_list(&self) {
        let mut state = self.lock();
        state.list_open = true;
        self.events.publish(Event::ListOpened);
        drop(state);
    }

    /// Mark the record list as closed again.
    pub fn close_list(&self) {
        self.lock().list_open = false;
    }

    /// The acting user's record.
    #[must_use]
    pub fn active_actor(&self) -> Option<Record> {
        self.lock().active_actor.clone()
    }

    /// `uuid` of the acting user.
    #[must_use]
    pub fn active_actor_id(&self) -> Option<String> {
        self.lock()
            .active_actor
            .as_ref()
            .and_then(record_uuid)
            .map(str::to_string)
    }

    /// Set (or clear) the acting user.
    pub fn set_active_actor(&self, actor: Option<Record>) {
        let mut state = self.lock();
        let actor_id = actor.as_ref().and_then(record_uuid).map(str::to_string);
        state.active_actor = actor;
        self.events.publish(Event::ActiveActorChanged { actor_id });
        drop(state);
    }

    /// Surface a notification.
    pub fn notify(&self, notification: Notification) {
        let mut state = self.lock();
        state.last_notification = Some(notification.clone());
        self.events.publish(Event::Notified { notification });
        drop(state);
    }

    /// Most recent notification.
    #[must_use]
    pub fn last_notification(&self) -> Option<Notification> {
        self.lock().last_notification.clone()
    }

    /// Ask the host to navigate.
    pub fn navigate(&self, target: NavigationTarget) {
        let mut state = self.lock();
        state.last_navigation = Some(target.clone());
        self.events.publish(Event::Navigated { target });
        drop(state);
    }

    /// Most recent navigation request.
    #[must_use]
    pub fn last_navigation(&self) -> Option<NavigationTarget> {
        self.lock().last_navigation.clone()
    }
}

impl Default for RecordStore {
    fn default() -> Self {
        Self::new()
    }
}
