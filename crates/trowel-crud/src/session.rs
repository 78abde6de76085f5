//! Per-screen action queue and its dispatcher task.
//!
//! # Design
//! - Requests travel over a bounded channel to a single dispatcher task, so
//!   actions of one screen never run concurrently and run in request order.
//! - A request for an action that is already queued (but not started) is
//!   folded into the queued one; its waiter receives the same outcome.
//! - The pending entry is removed right before the handler starts, so a
//!   request made while the action executes queues a fresh run.
//! - Once shutdown starts, new requests are rejected. Waiters still pending
//!   when the dispatcher stops are dropped and see `SessionClosed`.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, warn};
use trowel_events::{ActionKind, Event};
use trowel_telemetry::{Metrics, with_screen_context};

use crate::binding::{DefaultHooks, ScreenConfig, ScreenHooks};
use crate::command::ScreenCommand;
use crate::error::{CrudError, CrudResult};
use crate::gateway::RecordGateway;
use crate::handlers::{ActionOutcome, ActionRunner};
use crate::loader::DataLoader;
use crate::store::RecordStore;

// One queued run per action plus the shutdown message.
const COMMAND_BUFFER: usize = ActionKind::ALL.len() + 1;

type Waiters = Vec<oneshot::Sender<ActionOutcome>>;

/// What happened to a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestStatus {
    /// A new run was queued.
    Queued,
    /// The action was already queued; the request joined it.
    Coalesced,
}

struct Shared {
    screen: String,
    pending: Mutex<Vec<(ActionKind, Waiters)>>,
    commands: mpsc::Sender<ScreenCommand>,
    // Written under the `pending` lock so no run is queued behind `Shutdown`.
    closing: AtomicBool,
    metrics: Option<Metrics>,
}

impl Shared {
    fn lock_pending(&self) -> MutexGuard<'_, Vec<(ActionKind, Waiters)>> {
        self.pending.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn closed(&self) -> CrudError {
        CrudError::SessionClosed {
            screen: self.screen.clone(),
        }
    }

    fn record_pending(&self, count: usize) {
        if let Some(metrics) = &self.metrics {
            metrics.set_pending_actions(count);
        }
    }

    fn begin_close(&self) {
        let _pending = self.lock_pending();
        self.closing.store(true, Ordering::Relaxed);
    }

    fn drain_pending(&self) -> usize {
        let mut pending = self.lock_pending();
        self.closing.store(true, Ordering::Relaxed);
        let dropped = pending.len();
        pending.clear();
        self.record_pending(0);
        dropped
    }

    fn take_pending(&self, action: ActionKind) -> Waiters {
        let mut pending = self.lock_pending();
        let waiters = pending
            .iter()
            .position(|(queued, _)| *queued == action)
            .map(|index| pending.remove(index).1)
            .unwrap_or_default();
        self.record_pending(pending.len());
        drop(pending);
        waiters
    }
}

/// Cloneable handle used by the host to request actions.
#[derive(Clone)]
pub struct ScreenHandle {
    shared: Arc<Shared>,
}

impl ScreenHandle {
    /// Screen this handle belongs to.
    #[must_use]
    pub fn screen(&self) -> &str {
        &self.shared.screen
    }

    /// Request `action` without waiting for it.
    ///
    /// # Errors
    ///
    /// Returns [`CrudError::SessionClosed`] once the dispatcher has stopped.
    pub fn request(&self, action: ActionKind) -> CrudResult<RequestStatus> {
        self.enqueue(action, None)
    }

    /// Request `action` and wait for its outcome.
    ///
    /// # Errors
    ///
    /// Returns [`CrudError::SessionClosed`] when the dispatcher stops before
    /// the action ran. Action failures are reported inside the outcome.
    pub async fn request_and_wait(&self, action: ActionKind) -> CrudResult<ActionOutcome> {
        let (respond_to, outcome) = oneshot::channel();
        self.enqueue(action, Some(respond_to))?;
        outcome.await.map_err(|_| self.shared.closed())
    }

    /// Actions queued and not yet started, in queue order.
    #[must_use]
    pub fn pending_actions(&self) -> Vec<ActionKind> {
        self.shared
            .lock_pending()
            .iter()
            .map(|(action, _)| *action)
            .collect()
    }

    /// Whether `action` is queued and not yet started.
    #[must_use]
    pub fn is_pending(&self, action: ActionKind) -> bool {
        self.shared
            .lock_pending()
            .iter()
            .any(|(queued, _)| *queued == action)
    }

    fn enqueue(
        &self,
        action: ActionKind,
        respond_to: Option<oneshot::Sender<ActionOutcome>>,
    ) -> CrudResult<RequestStatus> {
        let mut pending = self.shared.lock_pending();
        if self.shared.closing.load(Ordering::Relaxed) {
            return Err(self.shared.closed());
        }
        if let Some((_, waiters)) = pending.iter_mut().find(|(queued, _)| *queued == action) {
            waiters.extend(respond_to);
            if let Some(metrics) = &self.shared.metrics {
                metrics.inc_coalesced();
            }
            debug!(action = %action, screen = %self.shared.screen, "request joined pending action");
            return Ok(RequestStatus::Coalesced);
        }

        match self.shared.commands.try_send(ScreenCommand::Run(action)) {
            Ok(()) => {}
            Err(TrySendError::Closed(_)) => return Err(self.shared.closed()),
            Err(TrySendError::Full(_)) => {
                warn!(action = %action, screen = %self.shared.screen, "action queue full");
                return Err(CrudError::QueueFull {
                    action,
                    screen: self.shared.screen.clone(),
                });
            }
        }
        pending.push((action, respond_to.into_iter().collect()));
        self.shared.record_pending(pending.len());
        drop(pending);
        debug!(action = %action, screen = %self.shared.screen, "action queued");
        Ok(RequestStatus::Queued)
    }
}

struct Dispatcher {
    shared: Arc<Shared>,
    runner: ActionRunner,
    store: RecordStore,
}

impl Dispatcher {
    async fn run(self, mut commands: mpsc::Receiver<ScreenCommand>) {
        while let Some(command) = commands.recv().await {
            match command {
                ScreenCommand::Run(action) => self.dispatch(action).await,
                ScreenCommand::Shutdown => break,
            }
        }
        let dropped = self.shared.drain_pending();
        if dropped > 0 {
            warn!(screen = %self.shared.screen, dropped, "dispatcher stopped with actions pending");
        } else {
            debug!(screen = %self.shared.screen, "dispatcher stopped");
        }
    }

    async fn dispatch(&self, action: ActionKind) {
        let waiters = self.shared.take_pending(action);
        self.store.events().publish(Event::ActionStarted { action });
        let outcome = self.runner.run(action).await;
        let succeeded = outcome.succeeded();
        if let Some(metrics) = &self.shared.metrics {
            metrics.inc_action(action.as_str(), if succeeded { "success" } else { "error" });
        }
        self.store
            .events()
            .publish(Event::ActionFinished { action, succeeded });
        for waiter in waiters {
            let _ = waiter.send(outcome.clone());
        }
    }
}

/// Builder for a [`ScreenSession`].
pub struct SessionBuilder {
    config: ScreenConfig,
    gateway: Arc<dyn RecordGateway>,
    store: Option<RecordStore>,
    hooks: Arc<dyn ScreenHooks>,
    metrics: Option<Metrics>,
}

impl SessionBuilder {
    /// Use an existing store (for example one shared with a loader).
    #[must_use]
    pub fn store(mut self, store: RecordStore) -> Self {
        self.store = Some(store);
        self
    }

    /// Replace the default hooks.
    #[must_use]
    pub fn hooks(mut self, hooks: Arc<dyn ScreenHooks>) -> Self {
        self.hooks = hooks;
        self
    }

    /// Count actions in `metrics`.
    #[must_use]
    pub fn metrics(mut self, metrics: Metrics) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Spawn the dispatcher task. Must be called inside a tokio runtime.
    #[must_use]
    pub fn spawn(self) -> ScreenSession {
        let store = self.store.unwrap_or_default();
        let config = Arc::new(self.config);
        let (commands, receiver) = mpsc::channel(COMMAND_BUFFER);
        let shared = Arc::new(Shared {
            screen: config.name.clone(),
            pending: Mutex::new(Vec::new()),
            commands,
            closing: AtomicBool::new(false),
            metrics: self.metrics,
        });
        let runner = ActionRunner::new(
            Arc::clone(&config),
            Arc::clone(&self.gateway),
            store.clone(),
            self.hooks,
        );
        let dispatcher = Dispatcher {
            shared: Arc::clone(&shared),
            runner,
            store: store.clone(),
        };
        let task = tokio::spawn(with_screen_context(
            config.name.clone(),
            dispatcher.run(receiver),
        ));
        ScreenSession {
            handle: ScreenHandle { shared },
            store,
            gateway: self.gateway,
            config,
            task,
        }
    }
}

/// One record screen: its store, its queue, and its dispatcher task.
pub struct ScreenSession {
    handle: ScreenHandle,
    store: RecordStore,
    gateway: Arc<dyn RecordGateway>,
    config: Arc<ScreenConfig>,
    task: JoinHandle<()>,
}

impl ScreenSession {
    /// Start configuring a session.
    #[must_use]
    pub fn builder(config: ScreenConfig, gateway: Arc<dyn RecordGateway>) -> SessionBuilder {
        SessionBuilder {
            config,
            gateway,
            store: None,
            hooks: Arc::new(DefaultHooks),
            metrics: None,
        }
    }

    /// Spawn a session with default hooks and a fresh store.
    #[must_use]
    pub fn spawn(config: ScreenConfig, gateway: Arc<dyn RecordGateway>) -> Self {
        Self::builder(config, gateway).spawn()
    }

    /// Handle for requesting actions.
    #[must_use]
    pub fn handle(&self) -> ScreenHandle {
        self.handle.clone()
    }

    /// The screen's store.
    #[must_use]
    pub const fn store(&self) -> &RecordStore {
        &self.store
    }

    /// Screen configuration.
    #[must_use]
    pub fn config(&self) -> &ScreenConfig {
        &self.config
    }

    /// Loader sharing this session's gateway and store.
    #[must_use]
    pub fn loader(&self) -> DataLoader {
        DataLoader::new(Arc::clone(&self.gateway), self.store.clone())
    }

    /// Stop the dispatcher after the actions already queued have run.
    /// Requests made from other handles after this call are rejected.
    ///
    /// # Errors
    ///
    /// Returns [`CrudError::SessionClosed`] when the task had already stopped
    /// or panicked.
    pub async fn shutdown(self) -> CrudResult<()> {
        let closed = self.handle.shared.closed();
        self.handle.shared.begin_close();
        self.handle
            .shared
            .commands
            .send(ScreenCommand::Shutdown)
            .await
            .map_err(|_| self.handle.shared.closed())?;
        self.task.await.map_err(|_| closed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::binding::ResourceBinding;
    use crate::gateway::fake::{FakeGateway, status_error};
    use crate::record::{Record, first_record};
    use serde_json::json;
    use trowel_events::{EventEnvelope, MessageType};

    fn find_screen() -> ScreenConfig {
        ScreenConfig::new("find", ResourceBinding::new("list_finds", "edit_find"))
    }

    fn record(value: serde_json::Value) -> Record {
        first_record(value).unwrap_or_default()
    }

    async fn wait_for_started(store: &RecordStore, action: ActionKind) {
        let mut stream = store.subscribe(Some(0));
        while let Some(EventEnvelope { event, .. }) = stream.next().await {
            if event == (Event::ActionStarted { action }) {
                return;
            }
        }
    }

    #[tokio::test]
    async fn requested_action_runs_once_and_clears_its_flag() -> anyhow::Result<()> {
        let gateway = Arc::new(FakeGateway::new());
        let session = ScreenSession::spawn(find_screen(), gateway.clone());
        session.store().replace(Some(record(json!({"uuid": "abc", "title": "new"}))));

        let outcome = session.handle().request_and_wait(ActionKind::Save).await?;

        assert!(outcome.succeeded());
        assert_eq!(outcome.notification.message_type, MessageType::Success);
        assert_eq!(gateway.requests().len(), 1);
        assert!(session.handle().pending_actions().is_empty());
        session.shutdown().await?;
        Ok(())
    }

    #[tokio::test]
    async fn duplicate_requests_coalesce_while_pending() -> anyhow::Result<()> {
        let (gateway, gate) = FakeGateway::gated();
        let gateway = Arc::new(gateway);
        let metrics = Metrics::new()?;
        let session = ScreenSession::builder(find_screen(), gateway.clone())
            .metrics(metrics.clone())
            .spawn();
        session.store().replace(Some(record(json!({"uuid": "abc"}))));
        gateway.reply(Ok(json!([{"uuid": "abc"}])));
        let handle = session.handle();

        // Revert blocks in the gateway; save queues behind it twice.
        assert_eq!(handle.request(ActionKind::Revert)?, RequestStatus::Queued);
        wait_for_started(session.store(), ActionKind::Revert).await;
        assert_eq!(handle.request(ActionKind::Save)?, RequestStatus::Queued);
        let waiter = {
            let handle = handle.clone();
            tokio::spawn(async move { handle.request_and_wait(ActionKind::Save).await })
        };
        tokio::task::yield_now().await;
        while metrics.snapshot().crud_actions_coalesced_total == 0 {
            tokio::task::yield_now().await;
        }
        assert_eq!(handle.pending_actions(), vec![ActionKind::Save]);

        gate.add_permits(2);
        let outcome = waiter.await??;

        assert_eq!(outcome.action, ActionKind::Save);
        assert_eq!(gateway.requests().len(), 2);
        assert_eq!(metrics.action_count("save", "success"), 1);
        assert_eq!(metrics.action_count("revert", "success"), 1);
        session.shutdown().await?;
        Ok(())
    }

    #[tokio::test]
    async fn request_during_execution_queues_a_second_run() -> anyhow::Result<()> {
        let (gateway, gate) = FakeGateway::gated();
        let gateway = Arc::new(gateway);
        let session = ScreenSession::spawn(find_screen(), gateway.clone());
        session.store().replace(Some(record(json!({"uuid": "abc"}))));
        let handle = session.handle();

        handle.request(ActionKind::Save)?;
        wait_for_started(session.store(), ActionKind::Save).await;
        assert!(!handle.is_pending(ActionKind::Save));
        assert_eq!(handle.request(ActionKind::Save)?, RequestStatus::Queued);

        gate.add_permits(2);
        session.shutdown().await?;
        assert_eq!(gateway.requests().len(), 2);
        Ok(())
    }

    #[tokio::test]
    async fn actions_run_in_request_order() -> anyhow::Result<()> {
        let gateway = Arc::new(FakeGateway::new());
        gateway.reply(Ok(json!([{"uuid": "abc", "title": "stored"}])));
        let session = ScreenSession::spawn(find_screen(), gateway.clone());
        session.store().replace(Some(record(json!({"uuid": "abc"}))));
        let handle = session.handle();

        handle.request(ActionKind::Revert)?;
        handle.request(ActionKind::Save)?;
        handle.request(ActionKind::Delete)?;
        session.shutdown().await?;

        let methods: Vec<_> = gateway
            .requests()
            .iter()
            .map(|request| request.method.as_str().to_string())
            .collect();
        assert_eq!(methods, vec!["GET", "PATCH", "DELETE"]);
        Ok(())
    }

    #[tokio::test]
    async fn idle_sessions_make_no_calls() -> anyhow::Result<()> {
        let gateway = Arc::new(FakeGateway::new());
        let session = ScreenSession::spawn(find_screen(), gateway.clone());
        let store = session.store().clone();
        session.shutdown().await?;
        assert!(gateway.requests().is_empty());
        assert_eq!(store.events().last_event_id(), None);
        Ok(())
    }

    #[tokio::test]
    async fn events_bracket_each_action() -> anyhow::Result<()> {
        let gateway = Arc::new(FakeGateway::new());
        let session = ScreenSession::spawn(find_screen(), gateway);
        session.store().replace(Some(record(json!({"uuid": "abc"}))));
        let since = session.store().events().last_event_id();

        session.handle().request_and_wait(ActionKind::Save).await?;

        let kinds: Vec<_> = session
            .store()
            .events()
            .backlog_since(since.unwrap_or_default())
            .into_iter()
            .map(|envelope| envelope.event.kind())
            .collect();
        assert_eq!(kinds, vec!["action_started", "notified", "action_finished"]);
        Ok(())
    }

    #[tokio::test]
    async fn failed_actions_clear_their_flag() -> anyhow::Result<()> {
        for action in ActionKind::ALL {
            let gateway = Arc::new(FakeGateway::new());
            gateway.reply(Err(status_error(500, "boom")));
            let session = ScreenSession::spawn(find_screen(), gateway.clone());
            session.store().replace(Some(record(json!({"uuid": "abc"}))));
            let handle = session.handle();

            let outcome = handle.request_and_wait(action).await?;

            assert!(!outcome.succeeded(), "{action} should fail");
            assert_eq!(gateway.requests().len(), 1, "{action} ran more than once");
            assert!(handle.pending_actions().is_empty());
            assert_eq!(handle.request(action)?, RequestStatus::Queued);
            session.shutdown().await?;
        }
        Ok(())
    }

    #[tokio::test]
    async fn requests_after_shutdown_starts_are_rejected() -> anyhow::Result<()> {
        let (gateway, gate) = FakeGateway::gated();
        let gateway = Arc::new(gateway);
        let session = ScreenSession::spawn(find_screen(), gateway.clone());
        session.store().replace(Some(record(json!({"uuid": "abc"}))));
        let handle = session.handle();

        handle.request(ActionKind::Save)?;
        wait_for_started(session.store(), ActionKind::Save).await;
        let mut shutdown = std::pin::pin!(session.shutdown());
        assert!(futures_util::poll!(shutdown.as_mut()).is_pending());

        assert!(matches!(
            handle.request_and_wait(ActionKind::Revert).await,
            Err(CrudError::SessionClosed { .. })
        ));
        assert!(matches!(
            handle.request(ActionKind::Revert),
            Err(CrudError::SessionClosed { .. })
        ));
        assert!(handle.pending_actions().is_empty());

        gate.add_permits(1);
        shutdown.await?;
        assert_eq!(gateway.requests().len(), 1);
        assert!(matches!(
            handle.request(ActionKind::Revert),
            Err(CrudError::SessionClosed { .. })
        ));
        Ok(())
    }

    #[tokio::test]
    async fn queued_actions_still_run_during_shutdown() -> anyhow::Result<()> {
        let (gateway, gate) = FakeGateway::gated();
        let gateway = Arc::new(gateway);
        let session = ScreenSession::spawn(find_screen(), gateway.clone());
        session.store().replace(Some(record(json!({"uuid": "abc"}))));
        let handle = session.handle();

        handle.request(ActionKind::Save)?;
        wait_for_started(session.store(), ActionKind::Save).await;
        let waiter = {
            let handle = handle.clone();
            tokio::spawn(async move { handle.request_and_wait(ActionKind::Delete).await })
        };
        while !handle.is_pending(ActionKind::Delete) {
            tokio::task::yield_now().await;
        }

        gate.add_permits(2);
        session.shutdown().await?;
        let outcome = waiter.await??;
        assert_eq!(outcome.action, ActionKind::Delete);
        assert_eq!(gateway.requests().len(), 2);
        Ok(())
    }

    #[tokio::test]
    async fn closed_sessions_reject_requests() -> anyhow::Result<()> {
        let gateway = Arc::new(FakeGateway::new());
        let session = ScreenSession::spawn(find_screen(), gateway);
        let handle = session.handle();
        session.shutdown().await?;
        assert!(matches!(
            handle.request(ActionKind::New),
            Err(CrudError::SessionClosed { .. })
        ));
        Ok(())
    }
}
