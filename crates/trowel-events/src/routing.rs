//! Broadcast bus with a replay ring.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::Utc;
use tokio::sync::broadcast::error::{RecvError, TryRecvError};
use tokio::sync::broadcast::{self, Receiver, Sender};

use crate::payloads::{DEFAULT_REPLAY_CAPACITY, Event, EventEnvelope, EventId};

/// Store events fanned out to any number of observers.
///
/// Recent envelopes are kept in a bounded ring so late subscribers can catch
/// up from a known id.
#[derive(Clone)]
pub struct EventBus {
    live: Sender<EventEnvelope>,
    ring_buffer: Arc<Mutex<VecDeque<EventEnvelope>>>,
    next_id: Arc<AtomicU64>,
    capacity: usize,
}

impl EventBus {
    /// Bus keeping at most `capacity` envelopes (at least one).
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        let (live, _) = broadcast::channel(capacity);
        Self {
            live,
            ring_buffer: Arc::new(Mutex::new(VecDeque::with_capacity(capacity))),
            next_id: Arc::new(AtomicU64::new(1)),
            capacity,
        }
    }

    /// Bus with [`DEFAULT_REPLAY_CAPACITY`].
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_REPLAY_CAPACITY)
    }

    /// Publish `event` under the next id and return that id.
    pub fn publish(&self, event: Event) -> EventId {
        let mut ring = self.ring();
        let envelope = EventEnvelope {
            id: self.next_id.fetch_add(1, Ordering::Relaxed),
            timestamp: Utc::now(),
            event,
        };
        let id = envelope.id;
        while ring.len() >= self.capacity {
            let _ = ring.pop_front();
        }
        ring.push_back(envelope.clone());
        // Sent under the ring lock so receivers see ids in order.
        let _ = self.live.send(envelope);
        drop(ring);
        id
    }

    /// Subscribe to live events. With `since`, buffered envelopes newer than
    /// that id are delivered first.
    #[must_use]
    pub fn subscribe(&self, since: Option<EventId>) -> EventStream {
        let ring = self.ring();
        let buffered = since
            .map(|since| newer_than(&ring, since).collect())
            .unwrap_or_default();
        let live = self.live.subscribe();
        drop(ring);
        EventStream { buffered, live }
    }

    /// Id of the most recent envelope still buffered.
    #[must_use]
    pub fn last_event_id(&self) -> Option<EventId> {
        self.ring().back().map(|envelope| envelope.id)
    }

    /// Buffered envelopes with an id above `id`, oldest first.
    #[must_use]
    pub fn backlog_since(&self, id: EventId) -> Vec<EventEnvelope> {
        newer_than(&self.ring(), id).collect()
    }

    fn ring(&self) -> MutexGuard<'_, VecDeque<EventEnvelope>> {
        self.ring_buffer
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

fn newer_than(
    ring: &VecDeque<EventEnvelope>,
    id: EventId,
) -> impl Iterator<Item = EventEnvelope> + '_ {
    ring.iter().filter(move |envelope| envelope.id > id).cloned()
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

/// Subscription handle: buffered envelopes first, then live ones.
pub struct EventStream {
    buffered: VecDeque<EventEnvelope>,
    live: Receiver<EventEnvelope>,
}

impl EventStream {
    /// Wait for the next envelope; `None` once every bus handle is gone.
    ///
    /// Envelopes overwritten while this subscriber lagged are skipped.
    pub async fn next(&mut self) -> Option<EventEnvelope> {
        if let Some(envelope) = self.buffered.pop_front() {
            return Some(envelope);
        }
        loop {
            match self.live.recv().await {
                Ok(envelope) => break Some(envelope),
                Err(RecvError::Lagged(_)) => continue,
                Err(RecvError::Closed) => break None,
            }
        }
    }

    /// Next envelope that has already arrived, without waiting.
    pub fn try_next(&mut self) -> Option<EventEnvelope> {
        if let Some(envelope) = self.buffered.pop_front() {
            return Some(envelope);
        }
        loop {
            match self.live.try_recv() {
                Ok(envelope) => break Some(envelope),
                Err(TryRecvError::Lagged(_)) => continue,
                Err(TryRecvError::Empty | TryRecvError::Closed) => break None,
            }
        }
    }
}
