#![forbid(unsafe_code)]
#![deny(
    unused_must_use,
    rustdoc::broken_intra_doc_links,
    rustdoc::bare_urls,
    missing_docs
)]
#![warn(unreachable_pub, clippy::all, clippy::pedantic, clippy::nursery)]

//! Store events for a Trowel screen session.
//!
//! The bus provides a typed event enum, sequential identifiers, and replay of
//! recent events for subscribers that attach late. Internally it uses
//! `tokio::broadcast` with a bounded buffer; when the channel overflows, the
//! oldest events are dropped.
//!
//! Layout: `payloads.rs` (event and payload types), `routing.rs` (the bus).

pub mod payloads;
pub mod routing;

pub use payloads::{
    ActionKind, DEFAULT_REPLAY_CAPACITY, Event, EventEnvelope, EventId, MessageType,
    NavigationTarget, Notification, UnknownAction,
};
pub use routing::{EventBus, EventStream};
