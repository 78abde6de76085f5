#![forbid(unsafe_code)]
#![deny(
    unused_must_use,
    rustdoc::broken_intra_doc_links,
    rustdoc::bare_urls,
    missing_docs
)]
#![warn(unreachable_pub, clippy::all, clippy::pedantic, clippy::nursery)]

//! Generic record CRUD engine.
//!
//! One [`ScreenSession`] is spawned per record screen. The host requests
//! actions through a [`ScreenHandle`]; a dispatcher task owned by the session
//! runs them in request order against a [`RecordGateway`] and reports the
//! results through the session's [`RecordStore`].
//!
//! Layout:
//! - `record.rs`: schema-less records and typed views
//! - `edit.rs`: local field edits applied before a save
//! - `navigation.rs`: routing rules for record ids
//! - `binding.rs`: per-screen resource paths and hooks
//! - `store.rs`: observable screen state
//! - `gateway.rs`: the seam to the resource API
//! - `handlers.rs`: the new/save/revert/delete handlers
//! - `command.rs`, `session.rs`: action queue and dispatcher task
//! - `loader.rs`: data loading on mount and route changes
//! - `error.rs`: `CrudError`

pub mod binding;
mod command;
pub mod edit;
pub mod error;
pub mod gateway;
pub mod handlers;
pub mod loader;
pub mod navigation;
pub mod record;
pub mod session;
pub mod store;

pub use binding::{DefaultHooks, ResourceBinding, ScreenConfig, ScreenHooks};
pub use error::{CrudError, CrudResult};
pub use gateway::RecordGateway;
pub use handlers::{ActionOutcome, ActionRunner};
pub use loader::{DataLoader, LoadOutcome};
pub use navigation::go_to_record;
pub use record::{
    AuditFields, Record, all_records, display_id, first_record, is_uuid, record_entry_id,
    record_from, record_uuid, record_view,
};
pub use session::{RequestStatus, ScreenHandle, ScreenSession, SessionBuilder};
pub use store::RecordStore;
pub use trowel_events::{ActionKind, MessageType, NavigationTarget, Notification};
