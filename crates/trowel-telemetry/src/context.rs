//! Context propagation helpers for screen sessions.
//!
//! # Design
//! - Keeps the active screen name in task-local storage so handler logs can be attributed.
//! - Provides an application-level span guard carrying mode/build info.

use std::future::Future;
use std::sync::Arc;

use tracing::{Span, span::Entered};

use crate::init::build_sha;

/// Guard that keeps the application-level span entered for the lifetime of the process.
pub struct GlobalContextGuard {
    _guard: Entered<'static>,
}

impl GlobalContextGuard {
    /// Enter the application-level tracing span for the lifetime of the guard.
    #[must_use]
    pub fn new(mode: impl Into<String>) -> Self {
        let mode = mode.into();
        let span: &'static Span = Box::leak(Box::new(
            tracing::info_span!("app", mode = %mode, build_sha = %build_sha()),
        ));
        let guard = span.enter();
        Self { _guard: guard }
    }
}

/// Name of the screen whose session is driving the current task, if any.
#[must_use]
pub fn current_screen() -> Option<String> {
    ACTIVE_SCREEN.try_with(|screen| screen.to_string()).ok()
}

/// Execute the provided future with the screen name available to downstream spans.
pub async fn with_screen_context<Fut, T>(screen: impl Into<String>, fut: Fut) -> T
where
    Fut: Future<Output = T>,
{
    let screen: Arc<str> = Arc::from(screen.into());
    ACTIVE_SCREEN.scope(screen, fut).await
}

tokio::task_local! {
    static ACTIVE_SCREEN: Arc<str>;
}
