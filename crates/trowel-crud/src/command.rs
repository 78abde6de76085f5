use trowel_events::ActionKind;

/// Messages consumed by a screen's dispatcher task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ScreenCommand {
    /// Run the pending request for this action.
    Run(ActionKind),
    /// Stop after the commands already queued.
    Shutdown,
}
