use thiserror::Error;

/// Errors surfaced by the engine and its collaborators.
///
/// Locator and storage failures are recoverable by design: callers log them
/// and treat the cycle as having produced no work. Nothing here is expected
/// to terminate the host process.
#[derive(Debug, Error)]
pub enum AutomationError {
    /// A search descriptor failed to resolve to any live element.
    #[error("element not found: {0}")]
    ElementNotFound(String),

    /// The underlying locator backend failed while searching.
    #[error("locator failure: {0}")]
    LocatorFailure(String),

    /// Performing the trigger action on an element failed.
    #[error("trigger failed: {0}")]
    TriggerFailed(String),

    /// Reading or writing the durable state slot failed.
    #[error("storage error: {0}")]
    Storage(String),
}
