use thiserror::Error;

/// Errors returned by the syncline reactor.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    /// `run()` was called while the loop was already running.
    #[error("event loop is already running")]
    AlreadyRunning,
    /// The loop went idle with no timers armed and no remote handle alive,
    /// so nothing could ever wake it again.
    #[error("event loop stalled: no ready tasks, timers, or remote handles")]
    Stalled,
    /// Configuration value out of range.
    #[error("invalid config: {0}")]
    InvalidConfig(String),
}
