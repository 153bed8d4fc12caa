/// Errors produced by an exchange engine: anything that can fail a single
/// HTTP exchange, plus configuration and listener failures forwarded
/// through the engine.
#[derive(Debug, thiserror::Error)]
pub enum HttpError {
    /// The connection was closed unexpectedly.
    #[error("connection closed")]
    ConnectionClosed,

    /// The URI cannot be sent: empty or containing whitespace.
    #[error("invalid url: {0}")]
    InvalidUrl(String),

    /// Response parsing error.
    #[error("parse error")]
    Parse,

    /// Request timed out.
    #[error("timeout")]
    Timeout,

    /// Protocol error (unexpected event, bad state).
    #[error("protocol error: {0}")]
    Protocol(String),

    /// `set_option` was given a name the engine does not recognise.
    #[error("unknown option: {0}")]
    UnknownOption(String),

    /// `set_option` was given a value of the wrong type or out of range.
    #[error("invalid value for option {name}: {reason}")]
    InvalidOption {
        /// Option name as passed by the caller.
        name: String,
        /// What was wrong with the value.
        reason: String,
    },

    /// An event listener failed during `notify`.
    #[error("listener for '{event}' failed: {message}")]
    Listener {
        /// Wire name of the event being dispatched.
        event: &'static str,
        /// Failure reported by the listener.
        message: String,
    },
}

/// Errors returned by the blocking client.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// The exchange failed; carries the engine's error unchanged.
    #[error(transparent)]
    Exchange(#[from] HttpError),

    /// `request_multi` was called with no requests.
    #[error("request batch must not be empty")]
    EmptyBatch,

    /// A blocking call was issued while another one was running on the same
    /// client.
    #[error("a blocking call is already in progress on this client")]
    Reentrant,

    /// The in-flight request was cancelled before it completed.
    #[error("request cancelled")]
    Cancelled,

    /// The event loop failed to run.
    #[error("event loop: {0}")]
    Loop(#[from] syncline::Error),

    /// The event loop returned without the outcome the call was waiting for.
    /// This indicates a defect in the engine or in code sharing the loop.
    #[error("invariant violated: {0}")]
    InvariantViolation(&'static str),
}

impl ClientError {
    /// The engine error, if this is an exchange failure.
    pub fn as_exchange(&self) -> Option<&HttpError> {
        match self {
            ClientError::Exchange(e) => Some(e),
            _ => None,
        }
    }
}
