//! syncline: a single-threaded run-until-stopped event loop.
//!
//! syncline provides the reactor that drives blocking facades over
//! callback-based I/O: callers queue deferred tasks, call [`EventLoop::run`]
//! to block the current thread, and some task eventually calls
//! [`EventLoop::stop`] to hand control back.
//!
//! # Quick Start
//!
//! ```rust
//! use std::time::Duration;
//! use syncline::{EventLoop, Reactor};
//!
//! let reactor = Reactor::new();
//! let r = reactor.clone();
//! reactor.schedule_after(Duration::from_millis(1), move || r.stop());
//! reactor.run()?;
//! # Ok::<(), syncline::Error>(())
//! ```
//!
//! # Threading
//!
//! A [`Reactor`] and every task it runs stay on one thread. Other threads
//! feed work in through a [`Remote`], which also wakes a blocked loop.

// ── Internal modules ────────────────────────────────────────────────────
pub(crate) mod metrics;
pub(crate) mod timer;

// ── Public modules ──────────────────────────────────────────────────────
pub mod config;
pub mod error;
pub mod event_loop;
pub mod reactor;
pub mod remote;

/// Reactor configuration.
pub use config::Config;
/// Builder for [`Config`] with discoverable methods and `build()` validation.
pub use config::ConfigBuilder;
/// Reactor errors.
pub use error::Error;
/// Run-until-stopped event loop contract.
pub use event_loop::EventLoop;
/// Deferred unit of work.
pub use event_loop::Task;
/// Default [`EventLoop`] implementation.
pub use reactor::Reactor;
/// Cross-thread scheduling handle.
pub use remote::Remote;
/// Handle for a pending timer.
pub use timer::TimerId;
