//! Blocking HTTP client over an event-driven exchange engine.
//!
//! An [`ExchangeEngine`] performs HTTP exchanges asynchronously and reports
//! each one through a success or failure callback scheduled on a
//! [`syncline`] event loop. [`BlockingClient`] turns that into call/return:
//! it queues the kickoffs, runs the loop on the calling thread, and returns
//! once the call's own exchanges have resolved.
//!
//! # Architecture
//!
//! `BlockingClient::request` arms a one-shot result slot, schedules a
//! kickoff, and runs the loop. The completion callback fills the slot and
//! stops the loop; the outcome is returned after `run()` has returned.
//!
//! `BlockingClient::request_multi` registers every request in a pending set
//! keyed by [`RequestId`], schedules one kickoff per request, and runs the
//! loop once. Each completion removes its entry and calls the caller's
//! callback with the request's key; the entry that empties the set stops
//! the loop.
//!
//! [`LoopbackEngine`] is an in-memory engine answering from a route table.
//!
//! # Example
//!
//! ```rust
//! use syncline::Reactor;
//! use syncline_http::{BlockingClient, HttpError, LoopbackEngine, Response, Route};
//!
//! let reactor = Reactor::new();
//! let engine = LoopbackEngine::new(reactor.clone());
//! engine.route("http://example.com/a", Route::respond(Response::new(200)));
//! engine.route("http://example.com/b", Route::fail(|| HttpError::Timeout));
//!
//! let client = BlockingClient::new(engine, reactor);
//! let results = client.request_all([
//!     ("a", "http://example.com/a"),
//!     ("b", "http://example.com/b"),
//! ])?;
//!
//! assert_eq!(results.len(), 2);
//! for (key, result) in results {
//!     match key {
//!         "a" => assert_eq!(result?.status(), 200),
//!         _ => assert!(matches!(result, Err(HttpError::Timeout))),
//!     }
//! }
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub(crate) mod metrics;
pub(crate) mod pending;

pub mod body;
pub mod client;
pub mod engine;
pub mod error;
pub mod event;
pub mod loopback;
pub mod options;
pub mod request;
pub mod response;

pub use body::Body;
pub use client::BlockingClient;
pub use engine::{ExchangeEngine, OnFailure, OnSuccess};
pub use error::{ClientError, HttpError};
pub use event::{Event, EventData, EventListeners, Listener, Observers, Subscription};
pub use loopback::{LoopbackEngine, Route};
pub use options::{ClientOptions, ClientOptionsBuilder, OptionValue, USER_AGENT};
pub use request::{Request, RequestId};
pub use response::Response;
