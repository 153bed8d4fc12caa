//! Blocking client over an [`ExchangeEngine`] and an [`EventLoop`].
//!
//! Each blocking call queues its kickoffs on the loop, runs the loop on the
//! calling thread, and returns once its own completions have stopped it.
//! Engine callbacks only ever touch the client's state from inside that run.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use syncline::{EventLoop, Reactor};
use tracing::{debug, error, trace, warn};

use crate::engine::{ExchangeEngine, OnFailure, OnSuccess};
use crate::error::{ClientError, HttpError};
use crate::event::{Event, EventData, EventListeners, Subscription};
use crate::metrics;
use crate::options::OptionValue;
use crate::pending::{Outcome, PendingSet, ResultSlot};
use crate::request::{Request, RequestId};
use crate::response::Response;

/// Mutable state shared between the client and the callbacks it hands out.
#[derive(Default)]
struct State {
    busy: Cell<bool>,
    slot: RefCell<ResultSlot>,
    pending: RefCell<PendingSet>,
}

impl State {
    /// Record the single request's outcome and stop the loop. Returns false
    /// if `id` is not the request being awaited.
    fn finish_single<L: EventLoop>(&self, event_loop: &L, id: RequestId, outcome: Outcome) -> bool {
        if !self.slot.borrow_mut().fill(id, outcome) {
            return false;
        }
        event_loop.stop();
        true
    }

    /// Remove `id` from the pending set, stopping the loop if that emptied
    /// it. Returns the caller key slot, or `None` if `id` was not tracked.
    fn clear_pending<L: EventLoop>(&self, event_loop: &L, id: RequestId) -> Option<usize> {
        let (slot, now_empty) = {
            let mut pending = self.pending.borrow_mut();
            let slot = pending.remove(id)?;
            (slot, pending.is_empty())
        };
        if now_empty {
            event_loop.stop();
        }
        Some(slot)
    }
}

/// Resets the single-flight flag when a blocking call returns.
struct Flight<'a>(&'a Cell<bool>);

impl Drop for Flight<'_> {
    fn drop(&mut self) {
        self.0.set(false);
    }
}

/// Caller keys and result callbacks for one `request_multi` call.
struct Batch<K, S, F> {
    keys: RefCell<Vec<Option<K>>>,
    on_result: RefCell<S>,
    on_error: RefCell<F>,
}

impl<K, S, F> Batch<K, S, F>
where
    S: FnMut(K, Response),
    F: FnMut(K, HttpError),
{
    fn take_key(&self, slot: usize) -> Option<K> {
        self.keys.borrow_mut().get_mut(slot)?.take()
    }

    fn deliver(&self, slot: usize, result: Result<Response, HttpError>) {
        // Each slot is handed out once, so a missing key means the entry was
        // already delivered.
        let Some(key) = self.take_key(slot) else {
            return;
        };
        match result {
            Ok(response) => {
                let mut on_result = self.on_result.borrow_mut();
                (*on_result)(key, response);
            }
            Err(err) => {
                let mut on_error = self.on_error.borrow_mut();
                (*on_error)(key, err);
            }
        }
    }
}

/// A blocking HTTP client.
///
/// Wraps an [`ExchangeEngine`] and the [`EventLoop`] it runs on. Every
/// blocking call runs the loop on the calling thread until the call's own
/// work has resolved. Handles are cheap to clone and share all state, so a
/// result callback can hold one to cancel sibling requests.
///
/// Only one blocking call may be active per client; a nested call returns
/// [`ClientError::Reentrant`].
///
/// There is no built-in timeout. An exchange the engine never completes
/// blocks `request` until something on the loop cancels it.
///
/// # Example
///
/// ```rust
/// use syncline::Reactor;
/// use syncline_http::{BlockingClient, LoopbackEngine, Response, Route};
///
/// let reactor = Reactor::new();
/// let engine = LoopbackEngine::new(reactor.clone());
/// engine.route("http://example.com/", Route::respond(Response::new(200).body("hello")));
///
/// let client = BlockingClient::new(engine, reactor);
/// let response = client.request("http://example.com/")?;
/// assert_eq!(response.text()?, "hello");
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
pub struct BlockingClient<E: ExchangeEngine, L: EventLoop = Reactor> {
    engine: Rc<E>,
    event_loop: Rc<L>,
    state: Rc<State>,
}

impl<E: ExchangeEngine, L: EventLoop> Clone for BlockingClient<E, L> {
    fn clone(&self) -> Self {
        Self {
            engine: Rc::clone(&self.engine),
            event_loop: Rc::clone(&self.event_loop),
            state: Rc::clone(&self.state),
        }
    }
}

impl<E: ExchangeEngine + 'static, L: EventLoop + 'static> BlockingClient<E, L> {
    /// Create a client. `engine` must schedule its completions on
    /// `event_loop`.
    pub fn new(engine: E, event_loop: L) -> Self {
        Self {
            engine: Rc::new(engine),
            event_loop: Rc::new(event_loop),
            state: Rc::new(State::default()),
        }
    }

    /// The wrapped engine.
    pub fn engine(&self) -> &E {
        &self.engine
    }

    /// The event loop blocking calls run.
    pub fn event_loop(&self) -> &L {
        &self.event_loop
    }

    /// Number of multi-request entries still awaiting completion.
    pub fn pending(&self) -> usize {
        self.state.pending.borrow().len()
    }

    /// Whether a blocking call is in progress.
    pub fn is_busy(&self) -> bool {
        self.state.busy.get()
    }

    fn enter(&self) -> Result<Flight<'_>, ClientError> {
        if self.state.busy.replace(true) {
            return Err(ClientError::Reentrant);
        }
        let flight = Flight(&self.state.busy);
        // Another caller owns the loop; our kickoffs would run in its run.
        if self.event_loop.is_running() {
            return Err(ClientError::Loop(syncline::Error::AlreadyRunning));
        }
        Ok(flight)
    }

    /// Perform one request and block until it completes.
    ///
    /// Accepts a [`Request`] or a bare URI. The engine's error is returned
    /// unchanged as [`ClientError::Exchange`], and only after the loop has
    /// returned from `run()`.
    pub fn request(&self, request: impl Into<Request>) -> Result<Response, ClientError> {
        let request = request.into();
        let _flight = self.enter()?;

        let id = request.id();
        self.state.slot.borrow_mut().arm(id);

        let client = self.clone();
        self.event_loop
            .schedule_once(Box::new(move || client.kickoff_single(request)));

        let run = self.event_loop.run();
        let outcome = self.state.slot.borrow_mut().take();

        match outcome {
            Some(Outcome::Done(result)) => result.map_err(ClientError::Exchange),
            Some(Outcome::Cancelled) => Err(ClientError::Cancelled),
            None => {
                self.engine.cancel(id);
                match run {
                    Err(e) => {
                        warn!(%id, error = %e, "event loop failed before request completed");
                        Err(ClientError::Loop(e))
                    }
                    Ok(()) => {
                        metrics::INVARIANT_VIOLATIONS.increment();
                        error!(%id, "event loop stopped before request completed");
                        Err(ClientError::InvariantViolation(
                            "event loop stopped before the request completed",
                        ))
                    }
                }
            }
        }
    }

    fn kickoff_single(&self, request: Request) {
        let id = request.id();
        if self.state.slot.borrow().awaiting() != Some(id) {
            trace!(%id, "skipping kickoff for request no longer awaited");
            return;
        }

        metrics::REQUESTS_ISSUED.increment();
        debug!(%id, method = request.method(), uri = request.uri(), "request");

        let on_success: OnSuccess = {
            let (state, event_loop) = (Rc::clone(&self.state), Rc::clone(&self.event_loop));
            Box::new(move |response: Response| {
                let status = response.status();
                if state.finish_single(&*event_loop, id, Outcome::Done(Ok(response))) {
                    metrics::RESPONSES.increment();
                    debug!(%id, status, "response");
                } else {
                    trace!(%id, "ignoring stale response");
                }
            })
        };
        let on_failure: OnFailure = {
            let (state, event_loop) = (Rc::clone(&self.state), Rc::clone(&self.event_loop));
            Box::new(move |err: HttpError| {
                let message = err.to_string();
                if state.finish_single(&*event_loop, id, Outcome::Done(Err(err))) {
                    metrics::FAILURES.increment();
                    debug!(%id, error = %message, "request failed");
                } else {
                    trace!(%id, "ignoring stale failure");
                }
            })
        };

        self.engine.request(request, on_success, on_failure);
    }

    /// Perform a batch of requests concurrently and block until every one
    /// has resolved or been cancelled.
    ///
    /// Each entry pairs a caller key with a [`Request`] or bare URI. Every
    /// entry that resolves produces exactly one call to `on_result` or
    /// `on_error` with its key; one entry failing does not affect the others.
    /// Completion order is whatever the engine delivers.
    ///
    /// Returns [`ClientError::EmptyBatch`] before scheduling anything if
    /// `requests` is empty.
    pub fn request_multi<K, D, I, S, F>(
        &self,
        requests: I,
        on_result: S,
        on_error: F,
    ) -> Result<(), ClientError>
    where
        I: IntoIterator<Item = (K, D)>,
        D: Into<Request>,
        K: 'static,
        S: FnMut(K, Response) + 'static,
        F: FnMut(K, HttpError) + 'static,
    {
        let (keys, requests): (Vec<K>, Vec<Request>) = requests
            .into_iter()
            .map(|(key, request)| (key, request.into()))
            .unzip();
        if requests.is_empty() {
            return Err(ClientError::EmptyBatch);
        }
        let _flight = self.enter()?;

        let residue = self.state.pending.borrow_mut().drain();
        if !residue.is_empty() {
            debug!(count = residue.len(), "discarding residual pending entries");
        }

        let batch = Rc::new(Batch {
            keys: RefCell::new(keys.into_iter().map(Some).collect()),
            on_result: RefCell::new(on_result),
            on_error: RefCell::new(on_error),
        });

        debug!(count = requests.len(), "request batch");
        for (slot, request) in requests.into_iter().enumerate() {
            self.state.pending.borrow_mut().insert(request.id(), slot);
            let client = self.clone();
            let batch = Rc::clone(&batch);
            self.event_loop
                .schedule_once(Box::new(move || client.kickoff_multi(request, batch)));
        }

        let run = self.event_loop.run();

        let leftover = self.state.pending.borrow_mut().drain();
        if leftover.is_empty() {
            return Ok(());
        }
        for id in &leftover {
            self.engine.cancel(*id);
        }
        match run {
            Err(e) => {
                warn!(remaining = leftover.len(), error = %e, "event loop failed before batch completed");
                Err(ClientError::Loop(e))
            }
            Ok(()) => {
                metrics::INVARIANT_VIOLATIONS.increment();
                error!(remaining = leftover.len(), "event loop stopped with requests pending");
                Err(ClientError::InvariantViolation(
                    "event loop stopped with requests still pending",
                ))
            }
        }
    }

    fn kickoff_multi<K, S, F>(&self, request: Request, batch: Rc<Batch<K, S, F>>)
    where
        K: 'static,
        S: FnMut(K, Response) + 'static,
        F: FnMut(K, HttpError) + 'static,
    {
        let id = request.id();
        if !self.state.pending.borrow().contains(id) {
            trace!(%id, "skipping kickoff for untracked request");
            return;
        }

        metrics::REQUESTS_ISSUED.increment();
        debug!(%id, method = request.method(), uri = request.uri(), "request");

        let on_success: OnSuccess = {
            let (state, event_loop) = (Rc::clone(&self.state), Rc::clone(&self.event_loop));
            let batch = Rc::clone(&batch);
            Box::new(move |response: Response| {
                let Some(slot) = state.clear_pending(&*event_loop, id) else {
                    trace!(%id, "ignoring stale response");
                    return;
                };
                metrics::RESPONSES.increment();
                debug!(%id, status = response.status(), "response");
                batch.deliver(slot, Ok(response));
            })
        };
        let on_failure: OnFailure = {
            let (state, event_loop) = (Rc::clone(&self.state), Rc::clone(&self.event_loop));
            Box::new(move |err: HttpError| {
                let Some(slot) = state.clear_pending(&*event_loop, id) else {
                    trace!(%id, "ignoring stale failure");
                    return;
                };
                metrics::FAILURES.increment();
                debug!(%id, error = %err, "request failed");
                batch.deliver(slot, Err(err));
            })
        };

        self.engine.request(request, on_success, on_failure);
    }

    /// Perform a batch of requests and collect every result, in completion
    /// order.
    pub fn request_all<K, D, I>(
        &self,
        requests: I,
    ) -> Result<Vec<(K, Result<Response, HttpError>)>, ClientError>
    where
        I: IntoIterator<Item = (K, D)>,
        D: Into<Request>,
        K: 'static,
    {
        let results = Rc::new(RefCell::new(Vec::new()));
        let (ok, failed) = (Rc::clone(&results), Rc::clone(&results));
        self.request_multi(
            requests,
            move |key, response| ok.borrow_mut().push((key, Ok(response))),
            move |key, err| failed.borrow_mut().push((key, Err(err))),
        )?;
        Ok(results.take())
    }

    /// Cancel one request.
    ///
    /// The engine is told to abandon it and it is dropped from tracking
    /// without calling either result callback. If it was the last pending
    /// entry of a batch, the batch call returns. Cancelling the request a
    /// single `request` call is waiting on makes that call return
    /// [`ClientError::Cancelled`]. Unknown ids are ignored.
    pub fn cancel(&self, id: RequestId) {
        self.engine.cancel(id);

        let tracked = self.state.clear_pending(&*self.event_loop, id).is_some();
        let single = self
            .state
            .finish_single(&*self.event_loop, id, Outcome::Cancelled);

        if tracked || single {
            metrics::CANCELLED.increment();
            debug!(%id, "cancelled");
        }
    }

    /// Cancel every request and stop the loop.
    ///
    /// Pending batch entries are discarded without callbacks; a waiting
    /// `request` call returns [`ClientError::Cancelled`].
    pub fn cancel_all(&self) {
        self.engine.cancel_all();

        let dropped = self.state.pending.borrow_mut().drain().len();
        let awaiting = self.state.slot.borrow().awaiting();
        let single = awaiting.is_some_and(|id| self.state.slot.borrow_mut().fill(id, Outcome::Cancelled));
        self.event_loop.stop();

        let abandoned = dropped + usize::from(single);
        if abandoned > 0 {
            metrics::CANCELLED.add(abandoned as u64);
            warn!(abandoned, "cancel_all abandoned in-flight requests");
        }
    }

    // ── Pass-through ────────────────────────────────────────────────────

    /// Set one engine option by name.
    pub fn set_option(&self, name: &str, value: impl Into<OptionValue>) -> Result<(), HttpError> {
        self.engine.set_option(name, value.into())
    }

    /// Set several engine options at once.
    pub fn set_all_options(&self, options: HashMap<String, OptionValue>) -> Result<(), HttpError> {
        self.engine.set_all_options(options)
    }

    /// Register lifecycle listeners with the engine.
    pub fn subscribe(&self, listeners: EventListeners, unsubscribe_on_error: bool) -> Subscription {
        self.engine.subscribe(listeners, unsubscribe_on_error)
    }

    /// Remove a subscription.
    pub fn unsubscribe(&self, subscription: &Subscription) {
        self.engine.unsubscribe(subscription)
    }

    /// Remove every subscription.
    pub fn unsubscribe_all(&self) {
        self.engine.unsubscribe_all()
    }

    /// Publish an event through the engine.
    pub fn notify(&self, event: Event, data: Option<EventData>) -> Result<(), HttpError> {
        self.engine.notify(event, data)
    }

    /// Complete an in-flight exchange with `response`.
    pub fn set_response(&self, id: RequestId, response: Response) {
        self.engine.set_response(id, response)
    }
}

impl<E: ExchangeEngine, L: EventLoop> fmt::Debug for BlockingClient<E, L> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BlockingClient")
            .field("busy", &self.state.busy.get())
            .field("pending", &self.state.pending.borrow().len())
            .finish()
    }
}
