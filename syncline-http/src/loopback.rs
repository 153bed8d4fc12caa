//! In-memory exchange engine.
//!
//! [`LoopbackEngine`] answers requests from a route table instead of the
//! network. Every completion is delivered from a task on the event loop,
//! optionally several loop hops later, which makes cross-request ordering
//! deterministic in tests.

use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use syncline::{EventLoop, Reactor};
use tracing::{debug, trace, warn};

use crate::engine::{ExchangeEngine, OnFailure, OnSuccess};
use crate::error::HttpError;
use crate::event::{Event, EventData, EventListeners, Observers, Subscription};
use crate::options::{ClientOptions, OptionValue};
use crate::request::{Request, RequestId};
use crate::response::Response;

/// Redirects followed before an exchange fails.
const MAX_REDIRECTS: usize = 10;

#[derive(Clone)]
enum Plan {
    Respond(Response),
    Echo,
    Fail(fn() -> HttpError),
    Hang,
    /// The URI cannot be sent at all.
    Reject,
}

/// How the engine answers requests for one URI.
///
/// ```rust
/// use syncline_http::{HttpError, Response, Route};
///
/// let ok = Route::respond(Response::new(204));
/// let mirror = Route::echo();
/// let slow = Route::respond(Response::new(200)).after_ticks(3);
/// let broken = Route::fail(|| HttpError::Timeout);
/// let stuck = Route::hang();
/// # let _ = (ok, mirror, slow, broken, stuck);
/// ```
#[derive(Clone)]
pub struct Route {
    plan: Plan,
    ticks: usize,
}

impl Route {
    /// Complete with a copy of `response`.
    pub fn respond(response: Response) -> Self {
        Self {
            plan: Plan::Respond(response),
            ticks: 0,
        }
    }

    /// Complete with a 200 that mirrors the request: its method in
    /// `x-echo-method`, then every request header, and the request body.
    pub fn echo() -> Self {
        Self {
            plan: Plan::Echo,
            ticks: 0,
        }
    }

    /// Fail with the error `make` builds.
    pub fn fail(make: fn() -> HttpError) -> Self {
        Self {
            plan: Plan::Fail(make),
            ticks: 0,
        }
    }

    /// Never complete unless cancelled or given a response with
    /// `set_response`.
    pub fn hang() -> Self {
        Self {
            plan: Plan::Hang,
            ticks: 0,
        }
    }

    /// Delay completion by `ticks` extra loop hops.
    pub fn after_ticks(mut self, ticks: usize) -> Self {
        self.ticks = ticks;
        self
    }
}

impl fmt::Debug for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let plan = match &self.plan {
            Plan::Respond(r) => format!("respond({})", r.status()),
            Plan::Echo => "echo".to_string(),
            Plan::Fail(_) => "fail".to_string(),
            Plan::Hang => "hang".to_string(),
            Plan::Reject => "reject".to_string(),
        };
        f.debug_struct("Route")
            .field("plan", &plan)
            .field("ticks", &self.ticks)
            .finish()
    }
}

struct Exchange {
    request: Request,
    /// Current target; differs from the request URI after a redirect.
    uri: String,
    plan: Plan,
    remaining: usize,
    redirects: usize,
    on_success: OnSuccess,
    on_failure: OnFailure,
}

struct Inner<L> {
    event_loop: L,
    routes: RefCell<HashMap<String, Route>>,
    inflight: RefCell<HashMap<RequestId, Exchange>>,
    observers: Observers,
    options: RefCell<ClientOptions>,
    issued: RefCell<Vec<RequestId>>,
    cancelled: RefCell<Vec<RequestId>>,
}

enum Step {
    Wait,
    Complete(Exchange),
}

impl<L: EventLoop + 'static> Inner<L> {
    fn plan_for(&self, uri: &str) -> (Plan, usize) {
        if uri.is_empty() || uri.contains(char::is_whitespace) {
            return (Plan::Reject, 0);
        }
        match self.routes.borrow().get(uri) {
            Some(route) => (route.plan.clone(), route.ticks),
            None => (Plan::Fail(|| HttpError::ConnectionClosed), 0),
        }
    }

    fn schedule_step(self: &Rc<Self>, id: RequestId) {
        let inner = Rc::clone(self);
        self.event_loop.schedule_once(Box::new(move || inner.step(id)));
    }

    /// Advance one exchange by one loop hop.
    fn step(self: &Rc<Self>, id: RequestId) {
        let next = {
            let mut inflight = self.inflight.borrow_mut();
            let Some(exchange) = inflight.get_mut(&id) else {
                trace!(%id, "exchange gone before step");
                return;
            };
            if matches!(exchange.plan, Plan::Hang) {
                Step::Wait
            } else if exchange.remaining > 0 {
                exchange.remaining -= 1;
                self.schedule_step(id);
                Step::Wait
            } else {
                match inflight.remove(&id) {
                    Some(exchange) => Step::Complete(exchange),
                    None => Step::Wait,
                }
            }
        };
        if let Step::Complete(exchange) = next {
            self.complete(id, exchange);
        }
    }

    fn complete(self: &Rc<Self>, id: RequestId, mut exchange: Exchange) {
        let response = match std::mem::replace(&mut exchange.plan, Plan::Hang) {
            Plan::Respond(response) => response,
            Plan::Echo => echo(&exchange.request),
            Plan::Fail(make) => {
                let err = make();
                debug!(%id, error = %err, "loopback failure");
                (exchange.on_failure)(err);
                return;
            }
            Plan::Reject => {
                debug!(%id, uri = %exchange.uri, "loopback rejected uri");
                (exchange.on_failure)(HttpError::InvalidUrl(exchange.uri));
                return;
            }
            Plan::Hang => return,
        };

        if let Some(location) = self.redirect_target(&response) {
            self.redirect(id, exchange, location);
            return;
        }
        self.publish(
            Event::Headers,
            EventData::Headers {
                id,
                headers: response.headers().to_vec(),
            },
        );
        self.publish(
            Event::Response,
            EventData::Status {
                id,
                status: response.status(),
            },
        );
        debug!(%id, status = response.status(), "loopback response");
        (exchange.on_success)(response);
    }

    fn redirect_target(&self, response: &Response) -> Option<String> {
        if !(300..400).contains(&response.status()) || !self.options.borrow().follow_location {
            return None;
        }
        response.header_value("location").map(str::to_string)
    }

    fn redirect(self: &Rc<Self>, id: RequestId, mut exchange: Exchange, location: String) {
        if exchange.redirects >= MAX_REDIRECTS {
            (exchange.on_failure)(HttpError::Protocol(format!(
                "more than {MAX_REDIRECTS} redirects"
            )));
            return;
        }
        self.publish(
            Event::Redirect,
            EventData::Redirect {
                id,
                location: location.clone(),
            },
        );
        debug!(%id, from = %exchange.uri, to = %location, "loopback redirect");

        let (plan, ticks) = self.plan_for(&location);
        exchange.uri = location;
        exchange.plan = plan;
        exchange.remaining = ticks;
        exchange.redirects += 1;
        self.inflight.borrow_mut().insert(id, exchange);
        self.schedule_step(id);
    }

    /// Listener failures do not affect the exchange.
    fn publish(&self, event: Event, data: EventData) {
        if let Err(e) = self.observers.notify(event, Some(&data)) {
            warn!(error = %e, "event listener failed");
        }
    }

    fn abandon(&self, id: RequestId, exchange: Exchange) {
        self.cancelled.borrow_mut().push(id);
        debug!(%id, uri = %exchange.uri, "loopback cancel");
        self.publish(
            Event::Cancel,
            EventData::Request {
                id,
                uri: exchange.uri,
            },
        );
    }
}

fn echo(request: &Request) -> Response {
    request
        .headers()
        .iter()
        .fold(
            Response::new(200).header("x-echo-method", request.method()),
            |response, (name, value)| response.header(name, value),
        )
        .body(request.body_ref().clone().into_bytes())
}

/// An [`ExchangeEngine`] that serves requests from an in-memory route table.
///
/// Requests for URIs with no route fail with
/// [`HttpError::ConnectionClosed`]; empty URIs or URIs containing whitespace
/// fail with [`HttpError::InvalidUrl`]. 3xx responses carrying a `Location`
/// header are followed while the `followLocation` option is set.
///
/// Handles are cheap to clone and share one route table.
pub struct LoopbackEngine<L: EventLoop = Reactor> {
    inner: Rc<Inner<L>>,
}

impl<L: EventLoop> Clone for LoopbackEngine<L> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<L: EventLoop + 'static> LoopbackEngine<L> {
    /// Create an engine that completes exchanges on `event_loop`.
    pub fn new(event_loop: L) -> Self {
        Self {
            inner: Rc::new(Inner {
                event_loop,
                routes: RefCell::new(HashMap::new()),
                inflight: RefCell::new(HashMap::new()),
                observers: Observers::new(),
                options: RefCell::new(ClientOptions::default()),
                issued: RefCell::new(Vec::new()),
                cancelled: RefCell::new(Vec::new()),
            }),
        }
    }

    /// Set the route for `uri`, replacing any previous one.
    pub fn route(&self, uri: &str, route: Route) {
        self.inner.routes.borrow_mut().insert(uri.to_string(), route);
    }

    /// Ids of every request started, in order.
    pub fn issued(&self) -> Vec<RequestId> {
        self.inner.issued.borrow().clone()
    }

    /// Ids of every request cancelled while in flight, in order.
    pub fn cancelled(&self) -> Vec<RequestId> {
        self.inner.cancelled.borrow().clone()
    }

    /// Number of exchanges not yet completed or cancelled.
    pub fn in_flight(&self) -> usize {
        self.inner.inflight.borrow().len()
    }

    /// Current options.
    pub fn options(&self) -> ClientOptions {
        self.inner.options.borrow().clone()
    }

    /// Number of live subscriptions.
    pub fn subscriptions(&self) -> usize {
        self.inner.observers.len()
    }
}

impl<L: EventLoop + 'static> ExchangeEngine for LoopbackEngine<L> {
    fn request(&self, request: Request, on_success: OnSuccess, on_failure: OnFailure) {
        let id = request.id();
        let uri = request.uri().to_string();
        self.inner.issued.borrow_mut().push(id);

        let (plan, ticks) = self.inner.plan_for(&uri);
        let hang = matches!(plan, Plan::Hang);
        self.inner.inflight.borrow_mut().insert(
            id,
            Exchange {
                request,
                uri: uri.clone(),
                plan,
                remaining: ticks,
                redirects: 0,
                on_success,
                on_failure,
            },
        );
        // Listeners see the exchange as in flight and may cancel it.
        self.inner
            .publish(Event::Request, EventData::Request { id, uri });
        if !hang {
            self.inner.schedule_step(id);
        }
    }

    fn cancel(&self, id: RequestId) {
        let removed = self.inner.inflight.borrow_mut().remove(&id);
        if let Some(exchange) = removed {
            self.inner.abandon(id, exchange);
        }
    }

    fn cancel_all(&self) {
        let mut drained: Vec<(RequestId, Exchange)> =
            self.inner.inflight.borrow_mut().drain().collect();
        drained.sort_by_key(|(id, _)| *id);
        for (id, exchange) in drained {
            self.inner.abandon(id, exchange);
        }
    }

    fn set_response(&self, id: RequestId, response: Response) {
        let was_hanging = {
            let mut inflight = self.inner.inflight.borrow_mut();
            let Some(exchange) = inflight.get_mut(&id) else {
                trace!(%id, "set_response for unknown exchange");
                return;
            };
            let was_hanging = matches!(exchange.plan, Plan::Hang);
            exchange.plan = Plan::Respond(response);
            exchange.remaining = 0;
            was_hanging
        };
        // A hanging exchange has no step queued.
        if was_hanging {
            self.inner.schedule_step(id);
        }
    }

    fn set_option(&self, name: &str, value: OptionValue) -> Result<(), HttpError> {
        self.inner.options.borrow_mut().set(name, value)
    }

    fn set_all_options(&self, options: HashMap<String, OptionValue>) -> Result<(), HttpError> {
        self.inner.options.borrow_mut().set_all(options)
    }

    fn subscribe(&self, listeners: EventListeners, unsubscribe_on_error: bool) -> Subscription {
        self.inner.observers.subscribe(listeners, unsubscribe_on_error)
    }

    fn unsubscribe(&self, subscription: &Subscription) {
        self.inner.observers.unsubscribe(subscription)
    }

    fn unsubscribe_all(&self) {
        self.inner.observers.unsubscribe_all()
    }

    fn notify(&self, event: Event, data: Option<EventData>) -> Result<(), HttpError> {
        self.inner.observers.notify(event, data.as_ref())
    }
}

impl<L: EventLoop> fmt::Debug for LoopbackEngine<L> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoopbackEngine")
            .field("routes", &self.inner.routes.borrow().len())
            .field("in_flight", &self.inner.inflight.borrow().len())
            .finish()
    }
}
