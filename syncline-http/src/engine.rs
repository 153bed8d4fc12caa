//! The contract between [`BlockingClient`](crate::BlockingClient) and the
//! asynchronous engine that performs exchanges.

use std::collections::HashMap;
use std::rc::Rc;

use crate::error::HttpError;
use crate::event::{Event, EventData, EventListeners, Subscription};
use crate::options::OptionValue;
use crate::request::{Request, RequestId};
use crate::response::Response;

/// Success callback for one exchange.
pub type OnSuccess = Box<dyn FnOnce(Response) + 'static>;

/// Failure callback for one exchange.
pub type OnFailure = Box<dyn FnOnce(HttpError) + 'static>;

/// An asynchronous HTTP exchange engine driven by an event loop.
///
/// Methods take `&self`: engines are shared with the callbacks they schedule
/// and keep their state behind interior mutability.
///
/// # Completion contract
///
/// For each call to [`request`](ExchangeEngine::request), exactly one of
/// `on_success` / `on_failure` fires, exactly once, from a task running on
/// the engine's event loop. Neither fires inline from `request` itself. A
/// cancelled exchange fires neither.
pub trait ExchangeEngine {
    /// Start an exchange.
    fn request(&self, request: Request, on_success: OnSuccess, on_failure: OnFailure);

    /// Cancel one in-flight exchange. Unknown ids are ignored.
    fn cancel(&self, id: RequestId);

    /// Cancel every in-flight exchange.
    fn cancel_all(&self);

    /// Complete an in-flight exchange with `response` instead of whatever
    /// the engine would have produced. Unknown ids are ignored.
    fn set_response(&self, id: RequestId, response: Response);

    /// Set one engine option by name.
    fn set_option(&self, name: &str, value: OptionValue) -> Result<(), HttpError>;

    /// Set several engine options at once.
    fn set_all_options(&self, options: HashMap<String, OptionValue>) -> Result<(), HttpError>;

    /// Register lifecycle listeners.
    fn subscribe(&self, listeners: EventListeners, unsubscribe_on_error: bool) -> Subscription;

    /// Remove a subscription.
    fn unsubscribe(&self, subscription: &Subscription);

    /// Remove every subscription.
    fn unsubscribe_all(&self);

    /// Publish an event to subscribers.
    fn notify(&self, event: Event, data: Option<EventData>) -> Result<(), HttpError>;
}

impl<E: ExchangeEngine + ?Sized> ExchangeEngine for Rc<E> {
    fn request(&self, request: Request, on_success: OnSuccess, on_failure: OnFailure) {
        (**self).request(request, on_success, on_failure)
    }

    fn cancel(&self, id: RequestId) {
        (**self).cancel(id)
    }

    fn cancel_all(&self) {
        (**self).cancel_all()
    }

    fn set_response(&self, id: RequestId, response: Response) {
        (**self).set_response(id, response)
    }

    fn set_option(&self, name: &str, value: OptionValue) -> Result<(), HttpError> {
        (**self).set_option(name, value)
    }

    fn set_all_options(&self, options: HashMap<String, OptionValue>) -> Result<(), HttpError> {
        (**self).set_all_options(options)
    }

    fn subscribe(&self, listeners: EventListeners, unsubscribe_on_error: bool) -> Subscription {
        (**self).subscribe(listeners, unsubscribe_on_error)
    }

    fn unsubscribe(&self, subscription: &Subscription) {
        (**self).unsubscribe(subscription)
    }

    fn unsubscribe_all(&self) {
        (**self).unsubscribe_all()
    }

    fn notify(&self, event: Event, data: Option<EventData>) -> Result<(), HttpError> {
        (**self).notify(event, data)
    }
}
