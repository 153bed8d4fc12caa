//! Lifecycle events and the subscription registry engines embed.
//!
//! Listeners are grouped into subscriptions. A subscription created with
//! `unsubscribe_on_error` is dropped the first time one of its listeners
//! fails; the failure still reaches the caller of [`Observers::notify`].

use std::cell::RefCell;
use std::fmt;

use crate::error::HttpError;
use crate::request::RequestId;

/// Lifecycle events published by an exchange engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Event {
    /// A request was cancelled.
    Cancel,
    /// A request is about to be sent.
    Request,
    /// Response headers arrived.
    Headers,
    /// The server redirected the request.
    Redirect,
    /// A complete response arrived.
    Response,
    /// Application-defined event, matched by name. Engines never publish
    /// these; they only reach listeners through an explicit notify.
    Custom(&'static str),
}

impl Event {
    /// All built-in events, in declaration order.
    pub const ALL: [Event; 5] = [
        Event::Cancel,
        Event::Request,
        Event::Headers,
        Event::Redirect,
        Event::Response,
    ];

    /// Wire name of the event.
    pub fn as_str(&self) -> &'static str {
        match self {
            Event::Cancel => "cancel",
            Event::Request => "request",
            Event::Headers => "headers",
            Event::Redirect => "redirect",
            Event::Response => "response",
            Event::Custom(name) => *name,
        }
    }

    /// Parse the wire name of a built-in event.
    pub fn from_name(name: &str) -> Option<Event> {
        Event::ALL.into_iter().find(|e| e.as_str() == name)
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Payload attached to an event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventData {
    /// A request identified by id, with its URI.
    Request { id: RequestId, uri: String },
    /// Response status for a request.
    Status { id: RequestId, status: u16 },
    /// Response headers for a request.
    Headers {
        id: RequestId,
        headers: Vec<(String, String)>,
    },
    /// Redirect target for a request.
    Redirect { id: RequestId, location: String },
    /// Free-form payload for application-defined notifications.
    Text(String),
}

/// Callback invoked for an event. Returning an error reports a listener
/// failure to the notifier.
pub type Listener = Box<dyn FnMut(Option<&EventData>) -> Result<(), String> + 'static>;

/// A set of listeners keyed by event, passed to `subscribe`.
///
/// ```rust
/// use syncline_http::{Event, EventListeners};
///
/// let listeners = EventListeners::new()
///     .on(Event::Request, |_| Ok(()))
///     .on(Event::Response, |data| {
///         println!("response: {data:?}");
///         Ok(())
///     });
/// assert_eq!(listeners.len(), 2);
/// ```
#[derive(Default)]
pub struct EventListeners {
    entries: Vec<(Event, Listener)>,
}

impl EventListeners {
    /// Create an empty listener map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a listener for `event`. Several listeners may share an event.
    pub fn on<F>(mut self, event: Event, listener: F) -> Self
    where
        F: FnMut(Option<&EventData>) -> Result<(), String> + 'static,
    {
        self.entries.push((event, Box::new(listener)));
        self
    }

    /// Number of listeners.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if there are no listeners.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl fmt::Debug for EventListeners {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.entries.iter().map(|(e, _)| e))
            .finish()
    }
}

/// Handle returned by `subscribe`, used to unsubscribe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Subscription(u64);

impl Subscription {
    /// Get the raw ID value.
    pub fn value(&self) -> u64 {
        self.0
    }
}

struct Entry {
    id: u64,
    unsubscribe_on_error: bool,
    /// `None` while the listener is being called.
    listeners: Vec<(Event, Option<Listener>)>,
}

/// Subscription registry.
///
/// All methods take `&self`; listeners may call back into the registry
/// (subscribe, unsubscribe) while being dispatched.
#[derive(Default)]
pub struct Observers {
    entries: RefCell<Vec<Entry>>,
    next_id: RefCell<u64>,
}

impl Observers {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a listener map.
    pub fn subscribe(&self, listeners: EventListeners, unsubscribe_on_error: bool) -> Subscription {
        let id = {
            let mut next = self.next_id.borrow_mut();
            *next += 1;
            *next
        };
        self.entries.borrow_mut().push(Entry {
            id,
            unsubscribe_on_error,
            listeners: listeners
                .entries
                .into_iter()
                .map(|(event, listener)| (event, Some(listener)))
                .collect(),
        });
        Subscription(id)
    }

    /// Remove a subscription. Unknown or already-removed handles are ignored.
    pub fn unsubscribe(&self, subscription: &Subscription) {
        self.entries.borrow_mut().retain(|e| e.id != subscription.0);
    }

    /// Remove every subscription.
    pub fn unsubscribe_all(&self) {
        self.entries.borrow_mut().clear();
    }

    /// Number of live subscriptions.
    pub fn len(&self) -> usize {
        self.entries.borrow().len()
    }

    /// Returns true if there are no subscriptions.
    pub fn is_empty(&self) -> bool {
        self.entries.borrow().is_empty()
    }

    /// Dispatch `event` to every matching listener in subscription order.
    ///
    /// Stops at the first listener failure and returns it as
    /// [`HttpError::Listener`], after removing the failing subscription if it
    /// was registered with `unsubscribe_on_error`.
    pub fn notify(&self, event: Event, data: Option<&EventData>) -> Result<(), HttpError> {
        // Snapshot targets so listeners can mutate the registry.
        let targets: Vec<(u64, usize)> = self
            .entries
            .borrow()
            .iter()
            .flat_map(|entry| {
                entry
                    .listeners
                    .iter()
                    .enumerate()
                    .filter(|(_, (e, _))| *e == event)
                    .map(move |(idx, _)| (entry.id, idx))
            })
            .collect();

        for (sub_id, idx) in targets {
            let Some(mut listener) = self.take_listener(sub_id, idx) else {
                continue; // unsubscribed mid-dispatch
            };
            let outcome = listener(data);
            let unsubscribe_on_error = self.restore_listener(sub_id, idx, listener);

            if let Err(message) = outcome {
                if unsubscribe_on_error {
                    self.unsubscribe(&Subscription(sub_id));
                }
                return Err(HttpError::Listener {
                    event: event.as_str(),
                    message,
                });
            }
        }
        Ok(())
    }

    fn take_listener(&self, sub_id: u64, idx: usize) -> Option<Listener> {
        let mut entries = self.entries.borrow_mut();
        let entry = entries.iter_mut().find(|e| e.id == sub_id)?;
        entry.listeners.get_mut(idx)?.1.take()
    }

    /// Put a listener back after dispatch. Returns the subscription's
    /// `unsubscribe_on_error` flag, or false if it is gone.
    fn restore_listener(&self, sub_id: u64, idx: usize, listener: Listener) -> bool {
        let mut entries = self.entries.borrow_mut();
        let Some(entry) = entries.iter_mut().find(|e| e.id == sub_id) else {
            return false;
        };
        if let Some(slot) = entry.listeners.get_mut(idx) {
            slot.1 = Some(listener);
        }
        entry.unsubscribe_on_error
    }
}

impl fmt::Debug for Observers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Observers")
            .field("subscriptions", &self.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::rc::Rc;

    fn counter() -> (Rc<RefCell<u32>>, impl FnMut(Option<&EventData>) -> Result<(), String>) {
        let count = Rc::new(RefCell::new(0));
        let c = Rc::clone(&count);
        (count, move |_: Option<&EventData>| {
            *c.borrow_mut() += 1;
            Ok(())
        })
    }

    #[test]
    fn event_names_round_trip() {
        for event in Event::ALL {
            assert_eq!(Event::from_name(event.as_str()), Some(event));
        }
        assert_eq!(Event::from_name("bogus"), None);
    }

    #[test]
    fn custom_events_match_by_name() {
        let observers = Observers::new();
        let (progress, on_progress) = counter();
        let (requests, on_request) = counter();
        observers.subscribe(
            EventListeners::new()
                .on(Event::Custom("progress"), on_progress)
                .on(Event::Request, on_request),
            true,
        );

        observers.notify(Event::Custom("progress"), None).unwrap();
        observers.notify(Event::Custom("other"), None).unwrap();

        assert_eq!(*progress.borrow(), 1);
        assert_eq!(*requests.borrow(), 0);
        assert_eq!(Event::Custom("progress").to_string(), "progress");
        assert_eq!(Event::from_name("progress"), None);
    }

    #[test]
    fn notify_reaches_matching_listeners_only() {
        let observers = Observers::new();
        let (requests, on_request) = counter();
        let (responses, on_response) = counter();
        observers.subscribe(
            EventListeners::new()
                .on(Event::Request, on_request)
                .on(Event::Response, on_response),
            true,
        );

        observers.notify(Event::Request, None).unwrap();
        observers.notify(Event::Request, None).unwrap();
        observers.notify(Event::Redirect, None).unwrap();

        assert_eq!(*requests.borrow(), 2);
        assert_eq!(*responses.borrow(), 0);
    }

    #[test]
    fn listener_receives_payload() {
        let observers = Observers::new();
        let seen = Rc::new(RefCell::new(None));
        let s = Rc::clone(&seen);
        observers.subscribe(
            EventListeners::new().on(Event::Headers, move |data| {
                *s.borrow_mut() = data.cloned();
                Ok(())
            }),
            true,
        );

        let data = EventData::Text("hi".into());
        observers.notify(Event::Headers, Some(&data)).unwrap();
        assert_eq!(*seen.borrow(), Some(data));
    }

    #[test]
    fn unsubscribe_stops_delivery() {
        let observers = Observers::new();
        let (count, listener) = counter();
        let sub = observers.subscribe(EventListeners::new().on(Event::Cancel, listener), true);

        observers.unsubscribe(&sub);
        observers.unsubscribe(&sub);
        observers.notify(Event::Cancel, None).unwrap();
        assert_eq!(*count.borrow(), 0);
        assert!(observers.is_empty());
    }

    #[test]
    fn failing_listener_is_removed_when_requested() {
        let observers = Observers::new();
        observers.subscribe(
            EventListeners::new().on(Event::Response, |_| Err("boom".into())),
            true,
        );

        let err = observers.notify(Event::Response, None).unwrap_err();
        assert!(matches!(err, HttpError::Listener { event: "response", .. }));
        assert!(observers.is_empty());
        observers.notify(Event::Response, None).unwrap();
    }

    #[test]
    fn failing_listener_is_kept_when_not_requested() {
        let observers = Observers::new();
        observers.subscribe(
            EventListeners::new().on(Event::Response, |_| Err("boom".into())),
            false,
        );

        assert!(observers.notify(Event::Response, None).is_err());
        assert_eq!(observers.len(), 1);
        assert!(observers.notify(Event::Response, None).is_err());
    }

    #[test]
    fn listener_may_unsubscribe_everything() {
        let observers = Rc::new(Observers::new());
        let (count, listener) = counter();
        let o = Rc::clone(&observers);
        observers.subscribe(
            EventListeners::new().on(Event::Request, move |_| {
                o.unsubscribe_all();
                Ok(())
            }),
            true,
        );
        observers.subscribe(EventListeners::new().on(Event::Request, listener), true);

        observers.notify(Event::Request, None).unwrap();
        assert_eq!(*count.borrow(), 0);
        assert!(observers.is_empty());
    }

    #[test]
    fn unsubscribe_all_when_empty_is_noop() {
        let observers = Observers::new();
        observers.unsubscribe_all();
        assert!(observers.is_empty());
    }
}
