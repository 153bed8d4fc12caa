//! Shared fixtures: a loop that records its stop/run transitions into the
//! same log the test callbacks write to.

#![allow(dead_code)]

use std::cell::RefCell;
use std::rc::Rc;

use syncline::{Error, EventLoop, Reactor, Task};
use syncline_http::{BlockingClient, LoopbackEngine};

pub type Client = BlockingClient<LoopbackEngine<RecordingLoop>, RecordingLoop>;

/// Wraps a [`Reactor`] and logs `"stop"` for every stop request that hits a
/// running loop and `"run-end"` when `run()` returns.
#[derive(Clone)]
pub struct RecordingLoop {
    reactor: Reactor,
    log: Rc<RefCell<Vec<String>>>,
}

impl RecordingLoop {
    pub fn new() -> Self {
        Self {
            reactor: Reactor::new(),
            log: Rc::new(RefCell::new(Vec::new())),
        }
    }

    pub fn reactor(&self) -> &Reactor {
        &self.reactor
    }

    pub fn note(&self, entry: impl Into<String>) {
        self.log.borrow_mut().push(entry.into());
    }

    pub fn log(&self) -> Vec<String> {
        self.log.borrow().clone()
    }

    pub fn count(&self, entry: &str) -> usize {
        self.log.borrow().iter().filter(|e| *e == entry).count()
    }

    pub fn clear(&self) {
        self.log.borrow_mut().clear();
    }
}

impl EventLoop for RecordingLoop {
    fn schedule_once(&self, task: Task) {
        self.reactor.schedule_once(task)
    }

    fn run(&self) -> Result<(), Error> {
        let result = self.reactor.run();
        self.note("run-end");
        result
    }

    fn stop(&self) {
        if self.reactor.is_running() {
            self.note("stop");
        }
        self.reactor.stop()
    }

    fn is_running(&self) -> bool {
        self.reactor.is_running()
    }
}

/// A client over a loopback engine, plus handles to both collaborators.
pub fn setup() -> (Client, LoopbackEngine<RecordingLoop>, RecordingLoop) {
    let event_loop = RecordingLoop::new();
    let engine = LoopbackEngine::new(event_loop.clone());
    let client = BlockingClient::new(engine.clone(), event_loop.clone());
    (client, engine, event_loop)
}
