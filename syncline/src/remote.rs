use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crossbeam_channel::Sender;

/// Work sent to a reactor from another thread.
pub(crate) enum Message {
    /// Run this task on the loop thread.
    Task(Box<dyn FnOnce() + Send + 'static>),
    /// Wake a blocked loop so it re-checks the stop flag.
    Wake,
}

/// `Send` handle for scheduling work onto a [`Reactor`](crate::Reactor)
/// from another thread.
///
/// While any `Remote` is alive the reactor will block waiting for it instead
/// of reporting [`Error::Stalled`](crate::Error::Stalled) when idle. Drop
/// remotes you no longer need.
#[derive(Clone)]
pub struct Remote {
    pub(crate) tx: Sender<Message>,
    pub(crate) stop_flag: Arc<AtomicBool>,
    pub(crate) alive: Arc<()>,
}

impl Remote {
    /// Queue `task` to run on the reactor thread.
    ///
    /// Returns false if the reactor has been dropped.
    pub fn schedule<F>(&self, task: F) -> bool
    where
        F: FnOnce() + Send + 'static,
    {
        self.tx.send(Message::Task(Box::new(task))).is_ok()
    }

    /// Ask the reactor to return from `run()`.
    ///
    /// Has no effect if the reactor is not running when the request is
    /// observed: `run()` clears stale stop requests on entry.
    pub fn stop(&self) {
        self.stop_flag.store(true, Ordering::Release);
        let _ = self.tx.send(Message::Wake);
    }
}

impl Drop for Remote {
    fn drop(&mut self) {
        // Release our share first so the woken loop sees the new count and
        // can report a stall if this was the last remote.
        drop(std::mem::replace(&mut self.alive, Arc::new(())));
        let _ = self.tx.send(Message::Wake);
    }
}

impl std::fmt::Debug for Remote {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Remote").finish_non_exhaustive()
    }
}
