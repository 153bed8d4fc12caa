use crate::error::Error;

/// A deferred unit of work executed on the loop thread.
pub type Task = Box<dyn FnOnce() + 'static>;

/// A single-threaded run-until-stopped event loop.
///
/// This is the contract the blocking HTTP facade drives. Implementations
/// must never execute a scheduled task inline from `schedule_once`; tasks
/// only run during `run()`.
///
/// # Example
///
/// ```rust
/// use std::cell::Cell;
/// use std::rc::Rc;
/// use syncline::{EventLoop, Reactor};
///
/// let reactor = Reactor::new();
/// let hits = Rc::new(Cell::new(0));
///
/// let (r, h) = (reactor.clone(), Rc::clone(&hits));
/// reactor.schedule_once(Box::new(move || {
///     h.set(h.get() + 1);
///     r.stop();
/// }));
/// assert_eq!(hits.get(), 0);
///
/// reactor.run().unwrap();
/// assert_eq!(hits.get(), 1);
/// ```
pub trait EventLoop {
    /// Queue `task` to run once on a later tick.
    fn schedule_once(&self, task: Task);

    /// Run the loop on the calling thread until [`stop`](Self::stop) is called.
    fn run(&self) -> Result<(), Error>;

    /// Ask a running loop to return from `run()` after the current task.
    /// A no-op when the loop is not running.
    fn stop(&self);

    /// Whether `run()` is currently active.
    fn is_running(&self) -> bool;
}

impl<L: EventLoop + ?Sized> EventLoop for std::rc::Rc<L> {
    fn schedule_once(&self, task: Task) {
        (**self).schedule_once(task)
    }

    fn run(&self) -> Result<(), Error> {
        (**self).run()
    }

    fn stop(&self) {
        (**self).stop()
    }

    fn is_running(&self) -> bool {
        (**self).is_running()
    }
}
