use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::rc::Rc;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender};
use tracing::trace;

use crate::config::Config;
use crate::error::Error;
use crate::event_loop::{EventLoop, Task};
use crate::metrics;
use crate::remote::{Message, Remote};
use crate::timer::{TimerId, TimerPool};

/// Single-threaded run-until-stopped event loop.
///
/// `Reactor` is a cheap handle: clones share the same loop, so tasks can
/// capture a clone to schedule follow-up work or stop the loop. It is not
/// `Send`; use [`Reactor::remote`] to hand work in from other threads.
///
/// Each `run()` call executes ready tasks in FIFO order, promotes timers as
/// their deadlines pass, and returns once [`stop`](EventLoop::stop) is
/// called. Tasks still queued when the loop stops are kept for the next run.
#[derive(Clone)]
pub struct Reactor {
    inner: Rc<Inner>,
}

struct Inner {
    config: Config,
    ready: RefCell<VecDeque<Task>>,
    timers: RefCell<TimerPool>,
    running: Cell<bool>,
    stop_flag: Arc<AtomicBool>,
    tx: Sender<Message>,
    rx: Receiver<Message>,
    /// Shared with every `Remote`. A strong count of 1 means no remote can
    /// wake the loop.
    alive: Arc<()>,
}

/// Clears the running state even if a task panics.
struct RunningGuard<'a>(&'a Cell<bool>);

impl Drop for RunningGuard<'_> {
    fn drop(&mut self) {
        self.0.set(false);
    }
}

impl Default for Reactor {
    fn default() -> Self {
        Self::new()
    }
}

impl Reactor {
    /// Create a reactor with the default configuration.
    pub fn new() -> Self {
        Self::from_valid_config(Config::default())
    }

    /// Create a reactor with a custom configuration.
    pub fn with_config(config: Config) -> Result<Self, Error> {
        config.validate()?;
        Ok(Self::from_valid_config(config))
    }

    fn from_valid_config(config: Config) -> Self {
        let (tx, rx) = crossbeam_channel::unbounded();
        Reactor {
            inner: Rc::new(Inner {
                ready: RefCell::new(VecDeque::with_capacity(config.queue_capacity)),
                config,
                timers: RefCell::new(TimerPool::new()),
                running: Cell::new(false),
                stop_flag: Arc::new(AtomicBool::new(false)),
                tx,
                rx,
                alive: Arc::new(()),
            }),
        }
    }

    /// Queue `task` to run once `delay` has elapsed.
    ///
    /// A zero delay still defers the task to a later tick.
    pub fn schedule_after<F>(&self, delay: Duration, task: F) -> TimerId
    where
        F: FnOnce() + 'static,
    {
        metrics::TIMERS_ARMED.increment();
        self.inner
            .timers
            .borrow_mut()
            .insert(Instant::now() + delay, Box::new(task))
    }

    /// Disarm a timer. Returns false if it already fired or was cancelled.
    pub fn cancel_timer(&self, id: TimerId) -> bool {
        let cancelled = self.inner.timers.borrow_mut().cancel(id);
        if cancelled {
            metrics::TIMERS_ARMED.decrement();
        }
        cancelled
    }

    /// Create a `Send` handle for scheduling work from other threads.
    pub fn remote(&self) -> Remote {
        Remote {
            tx: self.inner.tx.clone(),
            stop_flag: Arc::clone(&self.inner.stop_flag),
            alive: Arc::clone(&self.inner.alive),
        }
    }

    /// Number of tasks waiting in the ready queue.
    pub fn pending_tasks(&self) -> usize {
        self.inner.ready.borrow().len()
    }

    /// Number of armed timers.
    pub fn pending_timers(&self) -> usize {
        self.inner.timers.borrow().armed()
    }

    fn stop_requested(&self) -> bool {
        self.inner.stop_flag.load(Ordering::Acquire)
    }

    fn run_until_stopped(&self) -> Result<(), Error> {
        let batch = self.inner.config.max_tasks_per_tick;
        loop {
            if self.stop_requested() {
                return Ok(());
            }

            self.drain_remote();
            self.promote_due_timers();

            let mut ran = 0;
            while ran < batch {
                // Release the queue borrow before the task runs; tasks schedule.
                let next = self.inner.ready.borrow_mut().pop_front();
                let Some(task) = next else {
                    break;
                };
                task();
                ran += 1;
                metrics::TASKS_RUN.increment();

                if self.stop_requested() {
                    return Ok(());
                }
            }

            if ran == 0 {
                self.wait_for_work()?;
            }
        }
    }

    fn drain_remote(&self) {
        while let Ok(msg) = self.inner.rx.try_recv() {
            self.accept(msg);
        }
    }

    fn accept(&self, msg: Message) {
        match msg {
            Message::Task(task) => {
                metrics::TASKS_REMOTE.increment();
                self.inner.ready.borrow_mut().push_back(task);
            }
            Message::Wake => {}
        }
    }

    fn promote_due_timers(&self) {
        let now = Instant::now();
        loop {
            let due = self.inner.timers.borrow_mut().pop_due(now);
            let Some(task) = due else {
                break;
            };
            metrics::TIMERS_FIRED.increment();
            metrics::TIMERS_ARMED.decrement();
            self.inner.ready.borrow_mut().push_back(task);
        }
    }

    /// Block until a remote message arrives, the next timer is due, or the
    /// tick timeout elapses.
    fn wait_for_work(&self) -> Result<(), Error> {
        let next_deadline = self.inner.timers.borrow_mut().next_deadline();

        if next_deadline.is_none()
            && Arc::strong_count(&self.inner.alive) == 1
            && self.inner.rx.is_empty()
        {
            metrics::LOOP_STALLS.increment();
            return Err(Error::Stalled);
        }

        let tick = match self.inner.config.tick_timeout_us {
            0 => None,
            us => Some(Duration::from_micros(us)),
        };
        let wait = match (next_deadline, tick) {
            (Some(deadline), Some(tick)) => {
                Some(deadline.saturating_duration_since(Instant::now()).min(tick))
            }
            (Some(deadline), None) => Some(deadline.saturating_duration_since(Instant::now())),
            (None, tick) => tick,
        };

        let msg = match wait {
            Some(wait) => match self.inner.rx.recv_timeout(wait) {
                Ok(msg) => Some(msg),
                Err(RecvTimeoutError::Timeout | RecvTimeoutError::Disconnected) => None,
            },
            None => self.inner.rx.recv().ok(),
        };
        if let Some(msg) = msg {
            self.accept(msg);
        }
        Ok(())
    }
}

impl EventLoop for Reactor {
    fn schedule_once(&self, task: Task) {
        metrics::TASKS_SCHEDULED.increment();
        self.inner.ready.borrow_mut().push_back(task);
    }

    fn run(&self) -> Result<(), Error> {
        if self.inner.running.replace(true) {
            return Err(Error::AlreadyRunning);
        }
        let _running = RunningGuard(&self.inner.running);

        // A stop issued while idle must not cut this run short.
        self.inner.stop_flag.store(false, Ordering::Release);
        metrics::LOOP_RUNS.increment();
        trace!(
            ready = self.pending_tasks(),
            timers = self.pending_timers(),
            "event loop started"
        );

        let result = self.run_until_stopped();
        trace!(ready = self.pending_tasks(), ?result, "event loop stopped");
        result
    }

    fn stop(&self) {
        if self.inner.running.get() {
            self.inner.stop_flag.store(true, Ordering::Release);
        }
    }

    fn is_running(&self) -> bool {
        self.inner.running.get()
    }
}

impl std::fmt::Debug for Reactor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Reactor")
            .field("running", &self.inner.running.get())
            .field("ready", &self.pending_tasks())
            .field("timers", &self.pending_timers())
            .finish()
    }
}
