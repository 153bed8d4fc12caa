//! Integration tests: drive a `Reactor` through the `EventLoop` contract,
//! with work arriving from local tasks, timers, and other threads.

use std::cell::RefCell;
use std::rc::Rc;
use std::sync::mpsc;
use std::thread;
use std::time::Duration;

use syncline::{ConfigBuilder, Error, EventLoop, Reactor};

/// Runs `f` against any loop through the trait only.
fn run_generic<L: EventLoop>(event_loop: &L) -> Result<(), Error> {
    event_loop.run()
}

#[test_log::test]
fn stop_from_task_returns_control() {
    let reactor = Reactor::new();
    let r = reactor.clone();
    reactor.schedule_once(Box::new(move || r.stop()));

    assert!(run_generic(&reactor).is_ok());
    assert!(!reactor.is_running());
}

#[test_log::test]
fn is_running_only_during_run() {
    let reactor = Reactor::new();
    let observed = Rc::new(RefCell::new(Vec::new()));

    let (r, o) = (reactor.clone(), Rc::clone(&observed));
    reactor.schedule_once(Box::new(move || {
        o.borrow_mut().push(r.is_running());
        r.stop();
    }));

    assert!(!reactor.is_running());
    reactor.run().unwrap();
    assert!(!reactor.is_running());
    assert_eq!(*observed.borrow(), vec![true]);
}

#[test_log::test]
fn runs_are_independent() {
    let reactor = Reactor::new();
    for _ in 0..3 {
        let r = reactor.clone();
        reactor.schedule_once(Box::new(move || r.stop()));
        reactor.run().unwrap();
    }
    assert_eq!(reactor.pending_tasks(), 0);
}

#[test_log::test]
fn worker_thread_completion_wakes_blocked_loop() {
    let reactor = ConfigBuilder::new()
        .tick_timeout_us(0)
        .build()
        .and_then(Reactor::with_config)
        .unwrap();
    let remote = reactor.remote();
    let (tx, rx) = mpsc::channel::<u32>();

    let worker = thread::spawn(move || {
        thread::sleep(Duration::from_millis(5));
        let stopper = remote.clone();
        remote.schedule(move || {
            tx.send(42).unwrap();
            stopper.stop();
        });
    });

    reactor.run().unwrap();
    worker.join().unwrap();
    assert_eq!(rx.try_recv().unwrap(), 42);
}

#[test_log::test]
fn stalled_loop_reports_instead_of_hanging() {
    let reactor = Reactor::new();
    reactor.schedule_once(Box::new(|| {}));
    assert_eq!(reactor.run(), Err(Error::Stalled));
}

#[test_log::test]
fn pending_timer_keeps_loop_alive() {
    let reactor = Reactor::new();
    let fired = Rc::new(RefCell::new(false));
    let (r, f) = (reactor.clone(), Rc::clone(&fired));
    reactor.schedule_after(Duration::from_millis(2), move || {
        *f.borrow_mut() = true;
        r.stop();
    });

    reactor.run().unwrap();
    assert!(*fired.borrow());
}

#[test_log::test]
fn dropping_last_remote_wakes_blocked_loop_to_report_stall() {
    let reactor = ConfigBuilder::new()
        .tick_timeout_us(0)
        .build()
        .and_then(Reactor::with_config)
        .unwrap();
    let remote = reactor.remote();
    let extra = remote.clone();
    drop(extra);

    let worker = thread::spawn(move || {
        thread::sleep(Duration::from_millis(50));
        drop(remote);
    });

    // Blocks on the channel until the worker drops the only remote.
    assert_eq!(reactor.run(), Err(Error::Stalled));
    worker.join().unwrap();
}
