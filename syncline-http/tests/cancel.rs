//! Cancellation of individual and all in-flight requests.

mod common;

use std::cell::RefCell;
use std::rc::Rc;

use syncline::EventLoop;
use syncline_http::{ClientError, Event, EventData, EventListeners, Request, Response, Route};

use common::setup;

#[test_log::test]
fn cancel_one_of_several_is_silent_and_keeps_the_loop_running() {
    let (client, engine, event_loop) = setup();
    engine.route("http://test/fast", Route::respond(Response::new(200)));
    engine.route(
        "http://test/slow",
        Route::respond(Response::new(200)).after_ticks(8),
    );
    engine.route(
        "http://test/medium",
        Route::respond(Response::new(200)).after_ticks(3),
    );

    let slow = Request::get("http://test/slow");
    let slow_id = slow.id();

    let (c, ok_loop, err_loop) = (client.clone(), event_loop.clone(), event_loop.clone());
    client
        .request_multi(
            [
                ("fast", Request::get("http://test/fast")),
                ("slow", slow),
                ("medium", Request::get("http://test/medium")),
            ],
            move |key, _| {
                ok_loop.note(format!("ok:{key}"));
                if key == "fast" {
                    c.cancel(slow_id);
                    ok_loop.note(format!("pending:{}", c.pending()));
                }
            },
            move |key, _| err_loop.note(format!("err:{key}")),
        )
        .unwrap();

    assert_eq!(
        event_loop.log(),
        vec!["ok:fast", "pending:1", "stop", "ok:medium", "run-end"]
    );
    assert_eq!(engine.cancelled(), vec![slow_id]);
    assert_eq!(engine.in_flight(), 0);
}

#[test_log::test]
fn cancelling_the_last_entry_ends_the_batch() {
    let (client, engine, event_loop) = setup();
    engine.route("http://test/fast", Route::respond(Response::new(200)));
    engine.route("http://test/stuck", Route::hang());

    let stuck = Request::get("http://test/stuck");
    let stuck_id = stuck.id();

    let delivered = Rc::new(RefCell::new(Vec::new()));
    let (c, d) = (client.clone(), Rc::clone(&delivered));
    client
        .request_multi(
            [("fast", Request::get("http://test/fast")), ("stuck", stuck)],
            move |key, _| {
                d.borrow_mut().push(key);
                c.cancel(stuck_id);
            },
            |_, _| panic!("no failures expected"),
        )
        .unwrap();

    assert_eq!(*delivered.borrow(), vec!["fast"]);
    assert_eq!(event_loop.count("stop"), 1);
    assert_eq!(client.pending(), 0);
    assert_eq!(engine.cancelled(), vec![stuck_id]);
}

#[test_log::test]
fn cancel_all_empties_tracking_and_stops_the_loop() {
    let (client, engine, event_loop) = setup();
    engine.route("http://test/fast", Route::respond(Response::new(200)));
    engine.route("http://test/stuck", Route::hang());
    engine.route(
        "http://test/slow",
        Route::respond(Response::new(200)).after_ticks(50),
    );

    let observed = Rc::new(RefCell::new(Vec::new()));
    let (c, o) = (client.clone(), Rc::clone(&observed));
    client
        .request_multi(
            [
                (0, "http://test/fast"),
                (1, "http://test/stuck"),
                (2, "http://test/slow"),
                (3, "http://test/stuck"),
            ],
            move |key, _| {
                o.borrow_mut().push(format!("ok:{key}"));
                c.cancel_all();
                o.borrow_mut().push(format!("pending:{}", c.pending()));
            },
            move |key, _| panic!("unexpected failure for {key}"),
        )
        .unwrap();

    assert_eq!(*observed.borrow(), vec!["ok:0", "pending:0"]);
    assert_eq!(event_loop.count("stop"), 1);
    assert_eq!(engine.cancelled().len(), 3);
    assert_eq!(engine.in_flight(), 0);
    assert!(!event_loop.is_running());
}

#[test_log::test]
fn cancel_all_leaves_no_residue_for_the_next_call() {
    let (client, engine, _) = setup();
    engine.route("http://test/ok", Route::respond(Response::new(200)));

    // Abandon the batch as soon as its first request goes out; the other
    // kickoffs are still queued when the loop stops.
    let c = client.clone();
    let fired = Rc::new(RefCell::new(false));
    let f = Rc::clone(&fired);
    let sub = client.subscribe(
        EventListeners::new().on(Event::Request, move |_| {
            if !f.replace(true) {
                c.cancel_all();
            }
            Ok(())
        }),
        true,
    );

    let delivered = Rc::new(RefCell::new(0));
    let d = Rc::clone(&delivered);
    client
        .request_multi(
            [(0, "http://test/ok"), (1, "http://test/ok"), (2, "http://test/ok")],
            move |_, _| *d.borrow_mut() += 1,
            |_, _| {},
        )
        .unwrap();
    client.unsubscribe(&sub);

    assert_eq!(*delivered.borrow(), 0);
    assert_eq!(engine.issued().len(), 1);
    assert_eq!(client.pending(), 0);

    // The stale kickoffs run first and do nothing.
    assert_eq!(client.request("http://test/ok").unwrap().status(), 200);
    assert_eq!(engine.issued().len(), 2);
    assert_eq!(engine.in_flight(), 0);
}

#[test_log::test]
fn cancelling_a_single_request_returns_cancelled() {
    let (client, engine, event_loop) = setup();
    engine.route("http://test/stuck", Route::hang());
    engine.route("http://test/ok", Route::respond(Response::new(200)));

    let c = client.clone();
    let sub = client.subscribe(
        EventListeners::new().on(Event::Request, move |data| {
            if let Some(EventData::Request { id, uri }) = data
                && uri.ends_with("/stuck")
            {
                c.cancel(*id);
            }
            Ok(())
        }),
        true,
    );

    let err = client.request("http://test/stuck").unwrap_err();
    assert!(matches!(err, ClientError::Cancelled));
    assert!(!event_loop.is_running());
    assert_eq!(engine.cancelled().len(), 1);

    assert_eq!(client.request("http://test/ok").unwrap().status(), 200);
    client.unsubscribe(&sub);
}

#[test_log::test]
fn cancel_all_during_single_request_returns_cancelled() {
    let (client, engine, _) = setup();
    engine.route(
        "http://test/slow",
        Route::respond(Response::new(200)).after_ticks(10),
    );

    let c = client.clone();
    let sub = client.subscribe(
        EventListeners::new().on(Event::Request, move |_| {
            c.cancel_all();
            Ok(())
        }),
        true,
    );

    assert!(matches!(
        client.request("http://test/slow"),
        Err(ClientError::Cancelled)
    ));
    client.unsubscribe(&sub);
    assert_eq!(engine.in_flight(), 0);
}

#[test_log::test]
fn cancel_while_idle_is_a_no_op() {
    let (client, engine, event_loop) = setup();

    client.cancel(Request::get("http://test/never").id());
    client.cancel_all();

    assert!(event_loop.log().is_empty());
    assert!(engine.cancelled().is_empty());
    assert!(!client.is_busy());
}
