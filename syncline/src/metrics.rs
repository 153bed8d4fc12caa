//! syncline reactor metrics.

use metriken::{Counter, Gauge, metric};

#[metric(name = "syncline/loop/runs", description = "Total calls to Reactor::run")]
pub static LOOP_RUNS: Counter = Counter::new();

#[metric(
    name = "syncline/loop/stalls",
    description = "Runs that ended because nothing could wake the loop"
)]
pub static LOOP_STALLS: Counter = Counter::new();

#[metric(name = "syncline/tasks/scheduled", description = "Total tasks queued")]
pub static TASKS_SCHEDULED: Counter = Counter::new();

#[metric(name = "syncline/tasks/run", description = "Total tasks executed")]
pub static TASKS_RUN: Counter = Counter::new();

#[metric(
    name = "syncline/tasks/remote",
    description = "Total tasks received from other threads"
)]
pub static TASKS_REMOTE: Counter = Counter::new();

#[metric(name = "syncline/timers/fired", description = "Total timers fired")]
pub static TIMERS_FIRED: Counter = Counter::new();

#[metric(name = "syncline/timers/armed", description = "Currently armed timers")]
pub static TIMERS_ARMED: Gauge = Gauge::new();
