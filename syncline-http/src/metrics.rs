//! syncline-http client metrics.

use metriken::{Counter, Gauge, metric};

#[metric(
    name = "syncline_http/requests/issued",
    description = "Total requests handed to the exchange engine"
)]
pub static REQUESTS_ISSUED: Counter = Counter::new();

#[metric(
    name = "syncline_http/responses",
    description = "Total exchanges completed with a response"
)]
pub static RESPONSES: Counter = Counter::new();

#[metric(
    name = "syncline_http/failures",
    description = "Total exchanges completed with an error"
)]
pub static FAILURES: Counter = Counter::new();

#[metric(
    name = "syncline_http/cancelled",
    description = "Total requests cancelled by the caller"
)]
pub static CANCELLED: Counter = Counter::new();

#[metric(
    name = "syncline_http/invariant_violations",
    description = "Blocking calls whose loop returned without their outcome"
)]
pub static INVARIANT_VIOLATIONS: Counter = Counter::new();

#[metric(
    name = "syncline_http/pending",
    description = "Multi-request entries awaiting completion"
)]
pub static PENDING: Gauge = Gauge::new();
