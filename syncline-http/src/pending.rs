//! Per-call bookkeeping for blocking requests.

use std::collections::HashMap;

use crate::error::HttpError;
use crate::metrics;
use crate::request::RequestId;
use crate::response::Response;

/// In-flight requests of one `request_multi` call, mapped to the position of
/// their caller key in that call's batch.
#[derive(Debug, Default)]
pub(crate) struct PendingSet {
    entries: HashMap<RequestId, usize>,
}

impl PendingSet {
    pub(crate) fn insert(&mut self, id: RequestId, slot: usize) {
        if self.entries.insert(id, slot).is_none() {
            metrics::PENDING.increment();
        }
    }

    /// Remove `id`. Returns its key slot, or `None` if it was not tracked.
    pub(crate) fn remove(&mut self, id: RequestId) -> Option<usize> {
        let slot = self.entries.remove(&id)?;
        metrics::PENDING.decrement();
        Some(slot)
    }

    /// Remove every entry, returning the ids that were still tracked.
    pub(crate) fn drain(&mut self) -> Vec<RequestId> {
        let ids: Vec<RequestId> = self.entries.drain().map(|(id, _)| id).collect();
        metrics::PENDING.sub(ids.len() as i64);
        ids
    }

    pub(crate) fn contains(&self, id: RequestId) -> bool {
        self.entries.contains_key(&id)
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Drop for PendingSet {
    fn drop(&mut self) {
        self.drain();
    }
}

/// How the single blocking request ended.
#[derive(Debug)]
pub(crate) enum Outcome {
    Done(Result<Response, HttpError>),
    Cancelled,
}

/// One-shot storage for the outcome of the current `request` call.
#[derive(Debug, Default)]
pub(crate) struct ResultSlot {
    awaiting: Option<RequestId>,
    outcome: Option<Outcome>,
}

impl ResultSlot {
    /// Start waiting for `id`, discarding anything left from a prior call.
    pub(crate) fn arm(&mut self, id: RequestId) {
        self.awaiting = Some(id);
        self.outcome = None;
    }

    pub(crate) fn awaiting(&self) -> Option<RequestId> {
        self.awaiting
    }

    /// Record the outcome for `id`. Returns false, leaving the slot
    /// untouched, if the slot is not waiting for `id` or already holds an
    /// outcome.
    pub(crate) fn fill(&mut self, id: RequestId, outcome: Outcome) -> bool {
        if self.awaiting != Some(id) || self.outcome.is_some() {
            return false;
        }
        self.outcome = Some(outcome);
        true
    }

    /// Take the outcome and disarm the slot.
    pub(crate) fn take(&mut self) -> Option<Outcome> {
        self.awaiting = None;
        self.outcome.take()
    }
}
