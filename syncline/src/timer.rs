//! Deadline-ordered timer slots for [`Reactor::schedule_after`](crate::Reactor::schedule_after).
//!
//! Each timer holds a slot in a growable pool. Generation counters prevent a
//! stale heap entry from firing a task scheduled into a reused slot.

use std::cmp::Reverse;
use std::collections::BinaryHeap;
use std::time::Instant;

use crate::event_loop::Task;

/// Opaque handle for a pending timer, returned by
/// [`Reactor::schedule_after`](crate::Reactor::schedule_after).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimerId {
    slot: u32,
    generation: u16,
}

/// Heap entry: deadline, insertion sequence (FIFO among equal deadlines),
/// slot, generation.
type Entry = Reverse<(Instant, u64, u32, u16)>;

pub(crate) struct TimerPool {
    tasks: Vec<Option<Task>>,
    generations: Vec<u16>,
    free_list: Vec<u32>,
    heap: BinaryHeap<Entry>,
    seq: u64,
    armed: usize,
}

impl TimerPool {
    pub(crate) fn new() -> Self {
        TimerPool {
            tasks: Vec::new(),
            generations: Vec::new(),
            free_list: Vec::new(),
            heap: BinaryHeap::new(),
            seq: 0,
            armed: 0,
        }
    }

    /// Arm a timer that releases `task` at `deadline`.
    pub(crate) fn insert(&mut self, deadline: Instant, task: Task) -> TimerId {
        let slot = match self.free_list.pop() {
            Some(slot) => slot,
            None => {
                self.tasks.push(None);
                self.generations.push(0);
                (self.tasks.len() - 1) as u32
            }
        };
        let idx = slot as usize;
        self.tasks[idx] = Some(task);
        let generation = self.generations[idx];

        self.seq += 1;
        self.heap.push(Reverse((deadline, self.seq, slot, generation)));
        self.armed += 1;
        TimerId { slot, generation }
    }

    /// Disarm a timer. Returns false if it already fired or was cancelled.
    pub(crate) fn cancel(&mut self, id: TimerId) -> bool {
        self.release(id.slot, id.generation).is_some()
    }

    /// Earliest live deadline, discarding stale heap entries on the way.
    pub(crate) fn next_deadline(&mut self) -> Option<Instant> {
        while let Some(Reverse((deadline, _, slot, generation))) = self.heap.peek().copied() {
            if self.is_live(slot, generation) {
                return Some(deadline);
            }
            self.heap.pop();
        }
        None
    }

    /// Pop the next task whose deadline is at or before `now`.
    pub(crate) fn pop_due(&mut self, now: Instant) -> Option<Task> {
        loop {
            let Reverse((deadline, _, slot, generation)) = self.heap.peek().copied()?;
            if !self.is_live(slot, generation) {
                self.heap.pop();
                continue;
            }
            if deadline > now {
                return None;
            }
            self.heap.pop();
            return self.release(slot, generation);
        }
    }

    /// Number of armed (not yet fired or cancelled) timers.
    pub(crate) fn armed(&self) -> usize {
        self.armed
    }

    fn is_live(&self, slot: u32, generation: u16) -> bool {
        let idx = slot as usize;
        idx < self.tasks.len() && self.generations[idx] == generation && self.tasks[idx].is_some()
    }

    fn release(&mut self, slot: u32, generation: u16) -> Option<Task> {
        if !self.is_live(slot, generation) {
            return None; // stale
        }
        let idx = slot as usize;
        let task = self.tasks[idx].take();
        self.generations[idx] = self.generations[idx].wrapping_add(1);
        self.free_list.push(slot);
        self.armed -= 1;
        task
    }
}
