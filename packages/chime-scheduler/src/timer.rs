use crate::task::Task;
use slotmap::{Key, KeyData, SlotMap, new_key_type};
use std::cmp::Ordering;
use std::collections::BinaryHeap;

new_key_type! {
    /// Handle returned when a timer is scheduled; used to cancel it.
    pub struct TimerId;
}

impl TimerId {
    /// Stable integer form of the handle, suitable for handing to script hosts.
    pub fn as_u64(self) -> u64 {
        self.data().as_ffi()
    }

    /// Rebuild a handle from [`TimerId::as_u64`]. Values that never came from
    /// a scheduler produce a handle that matches no timer.
    pub fn from_u64(raw: u64) -> Self {
        TimerId::from(KeyData::from_ffi(raw))
    }
}

/// A scheduled timer. Mutated only by cancellation, which drops the callback.
pub struct TimerEntry {
    pub fire_at: u64,
    seq: u64,
    callback: Option<Task>,
    cancelled: bool,
}

impl TimerEntry {
    pub fn is_cancelled(&self) -> bool {
        self.cancelled
    }
}

/// Heap slot pointing at a timer entry.
///
/// The comparison is **reversed** so that a `BinaryHeap<Deadline>` pops the
/// earliest `fire_at` first, and among equal deadlines the earliest `seq`.
#[derive(Debug, Clone, Copy)]
struct Deadline {
    fire_at: u64,
    seq: u64,
    id: TimerId,
}

impl PartialEq for Deadline {
    fn eq(&self, other: &Self) -> bool {
        self.fire_at == other.fire_at && self.seq == other.seq
    }
}

impl Eq for Deadline {}

impl Ord for Deadline {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .fire_at
            .cmp(&self.fire_at)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

impl PartialOrd for Deadline {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Timers ordered by deadline, FIFO among equal deadlines.
///
/// Entries live in a slot map so stale handles (fired or cancelled timers)
/// simply stop resolving. The heap is pruned lazily: a cancelled entry is
/// removed once it reaches the front.
#[derive(Default)]
pub struct TimerQueue {
    entries: SlotMap<TimerId, TimerEntry>,
    heap: BinaryHeap<Deadline>,
    next_seq: u64,
    pending: usize,
}

impl TimerQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, fire_at: u64, callback: Task) -> TimerId {
        let seq = self.next_seq;
        self.next_seq += 1;

        let id = self.entries.insert(TimerEntry {
            fire_at,
            seq,
            callback: Some(callback),
            cancelled: false,
        });
        self.heap.push(Deadline { fire_at, seq, id });
        self.pending += 1;
        id
    }

    /// Marks a pending timer cancelled. Returns `false` for unknown, fired or
    /// already cancelled timers.
    pub fn cancel(&mut self, id: TimerId) -> bool {
        match self.entries.get_mut(id) {
            Some(entry) if !entry.cancelled => {
                entry.cancelled = true;
                entry.callback = None;
                self.pending -= 1;
                true
            }
            _ => false,
        }
    }

    pub fn get(&self, id: TimerId) -> Option<&TimerEntry> {
        self.entries.get(id)
    }

    /// Deadline of the earliest live timer.
    pub fn next_deadline(&mut self) -> Option<u64> {
        self.prune();
        self.heap.peek().map(|d| d.fire_at)
    }

    /// Removes and returns the earliest live timer, provided its deadline is
    /// at or before `limit` (no limit when `None`).
    pub fn pop_due(&mut self, limit: Option<u64>) -> Option<(TimerId, u64, Task)> {
        loop {
            let head = *self.heap.peek()?;
            if limit.is_some_and(|limit| head.fire_at > limit) {
                return None;
            }
            self.heap.pop();

            let Some(mut entry) = self.entries.remove(head.id) else {
                continue;
            };
            if entry.cancelled {
                continue;
            }
            if let Some(callback) = entry.callback.take() {
                self.pending -= 1;
                return Some((head.id, entry.fire_at, callback));
            }
        }
    }

    /// Number of timers that will still fire.
    pub fn pending(&self) -> usize {
        self.pending
    }

    pub fn is_empty(&self) -> bool {
        self.pending == 0
    }

    fn prune(&mut self) {
        while let Some(head) = self.heap.peek() {
            let live = self
                .entries
                .get(head.id)
                .is_some_and(|entry| !entry.cancelled && entry.seq == head.seq);
            if live {
                break;
            }
            let id = head.id;
            self.heap.pop();
            self.entries.remove(id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn noop() -> Task {
        Box::new(|| {})
    }

    #[test]
    fn pops_by_deadline_then_insertion_order() {
        let mut timers = TimerQueue::new();
        let late = timers.insert(20, noop());
        let first = timers.insert(10, noop());
        let second = timers.insert(10, noop());

        let order: Vec<_> = std::iter::from_fn(|| timers.pop_due(None))
            .map(|(id, fire_at, _)| (id, fire_at))
            .collect();

        assert_eq!(order, vec![(first, 10), (second, 10), (late, 20)]);
        assert!(timers.is_empty());
    }

    #[test]
    fn cancelled_timers_are_skipped() {
        let mut timers = TimerQueue::new();
        let a = timers.insert(5, noop());
        let b = timers.insert(6, noop());

        assert!(timers.cancel(a));
        assert!(!timers.cancel(a), "second cancel is a no-op");
        assert!(timers.get(a).is_some_and(TimerEntry::is_cancelled));
        assert_eq!(timers.pending(), 1);
        assert_eq!(timers.next_deadline(), Some(6));
        assert!(timers.get(a).is_none(), "pruned once it reached the front");

        let (id, _, _) = timers.pop_due(None).unwrap();
        assert_eq!(id, b);
        assert!(timers.pop_due(None).is_none());
    }

    #[test]
    fn limit_holds_back_future_timers() {
        let mut timers = TimerQueue::new();
        timers.insert(100, noop());

        assert!(timers.pop_due(Some(99)).is_none());
        assert_eq!(timers.pending(), 1);
        assert!(timers.pop_due(Some(100)).is_some());
    }

    #[test]
    fn ids_round_trip_through_integers() {
        let mut timers = TimerQueue::new();
        let id = timers.insert(1, noop());

        assert_eq!(TimerId::from_u64(id.as_u64()), id);
        assert!(!timers.cancel(TimerId::from_u64(u64::MAX)));
    }

    #[test]
    fn fired_ids_no_longer_cancel() {
        let mut timers = TimerQueue::new();
        let id = timers.insert(0, noop());
        timers.pop_due(None);

        assert!(!timers.cancel(id));
    }
}
