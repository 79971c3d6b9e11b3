// Copyright 2025 the Sable authors
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! One-shot timer bookkeeping for an event loop.
//!
//! Owned and driven exclusively by the loop's own thread; cross-thread
//! callers only ever *submit* timers through the loop's queue. One-shot
//! timers cannot be canceled or rescheduled once submitted — callers
//! needing cancellation want a stateful timer object, which is outside
//! this substrate.

/// A deferred callable to be fired at a point on some loop clock.
type TimerCall = Box<dyn FnOnce() + Send + 'static>;

struct Entry<T> {
    fire_at: T,
    seq: u64,
    call: TimerCall,
}

/// An ordered list of pending one-shot timers on a single clock.
///
/// Generic over the clock's time-point type so one implementation serves
/// both app-time and display-time timers.
pub(crate) struct TimerList<T: Copy + Ord> {
    // Sorted by (fire_at, seq); seq breaks ties in submission order.
    entries: Vec<Entry<T>>,
    next_seq: u64,
}

impl<T: Copy + Ord> TimerList<T> {
    pub(crate) fn new() -> Self {
        TimerList {
            entries: Vec::new(),
            next_seq: 0,
        }
    }

    /// Registers a one-shot timer.
    pub(crate) fn add(&mut self, fire_at: T, call: TimerCall) {
        let seq = self.next_seq;
        self.next_seq += 1;
        let key = (fire_at, seq);
        let pos = self
            .entries
            .partition_point(|e| (e.fire_at, e.seq) <= key);
        self.entries.insert(pos, Entry { fire_at, seq, call });
    }

    /// The earliest pending deadline, if any.
    pub(crate) fn next_deadline(&self) -> Option<T> {
        self.entries.first().map(|e| e.fire_at)
    }

    /// Removes and returns every timer due at or before `now`, in firing
    /// order.
    pub(crate) fn take_due(&mut self, now: T) -> Vec<TimerCall> {
        let due = self.entries.partition_point(|e| e.fire_at <= now);
        self.entries
            .drain(..due)
            .map(|e| e.call)
            .collect()
    }

    #[cfg(test)]
    pub(crate) fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn recorder(order: &Arc<std::sync::Mutex<Vec<u32>>>, tag: u32) -> TimerCall {
        let order = order.clone();
        Box::new(move || order.lock().unwrap().push(tag))
    }

    #[test]
    fn fires_in_deadline_order() {
        let order = Arc::new(std::sync::Mutex::new(Vec::new()));
        let mut timers = TimerList::new();
        timers.add(30i64, recorder(&order, 3));
        timers.add(10i64, recorder(&order, 1));
        timers.add(20i64, recorder(&order, 2));

        assert_eq!(timers.next_deadline(), Some(10));
        for call in timers.take_due(25) {
            call();
        }
        assert_eq!(*order.lock().unwrap(), vec![1, 2]);
        assert_eq!(timers.next_deadline(), Some(30));
    }

    #[test]
    fn equal_deadlines_fire_in_submission_order() {
        let order = Arc::new(std::sync::Mutex::new(Vec::new()));
        let mut timers = TimerList::new();
        timers.add(5i64, recorder(&order, 1));
        timers.add(5i64, recorder(&order, 2));
        timers.add(5i64, recorder(&order, 3));

        for call in timers.take_due(5) {
            call();
        }
        assert_eq!(*order.lock().unwrap(), vec![1, 2, 3]);
        assert!(timers.is_empty());
    }

    #[test]
    fn nothing_due_before_deadline() {
        let fired = Arc::new(AtomicUsize::new(0));
        let mut timers = TimerList::new();
        {
            let fired = fired.clone();
            timers.add(100i64, Box::new(move || {
                fired.fetch_add(1, Ordering::SeqCst);
            }));
        }
        assert!(timers.take_due(99).is_empty());
        assert_eq!(fired.load(Ordering::SeqCst), 0);
        assert_eq!(timers.take_due(100).len(), 1);
    }
}
