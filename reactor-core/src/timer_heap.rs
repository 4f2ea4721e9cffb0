//! Timer min-heap — a standard binary heap with intrusive back-pointers,
//! the same "no separate allocation per node, give the owner its
//! position" idea as `Completion::batch_idx`, just mirrored for heap
//! position instead of array slot.

use std::ptr::NonNull;

use crate::completion::Completion;
use crate::operation::Operation;

/// One heap node: the deadline to order by, a back-pointer to the
/// completion ("the heap linkage does not otherwise reveal
/// the container"), and an insertion sequence used to break deadline ties
/// deterministically ("ties break arbitrarily but
/// deterministically by insertion order").
struct TimerEntry {
    deadline_ns: u64,
    seq: u64,
    completion: NonNull<Completion>,
}

fn order_key(e: &TimerEntry) -> (u64, u64) {
    (e.deadline_ns, e.seq)
}

pub struct TimerHeap {
    entries: Vec<TimerEntry>,
    next_seq: u64,
}

impl TimerHeap {
    pub const fn new() -> Self {
        Self {
            entries: Vec::new(),
            next_seq: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn deadline_of(completion: &Completion) -> u64 {
        match completion.operation_ref() {
            Operation::Timer { deadline_ns } => *deadline_ns,
            _ => unreachable!("only Timer operations are inserted into the timer heap"),
        }
    }

    pub fn insert(&mut self, completion: &Completion) {
        let entry = TimerEntry {
            deadline_ns: Self::deadline_of(completion),
            seq: self.next_seq,
            completion: completion.as_nonnull(),
        };
        self.next_seq += 1;
        completion.in_heap.set(true);
        let idx = self.entries.len();
        self.entries.push(entry);
        completion.heap_idx.set(idx);
        self.sift_up(idx);
    }

    /// Peek the completion with the smallest deadline, without removing it.
    pub fn peek_min(&self) -> Option<&'static Completion> {
        self.entries.first().map(|e| {
            // SAFETY: see the crate-level `&'static Completion` storage
            // contract in lib.rs.
            unsafe { e.completion.as_ref() }
        })
    }

    pub fn peek_min_deadline(&self) -> Option<u64> {
        self.entries.first().map(|e| e.deadline_ns)
    }

    /// Remove and return the completion with the smallest deadline.
    pub fn delete_min(&mut self) -> Option<&'static Completion> {
        if self.entries.is_empty() {
            return None;
        }
        Some(self.remove_at(0))
    }

    /// Remove an arbitrary completion, if it is currently inserted
    /// ("requires 'inserted' predicate to decide whether
    /// removal is needed").
    pub fn remove(&mut self, completion: &Completion) -> bool {
        if !completion.in_heap.get() {
            return false;
        }
        let idx = completion.heap_idx.get();
        self.remove_at(idx);
        true
    }

    fn remove_at(&mut self, idx: usize) -> &'static Completion {
        let last = self.entries.len() - 1;
        self.entries.swap(idx, last);
        let removed = self.entries.pop().expect("checked non-empty by caller");
        // SAFETY: storage contract as above.
        let removed_completion: &'static Completion = unsafe { removed.completion.as_ref() };
        removed_completion.in_heap.set(false);
        removed_completion.heap_idx.set(0);

        if idx < self.entries.len() {
            self.fix_completion_idx(idx);
            self.sift_down(idx);
            self.sift_up(idx);
        }
        removed_completion
    }

    fn fix_completion_idx(&self, idx: usize) {
        // SAFETY: storage contract as above.
        let completion = unsafe { self.entries[idx].completion.as_ref() };
        completion.heap_idx.set(idx);
    }

    fn sift_up(&mut self, mut idx: usize) {
        while idx > 0 {
            let parent = (idx - 1) / 2;
            if order_key(&self.entries[parent]) <= order_key(&self.entries[idx]) {
                break;
            }
            self.entries.swap(parent, idx);
            self.fix_completion_idx(parent);
            self.fix_completion_idx(idx);
            idx = parent;
        }
    }

    fn sift_down(&mut self, mut idx: usize) {
        let len = self.entries.len();
        loop {
            let left = 2 * idx + 1;
            let right = 2 * idx + 2;
            let mut smallest = idx;
            if left < len && order_key(&self.entries[left]) < order_key(&self.entries[smallest]) {
                smallest = left;
            }
            if right < len && order_key(&self.entries[right]) < order_key(&self.entries[smallest]) {
                smallest = right;
            }
            if smallest == idx {
                break;
            }
            self.entries.swap(idx, smallest);
            self.fix_completion_idx(idx);
            self.fix_completion_idx(smallest);
            idx = smallest;
        }
    }
}

impl Default for TimerHeap {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod timer_heap_tests {
    use super::*;
    use crate::completion::CallbackAction;
    use crate::event_loop::Loop;
    use crate::result::OpResult;

    fn noop_cb(_: usize, _: &mut Loop, _: &Completion, _: OpResult) -> CallbackAction {
        CallbackAction::Disarm
    }

    fn timer(deadline_ns: u64, user_data: usize) -> Completion {
        Completion::new(Operation::Timer { deadline_ns }, user_data, noop_cb)
    }

    #[test]
    fn delete_min_returns_smallest_deadline_first() {
        let a = timer(300, 1);
        let b = timer(100, 2);
        let c = timer(200, 3);
        let mut heap = TimerHeap::new();
        heap.insert(&a);
        heap.insert(&b);
        heap.insert(&c);

        assert_eq!(heap.delete_min().unwrap().user_data(), 2);
        assert_eq!(heap.delete_min().unwrap().user_data(), 3);
        assert_eq!(heap.delete_min().unwrap().user_data(), 1);
        assert!(heap.is_empty());
    }

    #[test]
    fn ties_break_by_insertion_order() {
        let a = timer(100, 1);
        let b = timer(100, 2);
        let c = timer(100, 3);
        let mut heap = TimerHeap::new();
        heap.insert(&a);
        heap.insert(&b);
        heap.insert(&c);

        assert_eq!(heap.delete_min().unwrap().user_data(), 1);
        assert_eq!(heap.delete_min().unwrap().user_data(), 2);
        assert_eq!(heap.delete_min().unwrap().user_data(), 3);
    }

    #[test]
    fn arbitrary_remove_of_non_root() {
        let a = timer(100, 1);
        let b = timer(50, 2);
        let c = timer(75, 3);
        let mut heap = TimerHeap::new();
        heap.insert(&a);
        heap.insert(&b);
        heap.insert(&c);

        assert!(heap.remove(&c));
        assert!(!heap.remove(&c), "removing twice should report not-inserted");
        assert_eq!(heap.delete_min().unwrap().user_data(), 2);
        assert_eq!(heap.delete_min().unwrap().user_data(), 1);
        assert!(heap.is_empty());
    }

    #[test]
    fn heap_idx_stays_consistent_after_many_ops() {
        let completions: Vec<Completion> = (0..20).map(|i| timer((20 - i) as u64, i)).collect();
        let mut heap = TimerHeap::new();
        for c in &completions {
            heap.insert(c);
        }
        for c in &completions {
            assert!(c.in_heap.get());
            assert_eq!(heap.entries[c.heap_idx.get()].completion, c.as_nonnull());
        }
        // Drain in order; every pop must be non-decreasing.
        let mut last = 0u64;
        while let Some(c) = heap.delete_min() {
            let d = match c.operation_ref() {
                Operation::Timer { deadline_ns } => *deadline_ns,
                _ => unreachable!(),
            };
            assert!(d >= last);
            last = d;
        }
    }
}
