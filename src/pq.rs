//! Indexed binary max-heap over a fixed id domain.
//!
//! Every id in `0..capacity` can hold at most one key. Keys can be raised or
//! lowered in place, which `std::collections::BinaryHeap` can't do without
//! lazy-deletion entries.

/// Max-priority queue keyed by `u32` ids with mutable `i64` keys.
///
/// Ties are broken towards the smaller id so the extraction order is fully
/// determined by the keys.
#[derive(Debug, Clone)]
pub struct IndexMaxPq {
    /// heap slot -> id
    heap: Vec<u32>,
    /// id -> heap slot
    slot: Vec<Option<usize>>,
    /// id -> key
    keys: Vec<i64>,
}

impl IndexMaxPq {
    /// Creates an empty queue for ids in `0..capacity`.
    pub fn new(capacity: usize) -> Self {
        Self {
            heap: Vec::with_capacity(capacity),
            slot: vec![None; capacity],
            keys: vec![0; capacity],
        }
    }

    pub fn capacity(&self) -> usize {
        self.slot.len()
    }

    pub fn len(&self) -> usize {
        self.heap.len()
    }

    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    pub fn contains(&self, id: u32) -> bool {
        self.slot.get(id as usize).is_some_and(|s| s.is_some())
    }

    /// Inserts `id` with `key`, or updates its key if already present.
    ///
    /// # Panics
    ///
    /// Panics if `id` is outside the domain given at construction.
    pub fn push(&mut self, id: u32, key: i64) {
        let i = id as usize;
        assert!(i < self.slot.len(), "Id {} outside queue domain", id);

        match self.slot[i] {
            Some(s) => {
                let old = self.keys[i];
                self.keys[i] = key;
                if key > old {
                    self.sift_up(s);
                } else if key < old {
                    self.sift_down(s);
                }
            }
            None => {
                self.keys[i] = key;
                self.heap.push(id);
                let s = self.heap.len() - 1;
                self.slot[i] = Some(s);
                self.sift_up(s);
            }
        }
    }

    /// Peeks at the maximum as `(key, id)` without removing it.
    pub fn get_max(&self) -> Option<(i64, u32)> {
        self.heap.first().map(|&id| (self.keys[id as usize], id))
    }

    /// Removes and returns the maximum as `(key, id)`.
    pub fn pop_max(&mut self) -> Option<(i64, u32)> {
        let top = self.get_max()?;
        let last = self.heap.len() - 1;
        self.swap(0, last);
        self.heap.pop();
        self.slot[top.1 as usize] = None;
        if !self.heap.is_empty() {
            self.sift_down(0);
        }
        Some(top)
    }

    /// Current key of `id`, `None` if it was never pushed.
    pub fn get_key(&self, id: u32) -> Option<i64> {
        self.contains(id).then(|| self.keys[id as usize])
    }

    /// True if heap slot `a` should sit above slot `b`.
    #[inline]
    fn above(&self, a: usize, b: usize) -> bool {
        let (ia, ib) = (self.heap[a], self.heap[b]);
        let (ka, kb) = (self.keys[ia as usize], self.keys[ib as usize]);
        ka > kb || (ka == kb && ia < ib)
    }

    fn swap(&mut self, a: usize, b: usize) {
        self.heap.swap(a, b);
        self.slot[self.heap[a] as usize] = Some(a);
        self.slot[self.heap[b] as usize] = Some(b);
    }

    fn sift_up(&mut self, mut s: usize) {
        while s > 0 {
            let parent = (s - 1) / 2;
            if !self.above(s, parent) {
                break;
            }
            self.swap(s, parent);
            s = parent;
        }
    }

    fn sift_down(&mut self, mut s: usize) {
        let n = self.heap.len();
        loop {
            let left = 2 * s + 1;
            if left >= n {
                break;
            }
            let right = left + 1;
            let child = if right < n && self.above(right, left) {
                right
            } else {
                left
            };
            if !self.above(child, s) {
                break;
            }
            self.swap(s, child);
            s = child;
        }
    }
}
