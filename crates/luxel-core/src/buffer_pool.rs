//! Generic buffer pool
//!
//! A mutex-protected free list of reusable `Vec<T>` buffers. Hot loops in
//! the encoder acquire scratch buffers per call; pooling keeps those
//! allocations out of the steady state and keeps recently used memory warm.

use std::sync::Mutex;

/// Default number of buffers retained on the free list
pub const DEFAULT_MAX_POOL_SIZE: usize = 16;

#[derive(Debug, Default)]
struct PoolCounters {
    acquires: u64,
    hits: u64,
}

/// Observable pool statistics, exported through the encode stats
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PoolMetrics {
    pub acquire_count: u64,
    pub hit_count: u64,
    pub hit_rate: f64,
    pub free_list_count: usize,
}

/// Thread-safe free list of reusable buffers of element type `T`
pub struct BufferPool<T> {
    free: Mutex<Vec<Vec<T>>>,
    counters: Mutex<PoolCounters>,
    max_pool_size: usize,
}

impl<T> BufferPool<T> {
    pub fn new(max_pool_size: usize) -> Self {
        Self {
            free: Mutex::new(Vec::new()),
            counters: Mutex::new(PoolCounters::default()),
            max_pool_size,
        }
    }

    /// Return an empty buffer with capacity at least `min_cap`.
    ///
    /// A free-listed buffer is reused when one is large enough; otherwise a
    /// new buffer is allocated with capacity rounded up to the next power
    /// of two.
    pub fn acquire(&self, min_cap: usize) -> Vec<T> {
        let mut counters = self.counters.lock().unwrap();
        counters.acquires += 1;

        let mut free = self.free.lock().unwrap();
        if let Some(pos) = free.iter().position(|buf| buf.capacity() >= min_cap) {
            counters.hits += 1;
            return free.swap_remove(pos);
        }
        drop(free);
        drop(counters);

        Vec::with_capacity(min_cap.next_power_of_two().max(1))
    }

    /// Return a buffer to the pool. Length is cleared, capacity kept; the
    /// buffer is dropped instead if the free list is full.
    pub fn release(&self, mut buf: Vec<T>) {
        buf.clear();
        let mut free = self.free.lock().unwrap();
        if free.len() < self.max_pool_size {
            free.push(buf);
        }
    }

    pub fn metrics(&self) -> PoolMetrics {
        let counters = self.counters.lock().unwrap();
        let free_list_count = self.free.lock().unwrap().len();
        let hit_rate = if counters.acquires == 0 {
            0.0
        } else {
            counters.hits as f64 / counters.acquires as f64
        };
        PoolMetrics {
            acquire_count: counters.acquires,
            hit_count: counters.hits,
            hit_rate,
            free_list_count,
        }
    }

    /// Drop every pooled buffer
    pub fn clear(&self) {
        self.free.lock().unwrap().clear();
    }
}

impl<T> Default for BufferPool<T> {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_POOL_SIZE)
    }
}
