//! Lock-free SPSC (Single Producer, Single Consumer) edge queue.
//!
//! The only channel between the bell GPIO interrupt and the main loop.
//!
//! # Architecture
//!
//! ```text
//! GPIO ISR ──push──▶ EdgeQueue ──pop──▶ main loop ──▶ Decoder
//!  (~100ns)          (lock-free)         (FIFO)
//! ```
//!
//! # Rules
//!
//! - The ISR only records `(level, timestamp)`, never classifies
//! - `push` never blocks: a full ring evicts its oldest entry
//! - Every eviction is counted, nothing is lost silently
//! - All slot fields are atomics, there is no unsafe code here

use core::sync::atomic::{AtomicBool, AtomicU32, Ordering};

/// Default queue size: 64 transitions.
/// A bell line produces a few edges per second, so this only fills up if
/// the main loop stalls for a long time.
pub const DEFAULT_QUEUE_SIZE: usize = 64;

/// One raw transition as seen by the interrupt handler.
///
/// `active` is the logical level after polarity mapping.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RawEdge {
    pub timestamp_ms: i64,
    pub active: bool,
}

/// Ring slot. The timestamp is split into two words so the queue also
/// works on targets without 64-bit atomics (Xtensa).
struct Slot {
    ts_hi: AtomicU32,
    ts_lo: AtomicU32,
    active: AtomicBool,
}

impl Slot {
    const EMPTY: Slot = Slot {
        ts_hi: AtomicU32::new(0),
        ts_lo: AtomicU32::new(0),
        active: AtomicBool::new(false),
    };

    #[inline]
    fn store(&self, edge: RawEdge) {
        let ts = edge.timestamp_ms as u64;
        self.ts_hi.store((ts >> 32) as u32, Ordering::Relaxed);
        self.ts_lo.store(ts as u32, Ordering::Relaxed);
        self.active.store(edge.active, Ordering::Relaxed);
    }

    #[inline]
    fn load(&self) -> RawEdge {
        let hi = self.ts_hi.load(Ordering::Relaxed) as u64;
        let lo = self.ts_lo.load(Ordering::Relaxed) as u64;
        RawEdge {
            timestamp_ms: ((hi << 32) | lo) as i64,
            active: self.active.load(Ordering::Relaxed),
        }
    }
}

/// Bounded drop-oldest SPSC ring of raw edges.
///
/// # Memory Ordering
///
/// - Producer publishes a slot with a `Release` store of `write_idx`
/// - Consumer observes it with an `Acquire` load of `write_idx`
/// - Both sides advance `read_idx` with a CAS: the producer when it evicts,
///   the consumer when it takes. A consumer whose CAS fails lost its entry
///   to eviction and retries with the next one, so a slot that was being
///   overwritten while it was read is never returned.
pub struct EdgeQueue<const N: usize = DEFAULT_QUEUE_SIZE> {
    slots: [Slot; N],
    /// Next write index (monotonically increasing, wraps via mask).
    write_idx: AtomicU32,
    /// Next read index (monotonically increasing, wraps via mask).
    read_idx: AtomicU32,
    /// Entries evicted because the ring was full.
    dropped: AtomicU32,
}

impl<const N: usize> EdgeQueue<N> {
    /// Mask for wrapping index to buffer size.
    /// N must be a power of 2.
    const MASK: usize = N - 1;

    /// Create a new empty queue.
    ///
    /// # Panics
    ///
    /// Panics at compile time if N is not a power of 2.
    pub const fn new() -> Self {
        assert!(N.is_power_of_two(), "Queue size must be power of 2");

        Self {
            slots: [Slot::EMPTY; N],
            write_idx: AtomicU32::new(0),
            read_idx: AtomicU32::new(0),
            dropped: AtomicU32::new(0),
        }
    }

    /// Record a transition (producer side, ISR-safe).
    ///
    /// # Timing
    ///
    /// O(1), never blocks, never allocates.
    #[inline]
    pub fn push(&self, edge: RawEdge) {
        // Single producer: nobody else writes write_idx
        let write = self.write_idx.load(Ordering::Relaxed);
        let read = self.read_idx.load(Ordering::Acquire);

        if write.wrapping_sub(read) >= N as u32 {
            // Full: evict the oldest. If the CAS fails the consumer just took
            // it, which frees the slot just the same.
            if self
                .read_idx
                .compare_exchange(read, read.wrapping_add(1), Ordering::AcqRel, Ordering::Acquire)
                .is_ok()
            {
                self.dropped.fetch_add(1, Ordering::Relaxed);
            }
        }

        self.slots[(write as usize) & Self::MASK].store(edge);
        self.write_idx.store(write.wrapping_add(1), Ordering::Release);
    }

    /// Take the oldest transition (consumer side).
    ///
    /// Returns `None` when the queue is empty.
    #[inline]
    pub fn pop(&self) -> Option<RawEdge> {
        loop {
            let read = self.read_idx.load(Ordering::Acquire);
            let write = self.write_idx.load(Ordering::Acquire);

            if read == write {
                return None;
            }

            let edge = self.slots[(read as usize) & Self::MASK].load();

            if self
                .read_idx
                .compare_exchange(read, read.wrapping_add(1), Ordering::AcqRel, Ordering::Acquire)
                .is_ok()
            {
                return Some(edge);
            }
        }
    }

    /// Number of entries waiting to be consumed.
    #[inline]
    pub fn pending(&self) -> u32 {
        let read = self.read_idx.load(Ordering::Acquire);
        self.write_idx.load(Ordering::Acquire).wrapping_sub(read)
    }

    /// Check if there is nothing to consume.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.pending() == 0
    }

    /// Count of entries evicted since boot (or the last reset).
    #[inline]
    pub fn dropped(&self) -> u32 {
        self.dropped.load(Ordering::Relaxed)
    }

    /// Reset dropped counter (e.g., after reporting).
    #[inline]
    pub fn reset_dropped(&self) {
        self.dropped.store(0, Ordering::Relaxed);
    }

    /// Discard everything pending (consumer side).
    #[inline]
    pub fn clear(&self) {
        while self.pop().is_some() {}
    }

    /// Get the buffer capacity.
    #[inline]
    pub const fn capacity(&self) -> usize {
        N
    }
}

impl<const N: usize> Default for EdgeQueue<N> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn edge(ts: i64, active: bool) -> RawEdge {
        RawEdge { timestamp_ms: ts, active }
    }

    #[test]
    fn test_queue_fifo() {
        let q = EdgeQueue::<8>::new();
        q.push(edge(1, true));
        q.push(edge(2, false));
        q.push(edge(3, true));

        assert_eq!(q.pending(), 3);
        assert_eq!(q.pop(), Some(edge(1, true)));
        assert_eq!(q.pop(), Some(edge(2, false)));
        assert_eq!(q.pop(), Some(edge(3, true)));
        assert_eq!(q.pop(), None);
        assert!(q.is_empty());
    }

    #[test]
    fn test_queue_overflow_drops_oldest() {
        let q = EdgeQueue::<4>::new();
        for ts in 0..6 {
            q.push(edge(ts, ts % 2 == 0));
        }

        assert_eq!(q.dropped(), 2);
        assert_eq!(q.pending(), 4);
        assert_eq!(q.pop().map(|e| e.timestamp_ms), Some(2));
        assert_eq!(q.pop().map(|e| e.timestamp_ms), Some(3));
        assert_eq!(q.pop().map(|e| e.timestamp_ms), Some(4));
        assert_eq!(q.pop().map(|e| e.timestamp_ms), Some(5));
        assert_eq!(q.pop(), None);
    }

    #[test]
    fn test_queue_large_timestamps_survive_split() {
        let q = EdgeQueue::<4>::new();
        let ts = (1i64 << 40) + 12345;
        q.push(edge(ts, true));
        assert_eq!(q.pop(), Some(edge(ts, true)));

        q.push(edge(-7, false));
        assert_eq!(q.pop(), Some(edge(-7, false)));
    }

    #[test]
    fn test_queue_clear_and_reset_dropped() {
        let q = EdgeQueue::<2>::new();
        q.push(edge(1, true));
        q.push(edge(2, false));
        q.push(edge(3, true));
        assert_eq!(q.dropped(), 1);

        q.clear();
        assert!(q.is_empty());

        q.reset_dropped();
        assert_eq!(q.dropped(), 0);
    }

    #[test]
    fn test_queue_concurrent_producer_consumer_keeps_order() {
        use std::sync::Arc;
        use std::thread;

        let q = Arc::new(EdgeQueue::<16>::new());
        let producer = {
            let q = Arc::clone(&q);
            thread::spawn(move || {
                for ts in 0..10_000i64 {
                    q.push(edge(ts, ts % 2 == 0));
                }
            })
        };

        let mut last = -1i64;
        let mut received = 0u32;
        loop {
            match q.pop() {
                Some(e) => {
                    assert!(e.timestamp_ms > last, "entries must stay in order");
                    assert_eq!(e.active, e.timestamp_ms % 2 == 0);
                    last = e.timestamp_ms;
                    received += 1;
                    if last == 9_999 {
                        break;
                    }
                }
                None if producer.is_finished() && q.is_empty() => break,
                None => thread::yield_now(),
            }
        }
        producer.join().unwrap();

        assert_eq!(received + q.dropped(), 10_000);
    }
}
