//! Decoder diagnostics.
//!
//! Runtime anomalies on the bell line are never errors: they are
//! recovered locally and counted here. Counters are atomics so a
//! telemetry task can read them while the main loop decodes.

use core::sync::atomic::{AtomicU32, Ordering};

/// What is being counted.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum Counter {
    /// Transition rejected inside the debounce window.
    Bounce = 0,
    /// Pulse classified as noise (overlong ring or impossible duration).
    Noise = 1,
    /// Letter discarded for growing past its maximum length.
    LetterOverflow = 2,
    /// Letter with no entry in the Morse table.
    UnknownLetter = 3,
    /// Character appended to the decoded buffer.
    Character = 4,
    /// Pattern matched.
    Match = 5,
    /// Sequence abandoned after a long silence.
    SequenceReset = 6,
}

const COUNTERS: usize = 7;

/// Thread-safe counter block.
///
/// # Usage
///
/// ```ignore
/// static DIAG: Diagnostics = Diagnostics::new();
///
/// // In the main loop:
/// let mut decoder = Decoder::new(config, &DIAG);
///
/// // In a telemetry task:
/// let snap = DIAG.snapshot();
/// ```
pub struct Diagnostics {
    counts: [AtomicU32; COUNTERS],
}

impl Diagnostics {
    /// Create a zeroed counter block.
    pub const fn new() -> Self {
        const ZERO: AtomicU32 = AtomicU32::new(0);
        Self {
            counts: [ZERO; COUNTERS],
        }
    }

    /// Count one occurrence. Saturates instead of wrapping.
    #[inline]
    pub fn record(&self, counter: Counter) {
        let _ = self.counts[counter as usize].fetch_update(
            Ordering::Relaxed,
            Ordering::Relaxed,
            |n| n.checked_add(1),
        );
    }

    #[inline]
    pub fn get(&self, counter: Counter) -> u32 {
        self.counts[counter as usize].load(Ordering::Relaxed)
    }

    /// Zero every counter (e.g. after reporting).
    pub fn clear(&self) {
        for c in &self.counts {
            c.store(0, Ordering::Relaxed);
        }
    }

    /// Get a snapshot of all counters at a point in time.
    pub fn snapshot(&self) -> DiagnosticsSnapshot {
        DiagnosticsSnapshot {
            bounces: self.get(Counter::Bounce),
            noise: self.get(Counter::Noise),
            letter_overflows: self.get(Counter::LetterOverflow),
            unknown_letters: self.get(Counter::UnknownLetter),
            characters: self.get(Counter::Character),
            matches: self.get(Counter::Match),
            sequence_resets: self.get(Counter::SequenceReset),
        }
    }
}

impl Default for Diagnostics {
    fn default() -> Self {
        Self::new()
    }
}

/// Snapshot of the counters.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DiagnosticsSnapshot {
    pub bounces: u32,
    pub noise: u32,
    pub letter_overflows: u32,
    pub unknown_letters: u32,
    pub characters: u32,
    pub matches: u32,
    pub sequence_resets: u32,
}
