//! Module: edge
//!
//! Purpose: Bell line levels, validated edges, and the debouncing edge
//! detector that turns raw level transitions into timed pulses.
//!
//! Architecture:
//! - The ISR records raw `(level, timestamp)` pairs only (see [`crate::queue`])
//! - [`EdgeDetector`] runs in the main loop, never in interrupt context
//! - Each accepted edge closes the previous level and yields one [`Pulse`]
//!
//! Safety: Safe. No unsafe blocks. Copy types only.

/// Logical level of the bell line after polarity mapping.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Level {
    /// Bell is ringing (signal present).
    Active,
    /// Bell is silent.
    Inactive,
}

impl Level {
    #[inline]
    pub const fn is_active(self) -> bool {
        matches!(self, Level::Active)
    }
}

/// Electrical polarity of the bell input.
///
/// Optocoupled bell inputs usually pull the pin low while ringing,
/// hence the default.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum Polarity {
    ActiveHigh,
    #[default]
    ActiveLow,
}

impl Polarity {
    /// Map a raw pin reading to a logical level.
    #[inline]
    pub const fn level(self, pin_high: bool) -> Level {
        match (self, pin_high) {
            (Polarity::ActiveHigh, true) | (Polarity::ActiveLow, false) => Level::Active,
            _ => Level::Inactive,
        }
    }
}

/// A validated level transition.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Edge {
    /// Monotonic time of the transition in milliseconds.
    pub timestamp_ms: i64,
    /// Level the line switched TO.
    pub level: Level,
}

/// A completed stretch of one level, closed by the next accepted edge.
///
/// `duration_ms` is signed so a clock that steps backwards produces a
/// negative duration, which the classifier turns into noise.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Pulse {
    pub duration_ms: i64,
    pub level: Level,
}

/// Result of feeding one raw level report to the detector.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Detection {
    /// Same level as already accepted, nothing happened.
    Unchanged,
    /// Transition inside the debounce window, discarded.
    Bounce,
    /// First transition seen: baseline only, no measurable pulse yet.
    Baseline(Edge),
    /// Transition accepted, the previous level is now complete.
    Pulse(Edge, Pulse),
}

impl Detection {
    /// The completed pulse, if this detection produced one.
    #[inline]
    pub fn pulse(&self) -> Option<Pulse> {
        match self {
            Detection::Pulse(_, pulse) => Some(*pulse),
            _ => None,
        }
    }
}

/// Contact-bounce filter and pulse timer.
///
/// Total and side-effect free apart from its own bookkeeping: it never
/// fails, it only decides whether a transition counts.
pub struct EdgeDetector {
    debounce_ms: i64,
    level: Level,
    last_edge: Option<Edge>,
}

impl EdgeDetector {
    /// Create a detector. The line is assumed idle until told otherwise.
    pub const fn new(debounce_ms: u32) -> Self {
        Self {
            debounce_ms: debounce_ms as i64,
            level: Level::Inactive,
            last_edge: None,
        }
    }

    /// Feed one raw level report.
    pub fn on_raw_level(&mut self, level: Level, timestamp_ms: i64) -> Detection {
        if level == self.level {
            return Detection::Unchanged;
        }

        let edge = Edge { timestamp_ms, level };

        match self.last_edge {
            Some(last) => {
                let elapsed = timestamp_ms.wrapping_sub(last.timestamp_ms);
                if elapsed >= 0 && elapsed < self.debounce_ms {
                    return Detection::Bounce;
                }

                let pulse = Pulse {
                    duration_ms: elapsed,
                    level: self.level,
                };
                self.accept(edge);
                Detection::Pulse(edge, pulse)
            }
            None => {
                self.accept(edge);
                Detection::Baseline(edge)
            }
        }
    }

    #[inline]
    fn accept(&mut self, edge: Edge) {
        self.level = edge.level;
        self.last_edge = Some(edge);
    }

    /// Currently accepted level.
    #[inline]
    pub fn level(&self) -> Level {
        self.level
    }

    /// Last accepted edge, `None` before the first transition.
    #[inline]
    pub fn last_edge(&self) -> Option<Edge> {
        self.last_edge
    }

    /// Forget all edge history. The line is assumed idle again.
    #[inline]
    pub fn reset(&mut self) {
        self.level = Level::Inactive;
        self.last_edge = None;
    }
}
