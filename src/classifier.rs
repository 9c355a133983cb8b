//! Pulse classifier: `(level, duration)` → Morse symbol.
//!
//! Pure function of the pulse and the configured thresholds. No learning,
//! no state: the bell is not a telegraph key, so fixed per-installation
//! thresholds are all that is needed.
//!
//! # Boundaries
//!
//! Every range is closed on its upper end and belongs to the shorter
//! classification:
//!
//! ```text
//! active:    (0, dot_max] Dot | (dot_max, dash_max] Dash | > dash_max Noise
//! inactive:  (0, intra_gap_max] -        | (.., letter_gap_max] LetterGap
//!            (.., word_gap_max] WordGap  | > word_gap_max SequenceTimeout
//! ```

use crate::config::DecoderConfig;
use crate::edge::{Level, Pulse};
use crate::morse::Element;

/// Classified pulse.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Symbol {
    Dot,
    Dash,
    /// Silence long enough to end a letter.
    LetterGap,
    /// Silence long enough to end a word.
    WordGap,
    /// Silence long enough to abandon the whole attempt.
    SequenceTimeout,
    /// Not a Morse unit: overlong ring or impossible duration.
    Noise,
}

impl Symbol {
    /// Element carried by a Dot or Dash.
    #[inline]
    pub fn element(self) -> Option<Element> {
        match self {
            Symbol::Dot => Some(Element::Dot),
            Symbol::Dash => Some(Element::Dash),
            _ => None,
        }
    }

    /// Order of silence symbols: LetterGap < WordGap < SequenceTimeout.
    ///
    /// 0 for everything that is not silence.
    #[inline]
    pub fn silence_rank(self) -> u8 {
        match self {
            Symbol::LetterGap => 1,
            Symbol::WordGap => 2,
            Symbol::SequenceTimeout => 3,
            _ => 0,
        }
    }
}

/// Threshold table copied out of a validated [`DecoderConfig`].
#[derive(Clone, Copy, Debug)]
pub struct PulseClassifier {
    dot_max: i64,
    dash_max: i64,
    intra_gap_max: i64,
    letter_gap_max: i64,
    word_gap_max: i64,
}

impl PulseClassifier {
    pub fn new(config: &DecoderConfig) -> Self {
        Self {
            dot_max: config.dot_max_ms as i64,
            dash_max: config.dash_max_ms as i64,
            intra_gap_max: config.intra_symbol_gap_max_ms as i64,
            letter_gap_max: config.letter_gap_max_ms as i64,
            word_gap_max: config.word_gap_max_ms as i64,
        }
    }

    /// Classify a completed pulse.
    ///
    /// `None` means ordinary spacing inside a letter: nothing to report.
    pub fn classify(&self, pulse: Pulse) -> Option<Symbol> {
        if pulse.duration_ms <= 0 {
            return Some(Symbol::Noise);
        }

        match pulse.level {
            Level::Active => Some(self.classify_ring(pulse.duration_ms)),
            Level::Inactive => self.classify_silence(pulse.duration_ms),
        }
    }

    #[inline]
    fn classify_ring(&self, duration_ms: i64) -> Symbol {
        if duration_ms <= self.dot_max {
            Symbol::Dot
        } else if duration_ms <= self.dash_max {
            Symbol::Dash
        } else {
            Symbol::Noise
        }
    }

    /// Classify a stretch of silence, closed or still running.
    ///
    /// Also used by the silence poll, so a gap classifies the same whether
    /// an edge ends it or the clock does.
    #[inline]
    pub fn classify_silence(&self, duration_ms: i64) -> Option<Symbol> {
        if duration_ms <= self.intra_gap_max {
            None
        } else if duration_ms <= self.letter_gap_max {
            Some(Symbol::LetterGap)
        } else if duration_ms <= self.word_gap_max {
            Some(Symbol::WordGap)
        } else {
            Some(Symbol::SequenceTimeout)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classifier() -> PulseClassifier {
        PulseClassifier::new(&DecoderConfig::default())
    }

    fn ring(ms: i64) -> Pulse {
        Pulse { duration_ms: ms, level: Level::Active }
    }

    fn quiet(ms: i64) -> Pulse {
        Pulse { duration_ms: ms, level: Level::Inactive }
    }

    #[test]
    fn test_ring_classes() {
        let c = classifier();
        assert_eq!(c.classify(ring(40)), Some(Symbol::Dot));
        assert_eq!(c.classify(ring(250)), Some(Symbol::Dash));
        assert_eq!(c.classify(ring(2000)), Some(Symbol::Noise));
    }

    #[test]
    fn test_silence_classes() {
        let c = classifier();
        assert_eq!(c.classify(quiet(50)), None);
        assert_eq!(c.classify(quiet(400)), Some(Symbol::LetterGap));
        assert_eq!(c.classify(quiet(800)), Some(Symbol::WordGap));
        assert_eq!(c.classify(quiet(5000)), Some(Symbol::SequenceTimeout));
    }

    #[test]
    fn test_non_positive_duration_is_noise() {
        let c = classifier();
        assert_eq!(c.classify(ring(0)), Some(Symbol::Noise));
        assert_eq!(c.classify(quiet(-3)), Some(Symbol::Noise));
    }

    #[test]
    fn test_silence_rank_order() {
        assert!(Symbol::LetterGap.silence_rank() < Symbol::WordGap.silence_rank());
        assert!(Symbol::WordGap.silence_rank() < Symbol::SequenceTimeout.silence_rank());
        assert_eq!(Symbol::Dot.silence_rank(), 0);
        assert_eq!(Symbol::Noise.silence_rank(), 0);
    }
}
