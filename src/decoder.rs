//! Decoder session: the whole ring-to-knock pipeline for one bell line.
//!
//! ```text
//! raw level ─▶ EdgeDetector ─▶ PulseClassifier ─▶ SymbolAccumulator ─▶ sink
//!                                    ▲                  │
//!              tick(now) ── silence ─┘                  └─ PatternMatcher
//! ```
//!
//! One explicit session object, built from validated configuration and
//! owned by the main loop. Nothing here blocks, allocates or fails.
//!
//! # Silence
//!
//! Gaps are normally classified when the next ring ends them. The last
//! letter of an attempt has no next ring, so [`Decoder::tick`] classifies
//! the silence that is still running. Each silence stage (letter gap,
//! word gap, timeout) is reported at most once per silence, whichever of
//! `tick` or the closing edge sees it first.

use crate::accumulator::{DecodedBuffer, SymbolAccumulator, Token};
use crate::classifier::{PulseClassifier, Symbol};
use crate::config::KnockConfig;
use crate::diagnostics::{Counter, Diagnostics};
use crate::edge::{Detection, EdgeDetector, Level};
use crate::pattern::PatternMatcher;
use crate::queue::EdgeQueue;
use crate::sink::{DecoderEvent, EventSink};

/// Coarse decoder state.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DecoderState {
    /// No letter in progress; buffer empty or ending in a character.
    Idle,
    /// Letter in progress.
    InLetter,
    /// No letter in progress; buffer ends with a word separator.
    InWord,
}

/// Ring-signal Morse decoder.
pub struct Decoder<'a> {
    detector: EdgeDetector,
    classifier: PulseClassifier,
    accumulator: SymbolAccumulator,
    matcher: PatternMatcher<'a>,
    diagnostics: &'a Diagnostics,
    sequence_timeout_ms: i64,
    /// Highest silence stage already reported for the current level.
    silence_rank: u8,
}

impl<'a> Decoder<'a> {
    /// Create a decoder in the `Idle` state.
    pub fn new(config: KnockConfig<'a>, diagnostics: &'a Diagnostics) -> Self {
        let cfg = config.decoder();
        Self {
            detector: EdgeDetector::new(cfg.debounce_ms),
            classifier: PulseClassifier::new(cfg),
            accumulator: SymbolAccumulator::new(
                cfg.max_letter_code_length as usize,
                cfg.max_buffer_length as usize,
            ),
            matcher: PatternMatcher::new(config.patterns()),
            diagnostics,
            sequence_timeout_ms: cfg.sequence_timeout_ms as i64,
            silence_rank: 0,
        }
    }

    /// Feed one raw level transition, as recorded by the interrupt.
    pub fn on_raw_level<S: EventSink + ?Sized>(
        &mut self,
        level: Level,
        timestamp_ms: i64,
        sink: &mut S,
    ) {
        match self.detector.on_raw_level(level, timestamp_ms) {
            Detection::Unchanged => {}
            Detection::Bounce => self.diagnostics.record(Counter::Bounce),
            Detection::Baseline(_) => self.silence_rank = 0,
            Detection::Pulse(edge, pulse) => {
                let already_reported = self.silence_rank;
                self.silence_rank = 0;

                let Some(symbol) = self.classifier.classify(pulse) else {
                    return;
                };
                // The poll may have reported this silence already
                if symbol.silence_rank() != 0 && symbol.silence_rank() <= already_reported {
                    return;
                }
                // A stuck line was already counted as noise when it timed out
                if symbol == Symbol::Noise
                    && pulse.level == Level::Active
                    && already_reported >= Symbol::SequenceTimeout.silence_rank()
                {
                    return;
                }
                self.dispatch(symbol, edge.timestamp_ms, sink);
            }
        }
    }

    /// Drain every queued transition in arrival order.
    ///
    /// Returns the number of transitions consumed.
    pub fn drain<S: EventSink + ?Sized, const N: usize>(
        &mut self,
        queue: &EdgeQueue<N>,
        sink: &mut S,
    ) -> usize {
        let mut consumed = 0;
        while let Some(raw) = queue.pop() {
            let level = if raw.active { Level::Active } else { Level::Inactive };
            self.on_raw_level(level, raw.timestamp_ms, sink);
            consumed += 1;
        }
        consumed
    }

    /// Classify silence that no edge has ended yet. Call periodically.
    pub fn tick<S: EventSink + ?Sized>(&mut self, now_ms: i64, sink: &mut S) {
        let Some(last) = self.detector.last_edge() else {
            return;
        };
        let elapsed = now_ms.saturating_sub(last.timestamp_ms);

        let symbol = match self.detector.level() {
            Level::Inactive => self.classifier.classify_silence(elapsed),
            // Line held active: stuck input or a long genuine ring
            Level::Active if elapsed > self.sequence_timeout_ms => {
                if self.silence_rank == 0 {
                    self.dispatch(Symbol::Noise, now_ms, sink);
                }
                Some(Symbol::SequenceTimeout)
            }
            Level::Active => None,
        };

        if let Some(symbol) = symbol {
            if symbol.silence_rank() > self.silence_rank {
                self.silence_rank = symbol.silence_rank();
                self.dispatch(symbol, now_ms, sink);
            }
        }
    }

    fn dispatch<S: EventSink + ?Sized>(&mut self, symbol: Symbol, timestamp_ms: i64, sink: &mut S) {
        if symbol == Symbol::Noise {
            self.diagnostics.record(Counter::Noise);
        }

        let out = self.accumulator.accumulate(symbol, &self.matcher, timestamp_ms);

        if out.overflow {
            self.diagnostics.record(Counter::LetterOverflow);
        }
        if let Some(token) = out.character {
            self.diagnostics.record(Counter::Character);
            if token == Token::Unknown {
                self.diagnostics.record(Counter::UnknownLetter);
            }
            sink.publish(DecoderEvent::CharacterDecoded {
                character: token.as_char(),
                timestamp_ms,
            });
        }
        if let Some(hit) = out.matched {
            self.diagnostics.record(Counter::Match);
            sink.publish(DecoderEvent::PatternMatched {
                pattern_id: hit.pattern_id,
                timestamp_ms: hit.timestamp_ms,
            });
        }
        if out.separator {
            sink.publish(DecoderEvent::CharacterDecoded {
                character: Token::WordSeparator.as_char(),
                timestamp_ms,
            });
        }
        if out.reset {
            self.diagnostics.record(Counter::SequenceReset);
            sink.publish(DecoderEvent::SequenceReset { timestamp_ms });
        }
    }

    /// Abandon everything: letter, buffer and edge history.
    ///
    /// Synchronous and idempotent, publishes nothing. Safe to call at any
    /// time, e.g. from a safety override.
    pub fn reset(&mut self) {
        self.detector.reset();
        self.accumulator.clear();
        self.silence_rank = 0;
    }

    pub fn state(&self) -> DecoderState {
        if !self.accumulator.letter().is_empty() {
            DecoderState::InLetter
        } else if self.accumulator.buffer().last() == Some(Token::WordSeparator) {
            DecoderState::InWord
        } else {
            DecoderState::Idle
        }
    }

    /// Decoded text kept for pattern matching. `Display` renders it.
    #[inline]
    pub fn decoded(&self) -> &DecodedBuffer {
        self.accumulator.buffer()
    }

    /// Elements of the letter in progress.
    #[inline]
    pub fn letter_len(&self) -> usize {
        self.accumulator.letter().len()
    }

    /// Currently accepted line level.
    #[inline]
    pub fn level(&self) -> Level {
        self.detector.level()
    }
}
