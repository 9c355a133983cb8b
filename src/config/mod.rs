//! Module: config
//!
//! Purpose: Decoder configuration and its startup validation.
//!
//! Architecture:
//! - `DecoderConfig`: plain thresholds, `Copy`, with installation defaults
//! - `KnockConfig`: thresholds + patterns that passed validation; the only
//!   thing a `Decoder` can be built from
//! - `nvs`: optional persistence of thresholds with schema versioning
//!
//! Validation fails fast: the decoder never starts in an ambiguous state.

use crate::edge::Polarity;
use crate::pattern::Pattern;

pub mod nvs;

/// Hard upper bound for `max_letter_code_length`.
///
/// One past the longest Morse table entry, so an overlong code can still
/// be collected and reported as unknown.
pub const MAX_LETTER_CODE: usize = crate::morse::MAX_CODE_LEN + 1;

/// Hard upper bound for `max_buffer_length` (static allocation).
pub const MAX_BUFFER_CAPACITY: usize = 64;

/// Timing thresholds and sizes for one installation.
///
/// All durations in milliseconds. Ranges are inclusive on the shorter
/// classification: a pulse of exactly `dot_max_ms` is a dot.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DecoderConfig {
    /// Transitions closer than this to the last accepted edge are bounce.
    pub debounce_ms: u32,
    /// Longest ring that still counts as a dot.
    pub dot_max_ms: u32,
    /// Longest ring that still counts as a dash. Longer is noise.
    pub dash_max_ms: u32,
    /// Longest silence that is ordinary spacing inside a letter.
    pub intra_symbol_gap_max_ms: u32,
    /// Longest silence that ends a letter.
    pub letter_gap_max_ms: u32,
    /// Longest silence that ends a word. Longer abandons the sequence.
    pub word_gap_max_ms: u32,
    /// Longest time without any edge, whatever the level.
    pub sequence_timeout_ms: u32,
    /// Elements allowed in one letter before it is discarded as noise.
    pub max_letter_code_length: u8,
    /// Decoded characters kept for pattern matching.
    pub max_buffer_length: u8,
    /// Electrical polarity of the bell input.
    pub polarity: Polarity,
}

impl Default for DecoderConfig {
    fn default() -> Self {
        Self {
            debounce_ms: 20,
            dot_max_ms: 100,
            dash_max_ms: 300,
            intra_symbol_gap_max_ms: 200,
            letter_gap_max_ms: 500,
            word_gap_max_ms: 1000,
            sequence_timeout_ms: 3000,
            max_letter_code_length: 7,
            max_buffer_length: 16,
            polarity: Polarity::ActiveLow,
        }
    }
}

impl DecoderConfig {
    /// Check thresholds and sizes, ignoring patterns.
    pub fn validate(&self) -> Result<(), ConfigError> {
        fn strictly_increasing(values: &[u32]) -> bool {
            values.windows(2).all(|w| w[0] < w[1])
        }

        if !strictly_increasing(&[self.debounce_ms, self.dot_max_ms, self.dash_max_ms]) {
            return Err(ConfigError::PulseThresholdOrder);
        }
        if !strictly_increasing(&[
            self.debounce_ms,
            self.intra_symbol_gap_max_ms,
            self.letter_gap_max_ms,
            self.word_gap_max_ms,
            self.sequence_timeout_ms,
        ]) {
            return Err(ConfigError::GapThresholdOrder);
        }
        if self.dash_max_ms >= self.sequence_timeout_ms {
            return Err(ConfigError::PulseThresholdOrder);
        }
        if self.max_letter_code_length == 0
            || self.max_letter_code_length as usize > MAX_LETTER_CODE
        {
            return Err(ConfigError::LetterCodeLength);
        }
        if self.max_buffer_length == 0 || self.max_buffer_length as usize > MAX_BUFFER_CAPACITY {
            return Err(ConfigError::BufferLength);
        }
        Ok(())
    }
}

/// Validated configuration: thresholds plus the read-only pattern set.
///
/// Patterns are borrowed, they live for the whole process on the device.
#[derive(Clone, Copy, Debug)]
pub struct KnockConfig<'p> {
    decoder: DecoderConfig,
    patterns: &'p [Pattern],
}

impl<'p> KnockConfig<'p> {
    /// Validate thresholds and patterns together.
    pub fn new(decoder: DecoderConfig, patterns: &'p [Pattern]) -> Result<Self, ConfigError> {
        decoder.validate()?;

        if patterns.is_empty() {
            return Err(ConfigError::NoPatterns);
        }

        for (i, pattern) in patterns.iter().enumerate() {
            if pattern.len() > decoder.max_buffer_length as usize {
                return Err(ConfigError::PatternLongerThanBuffer);
            }
            if patterns[..i].iter().any(|p| p.id() == pattern.id()) {
                return Err(ConfigError::DuplicatePatternId);
            }
        }

        Ok(Self { decoder, patterns })
    }

    #[inline]
    pub fn decoder(&self) -> &DecoderConfig {
        &self.decoder
    }

    #[inline]
    pub fn patterns(&self) -> &'p [Pattern] {
        self.patterns
    }
}

/// Configuration error with code and message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigError {
    /// C01: debounce < dot_max < dash_max < sequence_timeout violated
    PulseThresholdOrder,
    /// C02: debounce < intra gap < letter gap < word gap < timeout violated
    GapThresholdOrder,
    /// C03: letter code length outside 1..=MAX_LETTER_CODE
    LetterCodeLength,
    /// C04: buffer length outside 1..=MAX_BUFFER_CAPACITY
    BufferLength,
    /// C05: no pattern configured
    NoPatterns,
    /// C06: pattern text is empty
    EmptyPattern,
    /// C07: pattern id is empty
    EmptyPatternId,
    /// C08: pattern uses a character Morse cannot express
    UnsupportedCharacter(char),
    /// C09: pattern starts or ends with a word separator, or has two in a row
    MisplacedSeparator,
    /// C10: pattern does not fit in the decoded buffer
    PatternLongerThanBuffer,
    /// C11: two patterns share an id
    DuplicatePatternId,
}

impl ConfigError {
    /// Get error code string
    pub fn code(&self) -> &'static str {
        match self {
            Self::PulseThresholdOrder => "C01",
            Self::GapThresholdOrder => "C02",
            Self::LetterCodeLength => "C03",
            Self::BufferLength => "C04",
            Self::NoPatterns => "C05",
            Self::EmptyPattern => "C06",
            Self::EmptyPatternId => "C07",
            Self::UnsupportedCharacter(_) => "C08",
            Self::MisplacedSeparator => "C09",
            Self::PatternLongerThanBuffer => "C10",
            Self::DuplicatePatternId => "C11",
        }
    }

    /// Get error message
    pub fn message(&self) -> &'static str {
        match self {
            Self::PulseThresholdOrder => "pulse thresholds not strictly increasing",
            Self::GapThresholdOrder => "gap thresholds not strictly increasing",
            Self::LetterCodeLength => "letter code length out of range",
            Self::BufferLength => "buffer length out of range",
            Self::NoPatterns => "no pattern configured",
            Self::EmptyPattern => "empty pattern",
            Self::EmptyPatternId => "empty pattern id",
            Self::UnsupportedCharacter(_) => "character not representable in Morse",
            Self::MisplacedSeparator => "misplaced word separator",
            Self::PatternLongerThanBuffer => "pattern longer than buffer",
            Self::DuplicatePatternId => "duplicate pattern id",
        }
    }
}

impl core::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::UnsupportedCharacter(c) => {
                write!(f, "{}: {} ({:?})", self.code(), self.message(), c)
            }
            _ => write!(f, "{}: {}", self.code(), self.message()),
        }
    }
}

impl core::error::Error for ConfigError {}
