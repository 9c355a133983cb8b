//! Secret-knock patterns and the matcher that watches the decoded buffer.
//!
//! Patterns are parsed once at startup and never change. The matcher only
//! looks at the tail of the buffer right after a character was appended;
//! the first pattern in configuration order wins.

use core::fmt;

use crate::accumulator::{DecodedBuffer, Token};
use crate::config::ConfigError;
use crate::morse;

/// Longest pattern text, separators included.
pub const MAX_PATTERN_LEN: usize = 32;

/// A configured target sequence.
#[derive(Clone, Copy)]
pub struct Pattern {
    id: &'static str,
    tokens: [Token; MAX_PATTERN_LEN],
    len: u8,
}

impl Pattern {
    /// Parse pattern text. Case-insensitive, a single space separates words.
    pub fn parse(id: &'static str, text: &str) -> Result<Self, ConfigError> {
        if id.is_empty() {
            return Err(ConfigError::EmptyPatternId);
        }
        if text.is_empty() {
            return Err(ConfigError::EmptyPattern);
        }

        let mut tokens = [Token::WordSeparator; MAX_PATTERN_LEN];
        let mut len = 0usize;
        let mut prev_separator = true;

        for c in text.chars() {
            if len == MAX_PATTERN_LEN {
                return Err(ConfigError::PatternLongerThanBuffer);
            }

            let token = if c == ' ' {
                if prev_separator {
                    return Err(ConfigError::MisplacedSeparator);
                }
                Token::WordSeparator
            } else if morse::is_encodable(c) {
                Token::Char(c.to_ascii_uppercase() as u8)
            } else {
                return Err(ConfigError::UnsupportedCharacter(c));
            };

            prev_separator = token == Token::WordSeparator;
            tokens[len] = token;
            len += 1;
        }

        if prev_separator {
            return Err(ConfigError::MisplacedSeparator);
        }

        Ok(Self {
            id,
            tokens,
            len: len as u8,
        })
    }

    #[inline]
    pub fn id(&self) -> &'static str {
        self.id
    }

    #[inline]
    pub fn tokens(&self) -> &[Token] {
        &self.tokens[..self.len as usize]
    }

    /// Length in tokens, separators included.
    #[inline]
    pub fn len(&self) -> usize {
        self.len as usize
    }

    /// Always false for a parsed pattern.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

impl fmt::Display for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for token in self.tokens() {
            fmt::Write::write_char(f, token.as_char())?;
        }
        Ok(())
    }
}

impl fmt::Debug for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Pattern({} = \"{}\")", self.id, self)
    }
}

/// A pattern completed by the latest character.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MatchEvent {
    pub pattern_id: &'static str,
    pub timestamp_ms: i64,
}

/// Compares the tail of the decoded buffer against every pattern.
#[derive(Clone, Copy, Debug)]
pub struct PatternMatcher<'p> {
    patterns: &'p [Pattern],
}

impl<'p> PatternMatcher<'p> {
    pub fn new(patterns: &'p [Pattern]) -> Self {
        Self { patterns }
    }

    /// Check the buffer after a character (not a separator) was appended.
    ///
    /// At most one match per call: the first pattern in configuration
    /// order that the buffer ends with.
    pub fn on_character_appended(
        &self,
        buffer: &DecodedBuffer,
        timestamp_ms: i64,
    ) -> Option<MatchEvent> {
        if !matches!(buffer.last(), Some(Token::Char(_))) {
            return None;
        }

        self.patterns
            .iter()
            .find(|p| buffer.ends_with(p.tokens()))
            .map(|p| MatchEvent {
                pattern_id: p.id(),
                timestamp_ms,
            })
    }

    #[inline]
    pub fn patterns(&self) -> &'p [Pattern] {
        self.patterns
    }
}
