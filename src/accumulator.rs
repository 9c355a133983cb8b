//! Symbol accumulator: dots and dashes → letters → decoded text.
//!
//! Owns the letter in progress and the bounded decoded buffer. Both are
//! statically sized, so memory use is constant whatever the input.

use core::fmt;

use crate::classifier::Symbol;
use crate::config::{MAX_BUFFER_CAPACITY, MAX_LETTER_CODE};
use crate::morse::{self, Element};
use crate::pattern::{MatchEvent, PatternMatcher};

/// Rendering of [`Token::WordSeparator`].
pub const WORD_SEPARATOR: char = ' ';

/// Rendering of [`Token::Unknown`]. Not in the Morse table, so no pattern
/// can contain it.
pub const UNKNOWN_MARKER: char = '*';

/// One entry of the decoded buffer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Token {
    /// Decoded character, upper-case ASCII.
    Char(u8),
    WordSeparator,
    /// Complete code with no entry in the Morse table.
    Unknown,
}

impl Token {
    #[inline]
    pub fn as_char(self) -> char {
        match self {
            Token::Char(c) => c as char,
            Token::WordSeparator => WORD_SEPARATOR,
            Token::Unknown => UNKNOWN_MARKER,
        }
    }

    /// Inverse of [`Token::as_char`] for encodable characters.
    pub fn from_char(c: char) -> Self {
        if c == WORD_SEPARATOR {
            Token::WordSeparator
        } else if morse::is_encodable(c) {
            Token::Char(c.to_ascii_uppercase() as u8)
        } else {
            Token::Unknown
        }
    }
}

/// Elements of the letter in progress.
pub struct LetterCode {
    elements: [Element; MAX_LETTER_CODE],
    len: usize,
    max: usize,
    /// Set once the letter overflowed; the rest of it is swallowed until
    /// the next clear.
    overflowed: bool,
}

impl LetterCode {
    /// `max` is clamped to `1..=MAX_LETTER_CODE`.
    pub fn new(max: usize) -> Self {
        Self {
            elements: [Element::Dot; MAX_LETTER_CODE],
            len: 0,
            max: max.clamp(1, MAX_LETTER_CODE),
            overflowed: false,
        }
    }

    /// Append an element.
    ///
    /// Returns `false` for the element that grows the letter past its
    /// maximum. The whole letter is then dropped, and every later element
    /// is discarded until [`LetterCode::clear`] ends the letter.
    pub fn push(&mut self, element: Element) -> bool {
        if self.overflowed {
            return true;
        }
        if self.len >= self.max {
            self.len = 0;
            self.overflowed = true;
            return false;
        }
        self.elements[self.len] = element;
        self.len += 1;
        true
    }

    #[inline]
    pub fn as_slice(&self) -> &[Element] {
        &self.elements[..self.len]
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Whether the current letter overflowed and is being discarded.
    #[inline]
    pub fn is_discarding(&self) -> bool {
        self.overflowed
    }

    #[inline]
    pub fn clear(&mut self) {
        self.len = 0;
        self.overflowed = false;
    }
}

/// Bounded ring of decoded tokens. The oldest entry is evicted on overflow.
pub struct DecodedBuffer {
    items: [Token; MAX_BUFFER_CAPACITY],
    /// Index of the oldest entry.
    head: usize,
    len: usize,
    capacity: usize,
}

impl DecodedBuffer {
    /// `capacity` is clamped to `1..=MAX_BUFFER_CAPACITY`.
    pub fn new(capacity: usize) -> Self {
        Self {
            items: [Token::WordSeparator; MAX_BUFFER_CAPACITY],
            head: 0,
            len: 0,
            capacity: capacity.clamp(1, MAX_BUFFER_CAPACITY),
        }
    }

    /// Append, evicting the oldest entry when full.
    pub fn push(&mut self, token: Token) {
        if self.len == self.capacity {
            self.head = (self.head + 1) % self.capacity;
            self.len -= 1;
        }
        let idx = (self.head + self.len) % self.capacity;
        self.items[idx] = token;
        self.len += 1;
    }

    /// Entry `i`, counted from the oldest.
    #[inline]
    pub fn get(&self, i: usize) -> Option<Token> {
        (i < self.len).then(|| self.items[(self.head + i) % self.capacity])
    }

    #[inline]
    pub fn last(&self) -> Option<Token> {
        self.len.checked_sub(1).and_then(|i| self.get(i))
    }

    pub fn iter(&self) -> impl Iterator<Item = Token> + '_ {
        (0..self.len).filter_map(move |i| self.get(i))
    }

    /// Whether the newest entries equal `tail`.
    pub fn ends_with(&self, tail: &[Token]) -> bool {
        if tail.is_empty() || tail.len() > self.len {
            return false;
        }
        let start = self.len - tail.len();
        tail.iter()
            .enumerate()
            .all(|(i, t)| self.get(start + i) == Some(*t))
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    #[inline]
    pub fn clear(&mut self) {
        self.head = 0;
        self.len = 0;
    }
}

impl fmt::Display for DecodedBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for token in self.iter() {
            fmt::Write::write_char(f, token.as_char())?;
        }
        Ok(())
    }
}

impl fmt::Debug for DecodedBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "DecodedBuffer(\"{}\", {}/{})", self, self.len, self.capacity)
    }
}

/// What one symbol did to the accumulator, in publication order:
/// character, match, separator, reset.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Accumulated {
    /// Letter flushed into the buffer.
    pub character: Option<Token>,
    /// Pattern completed by `character`. Buffer and letter are cleared.
    pub matched: Option<MatchEvent>,
    /// Word separator appended.
    pub separator: bool,
    /// Buffer abandoned after a long silence.
    pub reset: bool,
    /// Letter dropped because it grew past its maximum length.
    pub overflow: bool,
}

/// Builds letters from symbols and text from letters.
pub struct SymbolAccumulator {
    letter: LetterCode,
    buffer: DecodedBuffer,
}

impl SymbolAccumulator {
    pub fn new(max_letter_code_length: usize, max_buffer_length: usize) -> Self {
        Self {
            letter: LetterCode::new(max_letter_code_length),
            buffer: DecodedBuffer::new(max_buffer_length),
        }
    }

    /// Consume one symbol.
    ///
    /// The matcher is consulted right after a letter lands in the buffer,
    /// before any separator is appended.
    pub fn accumulate(
        &mut self,
        symbol: Symbol,
        matcher: &PatternMatcher<'_>,
        timestamp_ms: i64,
    ) -> Accumulated {
        let mut out = Accumulated::default();

        match symbol {
            Symbol::Dot | Symbol::Dash => {
                if let Some(element) = symbol.element() {
                    out.overflow = !self.letter.push(element);
                }
            }
            Symbol::Noise => self.letter.clear(),
            Symbol::LetterGap => self.flush(matcher, timestamp_ms, &mut out),
            Symbol::WordGap => {
                self.flush(matcher, timestamp_ms, &mut out);
                out.separator = self.push_separator();
            }
            Symbol::SequenceTimeout => {
                self.flush(matcher, timestamp_ms, &mut out);
                self.buffer.clear();
                out.reset = true;
            }
        }

        out
    }

    fn flush(&mut self, matcher: &PatternMatcher<'_>, timestamp_ms: i64, out: &mut Accumulated) {
        if self.letter.is_empty() {
            // Ends an overflowed letter too
            self.letter.clear();
            return;
        }

        let token = match morse::decode(self.letter.as_slice()) {
            Some(c) => Token::Char(c as u8),
            None => Token::Unknown,
        };
        self.letter.clear();
        self.buffer.push(token);
        out.character = Some(token);

        if let Some(hit) = matcher.on_character_appended(&self.buffer, timestamp_ms) {
            self.clear();
            out.matched = Some(hit);
        }
    }

    /// Separators never start the buffer and never repeat.
    fn push_separator(&mut self) -> bool {
        match self.buffer.last() {
            None | Some(Token::WordSeparator) => false,
            Some(_) => {
                self.buffer.push(Token::WordSeparator);
                true
            }
        }
    }

    #[inline]
    pub fn letter(&self) -> &LetterCode {
        &self.letter
    }

    #[inline]
    pub fn buffer(&self) -> &DecodedBuffer {
        &self.buffer
    }

    /// Drop the letter in progress and all decoded text.
    #[inline]
    pub fn clear(&mut self) {
        self.letter.clear();
        self.buffer.clear();
    }
}
