//! International Morse alphabet.
//!
//! Static, immutable tables built at compile time. Decoding is a direct
//! index: a code of up to 7 elements maps to `1` followed by one bit per
//! element (dot = 0, dash = 1), so every code has a unique slot in 256.

/// One Morse element.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Element {
    Dot,
    Dash,
}

/// Longest code in [`ALPHABET`].
pub const MAX_CODE_LEN: usize = 7;

/// Character and its code, `.` for dot and `-` for dash.
pub const ALPHABET: &[(u8, &str)] = &[
    (b'A', ".-"),
    (b'B', "-..."),
    (b'C', "-.-."),
    (b'D', "-.."),
    (b'E', "."),
    (b'F', "..-."),
    (b'G', "--."),
    (b'H', "...."),
    (b'I', ".."),
    (b'J', ".---"),
    (b'K', "-.-"),
    (b'L', ".-.."),
    (b'M', "--"),
    (b'N', "-."),
    (b'O', "---"),
    (b'P', ".--."),
    (b'Q', "--.-"),
    (b'R', ".-."),
    (b'S', "..."),
    (b'T', "-"),
    (b'U', "..-"),
    (b'V', "...-"),
    (b'W', ".--"),
    (b'X', "-..-"),
    (b'Y', "-.--"),
    (b'Z', "--.."),
    (b'0', "-----"),
    (b'1', ".----"),
    (b'2', "..---"),
    (b'3', "...--"),
    (b'4', "....-"),
    (b'5', "....."),
    (b'6', "-...."),
    (b'7', "--..."),
    (b'8', "---.."),
    (b'9', "----."),
    (b'.', ".-.-.-"),
    (b',', "--..--"),
    (b'?', "..--.."),
    (b'\'', ".----."),
    (b'!', "-.-.--"),
    (b'/', "-..-."),
    (b'(', "-.--."),
    (b')', "-.--.-"),
    (b'&', ".-..."),
    (b':', "---..."),
    (b';', "-.-.-."),
    (b'=', "-...-"),
    (b'+', ".-.-."),
    (b'-', "-....-"),
    (b'_', "..--.-"),
    (b'"', ".-..-."),
    (b'$', "...-..-"),
    (b'@', ".--.-."),
];

// Code index -> ASCII character, 0 = no entry
static DECODE_TABLE: [u8; 256] = {
    let mut table = [0u8; 256];
    let mut i = 0;
    while i < ALPHABET.len() {
        let (ch, code) = ALPHABET[i];
        let bytes = code.as_bytes();
        let mut idx = 1usize;
        let mut j = 0;
        while j < bytes.len() {
            idx = (idx << 1) | (bytes[j] == b'-') as usize;
            j += 1;
        }
        table[idx] = ch;
        i += 1;
    }
    table
};

// ASCII character -> index into ALPHABET + 1, 0 = not encodable
static ENCODE_TABLE: [u8; 128] = {
    let mut table = [0u8; 128];
    let mut i = 0;
    while i < ALPHABET.len() {
        table[ALPHABET[i].0 as usize] = (i + 1) as u8;
        i += 1;
    }
    table
};

/// Look up a complete letter code.
///
/// Returns `None` for empty, overlong or unassigned codes.
pub fn decode(code: &[Element]) -> Option<char> {
    if code.is_empty() || code.len() > MAX_CODE_LEN {
        return None;
    }

    let idx = code.iter().fold(1usize, |idx, e| {
        (idx << 1) | matches!(e, Element::Dash) as usize
    });

    match DECODE_TABLE[idx] {
        0 => None,
        ch => Some(ch as char),
    }
}

/// Code for a character as a `.`/`-` string, case-insensitive.
pub fn encode(c: char) -> Option<&'static str> {
    if !c.is_ascii() {
        return None;
    }
    match ENCODE_TABLE[c.to_ascii_uppercase() as usize] {
        0 => None,
        n => Some(ALPHABET[n as usize - 1].1),
    }
}

/// Whether Morse can express this character (case-insensitive).
#[inline]
pub fn is_encodable(c: char) -> bool {
    encode(c).is_some()
}

/// Iterate the elements of a `.`/`-` code string.
pub fn elements(code: &str) -> impl Iterator<Item = Element> + '_ {
    code.bytes().map(|b| if b == b'-' { Element::Dash } else { Element::Dot })
}
