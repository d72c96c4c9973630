//! # Text Encoder
//!
//! Maps text to a fixed-length sequence of character codes. Input is
//! truncated to `max_length` characters, each character is replaced by its
//! Unicode scalar value clamped to `max_code`, and the tail is zero-padded.
//! Any string, including the empty one, yields exactly `max_length` codes.

/// Code used for positions past the end of the text.
pub const PADDING: u32 = 0;

/// Encode `text` into exactly `max_length` codes, each in `[0, max_code]`.
///
/// # Examples
/// ```
/// use sentinel_core::encoder::encode;
///
/// assert_eq!(encode("AB", 5, 127), vec![65, 66, 0, 0, 0]);
/// assert_eq!(encode("€", 1, 127), vec![127]);
/// ```
pub fn encode(text: &str, max_length: usize, max_code: u32) -> Vec<u32> {
    let mut codes = Vec::with_capacity(max_length);
    encode_into(text, max_length, max_code, &mut codes);
    codes
}

/// Append the encoding of `text` to `out`. Exactly `max_length` codes are pushed.
pub fn encode_into(text: &str, max_length: usize, max_code: u32, out: &mut Vec<u32>) {
    let start = out.len();
    out.extend(text.chars().take(max_length).map(|c| (c as u32).min(max_code)));
    out.resize(start + max_length, PADDING);
}

/// Render codes back to text, stopping at the first padding code.
///
/// Codes that are not valid Unicode scalar values become U+FFFD. Clamped
/// characters cannot be recovered and decode to the character at `max_code`.
pub fn decode(codes: &[u32]) -> String {
    codes
        .iter()
        .take_while(|&&c| c != PADDING)
        .map(|&c| char::from_u32(c).unwrap_or(char::REPLACEMENT_CHARACTER))
        .collect()
}

/// Encoder bound to one sequence width and code ceiling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextEncoder {
    max_length: usize,
    max_code: u32,
}

impl TextEncoder {
    /// Create an encoder emitting `max_length` codes no greater than `max_code`.
    pub fn new(max_length: usize, max_code: u32) -> Self {
        Self {
            max_length,
            max_code,
        }
    }

    pub fn max_length(&self) -> usize {
        self.max_length
    }

    pub fn max_code(&self) -> u32 {
        self.max_code
    }

    pub fn encode(&self, text: &str) -> Vec<u32> {
        encode(text, self.max_length, self.max_code)
    }

    pub fn encode_into(&self, text: &str, out: &mut Vec<u32>) {
        encode_into(text, self.max_length, self.max_code, out);
    }
}
