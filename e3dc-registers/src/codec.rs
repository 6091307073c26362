//! Register word codec
//!
//! Holding registers are 16-bit words transmitted big-endian. Multi-word
//! integers put the high word first. Strings occupy a fixed number of
//! words, UTF-8 payload first, right-padded with NUL bytes.

use crate::error::{DecodeError, EncodeError};

/// Cursor over the words returned by one register read
///
/// Every `decode_*` call consumes words from the front. Asking for more
/// words than remain is a mismatch between a field descriptor and the read
/// that produced the words, and panics.
///
/// # Example
///
/// ```rust
/// use e3dc_registers::RegisterDecoder;
///
/// let words = [0x0001, 0x4500, 0x0000];
/// let mut decoder = RegisterDecoder::new(&words);
///
/// assert_eq!(decoder.decode_u16(), 1);
/// assert_eq!(decoder.decode_fixed_string(2).unwrap(), "E");
/// assert_eq!(decoder.remaining(), 0);
/// ```
#[derive(Debug, Clone)]
pub struct RegisterDecoder<'a> {
    words: &'a [u16],
    position: usize,
}

impl<'a> RegisterDecoder<'a> {
    /// Create a decoder positioned at the first word
    pub fn new(words: &'a [u16]) -> Self {
        Self { words, position: 0 }
    }

    /// Number of words not yet consumed
    pub fn remaining(&self) -> usize {
        self.words.len() - self.position
    }

    fn take(&mut self, count: usize) -> &'a [u16] {
        assert!(
            count <= self.remaining(),
            "register block overrun: {} words requested at offset {}, {} available",
            count,
            self.position,
            self.remaining()
        );
        let words = &self.words[self.position..self.position + count];
        self.position += count;
        words
    }

    /// Consume one word as an unsigned integer
    pub fn decode_u16(&mut self) -> u16 {
        self.take(1)[0]
    }

    /// Consume one word as a two's complement integer
    pub fn decode_i16(&mut self) -> i16 {
        self.decode_u16() as i16
    }

    /// Consume two words, high word first
    pub fn decode_u32(&mut self) -> u32 {
        let words = self.take(2);
        (u32::from(words[0]) << 16) | u32::from(words[1])
    }

    /// Consume two words as a two's complement integer, high word first
    pub fn decode_i32(&mut self) -> i32 {
        self.decode_u32() as i32
    }

    /// Consume `word_count` words as a NUL-terminated UTF-8 string
    ///
    /// Everything from the first NUL byte on is ignored. A block without any
    /// NUL uses all `2 * word_count` bytes.
    pub fn decode_fixed_string(&mut self, word_count: usize) -> Result<String, DecodeError> {
        let bytes: Vec<u8> = self
            .take(word_count)
            .iter()
            .flat_map(|word| word.to_be_bytes())
            .collect();

        let end = bytes.iter().position(|&b| b == 0).unwrap_or(bytes.len());
        let text = std::str::from_utf8(&bytes[..end])?;
        Ok(text.to_string())
    }
}

/// Builder for register words, the inverse of [`RegisterDecoder`]
#[derive(Debug, Clone, Default)]
pub struct RegisterEncoder {
    words: Vec<u16>,
}

impl RegisterEncoder {
    /// Create an empty encoder
    pub fn new() -> Self {
        Self::default()
    }

    pub fn encode_u16(&mut self, value: u16) -> &mut Self {
        self.words.push(value);
        self
    }

    pub fn encode_i16(&mut self, value: i16) -> &mut Self {
        self.encode_u16(value as u16)
    }

    pub fn encode_u32(&mut self, value: u32) -> &mut Self {
        self.words.push((value >> 16) as u16);
        self.words.push(value as u16);
        self
    }

    pub fn encode_i32(&mut self, value: i32) -> &mut Self {
        self.encode_u32(value as u32)
    }

    /// Append `value` as a `word_count` word block, right-padded with NUL
    pub fn encode_fixed_string(
        &mut self,
        value: &str,
        word_count: usize,
    ) -> Result<&mut Self, EncodeError> {
        let capacity = word_count * 2;
        if value.len() > capacity {
            return Err(EncodeError::StringTooLong {
                len: value.len(),
                capacity,
            });
        }
        if value.as_bytes().contains(&0) {
            return Err(EncodeError::InteriorNul);
        }

        let mut bytes = value.as_bytes().to_vec();
        bytes.resize(capacity, 0);
        self.words.extend(
            bytes
                .chunks_exact(2)
                .map(|pair| u16::from_be_bytes([pair[0], pair[1]])),
        );
        Ok(self)
    }

    /// Number of words encoded so far
    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    /// Finish encoding and return the words
    pub fn into_words(self) -> Vec<u16> {
        self.words
    }
}
