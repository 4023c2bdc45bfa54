//! Fixed-capacity accumulator for the word being read
//!
//! Bytes are collected until whitespace or a block boundary flushes them
//! as one word token. A word longer than the capacity is cut into several
//! tokens. Cuts never split a UTF-8 sequence: an incomplete trailing
//! sequence is carried over into the next token.

extern crate alloc;

use alloc::string::String;

use crate::config::MAX_WORD_SIZE;

/// Bounded byte buffer for one partial word
#[derive(Clone, Debug, Default)]
pub struct WordBuffer {
    buf: heapless::Vec<u8, MAX_WORD_SIZE>,
}

impl WordBuffer {
    /// Create an empty buffer
    pub fn new() -> Self {
        Self {
            buf: heapless::Vec::new(),
        }
    }

    /// Number of buffered bytes
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    /// Check if nothing is buffered
    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// Append one byte. When the buffer is already full, the buffered
    /// bytes are returned as a finished token first.
    pub fn push(&mut self, byte: u8) -> Option<String> {
        let flushed = if self.buf.is_full() {
            Some(self.cut_full())
        } else {
            None
        };
        // cut_full leaves at most 3 carried bytes, so there is room
        let _ = self.buf.push(byte);
        flushed
    }

    /// Take everything buffered as a token, if anything is buffered
    pub fn take(&mut self) -> Option<String> {
        if self.buf.is_empty() {
            return None;
        }
        let word = String::from_utf8_lossy(&self.buf).into_owned();
        self.buf.clear();
        Some(word)
    }

    /// Discard buffered bytes
    pub fn clear(&mut self) {
        self.buf.clear();
    }

    fn cut_full(&mut self) -> String {
        let (word, carry_len) = match core::str::from_utf8(&self.buf) {
            Ok(s) => (String::from(s), 0),
            Err(e) if e.error_len().is_none() => {
                let valid = e.valid_up_to();
                (
                    String::from_utf8_lossy(&self.buf[..valid]).into_owned(),
                    self.buf.len() - valid,
                )
            }
            Err(_) => (String::from_utf8_lossy(&self.buf).into_owned(), 0),
        };

        let mut carry = [0u8; 4];
        let start = self.buf.len() - carry_len;
        carry[..carry_len].copy_from_slice(&self.buf[start..]);
        self.buf.clear();
        for &b in &carry[..carry_len] {
            let _ = self.buf.push(b);
        }
        word
    }
}
