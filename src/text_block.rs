//! Finalized lines of positioned words
//!
//! A `TextBlock` is one laid-out row: per-word text, x-offset and font
//! style, plus the owning paragraph's alignment, left margin and blockquote
//! flag. The three per-word sequences always have equal length; blocks
//! that would violate this are rejected at construction.

extern crate alloc;

use alloc::string::String;
use alloc::vec::Vec;

use crate::error::CacheError;

/// Font style for a single word
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Hash)]
#[repr(u8)]
pub enum FontStyle {
    /// Normal text
    #[default]
    Regular = 0,
    /// Bold text
    Bold = 1,
    /// Italic text
    Italic = 2,
    /// Bold and italic text
    BoldItalic = 3,
}

impl FontStyle {
    /// Combine bold/italic flags into a style
    pub fn from_flags(bold: bool, italic: bool) -> Self {
        match (bold, italic) {
            (true, true) => FontStyle::BoldItalic,
            (true, false) => FontStyle::Bold,
            (false, true) => FontStyle::Italic,
            (false, false) => FontStyle::Regular,
        }
    }

    /// Check if style is bold
    pub fn is_bold(&self) -> bool {
        matches!(self, FontStyle::Bold | FontStyle::BoldItalic)
    }

    /// Check if style is italic
    pub fn is_italic(&self) -> bool {
        matches!(self, FontStyle::Italic | FontStyle::BoldItalic)
    }

    /// Persisted byte value
    pub fn as_u8(self) -> u8 {
        self as u8
    }

    /// Parse a persisted byte value
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(FontStyle::Regular),
            1 => Some(FontStyle::Bold),
            2 => Some(FontStyle::Italic),
            3 => Some(FontStyle::BoldItalic),
            _ => None,
        }
    }
}

/// Horizontal alignment of a paragraph's lines
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Hash)]
#[repr(u8)]
pub enum Alignment {
    /// Stretch inter-word gaps to fill the line (last line left-aligned)
    #[default]
    Justified = 0,
    /// Flush left
    Left = 1,
    /// Centered
    Center = 2,
    /// Flush right
    Right = 3,
}

impl Alignment {
    /// Persisted byte value
    pub fn as_u8(self) -> u8 {
        self as u8
    }

    /// Parse a persisted byte value
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(Alignment::Justified),
            1 => Some(Alignment::Left),
            2 => Some(Alignment::Center),
            3 => Some(Alignment::Right),
            _ => None,
        }
    }
}

/// One finalized line of text
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TextBlock {
    words: Vec<String>,
    x_offsets: Vec<u16>,
    styles: Vec<FontStyle>,
    alignment: Alignment,
    left_margin: u16,
    is_blockquote: bool,
}

impl TextBlock {
    /// Create a line from parallel per-word sequences.
    ///
    /// Returns `CacheError::LengthMismatch` when the sequences differ in
    /// length; such a block cannot be rendered.
    pub fn new(
        words: Vec<String>,
        x_offsets: Vec<u16>,
        styles: Vec<FontStyle>,
        alignment: Alignment,
    ) -> Result<Self, CacheError> {
        if words.len() != x_offsets.len() || words.len() != styles.len() {
            return Err(CacheError::LengthMismatch {
                words: words.len(),
                offsets: x_offsets.len(),
                styles: styles.len(),
            });
        }
        Ok(Self {
            words,
            x_offsets,
            styles,
            alignment,
            left_margin: 0,
            is_blockquote: false,
        })
    }

    /// Set the left margin in pixels
    pub fn with_left_margin(mut self, left_margin: u16) -> Self {
        self.left_margin = left_margin;
        self
    }

    /// Mark the line as part of a blockquote
    pub fn with_blockquote(mut self, is_blockquote: bool) -> Self {
        self.is_blockquote = is_blockquote;
        self
    }

    /// Words in display order
    pub fn words(&self) -> &[String] {
        &self.words
    }

    /// X-offset of each word, in pixels from the viewport's left edge
    pub fn x_offsets(&self) -> &[u16] {
        &self.x_offsets
    }

    /// Font style of each word
    pub fn styles(&self) -> &[FontStyle] {
        &self.styles
    }

    /// Iterate `(word, x, style)` triples
    pub fn iter(&self) -> impl Iterator<Item = (&str, u16, FontStyle)> + '_ {
        self.words
            .iter()
            .zip(self.x_offsets.iter())
            .zip(self.styles.iter())
            .map(|((w, x), s)| (w.as_str(), *x, *s))
    }

    /// Paragraph alignment this line was laid out with
    pub fn alignment(&self) -> Alignment {
        self.alignment
    }

    /// Left margin in pixels
    pub fn left_margin(&self) -> u16 {
        self.left_margin
    }

    /// Whether a blockquote rule should be drawn beside this line
    pub fn is_blockquote(&self) -> bool {
        self.is_blockquote
    }

    /// Number of words
    pub fn word_count(&self) -> usize {
        self.words.len()
    }

    /// Check if the line has no words
    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    /// Words joined with single spaces
    pub fn text(&self) -> String {
        self.words.join(" ")
    }
}

#[cfg(feature = "std")]
mod persist {
    use super::*;
    use std::io::{Read, Write};

    use crate::config::MAX_SERIALIZED_WORDS;
    use crate::serialization::{
        read_string, read_u16, read_u8, write_string, write_u16, write_u8,
    };

    impl TextBlock {
        /// Write the line in the persisted little-endian layout.
        pub fn serialize<W: Write>(&self, w: &mut W) -> Result<(), CacheError> {
            if self.words.len() > MAX_SERIALIZED_WORDS {
                log::warn!(
                    "[TXB] Serialization failed: {} words exceeds maximum",
                    self.words.len()
                );
                return Err(CacheError::WordCountTooLarge {
                    count: self.words.len(),
                    max: MAX_SERIALIZED_WORDS,
                });
            }

            write_u16(w, self.words.len() as u16)?;
            for word in &self.words {
                write_string(w, word)?;
            }
            for x in &self.x_offsets {
                write_u16(w, *x)?;
            }
            for style in &self.styles {
                write_u8(w, style.as_u8())?;
            }

            write_u8(w, self.alignment.as_u8())?;
            write_u16(w, self.left_margin)?;
            write_u8(w, u8::from(self.is_blockquote))?;
            Ok(())
        }

        /// Read a line written by [`TextBlock::serialize`].
        ///
        /// Any inconsistency rejects the whole block.
        pub fn deserialize<R: Read>(r: &mut R) -> Result<Self, CacheError> {
            let count = read_u16(r)? as usize;
            if count > MAX_SERIALIZED_WORDS {
                log::warn!(
                    "[TXB] Deserialization failed: word count {} exceeds maximum",
                    count
                );
                return Err(CacheError::WordCountTooLarge {
                    count,
                    max: MAX_SERIALIZED_WORDS,
                });
            }

            let mut words = Vec::with_capacity(count);
            for _ in 0..count {
                words.push(read_string(r)?);
            }
            let mut x_offsets = Vec::with_capacity(count);
            for _ in 0..count {
                x_offsets.push(read_u16(r)?);
            }
            let mut styles = Vec::with_capacity(count);
            for _ in 0..count {
                let raw = read_u8(r)?;
                styles.push(FontStyle::from_u8(raw).ok_or(CacheError::InvalidStyle(raw))?);
            }

            let raw_alignment = read_u8(r)?;
            let alignment = Alignment::from_u8(raw_alignment)
                .ok_or(CacheError::InvalidAlignment(raw_alignment))?;
            let left_margin = read_u16(r)?;
            let is_blockquote = read_u8(r)? != 0;

            Ok(TextBlock::new(words, x_offsets, styles, alignment)?
                .with_left_margin(left_margin)
                .with_blockquote(is_blockquote))
        }
    }
}
