//! Text measurement seam
//!
//! Font rasterization lives outside this crate; layout only needs widths
//! and line heights, supplied through [`TextMetrics`].

use crate::text_block::FontStyle;

/// Pure text measurement queries for a font family
pub trait TextMetrics {
    /// Distance between consecutive baselines, in pixels.
    fn line_height(&self, font_id: i32) -> u16;

    /// Advance of a single space in the regular style, in pixels.
    fn space_width(&self, font_id: i32) -> u16;

    /// Advance of `text` rendered in `style`, in pixels.
    fn text_width(&self, font_id: i32, text: &str, style: FontStyle) -> u16;
}

impl<T: TextMetrics + ?Sized> TextMetrics for &T {
    fn line_height(&self, font_id: i32) -> u16 {
        (**self).line_height(font_id)
    }

    fn space_width(&self, font_id: i32) -> u16 {
        (**self).space_width(font_id)
    }

    fn text_width(&self, font_id: i32, text: &str, style: FontStyle) -> u16 {
        (**self).text_width(font_id, text, style)
    }
}

/// Monospace metrics: every character has the same advance
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FixedWidthMetrics {
    /// Advance per character in regular/italic style
    pub char_width: u16,
    /// Advance per character in bold styles
    pub bold_char_width: u16,
    /// Line height in pixels
    pub line_height: u16,
}

impl Default for FixedWidthMetrics {
    fn default() -> Self {
        Self {
            char_width: 10,
            bold_char_width: 10,
            line_height: 20,
        }
    }
}

impl FixedWidthMetrics {
    /// Create metrics with the same advance for all styles
    pub fn new(char_width: u16, line_height: u16) -> Self {
        Self {
            char_width,
            bold_char_width: char_width,
            line_height,
        }
    }

    /// Set a different advance for bold styles
    pub fn with_bold_char_width(mut self, width: u16) -> Self {
        self.bold_char_width = width;
        self
    }

    fn char_width_for_style(&self, style: FontStyle) -> u16 {
        if style.is_bold() {
            self.bold_char_width
        } else {
            self.char_width
        }
    }
}

impl TextMetrics for FixedWidthMetrics {
    fn line_height(&self, _font_id: i32) -> u16 {
        self.line_height
    }

    fn space_width(&self, _font_id: i32) -> u16 {
        self.char_width
    }

    fn text_width(&self, _font_id: i32, text: &str, style: FontStyle) -> u16 {
        let chars = text.chars().count().min(u16::MAX as usize) as u16;
        chars.saturating_mul(self.char_width_for_style(style))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixed_width_counts_chars_not_bytes() {
        let metrics = FixedWidthMetrics::default();
        assert_eq!(metrics.text_width(0, "hello", FontStyle::Regular), 50);
        // U+2022 is three bytes but one glyph
        assert_eq!(metrics.text_width(0, "\u{2022}", FontStyle::Regular), 10);
        assert_eq!(metrics.space_width(0), 10);
        assert_eq!(metrics.line_height(0), 20);
    }

    #[test]
    fn test_bold_width() {
        let metrics = FixedWidthMetrics::new(8, 16).with_bold_char_width(9);
        assert_eq!(metrics.text_width(0, "hello", FontStyle::Bold), 45);
        assert_eq!(metrics.text_width(0, "hello", FontStyle::Italic), 40);
    }

    #[test]
    fn test_width_saturates() {
        let metrics = FixedWidthMetrics::new(u16::MAX, 20);
        assert_eq!(metrics.text_width(0, "ab", FontStyle::Regular), u16::MAX);
    }
}
