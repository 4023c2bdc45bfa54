//! Paragraph buffer and greedy line breaking
//!
//! `ParsedText` collects the words of one logical block (paragraph,
//! heading, list item, table row, ...) before layout. Laying it out drains
//! the words into finalized [`TextBlock`] lines.

extern crate alloc;

use alloc::string::String;
use alloc::vec::Vec;

use crate::metrics::TextMetrics;
use crate::text_block::{Alignment, FontStyle, TextBlock};

/// Words and per-word styles for one block awaiting layout
#[derive(Clone, Debug, PartialEq, Eq, Default)]
pub struct ParsedText {
    words: Vec<String>,
    styles: Vec<FontStyle>,
    alignment: Alignment,
    left_margin: u16,
    is_blockquote: bool,
    extra_paragraph_spacing: bool,
}

impl ParsedText {
    /// Create an empty paragraph
    pub fn new(alignment: Alignment, extra_paragraph_spacing: bool) -> Self {
        Self {
            words: Vec::new(),
            styles: Vec::new(),
            alignment,
            left_margin: 0,
            is_blockquote: false,
            extra_paragraph_spacing,
        }
    }

    /// Append a word token
    pub fn add_word(&mut self, word: impl Into<String>, style: FontStyle) {
        self.words.push(word.into());
        self.styles.push(style);
    }

    /// Alignment applied to every line of the paragraph
    pub fn alignment(&self) -> Alignment {
        self.alignment
    }

    /// Change the alignment
    pub fn set_alignment(&mut self, alignment: Alignment) {
        self.alignment = alignment;
    }

    /// Left margin in pixels
    pub fn left_margin(&self) -> u16 {
        self.left_margin
    }

    /// Change the left margin
    pub fn set_left_margin(&mut self, left_margin: u16) {
        self.left_margin = left_margin;
    }

    /// Whether the paragraph belongs to a blockquote
    pub fn is_blockquote(&self) -> bool {
        self.is_blockquote
    }

    /// Mark or unmark the paragraph as a blockquote
    pub fn set_blockquote(&mut self, is_blockquote: bool) {
        self.is_blockquote = is_blockquote;
    }

    /// Whether half a line of space follows this paragraph
    pub fn extra_paragraph_spacing(&self) -> bool {
        self.extra_paragraph_spacing
    }

    /// Number of buffered word tokens
    pub fn len(&self) -> usize {
        self.words.len()
    }

    /// Check if no words are buffered
    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    /// Buffered words in order
    pub fn words(&self) -> &[String] {
        &self.words
    }

    /// Break the buffered words into lines no wider than `viewport_width`
    /// minus the left margin, emitting each finished line in order.
    ///
    /// With `include_last_line == false` the final line is held back and
    /// its words stay in the buffer, so more words can be appended to it.
    pub fn layout_and_extract_lines<M, F>(
        &mut self,
        metrics: &M,
        font_id: i32,
        viewport_width: u16,
        include_last_line: bool,
        mut emit: F,
    ) where
        M: TextMetrics + ?Sized,
        F: FnMut(TextBlock),
    {
        if self.words.is_empty() {
            return;
        }

        let page_width = i32::from(viewport_width) - i32::from(self.left_margin);
        let space_width = i32::from(metrics.space_width(font_id));
        let widths: Vec<i32> = self
            .words
            .iter()
            .zip(self.styles.iter())
            .map(|(w, s)| i32::from(metrics.text_width(font_id, w, *s)))
            .collect();

        let line_ends = compute_line_breaks(&widths, space_width, page_width);
        let line_count = if include_last_line {
            line_ends.len()
        } else {
            line_ends.len() - 1
        };
        if line_count == 0 {
            return;
        }
        let consumed = line_ends[line_count - 1];

        let alignment = self.alignment;
        let left_margin = self.left_margin;
        let is_blockquote = self.is_blockquote;
        let mut words = self.words.drain(..consumed);
        let mut styles = self.styles.drain(..consumed);
        let mut start = 0;
        for (index, &end) in line_ends[..line_count].iter().enumerate() {
            let is_last_line = index + 1 == line_ends.len();
            let x_offsets = position_words(
                &widths[start..end],
                space_width,
                page_width,
                alignment,
                left_margin,
                is_last_line,
            );
            let line_words: Vec<String> = words.by_ref().take(end - start).collect();
            let line_styles: Vec<FontStyle> = styles.by_ref().take(end - start).collect();

            // lengths come from the same range
            if let Ok(block) = TextBlock::new(line_words, x_offsets, line_styles, alignment) {
                emit(
                    block
                        .with_left_margin(left_margin)
                        .with_blockquote(is_blockquote),
                );
            }
            start = end;
        }
    }
}

/// X-offset for each word of one line, measured from the viewport edge.
///
/// Justified lines split the spare width evenly across gaps, rounding
/// down; the remainder is left at the right edge.
fn position_words(
    widths: &[i32],
    space_width: i32,
    page_width: i32,
    alignment: Alignment,
    left_margin: u16,
    is_last_line: bool,
) -> Vec<u16> {
    let word_sum: i32 = widths.iter().sum();
    let gaps = widths.len() as i32 - 1;
    let spare = page_width - word_sum;

    let mut spacing = space_width;
    if alignment == Alignment::Justified && !is_last_line && gaps >= 1 {
        spacing = spare / gaps;
    }

    let natural = word_sum + gaps * space_width;
    let mut x = match alignment {
        Alignment::Right => page_width - natural,
        Alignment::Center => (page_width - natural) / 2,
        Alignment::Justified | Alignment::Left => 0,
    }
    .max(0)
        + i32::from(left_margin);

    let mut offsets = Vec::with_capacity(widths.len());
    for width in widths {
        offsets.push(x.clamp(0, i32::from(u16::MAX)) as u16);
        x += width + spacing;
    }
    offsets
}

/// Greedy breaking: returns the exclusive end index of every line.
///
/// The first word of a line is always placed, even when wider than the
/// page, so no word is ever dropped.
fn compute_line_breaks(widths: &[i32], space_width: i32, page_width: i32) -> Vec<usize> {
    let mut ends = Vec::new();
    let mut line_start = 0;
    let mut line_width = 0;

    for (i, &width) in widths.iter().enumerate() {
        if i == line_start {
            line_width = width;
            continue;
        }
        if line_width + space_width + width <= page_width {
            line_width += space_width + width;
        } else {
            ends.push(i);
            line_start = i;
            line_width = width;
        }
    }
    ends.push(widths.len());
    ends
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::FixedWidthMetrics;

    fn paragraph(alignment: Alignment, words: &[&str]) -> ParsedText {
        let mut text = ParsedText::new(alignment, false);
        for word in words {
            text.add_word(*word, FontStyle::Regular);
        }
        text
    }

    fn layout(text: &mut ParsedText, width: u16, include_last: bool) -> Vec<TextBlock> {
        let metrics = FixedWidthMetrics::default();
        let mut lines = Vec::new();
        text.layout_and_extract_lines(&metrics, 0, width, include_last, |l| lines.push(l));
        lines
    }

    #[test]
    fn test_single_line_keeps_parallel_lengths() {
        let mut text = paragraph(Alignment::Justified, &["one", "two", "three"]);
        let lines = layout(&mut text, 474, true);
        assert_eq!(lines.len(), 1);
        let line = &lines[0];
        assert_eq!(line.words().len(), 3);
        assert_eq!(line.x_offsets().len(), 3);
        assert_eq!(line.styles().len(), 3);
        assert!(text.is_empty());
    }

    #[test]
    fn test_greedy_wrap() {
        // 40 + 10 + 40 = 90 fits in 100; adding another 50 does not
        let mut text = paragraph(Alignment::Left, &["aaaa", "bbbb", "cccc"]);
        let lines = layout(&mut text, 100, true);
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0].text(), "aaaa bbbb");
        assert_eq!(lines[1].text(), "cccc");
        assert_eq!(lines[0].x_offsets(), &[0, 50]);
    }

    #[test]
    fn test_exact_fit_stays_on_line() {
        let mut text = paragraph(Alignment::Left, &["aaaaa", "bbbb"]);
        let lines = layout(&mut text, 100, true);
        assert_eq!(lines.len(), 1);
    }

    #[test]
    fn test_justified_spreads_gaps_except_last_line() {
        let mut text = paragraph(Alignment::Justified, &["aaaa", "bbbb", "cccc", "dd"]);
        let lines = layout(&mut text, 100, true);
        assert_eq!(lines.len(), 2);
        // spare 20 over one gap
        assert_eq!(lines[0].x_offsets(), &[0, 60]);
        // last line falls back to normal spacing
        assert_eq!(lines[1].x_offsets(), &[0, 50]);
    }

    #[test]
    fn test_justified_rounds_gap_down() {
        let mut text = paragraph(Alignment::Justified, &["a", "b", "c", "dddddddd"]);
        let lines = layout(&mut text, 70, true);
        assert_eq!(lines[0].text(), "a b c");
        // spare 40 over 2 gaps
        assert_eq!(lines[0].x_offsets(), &[0, 30, 60]);

        let mut text = paragraph(Alignment::Justified, &["a", "b", "c", "d", "eeeeeeee"]);
        let lines = layout(&mut text, 80, true);
        assert_eq!(lines[0].text(), "a b c d");
        // spare 40 over 3 gaps truncates to 13
        assert_eq!(lines[0].x_offsets(), &[0, 23, 46, 69]);
    }

    #[test]
    fn test_center_and_right() {
        let mut text = paragraph(Alignment::Center, &["ab"]);
        let lines = layout(&mut text, 100, true);
        assert_eq!(lines[0].x_offsets(), &[40]);

        let mut text = paragraph(Alignment::Right, &["ab", "cd"]);
        let lines = layout(&mut text, 100, true);
        assert_eq!(lines[0].x_offsets(), &[50, 80]);
    }

    #[test]
    fn test_left_margin_narrows_and_offsets() {
        let mut text = paragraph(Alignment::Left, &["aaaa", "bbbb", "cccc"]);
        text.set_left_margin(24);
        text.set_blockquote(true);
        let lines = layout(&mut text, 124, true);
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0].x_offsets(), &[24, 74]);
        assert_eq!(lines[0].left_margin(), 24);
        assert!(lines[0].is_blockquote());
    }

    #[test]
    fn test_overlong_word_gets_own_line() {
        let mut text = paragraph(Alignment::Justified, &["a", "abcdefghijklmnop", "b"]);
        let lines = layout(&mut text, 100, true);
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[1].text(), "abcdefghijklmnop");
        assert_eq!(lines[1].x_offsets(), &[0]);
    }

    #[test]
    fn test_hold_back_last_line() {
        let mut text = paragraph(Alignment::Left, &["aaaa", "bbbb", "cccc", "dddd", "ee"]);
        let lines = layout(&mut text, 100, false);
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[1].text(), "cccc dddd");
        assert_eq!(text.words(), &["ee".to_string()]);

        // continuation still lays out the held-back words
        text.add_word("ff", FontStyle::Italic);
        let lines = layout(&mut text, 100, true);
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].text(), "ee ff");
        assert_eq!(lines[0].styles(), &[FontStyle::Regular, FontStyle::Italic]);
    }

    #[test]
    fn test_hold_back_single_line_emits_nothing() {
        let mut text = paragraph(Alignment::Left, &["only", "line"]);
        let lines = layout(&mut text, 474, false);
        assert!(lines.is_empty());
        assert_eq!(text.len(), 2);
    }

    #[test]
    fn test_empty_paragraph_emits_nothing() {
        let mut text = ParsedText::new(Alignment::Justified, true);
        assert!(layout(&mut text, 474, true).is_empty());
    }
}
