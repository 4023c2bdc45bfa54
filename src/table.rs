//! Row/cell capture for `<table>` content
//!
//! Tables are not laid out as grids. While a table is open its cells are
//! collected here; when it closes, each row becomes one left-aligned
//! paragraph of cell texts separated by `|` tokens.

extern crate alloc;

use alloc::string::String;
use alloc::vec::Vec;

use crate::config::MAX_WORD_SIZE;
use crate::paragraph::ParsedText;
use crate::text_block::{Alignment, FontStyle};

/// Separator token placed between non-empty cells.
pub const CELL_SEPARATOR: &str = "|";

/// One captured cell
#[derive(Clone, Debug, PartialEq, Eq, Default)]
pub struct TableCell {
    /// Cell text with whitespace runs collapsed
    pub text: String,
    /// `Bold` for header cells
    pub style: FontStyle,
}

/// One captured row
#[derive(Clone, Debug, PartialEq, Eq, Default)]
pub struct TableRow {
    /// Cells in document order
    pub cells: Vec<TableCell>,
}

/// Transient state for an open table
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TableData {
    rows: Vec<TableRow>,
    in_cell: bool,
    depth: usize,
}

impl Default for TableData {
    fn default() -> Self {
        Self::new()
    }
}

impl TableData {
    /// Start capturing an outermost table
    pub fn new() -> Self {
        Self {
            rows: Vec::new(),
            in_cell: false,
            depth: 1,
        }
    }

    /// Captured rows
    pub fn rows(&self) -> &[TableRow] {
        &self.rows
    }

    /// Table nesting depth; 1 for the outermost table
    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Whether a nested table is currently open
    pub fn is_nested(&self) -> bool {
        self.depth > 1
    }

    /// Whether character data currently belongs to a cell
    pub fn in_cell(&self) -> bool {
        self.in_cell
    }

    /// A `<table>` opened inside this one
    pub fn enter_nested(&mut self) {
        self.depth += 1;
    }

    /// A `</table>` closed; returns true when the outermost table closed
    pub fn leave_table(&mut self) -> bool {
        self.depth = self.depth.saturating_sub(1);
        self.depth == 0
    }

    /// `<tr>`
    pub fn start_row(&mut self) {
        self.rows.push(TableRow::default());
    }

    /// `<td>` or `<th>`; header cells are bold. Ignored before any row.
    pub fn start_cell(&mut self, header: bool) {
        if let Some(row) = self.rows.last_mut() {
            row.cells.push(TableCell {
                text: String::new(),
                style: if header {
                    FontStyle::Bold
                } else {
                    FontStyle::Regular
                },
            });
            self.in_cell = true;
        }
    }

    /// `</td>` or `</th>`
    pub fn end_cell(&mut self) {
        self.in_cell = false;
    }

    /// Append character data to the open cell, collapsing whitespace runs
    /// to one space. Leading whitespace of a cell is dropped; trailing
    /// whitespace is trimmed when rows are flushed.
    pub fn append_text(&mut self, text: &str) {
        if !self.in_cell {
            return;
        }
        let Some(cell) = self.rows.last_mut().and_then(|r| r.cells.last_mut()) else {
            return;
        };
        for ch in text.chars() {
            if matches!(ch, ' ' | '\r' | '\n' | '\t') {
                if !cell.text.is_empty() && !cell.text.ends_with(' ') {
                    cell.text.push(' ');
                }
            } else {
                cell.text.push(ch);
            }
        }
    }

    /// Convert captured rows into left-aligned paragraphs, one per row.
    ///
    /// Each non-empty trimmed cell contributes one word; `|` separates
    /// consecutive non-empty cells. Rows with no text are dropped. Cell
    /// text longer than [`MAX_WORD_SIZE`] bytes is cut into several words
    /// on character boundaries.
    pub fn into_row_paragraphs(self, extra_paragraph_spacing: bool) -> Vec<ParsedText> {
        self.rows
            .into_iter()
            .filter_map(|row| {
                let mut paragraph = ParsedText::new(Alignment::Left, extra_paragraph_spacing);
                for cell in row.cells {
                    let text = cell.text.trim_matches(|c: char| c == ' ' || c == '\t');
                    if text.is_empty() {
                        continue;
                    }
                    if !paragraph.is_empty() {
                        paragraph.add_word(CELL_SEPARATOR, FontStyle::Regular);
                    }
                    for piece in word_pieces(text) {
                        paragraph.add_word(piece, cell.style);
                    }
                }
                (!paragraph.is_empty()).then_some(paragraph)
            })
            .collect()
    }
}

/// Split `text` into pieces of at most [`MAX_WORD_SIZE`] bytes
fn word_pieces(mut text: &str) -> impl Iterator<Item = &str> + '_ {
    core::iter::from_fn(move || {
        if text.is_empty() {
            return None;
        }
        let mut cut = text.len().min(MAX_WORD_SIZE);
        while !text.is_char_boundary(cut) {
            cut -= 1;
        }
        let (piece, rest) = text.split_at(cut);
        text = rest;
        Some(piece)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::string::ToString;
    use alloc::vec;

    fn cell_words(table: TableData) -> Vec<Vec<String>> {
        table
            .into_row_paragraphs(false)
            .iter()
            .map(|p| p.words().to_vec())
            .collect()
    }

    #[test]
    fn test_two_cells_become_separated_tokens() {
        let mut table = TableData::new();
        table.start_row();
        table.start_cell(false);
        table.append_text("A");
        table.end_cell();
        table.start_cell(false);
        table.append_text("B");
        table.end_cell();
        assert_eq!(cell_words(table), vec![vec!["A", "|", "B"]]);
    }

    #[test]
    fn test_whitespace_collapsed_and_trimmed() {
        let mut table = TableData::new();
        table.start_row();
        table.start_cell(false);
        table.append_text("\n   Hello \t\n  ");
        table.append_text("  world  ");
        table.end_cell();
        let rows = table.rows().to_vec();
        assert_eq!(rows[0].cells[0].text, "Hello world ");
        assert_eq!(cell_words(table), vec![vec!["Hello world"]]);
    }

    #[test]
    fn test_long_cell_cut_into_bounded_words() {
        let text = "\u{00E9}".repeat(150);
        let mut table = TableData::new();
        table.start_row();
        table.start_cell(false);
        table.append_text(&text);
        table.end_cell();
        table.start_cell(true);
        table.append_text("x");
        table.end_cell();

        let paragraphs = table.into_row_paragraphs(false);
        let words = paragraphs[0].words();
        assert_eq!(words.len(), 4);
        assert_eq!(words[0].len(), 200);
        assert_eq!(words[1].len(), 100);
        assert_eq!(words[2], CELL_SEPARATOR);
        assert!(words.iter().all(|w| w.len() <= MAX_WORD_SIZE));
        assert_eq!(words[..2].concat(), text);
    }

    #[test]
    fn test_header_cells_are_bold() {
        let mut table = TableData::new();
        table.start_row();
        table.start_cell(true);
        table.append_text("Name");
        table.end_cell();
        let paragraphs = table.into_row_paragraphs(false);
        assert_eq!(paragraphs.len(), 1);
        assert_eq!(paragraphs[0].alignment(), Alignment::Left);
        assert_eq!(paragraphs[0].words(), &["Name".to_string()]);
    }

    #[test]
    fn test_empty_cells_and_rows_skipped() {
        let mut table = TableData::new();
        table.start_row();
        table.start_cell(false);
        table.append_text("A");
        table.end_cell();
        table.start_cell(false);
        table.append_text("   ");
        table.end_cell();
        table.start_cell(false);
        table.append_text("C");
        table.end_cell();
        table.start_row();
        table.start_cell(false);
        table.end_cell();
        assert_eq!(cell_words(table), vec![vec!["A", "|", "C"]]);
    }

    #[test]
    fn test_text_outside_cells_ignored() {
        let mut table = TableData::new();
        table.append_text("stray");
        table.start_cell(false);
        assert!(!table.in_cell());
        table.start_row();
        table.append_text("between rows");
        assert!(table.rows()[0].cells.is_empty());
    }

    #[test]
    fn test_nesting_depth() {
        let mut table = TableData::new();
        assert!(!table.is_nested());
        table.enter_nested();
        assert!(table.is_nested());
        assert!(!table.leave_table());
        assert!(table.leave_table());
    }
}
