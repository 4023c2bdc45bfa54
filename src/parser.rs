//! Streaming XHTML chapter parser
//!
//! Drives a quick_xml pull reader over a chapter file in 1 KiB reads and
//! turns open-tag, character-data and close-tag events into paragraphs,
//! lines and pages. No DOM is built: style and skip regions are tracked
//! with depth thresholds, and pages are handed to the caller as soon as
//! they fill up.
//!
//! ```
//! use mu_chapter::{ChapterConfig, ChapterParser, FixedWidthMetrics};
//!
//! let metrics = FixedWidthMetrics::default();
//! let mut parser = ChapterParser::new(ChapterConfig::default(), &metrics);
//! let mut pages = Vec::new();
//! let stats = parser
//!     .parse_bytes(b"<html><body><p>Hello world</p></body></html>", |page| pages.push(page))
//!     .unwrap();
//! assert_eq!(stats.pages, 1);
//! assert_eq!(pages[0].lines().next().unwrap().block.words(), ["Hello", "world"]);
//! ```

extern crate alloc;

use alloc::borrow::Cow;
use alloc::format;
use alloc::string::{String, ToString};
use alloc::vec::Vec;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use quick_xml::encoding::Decoder;
use quick_xml::escape::unescape;
use quick_xml::events::{BytesStart, Event};
use quick_xml::reader::Reader;

use crate::config::{
    ChapterConfig, MarkupMode, BLOCKQUOTE_INDENT_PX, HORIZONTAL_RULE_GLYPHS, LIST_INDENT_PX,
    MAX_LIST_NESTING, MAX_PARAGRAPH_WORDS, READ_CHUNK_SIZE,
};
use crate::error::ChapterError;
use crate::image::{ImageBridge, ImagePipeline};
use crate::metrics::TextMetrics;
use crate::page::Page;
use crate::paginator::Paginator;
use crate::paragraph::ParsedText;
use crate::progress::ProgressReader;
use crate::table::TableData;
use crate::text_block::{Alignment, FontStyle, TextBlock};
use crate::word_buffer::WordBuffer;

const HEADER_TAGS: &[&str] = &["h1", "h2", "h3", "h4", "h5", "h6"];
const BLOCK_TAGS: &[&str] = &["p", "div", "br"];
const LEGACY_BLOCK_TAGS: &[&str] = &["p", "div", "br", "li", "blockquote"];
const BOLD_TAGS: &[&str] = &["b", "strong"];
const ITALIC_TAGS: &[&str] = &["i", "em"];
const SKIP_TAGS: &[&str] = &["head"];
const LEGACY_SKIP_TAGS: &[&str] = &["head", "table"];

const BULLET: &str = "\u{2022}";
const PRE_SPACE: &str = "\u{00A0}";
const HORIZONTAL_RULE_GLYPH: &str = "\u{2015}";
const SOFT_HYPHEN: [u8; 2] = [0xC2, 0xAD];

/// Threshold value meaning "not active"
const INACTIVE: usize = usize::MAX;

/// Counters reported after a successful parse
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ParseStats {
    /// Pages handed to the page callback
    pub pages: usize,
    /// Text lines placed (rules and table rows included)
    pub lines: usize,
    /// Images placed on pages
    pub images_placed: usize,
    /// Images skipped (unsupported, failed, or no pipeline)
    pub images_skipped: usize,
    /// Paragraphs that crossed the word limit and were flushed early
    pub forced_splits: usize,
}

/// Converts chapter XHTML into pages.
///
/// One parser can run several passes; each `parse_*` call starts from a
/// clean state.
pub struct ChapterParser<'a, M: TextMetrics + ?Sized> {
    config: ChapterConfig,
    metrics: &'a M,
    images: Option<&'a mut dyn ImagePipeline>,
    progress: Option<&'a mut dyn FnMut(u8)>,
}

impl<'a, M: TextMetrics + ?Sized> ChapterParser<'a, M> {
    /// Create a parser with layout settings and a metrics provider
    pub fn new(config: ChapterConfig, metrics: &'a M) -> Self {
        Self {
            config,
            metrics,
            images: None,
            progress: None,
        }
    }

    /// Convert `<img>` elements through `pipeline`. Without one, images
    /// are skipped.
    pub fn with_image_pipeline(mut self, pipeline: &'a mut dyn ImagePipeline) -> Self {
        self.images = Some(pipeline);
        self
    }

    /// Report read progress in percent for large chapters
    pub fn with_progress(mut self, on_progress: &'a mut dyn FnMut(u8)) -> Self {
        self.progress = Some(on_progress);
        self
    }

    /// Layout settings in use
    pub fn config(&self) -> &ChapterConfig {
        &self.config
    }

    /// Parse a chapter file from disk.
    pub fn parse_file<P, F>(&mut self, path: P, on_page: F) -> Result<ParseStats, ChapterError>
    where
        P: AsRef<Path>,
        F: FnMut(Page),
    {
        let path = path.as_ref();
        let file = File::open(path)
            .map_err(|e| ChapterError::Io(format!("{}: {}", path.display(), e)))?;
        let total_size = file
            .metadata()
            .map(|m| m.len())
            .map_err(|e| ChapterError::Io(format!("{}: {}", path.display(), e)))?;
        self.parse_reader(file, total_size, on_page)
    }

    /// Parse a chapter held in memory.
    pub fn parse_bytes<F>(&mut self, data: &[u8], on_page: F) -> Result<ParseStats, ChapterError>
    where
        F: FnMut(Page),
    {
        self.parse_reader(data, data.len() as u64, on_page)
    }

    /// Parse a chapter from any byte stream.
    ///
    /// `total_size` is only used for progress reporting. On error, pages
    /// already passed to `on_page` stay valid.
    pub fn parse_reader<R, F>(
        &mut self,
        source: R,
        total_size: u64,
        on_page: F,
    ) -> Result<ParseStats, ChapterError>
    where
        R: Read,
        F: FnMut(Page),
    {
        let progress = &mut self.progress;
        let counted = ProgressReader::new(source, total_size, |percent| {
            if let Some(report) = progress.as_deref_mut() {
                report(percent);
            }
        });
        let mut reader = Reader::from_reader(BufReader::with_capacity(READ_CHUNK_SIZE, counted));
        reader.config_mut().trim_text(false);
        // `<br/>` must produce both an open and a close event
        reader.config_mut().expand_empty_elements = true;

        let images = self
            .images
            .as_mut()
            .map(|pipeline| &mut **pipeline as &mut dyn ImagePipeline);
        let mut state = ParseState::new(&self.config, self.metrics, images, on_page);

        let mut buf = Vec::new();
        loop {
            let event = match reader.read_event_into(&mut buf) {
                Ok(event) => event,
                Err(err) => {
                    let position = reader.buffer_position() as u64;
                    return Err(reader_error(err, position));
                }
            };
            let decoder = reader.decoder();
            match event {
                Event::Start(e) => {
                    let element = StartTag::read(&e, decoder)?;
                    state.start_element(&element);
                }
                Event::End(e) => {
                    let name = decode_tag_name(e.name().as_ref(), decoder)?;
                    state.end_element(&name);
                }
                Event::Text(e) => state.character_data(&e),
                Event::CData(e) => state.character_data(&e),
                Event::GeneralRef(e) => {
                    let name = e.decode().map_err(|err| ChapterError::Parse {
                        message: format!("Decode error: {:?}", err),
                        position: reader.buffer_position() as u64,
                    })?;
                    if let Some(resolved) = resolve_entity(&name) {
                        state.character_data(resolved.as_bytes());
                    }
                }
                Event::Eof => break,
                // Comments, declarations, processing instructions, doctype
                _ => {}
            }
            buf.clear();
        }

        if state.depth > 0 {
            log::warn!("[EHP] Document ended with {} open element(s)", state.depth);
            return Err(ChapterError::UnexpectedEof { depth: state.depth });
        }
        Ok(state.finish())
    }
}

fn reader_error(err: quick_xml::Error, position: u64) -> ChapterError {
    match err {
        quick_xml::Error::Io(io) => {
            log::warn!("[EHP] File read error: {}", io);
            ChapterError::Io(io.to_string())
        }
        other => {
            log::warn!("[EHP] Parse error at byte {}: {}", position, other);
            ChapterError::Parse {
                message: other.to_string(),
                position,
            }
        }
    }
}

fn decode_tag_name(name: &[u8], decoder: Decoder) -> Result<String, ChapterError> {
    decoder
        .decode(name)
        .map(|n| n.to_ascii_lowercase())
        .map_err(|e| ChapterError::Parse {
            message: format!("Decode error: {:?}", e),
            position: 0,
        })
}

/// Resolve a general entity reference to its text.
///
/// Covers the XML predefined entities, numeric character references and a
/// few HTML entities common in ebooks. Unknown names resolve to `None`.
fn resolve_entity(name: &str) -> Option<Cow<'static, str>> {
    let html = match name {
        "nbsp" => Some("\u{00A0}"),
        "shy" => Some("\u{00AD}"),
        "mdash" => Some("\u{2014}"),
        "ndash" => Some("\u{2013}"),
        "hellip" => Some("\u{2026}"),
        "lsquo" => Some("\u{2018}"),
        "rsquo" => Some("\u{2019}"),
        "ldquo" => Some("\u{201C}"),
        "rdquo" => Some("\u{201D}"),
        "copy" => Some("\u{00A9}"),
        _ => None,
    };
    if let Some(text) = html {
        return Some(Cow::Borrowed(text));
    }

    match unescape(&format!("&{};", name)) {
        Ok(text) => Some(Cow::Owned(text.into_owned())),
        Err(_) => {
            log::debug!("[EHP] Dropping unknown entity &{};", name);
            None
        }
    }
}

/// The parts of an open tag the state machine looks at
#[derive(Clone, Debug, Default, PartialEq, Eq)]
struct StartTag {
    name: String,
    src: Option<String>,
    page_break: bool,
}

impl StartTag {
    fn read(e: &BytesStart<'_>, decoder: Decoder) -> Result<Self, ChapterError> {
        let mut tag = StartTag {
            name: decode_tag_name(e.name().as_ref(), decoder)?,
            ..Default::default()
        };
        for attr in e.attributes().flatten() {
            let Ok(value) = attr.decode_and_unescape_value(decoder) else {
                continue;
            };
            match attr.key.as_ref() {
                b"src" => tag.src = Some(value.into_owned()),
                b"role" if value == "doc-pagebreak" => tag.page_break = true,
                b"epub:type" if value == "pagebreak" => tag.page_break = true,
                _ => {}
            }
        }
        Ok(tag)
    }
}

#[derive(Clone, Copy, Debug)]
struct ListContext {
    ordered: bool,
    item_number: usize,
}

/// Mutable state for one pass over a chapter
struct ParseState<'s, M: TextMetrics + ?Sized, F: FnMut(Page)> {
    config: &'s ChapterConfig,
    metrics: &'s M,
    images: Option<&'s mut dyn ImagePipeline>,
    bridge: ImageBridge,
    paginator: Paginator<F>,
    paragraph: ParsedText,
    word: WordBuffer,
    depth: usize,
    skip_until: usize,
    bold_until: usize,
    italic_until: usize,
    lists: Vec<ListContext>,
    blockquote_depth: usize,
    table: Option<TableData>,
    in_pre: bool,
    stats: ParseStats,
}

impl<'s, M: TextMetrics + ?Sized, F: FnMut(Page)> ParseState<'s, M, F> {
    fn new(
        config: &'s ChapterConfig,
        metrics: &'s M,
        images: Option<&'s mut dyn ImagePipeline>,
        on_page: F,
    ) -> Self {
        let line_height = config.scaled_line_height(metrics.line_height(config.font_id));
        Self {
            config,
            metrics,
            images,
            bridge: ImageBridge::new(&config.content_base_path, &config.image_cache_dir),
            paginator: Paginator::new(
                config.viewport_width,
                config.viewport_height,
                line_height,
                on_page,
            ),
            paragraph: ParsedText::new(config.paragraph_alignment, config.extra_paragraph_spacing),
            word: WordBuffer::new(),
            depth: 0,
            skip_until: INACTIVE,
            bold_until: INACTIVE,
            italic_until: INACTIVE,
            lists: Vec::new(),
            blockquote_depth: 0,
            table: None,
            in_pre: false,
            stats: ParseStats::default(),
        }
    }

    fn structured(&self) -> bool {
        self.config.markup_mode == MarkupMode::Structured
    }

    fn in_skip(&self) -> bool {
        self.skip_until < self.depth
    }

    fn current_style(&self) -> FontStyle {
        FontStyle::from_flags(self.bold_until < self.depth, self.italic_until < self.depth)
    }

    fn start_element(&mut self, tag: &StartTag) {
        if self.in_skip() {
            self.depth += 1;
            return;
        }

        let name = tag.name.as_str();

        if let Some(table) = self.table.as_mut() {
            match name {
                "table" => table.enter_nested(),
                "tr" if !table.is_nested() => table.start_row(),
                "td" | "th" if !table.is_nested() => table.start_cell(name == "th"),
                _ => {}
            }
            self.depth += 1;
            return;
        }

        let structured = self.structured();

        if structured && name == "table" {
            self.flush_paragraph();
            self.table = Some(TableData::new());
            self.depth += 1;
            return;
        }

        if name == "img" {
            if let Some(src) = tag.src.as_deref() {
                self.process_image(src);
            }
            self.skip_until = self.depth;
            self.depth += 1;
            return;
        }

        let skip_tags = if structured { SKIP_TAGS } else { LEGACY_SKIP_TAGS };
        if skip_tags.contains(&name) || tag.page_break {
            self.skip_until = self.depth;
            self.depth += 1;
            return;
        }

        if structured && self.start_structural(name) {
            self.depth += 1;
            return;
        }

        if HEADER_TAGS.contains(&name) {
            self.start_block(Alignment::Center, 0, false);
            self.bold_until = self.bold_until.min(self.depth);
        } else if self.is_block_tag(name) {
            if name == "br" {
                let alignment = self.paragraph.alignment();
                let left_margin = self.paragraph.left_margin();
                let is_blockquote = self.paragraph.is_blockquote();
                self.start_block(alignment, left_margin, is_blockquote);
            } else {
                self.start_paragraph();
            }
        } else if BOLD_TAGS.contains(&name) {
            self.bold_until = self.bold_until.min(self.depth);
        } else if ITALIC_TAGS.contains(&name) {
            self.italic_until = self.italic_until.min(self.depth);
        }

        self.depth += 1;
    }

    /// Lists, blockquotes, pre, definition lists, figures and rules.
    /// Returns false when `name` is none of these.
    fn start_structural(&mut self, name: &str) -> bool {
        match name {
            "hr" => self.add_horizontal_rule(),
            "ul" | "ol" => self.lists.push(ListContext {
                ordered: name == "ol",
                item_number: 0,
            }),
            "li" => {
                let nesting = self.lists.len().min(MAX_LIST_NESTING) as u16;
                self.start_block(Alignment::Left, nesting * LIST_INDENT_PX, false);
                if let Some(list) = self.lists.last_mut() {
                    list.item_number += 1;
                    let marker = if list.ordered {
                        format!("{}. ", list.item_number)
                    } else {
                        BULLET.to_string()
                    };
                    self.paragraph.add_word(marker, FontStyle::Regular);
                }
            }
            "blockquote" => {
                self.blockquote_depth += 1;
                self.start_paragraph();
            }
            "pre" => {
                self.in_pre = true;
                self.start_block(Alignment::Left, 0, false);
            }
            "code" | "dl" => {}
            "dt" => {
                self.start_block(Alignment::Left, 0, false);
                self.bold_until = self.bold_until.min(self.depth);
            }
            "dd" => self.start_block(Alignment::Left, LIST_INDENT_PX, false),
            "figure" => self.flush_paragraph(),
            "figcaption" => {
                self.start_block(Alignment::Center, 0, false);
                self.italic_until = self.italic_until.min(self.depth);
            }
            _ => return false,
        }
        true
    }

    fn character_data(&mut self, data: &[u8]) {
        if self.in_skip() {
            return;
        }

        if let Some(table) = self.table.as_mut() {
            if table.in_cell() && !table.is_nested() {
                table.append_text(&String::from_utf8_lossy(data));
            }
            return;
        }

        let style = self.current_style();
        let mut i = 0;
        while i < data.len() {
            let byte = data[i];
            if data[i..].starts_with(&SOFT_HYPHEN) {
                i += SOFT_HYPHEN.len();
                continue;
            }

            if self.in_pre {
                match byte {
                    b'\n' => {
                        self.flush_word(style);
                        self.start_block(Alignment::Left, 0, false);
                    }
                    b' ' | b'\t' => {
                        self.flush_word(style);
                        self.paragraph.add_word(PRE_SPACE, style);
                    }
                    b'\r' => {}
                    _ => self.push_byte(byte, style),
                }
            } else if is_whitespace(byte) {
                self.flush_word(style);
            } else {
                self.push_byte(byte, style);
            }
            i += 1;
            // a single text node can hold any number of words
            self.split_if_too_long();
        }
    }

    /// Lay out all but the last line once the paragraph passes the word cap
    fn split_if_too_long(&mut self) {
        if self.paragraph.len() > MAX_PARAGRAPH_WORDS {
            log::debug!("[EHP] Text block too long, splitting into multiple pages");
            self.stats.forced_splits += 1;
            self.layout_paragraph(false);
        }
    }

    fn end_element(&mut self, name: &str) {
        if self.in_skip() {
            self.leave_element();
            return;
        }

        if let Some(table) = self.table.as_mut() {
            let mut closed = false;
            match name {
                "td" | "th" if !table.is_nested() => table.end_cell(),
                "table" => closed = table.leave_table(),
                _ => {}
            }
            if closed {
                if let Some(table) = self.table.take() {
                    self.render_table(table);
                }
            }
            self.leave_element();
            return;
        }

        if !self.word.is_empty() && self.closes_word(name) {
            self.flush_word(self.current_style());
        }

        if self.structured() {
            match name {
                "ul" | "ol" => {
                    self.lists.pop();
                }
                "blockquote" => self.blockquote_depth = self.blockquote_depth.saturating_sub(1),
                "pre" => self.in_pre = false,
                _ => {}
            }
        }

        self.leave_element();
    }

    /// Whether closing `name` ends the word being accumulated
    fn closes_word(&self, name: &str) -> bool {
        self.is_block_tag(name)
            || HEADER_TAGS.contains(&name)
            || BOLD_TAGS.contains(&name)
            || ITALIC_TAGS.contains(&name)
            || matches!(
                name,
                "li" | "dt" | "dd" | "figcaption" | "ul" | "ol" | "blockquote" | "pre"
            )
            // the root and body elements
            || self.depth <= 2
    }

    fn is_block_tag(&self, name: &str) -> bool {
        if self.structured() {
            BLOCK_TAGS.contains(&name)
        } else {
            LEGACY_BLOCK_TAGS.contains(&name)
        }
    }

    fn leave_element(&mut self) {
        self.depth = self.depth.saturating_sub(1);
        if self.skip_until == self.depth {
            self.skip_until = INACTIVE;
        }
        if self.bold_until == self.depth {
            self.bold_until = INACTIVE;
        }
        if self.italic_until == self.depth {
            self.italic_until = INACTIVE;
        }
    }

    fn push_byte(&mut self, byte: u8, style: FontStyle) {
        if let Some(word) = self.word.push(byte) {
            self.paragraph.add_word(word, style);
        }
    }

    fn flush_word(&mut self, style: FontStyle) {
        if let Some(word) = self.word.take() {
            self.paragraph.add_word(word, style);
        }
    }

    /// Start a paragraph using the base alignment, indented and flagged
    /// when inside a blockquote
    fn start_paragraph(&mut self) {
        let alignment = self.config.paragraph_alignment;
        if self.blockquote_depth > 0 {
            let indent = (self.blockquote_depth as u16).saturating_mul(BLOCKQUOTE_INDENT_PX);
            self.start_block(alignment, indent, true);
        } else {
            self.start_block(alignment, 0, false);
        }
    }

    /// Finish the current paragraph and prepare an empty one. An empty
    /// paragraph is reused rather than flushed.
    fn start_block(&mut self, alignment: Alignment, left_margin: u16, is_blockquote: bool) {
        self.flush_paragraph();
        self.paragraph.set_alignment(alignment);
        self.paragraph.set_left_margin(left_margin);
        self.paragraph.set_blockquote(is_blockquote);
    }

    /// Lay out any pending words, leaving the paragraph empty
    fn flush_paragraph(&mut self) {
        self.flush_word(self.current_style());
        if !self.paragraph.is_empty() {
            self.make_pages();
        }
    }

    fn make_pages(&mut self) {
        self.paginator.ensure_page();
        self.layout_paragraph(true);
        if self.paragraph.extra_paragraph_spacing() {
            let half_line = self.paginator.line_height() / 2;
            self.paginator.add_spacing(half_line);
        }
    }

    fn layout_paragraph(&mut self, include_last_line: bool) {
        let paginator = &mut self.paginator;
        let lines = &mut self.stats.lines;
        self.paragraph.layout_and_extract_lines(
            self.metrics,
            self.config.font_id,
            self.config.viewport_width,
            include_last_line,
            |line| {
                *lines += 1;
                paginator.add_line(line);
            },
        );
    }

    fn add_horizontal_rule(&mut self) {
        self.flush_paragraph();

        let mut rule = ParsedText::new(Alignment::Center, false);
        rule.add_word(HORIZONTAL_RULE_GLYPH.repeat(HORIZONTAL_RULE_GLYPHS), FontStyle::Regular);
        let mut block: Option<TextBlock> = None;
        rule.layout_and_extract_lines(
            self.metrics,
            self.config.font_id,
            self.config.viewport_width,
            true,
            |line| block = Some(line),
        );
        if let Some(block) = block {
            self.paginator.add_horizontal_rule(block);
            self.stats.lines += 1;
        }

        self.start_paragraph();
    }

    fn render_table(&mut self, table: TableData) {
        let rows = table.into_row_paragraphs(self.config.extra_paragraph_spacing);
        if rows.is_empty() {
            return;
        }
        for row in rows {
            self.paragraph = row;
            self.make_pages();
        }
        self.paragraph =
            ParsedText::new(self.config.paragraph_alignment, self.config.extra_paragraph_spacing);
        self.start_paragraph();

        let half_line = self.paginator.line_height() / 2;
        self.paginator.add_spacing(half_line);
    }

    fn process_image(&mut self, src: &str) {
        let Some(pipeline) = self.images.as_deref_mut() else {
            log::debug!("[EHP] No image pipeline, skipping {}", src);
            self.stats.images_skipped += 1;
            return;
        };

        match self.bridge.process(src, pipeline) {
            Some(image) => {
                self.flush_paragraph();
                self.paginator.add_image(image.path, image.width, image.height);
                self.stats.images_placed += 1;
            }
            None => self.stats.images_skipped += 1,
        }
    }

    /// Flush everything and emit the final page, which always exists
    fn finish(mut self) -> ParseStats {
        self.flush_word(self.current_style());
        self.make_pages();
        let mut stats = self.stats;
        stats.pages = self.paginator.finish();
        stats
    }
}

fn is_whitespace(byte: u8) -> bool {
    matches!(byte, b' ' | b'\r' | b'\n' | b'\t')
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ImageError;
    use crate::image::ConvertedImage;
    use crate::metrics::FixedWidthMetrics;

    fn parse_with(config: ChapterConfig, html: &str) -> (Vec<Page>, ParseStats) {
        let metrics = FixedWidthMetrics::default();
        let mut parser = ChapterParser::new(config, &metrics);
        let mut pages = Vec::new();
        let stats = parser
            .parse_bytes(html.as_bytes(), |page| pages.push(page))
            .unwrap();
        (pages, stats)
    }

    fn parse(html: &str) -> Vec<Page> {
        parse_with(ChapterConfig::default(), html).0
    }

    fn lines(pages: &[Page]) -> Vec<TextBlock> {
        pages
            .iter()
            .flat_map(|p| p.lines().map(|l| l.block.clone()))
            .collect()
    }

    fn words(pages: &[Page]) -> Vec<Vec<String>> {
        lines(pages).iter().map(|b| b.words().to_vec()).collect()
    }

    fn body(inner: &str) -> String {
        format!("<html><head><title>T</title></head><body>{}</body></html>", inner)
    }

    #[test]
    fn test_simple_paragraph() {
        let pages = parse(&body("<p>Hello world</p>"));
        assert_eq!(pages.len(), 1);
        assert_eq!(words(&pages), vec![vec!["Hello", "world"]]);
    }

    #[test]
    fn test_head_is_skipped() {
        let pages = parse(&body("<p>Body</p>"));
        assert_eq!(words(&pages), vec![vec!["Body"]]);
    }

    #[test]
    fn test_heading_centered_and_bold() {
        let pages = parse(&body("<h2>Title</h2><p>Text</p>"));
        let blocks = lines(&pages);
        assert_eq!(blocks[0].alignment(), Alignment::Center);
        assert_eq!(blocks[0].styles(), &[FontStyle::Bold]);
        assert_eq!(blocks[1].styles(), &[FontStyle::Regular]);
    }

    #[test]
    fn test_inline_styles() {
        let pages = parse(&body("<p>a <b>b <i>c</i></b> <em>d</em></p>"));
        let blocks = lines(&pages);
        assert_eq!(
            blocks[0].styles(),
            &[
                FontStyle::Regular,
                FontStyle::Bold,
                FontStyle::BoldItalic,
                FontStyle::Italic
            ]
        );
    }

    #[test]
    fn test_span_does_not_break_word() {
        let pages = parse(&body("<p>un<span>broken</span> word</p>"));
        assert_eq!(words(&pages), vec![vec!["unbroken", "word"]]);
    }

    #[test]
    fn test_br_splits_lines_and_keeps_alignment() {
        let config = ChapterConfig::default().with_paragraph_alignment(Alignment::Right);
        let (pages, _) = parse_with(config, &body("<p>foo<br/>bar</p>"));
        let blocks = lines(&pages);
        assert_eq!(blocks.len(), 2);
        assert_eq!(blocks[0].words(), ["foo"]);
        assert_eq!(blocks[1].words(), ["bar"]);
        assert_eq!(blocks[1].alignment(), Alignment::Right);
    }

    #[test]
    fn test_soft_hyphen_dropped() {
        let pages = parse(&body("<p>hy\u{00AD}phen</p>"));
        assert_eq!(words(&pages), vec![vec!["hyphen"]]);
    }

    #[test]
    fn test_entities_resolved() {
        let pages = parse(&body("<p>a&amp;b &#8220;q&#8221; x&nbsp;y &bogus;z</p>"));
        assert_eq!(
            words(&pages),
            vec![vec!["a&b", "\u{201C}q\u{201D}", "x\u{00A0}y", "z"]]
        );
    }

    #[test]
    fn test_page_break_markers_skipped() {
        let pages = parse(&body(
            "<p>one</p><span epub:type=\"pagebreak\">12</span><div role=\"doc-pagebreak\">13</div><p>two</p>",
        ));
        assert_eq!(words(&pages), vec![vec!["one"], vec!["two"]]);
    }

    #[test]
    fn test_unordered_list_bullets_and_margin() {
        let pages = parse(&body("<ul><li>One</li><li>Two</li></ul>"));
        let blocks = lines(&pages);
        assert_eq!(blocks.len(), 2);
        for block in &blocks {
            assert_eq!(block.words()[0], BULLET);
            assert_eq!(block.left_margin(), 24);
            assert_eq!(block.alignment(), Alignment::Left);
        }
    }

    #[test]
    fn test_nested_list_margin_capped() {
        let mut html = String::new();
        for _ in 0..8 {
            html.push_str("<ul><li>x");
        }
        for _ in 0..8 {
            html.push_str("</li></ul>");
        }
        let pages = parse(&body(&html));
        let margins: Vec<u16> = lines(&pages).iter().map(|b| b.left_margin()).collect();
        assert_eq!(margins, vec![24, 48, 72, 96, 120, 144, 144, 144]);
    }

    #[test]
    fn test_ordered_list_numbers() {
        let pages = parse(&body("<ol><li>A</li><li>B</li></ol>"));
        let w = words(&pages);
        assert_eq!(w[0][0], "1. ");
        assert_eq!(w[1][0], "2. ");
    }

    #[test]
    fn test_blockquote_margins() {
        let pages = parse(&body(
            "<blockquote><p>a</p><blockquote><p>b</p><blockquote><p>c</p></blockquote></blockquote></blockquote><p>d</p>",
        ));
        let blocks = lines(&pages);
        let margins: Vec<(u16, bool)> = blocks
            .iter()
            .map(|b| (b.left_margin(), b.is_blockquote()))
            .collect();
        assert_eq!(
            margins,
            vec![(32, true), (64, true), (96, true), (0, false)]
        );
    }

    #[test]
    fn test_pre_preserves_spaces_and_lines() {
        let pages = parse(&body("<pre>a b\nc</pre>"));
        assert_eq!(
            words(&pages),
            vec![vec!["a", PRE_SPACE, "b"], vec!["c"]]
        );
    }

    #[test]
    fn test_definition_list() {
        let pages = parse(&body("<dl><dt>Term</dt><dd>Meaning</dd></dl>"));
        let blocks = lines(&pages);
        assert_eq!(blocks[0].styles(), &[FontStyle::Bold]);
        assert_eq!(blocks[0].left_margin(), 0);
        assert_eq!(blocks[1].styles(), &[FontStyle::Regular]);
        assert_eq!(blocks[1].left_margin(), 24);
    }

    #[test]
    fn test_figcaption_centered_italic() {
        let pages = parse(&body("<figure><figcaption>Caption</figcaption></figure>"));
        let blocks = lines(&pages);
        assert_eq!(blocks[0].alignment(), Alignment::Center);
        assert_eq!(blocks[0].styles(), &[FontStyle::Italic]);
    }

    #[test]
    fn test_horizontal_rule() {
        let pages = parse(&body("<p>above</p><hr/><p>below</p>"));
        let blocks = lines(&pages);
        assert_eq!(blocks.len(), 3);
        assert_eq!(blocks[1].words()[0], HORIZONTAL_RULE_GLYPH.repeat(20));
        assert_eq!(blocks[1].alignment(), Alignment::Center);
    }

    #[test]
    fn test_table_row_tokens() {
        let pages = parse(&body("<table><tr><td>A</td><td>B</td></tr></table>"));
        assert_eq!(words(&pages), vec![vec!["A", "|", "B"]]);
    }

    #[test]
    fn test_nested_table_ignored() {
        let pages = parse(&body(
            "<table><tr><td>A<table><tr><td>X</td></tr></table></td><td>B</td></tr></table>",
        ));
        assert_eq!(words(&pages), vec![vec!["A", "|", "B"]]);
    }

    #[test]
    fn test_legacy_mode_skips_tables_and_flattens_lists() {
        let config = ChapterConfig::default().with_markup_mode(MarkupMode::Legacy);
        let (pages, _) = parse_with(
            config,
            &body("<table><tr><td>A</td></tr></table><ul><li>One</li></ul>"),
        );
        let blocks = lines(&pages);
        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0].words(), ["One"]);
        assert_eq!(blocks[0].left_margin(), 0);
    }

    #[test]
    fn test_long_word_split() {
        let long: String = core::iter::repeat('w').take(450).collect();
        let pages = parse(&body(&format!("<p>{}</p>", long)));
        let tokens: Vec<String> = words(&pages).concat();
        assert_eq!(tokens.len(), 3);
        assert_eq!(tokens.concat(), long);
    }

    #[test]
    fn test_forced_split_counts() {
        let text = "w ".repeat(800);
        let (_, stats) = parse_with(ChapterConfig::default(), &body(&format!("<p>{}</p>", text)));
        assert!(stats.forced_splits >= 1);
    }

    #[test]
    fn test_single_text_node_split_repeatedly() {
        // one text event; 24 words fit a line, so each split leaves 7 behind
        let text = "w ".repeat(5000);
        let (pages, stats) = parse_with(ChapterConfig::default(), &body(&format!("<p>{}</p>", text)));
        assert_eq!(stats.forced_splits, 6);
        let total: usize = pages
            .iter()
            .flat_map(|p| p.lines())
            .map(|l| l.block.word_count())
            .sum();
        assert_eq!(total, 5000);
    }

    #[test]
    fn test_empty_document_emits_one_page() {
        let (pages, stats) = parse_with(ChapterConfig::default(), "<html><body></body></html>");
        assert_eq!(pages.len(), 1);
        assert!(pages[0].is_empty());
        assert_eq!(stats.pages, 1);
    }

    #[test]
    fn test_mismatched_tags_fail() {
        let metrics = FixedWidthMetrics::default();
        let mut parser = ChapterParser::new(ChapterConfig::default(), &metrics);
        let err = parser
            .parse_bytes(b"<html><body><p>x</div></body></html>", |_| {})
            .unwrap_err();
        assert!(matches!(err, ChapterError::Parse { .. }));
    }

    #[test]
    fn test_unclosed_document_fails() {
        let metrics = FixedWidthMetrics::default();
        let mut parser = ChapterParser::new(ChapterConfig::default(), &metrics);
        let err = parser
            .parse_bytes(b"<html><body><p>x", |_| {})
            .unwrap_err();
        assert!(matches!(
            err,
            ChapterError::UnexpectedEof { .. } | ChapterError::Parse { .. }
        ));
    }

    struct FixedImages;

    impl ImagePipeline for FixedImages {
        fn convert(
            &mut self,
            _source_path: &str,
            cache_path: &str,
            _max_width: u16,
            _max_height: u16,
        ) -> Result<ConvertedImage, ImageError> {
            Ok(ConvertedImage {
                path: cache_path.to_string(),
                width: 100,
                height: 50,
            })
        }

        fn discard(&mut self, _cache_path: &str) {}
    }

    #[test]
    fn test_image_placed_after_pending_text() {
        let metrics = FixedWidthMetrics::default();
        let mut images = FixedImages;
        let config = ChapterConfig::default()
            .with_image_cache_dir("cache")
            .with_extra_paragraph_spacing(false);
        let mut parser = ChapterParser::new(config, &metrics).with_image_pipeline(&mut images);
        let mut pages = Vec::new();
        let stats = parser
            .parse_bytes(
                body("<p>before <img src=\"a.jpg\"/> after</p>").as_bytes(),
                |page| pages.push(page),
            )
            .unwrap();
        assert_eq!(stats.images_placed, 1);

        let page = &pages[0];
        assert!(page.elements[0].as_line().is_some());
        let image = page.elements[1].as_image().unwrap();
        assert_eq!(image.path, "cache/img_0.bmp");
        assert_eq!(image.x, (474 - 100) / 2);
        assert_eq!(image.y, 20);
        // 20 (line) + 50 (image) + 10 (half line)
        assert_eq!(page.elements[2].y(), 80);
    }

    #[test]
    fn test_image_without_pipeline_skipped() {
        let (pages, stats) = parse_with(
            ChapterConfig::default(),
            &body("<p><img src=\"a.jpg\"/>text</p>"),
        );
        assert_eq!(stats.images_skipped, 1);
        assert_eq!(pages[0].images().count(), 0);
        assert_eq!(words(&pages), vec![vec!["text"]]);
    }
}
