//! Layout settings and fixed limits for chapter pagination

extern crate alloc;

use alloc::string::String;

use crate::text_block::Alignment;

/// Word accumulator capacity in bytes; longer words are split.
pub const MAX_WORD_SIZE: usize = 200;

/// Paragraph word count above which a partial layout is forced.
pub const MAX_PARAGRAPH_WORDS: usize = 750;

/// Left indent per list nesting level.
pub const LIST_INDENT_PX: u16 = 24;

/// Nesting levels beyond this do not indent further.
pub const MAX_LIST_NESTING: usize = 6;

/// Left indent per blockquote nesting level.
pub const BLOCKQUOTE_INDENT_PX: u16 = 32;

/// Bounding box for inline images (480 minus side margins).
pub const INLINE_IMAGE_MAX_WIDTH: u16 = 474;

/// Leaves room for surrounding text on the page.
pub const INLINE_IMAGE_MAX_HEIGHT: u16 = 600;

/// Smaller chapters do not report progress.
pub const MIN_SIZE_FOR_PROGRESS: u64 = 50 * 1024;

/// Bytes pulled from the source per read.
pub const READ_CHUNK_SIZE: usize = 1024;

/// Number of U+2015 glyphs in a horizontal rule line.
pub const HORIZONTAL_RULE_GLYPHS: usize = 20;

/// Sanity cap on persisted word counts.
pub const MAX_SERIALIZED_WORDS: usize = 10_000;

/// How structural tags are interpreted.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum MarkupMode {
    /// Lists, blockquotes, tables, pre, definition lists, figures and
    /// rules get dedicated handling.
    #[default]
    Structured,
    /// Only headers, `p`/`div`/`br`/`li`/`blockquote` paragraphs, emphasis,
    /// images and skip regions are recognized.
    Legacy,
}

/// Settings for one chapter pagination pass
#[derive(Clone, Debug, PartialEq)]
pub struct ChapterConfig {
    /// Font handed to the text metrics provider.
    pub font_id: i32,
    /// Multiplier applied to the provider's line height.
    pub line_compression: f32,
    /// Add half a line of space after every paragraph.
    pub extra_paragraph_spacing: bool,
    /// Alignment used for ordinary paragraphs and blockquotes.
    pub paragraph_alignment: Alignment,
    /// Usable width in pixels.
    pub viewport_width: u16,
    /// Usable height in pixels.
    pub viewport_height: u16,
    /// Directory of the chapter inside the archive, with trailing `/`.
    pub content_base_path: String,
    /// Directory where converted image bitmaps are written.
    pub image_cache_dir: String,
    /// Tag interpretation mode.
    pub markup_mode: MarkupMode,
}

impl Default for ChapterConfig {
    fn default() -> Self {
        Self {
            font_id: 0,
            line_compression: 1.0,
            extra_paragraph_spacing: true,
            paragraph_alignment: Alignment::Justified,
            viewport_width: 474,
            viewport_height: 780,
            content_base_path: String::new(),
            image_cache_dir: String::new(),
            markup_mode: MarkupMode::Structured,
        }
    }
}

impl ChapterConfig {
    /// Create settings for a viewport, keeping other defaults.
    pub fn new(viewport_width: u16, viewport_height: u16) -> Self {
        Self {
            viewport_width,
            viewport_height,
            ..Self::default()
        }
    }

    /// Set the font id.
    pub fn with_font_id(mut self, font_id: i32) -> Self {
        self.font_id = font_id;
        self
    }

    /// Set the line height multiplier.
    pub fn with_line_compression(mut self, line_compression: f32) -> Self {
        self.line_compression = line_compression;
        self
    }

    /// Enable or disable extra space after paragraphs.
    pub fn with_extra_paragraph_spacing(mut self, enabled: bool) -> Self {
        self.extra_paragraph_spacing = enabled;
        self
    }

    /// Set the base paragraph alignment.
    pub fn with_paragraph_alignment(mut self, alignment: Alignment) -> Self {
        self.paragraph_alignment = alignment;
        self
    }

    /// Set the archive directory used to resolve relative image sources.
    pub fn with_content_base_path(mut self, path: impl Into<String>) -> Self {
        self.content_base_path = path.into();
        self
    }

    /// Set the directory for converted image bitmaps.
    pub fn with_image_cache_dir(mut self, dir: impl Into<String>) -> Self {
        self.image_cache_dir = dir.into();
        self
    }

    /// Set the tag interpretation mode.
    pub fn with_markup_mode(mut self, mode: MarkupMode) -> Self {
        self.markup_mode = mode;
        self
    }

    /// Line height after compression, truncated to whole pixels.
    pub fn scaled_line_height(&self, raw_line_height: u16) -> i32 {
        (f32::from(raw_line_height) * self.line_compression) as i32
    }
}
