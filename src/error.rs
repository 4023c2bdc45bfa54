//! Unified error types for mu-chapter
//!
//! `ChapterError` is what `ChapterParser::parse_*` reports. `CacheError`
//! covers rejected persisted data, and `ImageError` covers per-image
//! failures that are logged and skipped rather than propagated.

extern crate alloc;

use alloc::string::String;
use core::fmt;

/// Top-level error type for chapter parsing
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ChapterError {
    /// Source could not be opened or read (description only, since
    /// `std::io::Error` is not `Clone`)
    Io(String),
    /// Markup is not well-formed
    Parse {
        /// Reader error description.
        message: String,
        /// Byte offset in the source where the error was detected.
        position: u64,
    },
    /// Source ended while elements were still open
    UnexpectedEof {
        /// Nesting depth at end of input.
        depth: usize,
    },
    /// Persisted page data was rejected
    Cache(CacheError),
}

impl fmt::Display for ChapterError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChapterError::Io(msg) => write!(f, "I/O error: {}", msg),
            ChapterError::Parse { message, position } => {
                write!(f, "Parse error at byte {}: {}", position, message)
            }
            ChapterError::UnexpectedEof { depth } => write!(
                f,
                "Unexpected end of document ({} element(s) still open)",
                depth
            ),
            ChapterError::Cache(err) => write!(f, "Cache error: {}", err),
        }
    }
}

/// Reasons a persisted block, page, or section file is rejected
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum CacheError {
    /// Underlying read/write failed
    Io(String),
    /// Stored word count exceeds the sanity limit
    WordCountTooLarge {
        /// Count found in the stream.
        count: usize,
        /// Maximum accepted count.
        max: usize,
    },
    /// Per-word arrays disagree in length
    LengthMismatch {
        /// Number of words.
        words: usize,
        /// Number of x-offsets.
        offsets: usize,
        /// Number of styles.
        styles: usize,
    },
    /// Unknown alignment byte
    InvalidAlignment(u8),
    /// Unknown font style byte
    InvalidStyle(u8),
    /// Unknown page element tag
    InvalidElementTag(u8),
    /// Stored string is not UTF-8
    InvalidUtf8,
    /// Container written by a different format version
    VersionMismatch {
        /// Version found in the file.
        found: u8,
        /// Version this build reads.
        expected: u8,
    },
    /// Container was built with different layout settings
    ConfigMismatch,
    /// Stored checksum does not match the content
    ChecksumMismatch {
        /// Checksum stored in the file.
        stored: u32,
        /// Checksum computed over the content.
        computed: u32,
    },
    /// Requested page is past the end of the container
    PageOutOfBounds {
        /// Requested page index.
        index: usize,
        /// Number of pages stored.
        page_count: usize,
    },
}

impl fmt::Display for CacheError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CacheError::Io(msg) => write!(f, "I/O error: {}", msg),
            CacheError::WordCountTooLarge { count, max } => {
                write!(f, "word count {} exceeds maximum {}", count, max)
            }
            CacheError::LengthMismatch {
                words,
                offsets,
                styles,
            } => write!(
                f,
                "size mismatch (words={}, xpos={}, styles={})",
                words, offsets, styles
            ),
            CacheError::InvalidAlignment(v) => write!(f, "invalid alignment byte {}", v),
            CacheError::InvalidStyle(v) => write!(f, "invalid style byte {}", v),
            CacheError::InvalidElementTag(v) => write!(f, "invalid page element tag {}", v),
            CacheError::InvalidUtf8 => write!(f, "stored string is not valid UTF-8"),
            CacheError::VersionMismatch { found, expected } => {
                write!(f, "version {} does not match expected {}", found, expected)
            }
            CacheError::ConfigMismatch => write!(f, "layout settings changed"),
            CacheError::ChecksumMismatch { stored, computed } => write!(
                f,
                "checksum mismatch (stored {:08x}, computed {:08x})",
                stored, computed
            ),
            CacheError::PageOutOfBounds { index, page_count } => write!(
                f,
                "page index {} out of bounds (page count: {})",
                index, page_count
            ),
        }
    }
}

/// Per-image failures inside the image bridge
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ImageError {
    /// Image format is not handled by the pipeline
    Unsupported,
    /// Source could not be extracted from the archive
    Extract(String),
    /// Conversion to the cached bitmap failed
    Convert(String),
    /// Conversion produced zero width or height
    EmptyImage,
}

impl fmt::Display for ImageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ImageError::Unsupported => write!(f, "unsupported image format"),
            ImageError::Extract(msg) => write!(f, "extraction failed: {}", msg),
            ImageError::Convert(msg) => write!(f, "conversion failed: {}", msg),
            ImageError::EmptyImage => write!(f, "image has zero dimensions"),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for ChapterError {}

#[cfg(feature = "std")]
impl std::error::Error for CacheError {}

#[cfg(feature = "std")]
impl std::error::Error for ImageError {}

impl From<CacheError> for ChapterError {
    fn from(err: CacheError) -> Self {
        ChapterError::Cache(err)
    }
}

#[cfg(feature = "std")]
impl From<std::io::Error> for CacheError {
    fn from(err: std::io::Error) -> Self {
        use alloc::string::ToString;
        CacheError::Io(err.to_string())
    }
}
