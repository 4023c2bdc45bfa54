//! mu-chapter -- Streaming EPUB chapter pagination for embedded readers
//!
//! Turns one XHTML chapter into fixed-size pages of positioned text lines
//! and images, reading the source in small chunks and handing each page to
//! the caller as soon as it is complete. Built for e-ink devices where
//! the whole chapter, let alone a DOM, does not fit in memory.
//!
//! # Features
//!
//! - `std` (default) -- chapter parser, persisted page formats, section
//!   cache files, image bridge, logging
//! - `async` -- tokio file read helper
//! - `cli` -- the `mu-chapter` inspection binary
//!
//! # Allocation Behavior
//!
//! Words are accumulated in a fixed 200-byte buffer. Paragraphs are laid
//! out early once they exceed 750 words, and only the page being built is
//! held; completed pages are moved to the caller. Without `std`, the
//! layout core (paragraph buffer, line breaking, pages, paginator, table
//! capture) is still available on `alloc`.

#![cfg_attr(not(feature = "std"), no_std)]
#![warn(missing_docs)]
#![deny(clippy::large_enum_variant, clippy::large_stack_arrays, clippy::redundant_clone)]
#![warn(
    clippy::box_collection,
    clippy::needless_collect,
    clippy::map_clone,
    clippy::implicit_clone,
    clippy::inefficient_to_string
)]

extern crate alloc;

pub mod config;
pub mod error;
pub mod metrics;
pub mod page;
pub mod paginator;
pub mod paragraph;
pub mod table;
pub mod text_block;
pub mod word_buffer;

#[cfg(feature = "std")]
pub mod image;

#[cfg(feature = "std")]
pub mod parser;

#[cfg(feature = "std")]
pub mod progress;

#[cfg(feature = "std")]
pub mod section;

#[cfg(feature = "std")]
pub(crate) mod serialization;

#[cfg(feature = "async")]
pub mod async_api;

// Re-export key types for convenience
#[cfg(feature = "async")]
pub use async_api::parse_chapter_file_async;
pub use config::{ChapterConfig, MarkupMode};
pub use error::{CacheError, ChapterError, ImageError};
#[cfg(feature = "std")]
pub use image::{ConvertedImage, ImageBridge, ImagePipeline};
pub use metrics::{FixedWidthMetrics, TextMetrics};
pub use page::{Page, PageElement, PageImage, PageLine};
pub use paginator::Paginator;
pub use paragraph::ParsedText;
#[cfg(feature = "std")]
pub use parser::{ChapterParser, ParseStats};
#[cfg(feature = "std")]
pub use progress::ProgressReader;
#[cfg(feature = "std")]
pub use section::{build_section_file, SectionCache, SectionHeader, SectionWriter};
pub use table::TableData;
pub use text_block::{Alignment, FontStyle, TextBlock};
pub use word_buffer::WordBuffer;
