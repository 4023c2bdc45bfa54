//! Optional async helpers for chapter parsing.
//!
//! This module is available with the `async` feature.

use core::result::Result;
use std::path::Path;

use crate::error::ChapterError;
use crate::metrics::TextMetrics;
use crate::page::Page;
use crate::parser::{ChapterParser, ParseStats};

/// Read a chapter file asynchronously and parse it into pages.
///
/// The file is read into memory with `tokio::fs::read`; parsing itself
/// runs synchronously on the calling task.
pub async fn parse_chapter_file_async<P, M, F>(
    path: P,
    parser: &mut ChapterParser<'_, M>,
    on_page: F,
) -> Result<ParseStats, ChapterError>
where
    P: AsRef<Path>,
    M: TextMetrics + ?Sized,
    F: FnMut(Page),
{
    let bytes = tokio::fs::read(path)
        .await
        .map_err(|e| ChapterError::Io(e.to_string()))?;
    parser.parse_bytes(&bytes, on_page)
}
