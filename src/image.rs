//! Inline image resolution
//!
//! `<img src>` values are resolved against the chapter's directory inside
//! the archive, filtered to JPEG, and handed to an external
//! [`ImagePipeline`] that writes a scaled bitmap into the image cache.
//! Failures are logged and skipped; they never abort parsing.

extern crate alloc;

use alloc::format;
use alloc::string::String;
use alloc::vec::Vec;

use crate::config::{INLINE_IMAGE_MAX_HEIGHT, INLINE_IMAGE_MAX_WIDTH};
use crate::error::ImageError;

/// A bitmap written to the image cache
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ConvertedImage {
    /// Path of the cached bitmap
    pub path: String,
    /// Width in pixels after scaling
    pub width: u16,
    /// Height in pixels after scaling
    pub height: u16,
}

/// Extraction and conversion of archive images to cached bitmaps
pub trait ImagePipeline {
    /// Extract `source_path` from the archive and write a bitmap to
    /// `cache_path`, scaled to fit `max_width` x `max_height` with the
    /// aspect ratio preserved.
    fn convert(
        &mut self,
        source_path: &str,
        cache_path: &str,
        max_width: u16,
        max_height: u16,
    ) -> Result<ConvertedImage, ImageError>;

    /// Remove a cache file left behind by a failed conversion.
    fn discard(&mut self, cache_path: &str);
}

/// Resolves image sources and names cache files for one chapter
#[derive(Clone, Debug)]
pub struct ImageBridge {
    content_base_path: String,
    image_cache_dir: String,
    image_counter: usize,
}

impl ImageBridge {
    /// Create a bridge for a chapter directory and cache directory
    pub fn new(content_base_path: &str, image_cache_dir: &str) -> Self {
        Self {
            content_base_path: String::from(content_base_path),
            image_cache_dir: String::from(image_cache_dir),
            image_counter: 0,
        }
    }

    /// Resolve and convert one `src`. Returns `None` when the image is
    /// skipped for any reason.
    pub fn process(&mut self, src: &str, pipeline: &mut dyn ImagePipeline) -> Option<ConvertedImage> {
        if src.is_empty() {
            return None;
        }

        let full_path = normalize_path(&self.content_base_path, src);
        if !is_jpeg_file(&full_path) {
            log::info!("[IMG] Skipping non-JPEG image: {}", full_path);
            return None;
        }

        let cache_path = format!("{}/img_{}.bmp", self.image_cache_dir, self.image_counter);
        self.image_counter += 1;

        match pipeline.convert(
            &full_path,
            &cache_path,
            INLINE_IMAGE_MAX_WIDTH,
            INLINE_IMAGE_MAX_HEIGHT,
        ) {
            Ok(image) if image.width > 0 && image.height > 0 => {
                log::info!(
                    "[IMG] Converted image {} -> {} ({}x{})",
                    full_path,
                    image.path,
                    image.width,
                    image.height
                );
                Some(image)
            }
            Ok(_) => {
                log::warn!("[IMG] Failed to convert image {}: {}", full_path, ImageError::EmptyImage);
                pipeline.discard(&cache_path);
                None
            }
            Err(err) => {
                log::warn!("[IMG] Failed to convert image {}: {}", full_path, err);
                pipeline.discard(&cache_path);
                None
            }
        }
    }

    /// Number of cache names handed out so far
    pub fn images_seen(&self) -> usize {
        self.image_counter
    }
}

/// Resolve `relative` against `base`, collapsing `.` and `..` segments.
///
/// A leading `/` means the path is already archive-absolute; the slash is
/// dropped since archive entry names have none.
pub fn normalize_path(base: &str, relative: &str) -> String {
    if let Some(stripped) = relative.strip_prefix('/') {
        return String::from(stripped);
    }

    let combined = format!("{}{}", base, relative);
    let mut parts: Vec<&str> = Vec::new();
    for part in combined.split('/') {
        match part {
            ".." => {
                parts.pop();
            }
            "." | "" => {}
            other => parts.push(other),
        }
    }
    parts.join("/")
}

/// Whether the path names a JPEG by extension (case-insensitive)
pub fn is_jpeg_file(path: &str) -> bool {
    let lower = path.to_ascii_lowercase();
    lower.ends_with(".jpg") || lower.ends_with(".jpeg")
}
