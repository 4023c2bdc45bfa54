//! Vertical packing of lines and images into fixed-height pages
//!
//! The paginator has no page until the first element arrives. From then on
//! it holds the page being built plus a y cursor; when the next element
//! would cross the bottom edge, the page is handed to the callback and a
//! fresh one starts at y = 0. Pages reach the callback in document order,
//! each exactly once.

extern crate alloc;

use alloc::string::String;

use crate::page::{Page, PageImage};
use crate::text_block::TextBlock;

/// Packs elements into pages and emits each completed page
pub struct Paginator<F: FnMut(Page)> {
    viewport_width: i32,
    viewport_height: i32,
    line_height: i32,
    page: Option<Page>,
    cursor: i32,
    on_page: F,
    pages_emitted: usize,
}

impl<F: FnMut(Page)> Paginator<F> {
    /// Create a paginator for a viewport, given the (compressed) line height
    pub fn new(viewport_width: u16, viewport_height: u16, line_height: i32, on_page: F) -> Self {
        Self {
            viewport_width: i32::from(viewport_width),
            viewport_height: i32::from(viewport_height),
            line_height,
            page: None,
            cursor: 0,
            on_page,
            pages_emitted: 0,
        }
    }

    /// Line height used for text and spacing
    pub fn line_height(&self) -> i32 {
        self.line_height
    }

    /// Current y cursor on the page being built
    pub fn cursor(&self) -> i32 {
        self.cursor
    }

    /// Number of pages handed to the callback so far
    pub fn pages_emitted(&self) -> usize {
        self.pages_emitted
    }

    /// Whether a page is currently being built
    pub fn has_page(&self) -> bool {
        self.page.is_some()
    }

    /// Start a page if none exists yet
    pub fn ensure_page(&mut self) {
        if self.page.is_none() {
            self.page = Some(Page::new());
            self.cursor = 0;
        }
    }

    /// Place a text line at the cursor, breaking the page first if needed
    pub fn add_line(&mut self, block: TextBlock) {
        self.break_if_needed(self.line_height);
        let y = self.cursor_y();
        if let Some(page) = self.page.as_mut() {
            page.push_line(block, 0, y);
        }
        self.cursor += self.line_height;
    }

    /// Place an image horizontally centered, followed by half a line of space
    pub fn add_image(&mut self, path: String, width: u16, height: u16) {
        let x = ((self.viewport_width - i32::from(width)) / 2).max(0);
        self.break_if_needed(i32::from(height));
        let y = self.cursor_y();
        if let Some(page) = self.page.as_mut() {
            page.push_image(PageImage {
                path,
                width,
                height,
                x: x.min(i32::from(i16::MAX)) as i16,
                y,
            });
        }
        self.cursor += i32::from(height) + self.line_height / 2;
    }

    /// Place a rule line with half a line of space above and below
    pub fn add_horizontal_rule(&mut self, rule: TextBlock) {
        self.ensure_page();
        self.cursor += self.line_height / 2;
        self.add_line(rule);
        self.cursor += self.line_height / 2;
    }

    /// Advance the cursor without placing anything
    pub fn add_spacing(&mut self, pixels: i32) {
        self.ensure_page();
        self.cursor += pixels;
    }

    /// Emit the page being built, if any, and return the total emitted
    pub fn finish(mut self) -> usize {
        if let Some(page) = self.page.take() {
            (self.on_page)(page);
            self.pages_emitted += 1;
        }
        self.pages_emitted
    }

    /// Emit the current page and start a fresh one when `height` more
    /// pixels would not fit. A page without elements is never emitted
    /// here, so an element taller than the viewport still gets placed.
    fn break_if_needed(&mut self, height: i32) {
        self.ensure_page();
        if self.cursor + height <= self.viewport_height {
            return;
        }
        let has_content = self.page.as_ref().is_some_and(|p| !p.is_empty());
        if has_content {
            if let Some(page) = self.page.replace(Page::new()) {
                (self.on_page)(page);
                self.pages_emitted += 1;
            }
        }
        self.cursor = 0;
    }

    fn cursor_y(&self) -> i16 {
        self.cursor.clamp(0, i32::from(i16::MAX)) as i16
    }
}
