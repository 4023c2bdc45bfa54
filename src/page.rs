//! Pages of positioned lines and images
//!
//! Elements are stored top-down in placement order. The running vertical
//! cursor belongs to the [`Paginator`](crate::paginator::Paginator), not to
//! the page.

extern crate alloc;

use alloc::string::String;
use alloc::vec::Vec;

use crate::text_block::TextBlock;

/// A laid-out line placed at a position on the page
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PageLine {
    /// The line content
    pub block: TextBlock,
    /// Left edge in pixels
    pub x: i16,
    /// Top edge in pixels
    pub y: i16,
}

/// A cached bitmap placed at a position on the page
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PageImage {
    /// Path of the converted bitmap in the image cache
    pub path: String,
    /// Width in pixels
    pub width: u16,
    /// Height in pixels
    pub height: u16,
    /// Left edge in pixels
    pub x: i16,
    /// Top edge in pixels
    pub y: i16,
}

/// One element of a page
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PageElement {
    /// A line of text
    Line(PageLine),
    /// An image
    Image(PageImage),
}

impl PageElement {
    /// Top edge in pixels
    pub fn y(&self) -> i16 {
        match self {
            PageElement::Line(line) => line.y,
            PageElement::Image(image) => image.y,
        }
    }

    /// The line, if this element is one
    pub fn as_line(&self) -> Option<&PageLine> {
        match self {
            PageElement::Line(line) => Some(line),
            PageElement::Image(_) => None,
        }
    }

    /// The image, if this element is one
    pub fn as_image(&self) -> Option<&PageImage> {
        match self {
            PageElement::Image(image) => Some(image),
            PageElement::Line(_) => None,
        }
    }
}

/// One screen of content
#[derive(Clone, Debug, PartialEq, Eq, Default)]
pub struct Page {
    /// Elements in placement order
    pub elements: Vec<PageElement>,
}

impl Page {
    /// Create an empty page
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a line at `(x, y)`
    pub fn push_line(&mut self, block: TextBlock, x: i16, y: i16) {
        self.elements.push(PageElement::Line(PageLine { block, x, y }));
    }

    /// Append an image
    pub fn push_image(&mut self, image: PageImage) {
        self.elements.push(PageElement::Image(image));
    }

    /// Check if page has no elements
    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    /// Number of elements
    pub fn len(&self) -> usize {
        self.elements.len()
    }

    /// Lines in placement order
    pub fn lines(&self) -> impl Iterator<Item = &PageLine> + '_ {
        self.elements.iter().filter_map(PageElement::as_line)
    }

    /// Images in placement order
    pub fn images(&self) -> impl Iterator<Item = &PageImage> + '_ {
        self.elements.iter().filter_map(PageElement::as_image)
    }
}

#[cfg(feature = "std")]
mod persist {
    use super::*;
    use std::io::{Read, Write};

    use crate::error::CacheError;
    use crate::serialization::{
        read_i16, read_string, read_u16, read_u8, write_i16, write_string, write_u16, write_u8,
    };

    const TAG_PAGE_LINE: u8 = 1;
    const TAG_PAGE_IMAGE: u8 = 2;

    impl PageImage {
        /// Write `x:i16, y:i16, width:u16, height:u16, path`.
        pub fn serialize<W: Write>(&self, w: &mut W) -> Result<(), CacheError> {
            write_i16(w, self.x)?;
            write_i16(w, self.y)?;
            write_u16(w, self.width)?;
            write_u16(w, self.height)?;
            write_string(w, &self.path)
        }

        /// Read an image written by [`PageImage::serialize`].
        pub fn deserialize<R: Read>(r: &mut R) -> Result<Self, CacheError> {
            let x = read_i16(r)?;
            let y = read_i16(r)?;
            let width = read_u16(r)?;
            let height = read_u16(r)?;
            let path = read_string(r)?;
            Ok(Self {
                path,
                width,
                height,
                x,
                y,
            })
        }
    }

    impl Page {
        /// Write the element count followed by tagged elements.
        pub fn serialize<W: Write>(&self, w: &mut W) -> Result<(), CacheError> {
            write_u16(w, self.elements.len() as u16)?;
            for element in &self.elements {
                match element {
                    PageElement::Line(line) => {
                        write_u8(w, TAG_PAGE_LINE)?;
                        write_i16(w, line.x)?;
                        write_i16(w, line.y)?;
                        line.block.serialize(w)?;
                    }
                    PageElement::Image(image) => {
                        write_u8(w, TAG_PAGE_IMAGE)?;
                        image.serialize(w)?;
                    }
                }
            }
            Ok(())
        }

        /// Read a page written by [`Page::serialize`].
        pub fn deserialize<R: Read>(r: &mut R) -> Result<Self, CacheError> {
            let count = read_u16(r)? as usize;
            let mut page = Page::new();
            for _ in 0..count {
                match read_u8(r)? {
                    TAG_PAGE_LINE => {
                        let x = read_i16(r)?;
                        let y = read_i16(r)?;
                        let block = TextBlock::deserialize(r)?;
                        page.push_line(block, x, y);
                    }
                    TAG_PAGE_IMAGE => page.push_image(PageImage::deserialize(r)?),
                    tag => return Err(CacheError::InvalidElementTag(tag)),
                }
            }
            Ok(page)
        }
    }
}
