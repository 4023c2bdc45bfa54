//! Section cache files
//!
//! A parsed chapter's pages are persisted so the chapter can be reopened
//! without parsing again. Layout of a file (little-endian):
//!
//! ```text
//! header      version:u8 font_id:i32 line_compression:f32 extra_spacing:u8
//!             alignment:u8 viewport_width:u16 viewport_height:u16
//!             page_count:u16 lut_offset:u32
//! pages       page_count serialized pages
//! lut         page_count x u32 absolute page offsets
//! checksum    u32 CRC-32 of every preceding byte
//! ```
//!
//! A file whose version, layout settings, or checksum do not match is
//! stale and must be rebuilt. A page that fails to decode makes the whole
//! file stale as well.

use std::fs::File;
use std::io::{BufWriter, Cursor, Seek, SeekFrom, Write};
use std::path::Path;

use crate::config::ChapterConfig;
use crate::error::{CacheError, ChapterError};
use crate::metrics::TextMetrics;
use crate::page::Page;
use crate::parser::{ChapterParser, ParseStats};
use crate::serialization::{
    read_i32, read_u16, read_u32, read_u8, write_i32, write_u16, write_u32, write_u8,
};
use crate::text_block::Alignment;

/// Version written into new section files
pub const SECTION_FILE_VERSION: u8 = 1;

const HEADER_SIZE: usize = 21;
const CHECKSUM_SIZE: usize = 4;

/// Layout settings a section file was built with
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SectionHeader {
    /// Font handed to the metrics provider
    pub font_id: i32,
    /// Line height multiplier
    pub line_compression: f32,
    /// Half a line after each paragraph
    pub extra_paragraph_spacing: bool,
    /// Base paragraph alignment
    pub paragraph_alignment: Alignment,
    /// Viewport width in pixels
    pub viewport_width: u16,
    /// Viewport height in pixels
    pub viewport_height: u16,
}

impl SectionHeader {
    /// Settings that affect layout, taken from a parser config
    pub fn from_config(config: &ChapterConfig) -> Self {
        Self {
            font_id: config.font_id,
            line_compression: config.line_compression,
            extra_paragraph_spacing: config.extra_paragraph_spacing,
            paragraph_alignment: config.paragraph_alignment,
            viewport_width: config.viewport_width,
            viewport_height: config.viewport_height,
        }
    }

    /// Exact comparison; the compression factor is compared bitwise
    fn same_layout(&self, other: &Self) -> bool {
        self.font_id == other.font_id
            && self.line_compression.to_bits() == other.line_compression.to_bits()
            && self.extra_paragraph_spacing == other.extra_paragraph_spacing
            && self.paragraph_alignment == other.paragraph_alignment
            && self.viewport_width == other.viewport_width
            && self.viewport_height == other.viewport_height
    }

    fn encode(&self, page_count: u16, lut_offset: u32) -> Result<Vec<u8>, CacheError> {
        let mut out = Vec::with_capacity(HEADER_SIZE);
        write_u8(&mut out, SECTION_FILE_VERSION)?;
        write_i32(&mut out, self.font_id)?;
        write_u32(&mut out, self.line_compression.to_bits())?;
        write_u8(&mut out, u8::from(self.extra_paragraph_spacing))?;
        write_u8(&mut out, self.paragraph_alignment.as_u8())?;
        write_u16(&mut out, self.viewport_width)?;
        write_u16(&mut out, self.viewport_height)?;
        write_u16(&mut out, page_count)?;
        write_u32(&mut out, lut_offset)?;
        Ok(out)
    }

    /// Returns the header, page count and lookup table offset
    fn decode(data: &[u8]) -> Result<(Self, u16, u32), CacheError> {
        let mut r = Cursor::new(data);
        let version = read_u8(&mut r)?;
        if version != SECTION_FILE_VERSION {
            return Err(CacheError::VersionMismatch {
                found: version,
                expected: SECTION_FILE_VERSION,
            });
        }
        let font_id = read_i32(&mut r)?;
        let line_compression = f32::from_bits(read_u32(&mut r)?);
        let extra_paragraph_spacing = read_u8(&mut r)? != 0;
        let alignment_byte = read_u8(&mut r)?;
        let paragraph_alignment = Alignment::from_u8(alignment_byte)
            .ok_or(CacheError::InvalidAlignment(alignment_byte))?;
        let viewport_width = read_u16(&mut r)?;
        let viewport_height = read_u16(&mut r)?;
        let page_count = read_u16(&mut r)?;
        let lut_offset = read_u32(&mut r)?;
        Ok((
            Self {
                font_id,
                line_compression,
                extra_paragraph_spacing,
                paragraph_alignment,
                viewport_width,
                viewport_height,
            },
            page_count,
            lut_offset,
        ))
    }
}

/// Streams pages into a section file as they are produced.
///
/// A placeholder header is written up front and patched by
/// [`SectionWriter::finish`] once the page count is known.
pub struct SectionWriter<W: Write + Seek> {
    inner: W,
    header: SectionHeader,
    offsets: Vec<u32>,
    position: u32,
    body_crc: crc32fast::Hasher,
    error: Option<CacheError>,
}

impl<W: Write + Seek> SectionWriter<W> {
    /// Start a section file for pages laid out with `config`
    pub fn new(mut inner: W, config: &ChapterConfig) -> Result<Self, CacheError> {
        let header = SectionHeader::from_config(config);
        inner.write_all(&header.encode(0, 0)?)?;
        Ok(Self {
            inner,
            header,
            offsets: Vec::new(),
            position: HEADER_SIZE as u32,
            body_crc: crc32fast::Hasher::new(),
            error: None,
        })
    }

    /// Number of pages written so far
    pub fn page_count(&self) -> usize {
        self.offsets.len()
    }

    /// Append one page
    pub fn push_page(&mut self, page: &Page) -> Result<(), CacheError> {
        if self.offsets.len() >= usize::from(u16::MAX) {
            return Err(CacheError::Io("too many pages for one section".into()));
        }
        let mut bytes = Vec::new();
        page.serialize(&mut bytes)?;
        self.write_body(&bytes)?;
        self.offsets.push(self.position - bytes.len() as u32);
        Ok(())
    }

    /// A page callback for [`ChapterParser`]. The first write error is
    /// kept and reported by [`SectionWriter::finish`]; later pages are
    /// dropped.
    pub fn page_sink(&mut self) -> impl FnMut(Page) + '_ {
        move |page| {
            if self.error.is_some() {
                return;
            }
            if let Err(err) = self.push_page(&page) {
                log::warn!("[SCT] Failed to write page {}: {}", self.offsets.len(), err);
                self.error = Some(err);
            }
        }
    }

    /// Write the lookup table and checksum, patch the header, and return
    /// the underlying writer.
    pub fn finish(mut self) -> Result<W, CacheError> {
        if let Some(err) = self.error.take() {
            return Err(err);
        }

        let lut_offset = self.position;
        let mut lut = Vec::with_capacity(self.offsets.len() * 4);
        for &offset in &self.offsets {
            write_u32(&mut lut, offset)?;
        }
        self.write_body(&lut)?;

        let header = self.header.encode(self.offsets.len() as u16, lut_offset)?;
        let mut crc = crc32fast::Hasher::new();
        crc.update(&header);
        crc.combine(&self.body_crc);
        let checksum = crc.finalize();
        write_u32(&mut self.inner, checksum)?;

        self.inner.seek(SeekFrom::Start(0))?;
        self.inner.write_all(&header)?;
        self.inner.seek(SeekFrom::End(0))?;
        self.inner.flush()?;

        log::debug!(
            "[SCT] Wrote section with {} page(s), {} bytes",
            self.offsets.len(),
            lut_offset as usize + lut.len() + CHECKSUM_SIZE
        );
        Ok(self.inner)
    }

    fn write_body(&mut self, bytes: &[u8]) -> Result<(), CacheError> {
        self.inner.write_all(bytes)?;
        self.body_crc.update(bytes);
        self.position = u32::try_from(bytes.len())
            .ok()
            .and_then(|len| self.position.checked_add(len))
            .ok_or_else(|| CacheError::Io("section file exceeds 4 GiB".into()))?;
        Ok(())
    }
}

/// A validated section file held in memory
#[derive(Clone, Debug)]
pub struct SectionCache {
    data: Vec<u8>,
    header: SectionHeader,
    page_offsets: Vec<u32>,
}

impl SectionCache {
    /// Write `pages` as a complete section file
    pub fn write_pages<W: Write + Seek>(
        writer: W,
        config: &ChapterConfig,
        pages: &[Page],
    ) -> Result<W, CacheError> {
        let mut section = SectionWriter::new(writer, config)?;
        for page in pages {
            section.push_page(page)?;
        }
        section.finish()
    }

    /// Read and validate a section file from disk
    pub fn open<P: AsRef<Path>>(path: P, config: &ChapterConfig) -> Result<Self, CacheError> {
        let data = std::fs::read(path.as_ref())?;
        Self::from_bytes(data, config)
    }

    /// Validate section file contents against the expected layout settings
    pub fn from_bytes(data: Vec<u8>, config: &ChapterConfig) -> Result<Self, CacheError> {
        let cache = Self::validate(data, config);
        if let Err(err) = &cache {
            log::info!("[SCT] Section cache is stale: {}", err);
        }
        cache
    }

    fn validate(data: Vec<u8>, config: &ChapterConfig) -> Result<Self, CacheError> {
        if data.len() < HEADER_SIZE + CHECKSUM_SIZE {
            return Err(CacheError::Io("section file truncated".into()));
        }

        let (header, page_count, lut_offset) = SectionHeader::decode(&data[..HEADER_SIZE])?;
        if !header.same_layout(&SectionHeader::from_config(config)) {
            return Err(CacheError::ConfigMismatch);
        }

        let content_len = data.len() - CHECKSUM_SIZE;
        let stored = read_u32(&mut Cursor::new(&data[content_len..]))?;
        let computed = crc32fast::hash(&data[..content_len]);
        if stored != computed {
            return Err(CacheError::ChecksumMismatch { stored, computed });
        }

        let lut_start = lut_offset as usize;
        let lut_end = lut_start + usize::from(page_count) * 4;
        if lut_start < HEADER_SIZE || lut_end != content_len {
            return Err(CacheError::Io("section lookup table out of range".into()));
        }
        let mut lut = Cursor::new(&data[lut_start..lut_end]);
        let mut page_offsets = Vec::with_capacity(usize::from(page_count));
        for _ in 0..page_count {
            let offset = read_u32(&mut lut)?;
            if (offset as usize) < HEADER_SIZE || offset as usize >= lut_start {
                return Err(CacheError::Io("page offset out of range".into()));
            }
            page_offsets.push(offset);
        }

        Ok(Self {
            data,
            header,
            page_offsets,
        })
    }

    /// Layout settings stored in the file
    pub fn header(&self) -> &SectionHeader {
        &self.header
    }

    /// Number of stored pages
    pub fn page_count(&self) -> usize {
        self.page_offsets.len()
    }

    /// Decode one page
    pub fn load_page(&self, index: usize) -> Result<Page, CacheError> {
        let offset = *self
            .page_offsets
            .get(index)
            .ok_or(CacheError::PageOutOfBounds {
                index,
                page_count: self.page_count(),
            })?;
        let mut r = Cursor::new(&self.data[offset as usize..]);
        Page::deserialize(&mut r).inspect_err(|err| {
            log::warn!("[SCT] Failed to load page {}: {}", index, err);
        })
    }

    /// Decode every page in order
    pub fn load_all(&self) -> Result<Vec<Page>, CacheError> {
        (0..self.page_count()).map(|i| self.load_page(i)).collect()
    }
}

/// Parse `source` and write its pages to a section file at `cache_path`.
///
/// The cache file is written alongside parsing, so pages never pile up in
/// memory. On error the partial cache file is removed.
pub fn build_section_file<M, P, Q>(
    parser: &mut ChapterParser<'_, M>,
    source: P,
    cache_path: Q,
) -> Result<ParseStats, ChapterError>
where
    M: TextMetrics + ?Sized,
    P: AsRef<Path>,
    Q: AsRef<Path>,
{
    let cache_path = cache_path.as_ref();
    let file = File::create(cache_path).map_err(CacheError::from)?;
    let result = write_section(parser, source.as_ref(), BufWriter::new(file));
    if result.is_err() {
        let _ = std::fs::remove_file(cache_path);
    }
    result
}

fn write_section<M, W>(
    parser: &mut ChapterParser<'_, M>,
    source: &Path,
    writer: W,
) -> Result<ParseStats, ChapterError>
where
    M: TextMetrics + ?Sized,
    W: Write + Seek,
{
    let mut section = SectionWriter::new(writer, parser.config())?;
    let stats = parser.parse_file(source, section.page_sink())?;
    section.finish()?;
    Ok(stats)
}
