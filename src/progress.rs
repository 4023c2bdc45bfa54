//! Byte-counting reader with coarse progress callbacks

use std::io::Read;

use crate::config::MIN_SIZE_FOR_PROGRESS;

/// Wraps a source stream and reports read progress in percent.
///
/// A report is made each time the tens digit of the percentage changes.
/// Sources smaller than [`MIN_SIZE_FOR_PROGRESS`] never report.
pub struct ProgressReader<R, F> {
    inner: R,
    total_size: u64,
    bytes_read: u64,
    last_progress: i32,
    on_progress: F,
}

impl<R: Read, F: FnMut(u8)> ProgressReader<R, F> {
    /// Wrap `inner`, whose full length is `total_size` bytes
    pub fn new(inner: R, total_size: u64, on_progress: F) -> Self {
        Self {
            inner,
            total_size,
            bytes_read: 0,
            last_progress: -1,
            on_progress,
        }
    }

    /// Bytes read so far
    pub fn bytes_read(&self) -> u64 {
        self.bytes_read
    }

    fn report(&mut self) {
        if self.total_size < MIN_SIZE_FOR_PROGRESS {
            return;
        }
        let progress = (self.bytes_read.saturating_mul(100) / self.total_size).min(100) as i32;
        if progress / 10 != self.last_progress / 10 {
            self.last_progress = progress;
            (self.on_progress)(progress as u8);
        }
    }
}

impl<R: Read, F: FnMut(u8)> Read for ProgressReader<R, F> {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        let n = self.inner.read(buf)?;
        self.bytes_read += n as u64;
        if n > 0 {
            self.report();
        }
        Ok(n)
    }
}
