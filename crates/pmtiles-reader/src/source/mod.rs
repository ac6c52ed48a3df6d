//! Byte sources an archive can be read from
//!
//! A source answers absolute `(offset, length)` reads with exactly `length`
//! bytes or an error. Retries, timeouts and connection reuse are the
//! source's business; the reader issues each read once.

mod file;
mod http;

pub use file::MmapSource;
pub use http::{HttpSource, HttpSourceConfig};

use async_trait::async_trait;
use bytes::Bytes;
use std::io;
use std::ops::Range;
use std::sync::Arc;

/// Random-access, read-only view of an archive
#[async_trait]
pub trait ByteSource: Send + Sync {
    /// Read exactly `length` bytes starting at `offset`
    ///
    /// Reads past the end of the source fail with
    /// [`io::ErrorKind::UnexpectedEof`].
    async fn read(&self, offset: u64, length: u32) -> io::Result<Bytes>;
}

#[async_trait]
impl ByteSource for Bytes {
    async fn read(&self, offset: u64, length: u32) -> io::Result<Bytes> {
        let range = checked_range(offset, length, self.len())?;
        Ok(self.slice(range))
    }
}

#[async_trait]
impl<S: ByteSource + ?Sized> ByteSource for Arc<S> {
    async fn read(&self, offset: u64, length: u32) -> io::Result<Bytes> {
        (**self).read(offset, length).await
    }
}

/// Archive held entirely in memory
#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    data: Bytes,
}

impl MemorySource {
    /// Wrap archive bytes
    pub fn new(data: impl Into<Bytes>) -> Self {
        Self { data: data.into() }
    }

    /// Size of the archive
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Check if the archive is empty
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

#[async_trait]
impl ByteSource for MemorySource {
    async fn read(&self, offset: u64, length: u32) -> io::Result<Bytes> {
        self.data.read(offset, length).await
    }
}

/// Resolve a read against a buffer of `len` bytes
pub(crate) fn checked_range(offset: u64, length: u32, len: usize) -> io::Result<Range<usize>> {
    let end = offset.checked_add(u64::from(length));
    match end {
        Some(end) if end <= len as u64 => Ok(offset as usize..end as usize),
        _ => Err(io::Error::new(
            io::ErrorKind::UnexpectedEof,
            format!("Read beyond source bounds: {offset} + {length} > {len}"),
        )),
    }
}
