//! Memory-mapped local archives

use super::{ByteSource, checked_range};
use async_trait::async_trait;
use bytes::Bytes;
use memmap2::MmapOptions;
use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Archive file mapped into memory
///
/// Reads are zero-copy slices of the mapping. The file must not be
/// truncated while the source is alive.
#[derive(Debug, Clone)]
pub struct MmapSource {
    path: PathBuf,
    data: Bytes,
}

impl MmapSource {
    /// Map an archive file
    pub fn open(path: impl AsRef<Path>) -> io::Result<Self> {
        let path = path.as_ref();
        let file = File::open(path)?;
        let size = file.metadata()?.len();

        let data = if size == 0 {
            Bytes::new()
        } else {
            #[allow(unsafe_code)]
            let mmap = unsafe { MmapOptions::new().map(&file)? };
            Bytes::from_owner(mmap)
        };

        debug!("Mapped {} ({} bytes)", path.display(), size);

        Ok(Self {
            path: path.to_path_buf(),
            data,
        })
    }

    /// Path of the mapped file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Size of the mapped file
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Check if the file is empty
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

#[async_trait]
impl ByteSource for MmapSource {
    async fn read(&self, offset: u64, length: u32) -> io::Result<Bytes> {
        let range = checked_range(offset, length, self.data.len())?;
        Ok(self.data.slice(range))
    }
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[tokio::test]
    async fn test_mmap_reads_file_ranges() {
        let mut file = NamedTempFile::new().expect("Operation should succeed");
        file.write_all(b"0123456789abcdef")
            .expect("Operation should succeed");
        file.flush().expect("Operation should succeed");

        let source = MmapSource::open(file.path()).expect("Operation should succeed");
        assert_eq!(source.len(), 16);
        assert_eq!(source.path(), file.path());

        let data = source.read(10, 6).await.expect("Operation should succeed");
        assert_eq!(&data[..], b"abcdef");

        let err = source.read(12, 5).await.unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::UnexpectedEof);
    }

    #[tokio::test]
    async fn test_empty_file_maps() {
        let file = NamedTempFile::new().expect("Operation should succeed");
        let source = MmapSource::open(file.path()).expect("Operation should succeed");
        assert!(source.is_empty());
        assert!(source.read(0, 0).await.expect("Operation should succeed").is_empty());
        assert!(source.read(0, 1).await.is_err());
    }

    #[test]
    fn test_missing_file_fails() {
        let dir = tempfile::tempdir().expect("Operation should succeed");
        let err = MmapSource::open(dir.path().join("missing.pmtiles")).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::NotFound);
    }
}
