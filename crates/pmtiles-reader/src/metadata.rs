//! Archive metadata

use crate::archive::{PmtilesReader, section_range};
use crate::error::Result;
use pmtiles_formats::compression;
use pmtiles_formats::{ArchiveMetadata, JsonMetadata};
use tracing::trace;

impl PmtilesReader {
    /// Decoded JSON metadata blob
    ///
    /// Loaded on first use and kept for the lifetime of the reader. A failed
    /// load is not remembered; the next call tries again.
    pub async fn json_metadata(&self) -> Result<&JsonMetadata> {
        self.json_metadata
            .get_or_try_init(|| self.load_json_metadata())
            .await
    }

    /// Metadata record combining the header with the JSON blob
    pub async fn metadata(&self) -> Result<ArchiveMetadata> {
        let json = self.json_metadata().await?.clone();
        Ok(ArchiveMetadata::from_parts(&self.header, json))
    }

    async fn load_json_metadata(&self) -> Result<JsonMetadata> {
        let range = section_range(self.header.json_metadata_range(), "metadata blob")?;
        trace!(%range, "Loading JSON metadata");

        if range.is_empty() {
            return Ok(JsonMetadata::default());
        }

        let raw = self.source.read(range.offset, range.length).await?;
        let data = compression::decompress(&raw, self.header.internal_compression)?;
        Ok(JsonMetadata::parse(&data)?)
    }
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use crate::archive::PmtilesReader;
    use crate::config::ReaderConfig;
    use crate::error::ReaderError;
    use crate::source::MemorySource;
    use crate::testing::{ArchiveBuilder, CountingSource};
    use pmtiles_formats::{
        Compression, FieldType, MetadataError, TileCoord, TileFormat, TileType,
    };
    use pretty_assertions::assert_eq;

    #[tokio::test]
    async fn test_metadata_combines_header_and_blob() {
        let archive = ArchiveBuilder::new()
            .tile_type(TileType::Mvt)
            .tile_compression(Compression::Gzip)
            .internal_compression(Compression::Gzip)
            .metadata(
                br#"{"name":"Test","vector_layers":[{"id":"roads","fields":{"class":"String"}}],"custom_key":"v"}"#
                    .to_vec(),
            )
            .tile(TileCoord::new(2, 1, 1).expect("valid"), b"t".to_vec())
            .build()
            .expect("Operation should succeed");
        let reader = PmtilesReader::open(MemorySource::new(archive), ReaderConfig::default())
            .await
            .expect("Operation should succeed");

        let metadata = reader.metadata().await.expect("Operation should succeed");
        assert_eq!(metadata.name.as_deref(), Some("Test"));
        assert_eq!(metadata.format, Some(TileFormat::Pbf));
        assert_eq!(metadata.tile_compression, Compression::Gzip);
        assert_eq!(metadata.vector_layers.len(), 1);
        assert_eq!(metadata.vector_layers[0].id, "roads");
        assert_eq!(
            metadata.vector_layers[0].fields.get("class"),
            Some(&FieldType::String)
        );
        assert_eq!(metadata.others.len(), 1);
        assert_eq!(metadata.others.get("custom_key").map(String::as_str), Some("v"));
        assert_eq!((metadata.min_zoom, metadata.max_zoom), (2, 2));
    }

    #[tokio::test]
    async fn test_json_metadata_is_memoized() {
        let archive = ArchiveBuilder::new()
            .metadata(br#"{"name":"Once"}"#.to_vec())
            .build()
            .expect("Operation should succeed");
        let source = CountingSource::new(MemorySource::new(archive));
        let reader = PmtilesReader::open_shared(source.clone().shared(), ReaderConfig::default())
            .await
            .expect("Operation should succeed");
        let after_open = source.reads();

        for _ in 0..3 {
            let json = reader.json_metadata().await.expect("Operation should succeed");
            assert_eq!(json.other.get("name").map(String::as_str), Some("Once"));
        }
        let _ = reader.metadata().await.expect("Operation should succeed");

        assert_eq!(source.reads() - after_open, 1);
    }

    #[tokio::test]
    async fn test_missing_blob_is_empty_metadata() {
        let archive = ArchiveBuilder::new().build().expect("Operation should succeed");
        let reader = PmtilesReader::open(MemorySource::new(archive), ReaderConfig::default())
            .await
            .expect("Operation should succeed");

        let metadata = reader.metadata().await.expect("Operation should succeed");
        assert_eq!(metadata.name, None);
        assert!(metadata.others.is_empty());
        assert_eq!(metadata.format, None);
    }

    #[tokio::test]
    async fn test_invalid_blob_is_reported_every_time() {
        let archive = ArchiveBuilder::new()
            .metadata(b"[1, 2, 3]".to_vec())
            .build()
            .expect("Operation should succeed");
        let reader = PmtilesReader::open(MemorySource::new(archive), ReaderConfig::default())
            .await
            .expect("Operation should succeed");

        for _ in 0..2 {
            let err = reader.json_metadata().await.unwrap_err();
            assert!(matches!(
                err,
                ReaderError::Metadata(MetadataError::NotAnObject(_))
            ));
        }
    }
}
