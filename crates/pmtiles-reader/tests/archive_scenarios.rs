#![allow(clippy::expect_used, clippy::unwrap_used, clippy::panic)]
//! End-to-end lookups and scans over hand-laid and generated archives

use bytes::Bytes;
use futures::TryStreamExt;
use pmtiles_formats::{Directory, Entry, Header, TileCoord};
use pmtiles_reader::testing::{ArchiveBuilder, assemble};
use pmtiles_reader::{CacheConfig, MemorySource, PmtilesReader, ReaderConfig};
use pretty_assertions::assert_eq;
use proptest::prelude::*;
use std::collections::BTreeMap;

fn padded(directory: &Directory, len: usize) -> Vec<u8> {
    let mut bytes = directory.to_bytes().expect("Operation should succeed");
    assert!(bytes.len() <= len);
    bytes.resize(len, 0);
    bytes
}

fn coord_of(tile_id: u64) -> TileCoord {
    TileCoord::from_tile_id(tile_id).expect("valid tile id")
}

/// Root at 127 (64 bytes) pointing at one 32-byte leaf with a run of three
fn root_and_leaf_archive() -> (Bytes, Vec<u8>) {
    let root = padded(&Directory::new(vec![Entry::leaf(0, 0, 32)]), 64);
    let leaf = padded(&Directory::new(vec![Entry::run(5, 100, 50, 3)]), 32);
    let tile_data: Vec<u8> = (0..200u32).map(|i| (i % 251) as u8).collect();

    let archive = assemble(Header::default(), &root, &[], &leaf, &tile_data)
        .expect("Operation should succeed");
    (archive, tile_data)
}

#[tokio::test]
async fn root_pointer_resolves_run_in_leaf() {
    let (archive, tile_data) = root_and_leaf_archive();
    let reader = PmtilesReader::open(MemorySource::new(archive), ReaderConfig::default())
        .await
        .expect("Operation should succeed");
    assert_eq!(reader.header().root_dir_offset, 127);
    assert_eq!(reader.header().root_dir_length, 64);

    let expected = Bytes::copy_from_slice(&tile_data[100..150]);
    for tile_id in 5..=7 {
        let tile = reader
            .get_tile(coord_of(tile_id))
            .await
            .expect("Operation should succeed");
        assert_eq!(tile, Some(expected.clone()), "tile id {tile_id}");
    }

    for tile_id in [4, 8] {
        let tile = reader
            .get_tile(coord_of(tile_id))
            .await
            .expect("Operation should succeed");
        assert_eq!(tile, None, "tile id {tile_id}");
    }
}

#[tokio::test]
async fn root_pointer_scans_agree() {
    let (archive, tile_data) = root_and_leaf_archive();
    let reader = PmtilesReader::open(MemorySource::new(archive), ReaderConfig::default())
        .await
        .expect("Operation should succeed");

    let coords: Vec<TileCoord> = reader
        .tile_coords()
        .try_collect()
        .await
        .expect("Operation should succeed");
    assert_eq!(coords, vec![coord_of(5), coord_of(6), coord_of(7)]);

    let mut visited = Vec::new();
    let count = reader
        .for_each_tile(|tile| visited.push(tile))
        .await
        .expect("Operation should succeed");
    assert_eq!(count, 3);
    assert!(visited.iter().all(|t| t.data[..] == tile_data[100..150]));
}

#[tokio::test]
async fn lookups_are_stable_across_eviction() {
    let mut builder = ArchiveBuilder::new().leaf_size(4);
    for x in 0..4u32 {
        for y in 0..4u32 {
            builder = builder.tile(
                TileCoord::new(2, x, y).expect("valid"),
                vec![(x * 4 + y) as u8; 60],
            );
        }
    }
    let archive = builder.build().expect("Operation should succeed");

    // Room for one payload and two small directories at a time
    let config = ReaderConfig::new()
        .with_tile_cache(CacheConfig::new().with_max_weight(100))
        .with_directory_cache(CacheConfig::new().with_max_weight(200));
    let reader = PmtilesReader::open(MemorySource::new(archive), config)
        .await
        .expect("Operation should succeed");

    for _ in 0..3 {
        for x in 0..4u32 {
            for y in 0..4u32 {
                let tile = reader
                    .get_tile_zxy(2, x, y)
                    .await
                    .expect("Operation should succeed")
                    .expect("tile present");
                assert_eq!(tile, Bytes::from(vec![(x * 4 + y) as u8; 60]));
            }
        }
    }

    let stats = reader.tile_cache_stats();
    assert!(stats.eviction_count > 0);
    assert!(stats.weight <= 100);
    assert!(reader.directory_cache_stats().weight <= 200);
}

fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_current_thread()
        .build()
        .expect("Operation should succeed")
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn random_archives_read_back(
        tiles in prop::collection::btree_map(0u64..1365, 0u8..4, 0..120),
        leaf_size in 1usize..12,
        threshold in prop::sample::select(vec![0u64, 16, 8192]),
    ) {
        // Few distinct payloads so neighbouring ids form runs
        let payloads: BTreeMap<u64, Vec<u8>> = tiles
            .iter()
            .map(|(&id, &v)| (id, vec![v; usize::from(v) + 1]))
            .collect();

        let mut builder = ArchiveBuilder::new().leaf_size(leaf_size);
        for (&id, data) in &payloads {
            builder = builder.tile(coord_of(id), data.clone());
        }
        let archive = builder.build().expect("Operation should succeed");

        runtime().block_on(async {
            let config = ReaderConfig::new().with_coalesce_threshold(threshold);
            let reader = PmtilesReader::open(MemorySource::new(archive), config)
                .await
                .expect("Operation should succeed");

            for id in 0u64..1365 {
                let tile = reader
                    .get_tile(coord_of(id))
                    .await
                    .expect("Operation should succeed");
                prop_assert_eq!(tile.as_deref(), payloads.get(&id).map(Vec::as_slice));
            }

            let coords: Vec<u64> = reader
                .tile_coords()
                .map_ok(|c| c.tile_id())
                .try_collect()
                .await
                .expect("Operation should succeed");
            prop_assert_eq!(coords, payloads.keys().copied().collect::<Vec<_>>());

            let mut scanned = BTreeMap::new();
            let count = reader
                .for_each_tile(|tile| {
                    scanned.insert(tile.coord.tile_id(), tile.data.to_vec());
                })
                .await
                .expect("Operation should succeed");
            prop_assert_eq!(count as usize, payloads.len());
            prop_assert_eq!(&scanned, &payloads);
            Ok(())
        })?;
    }
}
