//! Directory codec and tile lookup within a single directory
//!
//! A serialized directory (after internal decompression) is column-major:
//!
//! ```text
//! varint  entry count N
//! N × varint  tile id delta from the previous entry
//! N × varint  run length
//! N × varint  length
//! N × varint  offset + 1, or 0 for "previous offset + previous length"
//! ```
//!
//! Entries are sorted by tile id and never overlap.

pub mod entry;
pub mod error;
pub mod varint;

pub use entry::Entry;
pub use error::{DirectoryError, Result};

use varint::{read_varint, write_varint};

/// An ordered list of directory entries
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Directory {
    entries: Vec<Entry>,
}

impl Directory {
    /// Wrap entries that are already sorted by tile id
    pub fn new(entries: Vec<Entry>) -> Self {
        Self { entries }
    }

    /// Parse a decompressed directory
    pub fn parse(data: &[u8]) -> Result<Self> {
        let mut pos = 0;
        let count = read_varint(data, &mut pos)?;

        // Every entry needs at least one byte in each of the four columns
        let remaining = data.len() - pos;
        if count.saturating_mul(4) > remaining as u64 {
            return Err(DirectoryError::EntryCountTooLarge { count, remaining });
        }
        let count = count as usize;

        let mut entries = vec![Entry::run(0, 0, 0, 0); count];

        let mut last_id = 0u64;
        for (i, entry) in entries.iter_mut().enumerate() {
            let delta = read_varint(data, &mut pos)?;
            last_id = last_id
                .checked_add(delta)
                .ok_or(DirectoryError::TileIdOverflow(i))?;
            entry.tile_id = last_id;
        }

        for (i, entry) in entries.iter_mut().enumerate() {
            entry.run_length = read_u32(data, &mut pos, "run length", i)?;
        }

        for (i, entry) in entries.iter_mut().enumerate() {
            entry.length = read_u32(data, &mut pos, "length", i)?;
        }

        for i in 0..count {
            let value = read_varint(data, &mut pos)?;
            let offset = if value == 0 {
                let prev = i
                    .checked_sub(1)
                    .map(|p| entries[p])
                    .ok_or(DirectoryError::ContiguousOffsetWithoutPredecessor)?;
                prev.offset.saturating_add(u64::from(prev.length))
            } else {
                value - 1
            };
            entries[i].offset = offset;
        }

        Ok(Self { entries })
    }

    /// Serialize to the uncompressed directory encoding
    ///
    /// Fails if the entries are not sorted by tile id or an offset is
    /// `u64::MAX`.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut data = Vec::with_capacity(1 + self.entries.len() * 8);
        write_varint(self.entries.len() as u64, &mut data);

        let mut last_id = 0u64;
        for (i, entry) in self.entries.iter().enumerate() {
            let delta = entry
                .tile_id
                .checked_sub(last_id)
                .ok_or(DirectoryError::UnsortedEntries(i))?;
            write_varint(delta, &mut data);
            last_id = entry.tile_id;
        }

        for entry in &self.entries {
            write_varint(u64::from(entry.run_length), &mut data);
        }

        for entry in &self.entries {
            write_varint(u64::from(entry.length), &mut data);
        }

        let mut prev: Option<&Entry> = None;
        for (i, entry) in self.entries.iter().enumerate() {
            let contiguous = prev.is_some_and(|p| {
                p.offset.checked_add(u64::from(p.length)) == Some(entry.offset)
            });
            if contiguous {
                write_varint(0, &mut data);
            } else {
                let value = entry
                    .offset
                    .checked_add(1)
                    .ok_or(DirectoryError::OffsetOverflow(i))?;
                write_varint(value, &mut data);
            }
            prev = Some(entry);
        }

        Ok(data)
    }

    /// Find the entry responsible for `tile_id`
    ///
    /// An exact id match wins. Otherwise the closest entry with a smaller id
    /// is returned if it is a leaf pointer, since the target may lie anywhere
    /// in the subtree it references, or if its run covers `tile_id`.
    pub fn find_tile(&self, tile_id: u64) -> Option<&Entry> {
        let mut m: isize = 0;
        let mut n: isize = self.entries.len() as isize - 1;

        while m <= n {
            let k = (n + m) >> 1;
            let entry = &self.entries[k as usize];
            match tile_id.cmp(&entry.tile_id) {
                std::cmp::Ordering::Greater => m = k + 1,
                std::cmp::Ordering::Less => n = k - 1,
                std::cmp::Ordering::Equal => return Some(entry),
            }
        }

        if n >= 0 {
            let entry = &self.entries[n as usize];
            if entry.is_leaf_pointer() || tile_id - entry.tile_id < u64::from(entry.run_length) {
                return Some(entry);
            }
        }

        None
    }

    /// Entries in tile id order
    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }

    /// Consume the directory, returning its entries
    pub fn into_entries(self) -> Vec<Entry> {
        self.entries
    }

    /// Number of entries
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the directory has no entries
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate over entries in tile id order
    pub fn iter(&self) -> std::slice::Iter<'_, Entry> {
        self.entries.iter()
    }
}

impl From<Vec<Entry>> for Directory {
    fn from(entries: Vec<Entry>) -> Self {
        Self::new(entries)
    }
}

impl<'a> IntoIterator for &'a Directory {
    type Item = &'a Entry;
    type IntoIter = std::slice::Iter<'a, Entry>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

fn read_u32(data: &[u8], pos: &mut usize, field: &'static str, index: usize) -> Result<u32> {
    let value = read_varint(data, pos)?;
    u32::try_from(value).map_err(|_| DirectoryError::FieldOverflow {
        field,
        index,
        value,
    })
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    fn sample() -> Directory {
        Directory::new(vec![
            Entry::run(0, 0, 100, 1),
            Entry::run(1, 100, 50, 3),
            Entry::leaf(10, 0, 32),
            Entry::run(100, 150, 20, 1),
            Entry::run(101, 0, 100, 2),
        ])
    }

    #[test]
    fn test_round_trip() {
        let dir = sample();
        let encoded = dir.to_bytes().expect("Operation should succeed");
        let parsed = Directory::parse(&encoded).expect("Operation should succeed");
        assert_eq!(parsed, dir);
    }

    #[test]
    fn test_known_encoding() {
        let dir = Directory::new(vec![Entry::run(5, 100, 50, 3)]);
        // count, delta, run length, length, offset + 1
        assert_eq!(dir.to_bytes(), Ok(vec![1, 5, 3, 50, 101]));

        let dir = Directory::new(vec![Entry::run(0, 0, 10, 1), Entry::run(1, 10, 20, 1)]);
        // second offset continues the first
        assert_eq!(dir.to_bytes(), Ok(vec![2, 0, 1, 1, 1, 10, 20, 1, 0]));
    }

    #[test]
    fn test_encoding_rejects_unsorted_entries() {
        let dir = Directory::new(vec![Entry::run(9, 0, 10, 1), Entry::run(4, 10, 10, 1)]);
        assert_eq!(dir.to_bytes(), Err(DirectoryError::UnsortedEntries(1)));
    }

    #[test]
    fn test_encoding_rejects_unencodable_offset() {
        let dir = Directory::new(vec![Entry::run(0, u64::MAX, 1, 1)]);
        assert_eq!(dir.to_bytes(), Err(DirectoryError::OffsetOverflow(0)));

        // The same offset is fine when it continues the previous entry
        let dir = Directory::new(vec![
            Entry::run(0, u64::MAX - 10, 10, 1),
            Entry::run(1, u64::MAX, 1, 1),
        ]);
        let encoded = dir.to_bytes().expect("Operation should succeed");
        assert_eq!(Directory::parse(&encoded), Ok(dir));
    }

    #[test]
    fn test_empty_directory() {
        let parsed = Directory::parse(&[0]).expect("Operation should succeed");
        assert!(parsed.is_empty());
        assert!(parsed.find_tile(0).is_none());
    }

    #[test]
    fn test_entry_count_larger_than_data() {
        let result = Directory::parse(&[100, 1, 0, 0, 0]);
        assert_eq!(
            result,
            Err(DirectoryError::EntryCountTooLarge {
                count: 100,
                remaining: 4
            })
        );
    }

    #[test]
    fn test_truncated_column() {
        // two entries declared, offsets column cut short
        let full =
            Directory::new(vec![Entry::run(0, 0, 10, 1), Entry::run(7, 500, 20, 1)])
                .to_bytes()
                .expect("Operation should succeed");
        let result = Directory::parse(&full[..full.len() - 1]);
        assert!(matches!(result, Err(DirectoryError::TruncatedVarint(_))));
    }

    #[test]
    fn test_first_offset_cannot_continue() {
        let result = Directory::parse(&[1, 0, 1, 10, 0]);
        assert_eq!(
            result,
            Err(DirectoryError::ContiguousOffsetWithoutPredecessor)
        );
    }

    #[test]
    fn test_oversized_length_rejected() {
        let mut data = vec![1, 0, 1];
        write_varint(u64::from(u32::MAX) + 1, &mut data);
        data.push(1);
        assert!(matches!(
            Directory::parse(&data),
            Err(DirectoryError::FieldOverflow {
                field: "length",
                ..
            })
        ));
    }

    #[test]
    fn test_find_tile_exact_and_runs() {
        let dir = sample();
        assert_eq!(dir.find_tile(0).unwrap().offset, 0);
        assert_eq!(dir.find_tile(1).unwrap().offset, 100);
        assert_eq!(dir.find_tile(3).unwrap().offset, 100);
        // past the run of 3 starting at 1
        assert!(dir.find_tile(4).is_none());
        assert_eq!(dir.find_tile(102).unwrap().tile_id, 101);
        assert!(dir.find_tile(103).is_none());
    }

    #[test]
    fn test_find_tile_leaf_pointer_is_catch_all() {
        let dir = sample();
        // anything between the pointer at 10 and the run at 100 goes to the leaf
        for id in [10, 11, 55, 99] {
            let entry = dir.find_tile(id).unwrap();
            assert!(entry.is_leaf_pointer(), "id {id}");
            assert_eq!(entry.tile_id, 10);
        }
    }

    #[test]
    fn test_find_tile_before_first_entry() {
        let dir = Directory::new(vec![Entry::run(5, 100, 50, 3)]);
        assert!(dir.find_tile(4).is_none());
        assert!(dir.find_tile(5).is_some());
        assert!(dir.find_tile(7).is_some());
        assert!(dir.find_tile(8).is_none());
    }

    /// Reference lookup: scan in order applying the same tie-break rules
    fn linear_find(entries: &[Entry], tile_id: u64) -> Option<&Entry> {
        let mut candidate = None;
        for entry in entries {
            if entry.tile_id == tile_id {
                return Some(entry);
            }
            if entry.tile_id > tile_id {
                break;
            }
            candidate = Some(entry);
        }
        candidate.filter(|e| e.is_leaf_pointer() || e.covers(tile_id))
    }

    fn directory_strategy() -> impl Strategy<Value = Directory> {
        prop::collection::vec((1u64..20, 0u32..4, 1u32..500), 0..40).prop_map(|rows| {
            let mut tile_id = 0u64;
            let mut offset = 0u64;
            let entries = rows
                .into_iter()
                .map(|(gap, run_length, length)| {
                    let entry = Entry::run(tile_id, offset, length, run_length);
                    tile_id += gap + u64::from(run_length);
                    offset += u64::from(length);
                    entry
                })
                .collect();
            Directory::new(entries)
        })
    }

    proptest! {
        /// Binary search agrees with a linear scan for every target
        #[test]
        fn find_tile_matches_linear_scan(dir in directory_strategy(), target in 0u64..1000) {
            prop_assert_eq!(dir.find_tile(target), linear_find(dir.entries(), target));
        }

        /// Any sorted directory survives encoding
        #[test]
        fn directory_round_trip(dir in directory_strategy()) {
            let encoded = dir.to_bytes().map_err(|e| TestCaseError::fail(e.to_string()))?;
            let parsed = Directory::parse(&encoded).map_err(|e| TestCaseError::fail(e.to_string()))?;
            prop_assert_eq!(parsed, dir);
        }
    }
}
