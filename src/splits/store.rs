//! Split configuration store
//!
//! Binary format, a concatenation of variable-length records:
//!
//! | offset | size | field |
//! |---|---|---|
//! | 0 | 4 | record size in bytes, including this field |
//! | 4 | 128 | display name, NUL padded |
//! | 132 | 768 | EDID fingerprint, lower-case hex, NUL padded |
//! | 900 | 4 | target width |
//! | 904 | 4 | target height |
//! | 908 | 4 | leaf count of the split program |
//! | 912 | .. | split program |
//!
//! Integers use native byte order. Parsing trusts only the record size: a
//! record whose body is unusable is skipped and scanning resumes at the
//! next declared boundary. Split programs are kept as raw bytes and only
//! interpreted when an output actually matches.

use std::path::Path;

use bytes::{Buf, BufMut, BytesMut};
use tracing::{debug, warn};

use super::tree::SplitTree;
use super::{SplitError, StoreError};

/// Width of the name field
pub const NAME_LEN: usize = 128;
/// Width of the EDID fingerprint field
pub const EDID_LEN: usize = 768;
/// Bytes before the split program
pub const HEADER_LEN: usize = 4 + NAME_LEN + EDID_LEN + 3 * 4;

/// One configured output
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SplitConfiguration {
    /// Display name, informational only
    pub name: String,

    /// EDID fingerprint the record applies to
    pub edid: String,

    /// Controller width the record applies to
    pub width: u32,
    /// Controller height the record applies to
    pub height: u32,

    /// Leaf count as stored in the record
    pub leaf_count: u32,

    /// Raw split program
    pub program: Vec<u8>,
}

impl SplitConfiguration {
    /// Build a record from an owned split tree
    pub fn new(
        name: impl Into<String>,
        edid: impl Into<String>,
        width: u32,
        height: u32,
        tree: &SplitTree,
    ) -> Self {
        Self {
            name: name.into(),
            edid: edid.into(),
            width,
            height,
            leaf_count: tree.leaf_count(),
            program: tree.encode(),
        }
    }

    /// Decode the split program
    pub fn tree(&self) -> Result<SplitTree, SplitError> {
        SplitTree::decode(&self.program)
    }

    /// Whether the record applies to an output with this fingerprint at
    /// this controller size
    pub fn matches(&self, fingerprint: &str, width: u32, height: u32) -> bool {
        self.edid == fingerprint && self.width == width && self.height == height
    }

    /// Encoded length of the record, including the size field
    pub fn encoded_len(&self) -> usize {
        HEADER_LEN + self.program.len()
    }

    fn encode_into(&self, out: &mut BytesMut) -> Result<(), StoreError> {
        if self.name.len() > NAME_LEN {
            return Err(StoreError::FieldTooLong {
                field: "name",
                len: self.name.len(),
                max: NAME_LEN,
            });
        }
        if self.edid.len() > EDID_LEN {
            return Err(StoreError::FieldTooLong {
                field: "edid",
                len: self.edid.len(),
                max: EDID_LEN,
            });
        }

        out.reserve(self.encoded_len());
        out.put_u32_ne(self.encoded_len() as u32);
        put_padded(out, self.name.as_bytes(), NAME_LEN);
        put_padded(out, self.edid.as_bytes(), EDID_LEN);
        out.put_u32_ne(self.width);
        out.put_u32_ne(self.height);
        out.put_u32_ne(self.leaf_count);
        out.put_slice(&self.program);
        Ok(())
    }

    /// Decode one record body (everything after the size field)
    fn decode_body(mut body: &[u8]) -> Option<Self> {
        if body.len() < HEADER_LEN - 4 {
            return None;
        }
        let name = take_padded(&mut body, NAME_LEN);
        let edid = take_padded(&mut body, EDID_LEN);
        let width = body.get_u32_ne();
        let height = body.get_u32_ne();
        let leaf_count = body.get_u32_ne();

        Some(Self {
            name,
            edid,
            width,
            height,
            leaf_count,
            program: body.to_vec(),
        })
    }
}

fn put_padded(out: &mut BytesMut, value: &[u8], width: usize) {
    out.put_slice(value);
    out.put_bytes(0, width - value.len());
}

fn take_padded(buf: &mut &[u8], width: usize) -> String {
    let field = &buf[..width];
    let end = field.iter().position(|&b| b == 0).unwrap_or(width);
    let value = String::from_utf8_lossy(&field[..end]).into_owned();
    buf.advance(width);
    value
}

/// In-memory set of split configurations
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SplitStore {
    records: Vec<SplitConfiguration>,
}

impl SplitStore {
    /// Empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a configuration blob
    ///
    /// Records that cannot be decoded are skipped. Scanning stops only when
    /// a record size points outside the blob, since no later boundary can
    /// be trusted after that.
    pub fn from_bytes(blob: &[u8]) -> Self {
        let mut records = Vec::new();
        let mut offset = 0usize;

        while offset < blob.len() {
            let remaining = blob.len() - offset;
            if remaining < 4 {
                warn!("Ignoring {} trailing bytes at offset {}", remaining, offset);
                break;
            }

            let mut head = &blob[offset..];
            let size = head.get_u32_ne() as usize;
            if size < 4 || size > remaining {
                warn!(
                    "Record at offset {} declares {} bytes, {} available; stopping",
                    offset, size, remaining
                );
                break;
            }

            match SplitConfiguration::decode_body(&blob[offset + 4..offset + size]) {
                Some(record) => {
                    debug!(
                        "Loaded split configuration '{}' for {}x{} ({} leaves)",
                        record.name, record.width, record.height, record.leaf_count
                    );
                    records.push(record);
                }
                None => warn!(
                    "Skipping record at offset {}: {} bytes is shorter than the {} byte header",
                    offset, size, HEADER_LEN
                ),
            }

            offset += size;
        }

        Self { records }
    }

    /// Encode all records
    pub fn to_bytes(&self) -> Result<Vec<u8>, StoreError> {
        let mut out = BytesMut::new();
        for record in &self.records {
            record.encode_into(&mut out)?;
        }
        Ok(out.to_vec())
    }

    /// Load a store from disk; a missing file is an empty store
    pub fn load(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref();
        match std::fs::read(path) {
            Ok(blob) => {
                let store = Self::from_bytes(&blob);
                debug!(
                    "Loaded {} split configurations from {}",
                    store.len(),
                    path.display()
                );
                Ok(store)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("No split configuration at {}", path.display());
                Ok(Self::new())
            }
            Err(e) => Err(StoreError::Io(e)),
        }
    }

    /// Write the store to disk, creating parent directories
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), StoreError> {
        let path = path.as_ref();
        let blob = self.to_bytes()?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, blob)?;
        debug!("Saved {} split configurations to {}", self.len(), path.display());
        Ok(())
    }

    /// First record matching fingerprint and controller size
    pub fn find(&self, fingerprint: &str, width: u32, height: u32) -> Option<&SplitConfiguration> {
        self.records
            .iter()
            .find(|r| r.matches(fingerprint, width, height))
    }

    /// Whether any record mentions this fingerprint, at any size
    pub fn knows_edid(&self, fingerprint: &str) -> bool {
        self.records.iter().any(|r| r.edid == fingerprint)
    }

    /// Insert a record, replacing the one with the same EDID and size
    pub fn upsert(&mut self, record: SplitConfiguration) -> Option<SplitConfiguration> {
        match self
            .records
            .iter_mut()
            .find(|r| r.matches(&record.edid, record.width, record.height))
        {
            Some(existing) => Some(std::mem::replace(existing, record)),
            None => {
                self.records.push(record);
                None
            }
        }
    }

    /// Remove the record for this EDID and size
    pub fn remove(&mut self, fingerprint: &str, width: u32, height: u32) -> Option<SplitConfiguration> {
        let idx = self
            .records
            .iter()
            .position(|r| r.matches(fingerprint, width, height))?;
        Some(self.records.remove(idx))
    }

    /// All records in file order
    pub fn records(&self) -> &[SplitConfiguration] {
        &self.records
    }

    /// Number of records
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the store is empty
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn halves() -> SplitTree {
        SplitTree::vertical(1680, SplitTree::Leaf, SplitTree::Leaf)
    }

    fn record(edid: &str) -> SplitConfiguration {
        SplitConfiguration::new("DP-1", edid, 3360, 1050, &halves())
    }

    #[test]
    fn test_record_layout() {
        let store = SplitStore {
            records: vec![record("00ff")],
        };
        let blob = store.to_bytes().unwrap();

        assert_eq!(blob.len(), HEADER_LEN + 7);
        assert_eq!(&blob[0..4], &((HEADER_LEN + 7) as u32).to_ne_bytes());
        assert_eq!(&blob[4..8], b"DP-1");
        assert_eq!(blob[8], 0);
        assert_eq!(&blob[132..136], b"00ff");
        assert_eq!(&blob[900..904], &3360u32.to_ne_bytes());
        assert_eq!(&blob[904..908], &1050u32.to_ne_bytes());
        assert_eq!(&blob[908..912], &2u32.to_ne_bytes());
        assert_eq!(blob[912], b'V');
    }

    #[test]
    fn test_parse_multiple_records() {
        let mut store = SplitStore::new();
        store.upsert(record("aa"));
        store.upsert(record("bb"));
        let parsed = SplitStore::from_bytes(&store.to_bytes().unwrap());
        assert_eq!(parsed, store);
        assert_eq!(parsed.records()[1].edid, "bb");
    }

    #[test]
    fn test_malformed_program_does_not_affect_next_record() {
        let mut bad = record("aa");
        bad.program = b"X garbage".to_vec();
        let mut store = SplitStore::new();
        store.upsert(bad);
        store.upsert(record("bb"));

        let parsed = SplitStore::from_bytes(&store.to_bytes().unwrap());
        assert_eq!(parsed.len(), 2);
        assert!(parsed.records()[0].tree().is_err());
        assert_eq!(parsed.records()[1].tree().unwrap(), halves());
    }

    #[test]
    fn test_deeply_nested_stored_program_is_rejected() {
        let mut deep = record("aa");
        deep.program = b"H\0\0\0\0".repeat(200_000);
        let mut store = SplitStore::new();
        store.upsert(deep);

        let parsed = SplitStore::from_bytes(&store.to_bytes().unwrap());
        assert_eq!(
            parsed.records()[0].tree(),
            Err(SplitError::TooManyLeaves { max: 15 })
        );
    }

    #[test]
    fn test_short_record_is_skipped() {
        let mut blob = Vec::new();
        blob.extend_from_slice(&12u32.to_ne_bytes());
        blob.extend_from_slice(&[0xde; 8]);
        let mut store = SplitStore::new();
        store.upsert(record("bb"));
        blob.extend_from_slice(&store.to_bytes().unwrap());

        let parsed = SplitStore::from_bytes(&blob);
        assert_eq!(parsed.len(), 1);
        assert_eq!(parsed.records()[0].edid, "bb");
    }

    #[test]
    fn test_oversized_record_stops_scan() {
        let mut store = SplitStore::new();
        store.upsert(record("aa"));
        let mut blob = store.to_bytes().unwrap();
        blob.extend_from_slice(&100_000u32.to_ne_bytes());
        blob.extend_from_slice(&[0; 16]);

        let parsed = SplitStore::from_bytes(&blob);
        assert_eq!(parsed.len(), 1);
    }

    #[test]
    fn test_zero_size_record_does_not_loop() {
        let blob = [0u8; 32];
        assert!(SplitStore::from_bytes(&blob).is_empty());
    }

    #[test]
    fn test_find_requires_exact_size() {
        let mut store = SplitStore::new();
        store.upsert(record("aa"));
        assert!(store.find("aa", 3360, 1050).is_some());
        assert!(store.find("aa", 1920, 1080).is_none());
        assert!(store.find("AA", 3360, 1050).is_none());
        assert!(store.knows_edid("aa"));
    }

    #[test]
    fn test_upsert_replaces_same_key() {
        let mut store = SplitStore::new();
        assert!(store.upsert(record("aa")).is_none());
        let mut other = record("aa");
        other.name = "renamed".to_string();
        let replaced = store.upsert(other).unwrap();
        assert_eq!(replaced.name, "DP-1");
        assert_eq!(store.len(), 1);
        assert_eq!(store.records()[0].name, "renamed");
    }

    #[test]
    fn test_remove() {
        let mut store = SplitStore::new();
        store.upsert(record("aa"));
        assert!(store.remove("aa", 1, 1).is_none());
        assert!(store.remove("aa", 3360, 1050).is_some());
        assert!(store.is_empty());
    }

    #[test]
    fn test_field_too_long() {
        let mut store = SplitStore::new();
        store.upsert(SplitConfiguration::new(
            "x".repeat(NAME_LEN + 1),
            "aa",
            1,
            1,
            &SplitTree::Leaf,
        ));
        assert!(matches!(
            store.to_bytes(),
            Err(StoreError::FieldTooLong { field: "name", .. })
        ));
    }

    #[test]
    fn test_full_width_edid_has_no_terminator() {
        let edid = "ab".repeat(EDID_LEN / 2);
        let mut store = SplitStore::new();
        store.upsert(SplitConfiguration::new("full", edid.clone(), 1, 1, &SplitTree::Leaf));
        let parsed = SplitStore::from_bytes(&store.to_bytes().unwrap());
        assert_eq!(parsed.records()[0].edid, edid);
    }
}
