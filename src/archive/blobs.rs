//! Named binary entries that sit beside the JSON graph document.

use std::io::{Read, Seek};
use std::sync::Arc;

use ahash::{AHashMap, AHashSet};

use crate::errors::GraphError;

use super::container::ArchiveReader;

pub const BLOB_PREFIX: &str = "blobs/";

/// Collects blobs emitted by providers during a write.
#[derive(Debug, Default)]
pub struct BlobWriter {
    entries: Vec<(String, Vec<u8>)>,
    names: AHashSet<String>,
}

impl BlobWriter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `bytes` under a fresh name derived from `hint`; returns the name.
    pub fn add(&mut self, hint: &str, bytes: Vec<u8>) -> String {
        let stem: String = hint
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
            .take(64)
            .collect();
        let mut sequence = self.entries.len();
        let mut name = format!("{BLOB_PREFIX}{stem}-{sequence}");
        while self.names.contains(&name) {
            sequence += 1;
            name = format!("{BLOB_PREFIX}{stem}-{sequence}");
        }
        self.names.insert(name.clone());
        self.entries.push((name.clone(), bytes));
        name
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn total_bytes(&self) -> usize {
        self.entries.iter().map(|(_, bytes)| bytes.len()).sum()
    }

    pub(crate) fn into_entries(self) -> Vec<(String, Vec<u8>)> {
        self.entries
    }
}

/// Blob entries of an opened archive, keyed by entry name.
#[derive(Debug, Default)]
pub struct BlobReader {
    blobs: AHashMap<String, Arc<[u8]>>,
}

impl BlobReader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_archive<R: Read + Seek>(reader: &mut ArchiveReader<R>) -> Result<Self, GraphError> {
        let names: Vec<String> = reader
            .entries()
            .iter()
            .filter(|entry| entry.name.starts_with(BLOB_PREFIX))
            .map(|entry| entry.name.clone())
            .collect();
        let mut blobs = AHashMap::with_capacity(names.len());
        for name in names {
            let bytes = reader.read_entry(&name)?;
            blobs.insert(name, Arc::from(bytes));
        }
        Ok(Self { blobs })
    }

    pub fn insert<S: Into<String>>(&mut self, name: S, bytes: Vec<u8>) {
        self.blobs.insert(name.into(), Arc::from(bytes));
    }

    pub fn get(&self, name: &str) -> Result<&[u8], GraphError> {
        self.blobs
            .get(name)
            .map(|bytes| bytes.as_ref())
            .ok_or_else(|| GraphError::corrupt_archive(format!("missing blob '{name}'")))
    }

    pub fn len(&self) -> usize {
        self.blobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blobs.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_names_are_unique_and_sanitised() {
        let mut blobs = BlobWriter::new();
        let a = blobs.add("icon/large png", vec![1]);
        let b = blobs.add("icon/large png", vec![2]);
        assert_ne!(a, b);
        assert!(a.starts_with("blobs/icon_large_png-"));
        assert_eq!(blobs.len(), 2);
        assert_eq!(blobs.total_bytes(), 2);
    }

    #[test]
    fn test_missing_blob_is_corrupt() {
        let reader = BlobReader::new();
        assert!(matches!(reader.get("blobs/x-0"), Err(GraphError::CorruptArchive(_))));
    }
}
