//! Binary archive container.
//!
//! Layout (all integers big-endian):
//!
//! ```text
//! header     magic[8] version:u32 flags:u32 entry_count:u64
//!            directory_offset:u64 directory_len:u64 checksum:u64
//! entries    raw bytes, back to back
//! directory  per entry: name_len:u16 name offset:u64 len:u64
//! ```
//!
//! The header is written last, so a crash mid-write leaves a zero header
//! that fails magic validation.

use std::io::{Read, Seek, SeekFrom, Write};

use ahash::{AHashMap, AHashSet};

use crate::errors::GraphError;

pub const MAGIC_BYTES: [u8; 8] = *b"SNPGRAF\0";
pub const FORMAT_VERSION: u32 = 1;
pub const HEADER_SIZE: u64 = 48;
pub const XOR_SEED: u64 = 0x5A5A_5A5A_5A5A_5A5A;

/// Upper bound on the directory we are willing to buffer.
const MAX_DIRECTORY_LEN: u64 = 64 * 1024 * 1024;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ContainerHeader {
    pub magic: [u8; 8],
    pub version: u32,
    pub flags: u32,
    pub entry_count: u64,
    pub directory_offset: u64,
    pub directory_len: u64,
    pub checksum: u64,
}

impl ContainerHeader {
    fn new() -> Self {
        Self {
            magic: MAGIC_BYTES,
            version: FORMAT_VERSION,
            flags: 0,
            entry_count: 0,
            directory_offset: HEADER_SIZE,
            directory_len: 0,
            checksum: 0,
        }
    }

    pub fn compute_checksum(&self) -> u64 {
        let mut checksum = XOR_SEED;
        checksum ^= u64::from_be_bytes(self.magic);
        checksum ^= u64::from(self.version);
        checksum ^= u64::from(self.flags).rotate_left(32);
        checksum ^= self.entry_count;
        checksum ^= self.directory_offset.rotate_left(16);
        checksum ^= self.directory_len.rotate_left(48);
        checksum
    }

    pub fn update_checksum(&mut self) {
        self.checksum = self.compute_checksum();
    }

    pub fn validate(&self) -> Result<(), GraphError> {
        if self.magic != MAGIC_BYTES {
            return Err(GraphError::corrupt_archive("not a snapgraph archive (bad magic)"));
        }
        if self.version != FORMAT_VERSION {
            return Err(GraphError::corrupt_archive(format!(
                "unsupported container version {} (expected {FORMAT_VERSION})",
                self.version
            )));
        }
        let expected = self.compute_checksum();
        if self.checksum != expected {
            return Err(GraphError::corrupt_archive(format!(
                "header checksum mismatch: expected {expected:#x}, found {:#x}",
                self.checksum
            )));
        }
        if self.directory_offset < HEADER_SIZE {
            return Err(GraphError::corrupt_archive("directory overlaps header"));
        }
        Ok(())
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut buffer = Vec::with_capacity(HEADER_SIZE as usize);
        buffer.extend_from_slice(&self.magic);
        buffer.extend_from_slice(&self.version.to_be_bytes());
        buffer.extend_from_slice(&self.flags.to_be_bytes());
        buffer.extend_from_slice(&self.entry_count.to_be_bytes());
        buffer.extend_from_slice(&self.directory_offset.to_be_bytes());
        buffer.extend_from_slice(&self.directory_len.to_be_bytes());
        buffer.extend_from_slice(&self.checksum.to_be_bytes());
        buffer
    }

    pub fn decode(bytes: &[u8]) -> Result<Self, GraphError> {
        let mut cursor = ByteCursor::new(bytes);
        let mut magic = [0u8; 8];
        magic.copy_from_slice(cursor.take(8)?);
        Ok(Self {
            magic,
            version: cursor.u32()?,
            flags: cursor.u32()?,
            entry_count: cursor.u64()?,
            directory_offset: cursor.u64()?,
            directory_len: cursor.u64()?,
            checksum: cursor.u64()?,
        })
    }
}

struct ByteCursor<'a> {
    bytes: &'a [u8],
    offset: usize,
}

impl<'a> ByteCursor<'a> {
    fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, offset: 0 }
    }

    fn take(&mut self, len: usize) -> Result<&'a [u8], GraphError> {
        let end = self
            .offset
            .checked_add(len)
            .filter(|end| *end <= self.bytes.len())
            .ok_or_else(|| GraphError::corrupt_archive("truncated container record"))?;
        let slice = &self.bytes[self.offset..end];
        self.offset = end;
        Ok(slice)
    }

    fn u16(&mut self) -> Result<u16, GraphError> {
        let b = self.take(2)?;
        Ok(u16::from_be_bytes([b[0], b[1]]))
    }

    fn u32(&mut self) -> Result<u32, GraphError> {
        let b = self.take(4)?;
        Ok(u32::from_be_bytes([b[0], b[1], b[2], b[3]]))
    }

    fn u64(&mut self) -> Result<u64, GraphError> {
        let mut buf = [0u8; 8];
        buf.copy_from_slice(self.take(8)?);
        Ok(u64::from_be_bytes(buf))
    }

    fn is_empty(&self) -> bool {
        self.offset == self.bytes.len()
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EntryInfo {
    pub name: String,
    pub offset: u64,
    pub len: u64,
}

/// Streams named entries into a container.
pub struct ArchiveWriter<W: Write + Seek> {
    inner: W,
    position: u64,
    entries: Vec<EntryInfo>,
    names: AHashSet<String>,
}

impl<W: Write + Seek> ArchiveWriter<W> {
    pub fn new(mut inner: W) -> Result<Self, GraphError> {
        inner.seek(SeekFrom::Start(0))?;
        inner.write_all(&[0u8; HEADER_SIZE as usize])?;
        Ok(Self {
            inner,
            position: HEADER_SIZE,
            entries: Vec::new(),
            names: AHashSet::new(),
        })
    }

    pub fn add_entry(&mut self, name: &str, bytes: &[u8]) -> Result<(), GraphError> {
        if name.is_empty() || name.len() > u16::MAX as usize {
            return Err(GraphError::invalid_input(format!(
                "entry name length {} out of range",
                name.len()
            )));
        }
        if !self.names.insert(name.to_string()) {
            return Err(GraphError::invalid_input(format!("duplicate entry '{name}'")));
        }
        self.inner.write_all(bytes)?;
        self.entries.push(EntryInfo {
            name: name.to_string(),
            offset: self.position,
            len: bytes.len() as u64,
        });
        self.position += bytes.len() as u64;
        Ok(())
    }

    pub fn entry_count(&self) -> usize {
        self.entries.len()
    }

    /// Write the directory and the real header; returns the sink.
    pub fn finish(mut self) -> Result<W, GraphError> {
        let mut directory = Vec::new();
        for entry in &self.entries {
            directory.extend_from_slice(&(entry.name.len() as u16).to_be_bytes());
            directory.extend_from_slice(entry.name.as_bytes());
            directory.extend_from_slice(&entry.offset.to_be_bytes());
            directory.extend_from_slice(&entry.len.to_be_bytes());
        }
        self.inner.write_all(&directory)?;

        let mut header = ContainerHeader::new();
        header.entry_count = self.entries.len() as u64;
        header.directory_offset = self.position;
        header.directory_len = directory.len() as u64;
        header.update_checksum();

        self.inner.seek(SeekFrom::Start(0))?;
        self.inner.write_all(&header.encode())?;
        self.inner
            .seek(SeekFrom::Start(self.position + directory.len() as u64))?;
        self.inner.flush()?;
        Ok(self.inner)
    }
}

/// Random access to the entries of a validated container.
pub struct ArchiveReader<R: Read + Seek> {
    inner: R,
    header: ContainerHeader,
    entries: Vec<EntryInfo>,
    index: AHashMap<String, usize>,
}

impl<R: Read + Seek> ArchiveReader<R> {
    pub fn open(mut inner: R) -> Result<Self, GraphError> {
        let file_len = inner.seek(SeekFrom::End(0))?;
        if file_len < HEADER_SIZE {
            return Err(GraphError::corrupt_archive(format!(
                "file too small: {file_len} bytes, header needs {HEADER_SIZE}"
            )));
        }
        inner.seek(SeekFrom::Start(0))?;
        let mut header_bytes = [0u8; HEADER_SIZE as usize];
        inner.read_exact(&mut header_bytes)?;
        let header = ContainerHeader::decode(&header_bytes)?;
        header.validate()?;

        let directory_end = header
            .directory_offset
            .checked_add(header.directory_len)
            .ok_or_else(|| GraphError::corrupt_archive("directory bounds overflow"))?;
        if directory_end > file_len || header.directory_len > MAX_DIRECTORY_LEN {
            return Err(GraphError::corrupt_archive(format!(
                "directory ends at {directory_end} but file has {file_len} bytes"
            )));
        }

        inner.seek(SeekFrom::Start(header.directory_offset))?;
        let mut directory = vec![0u8; header.directory_len as usize];
        inner.read_exact(&mut directory)?;

        let mut cursor = ByteCursor::new(&directory);
        let mut entries = Vec::new();
        let mut index = AHashMap::new();
        for _ in 0..header.entry_count {
            let name_len = cursor.u16()? as usize;
            let name = std::str::from_utf8(cursor.take(name_len)?)
                .map_err(|_| GraphError::corrupt_archive("entry name is not utf-8"))?
                .to_string();
            let offset = cursor.u64()?;
            let len = cursor.u64()?;
            let end = offset
                .checked_add(len)
                .ok_or_else(|| GraphError::corrupt_archive("entry bounds overflow"))?;
            if offset < HEADER_SIZE || end > header.directory_offset {
                return Err(GraphError::corrupt_archive(format!(
                    "entry '{name}' lies outside the data region"
                )));
            }
            if index.insert(name.clone(), entries.len()).is_some() {
                return Err(GraphError::corrupt_archive(format!("duplicate entry '{name}'")));
            }
            entries.push(EntryInfo { name, offset, len });
        }
        if !cursor.is_empty() {
            return Err(GraphError::corrupt_archive("trailing bytes in directory"));
        }

        Ok(Self {
            inner,
            header,
            entries,
            index,
        })
    }

    pub fn header(&self) -> &ContainerHeader {
        &self.header
    }

    pub fn entries(&self) -> &[EntryInfo] {
        &self.entries
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    pub fn read_entry(&mut self, name: &str) -> Result<Vec<u8>, GraphError> {
        let position = *self
            .index
            .get(name)
            .ok_or_else(|| GraphError::corrupt_archive(format!("missing entry '{name}'")))?;
        let EntryInfo { offset, len, .. } = self.entries[position];
        self.inner.seek(SeekFrom::Start(offset))?;
        let mut bytes = vec![0u8; len as usize];
        self.inner.read_exact(&mut bytes)?;
        Ok(bytes)
    }
}
