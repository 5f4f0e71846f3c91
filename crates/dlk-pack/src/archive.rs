//! Multi-member binary archive for bulk array transfer.
//!
//! ```text
//! "DLAR" | u32 BE version | varint member count |
//!   per member: varint name len | name | u8 member type | payload
//! u32 BE crc32 of everything before it
//! ```

use std::collections::BTreeMap;

use crate::entry::{Dataset, DatasetValues};
use crate::error::{PackError, PackResult};
use crate::varint::{decode_varint, encode_varint};

const ARCHIVE_MAGIC: &[u8; 4] = b"DLAR";
const ARCHIVE_VERSION: u32 = 1;

const MEMBER_F64: u8 = 1;
const MEMBER_BOOL: u8 = 2;
const MEMBER_TEXT: u8 = 3;

/// Archive member holding object metadata as JSON.
pub const METADATA_MEMBER: &str = "metadata.json";

#[derive(Clone, Debug, PartialEq)]
pub enum Member {
    Array(Dataset),
    Text(String),
}

/// Named arrays and text blobs, kept in name order.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ArrayArchive {
    members: BTreeMap<String, Member>,
}

impl ArrayArchive {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_array(&mut self, name: &str, dataset: Dataset) {
        self.members.insert(name.to_string(), Member::Array(dataset));
    }

    pub fn insert_text(&mut self, name: &str, text: impl Into<String>) {
        self.members.insert(name.to_string(), Member::Text(text.into()));
    }

    pub fn array(&self, name: &str) -> Option<&Dataset> {
        match self.members.get(name) {
            Some(Member::Array(ds)) => Some(ds),
            _ => None,
        }
    }

    pub fn text(&self, name: &str) -> Option<&str> {
        match self.members.get(name) {
            Some(Member::Text(t)) => Some(t),
            _ => None,
        }
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.members.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut buf = Vec::new();
        buf.extend_from_slice(ARCHIVE_MAGIC);
        buf.extend_from_slice(&ARCHIVE_VERSION.to_be_bytes());
        encode_varint(&mut buf, self.members.len() as u64);

        for (name, member) in &self.members {
            encode_varint(&mut buf, name.len() as u64);
            buf.extend_from_slice(name.as_bytes());
            match member {
                Member::Array(ds) => {
                    let tag = match ds.values {
                        DatasetValues::Float(_) => MEMBER_F64,
                        DatasetValues::Bool(_) => MEMBER_BOOL,
                    };
                    buf.push(tag);
                    encode_varint(&mut buf, ds.shape.len() as u64);
                    for dim in &ds.shape {
                        encode_varint(&mut buf, *dim as u64);
                    }
                    match &ds.values {
                        DatasetValues::Float(values) => {
                            for v in values {
                                buf.extend_from_slice(&v.to_le_bytes());
                            }
                        }
                        DatasetValues::Bool(values) => {
                            buf.extend(values.iter().map(|b| u8::from(*b)));
                        }
                    }
                }
                Member::Text(text) => {
                    buf.push(MEMBER_TEXT);
                    encode_varint(&mut buf, text.len() as u64);
                    buf.extend_from_slice(text.as_bytes());
                }
            }
        }

        let crc = crc32fast::hash(&buf);
        buf.extend_from_slice(&crc.to_be_bytes());
        buf
    }

    pub fn from_bytes(data: &[u8]) -> PackResult<Self> {
        if data.len() < 12 {
            return Err(PackError::Corrupt {
                offset: 0,
                reason: "archive too short".into(),
            });
        }
        if &data[0..4] != ARCHIVE_MAGIC {
            return Err(PackError::InvalidMagic {
                expected: String::from_utf8_lossy(ARCHIVE_MAGIC).into(),
                actual: String::from_utf8_lossy(&data[0..4]).into(),
            });
        }

        let (content, trailer) = data.split_at(data.len() - 4);
        let mut crc_bytes = [0u8; 4];
        crc_bytes.copy_from_slice(trailer);
        let expected = u32::from_be_bytes(crc_bytes);
        let computed = crc32fast::hash(content);
        if expected != computed {
            return Err(PackError::ChecksumMismatch { expected, computed });
        }

        let mut cursor = Cursor { data: content, pos: 4 };
        let version = u32::from_be_bytes(cursor.take_array::<4>()?);
        if version != ARCHIVE_VERSION {
            return Err(PackError::UnsupportedVersion(version));
        }

        let count = cursor.varint()?;
        let mut members = BTreeMap::new();
        for _ in 0..count {
            let name_len = cursor.varint()?;
            let name = cursor.utf8(name_len)?;
            let member = match cursor.byte()? {
                MEMBER_F64 => {
                    let shape = cursor.shape()?;
                    let n = element_count(&shape, cursor.pos)?;
                    let Some(byte_len) = n.checked_mul(8) else {
                        return Err(cursor.corrupt("array too large"));
                    };
                    let raw = cursor.take(byte_len)?;
                    let values = raw
                        .chunks_exact(8)
                        .map(|c| {
                            let mut b = [0u8; 8];
                            b.copy_from_slice(c);
                            f64::from_le_bytes(b)
                        })
                        .collect();
                    Member::Array(Dataset::new(shape, DatasetValues::Float(values))?)
                }
                MEMBER_BOOL => {
                    let shape = cursor.shape()?;
                    let n = element_count(&shape, cursor.pos)?;
                    let values = cursor.take(n)?.iter().map(|b| *b != 0).collect();
                    Member::Array(Dataset::new(shape, DatasetValues::Bool(values))?)
                }
                MEMBER_TEXT => {
                    let len = cursor.varint()?;
                    Member::Text(cursor.utf8(len)?)
                }
                other => {
                    return Err(cursor.corrupt(&format!("unknown member type {other}")));
                }
            };
            members.insert(name, member);
        }

        if cursor.pos != content.len() {
            return Err(cursor.corrupt("trailing bytes after last member"));
        }
        Ok(Self { members })
    }
}

fn element_count(shape: &[usize], offset: usize) -> PackResult<usize> {
    shape
        .iter()
        .try_fold(1usize, |acc, d| acc.checked_mul(*d))
        .ok_or_else(|| PackError::Corrupt {
            offset,
            reason: format!("shape {shape:?} overflows"),
        })
}

struct Cursor<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn corrupt(&self, reason: &str) -> PackError {
        PackError::Corrupt {
            offset: self.pos,
            reason: reason.to_string(),
        }
    }

    fn take(&mut self, n: usize) -> PackResult<&'a [u8]> {
        let end = self
            .pos
            .checked_add(n)
            .filter(|end| *end <= self.data.len())
            .ok_or_else(|| self.corrupt("unexpected end of archive"))?;
        let slice = &self.data[self.pos..end];
        self.pos = end;
        Ok(slice)
    }

    fn take_array<const N: usize>(&mut self) -> PackResult<[u8; N]> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.take(N)?);
        Ok(out)
    }

    fn byte(&mut self) -> PackResult<u8> {
        Ok(self.take(1)?[0])
    }

    fn varint(&mut self) -> PackResult<usize> {
        let (value, consumed) = decode_varint(&self.data[self.pos..]).map_err(|_| self.corrupt("bad varint"))?;
        self.pos += consumed;
        usize::try_from(value).map_err(|_| self.corrupt("length exceeds address space"))
    }

    fn utf8(&mut self, len: usize) -> PackResult<String> {
        let bytes = self.take(len)?;
        String::from_utf8(bytes.to_vec()).map_err(|_| self.corrupt("invalid utf-8"))
    }

    fn shape(&mut self) -> PackResult<Vec<usize>> {
        let ndim = self.varint()?;
        if ndim > 32 {
            return Err(self.corrupt("too many dimensions"));
        }
        (0..ndim).map(|_| self.varint()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dlk_types::Grid;

    fn sample() -> ArrayArchive {
        let mut archive = ArrayArchive::new();
        archive.insert_array("x", Dataset::vector(vec![0.0, 0.5, -1.25]));
        archive.insert_array("mask", Dataset::from_mask(&Grid::from_rows(vec![vec![true, false]]).unwrap()));
        archive.insert_text(METADATA_MEMBER, r#"{"title":"s1"}"#);
        archive
    }

    #[test]
    fn members_survive_encoding() {
        let archive = sample();
        let decoded = ArrayArchive::from_bytes(&archive.to_bytes()).unwrap();
        assert_eq!(decoded, archive);
        assert_eq!(decoded.array("mask").unwrap().shape, vec![1, 2]);
        assert_eq!(decoded.text(METADATA_MEMBER), Some(r#"{"title":"s1"}"#));
        assert!(decoded.array(METADATA_MEMBER).is_none());
        let names: Vec<_> = decoded.names().collect();
        assert_eq!(names, vec!["mask", "metadata.json", "x"]);
    }

    #[test]
    fn empty_archive() {
        let bytes = ArrayArchive::new().to_bytes();
        let decoded = ArrayArchive::from_bytes(&bytes).unwrap();
        assert!(decoded.is_empty());
    }

    #[test]
    fn flipped_byte_detected() {
        let mut bytes = sample().to_bytes();
        bytes[10] ^= 0x01;
        let err = ArrayArchive::from_bytes(&bytes).unwrap_err();
        assert!(matches!(err, PackError::ChecksumMismatch { .. }));
    }

    #[test]
    fn wrong_magic() {
        let mut bytes = sample().to_bytes();
        bytes[0] = b'X';
        let err = ArrayArchive::from_bytes(&bytes).unwrap_err();
        assert!(matches!(err, PackError::InvalidMagic { .. }));
    }

    #[test]
    fn truncated_member_is_corrupt() {
        // Rebuild a valid trailer over a truncated body so only the
        // structural check can fail.
        let bytes = sample().to_bytes();
        let mut content = bytes[..bytes.len() - 8].to_vec();
        let crc = crc32fast::hash(&content);
        content.extend_from_slice(&crc.to_be_bytes());
        let err = ArrayArchive::from_bytes(&content).unwrap_err();
        assert!(matches!(err, PackError::Corrupt { .. }));
    }
}
