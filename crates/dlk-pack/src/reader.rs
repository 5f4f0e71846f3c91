use std::path::Path;

use dlk_types::DataObject;
use tracing::warn;

use crate::codec::decode_group;
use crate::entry::Group;
use crate::error::{PackError, PackResult};
use crate::writer::{
    WorkspaceFile, CONTAINER_VERSION, FILE_MAGIC, FORMAT_VERSION_ATTR, HEADER_LEN,
};

/// Format version assumed when a file carries no version attribute.
pub const IMPLICIT_FORMAT_VERSION: &str = "1.0";

/// Reads a workspace file written by [`crate::WorkspaceWriter`].
#[derive(Debug)]
pub struct WorkspaceReader {
    file: WorkspaceFile,
}

impl WorkspaceReader {
    /// Decode from raw bytes, verifying magic, version and checksum.
    pub fn from_bytes(data: &[u8]) -> PackResult<Self> {
        if data.len() < HEADER_LEN {
            return Err(PackError::Corrupt {
                offset: 0,
                reason: "workspace file too short".into(),
            });
        }
        if &data[0..4] != FILE_MAGIC {
            return Err(PackError::InvalidMagic {
                expected: String::from_utf8_lossy(FILE_MAGIC).into(),
                actual: String::from_utf8_lossy(&data[0..4]).into(),
            });
        }
        let version = read_u32(data, 4);
        if version != CONTAINER_VERSION {
            return Err(PackError::UnsupportedVersion(version));
        }
        let expected_crc = read_u32(data, 8);
        let body_len = u64::from_be_bytes(slice8(data, 12)) as usize;
        let body = data
            .get(HEADER_LEN..HEADER_LEN.saturating_add(body_len))
            .ok_or_else(|| PackError::Corrupt {
                offset: HEADER_LEN,
                reason: format!("body needs {body_len} bytes, have {}", data.len() - HEADER_LEN),
            })?;

        let computed = crc32fast::hash(body);
        if computed != expected_crc {
            return Err(PackError::ChecksumMismatch {
                expected: expected_crc,
                computed,
            });
        }

        let raw = zstd::decode_all(body).map_err(|e| PackError::DecompressionFailed(e.to_string()))?;
        let file: WorkspaceFile =
            bincode::deserialize(&raw).map_err(|e| PackError::Serialization(e.to_string()))?;

        let reader = Self { file };
        reader.check_format_version()?;
        Ok(reader)
    }

    /// Open a file from disk.
    pub fn open(path: &Path) -> PackResult<Self> {
        let data = std::fs::read(path)?;
        Self::from_bytes(&data)
    }

    /// The declared format version, or [`IMPLICIT_FORMAT_VERSION`] when absent.
    pub fn format_version(&self) -> &str {
        self.file
            .attrs
            .get(FORMAT_VERSION_ATTR)
            .and_then(|v| v.as_text())
            .unwrap_or(IMPLICIT_FORMAT_VERSION)
    }

    pub fn file(&self) -> &WorkspaceFile {
        &self.file
    }

    pub fn groups(&self) -> &[Group] {
        &self.file.groups
    }

    /// Decode every group into `(name, object)` pairs, in file order.
    ///
    /// Groups that are neither a signal nor an image are skipped.
    pub fn objects(&self) -> PackResult<Vec<(String, DataObject)>> {
        let mut objects = Vec::with_capacity(self.file.groups.len());
        for group in &self.file.groups {
            match decode_group(group)? {
                Some(obj) => objects.push((group.name.clone(), obj)),
                None => warn!(group = %group.name, "skipping group with unrecognised layout"),
            }
        }
        Ok(objects)
    }

    fn check_format_version(&self) -> PackResult<()> {
        let version = self.format_version();
        let major = version.split('.').next().unwrap_or_default();
        if major != "1" {
            return Err(PackError::UnsupportedFormat(version.to_string()));
        }
        Ok(())
    }
}

fn read_u32(data: &[u8], at: usize) -> u32 {
    let mut buf = [0u8; 4];
    buf.copy_from_slice(&data[at..at + 4]);
    u32::from_be_bytes(buf)
}

fn slice8(data: &[u8], at: usize) -> [u8; 8] {
    let mut buf = [0u8; 8];
    buf.copy_from_slice(&data[at..at + 8]);
    buf
}
