use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use dlk_types::DataObject;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::codec::encode_object;
use crate::entry::{AttrValue, Group};
use crate::error::{PackError, PackResult};

pub(crate) const FILE_MAGIC: &[u8; 4] = b"DLWS";
pub(crate) const CONTAINER_VERSION: u32 = 1;
/// magic + version + crc32 + body length
pub(crate) const HEADER_LEN: usize = 4 + 4 + 4 + 8;

/// File attribute carrying the workspace format version.
pub const FORMAT_VERSION_ATTR: &str = "format_version";
/// File attribute carrying the version of the writer.
pub const KERNEL_VERSION_ATTR: &str = "kernel_version";
/// Format version written by this crate.
pub const FORMAT_VERSION: &str = "1.0";
/// Extension appended to save paths that have none.
pub const DEFAULT_EXTENSION: &str = "dlw";

/// Decoded body of a workspace file.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct WorkspaceFile {
    pub attrs: BTreeMap<String, AttrValue>,
    /// One group per entry, sorted by name.
    pub groups: Vec<Group>,
}

/// Builds a workspace file from objects or raw groups.
#[derive(Debug)]
pub struct WorkspaceWriter {
    attrs: BTreeMap<String, AttrValue>,
    groups: BTreeMap<String, Group>,
}

impl WorkspaceWriter {
    pub fn new() -> Self {
        let mut attrs = BTreeMap::new();
        attrs.insert(FORMAT_VERSION_ATTR.to_string(), AttrValue::from(FORMAT_VERSION));
        attrs.insert(
            KERNEL_VERSION_ATTR.to_string(),
            AttrValue::from(env!("CARGO_PKG_VERSION")),
        );
        Self {
            attrs,
            groups: BTreeMap::new(),
        }
    }

    /// Set or replace a file-level attribute.
    pub fn set_attr(&mut self, key: &str, value: impl Into<AttrValue>) {
        self.attrs.insert(key.to_string(), value.into());
    }

    /// Remove a file-level attribute.
    pub fn remove_attr(&mut self, key: &str) {
        self.attrs.remove(key);
    }

    /// Add a group. A group with the same name is replaced.
    pub fn add_group(&mut self, group: Group) {
        self.groups.insert(group.name.clone(), group);
    }

    /// Encode an object and add it under `name`.
    pub fn add_object(&mut self, name: &str, object: &DataObject) -> PackResult<()> {
        let group = encode_object(name, object)?;
        self.add_group(group);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// Write the file to disk. Returns the path actually written, which
    /// carries [`DEFAULT_EXTENSION`] when `path` had no extension.
    pub fn finish(self, path: &Path) -> PackResult<PathBuf> {
        let path = with_default_extension(path);
        let count = self.groups.len();
        let bytes = self.finish_to_bytes()?;
        std::fs::write(&path, &bytes)?;
        debug!(path = %path.display(), groups = count, bytes = bytes.len(), "workspace file written");
        Ok(path)
    }

    /// Encode the file in memory (no disk I/O).
    pub fn finish_to_bytes(self) -> PackResult<Vec<u8>> {
        let file = WorkspaceFile {
            attrs: self.attrs,
            groups: self.groups.into_values().collect(),
        };
        encode_file(&file)
    }
}

impl Default for WorkspaceWriter {
    fn default() -> Self {
        Self::new()
    }
}

/// Encode a decoded file body with the container header.
pub fn encode_file(file: &WorkspaceFile) -> PackResult<Vec<u8>> {
    let raw = bincode::serialize(file).map_err(|e| PackError::Serialization(e.to_string()))?;
    let body = zstd::encode_all(raw.as_slice(), 3)
        .map_err(|e| PackError::CompressionFailed(e.to_string()))?;

    let mut out = Vec::with_capacity(HEADER_LEN + body.len());
    out.extend_from_slice(FILE_MAGIC);
    out.extend_from_slice(&CONTAINER_VERSION.to_be_bytes());
    out.extend_from_slice(&crc32fast::hash(&body).to_be_bytes());
    out.extend_from_slice(&(body.len() as u64).to_be_bytes());
    out.extend_from_slice(&body);
    Ok(out)
}

/// Append [`DEFAULT_EXTENSION`] to paths without an extension.
pub fn with_default_extension(path: &Path) -> PathBuf {
    if path.extension().is_some() {
        path.to_path_buf()
    } else {
        path.with_extension(DEFAULT_EXTENSION)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_extension_added_only_when_missing() {
        assert_eq!(
            with_default_extension(Path::new("/tmp/analysis")),
            PathBuf::from("/tmp/analysis.dlw")
        );
        assert_eq!(
            with_default_extension(Path::new("/tmp/analysis.h5")),
            PathBuf::from("/tmp/analysis.h5")
        );
    }

    #[test]
    fn header_layout() {
        let bytes = WorkspaceWriter::new().finish_to_bytes().unwrap();
        assert_eq!(&bytes[0..4], FILE_MAGIC);
        assert_eq!(u32::from_be_bytes(bytes[4..8].try_into().unwrap()), CONTAINER_VERSION);
        let body_len = u64::from_be_bytes(bytes[12..20].try_into().unwrap()) as usize;
        assert_eq!(bytes.len(), HEADER_LEN + body_len);
    }

    #[test]
    fn same_name_group_replaced() {
        let mut writer = WorkspaceWriter::new();
        writer.add_group(Group::new("a"));
        let mut second = Group::new("a");
        second.set_attr("title", "second");
        writer.add_group(second);
        assert_eq!(writer.len(), 1);
    }
}
