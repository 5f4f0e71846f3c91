//! Persistence formats for the DataLab kernel.
//!
//! Two self-describing, CRC-checked binary formats:
//!
//! - **Workspace file** (`.dlw`): file attributes plus one group per entry,
//!   each group holding attributes and named datasets. The body is a
//!   bincode-serialised [`WorkspaceFile`] compressed with zstd.
//! - **Array archive**: a flat multi-member container of arrays and text,
//!   used to ship object payloads over HTTP.
//!
//! [`codec`] maps [`dlk_types::DataObject`] values onto groups and back.

pub mod archive;
pub mod codec;
pub mod entry;
pub mod error;
pub mod reader;
mod varint;
pub mod writer;

pub use archive::{ArrayArchive, Member, METADATA_MEMBER};
pub use codec::{decode_group, encode_object, infer_kind, ROIS_ATTR, TYPE_ATTR};
pub use entry::{AttrValue, Dataset, DatasetValues, Group};
pub use error::{PackError, PackResult};
pub use reader::{WorkspaceReader, IMPLICIT_FORMAT_VERSION};
pub use writer::{
    encode_file, with_default_extension, WorkspaceFile, WorkspaceWriter, DEFAULT_EXTENSION,
    FORMAT_VERSION, FORMAT_VERSION_ATTR, KERNEL_VERSION_ATTR,
};
