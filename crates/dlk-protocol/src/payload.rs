//! Object payloads for the web API.
//!
//! An object travels as an [`ArrayArchive`]: one array member per dataset of
//! its file group, plus a `metadata.json` member holding the group
//! attributes as a flat JSON object.

use dlk_pack::{decode_group, encode_object, ArrayArchive, AttrValue, Group, METADATA_MEMBER};
use dlk_types::DataObject;
use serde_json::{Map, Value};

use crate::error::{ProtocolError, ProtocolResult};

pub fn object_to_archive(name: &str, object: &DataObject) -> ProtocolResult<ArrayArchive> {
    let group = encode_object(name, object)?;
    let mut archive = ArrayArchive::new();
    for (key, dataset) in group.datasets {
        archive.insert_array(&key, dataset);
    }

    let meta: Map<String, Value> = group
        .attrs
        .into_iter()
        .map(|(k, v)| {
            let value = match v {
                AttrValue::Text(s) => Value::String(s),
                AttrValue::Float(f) => Value::from(f),
            };
            (k, value)
        })
        .collect();
    let json = serde_json::to_string(&meta).map_err(|e| ProtocolError::Serialization(e.to_string()))?;
    archive.insert_text(METADATA_MEMBER, json);
    Ok(archive)
}

pub fn archive_to_object(name: &str, archive: &ArrayArchive) -> ProtocolResult<DataObject> {
    let mut group = Group::new(name);
    for member in archive.names() {
        if let Some(dataset) = archive.array(member) {
            group.set_dataset(member, dataset.clone());
        }
    }

    if let Some(json) = archive.text(METADATA_MEMBER) {
        let meta: Map<String, Value> =
            serde_json::from_str(json).map_err(|e| ProtocolError::Deserialization(e.to_string()))?;
        for (key, value) in meta {
            match value {
                Value::String(s) => group.set_attr(&key, s),
                Value::Number(n) => {
                    let f = n.as_f64().ok_or_else(|| {
                        ProtocolError::InvalidPayload(format!("attribute '{key}' is not a float"))
                    })?;
                    group.set_attr(&key, f);
                }
                other => {
                    return Err(ProtocolError::InvalidPayload(format!(
                        "attribute '{key}' has unsupported value {other}"
                    )))
                }
            }
        }
    }

    decode_group(&group)?.ok_or_else(|| {
        ProtocolError::InvalidPayload(format!("payload for '{name}' is neither a signal nor an image"))
    })
}
