use dlk_types::{DataObject, ObjectKind};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// HTTP endpoint paths of the web API. `:name` is a path parameter.
pub mod endpoints {
    pub const PREFIX: &str = "/api/v1";
    pub const STATUS: &str = "/api/v1/status";
    pub const OBJECTS: &str = "/api/v1/objects";
    pub const OBJECT: &str = "/api/v1/objects/:name";
    pub const OBJECT_DATA: &str = "/api/v1/objects/:name/data";
    pub const OBJECT_RENAME: &str = "/api/v1/objects/:name/rename";
    pub const WORKSPACE_SAVE: &str = "/api/v1/workspace/save";
    pub const WORKSPACE_LOAD: &str = "/api/v1/workspace/load";
    pub const CALC: &str = "/api/v1/calc";
}

/// Media type of array archive bodies.
pub const ARCHIVE_CONTENT_TYPE: &str = "application/x-dlk-archive";

/// Values of [`ErrorBody::error`].
pub mod error_kinds {
    pub const NOT_FOUND: &str = "not_found";
    pub const ALREADY_EXISTS: &str = "already_exists";
    pub const UNSUPPORTED: &str = "unsupported";
    pub const UNAUTHORIZED: &str = "unauthorized";
    pub const BAD_REQUEST: &str = "bad_request";
    pub const INTERNAL: &str = "internal";
}

/// Liveness probe response.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StatusResponse {
    pub status: String,
    pub version: String,
    pub protocol_version: u32,
    pub object_count: usize,
}

impl StatusResponse {
    pub fn ok(object_count: usize) -> Self {
        Self {
            status: "ok".into(),
            version: env!("CARGO_PKG_VERSION").into(),
            protocol_version: super::message::PROTOCOL_VERSION,
            object_count,
        }
    }
}

/// Summary of one stored object.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ObjectMetadata {
    pub name: String,
    pub kind: ObjectKind,
    pub title: String,
    /// `[len]` for signals, `[rows, cols]` for images.
    pub shape: Vec<usize>,
}

impl ObjectMetadata {
    pub fn describe(name: &str, object: &DataObject) -> Self {
        let shape = match object {
            DataObject::Signal(s) => vec![s.len()],
            DataObject::Image(i) => {
                let (rows, cols) = i.shape();
                vec![rows, cols]
            }
        };
        Self {
            name: name.to_string(),
            kind: object.kind(),
            title: object.title().to_string(),
            shape,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ObjectListResponse {
    pub objects: Vec<ObjectMetadata>,
}

impl ObjectListResponse {
    pub fn names(&self) -> Vec<String> {
        self.objects.iter().map(|o| o.name.clone()).collect()
    }
}

/// Query string of the object upload endpoint.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct OverwriteQuery {
    #[serde(default)]
    pub overwrite: bool,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RenameRequest {
    pub new_name: String,
}

/// Body of the workspace save and load endpoints. The path is resolved on
/// the server.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PathRequest {
    pub path: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CalcRequest {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CalcResponse {
    pub result: Option<Value>,
}

/// JSON body of every non-2xx response.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
    pub message: String,
}

impl ErrorBody {
    pub fn new(error: &str, message: impl Into<String>) -> Self {
        Self {
            error: error.to_string(),
            message: message.into(),
        }
    }
}
