use dlk_types::{DataObject, ObjectKind};
use serde::{Deserialize, Serialize};

pub const PROTOCOL_VERSION: u32 = 1;
pub const MAX_MESSAGE_SIZE: usize = 256 * 1024 * 1024;

/// Error codes carried by [`ProxyResponse::Error`].
pub mod codes {
    pub const NOT_FOUND: u32 = 404;
    pub const ALREADY_EXISTS: u32 = 409;
    pub const INTERNAL: u32 = 500;
    pub const UNSUPPORTED: u32 = 501;
}

/// Method names a peer may advertise through [`ProxyRequest::GetMethodList`].
pub mod methods {
    pub const GET_OBJECT_TITLES: &str = "get_object_titles";
    pub const GET_OBJECT: &str = "get_object";
    pub const ADD_OBJECT: &str = "add_object";
    pub const SELECT_OBJECTS: &str = "select_objects";
    pub const REMOVE_OBJECT: &str = "remove_object";
    pub const RESET_ALL: &str = "reset_all";
    pub const SAVE_WORKSPACE: &str = "save_workspace";
    pub const LOAD_WORKSPACE: &str = "load_workspace";
    pub const CALC: &str = "calc";

    /// Everything a current peer supports.
    pub const ALL: [&str; 9] = [
        GET_OBJECT_TITLES,
        GET_OBJECT,
        ADD_OBJECT,
        SELECT_OBJECTS,
        REMOVE_OBJECT,
        RESET_ALL,
        SAVE_WORKSPACE,
        LOAD_WORKSPACE,
        CALC,
    ];
}

/// Requests sent over the RPC channel. Objects live in one panel per kind.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum ProxyRequest {
    GetVersion,
    GetMethodList,
    GetObjectTitles { panel: ObjectKind },
    GetObject { title: String, panel: ObjectKind },
    /// The peer files the object into the panel matching its kind.
    AddObject { object: DataObject },
    SelectObjects { titles: Vec<String>, panel: ObjectKind },
    /// Remove the current selection.
    RemoveObject { force: bool },
    ResetAll,
    SaveWorkspace { path: String },
    LoadWorkspace { paths: Vec<String>, reset_all: bool },
    /// `params` is a JSON document.
    Calc { name: String, params: Option<String> },
}

/// Responses sent over the RPC channel.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum ProxyResponse {
    Version(String),
    Methods(Vec<String>),
    Titles(Vec<String>),
    Object(DataObject),
    Ack,
    /// JSON document, if the computation produced one.
    CalcResult(Option<String>),
    Error { code: u32, message: String },
}

impl ProxyRequest {
    pub fn type_tag(&self) -> u8 {
        match self {
            Self::GetVersion => 1,
            Self::GetMethodList => 2,
            Self::GetObjectTitles { .. } => 3,
            Self::GetObject { .. } => 4,
            Self::AddObject { .. } => 5,
            Self::SelectObjects { .. } => 6,
            Self::RemoveObject { .. } => 7,
            Self::ResetAll => 8,
            Self::SaveWorkspace { .. } => 9,
            Self::LoadWorkspace { .. } => 10,
            Self::Calc { .. } => 11,
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Self::GetVersion => "GetVersion",
            Self::GetMethodList => "GetMethodList",
            Self::GetObjectTitles { .. } => "GetObjectTitles",
            Self::GetObject { .. } => "GetObject",
            Self::AddObject { .. } => "AddObject",
            Self::SelectObjects { .. } => "SelectObjects",
            Self::RemoveObject { .. } => "RemoveObject",
            Self::ResetAll => "ResetAll",
            Self::SaveWorkspace { .. } => "SaveWorkspace",
            Self::LoadWorkspace { .. } => "LoadWorkspace",
            Self::Calc { .. } => "Calc",
        }
    }
}

impl ProxyResponse {
    pub fn error(code: u32, message: impl Into<String>) -> Self {
        Self::Error {
            code,
            message: message.into(),
        }
    }

    pub fn type_tag(&self) -> u8 {
        match self {
            Self::Version(_) => 128,
            Self::Methods(_) => 129,
            Self::Titles(_) => 130,
            Self::Object(_) => 131,
            Self::Ack => 132,
            Self::CalcResult(_) => 133,
            Self::Error { .. } => 255,
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Version(_) => "Version",
            Self::Methods(_) => "Methods",
            Self::Titles(_) => "Titles",
            Self::Object(_) => "Object",
            Self::Ack => "Ack",
            Self::CalcResult(_) => "CalcResult",
            Self::Error { .. } => "Error",
        }
    }
}
