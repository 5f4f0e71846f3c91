use dlk_protocol::{ProxyRequest, ProxyResponse};
use dlk_types::{DataObject, ObjectKind};
use serde_json::Value;

use crate::error::{ProxyError, ProxyResult};

/// Synchronous request/response channel to a remote peer.
///
/// Implementors provide [`call`](ProxyChannel::call); the typed primitives
/// are built on top of it and turn error responses into
/// [`ProxyError::Remote`].
pub trait ProxyChannel: Send + Sync {
    /// One request/response round trip.
    fn call(&self, request: ProxyRequest) -> ProxyResult<ProxyResponse>;

    /// Address of the peer, for status reporting.
    fn endpoint(&self) -> String;

    /// Release the underlying connection. Later calls fail.
    fn close(&self) {}

    fn get_version(&self) -> ProxyResult<String> {
        match self.call(ProxyRequest::GetVersion)? {
            ProxyResponse::Version(v) => Ok(v),
            other => unexpected("Version", other),
        }
    }

    fn get_method_list(&self) -> ProxyResult<Vec<String>> {
        match self.call(ProxyRequest::GetMethodList)? {
            ProxyResponse::Methods(m) => Ok(m),
            other => unexpected("Methods", other),
        }
    }

    fn get_object_titles(&self, panel: ObjectKind) -> ProxyResult<Vec<String>> {
        match self.call(ProxyRequest::GetObjectTitles { panel })? {
            ProxyResponse::Titles(t) => Ok(t),
            other => unexpected("Titles", other),
        }
    }

    fn get_object(&self, title: &str, panel: ObjectKind) -> ProxyResult<DataObject> {
        let request = ProxyRequest::GetObject {
            title: title.to_string(),
            panel,
        };
        match self.call(request)? {
            ProxyResponse::Object(o) => Ok(o),
            other => unexpected("Object", other),
        }
    }

    /// The peer picks the panel from the object kind.
    fn add_object(&self, object: DataObject) -> ProxyResult<()> {
        ack(self.call(ProxyRequest::AddObject { object })?)
    }

    fn select_objects(&self, titles: &[String], panel: ObjectKind) -> ProxyResult<()> {
        ack(self.call(ProxyRequest::SelectObjects {
            titles: titles.to_vec(),
            panel,
        })?)
    }

    /// Remove the selected objects. Only peers that list
    /// `remove_object` in their method list support this.
    fn remove_object(&self, force: bool) -> ProxyResult<()> {
        ack(self.call(ProxyRequest::RemoveObject { force })?)
    }

    fn reset_all(&self) -> ProxyResult<()> {
        ack(self.call(ProxyRequest::ResetAll)?)
    }

    fn save_workspace(&self, path: &str) -> ProxyResult<()> {
        ack(self.call(ProxyRequest::SaveWorkspace {
            path: path.to_string(),
        })?)
    }

    fn load_workspace(&self, paths: &[String], reset_all: bool) -> ProxyResult<()> {
        ack(self.call(ProxyRequest::LoadWorkspace {
            paths: paths.to_vec(),
            reset_all,
        })?)
    }

    fn calc(&self, name: &str, params: Option<&Value>) -> ProxyResult<Option<Value>> {
        let params = params.map(serde_json::to_string).transpose()?;
        let request = ProxyRequest::Calc {
            name: name.to_string(),
            params,
        };
        match self.call(request)? {
            ProxyResponse::CalcResult(Some(json)) => Ok(Some(serde_json::from_str(&json)?)),
            ProxyResponse::CalcResult(None) => Ok(None),
            other => unexpected("CalcResult", other),
        }
    }
}

fn ack(response: ProxyResponse) -> ProxyResult<()> {
    match response {
        ProxyResponse::Ack => Ok(()),
        other => unexpected("Ack", other),
    }
}

fn unexpected<T>(expected: &'static str, response: ProxyResponse) -> ProxyResult<T> {
    match response {
        ProxyResponse::Error { code, message } => Err(ProxyError::Remote { code, message }),
        other => Err(ProxyError::UnexpectedResponse {
            expected,
            actual: other.type_name(),
        }),
    }
}

/// Outcome of listing one panel.
///
/// A failed probe contributes no titles; the failure is kept only for
/// logging.
#[derive(Clone, Debug, PartialEq)]
pub enum PanelProbe {
    Listed(Vec<String>),
    Unavailable(String),
}

impl PanelProbe {
    pub fn run(channel: &dyn ProxyChannel, panel: ObjectKind) -> Self {
        match channel.get_object_titles(panel) {
            Ok(titles) => Self::Listed(titles),
            Err(e) => Self::Unavailable(e.to_string()),
        }
    }

    pub fn contains(&self, title: &str) -> bool {
        match self {
            Self::Listed(titles) => titles.iter().any(|t| t == title),
            Self::Unavailable(_) => false,
        }
    }

    pub fn into_titles(self) -> Vec<String> {
        match self {
            Self::Listed(titles) => titles,
            Self::Unavailable(_) => Vec::new(),
        }
    }
}
