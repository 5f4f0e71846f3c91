use std::path::Path;
use std::sync::Arc;

use dlk_store::{BackendKind, StoreError, StoreResult, WorkspaceBackend};
use dlk_types::DataObject;
use serde_json::Value;
use tracing::debug;

use crate::client::{WebApiClient, WebApiConfig};
use crate::error::WebApiError;

/// Backend storing objects in a peer reached over the web API.
///
/// Metadata travels as JSON, object payloads as array archives. Workspace
/// paths given to `save` and `load` are resolved on the peer.
pub struct WebApiBackend {
    client: Arc<WebApiClient>,
}

impl WebApiBackend {
    /// Connect with the default blocking transport.
    #[cfg(not(target_arch = "wasm32"))]
    pub fn connect(config: &WebApiConfig) -> StoreResult<Self> {
        let client = WebApiClient::new(config)
            .map_err(|e| StoreError::Connection(format!("{}: {e}", config.url)))?;
        Self::with_client(Arc::new(client))
    }

    /// Wrap a client, verifying the peer answers the status probe.
    pub fn with_client(client: Arc<WebApiClient>) -> StoreResult<Self> {
        let status = client.status().map_err(|e| {
            StoreError::Connection(format!("web api at {} did not answer: {e}", client.base_url()))
        })?;
        debug!(
            url = client.base_url(),
            version = %status.version,
            objects = status.object_count,
            "connected to web api"
        );
        Ok(Self { client })
    }

    pub fn client(&self) -> Arc<WebApiClient> {
        Arc::clone(&self.client)
    }

    fn not_found(&self, name: &str) -> StoreError {
        StoreError::not_found(name, self.list().unwrap_or_default())
    }

    /// Attach the name the caller used to 404 and 409 answers.
    fn named(&self, err: WebApiError, missing: &str, taken: &str) -> StoreError {
        match err.status() {
            Some(404) => self.not_found(missing),
            Some(409) => StoreError::AlreadyExists(taken.to_string()),
            _ => err.into(),
        }
    }
}

impl WorkspaceBackend for WebApiBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::WebApi
    }

    fn endpoint(&self) -> Option<String> {
        Some(self.client.base_url().to_string())
    }

    fn list(&self) -> StoreResult<Vec<String>> {
        Ok(self.client.list_objects()?.names())
    }

    fn get(&self, name: &str) -> StoreResult<DataObject> {
        self.client
            .get_object(name)
            .map_err(|e| self.named(e, name, name))
    }

    fn add(&self, name: &str, object: DataObject, overwrite: bool) -> StoreResult<()> {
        let object = object.retitled(name);
        self.client
            .put_object(name, &object, overwrite)
            .map_err(|e| self.named(e, name, name))
    }

    fn remove(&self, name: &str) -> StoreResult<()> {
        self.client
            .delete_object(name)
            .map_err(|e| self.named(e, name, name))
    }

    fn rename(&self, old: &str, new: &str) -> StoreResult<()> {
        self.client
            .rename_object(old, new)
            .map_err(|e| self.named(e, old, new))
    }

    fn exists(&self, name: &str) -> bool {
        self.client.object_metadata(name).is_ok()
    }

    fn clear(&self) -> StoreResult<()> {
        Ok(self.client.clear()?)
    }

    fn save(&self, path: &Path) -> StoreResult<()> {
        Ok(self.client.save(&path.to_string_lossy())?)
    }

    fn load(&self, path: &Path) -> StoreResult<()> {
        match self.client.load(&path.to_string_lossy()) {
            Err(e) if e.status() == Some(404) => Err(StoreError::FileNotFound(path.to_path_buf())),
            other => Ok(other?),
        }
    }

    fn calc(&self, name: &str, params: Option<&Value>) -> StoreResult<Option<Value>> {
        Ok(self.client.calc(name, params)?)
    }
}

impl std::fmt::Debug for WebApiBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WebApiBackend")
            .field("url", &self.client.base_url())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::tests::ScriptedTransport;
    use crate::transport::HttpMethod;
    use dlk_protocol::{
        error_kinds, object_to_archive, ErrorBody, ObjectListResponse, ObjectMetadata,
        StatusResponse,
    };
    use dlk_types::Signal;

    fn signal(title: &str, y: Vec<f64>) -> DataObject {
        let x = (0..y.len()).map(|i| i as f64).collect();
        Signal::new(title, x, y).unwrap().into()
    }

    fn listing(objects: &[(&str, &DataObject)]) -> ObjectListResponse {
        ObjectListResponse {
            objects: objects
                .iter()
                .map(|(name, object)| ObjectMetadata::describe(name, object))
                .collect(),
        }
    }

    fn connected() -> (Arc<ScriptedTransport>, WebApiBackend) {
        let transport = Arc::new(ScriptedTransport::default());
        transport.reply_json(200, &StatusResponse::ok(0));
        let config = WebApiConfig::new("http://peer:9000").with_token(Some("t".into()));
        let client = WebApiClient::with_transport(&config, transport.clone()).unwrap();
        let backend = WebApiBackend::with_client(Arc::new(client)).unwrap();
        (transport, backend)
    }

    fn not_found_body(name: &str) -> ErrorBody {
        ErrorBody::new(error_kinds::NOT_FOUND, format!("object '{name}' not found"))
    }

    // -----------------------------------------------------------------------
    // Connection
    // -----------------------------------------------------------------------

    #[test]
    fn connect_probes_status() {
        let (transport, backend) = connected();
        assert_eq!(transport.last().url, "http://peer:9000/api/v1/status");
        assert_eq!(backend.kind(), BackendKind::WebApi);
        assert_eq!(backend.endpoint().as_deref(), Some("http://peer:9000/"));
    }

    #[test]
    fn unreachable_peer_is_connection_error() {
        let transport = Arc::new(ScriptedTransport::default());
        transport.fail();
        let client = WebApiClient::with_transport(&WebApiConfig::new("http://peer"), transport).unwrap();
        let err = WebApiBackend::with_client(Arc::new(client)).unwrap_err();
        assert!(matches!(err, StoreError::Connection(_)));
    }

    #[test]
    fn rejected_token_is_connection_error() {
        let transport = Arc::new(ScriptedTransport::default());
        transport.reply_json(401, &ErrorBody::new(error_kinds::UNAUTHORIZED, "bad token"));
        let client = WebApiClient::with_transport(&WebApiConfig::new("http://peer"), transport).unwrap();
        let err = WebApiBackend::with_client(Arc::new(client)).unwrap_err();
        assert!(matches!(err, StoreError::Connection(_)));
    }

    // -----------------------------------------------------------------------
    // Contract
    // -----------------------------------------------------------------------

    #[test]
    fn list_returns_names() {
        let (transport, backend) = connected();
        let a = signal("a", vec![1.0]);
        transport.reply_json(200, &listing(&[("a", &a)]));
        assert_eq!(backend.list().unwrap(), vec!["a"]);
    }

    #[test]
    fn get_decodes_archive() {
        let (transport, backend) = connected();
        let object = signal("s1", vec![0.0, 1.0, 0.0]);
        transport.reply(200, object_to_archive("s1", &object).unwrap().to_bytes());
        assert_eq!(backend.get("s1").unwrap(), object);
    }

    #[test]
    fn get_missing_lists_available() {
        let (transport, backend) = connected();
        let b = signal("b", vec![1.0]);
        transport.reply_json(404, &not_found_body("a"));
        transport.reply_json(200, &listing(&[("b", &b)]));
        match backend.get("a").unwrap_err() {
            StoreError::NotFound { name, available } => {
                assert_eq!(name, "a");
                assert_eq!(available, vec!["b"]);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn add_conflict_is_already_exists() {
        let (transport, backend) = connected();
        transport.reply_json(409, &ErrorBody::new(error_kinds::ALREADY_EXISTS, "s1"));
        let err = backend.add("s1", signal("other", vec![1.0]), false).unwrap_err();
        assert!(matches!(err, StoreError::AlreadyExists(name) if name == "s1"));
        assert!(transport.last().url.ends_with("overwrite=false"));
    }

    #[test]
    fn add_sets_title_to_name() {
        let (transport, backend) = connected();
        transport.reply(201, Vec::new());
        backend.add("s1", signal("other", vec![1.0]), true).unwrap();
        let body = transport.last().body.unwrap();
        let archive = dlk_pack::ArrayArchive::from_bytes(&body).unwrap();
        let stored = dlk_protocol::archive_to_object("s1", &archive).unwrap();
        assert_eq!(stored.title(), "s1");
    }

    #[test]
    fn rename_maps_names_per_status() {
        let (transport, backend) = connected();
        transport.reply_json(409, &ErrorBody::new(error_kinds::ALREADY_EXISTS, "b"));
        assert!(matches!(
            backend.rename("a", "b").unwrap_err(),
            StoreError::AlreadyExists(name) if name == "b"
        ));

        transport.reply_json(404, &not_found_body("a"));
        transport.reply_json(200, &ObjectListResponse::default());
        match backend.rename("a", "b").unwrap_err() {
            StoreError::NotFound { name, .. } => assert_eq!(name, "a"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn remove_missing_is_not_found() {
        let (transport, backend) = connected();
        transport.reply_json(404, &not_found_body("x"));
        transport.reply_json(200, &ObjectListResponse::default());
        assert!(backend.remove("x").unwrap_err().is_not_found());
        let requests = transport.seen.lock().unwrap();
        assert_eq!(requests[1].method, HttpMethod::Delete);
    }

    #[test]
    fn exists_never_fails() {
        let (transport, backend) = connected();
        transport.fail();
        assert!(!backend.exists("a"));
        let a = signal("a", vec![1.0]);
        transport.reply_json(200, &ObjectMetadata::describe("a", &a));
        assert!(backend.exists("a"));
    }

    #[test]
    fn calc_unsupported_maps() {
        let (transport, backend) = connected();
        transport.reply_json(501, &ErrorBody::new(error_kinds::UNSUPPORTED, "no engine"));
        assert!(matches!(backend.calc("fft", None).unwrap_err(), StoreError::Unsupported(_)));
    }

    #[test]
    fn load_missing_file() {
        let (transport, backend) = connected();
        transport.reply_json(404, &ErrorBody::new(error_kinds::NOT_FOUND, "no such file"));
        let err = backend.load(Path::new("/nope.dlw")).unwrap_err();
        assert!(matches!(err, StoreError::FileNotFound(_)));
    }
}
