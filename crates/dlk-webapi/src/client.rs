use std::sync::Arc;
use std::time::Duration;

use dlk_pack::ArrayArchive;
use dlk_protocol::{
    archive_to_object, endpoints, object_to_archive, AuthMethod, CalcRequest, CalcResponse,
    ErrorBody, ObjectListResponse, ObjectMetadata, PathRequest, RenameRequest, StatusResponse,
    ARCHIVE_CONTENT_TYPE,
};
use dlk_types::DataObject;
use reqwest::Url;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use crate::error::{WebApiError, WebApiResult};
use crate::transport::{HttpMethod, HttpRequest, HttpResponse, HttpTransport};

const JSON_CONTENT_TYPE: &str = "application/json";

/// Connection parameters of the web API.
#[derive(Clone, Debug, PartialEq)]
pub struct WebApiConfig {
    /// Base URL of the peer, e.g. `http://127.0.0.1:8080`.
    pub url: String,
    pub token: Option<String>,
    pub timeout: Duration,
}

impl WebApiConfig {
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            token: None,
            timeout: Self::DEFAULT_TIMEOUT,
        }
    }

    pub fn with_token(mut self, token: Option<String>) -> Self {
        self.token = token.filter(|t| !t.is_empty());
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn auth(&self) -> AuthMethod {
        AuthMethod::from_token(self.token.as_deref())
    }
}

/// Typed client for the `/api/v1` endpoints.
///
/// Every call is one request on the configured [`HttpTransport`]. Non-2xx
/// answers become [`WebApiError::Status`] carrying the server's
/// [`ErrorBody`].
pub struct WebApiClient {
    base: Url,
    auth: AuthMethod,
    transport: Arc<dyn HttpTransport>,
}

impl WebApiClient {
    /// Client on the default blocking transport.
    #[cfg(not(target_arch = "wasm32"))]
    pub fn new(config: &WebApiConfig) -> WebApiResult<Self> {
        let transport = crate::transport::BlockingTransport::new(config.timeout)?;
        Self::with_transport(config, Arc::new(transport))
    }

    pub fn with_transport(
        config: &WebApiConfig,
        transport: Arc<dyn HttpTransport>,
    ) -> WebApiResult<Self> {
        let base = Url::parse(&config.url)
            .map_err(|e| WebApiError::InvalidUrl(format!("{}: {e}", config.url)))?;
        if base.cannot_be_a_base() {
            return Err(WebApiError::InvalidUrl(format!("{} cannot be a base URL", config.url)));
        }
        Ok(Self {
            base,
            auth: config.auth(),
            transport,
        })
    }

    pub fn base_url(&self) -> &str {
        self.base.as_str()
    }

    pub fn auth(&self) -> &AuthMethod {
        &self.auth
    }

    // -----------------------------------------------------------------------
    // Endpoints
    // -----------------------------------------------------------------------

    pub fn status(&self) -> WebApiResult<StatusResponse> {
        let url = self.resolve(endpoints::STATUS, None)?;
        json_body(self.execute(self.request(HttpMethod::Get, url))?)
    }

    pub fn list_objects(&self) -> WebApiResult<ObjectListResponse> {
        let url = self.resolve(endpoints::OBJECTS, None)?;
        json_body(self.execute(self.request(HttpMethod::Get, url))?)
    }

    pub fn object_metadata(&self, name: &str) -> WebApiResult<ObjectMetadata> {
        let url = self.resolve(endpoints::OBJECT, Some(name))?;
        json_body(self.execute(self.request(HttpMethod::Get, url))?)
    }

    pub fn get_object(&self, name: &str) -> WebApiResult<DataObject> {
        let url = self.resolve(endpoints::OBJECT_DATA, Some(name))?;
        let response = self.execute(self.request(HttpMethod::Get, url))?;
        let archive = ArrayArchive::from_bytes(&response.body).map_err(dlk_protocol::ProtocolError::from)?;
        Ok(archive_to_object(name, &archive)?)
    }

    pub fn put_object(&self, name: &str, object: &DataObject, overwrite: bool) -> WebApiResult<()> {
        let mut url = self.resolve(endpoints::OBJECT_DATA, Some(name))?;
        url.query_pairs_mut()
            .append_pair("overwrite", if overwrite { "true" } else { "false" });
        let archive = object_to_archive(name, object)?;
        let request = self
            .request(HttpMethod::Put, url)
            .body(ARCHIVE_CONTENT_TYPE, archive.to_bytes());
        self.execute(request)?;
        Ok(())
    }

    pub fn delete_object(&self, name: &str) -> WebApiResult<()> {
        let url = self.resolve(endpoints::OBJECT, Some(name))?;
        self.execute(self.request(HttpMethod::Delete, url))?;
        Ok(())
    }

    pub fn rename_object(&self, old: &str, new: &str) -> WebApiResult<()> {
        let url = self.resolve(endpoints::OBJECT_RENAME, Some(old))?;
        let body = RenameRequest {
            new_name: new.to_string(),
        };
        self.execute(self.json_request(HttpMethod::Post, url, &body)?)?;
        Ok(())
    }

    pub fn clear(&self) -> WebApiResult<()> {
        let url = self.resolve(endpoints::OBJECTS, None)?;
        self.execute(self.request(HttpMethod::Delete, url))?;
        Ok(())
    }

    /// Save the peer's workspace to `path` on the peer's filesystem.
    pub fn save(&self, path: &str) -> WebApiResult<()> {
        let url = self.resolve(endpoints::WORKSPACE_SAVE, None)?;
        let body = PathRequest { path: path.to_string() };
        self.execute(self.json_request(HttpMethod::Post, url, &body)?)?;
        Ok(())
    }

    pub fn load(&self, path: &str) -> WebApiResult<()> {
        let url = self.resolve(endpoints::WORKSPACE_LOAD, None)?;
        let body = PathRequest { path: path.to_string() };
        self.execute(self.json_request(HttpMethod::Post, url, &body)?)?;
        Ok(())
    }

    pub fn calc(&self, name: &str, params: Option<&Value>) -> WebApiResult<Option<Value>> {
        let url = self.resolve(endpoints::CALC, None)?;
        let body = CalcRequest {
            name: name.to_string(),
            params: params.cloned(),
        };
        let response: CalcResponse =
            json_body(self.execute(self.json_request(HttpMethod::Post, url, &body)?)?)?;
        Ok(response.result)
    }

    // -----------------------------------------------------------------------
    // Plumbing
    // -----------------------------------------------------------------------

    /// Append an endpoint template to the base URL, substituting `:name`.
    /// Segments are percent-encoded by the URL builder.
    fn resolve(&self, template: &str, name: Option<&str>) -> WebApiResult<Url> {
        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|_| WebApiError::InvalidUrl(self.base.to_string()))?
            .pop_if_empty()
            .extend(template.split('/').filter(|s| !s.is_empty()).map(|segment| {
                match (segment, name) {
                    (":name", Some(name)) => name,
                    _ => segment,
                }
            }));
        Ok(url)
    }

    fn request(&self, method: HttpMethod, url: Url) -> HttpRequest {
        let request = HttpRequest::new(method, url.as_str());
        match self.auth.header_value() {
            Some(value) => request.header("Authorization", value),
            None => request,
        }
    }

    fn json_request<T: Serialize>(
        &self,
        method: HttpMethod,
        url: Url,
        body: &T,
    ) -> WebApiResult<HttpRequest> {
        Ok(self
            .request(method, url)
            .body(JSON_CONTENT_TYPE, serde_json::to_vec(body)?))
    }

    fn execute(&self, request: HttpRequest) -> WebApiResult<HttpResponse> {
        let method = request.method;
        let url = request.url.clone();
        let response = self.transport.send(request)?;
        debug!(method = method.as_str(), url = %url, status = response.status, "web api call");
        if response.is_success() {
            return Ok(response);
        }
        let body = serde_json::from_slice::<ErrorBody>(&response.body).unwrap_or_else(|_| {
            ErrorBody::new("http", String::from_utf8_lossy(&response.body).into_owned())
        });
        Err(WebApiError::Status {
            status: response.status,
            error: body.error,
            message: body.message,
        })
    }
}

fn json_body<T: DeserializeOwned>(response: HttpResponse) -> WebApiResult<T> {
    Ok(serde_json::from_slice(&response.body)?)
}

impl std::fmt::Debug for WebApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WebApiClient")
            .field("base", &self.base.as_str())
            .field("auth", &self.auth.display_name())
            .finish()
    }
}
