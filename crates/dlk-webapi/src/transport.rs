use std::time::Duration;

use crate::error::{WebApiError, WebApiResult};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Put,
    Post,
    Delete,
}

impl HttpMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Put => "PUT",
            Self::Post => "POST",
            Self::Delete => "DELETE",
        }
    }
}

/// One fully resolved HTTP request.
#[derive(Clone, Debug, PartialEq)]
pub struct HttpRequest {
    pub method: HttpMethod,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: Option<Vec<u8>>,
}

impl HttpRequest {
    pub fn new(method: HttpMethod, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            headers: Vec::new(),
            body: None,
        }
    }

    pub fn header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.headers.push((name.to_string(), value.into()));
        self
    }

    pub fn body(mut self, content_type: &str, body: Vec<u8>) -> Self {
        self.headers.push(("Content-Type".into(), content_type.to_string()));
        self.body = Some(body);
        self
    }

    pub fn header_value(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: Vec<u8>,
}

impl HttpResponse {
    pub fn new(status: u16, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Sends HTTP requests on behalf of the web API client.
///
/// Hosts without blocking sockets supply their own implementation; any
/// status code is a successful send; only a request that produced no
/// response is an error.
pub trait HttpTransport: Send + Sync {
    fn send(&self, request: HttpRequest) -> WebApiResult<HttpResponse>;
}

/// Default transport on a blocking reqwest client.
#[cfg(not(target_arch = "wasm32"))]
pub struct BlockingTransport {
    client: reqwest::blocking::Client,
}

#[cfg(not(target_arch = "wasm32"))]
impl BlockingTransport {
    pub fn new(timeout: Duration) -> WebApiResult<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| WebApiError::Transport(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { client })
    }
}

#[cfg(not(target_arch = "wasm32"))]
impl HttpTransport for BlockingTransport {
    fn send(&self, request: HttpRequest) -> WebApiResult<HttpResponse> {
        let mut builder = match request.method {
            HttpMethod::Get => self.client.get(&request.url),
            HttpMethod::Put => self.client.put(&request.url),
            HttpMethod::Post => self.client.post(&request.url),
            HttpMethod::Delete => self.client.delete(&request.url),
        };
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(body) = request.body {
            builder = builder.body(body);
        }

        let response = builder
            .send()
            .map_err(|e| WebApiError::Transport(format!("{} {}: {e}", request.method.as_str(), request.url)))?;
        let status = response.status().as_u16();
        let body = response
            .bytes()
            .map_err(|e| WebApiError::Transport(format!("failed to read response body: {e}")))?;
        Ok(HttpResponse::new(status, body.to_vec()))
    }
}

#[cfg(not(target_arch = "wasm32"))]
impl std::fmt::Debug for BlockingTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BlockingTransport").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_builder_collects_headers() {
        let req = HttpRequest::new(HttpMethod::Put, "http://h/x")
            .header("Authorization", "Bearer t")
            .body("application/json", b"{}".to_vec());
        assert_eq!(req.header_value("authorization"), Some("Bearer t"));
        assert_eq!(req.header_value("content-type"), Some("application/json"));
        assert_eq!(req.body.as_deref(), Some(&b"{}"[..]));
    }

    #[test]
    fn success_range() {
        assert!(HttpResponse::new(204, Vec::new()).is_success());
        assert!(!HttpResponse::new(404, Vec::new()).is_success());
    }

    #[test]
    fn blocking_transport_reports_unreachable_host() {
        // bind then drop to get a port with nothing listening
        let port = std::net::TcpListener::bind("127.0.0.1:0")
            .unwrap()
            .local_addr()
            .unwrap()
            .port();
        let transport = BlockingTransport::new(Duration::from_millis(500)).unwrap();
        let err = transport
            .send(HttpRequest::new(HttpMethod::Get, format!("http://127.0.0.1:{port}/api/v1/status")))
            .unwrap_err();
        assert!(matches!(err, WebApiError::Transport(_)));
    }
}
