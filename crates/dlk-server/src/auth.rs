use async_trait::async_trait;
use axum::extract::{Request, State};
use axum::http::header::AUTHORIZATION;
use axum::middleware::Next;
use axum::response::Response;
use dlk_protocol::parse_bearer;

use crate::error::{ServerError, ServerResult};
use crate::handler::AppState;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Identity {
    pub name: String,
}

impl Identity {
    pub fn anonymous() -> Self {
        Self { name: "anonymous".into() }
    }

    pub fn user(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Credentials {
    Bearer(String),
    Anonymous,
}

impl Credentials {
    /// Credentials carried by an `Authorization` header value.
    pub fn from_header(value: Option<&str>) -> Self {
        match value.and_then(parse_bearer) {
            Some(token) => Self::Bearer(token.to_string()),
            None => Self::Anonymous,
        }
    }
}

#[async_trait]
pub trait AuthProvider: Send + Sync {
    async fn authenticate(&self, credentials: &Credentials) -> ServerResult<Identity>;
}

/// Accepts every request.
pub struct AllowAllAuth;

#[async_trait]
impl AuthProvider for AllowAllAuth {
    async fn authenticate(&self, credentials: &Credentials) -> ServerResult<Identity> {
        match credentials {
            Credentials::Bearer(token) => {
                let prefix: String = token.chars().take(8).collect();
                Ok(Identity::user(format!("bearer:{prefix}")))
            }
            Credentials::Anonymous => Ok(Identity::anonymous()),
        }
    }
}

/// Requires one shared bearer token.
pub struct TokenAuth {
    token: String,
}

impl TokenAuth {
    pub fn new(token: impl Into<String>) -> Self {
        Self { token: token.into() }
    }
}

#[async_trait]
impl AuthProvider for TokenAuth {
    async fn authenticate(&self, credentials: &Credentials) -> ServerResult<Identity> {
        match credentials {
            Credentials::Bearer(token) if *token == self.token => Ok(Identity::user("token")),
            Credentials::Bearer(_) => Err(ServerError::Unauthorized("invalid bearer token".into())),
            Credentials::Anonymous => Err(ServerError::Unauthorized("bearer token required".into())),
        }
    }
}

/// Middleware authenticating every web API request. The resolved
/// [`Identity`] is stored in the request extensions.
pub async fn require_auth(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, ServerError> {
    let header = req.headers().get(AUTHORIZATION).and_then(|v| v.to_str().ok());
    let credentials = Credentials::from_header(header);
    let identity = state.auth.authenticate(&credentials).await?;
    req.extensions_mut().insert(identity);
    Ok(next.run(req).await)
}
