use serde::{Deserialize, Serialize};

/// Authentication method for connecting to a web API peer.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum AuthMethod {
    Bearer(String),
    #[default]
    Anonymous,
}

impl AuthMethod {
    /// Bearer auth from an optional token; empty tokens count as absent.
    pub fn from_token(token: Option<&str>) -> Self {
        match token.filter(|t| !t.is_empty()) {
            Some(t) => Self::Bearer(t.to_string()),
            None => Self::Anonymous,
        }
    }

    pub fn is_authenticated(&self) -> bool {
        !matches!(self, Self::Anonymous)
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Bearer(_) => "bearer-token",
            Self::Anonymous => "anonymous",
        }
    }

    /// Value of the `Authorization` header, if any.
    pub fn header_value(&self) -> Option<String> {
        match self {
            Self::Bearer(token) => Some(format!("Bearer {token}")),
            Self::Anonymous => None,
        }
    }
}

/// Extract the token from an `Authorization: Bearer <token>` header value.
pub fn parse_bearer(header: &str) -> Option<&str> {
    let (scheme, token) = header.trim().split_once(' ')?;
    if scheme.eq_ignore_ascii_case("bearer") {
        Some(token.trim()).filter(|t| !t.is_empty())
    } else {
        None
    }
}
