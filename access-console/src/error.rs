use crate::authz::org_hierarchy::HierarchyError;
use serde_json::Value;
use thiserror::Error;

/// The backend response that produced a failure, kept so screens can show
/// whatever the backend said.
#[derive(Debug, Clone, PartialEq)]
pub struct RawResponse {
    pub status: u16,
    pub body: Option<Value>,
}

impl RawResponse {
    pub fn new(status: u16, body: Option<Value>) -> Self {
        Self { status, body }
    }

    /// Backend-provided message, checked under `message`, `error`, then `msg`.
    pub fn message(&self) -> Option<String> {
        let body = self.body.as_ref()?;
        ["message", "error", "msg"]
            .iter()
            .filter_map(|key| body.get(*key))
            .filter_map(Value::as_str)
            .map(str::trim)
            .find(|text| !text.is_empty())
            .map(str::to_string)
    }
}

impl std::fmt::Display for RawResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.message() {
            Some(message) => write!(f, "status {}: {}", self.status, message),
            None => write!(f, "status {}", self.status),
        }
    }
}

/// Coarse failure classes; each is handled in exactly one place.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// Missing, expired or rejected credentials.
    Auth,
    /// Valid session, insufficient privilege.
    Authorization,
    /// Client-side invariant violation, never reaches the network.
    Validation,
    /// Network failure, server error or unreadable payload.
    Transport,
    /// The backend rejected the operation with a message.
    Business,
}

#[derive(Debug, Error)]
pub enum AccessError {
    #[error("Authentication required ({0})")]
    Auth(Box<RawResponse>),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Not found ({0})")]
    NotFound(Box<RawResponse>),

    #[error("Validation error: {0}")]
    InvalidInput(#[from] validator::ValidationErrors),

    #[error("Hierarchy violation: {0}")]
    Hierarchy(#[from] HierarchyError),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Server error ({0})")]
    Server(Box<RawResponse>),

    #[error("{message}")]
    Business {
        message: String,
        response: Option<Box<RawResponse>>,
    },
}

impl AccessError {
    pub fn auth(response: RawResponse) -> Self {
        AccessError::Auth(Box::new(response))
    }

    pub fn business(message: impl Into<String>, response: Option<RawResponse>) -> Self {
        AccessError::Business {
            message: message.into(),
            response: response.map(Box::new),
        }
    }

    pub fn kind(&self) -> FailureKind {
        match self {
            AccessError::Auth(_) => FailureKind::Auth,
            AccessError::Forbidden(_) => FailureKind::Authorization,
            AccessError::InvalidInput(_) | AccessError::Hierarchy(_) => FailureKind::Validation,
            AccessError::NotFound(_) | AccessError::Transport(_) | AccessError::Server(_) => {
                FailureKind::Transport
            }
            AccessError::Business { .. } => FailureKind::Business,
        }
    }

    /// The original backend response, when the failure came from one.
    pub fn response(&self) -> Option<&RawResponse> {
        match self {
            AccessError::Auth(response)
            | AccessError::NotFound(response)
            | AccessError::Server(response) => Some(response),
            AccessError::Business { response, .. } => response.as_deref(),
            _ => None,
        }
    }

    pub fn is_auth_failure(&self) -> bool {
        self.kind() == FailureKind::Auth
    }
}

impl From<reqwest::Error> for AccessError {
    fn from(err: reqwest::Error) -> Self {
        AccessError::Transport(err.to_string())
    }
}
