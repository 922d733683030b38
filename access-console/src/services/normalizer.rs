//! Request path rewriting and response classification.
//!
//! The backend speaks two envelope dialects, `{code, data, message}` and
//! `{success, data, error}`, and sometimes reports an expired session as
//! `{"code": 401}` inside an HTTP 200. Everything here is pure so the
//! I/O layer can apply one classification to every response.

use crate::config::EndpointSettings;
use crate::error::RawResponse;
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceKind {
    /// Enveloped backend endpoint under `/api/`.
    Api,
    /// Static resource under `/assets/`, returned without an envelope.
    Static,
    /// Absolute or explicitly bypassed URL, left untouched.
    External,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedPath {
    pub path: String,
    pub kind: ResourceKind,
}

fn is_absolute(path: &str) -> bool {
    path.starts_with("http://") || path.starts_with("https://") || path.starts_with("//")
}

/// Rewrite a caller-supplied path onto the backend's URL layout.
pub fn resolve_path(path: &str, bypass: bool) -> ResolvedPath {
    if bypass || is_absolute(path) {
        return ResolvedPath {
            path: path.to_string(),
            kind: ResourceKind::External,
        };
    }

    let relative = path.trim_start_matches(['.', '/']);

    let (resolved, kind) = if relative.starts_with("assets/") {
        (format!("/{}", relative), ResourceKind::Static)
    } else if relative.starts_with("api/") {
        (format!("/{}", relative), ResourceKind::Api)
    } else {
        (format!("/api/{}", relative), ResourceKind::Api)
    };

    tracing::debug!(original = path, resolved = %resolved, "Resolved request path");
    ResolvedPath {
        path: resolved,
        kind,
    }
}

fn endpoint_path(endpoint: &str) -> String {
    resolve_path(endpoint, false).path
}

/// Login and refresh must go out without a bearer token.
pub fn needs_credentials(resolved: &ResolvedPath, endpoints: &EndpointSettings) -> bool {
    if resolved.kind == ResourceKind::External {
        return false;
    }
    let path = resolved.path.split('?').next().unwrap_or_default();
    path != endpoint_path(&endpoints.login) && path != endpoint_path(&endpoints.refresh)
}

/// A response body as read off the wire.
#[derive(Debug, Clone, PartialEq)]
pub enum ResponseBody {
    Empty,
    Json(Value),
    Text(String),
}

impl ResponseBody {
    pub fn parse(bytes: &[u8]) -> Self {
        if bytes.iter().all(u8::is_ascii_whitespace) {
            return ResponseBody::Empty;
        }
        match serde_json::from_slice(bytes) {
            Ok(value) => ResponseBody::Json(value),
            Err(_) => ResponseBody::Text(String::from_utf8_lossy(bytes).into_owned()),
        }
    }

    pub fn json(&self) -> Option<&Value> {
        match self {
            ResponseBody::Json(value) => Some(value),
            _ => None,
        }
    }

    fn into_raw(self, status: u16) -> RawResponse {
        match self {
            ResponseBody::Json(value) => RawResponse::new(status, Some(value)),
            ResponseBody::Text(text) => RawResponse::new(status, Some(Value::String(text))),
            ResponseBody::Empty => RawResponse::new(status, None),
        }
    }
}

/// Classified result of one backend call.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Success(Value),
    AuthFailure(RawResponse),
    Forbidden(RawResponse),
    NotFound(RawResponse),
    ServerError(RawResponse),
    /// Anything else the backend refused, with its message when it gave one.
    BusinessFailure {
        message: Option<String>,
        response: RawResponse,
    },
}

fn envelope_code(body: &Value) -> Option<i64> {
    match body.get("code")? {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// True when either envelope convention signals success.
pub fn is_success_envelope(body: &Value) -> bool {
    let code_ok = envelope_code(body).is_some_and(|code| (200..=299).contains(&code));
    let flag_ok = body.get("success").and_then(Value::as_bool) == Some(true);
    code_ok || flag_ok
}

/// `data` when the envelope carries it, otherwise the whole body.
pub fn success_payload(body: Value) -> Value {
    match body {
        Value::Object(mut map) if map.contains_key("data") => map.remove("data").unwrap_or(Value::Null),
        other => other,
    }
}

fn business(response: RawResponse) -> Outcome {
    Outcome::BusinessFailure {
        message: response.message(),
        response,
    }
}

/// Classify a response. An embedded `code: 401` always wins, whatever the
/// transport status said.
pub fn classify(status: u16, body: ResponseBody, kind: ResourceKind) -> Outcome {
    let enveloped = kind != ResourceKind::Static;

    if enveloped && body.json().and_then(envelope_code) == Some(401) {
        return Outcome::AuthFailure(body.into_raw(status));
    }

    match status {
        200..=299 => {}
        401 => return Outcome::AuthFailure(body.into_raw(status)),
        403 => return Outcome::Forbidden(body.into_raw(status)),
        404 => return Outcome::NotFound(body.into_raw(status)),
        500 => return Outcome::ServerError(body.into_raw(status)),
        _ => return business(body.into_raw(status)),
    }

    if !enveloped {
        return match body {
            ResponseBody::Json(value) => Outcome::Success(value),
            ResponseBody::Text(text) => Outcome::Success(Value::String(text)),
            ResponseBody::Empty => Outcome::Success(Value::Null),
        };
    }

    match body {
        ResponseBody::Json(value) if is_success_envelope(&value) => Outcome::Success(success_payload(value)),
        other => business(other.into_raw(status)),
    }
}
