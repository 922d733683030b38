use serde::{Deserialize, Serialize};

/// Credentials for the signed-in user as persisted by the credential store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub token: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    /// Absolute expiry in epoch milliseconds; `None` means the backend gave
    /// no expiry and the token is used until rejected.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at_epoch_ms: Option<i64>,
    /// Login entry point to return to when this session ends.
    pub login_url: String,
}

impl Session {
    pub fn new(token: impl Into<String>, login_url: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            refresh_token: None,
            expires_at_epoch_ms: None,
            login_url: login_url.into(),
        }
    }

    pub fn with_refresh_token(mut self, refresh_token: Option<String>) -> Self {
        self.refresh_token = refresh_token.filter(|t| !t.is_empty());
        self
    }

    pub fn with_expiry(mut self, expires_at_epoch_ms: Option<i64>) -> Self {
        self.expires_at_epoch_ms = expires_at_epoch_ms;
        self
    }

    pub fn has_token(&self) -> bool {
        !self.token.is_empty()
    }

    pub fn is_expired(&self, now_ms: i64) -> bool {
        matches!(self.expires_at_epoch_ms, Some(expiry) if expiry <= now_ms)
    }

    /// A session is usable when it carries a token that has not expired.
    /// Anything else is treated exactly like having no session at all.
    pub fn is_usable(&self, now_ms: i64) -> bool {
        self.has_token() && !self.is_expired(now_ms)
    }

    pub fn can_refresh(&self) -> bool {
        self.refresh_token.is_some()
    }
}

/// Current wall-clock time in epoch milliseconds.
pub fn now_epoch_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_without_expiry_is_usable() {
        let session = Session::new("tok", "/login");
        assert!(session.is_usable(now_epoch_ms()));
    }

    #[test]
    fn test_expired_session_is_not_usable() {
        let session = Session::new("tok", "/login").with_expiry(Some(1_000));
        assert!(session.is_expired(1_000));
        assert!(!session.is_usable(1_000));
        assert!(session.is_usable(999));
    }

    #[test]
    fn test_empty_token_is_not_usable() {
        let session = Session::new("", "/login");
        assert!(!session.is_usable(0));
    }

    #[test]
    fn test_empty_refresh_token_is_dropped() {
        let session = Session::new("tok", "/login").with_refresh_token(Some(String::new()));
        assert!(!session.can_refresh());
    }
}
