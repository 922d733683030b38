//! HTTP boundary to the console backend.
//!
//! Every call goes through [`ApiClient::request`]: the path is rewritten,
//! credentials attached, the response classified once, and failures routed
//! to the navigator or notifier before the caller sees them.

use crate::config::{ApiSettings, MessageSettings, RouteSettings, Settings};
use crate::error::{AccessError, RawResponse};
use crate::models::{Session, now_epoch_ms};
use crate::services::credential_store::CredentialStore;
use crate::services::identity::IdentityCell;
use crate::services::navigation::{Destination, NoticeLevel, Navigator, Notifier};
use crate::services::normalizer::{
    Outcome, ResolvedPath, ResponseBody, classify, needs_credentials, resolve_path,
};
use crate::utils::jwt::expiry_epoch_ms;
use reqwest::{Client, Method};
use secrecy::{ExposeSecret, Secret};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use service_core::observability::{TracedClientExt, new_request_id};
use std::sync::Arc;
use tokio::sync::Mutex;

/// Per-request knobs.
#[derive(Debug, Clone, Copy)]
pub struct RequestOptions {
    /// Send the path exactly as given.
    pub bypass: bool,
    /// Surface failures through the notifier. Redirects happen regardless.
    pub notify: bool,
}

impl Default for RequestOptions {
    fn default() -> Self {
        Self {
            bypass: false,
            notify: true,
        }
    }
}

impl RequestOptions {
    pub fn quiet() -> Self {
        Self {
            notify: false,
            ..Self::default()
        }
    }
}

/// Token grant returned by the login and refresh endpoints.
#[derive(Debug, Deserialize)]
struct TokenGrant {
    access_token: String,
    #[serde(default)]
    refresh_token: Option<String>,
    /// Lifetime in seconds.
    #[serde(default)]
    expires_in: Option<i64>,
}

impl TokenGrant {
    fn into_session(self, requested_at_ms: i64, login_url: &str) -> Session {
        let expires_at = match self.expires_in {
            Some(seconds) => Some(requested_at_ms + seconds.saturating_mul(1000)),
            None => expiry_epoch_ms(&self.access_token),
        };

        Session::new(self.access_token, login_url)
            .with_refresh_token(self.refresh_token)
            .with_expiry(expires_at)
    }
}

pub struct ApiClient {
    client: Client,
    api: ApiSettings,
    routes: RouteSettings,
    messages: MessageSettings,
    store: Arc<CredentialStore>,
    identity: Arc<IdentityCell>,
    navigator: Arc<dyn Navigator>,
    notifier: Arc<dyn Notifier>,
    refresh_lock: Mutex<()>,
}

impl ApiClient {
    pub fn new(
        settings: &Settings,
        store: Arc<CredentialStore>,
        identity: Arc<IdentityCell>,
        navigator: Arc<dyn Navigator>,
        notifier: Arc<dyn Notifier>,
    ) -> Result<Self, AccessError> {
        let client = Client::builder().timeout(settings.api.timeout()).build()?;

        Ok(Self {
            client,
            api: settings.api.clone(),
            routes: settings.routes.clone(),
            messages: settings.messages.clone(),
            store,
            identity,
            navigator,
            notifier,
            refresh_lock: Mutex::new(()),
        })
    }

    pub fn store(&self) -> &Arc<CredentialStore> {
        &self.store
    }

    pub fn identity(&self) -> &Arc<IdentityCell> {
        &self.identity
    }

    pub fn navigator(&self) -> &Arc<dyn Navigator> {
        &self.navigator
    }

    pub fn notifier(&self) -> &Arc<dyn Notifier> {
        &self.notifier
    }

    pub fn settings(&self) -> &ApiSettings {
        &self.api
    }

    pub fn messages(&self) -> &MessageSettings {
        &self.messages
    }

    fn url_for(&self, resolved: &ResolvedPath) -> String {
        if resolved.path.starts_with("http://") || resolved.path.starts_with("https://") {
            return resolved.path.clone();
        }
        if let Some(rest) = resolved.path.strip_prefix("//") {
            return format!("https://{}", rest);
        }
        format!("{}{}", self.api.base_url.trim_end_matches('/'), resolved.path)
    }

    /// Send one request and classify the answer. Only network-level failures
    /// surface as `Err`.
    async fn dispatch(
        &self,
        method: Method,
        resolved: &ResolvedPath,
        body: Option<&Value>,
        bearer: Option<&str>,
    ) -> Result<Outcome, AccessError> {
        let url = self.url_for(resolved);
        let request_id = new_request_id();

        let mut request = self.client.traced(method.clone(), &url, &request_id);
        if let Some(token) = bearer {
            request = request.bearer_auth(token);
        }
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request.send().await.map_err(|e| {
            tracing::error!(%method, %url, request_id = %request_id, error = %e, "Request failed to reach the backend");
            AccessError::from(e)
        })?;

        let status = response.status().as_u16();
        let bytes = response.bytes().await.map_err(|e| {
            tracing::error!(%method, %url, request_id = %request_id, error = %e, "Failed to read response body");
            AccessError::from(e)
        })?;

        tracing::debug!(%method, %url, request_id = %request_id, status, "Backend responded");
        Ok(classify(status, ResponseBody::parse(&bytes), resolved.kind))
    }

    /// Bearer token for a credentialed request, refreshing first when the
    /// stored session is known to have expired.
    async fn bearer_for(&self) -> Result<Option<String>, AccessError> {
        let Some(session) = self.store.get().await else {
            return Ok(None);
        };
        if !session.has_token() {
            return Ok(None);
        }
        if !session.is_expired(now_epoch_ms()) {
            return Ok(Some(session.token));
        }

        if session.can_refresh() {
            let refreshed = self.refresh(&session.token).await?;
            return Ok(Some(refreshed.token));
        }

        tracing::info!("Stored session has expired");
        self.expire_session().await;
        Err(AccessError::auth(RawResponse::new(401, None)))
    }

    /// Issue a request and apply central failure handling.
    pub async fn request(
        &self,
        method: Method,
        path: &str,
        body: Option<&Value>,
        options: RequestOptions,
    ) -> Result<Value, AccessError> {
        let resolved = resolve_path(path, options.bypass);

        let bearer = if needs_credentials(&resolved, &self.api.endpoints) {
            match self.bearer_for().await {
                Ok(bearer) => bearer,
                Err(err @ AccessError::Transport(_)) => return Err(self.unreachable(err, options)),
                Err(err) => return Err(err),
            }
        } else {
            None
        };

        match self.dispatch(method, &resolved, body, bearer.as_deref()).await {
            Ok(outcome) => self.settle(outcome, options).await,
            Err(err) => Err(self.unreachable(err, options)),
        }
    }

    /// The backend could not be reached at all.
    fn unreachable(&self, err: AccessError, options: RequestOptions) -> AccessError {
        self.navigator.navigate(Destination::ServerError);
        if options.notify {
            self.notifier.notify(NoticeLevel::Error, &self.messages.fallback_error);
        }
        err
    }

    /// Route a classified outcome to its one handler.
    async fn settle(&self, outcome: Outcome, options: RequestOptions) -> Result<Value, AccessError> {
        match outcome {
            Outcome::Success(payload) => Ok(payload),
            Outcome::AuthFailure(response) => {
                self.expire_session().await;
                Err(AccessError::auth(response))
            }
            Outcome::Forbidden(response) => {
                tracing::info!(status = response.status, "Access denied by backend");
                self.navigator.navigate(Destination::Forbidden);
                Err(AccessError::Forbidden(
                    response
                        .message()
                        .unwrap_or_else(|| self.messages.fallback_error.clone()),
                ))
            }
            Outcome::NotFound(response) => {
                self.navigator.navigate(Destination::NotFound);
                Err(AccessError::NotFound(Box::new(response)))
            }
            Outcome::ServerError(response) => {
                tracing::error!(response = %response, "Backend server error");
                self.navigator.navigate(Destination::ServerError);
                Err(AccessError::Server(Box::new(response)))
            }
            Outcome::BusinessFailure { message, response } => {
                let message = message.unwrap_or_else(|| self.messages.fallback_error.clone());
                tracing::warn!(status = response.status, reason = %message, "Backend rejected request");
                if options.notify {
                    self.notifier.notify(NoticeLevel::Error, &message);
                }
                Err(AccessError::business(message, Some(response)))
            }
        }
    }

    /// Clear every trace of the session and send the user to log in again.
    pub async fn expire_session(&self) {
        let login_url = self
            .store
            .clear()
            .await
            .map(|session| session.login_url)
            .unwrap_or_default();
        self.identity.clear().await;

        tracing::warn!("Session is no longer valid, returning to login");
        self.navigator.navigate(Destination::Login(login_url));
    }

    pub async fn login(&self, username: &str, password: &Secret<String>) -> Result<Session, AccessError> {
        let resolved = resolve_path(&self.api.endpoints.login, false);
        let body = json!({
            "username": username,
            "password": password.expose_secret(),
        });

        let requested_at = now_epoch_ms();
        let outcome = match self.dispatch(Method::POST, &resolved, Some(&body), None).await {
            Ok(outcome) => outcome,
            Err(err) => {
                self.notifier.notify(NoticeLevel::Error, &self.messages.fallback_error);
                return Err(err);
            }
        };

        let payload = match outcome {
            Outcome::Success(payload) => payload,
            Outcome::AuthFailure(response)
            | Outcome::Forbidden(response)
            | Outcome::NotFound(response)
            | Outcome::ServerError(response)
            | Outcome::BusinessFailure { response, .. } => {
                let message = response
                    .message()
                    .unwrap_or_else(|| self.messages.fallback_error.clone());
                tracing::warn!(username, status = response.status, "Login rejected");
                self.notifier.notify(NoticeLevel::Error, &message);
                return Err(AccessError::business(message, Some(response)));
            }
        };

        let grant: TokenGrant = self.decode(payload)?;
        let session = grant.into_session(requested_at, &self.routes.login);

        // A new login replaces whatever identity was loaded before.
        self.identity.clear().await;
        self.store.set(session.clone()).await;
        tracing::info!(username, expires_at = ?session.expires_at_epoch_ms, "Logged in");
        Ok(session)
    }

    /// Exchange the refresh token for a new session. Concurrent callers
    /// share one exchange: whoever arrives second finds the token already
    /// replaced and reuses it.
    pub async fn refresh(&self, stale_token: &str) -> Result<Session, AccessError> {
        let _guard = self.refresh_lock.lock().await;

        let current = self.store.get().await;
        let session = match current {
            Some(session) if session.token != stale_token && session.is_usable(now_epoch_ms()) => {
                tracing::debug!("Session already refreshed by a concurrent request");
                return Ok(session);
            }
            Some(session) if session.can_refresh() => session,
            _ => {
                self.expire_session().await;
                return Err(AccessError::auth(RawResponse::new(401, None)));
            }
        };

        let resolved = resolve_path(&self.api.endpoints.refresh, false);
        let body = json!({ "refresh_token": session.refresh_token });
        let requested_at = now_epoch_ms();

        let grant = match self.dispatch(Method::POST, &resolved, Some(&body), None).await? {
            Outcome::Success(payload) => serde_json::from_value::<TokenGrant>(payload).ok(),
            other => {
                tracing::warn!(outcome = ?other, "Token refresh rejected");
                None
            }
        };

        let Some(grant) = grant else {
            self.expire_session().await;
            return Err(AccessError::auth(RawResponse::new(401, None)));
        };

        let mut refreshed = grant.into_session(requested_at, &session.login_url);
        if refreshed.refresh_token.is_none() {
            refreshed.refresh_token = session.refresh_token;
        }
        self.store.set(refreshed.clone()).await;
        tracing::info!("Session refreshed");
        Ok(refreshed)
    }

    /// Revoke the session on the backend (best effort) and clear it locally.
    pub async fn logout(&self) {
        let session = self.store.get().await;

        if let Some(token) = session.as_ref().filter(|s| s.has_token()).map(|s| s.token.as_str()) {
            let resolved = resolve_path(&self.api.endpoints.logout, false);
            match self.dispatch(Method::POST, &resolved, None, Some(token)).await {
                Ok(Outcome::Success(_)) => tracing::debug!("Session revoked on backend"),
                Ok(other) => tracing::warn!(outcome = ?other, "Backend logout failed"),
                Err(e) => tracing::warn!(error = %e, "Backend logout failed"),
            }
        }

        let login_url = self
            .store
            .clear()
            .await
            .map(|session| session.login_url)
            .unwrap_or_default();
        self.identity.clear().await;

        tracing::info!("Logged out");
        self.navigator.navigate(Destination::Login(login_url));
    }

    fn decode<T: DeserializeOwned>(&self, payload: Value) -> Result<T, AccessError> {
        serde_json::from_value(payload).map_err(|e| {
            tracing::error!(error = %e, "Malformed payload");
            self.notifier.notify(NoticeLevel::Error, &self.messages.fallback_error);
            AccessError::Transport(format!("malformed payload: {}", e))
        })
    }

    pub async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, AccessError> {
        self.get_json_with(path, RequestOptions::default()).await
    }

    pub async fn get_json_with<T: DeserializeOwned>(
        &self,
        path: &str,
        options: RequestOptions,
    ) -> Result<T, AccessError> {
        let payload = self.request(Method::GET, path, None, options).await?;
        self.decode(payload)
    }

    pub async fn post_json<B: Serialize, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, AccessError> {
        let body = serde_json::to_value(body)
            .map_err(|e| AccessError::Transport(format!("unserializable request body: {}", e)))?;
        let payload = self
            .request(Method::POST, path, Some(&body), RequestOptions::default())
            .await?;
        self.decode(payload)
    }

    pub async fn put_json<B: Serialize, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, AccessError> {
        let body = serde_json::to_value(body)
            .map_err(|e| AccessError::Transport(format!("unserializable request body: {}", e)))?;
        let payload = self
            .request(Method::PUT, path, Some(&body), RequestOptions::default())
            .await?;
        self.decode(payload)
    }

    pub async fn delete(&self, path: &str) -> Result<(), AccessError> {
        self.request(Method::DELETE, path, None, RequestOptions::default())
            .await
            .map(|_| ())
    }
}

impl std::fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiClient")
            .field("base_url", &self.api.base_url)
            .finish_non_exhaustive()
    }
}
