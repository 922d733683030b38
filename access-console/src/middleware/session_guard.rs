use crate::services::credential_store::CredentialStore;
use crate::services::navigation::{Destination, Navigator};
use std::sync::Arc;
use tokio::sync::Mutex;

/// Route-activation check for protected areas of the console.
///
/// Only the presence of a token is checked. Expiry is discovered lazily by
/// the first request the backend rejects, and no request is made here.
pub struct SessionGuard {
    store: Arc<CredentialStore>,
    navigator: Arc<dyn Navigator>,
    return_to: Mutex<Option<String>>,
}

impl SessionGuard {
    pub fn new(store: Arc<CredentialStore>, navigator: Arc<dyn Navigator>) -> Self {
        Self {
            store,
            navigator,
            return_to: Mutex::new(None),
        }
    }

    pub async fn can_enter_protected_area(&self) -> bool {
        if self.store.has_token().await {
            return true;
        }

        let login_url = self
            .store
            .get()
            .await
            .map(|session| session.login_url)
            .unwrap_or_default();

        tracing::info!("No session present, redirecting to login");
        self.navigator.navigate(Destination::Login(login_url));
        false
    }

    /// Like [`Self::can_enter_protected_area`], remembering `path` so the
    /// login screen can send the user back once signed in.
    pub async fn can_enter(&self, path: &str) -> bool {
        let allowed = self.can_enter_protected_area().await;
        if !allowed {
            *self.return_to.lock().await = Some(path.to_string());
        }
        allowed
    }

    pub async fn take_return_to(&self) -> Option<String> {
        self.return_to.lock().await.take()
    }
}
