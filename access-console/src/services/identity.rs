use crate::models::{AuthorizationContext, Identity};
use std::sync::Arc;
use tokio::sync::RwLock;

/// The materialised authorization context for the signed-in user. Replaced
/// wholesale on each login and emptied on logout or any AuthFailure.
#[derive(Debug, Default)]
pub struct IdentityCell {
    inner: RwLock<Option<Arc<AuthorizationContext>>>,
}

impl IdentityCell {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn get(&self) -> Option<Arc<AuthorizationContext>> {
        self.inner.read().await.clone()
    }

    pub async fn identity(&self) -> Option<Identity> {
        self.inner
            .read()
            .await
            .as_ref()
            .map(|context| context.identity.clone())
    }

    pub async fn set(&self, context: AuthorizationContext) -> Arc<AuthorizationContext> {
        let context = Arc::new(context);
        *self.inner.write().await = Some(Arc::clone(&context));
        context
    }

    pub async fn clear(&self) {
        if self.inner.write().await.take().is_some() {
            tracing::debug!("Cleared authorization context");
        }
    }

    pub async fn is_loaded(&self) -> bool {
        self.inner.read().await.is_some()
    }
}
