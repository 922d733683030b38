use crate::error::{AccessError, RawResponse};
use crate::models::{AuthorizationContext, Identity, IdentityRecord, MenuItem, Permission};
use crate::services::api_client::ApiClient;
use crate::services::navigation::Destination;
use chrono::Utc;
use secrecy::Secret;
use std::collections::BTreeSet;
use std::sync::Arc;

/// Materialises the authorization context on launch or login.
pub struct Bootstrapper {
    client: Arc<ApiClient>,
}

impl Bootstrapper {
    pub fn new(client: Arc<ApiClient>) -> Self {
        Self { client }
    }

    /// Fetch identity, menus and permissions for the current session and
    /// publish the resulting context.
    pub async fn bootstrap(&self) -> Result<Arc<AuthorizationContext>, AccessError> {
        if !self.client.store().has_token().await {
            tracing::info!("No session to bootstrap");
            self.client.navigator().navigate(Destination::Login(String::new()));
            return Err(AccessError::auth(RawResponse::new(401, None)));
        }

        let endpoints = &self.client.settings().endpoints;
        let (record, menus, permissions) = tokio::try_join!(
            self.client.get_json::<IdentityRecord>(&endpoints.identity),
            self.client.get_json::<Vec<MenuItem>>(&endpoints.menus),
            self.client.get_json::<Vec<Permission>>(&endpoints.permissions),
        )?;

        let permission_codes: BTreeSet<String> = permissions
            .iter()
            .filter(|permission| permission.status.is_enabled())
            .map(|permission| permission.code.clone())
            .collect();

        let identity = Identity::from_record(record, permission_codes);
        tracing::info!(
            user_id = %identity.id,
            role = %identity.role_level,
            org_code = %identity.home_org_code,
            permissions = identity.permission_codes.len(),
            menus = menus.len(),
            "Authorization context loaded"
        );

        let context = AuthorizationContext {
            identity,
            menus,
            permissions,
            loaded_at: Utc::now(),
        };
        Ok(self.client.identity().set(context).await)
    }

    pub async fn login(
        &self,
        username: &str,
        password: &Secret<String>,
    ) -> Result<Arc<AuthorizationContext>, AccessError> {
        self.client.login(username, password).await?;
        self.bootstrap().await
    }

    /// Rebuild the context from a persisted session on launch. Returns
    /// `None` when there is no session to restore.
    pub async fn restore(&self) -> Result<Option<Arc<AuthorizationContext>>, AccessError> {
        if !self.client.store().has_token().await {
            return Ok(None);
        }
        if let Some(context) = self.client.identity().get().await {
            return Ok(Some(context));
        }
        self.bootstrap().await.map(Some)
    }
}
