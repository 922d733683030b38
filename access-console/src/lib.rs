pub mod authz;
pub mod config;
pub mod error;
pub mod middleware;
pub mod models;
pub mod services;
pub mod startup;
pub mod utils;

use authz::RoleResolver;
use error::AccessError;
use middleware::SessionGuard;
use models::Role;
use services::{ApiClient, Bootstrapper, CredentialStore, IdentityCell, OrgDirectory};
use std::sync::Arc;

/// Shared handles to the access-control core, cloned into every screen.
#[derive(Clone)]
pub struct AccessConsole {
    pub store: Arc<CredentialStore>,
    pub identity: Arc<IdentityCell>,
    pub client: Arc<ApiClient>,
    pub guard: Arc<SessionGuard>,
    pub bootstrapper: Arc<Bootstrapper>,
    pub organizations: Arc<OrgDirectory>,
}

impl AccessConsole {
    /// Fetch the role list and wrap it for assignment checks.
    pub async fn role_resolver(&self) -> Result<RoleResolver, AccessError> {
        let endpoint = &self.client.settings().endpoints.roles;
        let roles: Vec<Role> = self.client.get_json(endpoint).await?;
        tracing::debug!(count = roles.len(), "Loaded roles");
        Ok(RoleResolver::new(roles))
    }

    pub async fn logout(&self) {
        self.client.logout().await;
    }
}
