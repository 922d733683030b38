//! Backend-facing organization lookups.
//!
//! A failed lookup never blocks a screen: the directory falls back to the
//! last list it loaded successfully, narrowed to the caller's scope, and
//! reports a warning instead.

use crate::authz::org_hierarchy::{
    HierarchyError, Membership, OrgForest, OrgHierarchy, OrgScope, build_tree, visible_scope,
};
use crate::error::AccessError;
use crate::models::{Identity, Organization, OrganizationDraft};
use crate::services::api_client::{ApiClient, RequestOptions};
use crate::services::navigation::NoticeLevel;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Organizations as seen by one identity.
#[derive(Debug, Clone)]
pub struct OrgListing {
    pub hierarchy: OrgHierarchy,
    pub scope: OrgScope,
    /// Set when the list came from the fallback path.
    pub warning: Option<String>,
}

impl OrgListing {
    pub fn visible(&self) -> Vec<&Organization> {
        self.hierarchy.visible(&self.scope)
    }

    /// Display forest of the visible organizations, rooted at the caller's
    /// home organization for scoped identities.
    pub fn tree(&self, membership: Membership) -> OrgForest {
        let visible: Vec<Organization> = self.visible().into_iter().cloned().collect();
        build_tree(&visible, membership)
    }

    pub fn is_degraded(&self) -> bool {
        self.warning.is_some()
    }
}

/// Parent organizations offered on a create/edit form.
#[derive(Debug, Clone, Default)]
pub struct ParentChoices {
    pub candidates: Vec<Organization>,
    /// Guidance shown to super-admins when nothing can be offered.
    pub hint: Option<String>,
    pub warning: Option<String>,
}

pub struct OrgDirectory {
    client: Arc<ApiClient>,
    last_loaded: RwLock<Vec<Organization>>,
}

impl OrgDirectory {
    pub fn new(client: Arc<ApiClient>) -> Self {
        Self {
            client,
            last_loaded: RwLock::new(Vec::new()),
        }
    }

    fn endpoint(&self) -> &str {
        &self.client.settings().endpoints.organizations
    }

    /// Load the organization list for `identity`. Only an AuthFailure is
    /// propagated; every other failure degrades to the cached list.
    pub async fn load(&self, identity: &Identity) -> Result<OrgListing, AccessError> {
        let scope = visible_scope(identity.role_level, &identity.home_org_code);

        let result = self
            .client
            .get_json_with::<Vec<Organization>>(self.endpoint(), RequestOptions::quiet())
            .await;

        match result {
            Ok(orgs) => {
                tracing::debug!(count = orgs.len(), "Loaded organizations");
                *self.last_loaded.write().await = orgs.clone();
                Ok(OrgListing {
                    hierarchy: OrgHierarchy::new(orgs),
                    scope,
                    warning: None,
                })
            }
            Err(err) if err.is_auth_failure() => Err(err),
            Err(err) => {
                let cached: Vec<Organization> = self
                    .last_loaded
                    .read()
                    .await
                    .iter()
                    .filter(|org| scope.contains(org))
                    .cloned()
                    .collect();

                let warning = self.client.messages().org_lookup_warning.clone();
                tracing::warn!(error = %err, cached = cached.len(), "Organization lookup failed, using cached list");
                self.client.notifier().notify(NoticeLevel::Warning, &warning);

                Ok(OrgListing {
                    hierarchy: OrgHierarchy::new(cached),
                    scope,
                    warning: Some(warning),
                })
            }
        }
    }

    /// Parents that may be chosen for `target` (`None` when creating).
    pub async fn candidate_parents(
        &self,
        identity: &Identity,
        target: Option<&str>,
    ) -> Result<ParentChoices, AccessError> {
        let listing = self.load(identity).await?;

        let scope = if target == Some(identity.home_org_code.as_str()) {
            listing.scope.clone().excluding_home()
        } else {
            listing.scope.clone()
        };

        let candidates: Vec<Organization> = listing
            .hierarchy
            .candidate_parents(&scope, target)
            .into_iter()
            .cloned()
            .collect();

        let hint = if candidates.is_empty() && identity.role_level.is_super_admin() {
            Some(self.client.messages().root_org_hint.clone())
        } else {
            None
        };

        Ok(ParentChoices {
            candidates,
            hint,
            warning: listing.warning,
        })
    }

    /// Validate and create an organization. Invalid drafts never reach the
    /// backend.
    pub async fn create(
        &self,
        identity: &Identity,
        draft: &OrganizationDraft,
    ) -> Result<Organization, AccessError> {
        let listing = self.load(identity).await?;
        listing.hierarchy.validate_draft(&listing.scope, draft, None)?;

        let created: Organization = self.client.post_json(self.endpoint(), draft).await?;
        tracing::info!(org_code = %created.code, "Organization created");
        Ok(created)
    }

    pub async fn update(
        &self,
        identity: &Identity,
        code: &str,
        draft: &OrganizationDraft,
    ) -> Result<Organization, AccessError> {
        let listing = self.load(identity).await?;
        listing
            .hierarchy
            .validate_draft(&listing.scope, draft, Some(code))?;

        let path = format!("{}/{}", self.endpoint(), code);
        let updated: Organization = self.client.put_json(&path, draft).await?;
        tracing::info!(org_code = %code, "Organization updated");
        Ok(updated)
    }

    /// Delete a leaf organization. Nodes with children are refused.
    pub async fn delete(&self, identity: &Identity, code: &str) -> Result<(), AccessError> {
        let listing = self.load(identity).await?;
        if !listing.scope.contains_code(code) {
            return Err(HierarchyError::OutOfScope(code.to_string()).into());
        }
        listing.hierarchy.check_delete(code)?;

        let path = format!("{}/{}", self.endpoint(), code);
        self.client.delete(&path).await?;
        tracing::info!(org_code = %code, "Organization deleted");
        Ok(())
    }

    /// Delete `code` and everything beneath it, deepest first. Stops at the
    /// first failure.
    pub async fn delete_cascade(&self, identity: &Identity, code: &str) -> Result<usize, AccessError> {
        let listing = self.load(identity).await?;
        if !listing.scope.contains_code(code) {
            return Err(HierarchyError::OutOfScope(code.to_string()).into());
        }
        if listing.hierarchy.get(code).is_none() {
            return Err(HierarchyError::UnknownOrganization(code.to_string()).into());
        }

        let order: Vec<String> = listing
            .hierarchy
            .cascade_order(code)
            .into_iter()
            .map(|org| org.code.clone())
            .collect();

        for org_code in &order {
            let path = format!("{}/{}", self.endpoint(), org_code);
            self.client.delete(&path).await?;
        }

        tracing::info!(org_code = %code, deleted = order.len(), "Organization branch deleted");
        Ok(order.len())
    }
}
