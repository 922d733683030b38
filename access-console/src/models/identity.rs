use super::role::{Permission, RoleLevel};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeSet;

fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Id {
        Text(String),
        Number(i64),
    }

    Ok(match Id::deserialize(deserializer)? {
        Id::Text(s) => s,
        Id::Number(n) => n.to_string(),
    })
}

/// Profile returned by the identity endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct IdentityRecord {
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,
    pub username: String,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub avatar_url: Option<String>,
    pub org_code: String,
    pub role_code: String,
    pub role_level: RoleLevel,
}

/// The authenticated principal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Identity {
    pub id: String,
    pub display_name: String,
    pub avatar_url: Option<String>,
    pub home_org_code: String,
    pub role_code: String,
    pub role_level: RoleLevel,
    pub permission_codes: BTreeSet<String>,
}

impl Identity {
    pub fn from_record(record: IdentityRecord, permission_codes: BTreeSet<String>) -> Self {
        let display_name = record
            .display_name
            .filter(|name| !name.trim().is_empty())
            .unwrap_or(record.username);

        Self {
            id: record.id,
            display_name,
            avatar_url: record.avatar_url,
            home_org_code: record.org_code,
            role_code: record.role_code,
            role_level: record.role_level,
            permission_codes,
        }
    }

    pub fn has_permission(&self, code: &str) -> bool {
        self.role_level.is_super_admin() || self.permission_codes.contains(code)
    }
}

/// Navigation entry gated by an optional permission code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MenuItem {
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub path: Option<String>,
    #[serde(default)]
    pub icon: Option<String>,
    #[serde(default)]
    pub permission_code: Option<String>,
    #[serde(default)]
    pub children: Vec<MenuItem>,
}

/// Everything the console knows about the signed-in user, materialised
/// once per login.
#[derive(Debug, Clone, Serialize)]
pub struct AuthorizationContext {
    pub identity: Identity,
    pub menus: Vec<MenuItem>,
    pub permissions: Vec<Permission>,
    pub loaded_at: DateTime<Utc>,
}

impl AuthorizationContext {
    /// Menus the identity may see. Parents without a visible child and
    /// without their own path are dropped.
    pub fn visible_menus(&self) -> Vec<MenuItem> {
        fn prune(items: &[MenuItem], identity: &Identity) -> Vec<MenuItem> {
            items
                .iter()
                .filter(|item| match &item.permission_code {
                    Some(code) => identity.has_permission(code),
                    None => true,
                })
                .filter_map(|item| {
                    let children = prune(&item.children, identity);
                    if !item.children.is_empty() && children.is_empty() && item.path.is_none() {
                        return None;
                    }
                    Some(MenuItem {
                        children,
                        ..item.clone()
                    })
                })
                .collect()
        }

        prune(&self.menus, &self.identity)
    }

    pub fn can(&self, method: &str, path: &str) -> bool {
        self.identity.role_level.is_super_admin()
            || self
                .permissions
                .iter()
                .any(|permission| permission.covers(method, path))
    }
}
