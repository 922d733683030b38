//! Role and permission records.

use super::organization::RecordStatus;
use serde::{Deserialize, Serialize};

/// Privilege tier of a role. Numerically lower is more privileged:
/// `1` super-admin, `2` org-admin, `3` normal user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum RoleLevel {
    SuperAdmin = 1,
    OrgAdmin = 2,
    NormalUser = 3,
}

impl RoleLevel {
    pub const ALL: [RoleLevel; 3] = [RoleLevel::SuperAdmin, RoleLevel::OrgAdmin, RoleLevel::NormalUser];

    pub fn as_u8(self) -> u8 {
        self as u8
    }

    pub fn is_super_admin(self) -> bool {
        matches!(self, RoleLevel::SuperAdmin)
    }

    /// True when `self` grants strictly more privilege than `other`.
    pub fn outranks(self, other: RoleLevel) -> bool {
        self < other
    }

    pub fn label(self) -> &'static str {
        match self {
            RoleLevel::SuperAdmin => "super-admin",
            RoleLevel::OrgAdmin => "org-admin",
            RoleLevel::NormalUser => "normal-user",
        }
    }
}

impl TryFrom<u8> for RoleLevel {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(RoleLevel::SuperAdmin),
            2 => Ok(RoleLevel::OrgAdmin),
            3 => Ok(RoleLevel::NormalUser),
            other => Err(format!("invalid role level {}, expected 1, 2 or 3", other)),
        }
    }
}

impl From<RoleLevel> for u8 {
    fn from(level: RoleLevel) -> Self {
        level.as_u8()
    }
}

impl std::fmt::Display for RoleLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.label(), self.as_u8())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Role {
    #[serde(default)]
    pub id: i64,
    #[serde(rename = "role_code")]
    pub code: String,
    #[serde(rename = "role_name")]
    pub name: String,
    #[serde(rename = "role_level")]
    pub level: RoleLevel,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub status: RecordStatus,
}

impl Role {
    pub fn new(code: impl Into<String>, name: impl Into<String>, level: RoleLevel) -> Self {
        Self {
            id: 0,
            code: code.into(),
            name: name.into(),
            level,
            description: None,
            status: RecordStatus::Enabled,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Permission {
    #[serde(default)]
    pub id: i64,
    #[serde(rename = "permission_code")]
    pub code: String,
    #[serde(rename = "permission_name")]
    pub name: String,
    #[serde(rename = "api_path")]
    pub resource_path: String,
    #[serde(rename = "api_method")]
    pub http_method: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub status: RecordStatus,
}

impl Permission {
    /// Whether this permission covers `method` on `path`. A trailing `*`
    /// in `api_path` matches any suffix.
    pub fn covers(&self, method: &str, path: &str) -> bool {
        if !self.status.is_enabled() {
            return false;
        }

        let method_matches = self.http_method == "*" || self.http_method.eq_ignore_ascii_case(method);
        let path_matches = match self.resource_path.strip_suffix('*') {
            Some(prefix) => path.starts_with(prefix),
            None => self.resource_path == path,
        };

        method_matches && path_matches
    }
}
