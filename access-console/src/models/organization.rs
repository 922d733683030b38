//! Organization records as exchanged with the backend.

use serde::{Deserialize, Deserializer, Serialize};
use validator::Validate;

/// Enabled/disabled flag used by organizations, roles and permissions.
/// Encoded as `1`/`0` on the wire.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum RecordStatus {
    Disabled,
    #[default]
    Enabled,
}

impl RecordStatus {
    pub fn is_enabled(self) -> bool {
        matches!(self, RecordStatus::Enabled)
    }
}

impl TryFrom<u8> for RecordStatus {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(RecordStatus::Disabled),
            1 => Ok(RecordStatus::Enabled),
            other => Err(format!("invalid status {}, expected 0 or 1", other)),
        }
    }
}

impl From<RecordStatus> for u8 {
    fn from(status: RecordStatus) -> Self {
        match status {
            RecordStatus::Disabled => 0,
            RecordStatus::Enabled => 1,
        }
    }
}

/// Treat a missing, null or blank string as absent. The backend sends an
/// empty `parent_org_code` for root organizations.
pub(crate) fn blank_as_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value: Option<String> = Option::deserialize(deserializer)?;
    Ok(value.filter(|s| !s.trim().is_empty()))
}

/// Contact details attached to an organization.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContactInfo {
    #[serde(rename = "contact_person", default)]
    pub person: Option<String>,
    #[serde(rename = "contact_phone", default)]
    pub phone: Option<String>,
    #[serde(rename = "contact_email", default)]
    pub email: Option<String>,
}

/// An organization node. The hierarchy is encoded in `code`: every
/// descendant's code begins with its ancestor's code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Organization {
    #[serde(default)]
    pub id: i64,
    #[serde(rename = "org_code")]
    pub code: String,
    #[serde(rename = "org_name")]
    pub name: String,
    #[serde(
        rename = "parent_org_code",
        default,
        deserialize_with = "blank_as_none",
        skip_serializing_if = "Option::is_none"
    )]
    pub parent_code: Option<String>,
    #[serde(flatten)]
    pub contact: ContactInfo,
    #[serde(default)]
    pub status: RecordStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
}

impl Organization {
    pub fn new(code: impl Into<String>, name: impl Into<String>, parent_code: Option<&str>) -> Self {
        Self {
            id: 0,
            code: code.into(),
            name: name.into(),
            parent_code: parent_code.map(str::to_string),
            contact: ContactInfo::default(),
            status: RecordStatus::Enabled,
            created_at: None,
            updated_at: None,
        }
    }

    pub fn disabled(mut self) -> Self {
        self.status = RecordStatus::Disabled;
        self
    }

    pub fn is_enabled(&self) -> bool {
        self.status.is_enabled()
    }

    pub fn is_root(&self) -> bool {
        self.parent_code.is_none()
    }
}

/// Create/edit submission for an organization, validated before any
/// network call is made.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct OrganizationDraft {
    #[serde(rename = "org_code")]
    #[validate(length(min = 1, max = 64, message = "Organization code is required"))]
    pub code: String,

    #[serde(rename = "org_name")]
    #[validate(length(min = 1, max = 128, message = "Organization name is required"))]
    pub name: String,

    #[serde(rename = "parent_org_code", default, deserialize_with = "blank_as_none")]
    pub parent_code: Option<String>,

    #[serde(default)]
    pub contact_person: Option<String>,

    #[serde(default)]
    #[validate(length(max = 32, message = "Contact phone is too long"))]
    pub contact_phone: Option<String>,

    #[serde(default)]
    #[validate(email(message = "Contact email is not a valid address"))]
    pub contact_email: Option<String>,

    #[serde(default)]
    pub status: RecordStatus,
}

impl OrganizationDraft {
    pub fn new(code: impl Into<String>, name: impl Into<String>, parent_code: Option<&str>) -> Self {
        Self {
            code: code.into(),
            name: name.into(),
            parent_code: parent_code.map(str::to_string),
            contact_person: None,
            contact_phone: None,
            contact_email: None,
            status: RecordStatus::Enabled,
        }
    }
}

impl From<&Organization> for OrganizationDraft {
    fn from(org: &Organization) -> Self {
        Self {
            code: org.code.clone(),
            name: org.name.clone(),
            parent_code: org.parent_code.clone(),
            contact_person: org.contact.person.clone(),
            contact_phone: org.contact.phone.clone(),
            contact_email: org.contact.email.clone(),
            status: org.status,
        }
    }
}
