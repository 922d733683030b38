pub mod identity;
pub mod organization;
pub mod role;
pub mod session;

pub use identity::{AuthorizationContext, Identity, IdentityRecord, MenuItem};
pub use organization::{ContactInfo, Organization, OrganizationDraft, RecordStatus};
pub use role::{Permission, Role, RoleLevel};
pub use session::{Session, now_epoch_ms};
