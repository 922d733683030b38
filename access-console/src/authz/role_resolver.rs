//! What an identity may hand out to others, and the edit-screen lifecycle
//! that enforces it.

use crate::error::AccessError;
use crate::models::{Role, RoleLevel};
use crate::services::navigation::{Destination, Navigator};
use serde::Serialize;
use std::collections::BTreeSet;
use std::future::Future;
use thiserror::Error;

/// Levels a caller at `level` may assign. Normal users assign nothing.
pub fn assignable_role_levels(level: RoleLevel) -> BTreeSet<RoleLevel> {
    match level {
        RoleLevel::SuperAdmin => RoleLevel::ALL.into_iter().collect(),
        RoleLevel::OrgAdmin => RoleLevel::ALL
            .into_iter()
            .filter(|candidate| RoleLevel::SuperAdmin.outranks(*candidate))
            .collect(),
        RoleLevel::NormalUser => BTreeSet::new(),
    }
}

pub fn check_role_assignment(caller: RoleLevel, target: RoleLevel) -> Result<(), AccessError> {
    if assignable_role_levels(caller).contains(&target) {
        Ok(())
    } else {
        Err(AccessError::Forbidden(format!(
            "a {} cannot assign the {} level",
            caller.label(),
            target.label()
        )))
    }
}

/// Resolves role codes against the loaded role list.
#[derive(Debug, Clone, Default)]
pub struct RoleResolver {
    roles: Vec<Role>,
}

impl RoleResolver {
    pub fn new(roles: Vec<Role>) -> Self {
        Self { roles }
    }

    pub fn roles(&self) -> &[Role] {
        &self.roles
    }

    pub fn level_of(&self, role_code: &str) -> Option<RoleLevel> {
        self.roles
            .iter()
            .find(|role| role.code == role_code)
            .map(|role| role.level)
    }

    /// Unknown role codes are treated as the least privileged level.
    fn effective_level(&self, role_code: &str) -> RoleLevel {
        self.level_of(role_code).unwrap_or_else(|| {
            tracing::warn!(role_code, "Unknown role code, treating as normal user");
            RoleLevel::NormalUser
        })
    }

    /// The role list minus super-admin roles, unless the caller is one.
    pub fn assignable_roles(&self, current_role_code: &str) -> Vec<&Role> {
        let caller = self.effective_level(current_role_code);
        self.roles
            .iter()
            .filter(|role| caller.is_super_admin() || !role.level.is_super_admin())
            .collect()
    }

    /// Everyone may view permission definitions; only super-admins change them.
    pub fn permission_management_allowed(&self, current_role_code: &str) -> bool {
        self.effective_level(current_role_code).is_super_admin()
    }

    pub fn role_management_allowed(&self, current_role_code: &str) -> bool {
        !assignable_role_levels(self.effective_level(current_role_code)).is_empty()
    }
}

/// Edit screens gated by the caller's role level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum EditScreen {
    Organization,
    Role,
    User,
    Permission,
}

impl EditScreen {
    pub fn allowed_for(self, level: RoleLevel) -> bool {
        match self {
            EditScreen::Organization | EditScreen::Role | EditScreen::User => {
                !assignable_role_levels(level).is_empty()
            }
            EditScreen::Permission => level.is_super_admin(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum EditState {
    Denied,
    New,
    Validating,
    Submitting,
    Succeeded,
}

#[derive(Debug, Error)]
pub enum FlowError {
    #[error("this screen is not available for your role")]
    Denied,

    #[error("cannot {action} while {from:?}")]
    InvalidTransition { from: EditState, action: &'static str },

    #[error(transparent)]
    Rejected(#[from] AccessError),
}

/// Lifecycle of a create/edit form:
/// `New -> Validating -> Submitting -> Succeeded`, with any failure going
/// back to `Validating`. A denied caller never reaches `New`.
#[derive(Debug)]
pub struct EditFlow {
    screen: EditScreen,
    state: EditState,
    last_error: Option<String>,
}

impl EditFlow {
    /// Open the screen for a caller. Denied callers are redirected to the
    /// Forbidden view immediately.
    pub fn open(screen: EditScreen, caller: RoleLevel, navigator: &dyn Navigator) -> Self {
        let state = if screen.allowed_for(caller) {
            EditState::New
        } else {
            tracing::info!(screen = ?screen, caller = %caller, "Edit screen denied");
            navigator.navigate(Destination::Forbidden);
            EditState::Denied
        };

        Self {
            screen,
            state,
            last_error: None,
        }
    }

    pub fn screen(&self) -> EditScreen {
        self.screen
    }

    pub fn state(&self) -> EditState {
        self.state
    }

    pub fn is_denied(&self) -> bool {
        self.state == EditState::Denied
    }

    /// Message from the most recent failed validation or submission.
    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    fn transition(&mut self, from: &[EditState], to: EditState, action: &'static str) -> Result<(), FlowError> {
        if self.state == EditState::Denied {
            return Err(FlowError::Denied);
        }
        if !from.contains(&self.state) {
            return Err(FlowError::InvalidTransition {
                from: self.state,
                action,
            });
        }
        self.state = to;
        Ok(())
    }

    pub fn begin_validation(&mut self) -> Result<(), FlowError> {
        self.transition(&[EditState::New, EditState::Validating], EditState::Validating, "validate")
    }

    /// Outcome of client-side validation. Success moves on to submission;
    /// failure keeps the form in `Validating`.
    pub fn finish_validation(&mut self, outcome: Result<(), AccessError>) -> Result<(), FlowError> {
        if self.state != EditState::Validating {
            return self.transition(&[EditState::Validating], EditState::Validating, "finish validation");
        }
        match outcome {
            Ok(()) => {
                self.last_error = None;
                self.state = EditState::Submitting;
                Ok(())
            }
            Err(err) => {
                self.last_error = Some(err.to_string());
                Err(FlowError::Rejected(err))
            }
        }
    }

    /// Outcome of the backend call. Success navigates back.
    pub fn finish_submission<T>(
        &mut self,
        outcome: Result<T, AccessError>,
        navigator: &dyn Navigator,
    ) -> Result<T, FlowError> {
        if self.state != EditState::Submitting {
            self.transition(&[EditState::Submitting], EditState::Submitting, "finish submission")?;
        }
        match outcome {
            Ok(value) => {
                self.state = EditState::Succeeded;
                self.last_error = None;
                navigator.navigate(Destination::Back);
                Ok(value)
            }
            Err(err) => {
                self.state = EditState::Validating;
                self.last_error = Some(err.to_string());
                Err(FlowError::Rejected(err))
            }
        }
    }

    /// Drive one full submit attempt: validate, then submit if valid.
    pub async fn submit<T, F, Fut>(
        &mut self,
        validation: Result<(), AccessError>,
        submit: F,
        navigator: &dyn Navigator,
    ) -> Result<T, FlowError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, AccessError>>,
    {
        self.begin_validation()?;
        self.finish_validation(validation)?;
        let outcome = submit().await;
        self.finish_submission(outcome, navigator)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::authz::org_hierarchy::HierarchyError;
    use crate::config::RouteSettings;
    use crate::services::navigation::HistoryNavigator;

    fn roles() -> RoleResolver {
        RoleResolver::new(vec![
            Role::new("SUPER_ADMIN", "Super admin", RoleLevel::SuperAdmin),
            Role::new("ORG_ADMIN", "Organization admin", RoleLevel::OrgAdmin),
            Role::new("USER", "User", RoleLevel::NormalUser),
        ])
    }

    #[test]
    fn test_assignable_role_levels() {
        assert_eq!(assignable_role_levels(RoleLevel::SuperAdmin).len(), 3);
        assert_eq!(
            assignable_role_levels(RoleLevel::OrgAdmin),
            BTreeSet::from([RoleLevel::OrgAdmin, RoleLevel::NormalUser])
        );
        assert!(assignable_role_levels(RoleLevel::NormalUser).is_empty());
    }

    #[test]
    fn test_check_role_assignment() {
        assert!(check_role_assignment(RoleLevel::OrgAdmin, RoleLevel::NormalUser).is_ok());
        assert!(matches!(
            check_role_assignment(RoleLevel::OrgAdmin, RoleLevel::SuperAdmin),
            Err(AccessError::Forbidden(_))
        ));
    }

    #[test]
    fn test_assignable_roles_hides_super_admin() {
        let resolver = roles();
        let codes: Vec<&str> = resolver
            .assignable_roles("ORG_ADMIN")
            .iter()
            .map(|role| role.code.as_str())
            .collect();
        assert_eq!(codes, vec!["ORG_ADMIN", "USER"]);
        assert_eq!(resolver.assignable_roles("SUPER_ADMIN").len(), 3);
    }

    #[test]
    fn test_permission_management_is_super_admin_only() {
        let resolver = roles();
        assert!(resolver.permission_management_allowed("SUPER_ADMIN"));
        assert!(!resolver.permission_management_allowed("ORG_ADMIN"));
        assert!(!resolver.permission_management_allowed("UNKNOWN"));
        assert!(!resolver.role_management_allowed("USER"));
    }

    #[test]
    fn test_denied_flow_redirects_without_form() {
        let navigator = HistoryNavigator::new(RouteSettings::default());
        let mut flow = EditFlow::open(EditScreen::Role, RoleLevel::NormalUser, &navigator);

        assert_eq!(flow.state(), EditState::Denied);
        assert_eq!(navigator.last(), Some(Destination::Forbidden));
        assert!(matches!(flow.begin_validation(), Err(FlowError::Denied)));
    }

    #[test]
    fn test_validation_failure_stays_in_validating() {
        let navigator = HistoryNavigator::new(RouteSettings::default());
        let mut flow = EditFlow::open(EditScreen::Organization, RoleLevel::OrgAdmin, &navigator);

        flow.begin_validation().unwrap();
        let result = flow.finish_validation(Err(AccessError::Hierarchy(HierarchyError::SelfParent(
            "05".to_string(),
        ))));
        assert!(matches!(result, Err(FlowError::Rejected(_))));
        assert_eq!(flow.state(), EditState::Validating);
        assert!(flow.last_error().is_some());
        assert!(navigator.history().is_empty());
    }

    #[tokio::test]
    async fn test_submit_success_navigates_back() {
        let navigator = HistoryNavigator::new(RouteSettings::default());
        let mut flow = EditFlow::open(EditScreen::Permission, RoleLevel::SuperAdmin, &navigator);

        let result = flow.submit(Ok(()), || async { Ok(7) }, &navigator).await;
        assert_eq!(result.unwrap(), 7);
        assert_eq!(flow.state(), EditState::Succeeded);
        assert_eq!(navigator.last(), Some(Destination::Back));
    }

    #[tokio::test]
    async fn test_submit_failure_returns_to_validating() {
        let navigator = HistoryNavigator::new(RouteSettings::default());
        let mut flow = EditFlow::open(EditScreen::User, RoleLevel::OrgAdmin, &navigator);

        let result: Result<(), FlowError> = flow
            .submit(Ok(()), || async { Err(AccessError::business("code taken", None)) }, &navigator)
            .await;
        assert!(result.is_err());
        assert_eq!(flow.state(), EditState::Validating);
        assert_eq!(flow.last_error(), Some("code taken"));

        // A retry is allowed from Validating.
        let retry = flow.submit(Ok(()), || async { Ok(()) }, &navigator).await;
        assert!(retry.is_ok());
    }

    #[test]
    fn test_submission_before_validation_is_invalid() {
        let navigator = HistoryNavigator::new(RouteSettings::default());
        let mut flow = EditFlow::open(EditScreen::Role, RoleLevel::SuperAdmin, &navigator);
        let result = flow.finish_submission(Ok(()), &navigator);
        assert!(matches!(result, Err(FlowError::InvalidTransition { .. })));
    }
}
