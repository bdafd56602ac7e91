//! Permission gate enforcement: checks a user's roles against the policy table.

use tracing::debug;

use sitehub_core::error::AppError;
use sitehub_entity::{Action, Module, Role};

use super::context::AccessContext;
use super::policies::{Decision, GatePolicies};

/// Enforces role × module × action permissions before a mutation.
///
/// Stateless beyond the immutable policy table, so it is cheap to clone
/// into every service that needs it.
#[derive(Debug, Clone)]
pub struct PermissionGate {
    /// The policy configuration.
    policies: GatePolicies,
}

impl PermissionGate {
    /// Creates a new gate with the default policy set.
    pub fn new() -> Self {
        Self {
            policies: GatePolicies::new(),
        }
    }

    /// Creates a gate with custom policies.
    pub fn with_policies(policies: GatePolicies) -> Self {
        Self { policies }
    }

    /// Decision for a single role. Developers are always allowed.
    pub fn decision(&self, role: Role, module: Module, action: Action) -> Decision {
        if role == Role::Developer {
            return Decision::Allow;
        }
        self.policies.decision(role, module, action)
    }

    /// Whether any of `roles` permits `action` on `module`.
    pub fn can(&self, roles: &[Role], module: Module, action: Action, ctx: &AccessContext) -> bool {
        roles
            .iter()
            .any(|role| match self.decision(*role, module, action) {
                Decision::Allow => true,
                Decision::AllowIfOwner => ctx.is_owner(),
                Decision::Deny => false,
            })
    }

    /// Like [`can`](Self::can), but returns a permission error when denied.
    pub fn require(
        &self,
        roles: &[Role],
        module: Module,
        action: Action,
        ctx: &AccessContext,
    ) -> Result<(), AppError> {
        if self.can(roles, module, action, ctx) {
            Ok(())
        } else {
            debug!(?roles, %module, %action, "Permission denied");
            Err(AppError::forbidden(format!(
                "You do not have permission to {action} {module}"
            )))
        }
    }

    /// Whether the roles include the developer bypass.
    pub fn is_developer(&self, roles: &[Role]) -> bool {
        roles.contains(&Role::Developer)
    }

    /// Returns a reference to the underlying policies.
    pub fn policies(&self) -> &GatePolicies {
        &self.policies
    }
}

impl Default for PermissionGate {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sitehub_core::error::{ErrorCode, ErrorKind};
    use sitehub_core::types::UserId;

    #[test]
    fn test_approve_variations() {
        let gate = PermissionGate::new();
        let ctx = AccessContext::none();
        assert!(!gate.can(&[Role::Subcontractor], Module::Variations, Action::Approve, &ctx));
        assert!(gate.can(&[Role::ProjectManager], Module::Variations, Action::Approve, &ctx));
    }

    #[test]
    fn test_developer_bypasses_everything() {
        let gate = PermissionGate::new();
        let ctx = AccessContext::none();
        for module in Module::ALL {
            for action in Action::ALL {
                assert!(gate.can(&[Role::Developer], module, action, &ctx));
            }
        }
        assert!(gate.is_developer(&[Role::Viewer, Role::Developer]));
    }

    #[test]
    fn test_owner_scoped_edit() {
        let gate = PermissionGate::new();
        let me = UserId::new();
        let mine = AccessContext::owned_by(me, Some(me));
        let theirs = AccessContext::owned_by(me, Some(UserId::new()));
        let unknown = AccessContext::owned_by(me, None);

        let roles = [Role::Subcontractor];
        assert!(gate.can(&roles, Module::Variations, Action::Edit, &mine));
        assert!(!gate.can(&roles, Module::Variations, Action::Edit, &theirs));
        assert!(!gate.can(&roles, Module::Variations, Action::Edit, &unknown));
    }

    #[test]
    fn test_any_role_grants() {
        let gate = PermissionGate::new();
        let ctx = AccessContext::none();
        assert!(!gate.can(&[Role::Viewer], Module::Tasks, Action::Create, &ctx));
        assert!(gate.can(&[Role::Viewer, Role::Supervisor], Module::Tasks, Action::Create, &ctx));
        assert!(!gate.can(&[], Module::Tasks, Action::View, &ctx));
    }

    #[test]
    fn test_require_returns_permission_error() {
        let gate = PermissionGate::new();
        let err = gate
            .require(&[Role::Client], Module::Variations, Action::Delete, &AccessContext::none())
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::Authorization);
        assert!(err.has_code(ErrorCode::PermissionDenied));
        assert_eq!(err.message, "You do not have permission to delete variations");
    }
}
