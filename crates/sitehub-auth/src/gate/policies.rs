//! Role-to-permission mapping definitions.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use sitehub_entity::{Action, Module, Role};

/// Outcome of a policy lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Decision {
    /// Always permitted.
    Allow,
    /// Permitted only when the actor owns the record.
    AllowIfOwner,
    /// Never permitted.
    Deny,
}

use Action::{Approve, Create, Delete, Edit, Submit, View};
use Decision::{Allow, AllowIfOwner};

/// The immutable role × module × action table.
///
/// Combinations that are not listed resolve to [`Decision::Deny`], so the
/// lookup is total.
#[derive(Debug, Clone)]
pub struct GatePolicies {
    /// (role, module) → per-action decision.
    policies: HashMap<(Role, Module), HashMap<Action, Decision>>,
}

impl GatePolicies {
    /// Creates the default policy set.
    pub fn new() -> Self {
        let mut table = Self {
            policies: HashMap::new(),
        };

        // Admin and project manager: everything
        for role in [Role::Admin, Role::ProjectManager] {
            for module in Module::ALL {
                table.grant_all(role, module, &Action::ALL, Allow);
            }
        }

        // Site manager: runs the site, cannot approve commercial items
        let sm = Role::SiteManager;
        table.grant_all(sm, Module::Projects, &[View, Edit], Allow);
        table.grant_all(sm, Module::Tasks, &[View, Create, Edit, Delete, Submit], Allow);
        table.grant_all(
            sm,
            Module::QaInspections,
            &[View, Create, Edit, Delete, Submit, Approve],
            Allow,
        );
        table.grant_all(sm, Module::Variations, &[View, Create, Edit, Submit, Action::Send], Allow);
        table.grant_all(sm, Module::PaymentClaims, &[View, Create, Edit, Submit], Allow);
        table.grant_all(sm, Module::PaymentSchedules, &[View], Allow);
        table.grant_all(sm, Module::Subcontractors, &[View, Create, Edit], Allow);
        table.grant_all(sm, Module::Documents, &[View, Create, Edit, Delete], Allow);

        // Supervisor: field work, edits only what they raised
        let sv = Role::Supervisor;
        table.grant_all(sv, Module::Projects, &[View], Allow);
        table.grant_all(sv, Module::Tasks, &[View, Create, Edit, Submit], Allow);
        table.grant_all(sv, Module::QaInspections, &[View, Create, Edit, Submit], Allow);
        table.grant_all(sv, Module::Variations, &[View, Create], Allow);
        table.grant_all(sv, Module::Variations, &[Edit, Submit], AllowIfOwner);
        table.grant_all(sv, Module::PaymentClaims, &[View], Allow);
        table.grant_all(sv, Module::Subcontractors, &[View], Allow);
        table.grant_all(sv, Module::Documents, &[View, Create], Allow);

        // Subcontractor: own claims, own variations, own onboarding record
        let sc = Role::Subcontractor;
        table.grant_all(sc, Module::Projects, &[View], Allow);
        table.grant_all(sc, Module::Tasks, &[View], Allow);
        table.grant_all(sc, Module::Tasks, &[Edit, Submit], AllowIfOwner);
        table.grant_all(sc, Module::QaInspections, &[View], Allow);
        table.grant_all(sc, Module::Variations, &[View, Create], Allow);
        table.grant_all(sc, Module::Variations, &[Edit, Submit], AllowIfOwner);
        table.grant_all(sc, Module::PaymentClaims, &[Create], Allow);
        table.grant_all(sc, Module::PaymentClaims, &[View, Edit, Submit], AllowIfOwner);
        table.grant_all(sc, Module::Subcontractors, &[View, Edit], AllowIfOwner);
        table.grant_all(sc, Module::Documents, &[View, Create], Allow);

        // Client: reads what concerns them
        let cl = Role::Client;
        for module in [
            Module::Projects,
            Module::QaInspections,
            Module::Variations,
            Module::PaymentClaims,
            Module::Documents,
        ] {
            table.grant_all(cl, module, &[View], Allow);
        }

        // Viewer: read-only everywhere
        for module in Module::ALL {
            table.grant_all(Role::Viewer, module, &[View], Allow);
        }

        table
    }

    fn grant_all(&mut self, role: Role, module: Module, actions: &[Action], decision: Decision) {
        let entry = self.policies.entry((role, module)).or_default();
        for action in actions {
            entry.insert(*action, decision);
        }
    }

    /// Returns the decision for a single role.
    ///
    /// [`Role::Developer`] is not in the table; the enforcer short-circuits it.
    pub fn decision(&self, role: Role, module: Module, action: Action) -> Decision {
        self.policies
            .get(&(role, module))
            .and_then(|actions| actions.get(&action))
            .copied()
            .unwrap_or(Decision::Deny)
    }

    /// Actions the role may take on the module without an ownership check.
    pub fn unconditional_actions(&self, role: Role, module: Module) -> Vec<Action> {
        Action::ALL
            .into_iter()
            .filter(|action| self.decision(role, module, *action) == Decision::Allow)
            .collect()
    }
}

impl Default for GatePolicies {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_is_total() {
        let policies = GatePolicies::new();
        for role in Role::ALL {
            for module in Module::ALL {
                for action in Action::ALL {
                    // Never panics; unlisted combinations deny.
                    let _ = policies.decision(role, module, action);
                }
            }
        }
        assert_eq!(
            policies.decision(Role::Developer, Module::Variations, View),
            Decision::Deny
        );
    }

    #[test]
    fn test_owner_scoped_entries() {
        let policies = GatePolicies::new();
        assert_eq!(
            policies.decision(Role::Subcontractor, Module::Variations, Edit),
            AllowIfOwner
        );
        assert_eq!(
            policies.decision(Role::Subcontractor, Module::Variations, Approve),
            Decision::Deny
        );
        assert_eq!(
            policies.decision(Role::ProjectManager, Module::Variations, Approve),
            Allow
        );
    }

    #[test]
    fn test_viewer_only_views() {
        let policies = GatePolicies::new();
        for module in Module::ALL {
            assert_eq!(policies.unconditional_actions(Role::Viewer, module), vec![View]);
        }
    }
}
