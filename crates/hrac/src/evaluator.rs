//! Permission evaluation.
//!
//! [`PermissionEvaluator`] answers the three questions the application asks:
//! - what may this user do in general ([`effective_permissions`])
//! - may this user act on this record ([`can_access`])
//! - which records of this collection may this user act on
//!   ([`filter_by_permission`])
//!
//! Both row-level questions go through one [`AccessPlan`], so a record is in
//! the filtered collection exactly when `can_access` allows it.
//!
//! Nothing is cached: every call reads the current roles, assignments and
//! rules from the store.
//!
//! [`effective_permissions`]: PermissionEvaluator::effective_permissions
//! [`can_access`]: PermissionEvaluator::can_access
//! [`filter_by_permission`]: PermissionEvaluator::filter_by_permission

use std::collections::BTreeSet;
use std::fmt::{self, Display};
use std::sync::Arc;

use hrac_abac::{AttributeRule, Predicate, Record, UserAttributes, rule_predicate};
use hrac_config::EvaluationConfig;
use hrac_rbac::{EffectivePermissions, Role};
use hrac_store::{AccessStore, StoreResult};
use hrac_types::{Action, EntityType, RoleId, RuleId, UserId};
use tracing::{debug, error, info, warn};

use crate::filter::Collection;

// ============================================================================
// Decision
// ============================================================================

/// Why a row-level check came out the way it did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecisionBasis {
    /// Superuser bypass is enabled and the user is a superuser.
    Superuser,
    /// An active role holds the named blanket capability.
    Blanket(String),
    /// The identified attribute rule matched.
    Rule(RuleId),
    /// Rules exist for the entity and action, but none matched.
    NoMatchingRule,
    /// No rule and no blanket capability applies.
    NoGrant,
    /// The store could not be read.
    Unavailable,
}

/// The result of a single-record access check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Decision {
    pub allowed: bool,
    pub basis: DecisionBasis,
}

impl Decision {
    fn allow(basis: DecisionBasis) -> Self {
        Self {
            allowed: true,
            basis,
        }
    }

    fn deny(basis: DecisionBasis) -> Self {
        Self {
            allowed: false,
            basis,
        }
    }
}

impl Display for Decision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let verdict = if self.allowed { "allowed" } else { "denied" };
        match &self.basis {
            DecisionBasis::Superuser => write!(f, "{verdict}: superuser"),
            DecisionBasis::Blanket(name) => write!(f, "{verdict}: blanket capability {name}"),
            DecisionBasis::Rule(id) => write!(f, "{verdict}: attribute rule {id} matched"),
            DecisionBasis::NoMatchingRule => write!(f, "{verdict}: no attribute rule matched"),
            DecisionBasis::NoGrant => write!(f, "{verdict}: no rule or capability grants access"),
            DecisionBasis::Unavailable => write!(f, "{verdict}: permission data unavailable"),
        }
    }
}

// ============================================================================
// Access Plan
// ============================================================================

/// How a user's access to one entity type and action is decided.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccessPlan {
    /// Every record is accessible.
    Unrestricted(DecisionBasis),
    /// Records matching any of the resolved rules are accessible.
    Restricted(Vec<(RuleId, Predicate)>),
    /// No record is accessible.
    Denied,
}

impl AccessPlan {
    /// The OR of every rule predicate. `None` when unrestricted.
    pub fn predicate(&self) -> Option<Predicate> {
        match self {
            AccessPlan::Unrestricted(_) => None,
            AccessPlan::Restricted(rules) => {
                Some(Predicate::any(rules.iter().map(|(_, p)| p.clone())))
            }
            AccessPlan::Denied => Some(Predicate::Never),
        }
    }

    /// Decides access to one record.
    pub fn decide<R: Record + ?Sized>(&self, record: &R) -> Decision {
        match self {
            AccessPlan::Unrestricted(basis) => Decision::allow(basis.clone()),
            AccessPlan::Restricted(rules) => rules
                .iter()
                .find(|(_, predicate)| predicate.matches(record))
                .map_or_else(
                    || Decision::deny(DecisionBasis::NoMatchingRule),
                    |(id, _)| Decision::allow(DecisionBasis::Rule(*id)),
                ),
            AccessPlan::Denied => Decision::deny(DecisionBasis::NoGrant),
        }
    }
}

// ============================================================================
// Evaluator
// ============================================================================

/// Read-only permission evaluator over an [`AccessStore`].
pub struct PermissionEvaluator {
    store: Arc<dyn AccessStore>,

    /// Whether to log access decisions.
    audit_enabled: bool,

    /// Whether superusers bypass row-level checks.
    superuser_bypass: bool,
}

impl PermissionEvaluator {
    /// Creates an evaluator with auditing on and no superuser bypass.
    pub fn new(store: Arc<dyn AccessStore>) -> Self {
        Self {
            store,
            audit_enabled: true,
            superuser_bypass: false,
        }
    }

    pub fn with_config(store: Arc<dyn AccessStore>, config: &EvaluationConfig) -> Self {
        Self {
            store,
            audit_enabled: config.audit_decisions,
            superuser_bypass: config.superuser_bypass,
        }
    }

    /// Disables audit logging (for testing).
    pub fn without_audit(mut self) -> Self {
        self.audit_enabled = false;
        self
    }

    pub fn with_superuser_bypass(mut self, enabled: bool) -> Self {
        self.superuser_bypass = enabled;
        self
    }

    pub fn store(&self) -> &Arc<dyn AccessStore> {
        &self.store
    }

    /// Roles of the user's active assignments, each listed once.
    pub fn active_roles_for(&self, user: UserId) -> StoreResult<Vec<Role>> {
        let mut seen = BTreeSet::new();
        let mut roles = Vec::new();

        for assignment in self.store.active_assignments_for(user)? {
            if !seen.insert(assignment.role) {
                continue;
            }
            match self.store.role(assignment.role)? {
                Some(role) => roles.push(role),
                None => warn!(
                    assignment = %assignment.id,
                    role = %assignment.role,
                    "Active assignment references a missing role"
                ),
            }
        }

        Ok(roles)
    }

    // ------------------------------------------------------------------------
    // Capability aggregation
    // ------------------------------------------------------------------------

    /// Aggregates capabilities and scope ids across active assignments.
    pub fn try_effective_permissions(
        &self,
        user: &UserAttributes,
    ) -> StoreResult<EffectivePermissions> {
        let mut permissions = EffectivePermissions::new();

        for assignment in self.store.active_assignments_for(user.id)? {
            let Some(role) = self.store.role(assignment.role)? else {
                continue;
            };
            permissions.merge_capabilities(&role.capabilities);
            if let (Some(key), Some(scope)) = (assignment.scope_key(&role.name), assignment.scope)
            {
                permissions.add_scope(key, scope.id);
            }
        }

        debug!(
            user = %user.id,
            capabilities = permissions.capabilities().len(),
            scopes = permissions.scopes().len(),
            "Computed effective permissions"
        );
        Ok(permissions)
    }

    /// Like [`try_effective_permissions`](Self::try_effective_permissions),
    /// but a store failure yields no permissions.
    pub fn effective_permissions(&self, user: &UserAttributes) -> EffectivePermissions {
        self.try_effective_permissions(user).unwrap_or_else(|e| {
            error!(user = %user.id, error = %e, "Failed to compute effective permissions");
            EffectivePermissions::new()
        })
    }

    // ------------------------------------------------------------------------
    // Row-level checks
    // ------------------------------------------------------------------------

    /// Works out how `user`'s access to `action` on `entity` is decided.
    ///
    /// In order: superuser bypass (if enabled), a blanket capability on any
    /// active role, the role's attribute rules, and otherwise denial.
    pub fn access_plan(
        &self,
        user: &UserAttributes,
        entity: &EntityType,
        action: Action,
    ) -> StoreResult<AccessPlan> {
        if self.superuser_bypass && user.is_superuser {
            return Ok(AccessPlan::Unrestricted(DecisionBasis::Superuser));
        }

        let roles = self.active_roles_for(user.id)?;
        let capability = entity.blanket_capability_name(action);
        if roles.iter().any(|r| r.has_blanket_capability(&capability)) {
            return Ok(AccessPlan::Unrestricted(DecisionBasis::Blanket(capability)));
        }

        let role_ids: BTreeSet<RoleId> = roles.iter().map(|r| r.id).collect();
        let rules = self.store.rules_for(&role_ids, entity, action)?;
        if rules.is_empty() {
            return Ok(AccessPlan::Denied);
        }

        Ok(AccessPlan::Restricted(resolve_rules(&rules, user)))
    }

    /// Decides access to one record, reporting why.
    pub fn decide<R: Record + ?Sized>(
        &self,
        user: &UserAttributes,
        record: &R,
        action: Action,
    ) -> Decision {
        let entity = record.entity_type();
        let decision = match self.access_plan(user, &entity, action) {
            Ok(plan) => plan.decide(record),
            Err(e) => {
                error!(user = %user.id, error = %e, "Failed to evaluate access");
                Decision::deny(DecisionBasis::Unavailable)
            }
        };

        if self.audit_enabled {
            if decision.allowed {
                info!(
                    user = %user.id,
                    entity = %entity,
                    record = %record.id(),
                    action = %action,
                    decision = %decision,
                    "Access granted"
                );
            } else {
                warn!(
                    user = %user.id,
                    entity = %entity,
                    record = %record.id(),
                    action = %action,
                    decision = %decision,
                    "Access denied"
                );
            }
        }

        decision
    }

    /// Whether `user` may perform `action` on `record`.
    pub fn can_access<R: Record + ?Sized>(
        &self,
        user: &UserAttributes,
        record: &R,
        action: Action,
    ) -> bool {
        self.decide(user, record, action).allowed
    }

    /// Narrows `collection` to the records `user` may perform `action` on.
    pub fn filter_by_permission<C: Collection>(
        &self,
        user: &UserAttributes,
        collection: C,
        action: Action,
    ) -> C {
        let entity = collection.entity_type().clone();
        let plan = match self.access_plan(user, &entity, action) {
            Ok(plan) => plan,
            Err(e) => {
                error!(user = %user.id, error = %e, "Failed to evaluate access; returning nothing");
                return collection.none();
            }
        };

        if self.audit_enabled {
            info!(
                user = %user.id,
                entity = %entity,
                action = %action,
                plan = plan_label(&plan),
                "Filtering collection by permission"
            );
        }

        match plan.predicate() {
            None => collection,
            Some(predicate) if predicate.is_never() => collection.none(),
            Some(predicate) => collection.filter(&predicate),
        }
    }
}

fn resolve_rules(rules: &[AttributeRule], user: &UserAttributes) -> Vec<(RuleId, Predicate)> {
    rules
        .iter()
        .map(|rule| (rule.id, rule_predicate(rule, user)))
        .collect()
}

fn plan_label(plan: &AccessPlan) -> &'static str {
    match plan {
        AccessPlan::Unrestricted(_) => "unrestricted",
        AccessPlan::Restricted(_) => "restricted",
        AccessPlan::Denied => "denied",
    }
}
