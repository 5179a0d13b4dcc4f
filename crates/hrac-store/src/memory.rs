//! In-memory store.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::path::Path;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::{DateTime, Utc};
use hrac_abac::AttributeRule;
use hrac_rbac::{AssignmentKey, Role, UserRoleAssignment};
use hrac_types::{AssignmentId, RoleId, RuleId, UserId};
use tracing::debug;

use crate::error::{StoreError, StoreResult};
use crate::snapshot::{GroupState, Snapshot};
use crate::{AccessStore, GroupDirectory, RoleDeletion};

#[derive(Debug, Default)]
struct State {
    roles: BTreeMap<RoleId, Role>,
    role_names: HashMap<String, RoleId>,
    assignments: BTreeMap<AssignmentId, UserRoleAssignment>,
    assignment_keys: HashMap<AssignmentKey, AssignmentId>,
    next_assignment_id: u64,
    rules: BTreeMap<RuleId, AttributeRule>,
    groups: BTreeMap<String, GroupState>,
    permissions: BTreeSet<String>,
}

impl State {
    fn from_snapshot(snapshot: Snapshot) -> StoreResult<Self> {
        let mut state = State::default();

        for role in snapshot.roles {
            state.put_role(role)?;
        }
        for assignment in snapshot.assignments {
            let key = assignment.key();
            if !state.roles.contains_key(&key.role) {
                return Err(StoreError::RoleNotFound(key.role));
            }
            if state.assignment_keys.insert(key, assignment.id).is_some() {
                return Err(unique_assignment(&key));
            }
            state.next_assignment_id = state.next_assignment_id.max(assignment.id.as_u64());
            state.assignments.insert(assignment.id, assignment);
        }
        for rule in snapshot.rules {
            state.insert_rule(rule)?;
        }
        for group in snapshot.groups {
            state.groups.insert(group.name.clone(), group);
        }
        state.permissions = snapshot.permissions;

        Ok(state)
    }

    fn to_snapshot(&self) -> Snapshot {
        Snapshot {
            roles: self.roles.values().cloned().collect(),
            assignments: self.assignments.values().cloned().collect(),
            rules: self.rules.values().cloned().collect(),
            groups: self.groups.values().cloned().collect(),
            permissions: self.permissions.clone(),
        }
    }

    fn put_role(&mut self, role: Role) -> StoreResult<()> {
        if let Some(&owner) = self.role_names.get(&role.name) {
            if owner != role.id {
                return Err(StoreError::UniqueViolation {
                    constraint: "role_name",
                    key: role.name,
                });
            }
        }
        if let Some(previous) = self.roles.get(&role.id) {
            self.role_names.remove(&previous.name);
        }
        self.role_names.insert(role.name.clone(), role.id);
        self.roles.insert(role.id, role);
        Ok(())
    }

    fn insert_rule(&mut self, rule: AttributeRule) -> StoreResult<()> {
        if !self.roles.contains_key(&rule.role) {
            return Err(StoreError::RoleNotFound(rule.role));
        }
        if self.rules.contains_key(&rule.id) {
            return Err(StoreError::UniqueViolation {
                constraint: "rule_id",
                key: rule.id.to_string(),
            });
        }
        self.rules.insert(rule.id, rule);
        Ok(())
    }

    fn group_mut(&mut self, name: &str) -> &mut GroupState {
        self.groups
            .entry(name.to_string())
            .or_insert_with(|| GroupState {
                name: name.to_string(),
                ..GroupState::default()
            })
    }
}

fn unique_assignment(key: &AssignmentKey) -> StoreError {
    let scope = key
        .scope
        .map_or_else(|| "unscoped".to_string(), |s| s.to_string());
    StoreError::UniqueViolation {
        constraint: "user_role_scope",
        key: format!("user {} role {} ({scope})", key.user, key.role),
    }
}

/// A thread-safe in-memory [`AccessStore`] and [`GroupDirectory`].
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: RwLock<State>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a store from a snapshot, re-checking every constraint.
    pub fn from_snapshot(snapshot: Snapshot) -> StoreResult<Self> {
        Ok(Self {
            state: RwLock::new(State::from_snapshot(snapshot)?),
        })
    }

    pub fn snapshot(&self) -> StoreResult<Snapshot> {
        Ok(self.read()?.to_snapshot())
    }

    /// Loads a store from a JSON snapshot file.
    pub fn load(path: &Path) -> StoreResult<Self> {
        let store = Self::from_snapshot(Snapshot::read(path)?)?;
        debug!(path = %path.display(), "Loaded store snapshot");
        Ok(store)
    }

    /// Saves the store as a JSON snapshot file.
    pub fn save(&self, path: &Path) -> StoreResult<()> {
        self.snapshot()?.write(path)?;
        debug!(path = %path.display(), "Saved store snapshot");
        Ok(())
    }

    fn read(&self) -> StoreResult<RwLockReadGuard<'_, State>> {
        self.state.read().map_err(|_| StoreError::LockPoisoned)
    }

    fn write(&self) -> StoreResult<RwLockWriteGuard<'_, State>> {
        self.state.write().map_err(|_| StoreError::LockPoisoned)
    }
}

impl AccessStore for MemoryStore {
    fn role(&self, id: RoleId) -> StoreResult<Option<Role>> {
        Ok(self.read()?.roles.get(&id).cloned())
    }

    fn role_by_name(&self, name: &str) -> StoreResult<Option<Role>> {
        let state = self.read()?;
        Ok(state
            .role_names
            .get(name)
            .and_then(|id| state.roles.get(id))
            .cloned())
    }

    fn roles(&self) -> StoreResult<Vec<Role>> {
        Ok(self.read()?.roles.values().cloned().collect())
    }

    fn put_role(&self, role: Role) -> StoreResult<()> {
        self.write()?.put_role(role)
    }

    fn delete_role(&self, id: RoleId) -> StoreResult<RoleDeletion> {
        let mut state = self.write()?;
        let role = state.roles.remove(&id).ok_or(StoreError::RoleNotFound(id))?;
        state.role_names.remove(&role.name);

        let rule_ids: Vec<RuleId> = state
            .rules
            .values()
            .filter(|r| r.role == id)
            .map(|r| r.id)
            .collect();
        let rules = rule_ids
            .iter()
            .filter_map(|rule_id| state.rules.remove(rule_id))
            .collect();

        let assignment_ids: Vec<AssignmentId> = state
            .assignments
            .values()
            .filter(|a| a.role == id)
            .map(|a| a.id)
            .collect();
        let mut assignments = Vec::with_capacity(assignment_ids.len());
        for assignment_id in assignment_ids {
            if let Some(assignment) = state.assignments.remove(&assignment_id) {
                state.assignment_keys.remove(&assignment.key());
                assignments.push(assignment);
            }
        }

        Ok(RoleDeletion {
            role,
            rules,
            assignments,
        })
    }

    fn insert_assignment(
        &self,
        key: AssignmentKey,
        assigned_by: Option<UserId>,
        assigned_at: DateTime<Utc>,
    ) -> StoreResult<UserRoleAssignment> {
        let mut state = self.write()?;
        if !state.roles.contains_key(&key.role) {
            return Err(StoreError::RoleNotFound(key.role));
        }
        if state.assignment_keys.contains_key(&key) {
            return Err(unique_assignment(&key));
        }

        state.next_assignment_id += 1;
        let id = AssignmentId::new(state.next_assignment_id);
        let assignment = UserRoleAssignment::new(id, key, assigned_by, assigned_at);
        state.assignment_keys.insert(key, id);
        state.assignments.insert(id, assignment.clone());
        Ok(assignment)
    }

    fn update_assignment(&self, assignment: &UserRoleAssignment) -> StoreResult<()> {
        let mut state = self.write()?;
        let stored = state
            .assignments
            .get_mut(&assignment.id)
            .ok_or(StoreError::AssignmentNotFound(assignment.id))?;
        let key = stored.key();
        *stored = UserRoleAssignment {
            user: key.user,
            role: key.role,
            scope: key.scope,
            ..assignment.clone()
        };
        Ok(())
    }

    fn assignment(&self, id: AssignmentId) -> StoreResult<Option<UserRoleAssignment>> {
        Ok(self.read()?.assignments.get(&id).cloned())
    }

    fn assignment_by_key(&self, key: &AssignmentKey) -> StoreResult<Option<UserRoleAssignment>> {
        let state = self.read()?;
        Ok(state
            .assignment_keys
            .get(key)
            .and_then(|id| state.assignments.get(id))
            .cloned())
    }

    fn assignments_for(&self, user: UserId) -> StoreResult<Vec<UserRoleAssignment>> {
        Ok(self
            .read()?
            .assignments
            .values()
            .filter(|a| a.user == user)
            .cloned()
            .collect())
    }

    fn active_holders_of(&self, role: RoleId) -> StoreResult<Vec<UserRoleAssignment>> {
        Ok(self
            .read()?
            .assignments
            .values()
            .filter(|a| a.role == role && a.is_active)
            .cloned()
            .collect())
    }

    fn insert_rule(&self, rule: AttributeRule) -> StoreResult<()> {
        self.write()?.insert_rule(rule)
    }

    fn delete_rule(&self, id: RuleId) -> StoreResult<AttributeRule> {
        self.write()?
            .rules
            .remove(&id)
            .ok_or(StoreError::RuleNotFound(id))
    }

    fn rules(&self) -> StoreResult<Vec<AttributeRule>> {
        Ok(self.read()?.rules.values().cloned().collect())
    }
}

impl GroupDirectory for MemoryStore {
    fn permission_exists(&self, code: &str) -> StoreResult<bool> {
        Ok(self.read()?.permissions.contains(code))
    }

    fn register_permission(&self, code: &str) -> StoreResult<()> {
        self.write()?.permissions.insert(code.to_string());
        Ok(())
    }

    fn set_group_permissions(&self, group: &str, codes: BTreeSet<String>) -> StoreResult<()> {
        self.write()?.group_mut(group).permissions = codes;
        Ok(())
    }

    fn group_permissions(&self, group: &str) -> StoreResult<BTreeSet<String>> {
        Ok(self
            .read()?
            .groups
            .get(group)
            .map(|g| g.permissions.clone())
            .unwrap_or_default())
    }

    fn add_member(&self, group: &str, user: UserId) -> StoreResult<bool> {
        Ok(self.write()?.group_mut(group).members.insert(user))
    }

    fn remove_member(&self, group: &str, user: UserId) -> StoreResult<bool> {
        Ok(self
            .write()?
            .groups
            .get_mut(group)
            .is_some_and(|g| g.members.remove(&user)))
    }

    fn groups_of(&self, user: UserId) -> StoreResult<BTreeSet<String>> {
        Ok(self
            .read()?
            .groups
            .values()
            .filter(|g| g.members.contains(&user))
            .map(|g| g.name.clone())
            .collect())
    }
}
