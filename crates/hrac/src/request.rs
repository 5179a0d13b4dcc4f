//! Per-request permission context and section gating.

use std::collections::BTreeMap;

use hrac_abac::UserAttributes;
use hrac_config::{ConfigError, SectionRequirement, SectionsConfig};
use hrac_rbac::{Capability, EffectivePermissions};
use tracing::debug;

use crate::evaluator::PermissionEvaluator;

/// Namespace that staff accounts do not pass without the capability.
const ADMIN_NAMESPACE: &str = "admin";

/// The acting user and their effective permissions, computed once per
/// request.
#[derive(Debug, Clone)]
pub struct RequestContext {
    user: UserAttributes,
    permissions: EffectivePermissions,
}

impl RequestContext {
    pub fn build(evaluator: &PermissionEvaluator, user: UserAttributes) -> Self {
        let permissions = evaluator.effective_permissions(&user);
        Self { user, permissions }
    }

    pub fn user(&self) -> &UserAttributes {
        &self.user
    }

    pub fn permissions(&self) -> &EffectivePermissions {
        &self.permissions
    }

    /// Whether the user holds the named capability.
    pub fn has(&self, name: &str) -> bool {
        self.permissions.has(name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Requirement {
    Namespace(Capability),
    /// View-name prefixes with their capability, longest prefix first.
    Views(Vec<(String, Capability)>),
}

/// Decides whether a request may enter an application section.
///
/// A section is addressed by an optional namespace and a view name. The
/// checks run in order:
///
/// 1. a public prefix of `namespace:view` (or `view`) lets it through
/// 2. superusers pass
/// 3. staff pass everything outside the `admin` namespace
/// 4. a namespace requirement must be held
/// 5. a per-view requirement applies through the longest matching prefix
///
/// Anything unmapped passes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SectionGuard {
    public: Vec<String>,
    required: BTreeMap<String, Requirement>,
}

impl SectionGuard {
    /// Builds the guard, rejecting unknown capability names.
    pub fn from_config(config: &SectionsConfig) -> Result<Self, ConfigError> {
        let mut required = BTreeMap::new();
        for (namespace, requirement) in &config.required {
            let parsed = match requirement {
                SectionRequirement::Capability(name) => {
                    Requirement::Namespace(capability(name)?)
                }
                SectionRequirement::ByView(views) => {
                    let mut parsed = views
                        .iter()
                        .map(|(prefix, name)| Ok((prefix.clone(), capability(name)?)))
                        .collect::<Result<Vec<_>, ConfigError>>()?;
                    parsed.sort_by(|a, b| b.0.len().cmp(&a.0.len()).then_with(|| a.0.cmp(&b.0)));
                    Requirement::Views(parsed)
                }
            };
            required.insert(namespace.clone(), parsed);
        }

        Ok(Self {
            public: config.public.clone(),
            required,
        })
    }

    /// Whether the section skips permission checks entirely.
    pub fn is_public(&self, namespace: Option<&str>, view: &str) -> bool {
        let qualified = qualified_name(namespace, view);
        self.public
            .iter()
            .any(|prefix| qualified.starts_with(prefix.as_str()))
    }

    /// The capability the section requires, if any.
    pub fn required_capability(&self, namespace: Option<&str>, view: &str) -> Option<Capability> {
        match self.required.get(namespace?)? {
            Requirement::Namespace(capability) => Some(*capability),
            Requirement::Views(views) => views
                .iter()
                .find(|(prefix, _)| view.starts_with(prefix.as_str()))
                .map(|(_, capability)| *capability),
        }
    }

    pub fn allows(&self, ctx: &RequestContext, namespace: Option<&str>, view: &str) -> bool {
        if self.is_public(namespace, view) {
            return true;
        }

        let user = ctx.user();
        if user.is_superuser {
            return true;
        }
        if user.is_staff && namespace != Some(ADMIN_NAMESPACE) {
            return true;
        }

        match self.required_capability(namespace, view) {
            Some(capability) => {
                let allowed = ctx.permissions().has_capability(capability);
                debug!(
                    user = %user.id,
                    section = %qualified_name(namespace, view),
                    capability = %capability,
                    allowed,
                    "Checked section access"
                );
                allowed
            }
            None => true,
        }
    }
}

fn qualified_name(namespace: Option<&str>, view: &str) -> String {
    match namespace {
        Some(namespace) => format!("{namespace}:{view}"),
        None => view.to_string(),
    }
}

fn capability(name: &str) -> Result<Capability, ConfigError> {
    name.parse().map_err(|_| ConfigError::UnknownCapability {
        section: "sections.required",
        name: name.to_string(),
    })
}
