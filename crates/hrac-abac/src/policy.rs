//! Attribute rule definitions.
//!
//! An [`AttributeRule`] is one conditional permission statement attached to a
//! role: "holders of this role may perform `action` on `entity` records whose
//! `field` satisfies `condition` against `value`". Rules only ever grant; the
//! absence of a matching rule is what denies.

use std::fmt::{self, Display};
use std::str::FromStr;

use hrac_types::{Action, EntityType, RoleId, RuleId};
use serde::{Deserialize, Serialize};

use crate::attributes::UserAttributePath;

// ============================================================================
// Condition Type
// ============================================================================

/// Comparison operator of a rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ConditionType {
    Equals,
    NotEquals,
    /// Value is a comma-separated list.
    In,
    /// Value is a comma-separated list.
    NotIn,
    GreaterThan,
    LessThan,
    Contains,
    StartsWith,
    EndsWith,
}

impl ConditionType {
    pub const ALL: [ConditionType; 9] = [
        ConditionType::Equals,
        ConditionType::NotEquals,
        ConditionType::In,
        ConditionType::NotIn,
        ConditionType::GreaterThan,
        ConditionType::LessThan,
        ConditionType::Contains,
        ConditionType::StartsWith,
        ConditionType::EndsWith,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ConditionType::Equals => "EQUALS",
            ConditionType::NotEquals => "NOT_EQUALS",
            ConditionType::In => "IN",
            ConditionType::NotIn => "NOT_IN",
            ConditionType::GreaterThan => "GREATER_THAN",
            ConditionType::LessThan => "LESS_THAN",
            ConditionType::Contains => "CONTAINS",
            ConditionType::StartsWith => "STARTS_WITH",
            ConditionType::EndsWith => "ENDS_WITH",
        }
    }

    /// Whether the operand is a list rather than a single value.
    pub fn takes_list(self) -> bool {
        matches!(self, ConditionType::In | ConditionType::NotIn)
    }

    /// Whether the operator matches on the text form of the field.
    pub fn is_textual(self) -> bool {
        matches!(
            self,
            ConditionType::Contains | ConditionType::StartsWith | ConditionType::EndsWith
        )
    }
}

impl Display for ConditionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing an unknown operator name.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown condition type: {0}")]
pub struct UnknownConditionType(pub String);

impl FromStr for ConditionType {
    type Err = UnknownConditionType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_uppercase().replace(['-', ' '], "_");
        ConditionType::ALL
            .into_iter()
            .find(|c| c.as_str() == normalized)
            .ok_or_else(|| UnknownConditionType(s.to_string()))
    }
}

// ============================================================================
// Condition Value
// ============================================================================

/// The right-hand side of a rule's comparison.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConditionValue {
    /// Fixed text, coerced to the field's type at evaluation time.
    Literal(String),
    /// An attribute of the acting user, resolved at evaluation time.
    UserAttribute(UserAttributePath),
}

impl ConditionValue {
    pub fn literal(value: impl Into<String>) -> Self {
        ConditionValue::Literal(value.into())
    }

    pub fn user_attribute(path: UserAttributePath) -> Self {
        ConditionValue::UserAttribute(path)
    }

    /// Parses the text form used in rule definitions.
    ///
    /// Text containing a `{...}` placeholder becomes a user-attribute
    /// reference (the placeholder replaces the whole value); anything else is
    /// a literal.
    ///
    /// ```
    /// use hrac_abac::{ConditionValue, UserAttributePath};
    ///
    /// assert_eq!(
    ///     ConditionValue::parse("{user.employee_profile.current_department_id}"),
    ///     ConditionValue::UserAttribute(UserAttributePath::DepartmentId),
    /// );
    /// assert_eq!(ConditionValue::parse("APPROVED"), ConditionValue::literal("APPROVED"));
    /// ```
    pub fn parse(raw: &str) -> Self {
        let placeholder = raw
            .find('{')
            .and_then(|start| raw[start..].find('}').map(|end| &raw[start + 1..start + end]));

        match placeholder {
            Some(path) => ConditionValue::UserAttribute(UserAttributePath::parse(path)),
            None => ConditionValue::Literal(raw.to_string()),
        }
    }

    pub fn is_dynamic(&self) -> bool {
        matches!(self, ConditionValue::UserAttribute(_))
    }
}

impl Display for ConditionValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConditionValue::Literal(text) => f.write_str(text),
            ConditionValue::UserAttribute(path) => write!(f, "{{{path}}}"),
        }
    }
}

// ============================================================================
// Attribute Rule
// ============================================================================

/// A conditional, field-level permission owned by one role.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttributeRule {
    pub id: RuleId,
    pub role: RoleId,
    /// Name of the target entity type (`leaverequest`, `department`, ...).
    pub entity: String,
    /// Dotted path of the compared field on the entity.
    pub field: String,
    pub condition: ConditionType,
    pub value: ConditionValue,
    pub action: Action,
}

impl AttributeRule {
    pub fn new(
        id: RuleId,
        role: RoleId,
        entity: &EntityType,
        field: impl Into<String>,
        condition: ConditionType,
        value: ConditionValue,
        action: Action,
    ) -> Self {
        Self {
            id,
            role,
            entity: entity.name().to_string(),
            field: field.into(),
            condition,
            value,
            action,
        }
    }

    /// Whether this rule is about `action` on records of `entity`.
    pub fn applies_to(&self, entity: &EntityType, action: Action) -> bool {
        self.action == action && self.entity == entity.name()
    }
}

impl Display for AttributeRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {}.{} {} {}",
            self.action, self.entity, self.field, self.condition, self.value
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case("EQUALS", ConditionType::Equals)]
    #[test_case("not_in", ConditionType::NotIn)]
    #[test_case("greater-than", ConditionType::GreaterThan)]
    #[test_case(" starts with ", ConditionType::StartsWith)]
    fn test_condition_type_from_str(raw: &str, expected: ConditionType) {
        assert_eq!(raw.parse::<ConditionType>().unwrap(), expected);
    }

    #[test]
    fn test_condition_type_rejects_unknown() {
        assert!("LIKE".parse::<ConditionType>().is_err());
    }

    #[test]
    fn test_condition_type_serde() {
        let json = serde_json::to_string(&ConditionType::NotEquals).unwrap();
        assert_eq!(json, "\"NOT_EQUALS\"");
        for condition in ConditionType::ALL {
            assert_eq!(condition.as_str().parse::<ConditionType>().unwrap(), condition);
        }
    }

    #[test]
    fn test_parse_placeholder_anywhere_in_text() {
        assert_eq!(
            ConditionValue::parse("dept-{user.employee_profile.current_unit}"),
            ConditionValue::UserAttribute(UserAttributePath::UnitId)
        );
    }

    #[test]
    fn test_parse_unknown_placeholder_is_dynamic_and_unknown() {
        let value = ConditionValue::parse("{user.nonexistent_field}");
        match value {
            ConditionValue::UserAttribute(path) => assert!(!path.is_known()),
            ConditionValue::Literal(_) => panic!("expected a user attribute reference"),
        }
    }

    #[test]
    fn test_unbalanced_brace_is_literal() {
        assert_eq!(ConditionValue::parse("{oops"), ConditionValue::literal("{oops"));
    }

    #[test]
    fn test_condition_value_display() {
        assert_eq!(
            ConditionValue::user_attribute(UserAttributePath::DepartmentId).to_string(),
            "{user.employee_profile.current_department_id}"
        );
        assert_eq!(ConditionValue::literal("1,2").to_string(), "1,2");
    }

    #[test]
    fn test_rule_applies_to() {
        let leave = EntityType::new("leaverequest");
        let rule = AttributeRule::new(
            RuleId::new(1),
            RoleId::new(2),
            &leave,
            "employee.current_department",
            ConditionType::Equals,
            ConditionValue::parse("{user.employee_profile.current_department_id}"),
            Action::Change,
        );

        assert!(rule.applies_to(&leave, Action::Change));
        assert!(!rule.applies_to(&leave, Action::View));
        assert!(!rule.applies_to(&EntityType::new("department"), Action::Change));
    }

    #[test]
    fn test_rule_serde_shape() {
        let rule = AttributeRule::new(
            RuleId::new(1),
            RoleId::new(2),
            &EntityType::new("task"),
            "status",
            ConditionType::In,
            ConditionValue::literal("OPEN, IN_PROGRESS"),
            Action::View,
        );
        let json = serde_json::to_value(&rule).unwrap();
        assert_eq!(json["condition"], "IN");
        assert_eq!(json["action"], "VIEW");
        assert_eq!(json["value"]["literal"], "OPEN, IN_PROGRESS");

        let back: AttributeRule = serde_json::from_value(json).unwrap();
        assert_eq!(back, rule);
    }
}
