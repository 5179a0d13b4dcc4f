//! Rule resolution.
//!
//! Turns [`AttributeRule`]s into [`Predicate`]s for one acting user. This is
//! where dynamic references are resolved, and where every configuration
//! problem is turned into a predicate that matches nothing.

use tracing::warn;

use crate::attributes::UserAttributes;
use crate::policy::{AttributeRule, ConditionValue};
use crate::predicate::{Operand, Predicate};
use crate::value::Value;

// ============================================================================
// Public API
// ============================================================================

/// Resolves one rule against the acting user.
///
/// # Postcondition
///
/// An unresolvable user reference yields [`Predicate::Never`]; it never
/// widens access.
pub fn rule_predicate(rule: &AttributeRule, user: &UserAttributes) -> Predicate {
    let resolved = match &rule.value {
        ConditionValue::Literal(text) => Value::Text(text.clone()),
        ConditionValue::UserAttribute(path) => match user.resolve(path) {
            Some(value) => value,
            None => {
                warn!(
                    rule = %rule.id,
                    user = %user.id,
                    path = %path,
                    "Unresolvable user reference in attribute rule; rule matches nothing"
                );
                return Predicate::Never;
            }
        },
    };

    let operand = if rule.condition.takes_list() {
        Operand::List(split_list(resolved))
    } else {
        Operand::Single(resolved)
    };

    Predicate::compare(rule.field.clone(), rule.condition, operand)
}

// ============================================================================
// List Operands
// ============================================================================

/// Splits a comma-separated operand. Non-text values form a one-item list.
fn split_list(value: Value) -> Vec<Value> {
    match value {
        Value::Text(text) => text
            .split(',')
            .map(str::trim)
            .filter(|item| !item.is_empty())
            .map(Value::from)
            .collect(),
        other => vec![other],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attributes::{DynamicRecord, EmployeeProfile};
    use crate::policy::ConditionType;
    use hrac_types::{Action, EntityType, RecordId, RoleId, RuleId, UserId};

    fn leave_entity() -> EntityType {
        EntityType::new("leaverequest")
    }

    fn leave(id: u64, dept: i64) -> DynamicRecord {
        DynamicRecord::new(leave_entity(), RecordId::new(id))
            .with_field("employee.current_department", dept)
            .with_field("status", "PENDING")
    }

    fn officer(dept: u64) -> UserAttributes {
        UserAttributes::new(UserId::new(1), "officer").with_profile(EmployeeProfile {
            current_department_id: Some(dept),
            ..EmployeeProfile::default()
        })
    }

    fn rule(field: &str, condition: ConditionType, value: &str) -> AttributeRule {
        AttributeRule::new(
            RuleId::new(1),
            RoleId::new(1),
            &leave_entity(),
            field,
            condition,
            ConditionValue::parse(value),
            Action::Change,
        )
    }

    #[test]
    fn test_dynamic_department_rule() {
        let r = rule(
            "employee.current_department",
            ConditionType::Equals,
            "{user.employee_profile.current_department_id}",
        );
        let p = rule_predicate(&r, &officer(5));

        assert!(p.matches(&leave(1, 5)));
        assert!(!p.matches(&leave(2, 7)));
    }

    #[test]
    fn test_unknown_reference_is_never() {
        let r = rule("status", ConditionType::NotEquals, "{user.nonexistent_field}");
        assert_eq!(rule_predicate(&r, &officer(5)), Predicate::Never);
    }

    #[test]
    fn test_missing_profile_is_never() {
        let r = rule(
            "employee.current_department",
            ConditionType::Equals,
            "{user.employee_profile.current_department_id}",
        );
        let user = UserAttributes::new(UserId::new(3), "contractor");
        assert!(rule_predicate(&r, &user).is_never());
    }

    #[test]
    fn test_in_literal_is_split_and_trimmed() {
        let r = rule("status", ConditionType::In, " APPROVED , PENDING,,");
        let p = rule_predicate(&r, &officer(5));
        match &p {
            Predicate::Compare { operand, .. } => {
                assert_eq!(
                    operand.values(),
                    &[Value::from("APPROVED"), Value::from("PENDING")]
                );
            }
            other => panic!("unexpected predicate {other:?}"),
        }
        assert!(p.matches(&leave(1, 5)));
    }

    #[test]
    fn test_in_with_resolved_scalar() {
        let r = rule(
            "employee.current_department",
            ConditionType::In,
            "{user.employee_profile.current_department_id}",
        );
        let p = rule_predicate(&r, &officer(7));
        assert!(p.matches(&leave(1, 7)));
        assert!(!p.matches(&leave(1, 5)));
    }
}
