//! Property tests for rule resolution and matching.

use hrac_types::{Action, EntityType, RecordId, RoleId, RuleId, UserId};
use proptest::prelude::*;

use crate::{
    AttributeRule, ConditionType, ConditionValue, DynamicRecord, EmployeeProfile, Predicate,
    UserAttributes, Value, rule_predicate,
};

fn entity() -> EntityType {
    EntityType::new("leaverequest")
}

fn record(dept: Option<i64>, status: &str) -> DynamicRecord {
    DynamicRecord::new(entity(), RecordId::new(1))
        .with_field("employee.current_department", Value::from(dept))
        .with_field("status", status)
}

fn rule(condition: ConditionType, value: ConditionValue) -> AttributeRule {
    AttributeRule::new(
        RuleId::new(1),
        RoleId::new(1),
        &entity(),
        "employee.current_department",
        condition,
        value,
        Action::View,
    )
}

fn any_condition() -> impl Strategy<Value = ConditionType> {
    proptest::sample::select(ConditionType::ALL.to_vec())
}

fn any_user() -> impl Strategy<Value = UserAttributes> {
    (any::<u64>(), proptest::option::of(0_u64..50)).prop_map(|(id, dept)| {
        UserAttributes::new(UserId::new(id), "user").with_profile(EmployeeProfile {
            current_department_id: dept,
            ..EmployeeProfile::default()
        })
    })
}

// ============================================================================
// Fail-closed properties
// ============================================================================

proptest! {
    #[test]
    fn unknown_reference_never_matches(
        condition in any_condition(),
        user in any_user(),
        dept in proptest::option::of(0_i64..50),
        field in "[a-z_]{1,12}",
    ) {
        let value = ConditionValue::parse(&format!("{{user.{field}_unknown}}"));
        let predicate = rule_predicate(&rule(condition, value), &user);

        prop_assert_eq!(&predicate, &Predicate::Never);
        prop_assert!(!predicate.matches(&record(dept, "PENDING")));
    }

    #[test]
    fn uncoercible_literal_never_matches(
        condition in any_condition().prop_filter("textual ops compare text", |c| !c.is_textual()),
        dept in 0_i64..50,
        garbage in "[a-z]{1,8}",
    ) {
        let user = UserAttributes::new(UserId::new(1), "user");
        let predicate = rule_predicate(&rule(condition, ConditionValue::literal(garbage)), &user);

        prop_assert!(!predicate.matches(&record(Some(dept), "PENDING")));
    }
}

// ============================================================================
// Operator properties
// ============================================================================

proptest! {
    #[test]
    fn in_and_not_in_partition_non_null_fields(
        dept in 0_i64..20,
        items in proptest::collection::vec(0_i64..20, 0..6),
    ) {
        let list = items.iter().map(ToString::to_string).collect::<Vec<_>>().join(",");
        let user = UserAttributes::new(UserId::new(1), "user");
        let inside = rule_predicate(&rule(ConditionType::In, ConditionValue::literal(list.clone())), &user);
        let outside = rule_predicate(&rule(ConditionType::NotIn, ConditionValue::literal(list)), &user);

        let r = record(Some(dept), "PENDING");
        prop_assert_ne!(inside.matches(&r), outside.matches(&r));
        prop_assert_eq!(inside.matches(&r), items.contains(&dept));
    }

    #[test]
    fn equals_and_not_equals_partition_non_null_fields(dept in 0_i64..20, other in 0_i64..20) {
        let user = UserAttributes::new(UserId::new(1), "user");
        let value = ConditionValue::literal(other.to_string());
        let eq = rule_predicate(&rule(ConditionType::Equals, value.clone()), &user);
        let ne = rule_predicate(&rule(ConditionType::NotEquals, value), &user);

        let r = record(Some(dept), "PENDING");
        prop_assert_eq!(eq.matches(&r), dept == other);
        prop_assert_ne!(eq.matches(&r), ne.matches(&r));
    }

    #[test]
    fn or_of_predicates_matches_iff_any_member_matches(
        depts in proptest::collection::vec(0_i64..10, 0..5),
        dept in 0_i64..10,
    ) {
        let user = UserAttributes::new(UserId::new(1), "user");
        let members: Vec<Predicate> = depts
            .iter()
            .map(|d| rule_predicate(&rule(ConditionType::Equals, ConditionValue::literal(d.to_string())), &user))
            .collect();
        let r = record(Some(dept), "PENDING");

        let expected = members.iter().any(|p| p.matches(&r));
        prop_assert_eq!(Predicate::any(members).matches(&r), expected);
    }
}
