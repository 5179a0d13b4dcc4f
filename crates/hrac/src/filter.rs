//! Collections that can be narrowed by a [`Predicate`].
//!
//! [`RecordSet`] filters loaded records in memory. [`SelectQuery`] renders
//! the predicate into a parameterised SQL `WHERE` clause for a relational
//! data layer, so filtering happens in the database in one pass.

use hrac_abac::{Predicate, Record, Value};
use hrac_types::EntityType;
use tracing::warn;

/// A collection of records of one entity type.
pub trait Collection: Sized {
    /// The entity type of every member, known even when empty.
    fn entity_type(&self) -> &EntityType;

    /// The same collection with no members.
    fn none(self) -> Self;

    /// Keeps the members matching `predicate`.
    fn filter(self, predicate: &Predicate) -> Self;
}

// ============================================================================
// In-memory records
// ============================================================================

/// An in-memory collection.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordSet<R> {
    entity: EntityType,
    records: Vec<R>,
}

impl<R: Record> RecordSet<R> {
    pub fn new(entity: EntityType, records: Vec<R>) -> Self {
        Self { entity, records }
    }

    pub fn records(&self) -> &[R] {
        &self.records
    }

    pub fn into_records(self) -> Vec<R> {
        self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &R> {
        self.records.iter()
    }
}

impl<R: Record> Collection for RecordSet<R> {
    fn entity_type(&self) -> &EntityType {
        &self.entity
    }

    fn none(mut self) -> Self {
        self.records.clear();
        self
    }

    fn filter(mut self, predicate: &Predicate) -> Self {
        self.records.retain(|record| predicate.matches(record));
        self
    }
}

// ============================================================================
// SQL queries
// ============================================================================

const FALSE_SQL: &str = "1 = 0";

/// A `SELECT` over one table, narrowed by predicates.
#[derive(Debug, Clone, PartialEq)]
pub struct SelectQuery {
    entity: EntityType,
    table: String,
    conditions: Vec<String>,
    params: Vec<Value>,
}

impl SelectQuery {
    pub fn new(entity: EntityType, table: impl Into<String>) -> Self {
        Self {
            entity,
            table: table.into(),
            conditions: Vec::new(),
            params: Vec::new(),
        }
    }

    /// The `WHERE` conditions, ANDed together.
    pub fn conditions(&self) -> &[String] {
        &self.conditions
    }

    /// Positional parameters for `$1`, `$2`, ...
    pub fn params(&self) -> &[Value] {
        &self.params
    }

    /// Renders the full statement.
    pub fn to_sql(&self) -> String {
        if self.conditions.is_empty() {
            format!("SELECT * FROM {}", self.table)
        } else {
            format!(
                "SELECT * FROM {} WHERE {}",
                self.table,
                self.conditions.join(" AND ")
            )
        }
    }
}

impl Collection for SelectQuery {
    fn entity_type(&self) -> &EntityType {
        &self.entity
    }

    fn none(mut self) -> Self {
        self.conditions.push(FALSE_SQL.to_string());
        self
    }

    fn filter(mut self, predicate: &Predicate) -> Self {
        let mut params = self.params.clone();
        match predicate.render_sql(&mut params) {
            Ok(sql) => {
                self.conditions.push(sql);
                self.params = params;
                self
            }
            Err(e) => {
                warn!(table = %self.table, error = %e, "Predicate cannot be rendered; query matches nothing");
                self.none()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hrac_abac::{ConditionType, DynamicRecord, Operand};
    use hrac_types::RecordId;

    fn departments() -> RecordSet<DynamicRecord> {
        let entity = EntityType::new("department");
        RecordSet::new(
            entity.clone(),
            (1..=4)
                .map(|id| {
                    DynamicRecord::new(entity.clone(), RecordId::new(id))
                        .with_field("zone", (id % 2) as i64)
                })
                .collect(),
        )
    }

    fn zone_is(zone: i64) -> Predicate {
        Predicate::compare("zone", ConditionType::Equals, Operand::Single(Value::Int(zone)))
    }

    #[test]
    fn record_set_filter_and_none() {
        let filtered = departments().filter(&zone_is(1));
        let ids: Vec<u64> = filtered.iter().map(|r| r.id().as_u64()).collect();
        assert_eq!(ids, vec![1, 3]);

        let empty = departments().none();
        assert!(empty.is_empty());
        assert_eq!(empty.entity_type().name(), "department");
    }

    #[test]
    fn select_query_accumulates_conditions_and_params() {
        let query = SelectQuery::new(EntityType::new("department"), "core_department")
            .filter(&zone_is(1))
            .filter(&Predicate::compare(
                "name",
                ConditionType::StartsWith,
                Operand::Single(Value::from("HR")),
            ));

        assert_eq!(
            query.to_sql(),
            "SELECT * FROM core_department WHERE zone = $1 AND CAST(name AS TEXT) LIKE $2 ESCAPE '\\'"
        );
        assert_eq!(query.params(), &[Value::Int(1), Value::from("HR%")]);
    }

    #[test]
    fn select_query_unrenderable_predicate_matches_nothing() {
        let bad = Predicate::compare(
            "name; --",
            ConditionType::Equals,
            Operand::Single(Value::from("x")),
        );
        let query = SelectQuery::new(EntityType::new("department"), "core_department").filter(&bad);
        assert_eq!(query.to_sql(), "SELECT * FROM core_department WHERE 1 = 0");
        assert!(query.params().is_empty());
    }

    #[test]
    fn select_query_unfiltered() {
        let query = SelectQuery::new(EntityType::new("task"), "tasks");
        assert_eq!(query.to_sql(), "SELECT * FROM tasks");
        assert!(query.none().to_sql().ends_with("WHERE 1 = 0"));
    }
}
