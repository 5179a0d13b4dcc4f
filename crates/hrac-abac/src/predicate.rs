//! Row predicates.
//!
//! A [`Predicate`] is the resolved form of one or more attribute rules: user
//! references have been replaced by the acting user's values, and list
//! operands have been split. The same predicate is used to test a single
//! record ([`Predicate::matches`]) and to filter collections, which keeps
//! single-object checks and bulk filtering consistent.
//!
//! For relational data layers a predicate can also be rendered as a
//! parameterised SQL `WHERE` fragment ([`Predicate::to_sql`]).

use std::cmp::Ordering;

use serde::Serialize;

use crate::attributes::Record;
use crate::policy::ConditionType;
use crate::value::Value;

// ============================================================================
// Operand
// ============================================================================

/// Right-hand side of a resolved comparison.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum Operand {
    Single(Value),
    List(Vec<Value>),
}

impl Operand {
    pub fn values(&self) -> &[Value] {
        match self {
            Operand::Single(value) => std::slice::from_ref(value),
            Operand::List(values) => values,
        }
    }
}

// ============================================================================
// Predicate
// ============================================================================

/// A condition over the fields of a record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Predicate {
    /// Matches no record.
    Never,
    /// Compares one field of the record against an operand.
    Compare {
        field: String,
        op: ConditionType,
        operand: Operand,
    },
    /// Matches if any member matches.
    Or(Vec<Predicate>),
}

impl Predicate {
    pub fn compare(field: impl Into<String>, op: ConditionType, operand: Operand) -> Self {
        Predicate::Compare {
            field: field.into(),
            op,
            operand,
        }
    }

    /// Logical OR. `Never` is the identity.
    #[must_use]
    pub fn or(self, other: Predicate) -> Predicate {
        match (self, other) {
            (Predicate::Never, p) | (p, Predicate::Never) => p,
            (Predicate::Or(mut left), Predicate::Or(right)) => {
                left.extend(right);
                Predicate::Or(left)
            }
            (Predicate::Or(mut left), p) => {
                left.push(p);
                Predicate::Or(left)
            }
            (p, Predicate::Or(mut right)) => {
                right.insert(0, p);
                Predicate::Or(right)
            }
            (a, b) => Predicate::Or(vec![a, b]),
        }
    }

    /// ORs every predicate together, starting from [`Predicate::Never`].
    pub fn any(predicates: impl IntoIterator<Item = Predicate>) -> Predicate {
        predicates
            .into_iter()
            .fold(Predicate::Never, Predicate::or)
    }

    pub fn is_never(&self) -> bool {
        match self {
            Predicate::Never => true,
            Predicate::Compare { .. } => false,
            Predicate::Or(members) => members.iter().all(Predicate::is_never),
        }
    }

    /// Tests the predicate against one record.
    ///
    /// A field the record does not have never matches, whatever the operator.
    pub fn matches<R: Record + ?Sized>(&self, record: &R) -> bool {
        match self {
            Predicate::Never => false,
            Predicate::Or(members) => members.iter().any(|p| p.matches(record)),
            Predicate::Compare { field, op, operand } => match record.field(field) {
                Some(value) => compare(&value, *op, operand),
                None => false,
            },
        }
    }

    /// Renders the predicate as a SQL boolean expression with `$n`
    /// placeholders numbered from 1.
    ///
    /// Column types are unknown here, so literal operands are bound as
    /// given and the database coerces them. A literal that cannot be coerced
    /// to the field's type never matches in memory, even for `NOT_EQUALS`
    /// and `NOT_IN`. In SQL the database either rejects the statement or
    /// compares the values as given. Rules whose literals fit their
    /// column's type behave the same in both.
    pub fn to_sql(&self) -> Result<SqlFragment, SqlRenderError> {
        let mut params = Vec::new();
        let sql = self.render_sql(&mut params)?;
        Ok(SqlFragment { sql, params })
    }

    /// Renders the predicate, appending its parameters to `params`.
    ///
    /// Placeholders continue numbering after the parameters already present,
    /// so fragments can be combined into one statement.
    pub fn render_sql(&self, params: &mut Vec<Value>) -> Result<String, SqlRenderError> {
        match self {
            Predicate::Never => Ok(FALSE_SQL.to_string()),
            Predicate::Or(members) => {
                let live: Vec<&Predicate> = members.iter().filter(|p| !p.is_never()).collect();
                match live.as_slice() {
                    [] => Ok(FALSE_SQL.to_string()),
                    [single] => single.render_sql(params),
                    _ => {
                        let parts = live
                            .iter()
                            .map(|p| p.render_sql(params))
                            .collect::<Result<Vec<_>, _>>()?;
                        Ok(format!("({})", parts.join(" OR ")))
                    }
                }
            }
            Predicate::Compare { field, op, operand } => {
                validate_column(field)?;
                Ok(render_compare(field, *op, operand, params))
            }
        }
    }
}

// ============================================================================
// Record Matching
// ============================================================================

fn compare(field: &Value, op: ConditionType, operand: &Operand) -> bool {
    match op {
        ConditionType::Equals => first(operand).is_some_and(|v| equals(field, v) == Some(true)),
        ConditionType::NotEquals => {
            first(operand).is_some_and(|v| equals(field, v) == Some(false))
        }
        ConditionType::In => operand
            .values()
            .iter()
            .any(|v| equals(field, v) == Some(true)),
        ConditionType::NotIn => operand
            .values()
            .iter()
            .all(|v| equals(field, v) == Some(false)),
        ConditionType::GreaterThan => {
            first(operand).is_some_and(|v| ordering(field, v) == Some(Ordering::Greater))
        }
        ConditionType::LessThan => {
            first(operand).is_some_and(|v| ordering(field, v) == Some(Ordering::Less))
        }
        ConditionType::Contains | ConditionType::StartsWith | ConditionType::EndsWith => {
            let (Some(haystack), Some(needle)) =
                (field.as_text(), first(operand).and_then(Value::as_text))
            else {
                return false;
            };
            match op {
                ConditionType::Contains => haystack.contains(&needle),
                ConditionType::StartsWith => haystack.starts_with(&needle),
                _ => haystack.ends_with(&needle),
            }
        }
    }
}

fn first(operand: &Operand) -> Option<&Value> {
    operand.values().first()
}

/// `Some(true)` if equal, `Some(false)` if not, `None` if the operand cannot
/// be compared with the field at all.
///
/// A null field equals nothing.
fn equals(field: &Value, operand: &Value) -> Option<bool> {
    if field.is_null() {
        return Some(false);
    }
    ordering(field, operand).map(|o| o == Ordering::Equal)
}

fn ordering(field: &Value, operand: &Value) -> Option<Ordering> {
    let coerced = field.coerce_operand(operand)?;
    field.compare(&coerced)
}

// ============================================================================
// SQL Rendering
// ============================================================================

const FALSE_SQL: &str = "1 = 0";
const TRUE_SQL: &str = "1 = 1";

/// A rendered SQL condition and its positional parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SqlFragment {
    pub sql: String,
    pub params: Vec<Value>,
}

/// Errors from rendering a predicate as SQL.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SqlRenderError {
    #[error("invalid column reference in rule field: {0:?}")]
    InvalidColumn(String),
}

/// Accepts dotted identifiers (`employee.current_department`) only.
fn validate_column(field: &str) -> Result<(), SqlRenderError> {
    let valid_segment = |segment: &str| {
        let mut chars = segment.chars();
        chars
            .next()
            .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
            && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
    };

    if field.split('.').all(valid_segment) {
        Ok(())
    } else {
        Err(SqlRenderError::InvalidColumn(field.to_string()))
    }
}

fn placeholder(params: &mut Vec<Value>, value: Value) -> String {
    params.push(value);
    format!("${}", params.len())
}

fn render_compare(
    column: &str,
    op: ConditionType,
    operand: &Operand,
    params: &mut Vec<Value>,
) -> String {
    let values = operand.values();

    match op {
        ConditionType::In | ConditionType::NotIn => {
            if values.is_empty() {
                return if op == ConditionType::In {
                    FALSE_SQL.to_string()
                } else {
                    TRUE_SQL.to_string()
                };
            }
            let list = values
                .iter()
                .map(|v| placeholder(params, v.clone()))
                .collect::<Vec<_>>()
                .join(", ");
            if op == ConditionType::In {
                format!("{column} IN ({list})")
            } else {
                // NULL fields pass a negative test when matched in memory.
                format!("({column} NOT IN ({list}) OR {column} IS NULL)")
            }
        }
        _ => {
            let Some(value) = values.first() else {
                return FALSE_SQL.to_string();
            };
            match op {
                ConditionType::Equals => format!("{column} = {}", placeholder(params, value.clone())),
                ConditionType::NotEquals => {
                    let p = placeholder(params, value.clone());
                    format!("({column} <> {p} OR {column} IS NULL)")
                }
                ConditionType::GreaterThan => {
                    format!("{column} > {}", placeholder(params, value.clone()))
                }
                ConditionType::LessThan => {
                    format!("{column} < {}", placeholder(params, value.clone()))
                }
                _ => {
                    let text = escape_like(&value.as_text().unwrap_or_default());
                    let pattern = match op {
                        ConditionType::Contains => format!("%{text}%"),
                        ConditionType::StartsWith => format!("{text}%"),
                        _ => format!("%{text}"),
                    };
                    let p = placeholder(params, Value::Text(pattern));
                    format!("CAST({column} AS TEXT) LIKE {p} ESCAPE '\\'")
                }
            }
        }
    }
}

fn escape_like(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attributes::DynamicRecord;
    use hrac_types::{EntityType, RecordId};
    use test_case::test_case;

    fn leave(dept: impl Into<Value>, status: &str) -> DynamicRecord {
        DynamicRecord::new(EntityType::new("leaverequest"), RecordId::new(1))
            .with_field("employee.current_department", dept)
            .with_field("status", status)
            .with_field("days", 10_i64)
    }

    fn single(v: impl Into<Value>) -> Operand {
        Operand::Single(v.into())
    }

    fn list(items: &[&str]) -> Operand {
        Operand::List(items.iter().map(|s| Value::from(*s)).collect())
    }

    #[test_case(ConditionType::Equals, single("5"), true ; "equals coerced literal")]
    #[test_case(ConditionType::Equals, single(5_i64), true ; "equals resolved int")]
    #[test_case(ConditionType::Equals, single("7"), false ; "equals other")]
    #[test_case(ConditionType::NotEquals, single("7"), true ; "not equals other")]
    #[test_case(ConditionType::NotEquals, single("x"), false ; "not equals uncoercible")]
    #[test_case(ConditionType::In, list(&["3", "5"]), true ; "in list")]
    #[test_case(ConditionType::In, list(&[]), false ; "in empty list")]
    #[test_case(ConditionType::NotIn, list(&["3", "5"]), false ; "not in list")]
    #[test_case(ConditionType::NotIn, list(&["3", "4"]), true ; "not in other list")]
    #[test_case(ConditionType::NotIn, list(&["3", "x"]), false ; "not in uncoercible")]
    #[test_case(ConditionType::GreaterThan, single("4"), true ; "greater")]
    #[test_case(ConditionType::GreaterThan, single("5"), false ; "not greater")]
    #[test_case(ConditionType::LessThan, single("6"), true ; "less")]
    fn test_department_comparisons(op: ConditionType, operand: Operand, expected: bool) {
        let p = Predicate::compare("employee.current_department", op, operand);
        assert_eq!(p.matches(&leave(5_i64, "PENDING")), expected);
    }

    #[test_case(ConditionType::Contains, "END", true)]
    #[test_case(ConditionType::StartsWith, "PEN", true)]
    #[test_case(ConditionType::EndsWith, "ING", true)]
    #[test_case(ConditionType::EndsWith, "PEN", false)]
    #[test_case(ConditionType::Contains, "pend", false ; "case sensitive")]
    fn test_text_comparisons(op: ConditionType, needle: &str, expected: bool) {
        let p = Predicate::compare("status", op, single(needle));
        assert_eq!(p.matches(&leave(5_i64, "PENDING")), expected);
    }

    #[test]
    fn test_null_field() {
        let record = leave(Value::Null, "PENDING");
        let field = "employee.current_department";

        assert!(!Predicate::compare(field, ConditionType::Equals, single("5")).matches(&record));
        assert!(Predicate::compare(field, ConditionType::NotEquals, single("5")).matches(&record));
        assert!(Predicate::compare(field, ConditionType::NotIn, list(&["5"])).matches(&record));
        assert!(!Predicate::compare(field, ConditionType::GreaterThan, single("0")).matches(&record));
        assert!(!Predicate::compare(field, ConditionType::Contains, single("")).matches(&record));
    }

    #[test]
    fn test_missing_field_never_matches() {
        let record = leave(5_i64, "PENDING");
        for op in ConditionType::ALL {
            let p = Predicate::compare("no_such_field", op, list(&["5"]));
            assert!(!p.matches(&record), "{op} matched a missing field");
        }
    }

    #[test]
    fn test_sql_binds_literals_uncoerced() {
        let p = Predicate::compare(
            "employee.current_department",
            ConditionType::NotEquals,
            single("x"),
        );
        assert!(!p.matches(&leave(5_i64, "PENDING")));

        let fragment = p.to_sql().unwrap();
        assert_eq!(
            fragment.sql,
            "(employee.current_department <> $1 OR employee.current_department IS NULL)"
        );
        assert_eq!(fragment.params, vec![Value::from("x")]);
    }

    #[test]
    fn test_or_identity_and_flattening() {
        let a = Predicate::compare("status", ConditionType::Equals, single("A"));
        let b = Predicate::compare("status", ConditionType::Equals, single("B"));
        let c = Predicate::compare("status", ConditionType::Equals, single("C"));

        assert_eq!(Predicate::Never.or(a.clone()), a);
        assert_eq!(
            Predicate::any([a.clone(), b.clone(), c.clone()]),
            Predicate::Or(vec![a, b, c])
        );
        assert!(Predicate::any(std::iter::empty()).is_never());
    }

    #[test]
    fn test_or_matches_any_member() {
        let p = Predicate::any([
            Predicate::compare("status", ConditionType::Equals, single("APPROVED")),
            Predicate::compare("days", ConditionType::LessThan, single("20")),
        ]);
        assert!(p.matches(&leave(5_i64, "PENDING")));
        assert!(!Predicate::Never.matches(&leave(5_i64, "PENDING")));
    }

    #[test]
    fn test_sql_single_compare() {
        let p = Predicate::compare(
            "employee.current_department",
            ConditionType::Equals,
            single(5_i64),
        );
        let sql = p.to_sql().unwrap();
        assert_eq!(sql.sql, "employee.current_department = $1");
        assert_eq!(sql.params, vec![Value::Int(5)]);
    }

    #[test]
    fn test_sql_or_and_lists() {
        let p = Predicate::any([
            Predicate::compare("status", ConditionType::NotIn, list(&["A", "B"])),
            Predicate::compare("status", ConditionType::StartsWith, single("50%_")),
        ]);
        let sql = p.to_sql().unwrap();
        assert_eq!(
            sql.sql,
            "((status NOT IN ($1, $2) OR status IS NULL) OR CAST(status AS TEXT) LIKE $3 ESCAPE '\\')"
        );
        assert_eq!(sql.params[2], Value::from("50\\%\\_%"));
    }

    #[test]
    fn test_sql_never() {
        assert_eq!(Predicate::Never.to_sql().unwrap().sql, "1 = 0");
        assert_eq!(
            Predicate::Or(vec![Predicate::Never]).to_sql().unwrap().sql,
            "1 = 0"
        );
    }

    #[test]
    fn test_sql_continues_numbering() {
        let mut params = vec![Value::Int(1)];
        let sql = Predicate::compare("status", ConditionType::Equals, single("A"))
            .render_sql(&mut params)
            .unwrap();
        assert_eq!(sql, "status = $2");
        assert_eq!(params.len(), 2);
    }

    #[test_case("status; DROP TABLE users" ; "statement injection")]
    #[test_case("1status" ; "leading digit")]
    #[test_case("employee..id" ; "empty segment")]
    fn test_sql_rejects_bad_columns(field: &str) {
        let p = Predicate::compare(field, ConditionType::Equals, single("A"));
        assert!(matches!(p.to_sql(), Err(SqlRenderError::InvalidColumn(_))));
    }
}
