//! Attribute types for rule evaluation.
//!
//! Two attribute sources drive access decisions:
//! - **User attributes**: the acting user and their employee profile, read
//!   through a closed set of [`UserAttributePath`] accessors
//! - **Record attributes**: fields of the object being accessed, read through
//!   the [`Record`] trait by dotted path

use std::collections::BTreeMap;
use std::fmt::{self, Display};

use chrono::NaiveDate;
use hrac_types::{EntityType, RecordId, UserId};
use serde::{Deserialize, Serialize};

use crate::value::Value;

// ============================================================================
// User Attributes
// ============================================================================

/// The acting user, as seen by the access-control core.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserAttributes {
    pub id: UserId,
    pub username: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub is_superuser: bool,
    #[serde(default)]
    pub is_staff: bool,
    #[serde(default = "default_true")]
    pub is_active: bool,
    /// Absent for accounts that are not employees (service accounts, some
    /// administrators).
    #[serde(default)]
    pub employee_profile: Option<EmployeeProfile>,
}

fn default_true() -> bool {
    true
}

impl UserAttributes {
    pub fn new(id: UserId, username: impl Into<String>) -> Self {
        Self {
            id,
            username: username.into(),
            email: None,
            is_superuser: false,
            is_staff: false,
            is_active: true,
            employee_profile: None,
        }
    }

    pub fn with_profile(mut self, profile: EmployeeProfile) -> Self {
        self.employee_profile = Some(profile);
        self
    }

    pub fn superuser(mut self) -> Self {
        self.is_superuser = true;
        self
    }

    pub fn staff(mut self) -> Self {
        self.is_staff = true;
        self
    }

    /// Resolves a dynamic reference against this user.
    ///
    /// Returns `None` when the path is unknown, the user has no employee
    /// profile, or the attribute is unset. Callers must treat `None` as
    /// "matches nothing".
    pub fn resolve(&self, path: &UserAttributePath) -> Option<Value> {
        let value = match path {
            UserAttributePath::Id => Value::from(self.id.as_u64()),
            UserAttributePath::Username => Value::from(self.username.as_str()),
            UserAttributePath::Email => Value::from(self.email.clone()),
            UserAttributePath::Unknown(_) => return None,
            profile_path => {
                let profile = self.employee_profile.as_ref()?;
                profile.resolve(profile_path)?
            }
        };
        (!value.is_null()).then_some(value)
    }
}

/// HR attributes of an employee.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmployeeProfile {
    pub id: Option<u64>,
    pub file_number: Option<String>,
    pub current_department_id: Option<u64>,
    pub current_unit_id: Option<u64>,
    pub current_zone_id: Option<u64>,
    pub current_state_id: Option<u64>,
    pub current_grade_level: Option<u32>,
    pub current_step: Option<u32>,
    pub current_designation_id: Option<u64>,
    pub current_cadre: Option<String>,
    pub employee_type: Option<String>,
    pub date_of_first_appointment: Option<NaiveDate>,
}

impl EmployeeProfile {
    fn resolve(&self, path: &UserAttributePath) -> Option<Value> {
        use UserAttributePath as P;

        let value = match path {
            P::ProfileId => Value::from(self.id),
            P::FileNumber => Value::from(self.file_number.clone()),
            P::DepartmentId => Value::from(self.current_department_id),
            P::UnitId => Value::from(self.current_unit_id),
            P::ZoneId => Value::from(self.current_zone_id),
            P::StateId => Value::from(self.current_state_id),
            P::GradeLevel => Value::from(self.current_grade_level),
            P::Step => Value::from(self.current_step),
            P::DesignationId => Value::from(self.current_designation_id),
            P::Cadre => Value::from(self.current_cadre.clone()),
            P::EmployeeType => Value::from(self.employee_type.clone()),
            P::FirstAppointment => Value::from(self.date_of_first_appointment),
            P::Id | P::Username | P::Email | P::Unknown(_) => return None,
        };
        Some(value)
    }
}

// ============================================================================
// User Attribute Paths
// ============================================================================

/// A statically known attribute of the acting user.
///
/// Parsed from the dotted form used in rule values, e.g.
/// `user.employee_profile.current_department_id`. Paths that name no known
/// accessor parse into [`UserAttributePath::Unknown`] and never resolve.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum UserAttributePath {
    Id,
    Username,
    Email,
    ProfileId,
    FileNumber,
    DepartmentId,
    UnitId,
    ZoneId,
    StateId,
    GradeLevel,
    Step,
    DesignationId,
    Cadre,
    EmployeeType,
    FirstAppointment,
    Unknown(String),
}

const PROFILE_PREFIX: &str = "user.employee_profile.";

impl UserAttributePath {
    /// Parses a dotted path. Surrounding braces and whitespace are ignored.
    pub fn parse(raw: &str) -> Self {
        let path = raw
            .trim()
            .trim_start_matches('{')
            .trim_end_matches('}')
            .trim();

        if let Some(field) = path.strip_prefix(PROFILE_PREFIX) {
            return match field {
                "id" => Self::ProfileId,
                "file_number" => Self::FileNumber,
                "current_department_id" | "current_department" => Self::DepartmentId,
                "current_unit_id" | "current_unit" => Self::UnitId,
                "current_zone_id" | "current_zone" => Self::ZoneId,
                "current_state_id" | "current_state" => Self::StateId,
                "current_grade_level" => Self::GradeLevel,
                "current_step" => Self::Step,
                "current_designation_id" | "current_designation" => Self::DesignationId,
                "current_cadre" => Self::Cadre,
                "current_employee_type" | "employee_type" => Self::EmployeeType,
                "date_of_first_appointment" => Self::FirstAppointment,
                _ => Self::Unknown(path.to_string()),
            };
        }

        match path {
            "user.id" | "user.pk" => Self::Id,
            "user.username" => Self::Username,
            "user.email" => Self::Email,
            _ => Self::Unknown(path.to_string()),
        }
    }

    /// Canonical dotted form.
    pub fn as_path(&self) -> String {
        let field = match self {
            Self::Id => return "user.id".to_string(),
            Self::Username => return "user.username".to_string(),
            Self::Email => return "user.email".to_string(),
            Self::Unknown(raw) => return raw.clone(),
            Self::ProfileId => "id",
            Self::FileNumber => "file_number",
            Self::DepartmentId => "current_department_id",
            Self::UnitId => "current_unit_id",
            Self::ZoneId => "current_zone_id",
            Self::StateId => "current_state_id",
            Self::GradeLevel => "current_grade_level",
            Self::Step => "current_step",
            Self::DesignationId => "current_designation_id",
            Self::Cadre => "current_cadre",
            Self::EmployeeType => "employee_type",
            Self::FirstAppointment => "date_of_first_appointment",
        };
        format!("{PROFILE_PREFIX}{field}")
    }

    pub fn is_known(&self) -> bool {
        !matches!(self, Self::Unknown(_))
    }
}

impl Display for UserAttributePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.as_path())
    }
}

impl From<String> for UserAttributePath {
    fn from(raw: String) -> Self {
        Self::parse(&raw)
    }
}

impl From<UserAttributePath> for String {
    fn from(path: UserAttributePath) -> Self {
        path.as_path()
    }
}

// ============================================================================
// Records
// ============================================================================

/// An object whose fields rules are evaluated against.
pub trait Record {
    fn entity_type(&self) -> EntityType;

    fn id(&self) -> RecordId;

    /// Looks up a field by dotted path (`employee.current_department`).
    ///
    /// `None` means the record has no such field, which is distinct from a
    /// field holding [`Value::Null`].
    fn field(&self, path: &str) -> Option<Value>;
}

/// A record backed by a flat map of dotted paths to values.
///
/// Useful for data that arrives as JSON rather than as typed structs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DynamicRecord {
    pub entity: EntityType,
    pub id: RecordId,
    pub fields: BTreeMap<String, Value>,
}

impl DynamicRecord {
    pub fn new(entity: EntityType, id: RecordId) -> Self {
        Self {
            entity,
            id,
            fields: BTreeMap::new(),
        }
    }

    pub fn with_field(mut self, path: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.insert(path.into(), value.into());
        self
    }

    /// Builds a record from a JSON object with an integer `id`.
    ///
    /// Nested objects are flattened into dotted paths, so
    /// `{"employee": {"current_department": 5}}` exposes
    /// `employee.current_department`. Values with no scalar representation
    /// (arrays, fractional numbers) are left out.
    pub fn from_json(entity: EntityType, json: &serde_json::Value) -> Option<Self> {
        let object = json.as_object()?;
        let id = object.get("id")?.as_u64()?;

        let mut record = Self::new(entity, RecordId::new(id));
        flatten_into(&mut record.fields, "", object);
        Some(record)
    }
}

fn flatten_into(
    fields: &mut BTreeMap<String, Value>,
    prefix: &str,
    object: &serde_json::Map<String, serde_json::Value>,
) {
    for (key, json) in object {
        let path = if prefix.is_empty() {
            key.clone()
        } else {
            format!("{prefix}.{key}")
        };
        match json {
            serde_json::Value::Object(nested) => {
                // A related object also answers for its own id.
                if let Some(id) = nested.get("id").and_then(Value::from_json) {
                    fields.insert(path.clone(), id);
                }
                flatten_into(fields, &path, nested);
            }
            other => {
                if let Some(value) = Value::from_json(other) {
                    fields.insert(path, value);
                }
            }
        }
    }
}

impl Record for DynamicRecord {
    fn entity_type(&self) -> EntityType {
        self.entity.clone()
    }

    fn id(&self) -> RecordId {
        self.id
    }

    fn field(&self, path: &str) -> Option<Value> {
        self.fields.get(path).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    fn officer() -> UserAttributes {
        UserAttributes::new(UserId::new(1), "officer").with_profile(EmployeeProfile {
            current_department_id: Some(5),
            current_grade_level: Some(12),
            current_cadre: Some("ADMIN".to_string()),
            ..EmployeeProfile::default()
        })
    }

    #[test_case("{user.employee_profile.current_department_id}", UserAttributePath::DepartmentId ; "braced")]
    #[test_case("user.employee_profile.current_department", UserAttributePath::DepartmentId ; "relation alias")]
    #[test_case(" user.id ", UserAttributePath::Id ; "trimmed")]
    #[test_case("user.employee_profile.current_grade_level", UserAttributePath::GradeLevel ; "grade level")]
    fn test_parse_known_paths(raw: &str, expected: UserAttributePath) {
        assert_eq!(UserAttributePath::parse(raw), expected);
    }

    #[test_case("{user.nonexistent_field}" ; "unknown user field")]
    #[test_case("user.employee_profile.salary" ; "unknown profile field")]
    #[test_case("manager.id" ; "wrong root")]
    #[test_case("" ; "empty")]
    fn test_parse_unknown_paths(raw: &str) {
        let path = UserAttributePath::parse(raw);
        assert!(!path.is_known());
        assert_eq!(officer().resolve(&path), None);
    }

    #[test]
    fn test_resolve_profile_attributes() {
        let user = officer();
        assert_eq!(
            user.resolve(&UserAttributePath::DepartmentId),
            Some(Value::Int(5))
        );
        assert_eq!(
            user.resolve(&UserAttributePath::Cadre),
            Some(Value::from("ADMIN"))
        );
        assert_eq!(user.resolve(&UserAttributePath::Id), Some(Value::Int(1)));
    }

    #[test]
    fn test_unset_attribute_does_not_resolve() {
        let user = officer();
        assert_eq!(user.resolve(&UserAttributePath::ZoneId), None);
        assert_eq!(user.resolve(&UserAttributePath::Email), None);
    }

    #[test]
    fn test_missing_profile_does_not_resolve() {
        let user = UserAttributes::new(UserId::new(2), "service");
        assert_eq!(user.resolve(&UserAttributePath::DepartmentId), None);
        assert_eq!(
            user.resolve(&UserAttributePath::Username),
            Some(Value::from("service"))
        );
    }

    #[test]
    fn test_path_serde_roundtrip_keeps_unknown_text() {
        let path = UserAttributePath::parse("user.shoe_size");
        let json = serde_json::to_string(&path).unwrap();
        assert_eq!(json, "\"user.shoe_size\"");

        let known: UserAttributePath =
            serde_json::from_str("\"user.employee_profile.current_unit\"").unwrap();
        assert_eq!(known, UserAttributePath::UnitId);
    }

    #[test]
    fn test_dynamic_record_from_json_flattens() {
        let json = serde_json::json!({
            "id": 11,
            "status": "PENDING",
            "employee": {"id": 3, "current_department": 5},
            "attachments": [1, 2],
        });
        let record = DynamicRecord::from_json(EntityType::new("leaverequest"), &json).unwrap();

        assert_eq!(record.id(), RecordId::new(11));
        assert_eq!(
            record.field("employee.current_department"),
            Some(Value::Int(5))
        );
        assert_eq!(record.field("employee"), Some(Value::Int(3)));
        assert_eq!(record.field("status"), Some(Value::from("PENDING")));
        assert_eq!(record.field("attachments"), None);
    }

    #[test]
    fn test_dynamic_record_requires_id() {
        let json = serde_json::json!({"name": "Finance"});
        assert!(DynamicRecord::from_json(EntityType::new("department"), &json).is_none());
    }
}
