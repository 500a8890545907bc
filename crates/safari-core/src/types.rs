//! Entity types, records and typed write payloads.

use crate::error::{Failure, FailureKind, Result};
use chrono::{NaiveDate, NaiveTime};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize, Serializer};
use serde_json::{Map, Value};
use std::borrow::Cow;
use std::fmt;
use std::str::FromStr;

/// Backend identifier of a record
pub type RecordId = i64;

/// The entity lists the dashboards work with
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityType {
    Users,
    Trips,
    Bookings,
    Staff,
    Boats,
    Guides,
    Assignments,
}

impl EntityType {
    pub const ALL: [EntityType; 7] = [
        EntityType::Users,
        EntityType::Trips,
        EntityType::Bookings,
        EntityType::Staff,
        EntityType::Boats,
        EntityType::Guides,
        EntityType::Assignments,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            EntityType::Users => "users",
            EntityType::Trips => "trips",
            EntityType::Bookings => "bookings",
            EntityType::Staff => "staff",
            EntityType::Boats => "boats",
            EntityType::Guides => "guides",
            EntityType::Assignments => "assignments",
        }
    }

    /// Field carrying the record identity in backend JSON
    pub fn id_field(&self) -> &'static str {
        match self {
            EntityType::Users | EntityType::Staff | EntityType::Guides => "userId",
            EntityType::Trips | EntityType::Assignments => "tripId",
            EntityType::Bookings => "bookingId",
            EntityType::Boats => "boatId",
        }
    }
}

impl fmt::Display for EntityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EntityType {
    type Err = Failure;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "users" | "user" => Ok(EntityType::Users),
            "trips" | "trip" => Ok(EntityType::Trips),
            "bookings" | "booking" => Ok(EntityType::Bookings),
            "staff" => Ok(EntityType::Staff),
            "boats" | "boat" => Ok(EntityType::Boats),
            "guides" | "guide" => Ok(EntityType::Guides),
            "assignments" | "assignment" => Ok(EntityType::Assignments),
            other => Err(Failure::precondition(format!(
                "unknown entity type '{}'",
                other
            ))),
        }
    }
}

/// An opaque backend record with a validated numeric identity.
///
/// Serializes back to exactly the JSON object it was built from.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    id: RecordId,
    fields: Map<String, Value>,
}

impl Record {
    /// Validate one JSON value from a list or get response.
    ///
    /// The value must be an object whose identity field (or `id`) is an
    /// integer.
    pub fn from_value(entity: EntityType, value: Value) -> Result<Self> {
        let Value::Object(fields) = value else {
            return Err(Failure::decode(format!(
                "expected a JSON object for a {} record",
                entity
            )));
        };

        let id = [entity.id_field(), "id"]
            .iter()
            .filter_map(|key| fields.get(*key))
            .find_map(Value::as_i64)
            .ok_or_else(|| {
                Failure::decode(format!(
                    "{} record is missing a numeric '{}'",
                    entity,
                    entity.id_field()
                ))
            })?;

        Ok(Self { id, fields })
    }

    /// Validate a list response body
    pub fn list_from_value(entity: EntityType, value: Value) -> Result<Vec<Self>> {
        match value {
            Value::Array(items) => items
                .into_iter()
                .map(|item| Record::from_value(entity, item))
                .collect(),
            Value::Null => Ok(Vec::new()),
            _ => Err(Failure::decode(format!(
                "expected a JSON array of {}",
                entity
            ))),
        }
    }

    pub fn id(&self) -> RecordId {
        self.id
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields.get(field).filter(|v| !v.is_null())
    }

    /// Scalar field rendered as text; `None` for absent, null or structured values
    pub fn text(&self, field: &str) -> Option<Cow<'_, str>> {
        match self.get(field)? {
            Value::String(s) => Some(Cow::Borrowed(s.as_str())),
            Value::Number(n) => Some(Cow::Owned(n.to_string())),
            Value::Bool(b) => Some(Cow::Owned(b.to_string())),
            _ => None,
        }
    }

    pub fn f64(&self, field: &str) -> Option<f64> {
        match self.get(field)? {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    pub fn role(&self) -> Option<Cow<'_, str>> {
        self.text("role")
    }

    pub fn status(&self) -> Option<Cow<'_, str>> {
        self.text("status")
    }

    pub fn fields(&self) -> &Map<String, Value> {
        &self.fields
    }

    pub fn into_value(self) -> Value {
        Value::Object(self.fields)
    }
}

impl Serialize for Record {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        self.fields.serialize(serializer)
    }
}

/// New user account
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserDraft {
    pub first_name: String,
    pub second_name: String,
    pub email: String,
    pub contact_no: String,
    pub role: String,
    pub password: String,
}

/// Editable profile fields of a user
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserFields {
    pub first_name: String,
    pub second_name: String,
    pub email: String,
    pub contact_no: String,
}

impl UserFields {
    /// Current field values of a cached user record
    pub fn from_record(record: &Record) -> Self {
        let text = |field: &str| {
            record
                .text(field)
                .map(|s| s.into_owned())
                .unwrap_or_default()
        };
        Self {
            first_name: text("firstName"),
            second_name: text("secondName"),
            email: text("email"),
            contact_no: text("contactNo"),
        }
    }

    /// Whether any field differs from the cached copy
    pub fn differs_from(&self, record: &Record) -> bool {
        *self != Self::from_record(record)
    }
}

/// A user edit that may change role, password and profile fields at once
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserEdit {
    pub fields: UserFields,
    /// Requested role; applied only when it differs from the cached role
    pub role: Option<String>,
    /// New password; blank means unchanged
    pub password: Option<String>,
}

impl UserEdit {
    pub fn new(fields: UserFields) -> Self {
        Self {
            fields,
            role: None,
            password: None,
        }
    }

    pub fn with_role(mut self, role: impl Into<String>) -> Self {
        self.role = Some(role.into());
        self
    }

    pub fn with_password(mut self, password: impl Into<String>) -> Self {
        self.password = Some(password.into());
        self
    }

    /// Non-blank password, trimmed
    pub fn new_password(&self) -> Option<&str> {
        self.password
            .as_deref()
            .map(str::trim)
            .filter(|p| !p.is_empty())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleChange {
    pub role: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PasswordReset {
    pub password: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusUpdate {
    pub status: String,
}

/// New or edited trip. The admin form sends price and route, the staff
/// form sends name and description; both carry date, times and capacity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TripDraft {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub date: NaiveDate,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<u32>,
    pub capacity: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub route: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub boat: Option<BoatRef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub guide: Option<GuideRef>,
}

/// `{"boatId": ..}` reference inside a trip payload
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BoatRef {
    pub boat_id: RecordId,
}

/// `{"userId": ..}` reference to the trip's guide
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GuideRef {
    pub user_id: RecordId,
}

/// New or edited boat
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BoatDraft {
    pub boat_name: String,
    pub model: String,
    pub registration_number: String,
    pub capacity: u32,
    #[serde(rename = "type")]
    pub boat_type: String,
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub features: Option<String>,
}

/// Check a create payload against the draft type of its entity and return
/// it re-serialized from the draft. Entities without a draft pass through.
pub fn create_payload(entity: EntityType, raw: Value) -> Result<Value> {
    match entity {
        EntityType::Users => through_draft::<UserDraft>(entity, raw),
        EntityType::Trips => through_draft::<TripDraft>(entity, raw),
        EntityType::Boats => through_draft::<BoatDraft>(entity, raw),
        _ => Ok(raw),
    }
}

fn through_draft<T>(entity: EntityType, raw: Value) -> Result<Value>
where
    T: DeserializeOwned + Serialize,
{
    let draft: T = serde_json::from_value(raw).map_err(|e| {
        Failure::new(
            FailureKind::Validation,
            format!("Invalid new {} payload: {}", entity, e),
        )
    })?;
    serde_json::to_value(&draft).map_err(Failure::from)
}

/// Assign a boat and/or guide to a trip. `None` clears that slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssignmentRequest {
    pub trip_id: RecordId,
    pub boat_id: Option<RecordId>,
    pub guide_id: Option<RecordId>,
}

impl AssignmentRequest {
    /// Request that removes both boat and guide from a trip
    pub fn clear(trip_id: RecordId) -> Self {
        Self {
            trip_id,
            boat_id: None,
            guide_id: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn record_uses_entity_identity_field() {
        let record =
            Record::from_value(EntityType::Users, json!({"userId": 7, "firstName": "Jo"})).unwrap();
        assert_eq!(record.id(), 7);
        assert_eq!(record.text("firstName").as_deref(), Some("Jo"));

        let record = Record::from_value(EntityType::Boats, json!({"id": 3})).unwrap();
        assert_eq!(record.id(), 3);
    }

    #[test]
    fn record_without_identity_is_rejected() {
        let err = Record::from_value(EntityType::Trips, json!({"name": "Dawn"})).unwrap_err();
        assert_eq!(err.kind, crate::error::FailureKind::Decode);

        let err = Record::from_value(EntityType::Trips, json!({"tripId": "x"})).unwrap_err();
        assert_eq!(err.kind, crate::error::FailureKind::Decode);

        let err = Record::list_from_value(EntityType::Trips, json!({"tripId": 1})).unwrap_err();
        assert_eq!(err.kind, crate::error::FailureKind::Decode);
    }

    #[test]
    fn record_serializes_to_original_object() {
        let value = json!({"bookingId": 4, "totalCost": 120.5, "trip": {"tripId": 2}});
        let record = Record::from_value(EntityType::Bookings, value.clone()).unwrap();
        assert_eq!(serde_json::to_value(&record).unwrap(), value);
        assert_eq!(record.f64("totalCost"), Some(120.5));
        assert!(record.text("trip").is_none());
    }

    #[test]
    fn null_fields_read_as_absent() {
        let record =
            Record::from_value(EntityType::Users, json!({"userId": 1, "status": null})).unwrap();
        assert!(record.status().is_none());
    }

    #[test]
    fn user_fields_diff_against_record() {
        let record = Record::from_value(
            EntityType::Users,
            json!({"userId": 1, "firstName": "Jo", "secondName": "Doe", "email": "jo@x.io"}),
        )
        .unwrap();
        let mut fields = UserFields::from_record(&record);
        assert_eq!(fields.contact_no, "");
        assert!(!fields.differs_from(&record));
        fields.contact_no = "555".into();
        assert!(fields.differs_from(&record));
    }

    #[test]
    fn assignment_serializes_explicit_nulls() {
        let body = serde_json::to_value(AssignmentRequest::clear(9)).unwrap();
        assert_eq!(body, json!({"tripId": 9, "boatId": null, "guideId": null}));
    }

    #[test]
    fn user_draft_requires_password() {
        let raw = json!({
            "firstName": "Jo",
            "secondName": "Doe",
            "email": "jo@safari.io",
            "contactNo": "555",
            "role": "CUSTOMER"
        });
        let err = create_payload(EntityType::Users, raw.clone()).unwrap_err();
        assert_eq!(err.kind, FailureKind::Validation);
        assert!(err.message.contains("password"));

        let mut with_password = raw;
        with_password["password"] = json!("s3cret");
        let body = create_payload(EntityType::Users, with_password.clone()).unwrap();
        assert_eq!(body, with_password);
    }

    #[test]
    fn trip_draft_accepts_the_admin_form() {
        let raw = json!({
            "date": "2026-11-02",
            "startTime": "06:30:00",
            "endTime": "09:00:00",
            "capacity": 12,
            "price": 45.0,
            "route": "Delta",
            "boat": {"boatId": 3}
        });
        let body = create_payload(EntityType::Trips, raw.clone()).unwrap();
        assert_eq!(body, raw);

        let draft: TripDraft = serde_json::from_value(body).unwrap();
        assert_eq!(draft.date, NaiveDate::from_ymd_opt(2026, 11, 2).unwrap());
        assert_eq!(draft.boat, Some(BoatRef { boat_id: 3 }));
        assert!(draft.guide.is_none());
    }

    #[test]
    fn malformed_drafts_are_validation_failures() {
        let bad_date = json!({
            "date": "next tuesday",
            "startTime": "06:30:00",
            "endTime": "09:00:00",
            "capacity": 12
        });
        let err = create_payload(EntityType::Trips, bad_date).unwrap_err();
        assert_eq!(err.kind, FailureKind::Validation);

        let boat = json!({"boatName": "Orca", "capacity": "many"});
        assert!(create_payload(EntityType::Boats, boat).is_err());
    }

    #[test]
    fn boat_draft_renames_type() {
        let raw = json!({
            "boatName": "Orca",
            "model": "Cat 40",
            "registrationNumber": "BS-12",
            "capacity": 20,
            "type": "CATAMARAN",
            "status": "AVAILABLE"
        });
        let body = create_payload(EntityType::Boats, raw).unwrap();
        assert_eq!(body["type"], "CATAMARAN");
        assert!(body.get("boatType").is_none());
    }

    #[test]
    fn entities_without_drafts_pass_through() {
        let raw = json!({"firstName": "Al", "hireDate": "2026-01-05", "salary": 0});
        assert_eq!(create_payload(EntityType::Staff, raw.clone()).unwrap(), raw);
    }

    #[test]
    fn entity_names_parse() {
        assert_eq!("Boats".parse::<EntityType>().unwrap(), EntityType::Boats);
        assert_eq!("user".parse::<EntityType>().unwrap(), EntityType::Users);
        assert!("crew".parse::<EntityType>().is_err());
    }
}
