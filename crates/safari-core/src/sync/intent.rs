//! Mutation intents and the steps they decompose into.

use crate::types::{AssignmentRequest, EntityType, RecordId, UserEdit};
use serde_json::Value;
use std::fmt;

/// A user-initiated mutation
#[derive(Debug, Clone, PartialEq)]
pub enum MutationIntent {
    Create {
        entity: EntityType,
        payload: Value,
    },
    Update {
        entity: EntityType,
        id: RecordId,
        payload: Value,
    },
    /// Trip update through the staff endpoint
    StaffTripUpdate { id: RecordId, payload: Value },
    Delete {
        entity: EntityType,
        id: RecordId,
    },
    /// Change a user's role. The backend may answer with a new identity.
    RoleChange { id: RecordId, role: String },
    /// Role change, password reset and profile update as one intent
    EditUser { id: RecordId, edit: UserEdit },
    /// Boat status change through its dedicated endpoint
    SetBoatStatus { id: RecordId, status: String },
    /// Booking cancellation is a status update, not a delete
    CancelBooking { id: RecordId },
    Assign(AssignmentRequest),
    Unassign { trip_id: RecordId },
}

impl MutationIntent {
    /// Entity type whose submit control is held while the intent runs
    pub fn entity(&self) -> EntityType {
        match self {
            MutationIntent::Create { entity, .. }
            | MutationIntent::Update { entity, .. }
            | MutationIntent::Delete { entity, .. } => *entity,
            MutationIntent::StaffTripUpdate { .. } => EntityType::Trips,
            MutationIntent::RoleChange { .. } | MutationIntent::EditUser { .. } => {
                EntityType::Users
            }
            MutationIntent::SetBoatStatus { .. } => EntityType::Boats,
            MutationIntent::CancelBooking { .. } => EntityType::Bookings,
            MutationIntent::Assign(_) | MutationIntent::Unassign { .. } => {
                EntityType::Assignments
            }
        }
    }

    /// Lists re-fetched after the intent takes effect
    pub fn refresh_targets(&self) -> Vec<EntityType> {
        match self {
            MutationIntent::Assign(_) | MutationIntent::Unassign { .. } => {
                vec![EntityType::Trips, EntityType::Assignments]
            }
            MutationIntent::SetBoatStatus { .. } => vec![EntityType::Boats],
            other => vec![other.entity()],
        }
    }

    /// Whether the dashboard statistics are reloaded after the intent.
    /// Staff-side scheduling changes leave the admin counts untouched.
    pub fn refreshes_stats(&self) -> bool {
        !matches!(
            self,
            MutationIntent::StaffTripUpdate { .. }
                | MutationIntent::Assign(_)
                | MutationIntent::Unassign { .. }
        )
    }

    /// Verb phrase used in messages ("update user", "assign resources")
    pub fn action(&self) -> String {
        match self {
            MutationIntent::Create { entity, .. } => format!("create {}", singular(*entity)),
            MutationIntent::Update { entity, .. } => format!("update {}", singular(*entity)),
            MutationIntent::StaffTripUpdate { .. } => "update trip".to_string(),
            MutationIntent::Delete { entity, .. } => format!("delete {}", singular(*entity)),
            MutationIntent::RoleChange { .. } => "update user role".to_string(),
            MutationIntent::EditUser { .. } => "update user".to_string(),
            MutationIntent::SetBoatStatus { .. } => "update boat status".to_string(),
            MutationIntent::CancelBooking { .. } => "cancel booking".to_string(),
            MutationIntent::Assign(_) => "assign resources".to_string(),
            MutationIntent::Unassign { .. } => "remove assignment".to_string(),
        }
    }

    /// Default confirmation when the backend does not send its own message
    pub fn success_message(&self) -> String {
        match self {
            MutationIntent::Create { entity, .. } => {
                format!("{} created successfully", capitalized(singular(*entity)))
            }
            MutationIntent::Update { entity, .. } => {
                format!("{} updated successfully", capitalized(singular(*entity)))
            }
            MutationIntent::StaffTripUpdate { .. } => "Trip updated successfully".to_string(),
            MutationIntent::Delete { entity, .. } => {
                format!("{} deleted successfully", capitalized(singular(*entity)))
            }
            MutationIntent::RoleChange { .. } => "User role updated successfully".to_string(),
            MutationIntent::EditUser { .. } => "User updated successfully".to_string(),
            MutationIntent::SetBoatStatus { .. } => "Boat status updated successfully".to_string(),
            MutationIntent::CancelBooking { .. } => "Booking cancelled successfully".to_string(),
            MutationIntent::Assign(_) => "Resources assigned successfully".to_string(),
            MutationIntent::Unassign { .. } => "Assignment removed successfully".to_string(),
        }
    }
}

/// One backend call inside an intent
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Step {
    Create,
    Update,
    Delete,
    ChangeRole,
    ResetPassword,
    UpdateFields,
    UpdateStatus,
    Assign,
    Unassign,
}

impl Step {
    pub fn label(&self) -> &'static str {
        match self {
            Step::Create => "create",
            Step::Update => "update",
            Step::Delete => "delete",
            Step::ChangeRole => "role change",
            Step::ResetPassword => "password reset",
            Step::UpdateFields => "user details update",
            Step::UpdateStatus => "status update",
            Step::Assign => "resource assignment",
            Step::Unassign => "assignment removal",
        }
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

pub fn singular(entity: EntityType) -> &'static str {
    match entity {
        EntityType::Users => "user",
        EntityType::Trips => "trip",
        EntityType::Bookings => "booking",
        EntityType::Staff => "staff member",
        EntityType::Boats => "boat",
        EntityType::Guides => "guide",
        EntityType::Assignments => "assignment",
    }
}

pub(crate) fn capitalized(text: &str) -> String {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn assignment_intents_refresh_trips_and_assignments() {
        let intent = MutationIntent::Assign(AssignmentRequest::clear(3));
        assert_eq!(intent.entity(), EntityType::Assignments);
        assert_eq!(
            intent.refresh_targets(),
            vec![EntityType::Trips, EntityType::Assignments]
        );
        assert!(!intent.refreshes_stats());
    }

    #[test]
    fn admin_intents_reload_stats() {
        let delete = MutationIntent::Delete {
            entity: EntityType::Boats,
            id: 2,
        };
        assert!(delete.refreshes_stats());
        assert!(MutationIntent::CancelBooking { id: 1 }.refreshes_stats());
        let staff = MutationIntent::StaffTripUpdate {
            id: 1,
            payload: Value::Null,
        };
        assert!(!staff.refreshes_stats());
    }

    #[test]
    fn messages_name_the_entity() {
        let intent = MutationIntent::Delete {
            entity: EntityType::Staff,
            id: 1,
        };
        assert_eq!(intent.action(), "delete staff member");
        assert_eq!(intent.success_message(), "Staff member deleted successfully");
    }
}
