//! Remote store: the REST backend behind the dashboards.
//!
//! [`Endpoints`] maps every (entity, operation) pair to a method and path.
//! [`RemoteStore`] is the seam between the sync layer and the network: an
//! implementation only has to execute one [`Route`], the typed helpers on the
//! trait take care of routing and shape validation.

mod http;

pub use http::HttpStore;

use crate::error::{Failure, Result};
use crate::types::{EntityType, Record, RecordId};
use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use std::fmt;

/// HTTP method of a route
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    Get,
    Post,
    Put,
    Delete,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Delete => "DELETE",
        }
    }
}

/// Logical operation against an entity endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    List,
    /// Public list used to populate selectors (`/api/boats`)
    ListAvailable,
    Get,
    Create,
    Update,
    /// Trip update issued from the staff dashboard
    StaffUpdate,
    Delete,
    ChangeRole,
    ResetPassword,
    UpdateStatus,
}

impl Operation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::List => "list",
            Operation::ListAvailable => "list_available",
            Operation::Get => "get",
            Operation::Create => "create",
            Operation::Update => "update",
            Operation::StaffUpdate => "staff_update",
            Operation::Delete => "delete",
            Operation::ChangeRole => "change_role",
            Operation::ResetPassword => "reset_password",
            Operation::UpdateStatus => "update_status",
        }
    }

    fn needs_id(&self) -> bool {
        !matches!(
            self,
            Operation::List | Operation::ListAvailable | Operation::Create
        )
    }
}

/// A resolved backend call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Route {
    pub entity: EntityType,
    pub operation: Operation,
    pub method: Method,
    pub path: String,
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.method.as_str(), self.path)
    }
}

/// Endpoint table of the booking backend
#[derive(Debug, Clone, Copy, Default)]
pub struct Endpoints;

impl Endpoints {
    /// Resolve a route. Unsupported pairs fail with a precondition failure
    /// before anything touches the network.
    pub fn route(entity: EntityType, operation: Operation, id: Option<RecordId>) -> Result<Route> {
        use EntityType::*;
        use Method::*;
        use Operation as Op;

        if operation.needs_id() && id.is_none() {
            return Err(Failure::precondition(format!(
                "{} on {} requires a record id",
                operation.as_str(),
                entity
            )));
        }
        let id = id.unwrap_or_default();

        let (method, path) = match (entity, operation) {
            (Users, Op::List) => (Get, "/api/admin/users".to_string()),
            (Users, Op::Create) => (Post, "/api/admin/users".to_string()),
            (Users, Op::Update) => (Put, format!("/api/admin/users/{}", id)),
            (Users, Op::Delete) => (Delete, format!("/api/admin/users/{}", id)),
            (Users, Op::ChangeRole) => (Put, format!("/api/admin/users/{}/role", id)),
            (Users, Op::ResetPassword) => (Put, format!("/api/admin/users/{}/password", id)),

            (Trips, Op::List) => (Get, "/api/trips".to_string()),
            (Trips, Op::Get) => (Get, format!("/api/staff/trips/{}", id)),
            (Trips, Op::Create) => (Post, "/api/trips".to_string()),
            (Trips, Op::Update) => (Put, format!("/api/trips/{}", id)),
            (Trips, Op::StaffUpdate) => (Put, format!("/api/staff/trips/{}", id)),
            (Trips, Op::Delete) => (Delete, format!("/api/trips/{}", id)),

            (Bookings, Op::List) => (Get, "/api/bookings".to_string()),
            (Bookings, Op::Get) => (Get, format!("/api/bookings/{}", id)),
            (Bookings, Op::Update) => (Put, format!("/api/bookings/{}", id)),

            (Staff, Op::List) => (Get, "/api/staff/all".to_string()),
            (Staff, Op::Create) => (Post, "/api/staff".to_string()),
            (Staff, Op::Update) => (Put, format!("/api/staff/{}", id)),

            (Boats, Op::List) => (Get, "/api/admin/boats".to_string()),
            (Boats, Op::ListAvailable) => (Get, "/api/boats".to_string()),
            (Boats, Op::Get) => (Get, format!("/api/admin/boats/{}", id)),
            (Boats, Op::Create) => (Post, "/api/admin/boats".to_string()),
            (Boats, Op::Update) => (Put, format!("/api/admin/boats/{}", id)),
            (Boats, Op::UpdateStatus) => (Put, format!("/api/admin/boats/{}/status", id)),
            (Boats, Op::Delete) => (Delete, format!("/api/admin/boats/{}", id)),

            (Guides, Op::List) => (Get, "/api/guides".to_string()),

            (Assignments, Op::List) => (Get, "/api/staff/assignments".to_string()),
            (Assignments, Op::Create) => (Post, "/api/staff/assign-resources".to_string()),
            (Assignments, Op::Delete) => (Delete, format!("/api/staff/assignments/{}", id)),

            (entity, operation) => {
                return Err(Failure::precondition(format!(
                    "{} does not support {}",
                    entity,
                    operation.as_str()
                )))
            }
        };

        Ok(Route {
            entity,
            operation,
            method,
            path,
        })
    }
}

/// Access to the REST backend.
///
/// Implementations never retry. Non-2xx answers come back as a [`Failure`];
/// a 2xx answer with an empty body comes back as `Value::Null`.
#[async_trait]
pub trait RemoteStore: Send + Sync {
    /// Execute one resolved route with an optional JSON body
    async fn execute(&self, route: &Route, body: Option<Value>) -> Result<Value>;

    /// Fetch the full ordered list of an entity type
    async fn list(&self, entity: EntityType) -> Result<Vec<Record>> {
        let route = Endpoints::route(entity, Operation::List, None)?;
        let body = self.execute(&route, None).await?;
        Record::list_from_value(entity, body)
    }

    /// Fetch the public list that feeds selection controls. Only boats have
    /// one; it includes boats already assigned to a trip.
    async fn list_available(&self, entity: EntityType) -> Result<Vec<Record>> {
        let route = Endpoints::route(entity, Operation::ListAvailable, None)?;
        let body = self.execute(&route, None).await?;
        Record::list_from_value(entity, body)
    }

    /// Fetch one record
    async fn get(&self, entity: EntityType, id: RecordId) -> Result<Record> {
        let route = Endpoints::route(entity, Operation::Get, Some(id))?;
        match self.execute(&route, None).await? {
            Value::Null => Err(Failure::not_found(format!("{} {}", entity, id))),
            body => Record::from_value(entity, body),
        }
    }

    /// Create a record; returns the echoed record when the backend sends one
    async fn create(&self, entity: EntityType, payload: Value) -> Result<Option<Record>> {
        self.invoke(entity, Operation::Create, None, Some(payload))
            .await
    }

    /// Update a record; returns the echoed record when the backend sends one
    async fn update(
        &self,
        entity: EntityType,
        id: RecordId,
        payload: Value,
    ) -> Result<Option<Record>> {
        self.invoke(entity, Operation::Update, Some(id), Some(payload))
            .await
    }

    /// Delete a record
    async fn delete(&self, entity: EntityType, id: RecordId) -> Result<()> {
        self.invoke(entity, Operation::Delete, Some(id), None)
            .await
            .map(|_| ())
    }

    /// Run any routed operation and interpret the body as an optional echo
    async fn invoke(
        &self,
        entity: EntityType,
        operation: Operation,
        id: Option<RecordId>,
        payload: Option<Value>,
    ) -> Result<Option<Record>> {
        let route = Endpoints::route(entity, operation, id)?;
        let body = self.execute(&route, payload).await?;
        Ok(echo(entity, body))
    }
}

/// A mutation response is either the affected record or a bare message.
pub(crate) fn echo(entity: EntityType, body: Value) -> Option<Record> {
    if body.is_object() {
        Record::from_value(entity, body).ok()
    } else {
        None
    }
}

/// Serialize a typed payload for a store call
pub fn payload<T: Serialize>(value: &T) -> Result<Value> {
    serde_json::to_value(value).map_err(Failure::from)
}
