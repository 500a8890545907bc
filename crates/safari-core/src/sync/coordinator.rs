//! Mutation coordinator: remote write, then full list refresh, then report.
use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use futures::future::join_all;
use serde_json::{json, Value};
use tracing::{debug, error, info, warn};

use super::intent::{MutationIntent, Step};
use super::outcome::{MutationOutcome, OutcomeState, StepReport, SubmitState};
use crate::cache::SharedCache;
use crate::error::{Failure, Result};
use crate::stats::{self, DashboardStats};
use crate::store::{echo, payload, Endpoints, Operation, RemoteStore};
use crate::types::{
    AssignmentRequest, EntityType, PasswordReset, Record, RecordId, RoleChange, StatusUpdate,
    UserEdit,
};

/// Sequences the backend calls of one intent, then re-syncs the cache.
///
/// The cache is never patched from mutation echoes: every successful intent
/// triggers a full re-fetch of the affected lists, and admin-side intents
/// also reload the dashboard statistics.
pub struct SyncCoordinator {
    store: Arc<dyn RemoteStore>,
    cache: SharedCache,
    submitting: Mutex<HashSet<EntityType>>,
}

/// Holds the submit control of one entity type until dropped
struct SubmitGuard<'a> {
    submitting: &'a Mutex<HashSet<EntityType>>,
    entity: EntityType,
}

impl Drop for SubmitGuard<'_> {
    fn drop(&mut self) {
        if let Ok(mut set) = self.submitting.lock() {
            set.remove(&self.entity);
        }
    }
}

/// Steps and terminal state of an intent before the refresh
struct Execution {
    state: OutcomeState,
    steps: Vec<StepReport>,
    failure: Option<Failure>,
    record_id: Option<RecordId>,
    message: Option<String>,
}

impl Execution {
    fn single(step: Step, result: Result<Value>, record_id: Option<RecordId>) -> Self {
        match result {
            Ok(body) => Self {
                state: OutcomeState::Success,
                steps: vec![StepReport::done(step)],
                failure: None,
                record_id,
                message: backend_message(&body),
            },
            Err(failure) => Self::failed(vec![StepReport::failed(step, failure.clone())], failure),
        }
    }

    fn failed(steps: Vec<StepReport>, failure: Failure) -> Self {
        Self {
            state: OutcomeState::Failed,
            steps,
            failure: Some(failure),
            record_id: None,
            message: None,
        }
    }
}

impl SyncCoordinator {
    pub fn new(store: Arc<dyn RemoteStore>, cache: SharedCache) -> Self {
        Self {
            store,
            cache,
            submitting: Mutex::new(HashSet::new()),
        }
    }

    pub fn cache(&self) -> &SharedCache {
        &self.cache
    }

    pub fn store(&self) -> &Arc<dyn RemoteStore> {
        &self.store
    }

    /// Whether a mutation on `entity` is in flight
    pub fn submit_state(&self, entity: EntityType) -> SubmitState {
        let busy = self
            .submitting
            .lock()
            .map(|set| set.contains(&entity))
            .unwrap_or(false);
        if busy {
            SubmitState::Submitting
        } else {
            SubmitState::Idle
        }
    }

    fn begin(&self, entity: EntityType) -> Option<SubmitGuard<'_>> {
        let mut set = self.submitting.lock().ok()?;
        if !set.insert(entity) {
            return None;
        }
        Some(SubmitGuard {
            submitting: &self.submitting,
            entity,
        })
    }

    /// Re-fetch one list and swap it into the cache
    pub async fn refresh(&self, entity: EntityType) -> Result<usize> {
        let records = self.store.list(entity).await.map_err(|e| {
            warn!(entity = %entity, "refresh failed: {}", e);
            e
        })?;
        let count = records.len();
        self.cache.write().await.replace_all(entity, records);
        info!(entity = %entity, count, "list refreshed");
        Ok(count)
    }

    /// Refresh several lists concurrently; the first failure is returned
    /// after every fetch has settled.
    pub async fn refresh_all(&self, entities: &[EntityType]) -> Result<()> {
        let results = join_all(entities.iter().map(|e| self.refresh(*e))).await;
        results.into_iter().find_map(|r| r.err()).map_or(Ok(()), Err)
    }

    /// Load the dashboard statistics, replacing every slot that loaded
    pub async fn load_stats(&self) -> DashboardStats {
        stats::load_dashboard_stats(self.store.as_ref(), &self.cache).await
    }

    pub async fn create(&self, entity: EntityType, payload: Value) -> MutationOutcome {
        self.submit(MutationIntent::Create { entity, payload }).await
    }

    pub async fn update(&self, entity: EntityType, id: RecordId, payload: Value) -> MutationOutcome {
        self.submit(MutationIntent::Update {
            entity,
            id,
            payload,
        })
        .await
    }

    /// Trip update issued from the staff dashboard
    pub async fn update_trip_as_staff(&self, id: RecordId, payload: Value) -> MutationOutcome {
        self.submit(MutationIntent::StaffTripUpdate { id, payload })
            .await
    }

    pub async fn delete(&self, entity: EntityType, id: RecordId) -> MutationOutcome {
        self.submit(MutationIntent::Delete { entity, id }).await
    }

    pub async fn change_role(&self, id: RecordId, role: impl Into<String>) -> MutationOutcome {
        self.submit(MutationIntent::RoleChange {
            id,
            role: role.into(),
        })
        .await
    }

    pub async fn update_user(&self, id: RecordId, edit: UserEdit) -> MutationOutcome {
        self.submit(MutationIntent::EditUser { id, edit }).await
    }

    pub async fn cancel_booking(&self, id: RecordId) -> MutationOutcome {
        self.submit(MutationIntent::CancelBooking { id }).await
    }

    pub async fn set_boat_status(&self, id: RecordId, status: impl Into<String>) -> MutationOutcome {
        self.submit(MutationIntent::SetBoatStatus {
            id,
            status: status.into(),
        })
        .await
    }

    pub async fn assign_resources(&self, request: AssignmentRequest) -> MutationOutcome {
        self.submit(MutationIntent::Assign(request)).await
    }

    /// Clear boat and guide from a trip through the assignment endpoint
    pub async fn clear_assignment(&self, trip_id: RecordId) -> MutationOutcome {
        self.submit(MutationIntent::Assign(AssignmentRequest::clear(trip_id)))
            .await
    }

    pub async fn remove_assignment(&self, trip_id: RecordId) -> MutationOutcome {
        self.submit(MutationIntent::Unassign { trip_id }).await
    }

    /// Run an intent to completion and report one aggregate outcome
    pub async fn submit(&self, intent: MutationIntent) -> MutationOutcome {
        let entity = intent.entity();
        let action = intent.action();

        let Some(_guard) = self.begin(entity) else {
            let failure = Failure::precondition(format!(
                "Another {} change is still being saved",
                super::intent::singular(entity)
            ));
            warn!(entity = %entity, "rejected concurrent submit: {}", action);
            return MutationOutcome {
                entity,
                state: OutcomeState::Failed,
                steps: Vec::new(),
                message: failure.user_message(),
                failure: Some(failure),
                record_id: None,
                refresh_failure: None,
                stats: None,
            };
        };

        info!(entity = %entity, "submitting: {}", action);
        let execution = self.execute(&intent).await;

        let message = match execution.state {
            OutcomeState::Success => execution
                .message
                .clone()
                .unwrap_or_else(|| intent.success_message()),
            OutcomeState::PartialSuccess => partial_message(&execution.steps),
            OutcomeState::Failed => {
                let detail = execution
                    .failure
                    .as_ref()
                    .map(Failure::user_message)
                    .unwrap_or_default();
                format!("Failed to {}: {}", action, detail)
            }
        };

        let (refresh_failure, stats) = if execution.state == OutcomeState::Failed {
            error!(entity = %entity, "{}", message);
            (None, None)
        } else {
            if execution.state == OutcomeState::PartialSuccess {
                warn!(entity = %entity, "{}", message);
            } else {
                info!(entity = %entity, "{}", message);
            }
            let refresh_failure = self.refresh_all(&intent.refresh_targets()).await.err();
            // Lists that fail here only log and count as zero
            let stats = if intent.refreshes_stats() {
                Some(self.load_stats().await)
            } else {
                None
            };
            (refresh_failure, stats)
        };

        MutationOutcome {
            entity,
            state: execution.state,
            steps: execution.steps,
            message,
            failure: execution.failure,
            record_id: execution.record_id,
            refresh_failure,
            stats,
        }
    }

    async fn call(
        &self,
        entity: EntityType,
        operation: Operation,
        id: Option<RecordId>,
        body: Option<Value>,
    ) -> Result<Value> {
        let route = Endpoints::route(entity, operation, id)?;
        debug!(entity = %entity, "step {}", route);
        self.store.execute(&route, body).await
    }

    async fn execute(&self, intent: &MutationIntent) -> Execution {
        match intent {
            MutationIntent::Create { entity, payload } => {
                let result = self
                    .call(*entity, Operation::Create, None, Some(payload.clone()))
                    .await;
                let id = result
                    .as_ref()
                    .ok()
                    .and_then(|body| echo(*entity, body.clone()))
                    .map(|r| r.id());
                Execution::single(Step::Create, result, id)
            }
            MutationIntent::Update {
                entity,
                id,
                payload,
            } => {
                let result = self
                    .call(*entity, Operation::Update, Some(*id), Some(payload.clone()))
                    .await;
                Execution::single(Step::Update, result, Some(*id))
            }
            MutationIntent::StaffTripUpdate { id, payload } => {
                let result = self
                    .call(
                        EntityType::Trips,
                        Operation::StaffUpdate,
                        Some(*id),
                        Some(payload.clone()),
                    )
                    .await;
                Execution::single(Step::Update, result, Some(*id))
            }
            MutationIntent::Delete { entity, id } => {
                let result = self.call(*entity, Operation::Delete, Some(*id), None).await;
                Execution::single(Step::Delete, result, Some(*id))
            }
            MutationIntent::RoleChange { id, role } => {
                match self.change_role_step(*id, role).await {
                    Ok(new_id) => Execution::single(Step::ChangeRole, Ok(Value::Null), Some(new_id)),
                    Err(failure) => Execution::failed(
                        vec![StepReport::failed(Step::ChangeRole, failure.clone())],
                        failure,
                    ),
                }
            }
            MutationIntent::EditUser { id, edit } => self.edit_user(*id, edit).await,
            MutationIntent::SetBoatStatus { id, status } => {
                let result = match payload(&StatusUpdate {
                    status: status.clone(),
                }) {
                    Ok(body) => {
                        self.call(EntityType::Boats, Operation::UpdateStatus, Some(*id), Some(body))
                            .await
                    }
                    Err(e) => Err(e),
                };
                Execution::single(Step::UpdateStatus, result, Some(*id))
            }
            MutationIntent::CancelBooking { id } => {
                let body = json!({ "status": "CANCELLED" });
                let result = self
                    .call(EntityType::Bookings, Operation::Update, Some(*id), Some(body))
                    .await;
                Execution::single(Step::UpdateStatus, result, Some(*id))
            }
            MutationIntent::Assign(request) => {
                let result = match payload(request) {
                    Ok(body) => {
                        self.call(EntityType::Assignments, Operation::Create, None, Some(body))
                            .await
                    }
                    Err(e) => Err(e),
                };
                Execution::single(Step::Assign, result, Some(request.trip_id))
            }
            MutationIntent::Unassign { trip_id } => {
                let result = self
                    .call(EntityType::Assignments, Operation::Delete, Some(*trip_id), None)
                    .await;
                Execution::single(Step::Unassign, result, Some(*trip_id))
            }
        }
    }

    /// Change a user's role; returns the identity to use from now on
    async fn change_role_step(&self, id: RecordId, role: &str) -> Result<RecordId> {
        let body = payload(&RoleChange {
            role: role.to_string(),
        })?;
        let response = self
            .call(EntityType::Users, Operation::ChangeRole, Some(id), Some(body))
            .await?;
        let new_id = echo(EntityType::Users, response)
            .map(|r| r.id())
            .unwrap_or(id);
        if new_id != id {
            info!(old_id = id, new_id, "role change reassigned user identity");
        }
        Ok(new_id)
    }

    /// Role change, then password reset, then field update, strictly in that
    /// order. Each later step targets the identity produced by the role change.
    ///
    /// The field update runs only when a profile field differs from the cached
    /// user, even after a role change: an edit that only changes the role or
    /// the password sends no field update.
    async fn edit_user(&self, id: RecordId, edit: &UserEdit) -> Execution {
        let cached: Option<Record> = self
            .cache
            .read()
            .await
            .find_by_id(EntityType::Users, id)
            .cloned();
        let Some(cached) = cached else {
            let failure = Failure::precondition(format!(
                "User {} is not in the loaded list; refresh users first",
                id
            ));
            return Execution::failed(Vec::new(), failure);
        };

        let mut steps = Vec::new();
        let mut current_id = id;

        let role_change = edit.role.as_deref().filter(|wanted| {
            cached
                .role()
                .is_some_and(|current| !current.is_empty() && current != *wanted)
        });

        match role_change {
            Some(role) => match self.change_role_step(id, role).await {
                Ok(new_id) => {
                    current_id = new_id;
                    steps.push(StepReport::done(Step::ChangeRole));
                }
                Err(failure) => {
                    steps.push(StepReport::failed(Step::ChangeRole, failure.clone()));
                    return Execution::failed(steps, failure);
                }
            },
            None => steps.push(StepReport::skipped(Step::ChangeRole)),
        }

        match edit.new_password() {
            Some(password) => {
                let result = match payload(&PasswordReset {
                    password: password.to_string(),
                }) {
                    Ok(body) => {
                        self.call(
                            EntityType::Users,
                            Operation::ResetPassword,
                            Some(current_id),
                            Some(body),
                        )
                        .await
                    }
                    Err(e) => Err(e),
                };
                match result {
                    Ok(_) => steps.push(StepReport::done(Step::ResetPassword)),
                    Err(failure) => {
                        steps.push(StepReport::failed(Step::ResetPassword, failure.clone()));
                        steps.push(StepReport::skipped(Step::UpdateFields));
                        return abandon(steps, failure, current_id);
                    }
                }
            }
            None => steps.push(StepReport::skipped(Step::ResetPassword)),
        }

        if edit.fields.differs_from(&cached) {
            let result = match payload(&edit.fields) {
                Ok(body) => {
                    self.call(
                        EntityType::Users,
                        Operation::Update,
                        Some(current_id),
                        Some(body),
                    )
                    .await
                }
                Err(e) => Err(e),
            };
            match result {
                Ok(_) => steps.push(StepReport::done(Step::UpdateFields)),
                Err(failure) => {
                    steps.push(StepReport::failed(Step::UpdateFields, failure.clone()));
                    return abandon(steps, failure, current_id);
                }
            }
        } else {
            debug!(user_id = current_id, "profile fields unchanged, skipping update");
            steps.push(StepReport::skipped(Step::UpdateFields));
        }

        Execution {
            state: OutcomeState::Success,
            steps,
            failure: None,
            record_id: Some(current_id),
            message: None,
        }
    }
}

/// Stop a multi-step intent. Earlier completed steps stay in effect and
/// make the outcome a partial success; with none it is a plain failure.
fn abandon(steps: Vec<StepReport>, failure: Failure, record_id: RecordId) -> Execution {
    if steps.iter().any(StepReport::is_done) {
        Execution {
            state: OutcomeState::PartialSuccess,
            steps,
            failure: Some(failure),
            record_id: Some(record_id),
            message: None,
        }
    } else {
        Execution::failed(steps, failure)
    }
}

fn partial_message(steps: &[StepReport]) -> String {
    let done: Vec<&str> = steps
        .iter()
        .filter(|s| s.is_done())
        .map(|s| s.step.label())
        .collect();
    let failed = steps.iter().find_map(|s| match &s.result {
        super::outcome::StepResult::Failed(f) => Some((s.step, f)),
        _ => None,
    });

    let mut message = format!("Saved {}", done.join(" and "));
    if let Some((step, failure)) = failed {
        message.push_str(&format!(
            ", but the {} failed: {}. Retry it separately.",
            step.label(),
            failure.user_message()
        ));
    }
    message
}

/// Backend confirmation text such as `{"message": "Resources assigned"}`
fn backend_message(body: &Value) -> Option<String> {
    body.get("message")
        .and_then(Value::as_str)
        .map(str::to_string)
        .filter(|m| !m.trim().is_empty())
}
