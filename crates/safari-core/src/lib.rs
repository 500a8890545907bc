//! Core of the safari admin and staff dashboards: the REST store client, the
//! per-entity cache, local filtering, mutation sync, statistics and export.

pub mod cache;
pub mod error;
pub mod export;
pub mod filter;
pub mod notify;
pub mod render;
pub mod stats;
pub mod store;
pub mod sync;
pub mod test_utils;
pub mod types;

pub use cache::{EntityCache, SharedCache};
pub use error::{Failure, FailureKind, Result};
pub use export::{ExportError, ExportFormat};
pub use filter::{FilterEngine, FilterProfile, FilterSpec, FilteredView, Selector};
pub use notify::{Level, Notification};
pub use stats::{ChartSeries, DashboardStats};
pub use store::{Endpoints, HttpStore, Method, Operation, RemoteStore, Route};
pub use sync::{MutationIntent, MutationOutcome, OutcomeState, SubmitState, SyncCoordinator};
pub use types::{
    create_payload, AssignmentRequest, BoatDraft, BoatRef, EntityType, GuideRef, Record,
    RecordId, TripDraft, UserDraft, UserEdit, UserFields,
};
