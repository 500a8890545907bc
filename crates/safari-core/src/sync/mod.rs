//! Mutation sync: intents go to the remote store, then the affected lists
//! are re-fetched into the shared cache.

pub mod coordinator;
pub mod intent;
pub mod outcome;

pub use coordinator::SyncCoordinator;
pub use intent::{MutationIntent, Step};
pub use outcome::{MutationOutcome, OutcomeState, StepReport, StepResult, SubmitState};
