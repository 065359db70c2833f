//! Saga pattern implementation for cross-service field updates.
//!
//! This crate orchestrates a change that spans the local user store and
//! one or more downstream services, with compensating actions on failure.
//!
//! The username update saga follows these steps:
//! 1. Update the username in the local user store
//! 2. Ask each downstream service to mirror the change
//!
//! If any step fails, previously completed steps are compensated in reverse
//! order. Execution state lives only in memory for the duration of one run.

pub mod error;
pub mod events;
pub mod execution;
pub mod intent;
pub mod orchestrator;
pub mod result;
pub mod services;
pub mod state;
pub mod step;
pub mod steps;
pub mod username_update;

pub use error::SagaError;
pub use events::SagaEvent;
pub use execution::{CompletedStep, SagaExecutionState};
pub use intent::SagaIntent;
pub use orchestrator::SagaOrchestrator;
pub use result::{CompensationOutcome, SagaFailure, SagaReporter, SagaResult};
pub use services::{
    HttpRemoteService, InMemoryRemoteService, RemoteFieldService, RemoteUpdateRequest,
};
pub use state::SagaStatus;
pub use step::{SagaContext, SagaStep};
pub use steps::{LocalRecordStep, RemoteMirrorStep};
pub use username_update::UsernameUpdateSaga;
