//! Job lifecycle state machine.
//!
//! Everything in here is pure: it takes a job snapshot and an actor and
//! either decides what to show or produces the next snapshot. Persistence
//! and notifications live in [`crate::service`].

pub mod affordances;
pub mod error;
pub mod job;
pub mod role;
pub mod transition;

pub use affordances::Affordances;
pub use error::WorkflowError;
pub use job::{DocumentRef, Job, JobStatus, NewJob, QuoteDecision};
pub use role::{Actor, Role};
pub use transition::{
    apply, authorize, can_perform, check_preconditions, create_job, requirement, Action, Step,
    StepRequirement,
};
