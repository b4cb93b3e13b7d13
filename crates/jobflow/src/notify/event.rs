//! Record of an applied workflow step.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::workflow::{Actor, Job, JobStatus, Role, Step};

/// Emitted once per successfully persisted step. Stored in the audit log
/// and turned into a notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowEvent {
    pub job_id: String,
    pub job_number: i64,
    pub step: Step,
    /// Username of the actor who performed the step.
    pub actor: String,
    pub actor_role: Role,
    /// Job status after the step.
    pub status: JobStatus,
    pub occurred_at: DateTime<Utc>,
}

impl WorkflowEvent {
    pub fn new(job: &Job, step: Step, actor: &Actor, occurred_at: DateTime<Utc>) -> Self {
        Self {
            job_id: job.id.clone(),
            job_number: job.number,
            step,
            actor: actor.username.clone(),
            actor_role: actor.role,
            status: job.status(),
            occurred_at,
        }
    }
}
