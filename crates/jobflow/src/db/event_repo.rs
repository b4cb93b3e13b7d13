//! Audit log of applied workflow steps (`job_events` table).

use rusqlite::{params, Connection};

use super::job_repo::{format_timestamp, parse_timestamp};
use super::{Database, DatabaseError};
use crate::notify::WorkflowEvent;
use crate::workflow::{JobStatus, Role, Step};

/// Appends an event. Runs on the caller's connection so it commits together
/// with the job change it describes.
pub fn record(conn: &Connection, event: &WorkflowEvent) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO job_events (job_id, job_number, step, actor, actor_role, status, occurred_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            event.job_id,
            event.job_number,
            event.step.as_str(),
            event.actor,
            event.actor_role.as_str(),
            event.status.as_str(),
            format_timestamp(event.occurred_at),
        ],
    )?;
    Ok(())
}

/// All events for a job, oldest first.
pub fn list_for_job(db: &Database, job_id: &str) -> Result<Vec<WorkflowEvent>, DatabaseError> {
    db.with_conn(|conn| {
        let mut stmt = conn.prepare(
            "SELECT job_id, job_number, step, actor, actor_role, status, occurred_at
             FROM job_events WHERE job_id = ?1 ORDER BY id ASC",
        )?;
        let rows = stmt
            .query_map(params![job_id], |r| {
                Ok((
                    r.get::<_, String>(0)?,
                    r.get::<_, i64>(1)?,
                    r.get::<_, String>(2)?,
                    r.get::<_, String>(3)?,
                    r.get::<_, String>(4)?,
                    r.get::<_, String>(5)?,
                    r.get::<_, String>(6)?,
                ))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        rows.into_iter()
            .map(
                |(job_id, job_number, step, actor, actor_role, status, occurred_at)| {
                    Ok(WorkflowEvent {
                        job_id,
                        job_number,
                        step: Step::parse(&step).ok_or(DatabaseError::InvalidValue {
                            column: "step",
                            value: step.clone(),
                        })?,
                        actor,
                        actor_role: Role::parse(&actor_role).ok_or(
                            DatabaseError::InvalidValue {
                                column: "actor_role",
                                value: actor_role.clone(),
                            },
                        )?,
                        status: JobStatus::parse(&status).ok_or(
                            DatabaseError::InvalidValue {
                                column: "status",
                                value: status.clone(),
                            },
                        )?,
                        occurred_at: parse_timestamp("occurred_at", &occurred_at)?,
                    })
                },
            )
            .collect()
    })
}
