//! Job service: the entry points callers use.
//!
//! Each write loads the job, runs the state machine, persists the result
//! with a version check and records an audit event, all in one transaction.
//! Notifications go out after the commit.

use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;
use tokio::sync::broadcast;
use tracing::{debug, info, info_span, warn};
use uuid::Uuid;

use crate::config::{Config, WorkflowConfig};
use crate::db::job_repo::{self, JobFilter};
use crate::db::{default_database_path, event_repo, Database};
use crate::error::{ConfigError, JobflowError, Result};
use crate::export::{self, CsvExport};
use crate::media::{self, DocumentKind, MediaStore};
use crate::notify::{
    self, BroadcastDispatcher, Dispatcher, LogDispatcher, Notification, WorkflowEvent,
};
use crate::workflow::{
    self, Action, Actor, Affordances, DocumentRef, Job, JobStatus, NewJob, Role, Step,
    WorkflowError,
};

/// A job together with what the viewer may do next.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct JobView {
    pub job: Job,
    pub status: JobStatus,
    pub affordances: Affordances,
}

/// One page of a job listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct JobPage {
    pub jobs: Vec<Job>,
    /// Matching jobs across all pages.
    pub total: u64,
}

impl JobPage {
    /// Whether jobs beyond this page match the filter.
    pub fn truncated(&self, offset: u64) -> bool {
        offset + (self.jobs.len() as u64) < self.total
    }
}

pub struct JobService {
    db: Database,
    workflow: WorkflowConfig,
    media: MediaStore,
    dispatcher: Arc<dyn Dispatcher>,
    broadcast: Option<BroadcastDispatcher>,
    from_address: String,
}

impl JobService {
    pub fn new(
        db: Database,
        workflow: WorkflowConfig,
        media: MediaStore,
        dispatcher: Arc<dyn Dispatcher>,
        from_address: impl Into<String>,
    ) -> Self {
        Self {
            db,
            workflow,
            media,
            dispatcher,
            broadcast: None,
            from_address: from_address.into(),
        }
    }

    /// Opens the configured database, keeps uploads under
    /// `media_directory` and picks the dispatcher: logging only when
    /// `skip_send` is set, otherwise a broadcast channel reachable through
    /// [`JobService::subscribe`].
    pub fn from_config(config: &Config) -> Result<Self> {
        let path = match config.database_path {
            Some(ref path) => path.clone(),
            None => default_database_path().ok_or_else(|| ConfigError::Validation {
                message: "no database_path configured and no home directory found".to_string(),
            })?,
        };
        let db = Database::open(&path)?;
        let media = MediaStore::new(&config.media_directory);

        let notifications = &config.notifications;
        let service = if notifications.skip_send {
            Self::new(
                db,
                config.workflow.clone(),
                media,
                Arc::new(LogDispatcher),
                &notifications.from_address,
            )
        } else {
            let broadcaster = BroadcastDispatcher::new(notifications.channel_capacity);
            let mut service = Self::new(
                db,
                config.workflow.clone(),
                media,
                Arc::new(broadcaster.clone()),
                &notifications.from_address,
            );
            service.broadcast = Some(broadcaster);
            service
        };

        info!(
            database = %path.display(),
            media = %config.media_directory,
            skip_send = notifications.skip_send,
            "Job service ready"
        );
        Ok(service)
    }

    /// Receiver for outgoing notifications, when they are broadcast.
    pub fn subscribe(&self) -> Option<broadcast::Receiver<Notification>> {
        self.broadcast.as_ref().map(|b| b.subscribe())
    }

    pub fn workflow_config(&self) -> &WorkflowConfig {
        &self.workflow
    }

    pub fn database(&self) -> &Database {
        &self.db
    }

    pub fn media(&self) -> &MediaStore {
        &self.media
    }

    pub fn create_job(&self, actor: &Actor, details: NewJob) -> Result<Job> {
        let _span = info_span!("job.create", actor = %actor).entered();

        let (job, event) = self.db.with_transaction(|tx| -> Result<(Job, WorkflowEvent)> {
            let number = job_repo::next_number(tx)?;
            let now = Utc::now();
            let job = workflow::create_job(
                actor,
                Uuid::new_v4().to_string(),
                number,
                details,
                &self.workflow,
                now,
            )?;
            job_repo::insert(tx, &job)?;

            let event = WorkflowEvent::new(&job, Step::Create, actor, now);
            event_repo::record(tx, &event)?;
            Ok((job, event))
        })?;

        info!(job_number = job.number, agent = %job.agent, "Created job");
        self.notify(&event, &job);
        Ok(job)
    }

    /// Loads a job the actor is allowed to see.
    pub fn get_job(&self, actor: &Actor, id: &str) -> Result<Job> {
        let job = job_repo::find_by_id(&self.db, id)?.ok_or_else(|| not_found(id))?;
        self.ensure_visible(actor, &job)?;
        Ok(job)
    }

    pub fn job_view(&self, actor: &Actor, id: &str) -> Result<JobView> {
        let job = self.get_job(actor, id)?;
        let affordances = Affordances::for_actor(&job, actor, &self.workflow);
        Ok(JobView {
            status: job.status(),
            affordances,
            job,
        })
    }

    /// Applies `action` to the job, persists it and notifies.
    pub fn perform(&self, actor: &Actor, id: &str, action: Action) -> Result<Job> {
        self.perform_checked(actor, id, None, action)
    }

    /// Like [`JobService::perform`], but refuses with a precondition error
    /// unless the job is still at `expected_version` (the version the
    /// caller based its request on).
    pub fn perform_if_version(
        &self,
        actor: &Actor,
        id: &str,
        expected_version: i64,
        action: Action,
    ) -> Result<Job> {
        self.perform_checked(actor, id, Some(expected_version), action)
    }

    fn perform_checked(
        &self,
        actor: &Actor,
        id: &str,
        expected_version: Option<i64>,
        action: Action,
    ) -> Result<Job> {
        let step = action.step();
        let _span = info_span!("job.perform", job_id = %id, step = %step, actor = %actor).entered();

        let (job, event) = self.db.with_transaction(|tx| -> Result<(Job, WorkflowEvent)> {
            let current = job_repo::find_by_id_in(tx, id)?.ok_or_else(|| not_found(id))?;
            let stale = || WorkflowError::Precondition {
                step,
                reason: format!("job #{} was changed by another request", current.number),
            };

            if expected_version.is_some_and(|v| v != current.version) {
                return Err(stale().into());
            }

            let now = Utc::now();
            let mut next = workflow::apply(&current, actor, action, &self.workflow, now)?;
            if !job_repo::update(tx, &next, current.version)? {
                return Err(stale().into());
            }
            next.version = current.version + 1;

            let event = WorkflowEvent::new(&next, step, actor, now);
            event_repo::record(tx, &event)?;
            Ok((next, event))
        })?;

        info!(job_number = job.number, status = %job.status(), "Job updated");
        self.notify(&event, &job);
        Ok(job)
    }

    /// One page of the jobs visible to the actor, ordered by number, with
    /// the total number of matches. Without a `limit` the page holds at most
    /// [`job_repo::DEFAULT_PAGE_SIZE`] jobs. Agents only ever get their own
    /// jobs when ownership is enforced.
    pub fn list_jobs(&self, actor: &Actor, filter: JobFilter) -> Result<JobPage> {
        let mut filter = filter;
        if actor.role == Role::Agent && self.workflow.enforce_agent_ownership {
            filter.agent = Some(actor.username.clone());
        }
        let (jobs, total) = job_repo::query(&self.db, &filter)?;
        debug!(actor = %actor, returned = jobs.len(), total, "Listed jobs");
        Ok(JobPage { jobs, total })
    }

    /// Audit history of a job, oldest first.
    pub fn job_events(&self, actor: &Actor, id: &str) -> Result<Vec<WorkflowEvent>> {
        let job = self.get_job(actor, id)?;
        Ok(event_repo::list_for_job(&self.db, &job.id)?)
    }

    /// CSV of all jobs of `agent`. Only that agent may export them.
    pub fn export_agent_jobs(&self, actor: &Actor, agent: &str) -> Result<CsvExport> {
        if actor.role != Role::Agent || actor.username != agent {
            return Err(JobflowError::Forbidden {
                reason: format!("{} may not export the jobs of {}", actor, agent),
            });
        }

        let filter = JobFilter {
            agent: Some(agent.to_string()),
            limit: Some(i64::MAX as u64),
            ..Default::default()
        };
        let (jobs, _) = job_repo::query(&self.db, &filter)?;
        if jobs.is_empty() {
            return Err(JobflowError::NotFound {
                what: format!("jobs for agent {}", agent),
            });
        }

        let csv = export::render(agent, &jobs, Utc::now())?;
        info!(agent = %agent, jobs = jobs.len(), filename = %csv.filename, "Exported jobs");
        Ok(csv)
    }

    /// Whether the actor may download the media file at `path`.
    ///
    /// Malformed paths are always denied. Workers and admins may read any
    /// file; agents only files referenced by their own jobs.
    pub fn can_access_media(&self, actor: &Actor, path: &str) -> Result<bool> {
        let Some((kind, _)) = media::classify(path) else {
            debug!(actor = %actor, path = %path, "Denied malformed media path");
            return Ok(false);
        };

        match actor.role {
            Role::Admin | Role::Worker => Ok(true),
            Role::Agent => {
                let owner = job_repo::find_owner_by_document(&self.db, kind, path)?;
                let allowed = match owner {
                    Some(owner) if self.workflow.enforce_agent_ownership => {
                        owner == actor.username
                    }
                    Some(_) => true,
                    None => false,
                };
                Ok(allowed)
            }
        }
    }

    /// Saves an upload under the media root and returns the reference to
    /// pass in the matching [`Action`].
    pub fn store_document(
        &self,
        actor: &Actor,
        kind: DocumentKind,
        file_name: &str,
        content: &[u8],
    ) -> Result<DocumentRef> {
        let _span = info_span!("media.store", actor = %actor, kind = %kind).entered();
        Ok(self.media.store(kind, file_name, content)?)
    }

    /// Contents of the media file at `path`, if the actor may read it.
    pub fn read_media(&self, actor: &Actor, path: &str) -> Result<Vec<u8>> {
        if !self.can_access_media(actor, path)? {
            return Err(JobflowError::Forbidden {
                reason: format!("{} may not read {}", actor, path),
            });
        }
        Ok(self.media.read(path)?)
    }

    fn ensure_visible(&self, actor: &Actor, job: &Job) -> Result<()> {
        if actor.role == Role::Agent
            && self.workflow.enforce_agent_ownership
            && !job.is_owned_by(&actor.username)
        {
            return Err(JobflowError::Forbidden {
                reason: format!("job #{} belongs to another agent", job.number),
            });
        }
        Ok(())
    }

    fn notify(&self, event: &WorkflowEvent, job: &Job) {
        let notification = notify::render(event, job, &self.from_address);
        if let Err(e) = self.dispatcher.dispatch(&notification) {
            warn!(
                job_number = job.number,
                step = %event.step,
                "Failed to dispatch notification: {}",
                e
            );
        }
    }
}

fn not_found(id: &str) -> JobflowError {
    JobflowError::NotFound {
        what: format!("job {}", id),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notify::DispatchError;
    use chrono::NaiveDate;

    /// Dispatcher whose every send fails.
    struct FailingDispatcher;

    impl Dispatcher for FailingDispatcher {
        fn dispatch(&self, _notification: &Notification) -> std::result::Result<(), DispatchError> {
            Err(DispatchError::Unavailable("mail relay down".to_string()))
        }
    }

    fn service_with(dispatcher: Arc<dyn Dispatcher>) -> JobService {
        let db = Database::open_in_memory().unwrap();
        let media = MediaStore::new(std::env::temp_dir().join("jobflow-unit-media"));
        JobService::new(
            db,
            WorkflowConfig::default(),
            media,
            dispatcher,
            "noreply@example.com",
        )
    }

    fn service() -> (JobService, BroadcastDispatcher) {
        let broadcaster = BroadcastDispatcher::new(16);
        (service_with(Arc::new(broadcaster.clone())), broadcaster)
    }

    fn inspection() -> Action {
        Action::CompleteInspection {
            date_of_inspection: NaiveDate::from_ymd_opt(2026, 6, 2).unwrap(),
        }
    }

    fn details() -> NewJob {
        NewJob {
            date: NaiveDate::from_ymd_opt(2026, 6, 1).unwrap(),
            address_details: "3 Pine Avenue".to_string(),
            gps_link: "https://maps.example.com/?q=3".to_string(),
            quote_request_details: "Fix the gate".to_string(),
        }
    }

    #[test]
    fn test_create_assigns_sequential_numbers() {
        let (service, _) = service();
        let alice = Actor::agent("alice");
        let first = service.create_job(&alice, details()).unwrap();
        let second = service.create_job(&alice, details()).unwrap();
        assert_eq!(first.number, 1);
        assert_eq!(second.number, 2);
        assert_ne!(first.id, second.id);
    }

    #[test]
    fn test_perform_persists_and_notifies() {
        let (service, broadcaster) = service();
        let mut rx = broadcaster.subscribe();
        let job = service.create_job(&Actor::agent("alice"), details()).unwrap();
        assert_eq!(rx.try_recv().unwrap().step, Step::Create);

        let updated = service
            .perform(&Actor::worker("manie"), &job.id, inspection())
            .unwrap();
        assert_eq!(updated.version, 1);

        let reloaded = service.get_job(&Actor::worker("manie"), &job.id).unwrap();
        assert_eq!(reloaded, updated);
        assert_eq!(reloaded.status(), JobStatus::InspectionCompleted);

        let sent = rx.try_recv().unwrap();
        assert_eq!(
            sent.subject,
            "Manie completed an inspection for your maintenance request"
        );
    }

    #[test]
    fn test_refused_step_writes_nothing() {
        let (service, broadcaster) = service();
        let job = service.create_job(&Actor::agent("alice"), details()).unwrap();
        let mut rx = broadcaster.subscribe();

        let err = service
            .perform(
                &Actor::worker("manie"),
                &job.id,
                Action::UploadQuote {
                    quote: DocumentRef::new("quotes/q.pdf"),
                },
            )
            .unwrap_err();
        assert!(err.as_workflow().is_some_and(|e| e.is_precondition()));

        let reloaded = service.get_job(&Actor::agent("alice"), &job.id).unwrap();
        assert_eq!(reloaded, job);
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_failed_dispatch_keeps_the_transition() {
        let service = service_with(Arc::new(FailingDispatcher));
        let alice = Actor::agent("alice");
        let manie = Actor::worker("manie");

        let job = service.create_job(&alice, details()).unwrap();
        let updated = service.perform(&manie, &job.id, inspection()).unwrap();
        assert_eq!(updated.version, 1);

        let reloaded = service.get_job(&manie, &job.id).unwrap();
        assert_eq!(reloaded.version, 1);
        assert_eq!(reloaded.status(), JobStatus::InspectionCompleted);

        let steps: Vec<Step> = service
            .job_events(&manie, &job.id)
            .unwrap()
            .into_iter()
            .map(|e| e.step)
            .collect();
        assert_eq!(steps, vec![Step::Create, Step::CompleteInspection]);
    }

    #[test]
    fn test_misfiled_quote_is_refused() {
        let (service, _) = service();
        let manie = Actor::worker("manie");
        let job = service.create_job(&Actor::agent("alice"), details()).unwrap();
        service.perform(&manie, &job.id, inspection()).unwrap();

        let err = service
            .perform(
                &manie,
                &job.id,
                Action::UploadQuote {
                    quote: DocumentRef::new("invoices/q.pdf"),
                },
            )
            .unwrap_err();
        assert!(err.as_workflow().is_some_and(|e| e.is_validation()));
        assert!(service.get_job(&manie, &job.id).unwrap().quote.is_none());
    }

    #[test]
    fn test_unknown_job_is_not_found() {
        let (service, _) = service();
        let err = service
            .perform(&Actor::agent("alice"), "missing", Action::AcceptQuote)
            .unwrap_err();
        assert!(matches!(err, JobflowError::NotFound { .. }));
    }
}
