//! Builder patterns for creating test data programmatically.
//!
//! These builders allow creating jobs in any lifecycle state and the
//! actions that move them along without repetitive boilerplate.

#![allow(dead_code)]

use chrono::{NaiveDate, TimeZone, Utc};

use jobflow::config::schema::{Config, LoggingConfig, NotificationConfig, WorkflowConfig};
use jobflow::{Action, Actor, DocumentRef, Job, JobStatus, NewJob, QuoteDecision};

pub fn date(day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 3, day).expect("valid test date")
}

/// Builder for creating `NewJob` instances.
pub struct NewJobBuilder {
    date: NaiveDate,
    address_details: String,
    gps_link: String,
    quote_request_details: String,
}

impl NewJobBuilder {
    pub fn new() -> Self {
        Self {
            date: date(1),
            address_details: "17 Harbour Road, Hout Bay".to_string(),
            gps_link: "https://maps.example.com/?q=17+Harbour+Road".to_string(),
            quote_request_details: "Roof leaks above the kitchen".to_string(),
        }
    }

    pub fn date(mut self, date: NaiveDate) -> Self {
        self.date = date;
        self
    }

    pub fn address_details(mut self, value: &str) -> Self {
        self.address_details = value.to_string();
        self
    }

    pub fn gps_link(mut self, value: &str) -> Self {
        self.gps_link = value.to_string();
        self
    }

    pub fn quote_request_details(mut self, value: &str) -> Self {
        self.quote_request_details = value.to_string();
        self
    }

    pub fn build(self) -> NewJob {
        NewJob {
            date: self.date,
            address_details: self.address_details,
            gps_link: self.gps_link,
            quote_request_details: self.quote_request_details,
        }
    }
}

impl Default for NewJobBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// A job owned by `agent` with the fields populated for `status`.
pub fn job_at(status: JobStatus, agent: &str) -> Job {
    let created = Utc
        .with_ymd_and_hms(2026, 3, 1, 8, 0, 0)
        .single()
        .expect("valid timestamp");
    let mut job = Job::new("job-under-test", 1, agent, NewJobBuilder::new().build(), created);

    let reached = |s: JobStatus| status >= s && status != JobStatus::QuoteRejectedByAgent;
    if status >= JobStatus::InspectionCompleted {
        job.date_of_inspection = Some(date(2));
    }
    if status >= JobStatus::QuoteUploaded {
        job.quote = Some(DocumentRef::new("quotes/quote.pdf"));
    }
    if status == JobStatus::QuoteRejectedByAgent {
        job.accepted_or_rejected = Some(QuoteDecision::Rejected);
    }
    if reached(JobStatus::QuoteAcceptedByAgent) {
        job.accepted_or_rejected = Some(QuoteDecision::Accepted);
    }
    if reached(JobStatus::DepositPopUploaded) {
        job.deposit_proof_of_payment = Some(DocumentRef::new("deposit_pops/deposit.pdf"));
    }
    if reached(JobStatus::OnsiteWorkCompleted) {
        job.job_onsite_work_completion_date = Some(date(10));
    }
    if reached(JobStatus::DocumentationSubmitted) {
        job.invoice = Some(DocumentRef::new("invoices/invoice.pdf"));
        job.job_completion_photos = vec![DocumentRef::new("completion_photos/after.jpg")];
        job.comments = Some("Replaced three tiles".to_string());
    }
    if reached(JobStatus::Complete) {
        job.final_payment_pop = Some(DocumentRef::new("final_payment_pops/final.pdf"));
    }
    assert_eq!(job.status(), status, "job_at built the wrong state");
    job
}

pub fn inspect() -> Action {
    Action::CompleteInspection {
        date_of_inspection: date(2),
    }
}

pub fn upload_quote(name: &str) -> Action {
    Action::UploadQuote {
        quote: DocumentRef::new(format!("quotes/{}", name)),
    }
}

pub fn update_quote(name: &str) -> Action {
    Action::UpdateQuote {
        quote: DocumentRef::new(format!("quotes/{}", name)),
    }
}

pub fn submit_deposit() -> Action {
    Action::SubmitDepositPop {
        deposit_proof_of_payment: DocumentRef::new("deposit_pops/deposit.pdf"),
    }
}

pub fn complete_onsite_work() -> Action {
    Action::CompleteOnsiteWork {
        job_onsite_work_completion_date: date(10),
    }
}

pub fn submit_documentation() -> Action {
    Action::SubmitDocumentation {
        invoice: DocumentRef::new("invoices/invoice.pdf"),
        photos: vec![
            DocumentRef::new("completion_photos/before.jpg"),
            DocumentRef::new("completion_photos/after.png"),
        ],
        comments: Some("Replaced three tiles".to_string()),
    }
}

pub fn submit_final_payment() -> Action {
    Action::SubmitFinalPaymentPop {
        final_payment_pop: DocumentRef::new("final_payment_pops/final.pdf"),
    }
}

/// One well-formed action per non-create step, in lifecycle order.
pub fn sample_actions() -> Vec<Action> {
    vec![
        inspect(),
        upload_quote("quote.pdf"),
        Action::AcceptQuote,
        Action::RejectQuote,
        update_quote("quote_v2.pdf"),
        submit_deposit(),
        complete_onsite_work(),
        submit_documentation(),
        submit_final_payment(),
    ]
}

/// The actions of the happy path after creation, each with the actor
/// that performs it.
pub fn happy_path(agent: &str) -> Vec<(Actor, Action)> {
    let agent = Actor::agent(agent);
    let worker = Actor::worker("manie");
    vec![
        (worker.clone(), inspect()),
        (worker.clone(), upload_quote("quote.pdf")),
        (agent.clone(), Action::AcceptQuote),
        (agent.clone(), submit_deposit()),
        (worker.clone(), complete_onsite_work()),
        (worker, submit_documentation()),
        (agent, submit_final_payment()),
    ]
}

/// Builder for creating `Config` instances.
pub struct ConfigBuilder {
    database_path: Option<std::path::PathBuf>,
    media_directory: String,
    workflow: WorkflowConfig,
    notifications: NotificationConfig,
}

impl ConfigBuilder {
    pub fn new() -> Self {
        Self {
            database_path: None,
            media_directory: "/tmp/media".to_string(),
            workflow: WorkflowConfig::default(),
            notifications: NotificationConfig::default(),
        }
    }

    pub fn database_path(mut self, path: std::path::PathBuf) -> Self {
        self.database_path = Some(path);
        self
    }

    pub fn media_directory(mut self, path: &str) -> Self {
        self.media_directory = path.to_string();
        self
    }

    pub fn admin_may_act(mut self, allowed: bool) -> Self {
        self.workflow.admin_may_act = allowed;
        self
    }

    pub fn enforce_agent_ownership(mut self, enforced: bool) -> Self {
        self.workflow.enforce_agent_ownership = enforced;
        self
    }

    pub fn skip_send(mut self, skip: bool) -> Self {
        self.notifications.skip_send = skip;
        self
    }

    pub fn build(self) -> Config {
        Config {
            version: "1.0".to_string(),
            database_path: self.database_path,
            media_directory: self.media_directory,
            workflow: self.workflow,
            notifications: self.notifications,
            logging: LoggingConfig::default(),
        }
    }
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}
