//! The maintenance job entity and its derived status.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Agent's answer to a quote.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuoteDecision {
    Accepted,
    Rejected,
}

impl QuoteDecision {
    pub fn as_str(&self) -> &'static str {
        match self {
            QuoteDecision::Accepted => "accepted",
            QuoteDecision::Rejected => "rejected",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "accepted" => Some(QuoteDecision::Accepted),
            "rejected" => Some(QuoteDecision::Rejected),
            _ => None,
        }
    }

    /// Single-letter form used in job listings ("A" / "R").
    pub fn to_char(&self) -> char {
        match self {
            QuoteDecision::Accepted => 'A',
            QuoteDecision::Rejected => 'R',
        }
    }
}

/// Reference to an uploaded document or photo, as a media path relative to
/// the media root (`quotes/q.pdf`).
///
/// The workflow only stores and compares references; content lives with
/// the document store.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DocumentRef(String);

impl DocumentRef {
    pub fn new(reference: impl Into<String>) -> Self {
        Self(reference.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Last path segment, with any query string or fragment removed.
    pub fn file_name(&self) -> &str {
        let without_query = self.0.split(['?', '#']).next().unwrap_or_default();
        without_query.rsplit('/').next().unwrap_or_default()
    }
}

impl std::fmt::Display for DocumentRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for DocumentRef {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

/// Fields supplied by an agent when requesting a new job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewJob {
    pub date: NaiveDate,
    pub address_details: String,
    pub gps_link: String,
    pub quote_request_details: String,
}

/// Where a job currently is in its lifecycle.
///
/// Always derived from which fields are populated; never stored as the
/// source of truth.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    PendingInspection,
    InspectionCompleted,
    QuoteUploaded,
    QuoteRejectedByAgent,
    QuoteAcceptedByAgent,
    DepositPopUploaded,
    OnsiteWorkCompleted,
    DocumentationSubmitted,
    Complete,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::PendingInspection => "pending_inspection",
            JobStatus::InspectionCompleted => "inspection_completed",
            JobStatus::QuoteUploaded => "quote_uploaded",
            JobStatus::QuoteRejectedByAgent => "quote_rejected_by_agent",
            JobStatus::QuoteAcceptedByAgent => "quote_accepted_by_agent",
            JobStatus::DepositPopUploaded => "deposit_pop_uploaded",
            JobStatus::OnsiteWorkCompleted => "onsite_work_completed",
            JobStatus::DocumentationSubmitted => "documentation_submitted",
            JobStatus::Complete => "complete",
        }
    }

    pub const ALL: [JobStatus; 9] = [
        JobStatus::PendingInspection,
        JobStatus::InspectionCompleted,
        JobStatus::QuoteUploaded,
        JobStatus::QuoteRejectedByAgent,
        JobStatus::QuoteAcceptedByAgent,
        JobStatus::DepositPopUploaded,
        JobStatus::OnsiteWorkCompleted,
        JobStatus::DocumentationSubmitted,
        JobStatus::Complete,
    ];

    pub fn parse(value: &str) -> Option<Self> {
        JobStatus::ALL.into_iter().find(|s| s.as_str() == value)
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            JobStatus::PendingInspection => "Pending Inspection",
            JobStatus::InspectionCompleted => "Inspection Completed",
            JobStatus::QuoteUploaded => "Quote Uploaded",
            JobStatus::QuoteRejectedByAgent => "Quote Rejected By Agent",
            JobStatus::QuoteAcceptedByAgent => "Quote Accepted By Agent",
            JobStatus::DepositPopUploaded => "Deposit POP Uploaded",
            JobStatus::OnsiteWorkCompleted => "Onsite Work Completed",
            JobStatus::DocumentationSubmitted => "Documentation Submitted",
            JobStatus::Complete => "Complete",
        };
        f.write_str(label)
    }
}

/// A maintenance job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Job {
    /// Unique identifier (UUID v4).
    pub id: String,
    /// Sequential, human-facing job number.
    pub number: i64,
    /// Username of the agent who created the job.
    pub agent: String,
    pub date: NaiveDate,
    pub address_details: String,
    pub gps_link: String,
    pub quote_request_details: String,
    pub date_of_inspection: Option<NaiveDate>,
    pub quote: Option<DocumentRef>,
    pub accepted_or_rejected: Option<QuoteDecision>,
    pub deposit_proof_of_payment: Option<DocumentRef>,
    pub job_onsite_work_completion_date: Option<NaiveDate>,
    pub job_completion_photos: Vec<DocumentRef>,
    pub invoice: Option<DocumentRef>,
    pub comments: Option<String>,
    pub final_payment_pop: Option<DocumentRef>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Bumped on every persisted change; guards against lost updates.
    pub version: i64,
}

impl Job {
    /// Builds a freshly created job with only the base fields set.
    pub fn new(
        id: impl Into<String>,
        number: i64,
        agent: impl Into<String>,
        details: NewJob,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: id.into(),
            number,
            agent: agent.into(),
            date: details.date,
            address_details: details.address_details,
            gps_link: details.gps_link,
            quote_request_details: details.quote_request_details,
            date_of_inspection: None,
            quote: None,
            accepted_or_rejected: None,
            deposit_proof_of_payment: None,
            job_onsite_work_completion_date: None,
            job_completion_photos: Vec::new(),
            invoice: None,
            comments: None,
            final_payment_pop: None,
            created_at: now,
            updated_at: now,
            version: 0,
        }
    }

    /// A job is complete once the final payment POP is uploaded.
    pub fn complete(&self) -> bool {
        self.final_payment_pop.is_some()
    }

    pub fn status(&self) -> JobStatus {
        if self.final_payment_pop.is_some() {
            JobStatus::Complete
        } else if self.invoice.is_some() {
            JobStatus::DocumentationSubmitted
        } else if self.job_onsite_work_completion_date.is_some() {
            JobStatus::OnsiteWorkCompleted
        } else if self.deposit_proof_of_payment.is_some() {
            JobStatus::DepositPopUploaded
        } else {
            match (self.accepted_or_rejected, &self.quote) {
                (Some(QuoteDecision::Accepted), _) => JobStatus::QuoteAcceptedByAgent,
                (Some(QuoteDecision::Rejected), _) => JobStatus::QuoteRejectedByAgent,
                (None, Some(_)) => JobStatus::QuoteUploaded,
                (None, None) if self.date_of_inspection.is_some() => {
                    JobStatus::InspectionCompleted
                }
                (None, None) => JobStatus::PendingInspection,
            }
        }
    }

    pub fn is_owned_by(&self, username: &str) -> bool {
        self.agent == username
    }
}
