//! Rendering workflow events into notifications.

use serde::{Deserialize, Serialize};

use super::WorkflowEvent;
use crate::workflow::{Job, Step};

/// Who a notification is addressed to. Resolving recipients to mail
/// addresses is left to the delivery side.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "username", rename_all = "snake_case")]
pub enum Recipient {
    /// The agent who owns the job.
    Agent(String),
    /// The maintenance worker.
    Worker,
}

/// A message to deliver after a step has been persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub from: String,
    pub to: Recipient,
    pub cc: Vec<Recipient>,
    pub subject: String,
    pub body: String,
    pub job_number: i64,
    pub step: Step,
}

/// Builds the notification for an event on `job` (the job after the step).
pub fn render(event: &WorkflowEvent, job: &Job, from: &str) -> Notification {
    let agent = Recipient::Agent(job.agent.clone());
    let (to, cc, subject, intro) = match event.step {
        Step::Create => (
            Recipient::Worker,
            vec![agent],
            format!("New maintenance request by {}", job.agent),
            format!("{} has made a new maintenance request.", job.agent),
        ),
        Step::CompleteInspection => (
            agent,
            vec![Recipient::Worker],
            "Manie completed an inspection for your maintenance request".to_string(),
            format!(
                "Manie completed the inspection on {}.",
                optional_date(job.date_of_inspection)
            ),
        ),
        Step::UploadQuote => (
            agent,
            vec![Recipient::Worker],
            "Manie uploaded a quote for your maintenance request".to_string(),
            "Manie uploaded a quote. Please accept or reject it.".to_string(),
        ),
        Step::AcceptQuote => (
            Recipient::Worker,
            vec![agent],
            format!("Quote accepted by {}", job.agent),
            format!("Agent {} has accepted the quote.", job.agent),
        ),
        Step::RejectQuote => (
            Recipient::Worker,
            vec![agent],
            format!("Quote rejected by {}", job.agent),
            format!(
                "Agent {} has rejected the quote. An updated quote can be uploaded.",
                job.agent
            ),
        ),
        Step::UpdateQuote => (
            agent,
            vec![Recipient::Worker],
            "Manie uploaded an updated quote for your job".to_string(),
            "Manie uploaded an updated quote. Please accept or reject it.".to_string(),
        ),
        Step::SubmitDepositPop => (
            Recipient::Worker,
            vec![agent],
            format!(
                "Agent {} added a Deposit POP to the maintenance request",
                job.agent
            ),
            format!(
                "Agent {} added a Deposit POP to the maintenance request.",
                job.agent
            ),
        ),
        Step::CompleteOnsiteWork => (
            agent,
            vec![Recipient::Worker],
            "Manie completed onsite work on a maintenance job".to_string(),
            format!(
                "Manie completed the onsite work on {}.",
                optional_date(job.job_onsite_work_completion_date)
            ),
        ),
        Step::SubmitDocumentation => (
            agent,
            vec![Recipient::Worker],
            "Manie uploaded documentation for a job.".to_string(),
            format!(
                "Manie uploaded the invoice and {} completion photo(s).",
                job.job_completion_photos.len()
            ),
        ),
        Step::SubmitFinalPaymentPop => (
            Recipient::Worker,
            vec![agent],
            format!(
                "Agent {} added a Final Payment POP to the maintenance request",
                job.agent
            ),
            format!(
                "Agent {} added a Final Payment POP. The job is now complete.",
                job.agent
            ),
        ),
    };

    Notification {
        from: from.to_string(),
        to,
        cc,
        subject,
        body: body(&intro, job),
        job_number: event.job_number,
        step: event.step,
    }
}

fn optional_date(date: Option<chrono::NaiveDate>) -> String {
    date.map(|d| d.to_string()).unwrap_or_else(|| "-".to_string())
}

fn body(intro: &str, job: &Job) -> String {
    let mut body = format!("{}\n\n", intro);
    body.push_str(&format!("Number: {}\n\n", job.number));
    body.push_str(&format!("Date: {}\n\n", job.date));
    body.push_str(&format!("Address Details:\n\n{}\n\n", job.address_details));
    body.push_str(&format!("GPS Link:\n\n{}\n\n", job.gps_link));
    body.push_str(&format!(
        "Quote Request Details:\n\n{}\n\n",
        job.quote_request_details
    ));
    if let Some(ref comments) = job.comments {
        body.push_str(&format!("Comments:\n\n{}\n\n", comments));
    }
    body.push_str(&format!("Status: {}\n\n", job.status()));
    body.push_str(
        "PS: This mail is sent from an unmonitored email address. \
         Please do not reply to this email.\n",
    );
    body
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflow::{Actor, DocumentRef, NewJob, QuoteDecision};
    use chrono::{NaiveDate, Utc};

    fn job() -> Job {
        Job::new(
            "n-1",
            7,
            "alice",
            NewJob {
                date: NaiveDate::from_ymd_opt(2026, 4, 1).unwrap(),
                address_details: "12 Elm Road".to_string(),
                gps_link: "https://maps.example.com/?q=12".to_string(),
                quote_request_details: "Paint the fence".to_string(),
            },
            Utc::now(),
        )
    }

    #[test]
    fn test_create_goes_to_worker_with_agent_in_cc() {
        let job = job();
        let event = WorkflowEvent::new(&job, Step::Create, &Actor::agent("alice"), Utc::now());
        let n = render(&event, &job, "noreply@example.com");

        assert_eq!(n.subject, "New maintenance request by alice");
        assert_eq!(n.to, Recipient::Worker);
        assert_eq!(n.cc, vec![Recipient::Agent("alice".to_string())]);
        assert_eq!(n.from, "noreply@example.com");
        assert!(n.body.contains("Number: 7"));
        assert!(n.body.contains("Paint the fence"));
        assert!(n.body.contains("Status: Pending Inspection"));
    }

    #[test]
    fn test_worker_steps_notify_the_agent() {
        let mut job = job();
        job.date_of_inspection = NaiveDate::from_ymd_opt(2026, 4, 2);
        job.quote = Some(DocumentRef::new("quotes/q.pdf"));
        job.accepted_or_rejected = Some(QuoteDecision::Rejected);

        for (step, subject) in [
            (
                Step::CompleteInspection,
                "Manie completed an inspection for your maintenance request",
            ),
            (Step::UpdateQuote, "Manie uploaded an updated quote for your job"),
            (Step::SubmitDocumentation, "Manie uploaded documentation for a job."),
        ] {
            let event = WorkflowEvent::new(&job, step, &Actor::worker("manie"), Utc::now());
            let n = render(&event, &job, "noreply@example.com");
            assert_eq!(n.subject, subject);
            assert_eq!(n.to, Recipient::Agent("alice".to_string()));
        }
    }

    #[test]
    fn test_rejection_goes_to_worker() {
        let job = job();
        let event =
            WorkflowEvent::new(&job, Step::RejectQuote, &Actor::agent("alice"), Utc::now());
        let n = render(&event, &job, "noreply@example.com");
        assert_eq!(n.subject, "Quote rejected by alice");
        assert_eq!(n.to, Recipient::Worker);
        assert_eq!(n.step, Step::RejectQuote);
    }

    #[test]
    fn test_recipient_serialization() {
        let json = serde_json::to_string(&Recipient::Agent("bob".to_string())).unwrap();
        assert_eq!(json, r#"{"kind":"agent","username":"bob"}"#);
        let json = serde_json::to_string(&Recipient::Worker).unwrap();
        assert_eq!(json, r#"{"kind":"worker"}"#);
    }
}
