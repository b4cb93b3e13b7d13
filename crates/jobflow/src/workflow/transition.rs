//! Transition table and the pure `apply` step.
//!
//! Each step has a fixed required role and a set of field preconditions.
//! Checks run in a fixed order: authorization, preconditions, then payload
//! validation. Nothing is mutated unless all three pass, and the input job
//! is never touched; callers get a new value back.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::error::WorkflowError;
use super::job::{DocumentRef, Job, NewJob, QuoteDecision};
use super::role::{Actor, Role};
use crate::config::WorkflowConfig;
use crate::media::DocumentKind;
use crate::validate;

/// A step in the job lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Step {
    Create,
    CompleteInspection,
    UploadQuote,
    AcceptQuote,
    RejectQuote,
    UpdateQuote,
    SubmitDepositPop,
    CompleteOnsiteWork,
    SubmitDocumentation,
    SubmitFinalPaymentPop,
}

impl Step {
    pub const ALL: [Step; 10] = [
        Step::Create,
        Step::CompleteInspection,
        Step::UploadQuote,
        Step::AcceptQuote,
        Step::RejectQuote,
        Step::UpdateQuote,
        Step::SubmitDepositPop,
        Step::CompleteOnsiteWork,
        Step::SubmitDocumentation,
        Step::SubmitFinalPaymentPop,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Step::Create => "create",
            Step::CompleteInspection => "complete_inspection",
            Step::UploadQuote => "upload_quote",
            Step::AcceptQuote => "accept_quote",
            Step::RejectQuote => "reject_quote",
            Step::UpdateQuote => "update_quote",
            Step::SubmitDepositPop => "submit_deposit_pop",
            Step::CompleteOnsiteWork => "complete_onsite_work",
            Step::SubmitDocumentation => "submit_documentation",
            Step::SubmitFinalPaymentPop => "submit_final_payment_pop",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        Step::ALL.into_iter().find(|step| step.as_str() == value)
    }

    /// The role this step is performed by.
    pub fn actor(&self) -> Role {
        requirement(*self).actor
    }
}

impl std::fmt::Display for Step {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Static per-step requirement.
#[derive(Debug)]
pub struct StepRequirement {
    pub step: Step,
    pub actor: Role,
    /// Fields written by the step.
    pub sets: &'static [&'static str],
}

/// Indexed by `Step as usize`.
const REQUIREMENTS: [StepRequirement; 10] = [
    StepRequirement {
        step: Step::Create,
        actor: Role::Agent,
        sets: &[
            "number",
            "date",
            "address_details",
            "gps_link",
            "quote_request_details",
        ],
    },
    StepRequirement {
        step: Step::CompleteInspection,
        actor: Role::Worker,
        sets: &["date_of_inspection"],
    },
    StepRequirement {
        step: Step::UploadQuote,
        actor: Role::Worker,
        sets: &["quote"],
    },
    StepRequirement {
        step: Step::AcceptQuote,
        actor: Role::Agent,
        sets: &["accepted_or_rejected"],
    },
    StepRequirement {
        step: Step::RejectQuote,
        actor: Role::Agent,
        sets: &["accepted_or_rejected"],
    },
    StepRequirement {
        step: Step::UpdateQuote,
        actor: Role::Worker,
        sets: &["quote", "accepted_or_rejected"],
    },
    StepRequirement {
        step: Step::SubmitDepositPop,
        actor: Role::Agent,
        sets: &["deposit_proof_of_payment"],
    },
    StepRequirement {
        step: Step::CompleteOnsiteWork,
        actor: Role::Worker,
        sets: &["job_onsite_work_completion_date"],
    },
    StepRequirement {
        step: Step::SubmitDocumentation,
        actor: Role::Worker,
        sets: &["job_completion_photos", "invoice", "comments"],
    },
    StepRequirement {
        step: Step::SubmitFinalPaymentPop,
        actor: Role::Agent,
        sets: &["final_payment_pop"],
    },
];

pub fn requirement(step: Step) -> &'static StepRequirement {
    &REQUIREMENTS[step as usize]
}

/// A requested transition together with the data it carries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Action {
    CompleteInspection {
        date_of_inspection: NaiveDate,
    },
    UploadQuote {
        quote: DocumentRef,
    },
    AcceptQuote,
    RejectQuote,
    UpdateQuote {
        quote: DocumentRef,
    },
    SubmitDepositPop {
        deposit_proof_of_payment: DocumentRef,
    },
    CompleteOnsiteWork {
        job_onsite_work_completion_date: NaiveDate,
    },
    SubmitDocumentation {
        invoice: DocumentRef,
        #[serde(default)]
        photos: Vec<DocumentRef>,
        #[serde(default)]
        comments: Option<String>,
    },
    SubmitFinalPaymentPop {
        final_payment_pop: DocumentRef,
    },
}

impl Action {
    pub fn step(&self) -> Step {
        match self {
            Action::CompleteInspection { .. } => Step::CompleteInspection,
            Action::UploadQuote { .. } => Step::UploadQuote,
            Action::AcceptQuote => Step::AcceptQuote,
            Action::RejectQuote => Step::RejectQuote,
            Action::UpdateQuote { .. } => Step::UpdateQuote,
            Action::SubmitDepositPop { .. } => Step::SubmitDepositPop,
            Action::CompleteOnsiteWork { .. } => Step::CompleteOnsiteWork,
            Action::SubmitDocumentation { .. } => Step::SubmitDocumentation,
            Action::SubmitFinalPaymentPop { .. } => Step::SubmitFinalPaymentPop,
        }
    }
}

/// Checks that `actor` may perform `step`, optionally on an existing job.
pub fn authorize(
    job: Option<&Job>,
    actor: &Actor,
    step: Step,
    config: &WorkflowConfig,
) -> Result<(), WorkflowError> {
    let required = requirement(step).actor;
    let denied = |reason: String| WorkflowError::Authorization { step, reason };

    if actor.role == Role::Admin {
        // Jobs always belong to an agent, so only agents create them.
        if step == Step::Create {
            return Err(denied("only agents can create jobs".to_string()));
        }
        if config.admin_may_act {
            return Ok(());
        }
        return Err(denied("administrators are read-only".to_string()));
    }

    if actor.role != required {
        return Err(denied(format!(
            "requires the {} role, but {} has the {} role",
            required, actor.username, actor.role
        )));
    }

    if required == Role::Agent && config.enforce_agent_ownership {
        if let Some(job) = job {
            if !job.is_owned_by(&actor.username) {
                return Err(denied(format!(
                    "job #{} belongs to another agent",
                    job.number
                )));
            }
        }
    }

    Ok(())
}

fn require_set(step: Step, present: bool, field: &str) -> Result<(), WorkflowError> {
    if present {
        Ok(())
    } else {
        Err(WorkflowError::Precondition {
            step,
            reason: format!("{} is not set yet", field),
        })
    }
}

fn require_unset(step: Step, present: bool, field: &str) -> Result<(), WorkflowError> {
    if present {
        Err(WorkflowError::Precondition {
            step,
            reason: format!("{} is already set", field),
        })
    } else {
        Ok(())
    }
}

/// Checks the field preconditions of `step` against the job's current state.
pub fn check_preconditions(job: &Job, step: Step) -> Result<(), WorkflowError> {
    match step {
        Step::Create => Err(WorkflowError::Precondition {
            step,
            reason: "job already exists".to_string(),
        }),
        Step::CompleteInspection => {
            require_unset(step, job.date_of_inspection.is_some(), "date_of_inspection")
        }
        Step::UploadQuote => {
            require_set(step, job.date_of_inspection.is_some(), "date_of_inspection")?;
            require_unset(step, job.quote.is_some(), "quote")
        }
        Step::AcceptQuote | Step::RejectQuote => {
            require_set(step, job.quote.is_some(), "quote")?;
            require_unset(
                step,
                job.accepted_or_rejected.is_some(),
                "accepted_or_rejected",
            )
        }
        Step::UpdateQuote => match job.accepted_or_rejected {
            Some(QuoteDecision::Rejected) => Ok(()),
            _ => Err(WorkflowError::Precondition {
                step,
                reason: "quote has not been rejected".to_string(),
            }),
        },
        Step::SubmitDepositPop => {
            if job.accepted_or_rejected != Some(QuoteDecision::Accepted) {
                return Err(WorkflowError::Precondition {
                    step,
                    reason: "quote has not been accepted".to_string(),
                });
            }
            require_unset(
                step,
                job.deposit_proof_of_payment.is_some(),
                "deposit_proof_of_payment",
            )
        }
        Step::CompleteOnsiteWork => {
            require_set(
                step,
                job.deposit_proof_of_payment.is_some(),
                "deposit_proof_of_payment",
            )?;
            require_unset(
                step,
                job.job_onsite_work_completion_date.is_some(),
                "job_onsite_work_completion_date",
            )
        }
        Step::SubmitDocumentation => {
            require_set(
                step,
                job.job_onsite_work_completion_date.is_some(),
                "job_onsite_work_completion_date",
            )?;
            require_unset(step, job.invoice.is_some(), "invoice")
        }
        Step::SubmitFinalPaymentPop => {
            require_set(step, job.invoice.is_some(), "invoice")?;
            require_unset(step, job.final_payment_pop.is_some(), "final_payment_pop")
        }
    }
}

/// Whether `actor` could perform `step` on `job` right now.
pub fn can_perform(job: &Job, actor: &Actor, step: Step, config: &WorkflowConfig) -> bool {
    authorize(Some(job), actor, step, config).is_ok() && check_preconditions(job, step).is_ok()
}

/// Builds a new job for `actor`. The id and number come from the store.
pub fn create_job(
    actor: &Actor,
    id: impl Into<String>,
    number: i64,
    details: NewJob,
    config: &WorkflowConfig,
    now: DateTime<Utc>,
) -> Result<Job, WorkflowError> {
    authorize(None, actor, Step::Create, config)?;
    validate::new_job(&details)?;
    Ok(Job::new(id, number, actor.username.clone(), details, now))
}

/// Applies `action` to `job` on behalf of `actor`, returning the updated job.
pub fn apply(
    job: &Job,
    actor: &Actor,
    action: Action,
    config: &WorkflowConfig,
    now: DateTime<Utc>,
) -> Result<Job, WorkflowError> {
    let step = action.step();
    authorize(Some(job), actor, step, config)?;
    check_preconditions(job, step)?;

    let mut next = job.clone();
    match action {
        Action::CompleteInspection { date_of_inspection } => {
            next.date_of_inspection = Some(date_of_inspection);
        }
        Action::UploadQuote { quote } => {
            validate::document(DocumentKind::Quote, "quote", &quote)?;
            next.quote = Some(quote);
        }
        Action::AcceptQuote => {
            next.accepted_or_rejected = Some(QuoteDecision::Accepted);
        }
        Action::RejectQuote => {
            next.accepted_or_rejected = Some(QuoteDecision::Rejected);
        }
        Action::UpdateQuote { quote } => {
            validate::document(DocumentKind::Quote, "quote", &quote)?;
            next.quote = Some(quote);
            next.accepted_or_rejected = None;
        }
        Action::SubmitDepositPop {
            deposit_proof_of_payment,
        } => {
            validate::document(
                DocumentKind::DepositProofOfPayment,
                "deposit_proof_of_payment",
                &deposit_proof_of_payment,
            )?;
            next.deposit_proof_of_payment = Some(deposit_proof_of_payment);
        }
        Action::CompleteOnsiteWork {
            job_onsite_work_completion_date,
        } => {
            next.job_onsite_work_completion_date = Some(job_onsite_work_completion_date);
        }
        Action::SubmitDocumentation {
            invoice,
            photos,
            comments,
        } => {
            validate::document(DocumentKind::Invoice, "invoice", &invoice)?;
            for photo in &photos {
                validate::document(DocumentKind::CompletionPhoto, "job_completion_photos", photo)?;
            }
            next.invoice = Some(invoice);
            next.job_completion_photos.extend(photos);
            next.comments = validate::normalize_comments(comments);
        }
        Action::SubmitFinalPaymentPop { final_payment_pop } => {
            validate::document(
                DocumentKind::FinalPaymentPop,
                "final_payment_pop",
                &final_payment_pop,
            )?;
            next.final_payment_pop = Some(final_payment_pop);
        }
    }
    next.updated_at = now;

    tracing::debug!(
        job_number = job.number,
        step = %step,
        actor = %actor,
        status = %next.status(),
        "Applied workflow step"
    );

    Ok(next)
}
