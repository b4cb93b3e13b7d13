//! Which links and buttons a user should be offered for a job.

use serde::Serialize;

use super::job::Job;
use super::role::Actor;
use super::transition::{can_perform, Step};
use crate::config::WorkflowConfig;

/// Independent visibility flags for the job detail page.
///
/// Each flag is true exactly when the matching step would currently be
/// accepted for this actor, so the UI never offers an action that
/// `apply` would refuse.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Affordances {
    pub complete_inspection_link_present: bool,
    pub upload_quote_link_present: bool,
    pub accept_quote_button_present: bool,
    pub reject_quote_button_present: bool,
    pub update_quote_link_present: bool,
    pub submit_deposit_proof_of_payment_link_present: bool,
    pub complete_onsite_work_link_present: bool,
    pub submit_job_documentation_link_present: bool,
    pub upload_final_payment_pop_link_present: bool,
}

impl Affordances {
    pub fn for_actor(job: &Job, actor: &Actor, config: &WorkflowConfig) -> Self {
        let allowed = |step| can_perform(job, actor, step, config);
        Self {
            complete_inspection_link_present: allowed(Step::CompleteInspection),
            upload_quote_link_present: allowed(Step::UploadQuote),
            accept_quote_button_present: allowed(Step::AcceptQuote),
            reject_quote_button_present: allowed(Step::RejectQuote),
            update_quote_link_present: allowed(Step::UpdateQuote),
            submit_deposit_proof_of_payment_link_present: allowed(Step::SubmitDepositPop),
            complete_onsite_work_link_present: allowed(Step::CompleteOnsiteWork),
            submit_job_documentation_link_present: allowed(Step::SubmitDocumentation),
            upload_final_payment_pop_link_present: allowed(Step::SubmitFinalPaymentPop),
        }
    }

    /// True if at least one link or button is shown.
    pub fn any(&self) -> bool {
        self.present_steps().next().is_some()
    }

    /// Steps whose link or button is shown, in lifecycle order.
    pub fn present_steps(&self) -> impl Iterator<Item = Step> + '_ {
        [
            (self.complete_inspection_link_present, Step::CompleteInspection),
            (self.upload_quote_link_present, Step::UploadQuote),
            (self.accept_quote_button_present, Step::AcceptQuote),
            (self.reject_quote_button_present, Step::RejectQuote),
            (self.update_quote_link_present, Step::UpdateQuote),
            (
                self.submit_deposit_proof_of_payment_link_present,
                Step::SubmitDepositPop,
            ),
            (self.complete_onsite_work_link_present, Step::CompleteOnsiteWork),
            (
                self.submit_job_documentation_link_present,
                Step::SubmitDocumentation,
            ),
            (
                self.upload_final_payment_pop_link_present,
                Step::SubmitFinalPaymentPop,
            ),
        ]
        .into_iter()
        .filter_map(|(present, step)| present.then_some(step))
    }
}
