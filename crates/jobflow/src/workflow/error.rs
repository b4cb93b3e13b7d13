//! Workflow error types.

use thiserror::Error;

use super::transition::Step;

/// Why a requested transition was refused.
///
/// Every variant is scoped to the single request; the job is left untouched.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum WorkflowError {
    /// The actor is not allowed to perform this step.
    #[error("Not authorized to {step}: {reason}")]
    Authorization { step: Step, reason: String },

    /// An upstream field is unset, or the target field is already set.
    #[error("Cannot {step}: {reason}")]
    Precondition { step: Step, reason: String },

    /// A supplied value failed basic format checks.
    #[error("Invalid {field}: {reason}")]
    Validation { field: &'static str, reason: String },
}

impl WorkflowError {
    pub fn is_authorization(&self) -> bool {
        matches!(self, WorkflowError::Authorization { .. })
    }

    pub fn is_precondition(&self) -> bool {
        matches!(self, WorkflowError::Precondition { .. })
    }

    pub fn is_validation(&self) -> bool {
        matches!(self, WorkflowError::Validation { .. })
    }
}
