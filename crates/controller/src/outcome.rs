//! Reconciliation outcome types.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result of one reconciliation pass for one object identity.
///
/// Drives the dispatcher's scheduling: `Retryable` is re-enqueued with
/// backoff, `Fatal` is surfaced and left for operator intervention,
/// `Converged` needs no further action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReconcileOutcome {
    /// Every managed resource matches its target specification.
    Converged,
    /// A transient failure occurred; a later pass is expected to succeed.
    Retryable { reason: String },
    /// A structural failure occurred; retrying cannot help.
    Fatal { reason: String },
}

impl ReconcileOutcome {
    /// Create a retryable outcome.
    pub fn retryable(reason: impl Into<String>) -> Self {
        Self::Retryable {
            reason: reason.into(),
        }
    }

    /// Create a fatal outcome.
    pub fn fatal(reason: impl Into<String>) -> Self {
        Self::Fatal {
            reason: reason.into(),
        }
    }

    /// Whether this outcome is `Converged`.
    pub fn is_converged(&self) -> bool {
        matches!(self, Self::Converged)
    }
}

/// How a single resource reached its target state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Convergence {
    /// The resource did not exist and was created as specified.
    Created,
    /// The owned field drifted and was patched back.
    Patched,
    /// The resource already matched (or its drift is accepted).
    Unchanged,
}

/// Classified failure while converging a single resource.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConvergeError {
    /// Transient; the next pass should be able to make progress.
    #[error("retryable: {reason}")]
    Retryable { reason: String },
    /// Structural; requires human correction.
    #[error("fatal: {reason}")]
    Fatal { reason: String },
}

impl ConvergeError {
    /// Create a retryable convergence error.
    pub fn retryable(reason: impl Into<String>) -> Self {
        Self::Retryable {
            reason: reason.into(),
        }
    }

    /// Create a fatal convergence error.
    pub fn fatal(reason: impl Into<String>) -> Self {
        Self::Fatal {
            reason: reason.into(),
        }
    }
}

impl From<ConvergeError> for ReconcileOutcome {
    fn from(error: ConvergeError) -> Self {
        match error {
            ConvergeError::Retryable { reason } => Self::Retryable { reason },
            ConvergeError::Fatal { reason } => Self::Fatal { reason },
        }
    }
}
