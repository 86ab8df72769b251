//! Batch operation tracking.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::{OrderOutcome, OrderRequest};

/// State of a single operation within a batch.
///
/// ```text
/// pending ──success──▶ success ──rollback succeeds──▶ rolled_back
///    │
///    └──failure──▶ error
/// ```
///
/// `RolledBack` and `Error` are terminal; a rolled-back operation never
/// transitions back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OperationState {
    /// Registered, not yet executed.
    Pending,
    /// Executed successfully; eligible for rollback.
    Success,
    /// Execution failed; there is nothing to undo.
    Error,
    /// A previously successful operation has been reversed.
    RolledBack,
}

impl OperationState {
    /// Returns true if the operation completed successfully and has not
    /// been reversed.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        matches!(self, Self::Success)
    }

    /// Returns true if this state admits no further transitions.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Error | Self::RolledBack)
    }
}

impl fmt::Display for OperationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pending => write!(f, "PENDING"),
            Self::Success => write!(f, "SUCCESS"),
            Self::Error => write!(f, "ERROR"),
            Self::RolledBack => write!(f, "ROLLED_BACK"),
        }
    }
}

/// Entry in a broker's batch registry: one operation, its state, and its
/// recorded outcome or error context.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchEntry {
    /// The original request.
    pub request: OrderRequest,
    /// Current state in the operation state machine.
    pub state: OperationState,
    /// Recorded outcome, present once the operation succeeded.
    pub outcome: Option<OrderOutcome>,
    /// Error context, present once the operation failed.
    pub error: Option<String>,
    /// Number of rollback attempts spent on this operation.
    pub rollback_attempts: u32,
}

impl BatchEntry {
    /// Creates a pending entry for a registered request.
    #[must_use]
    pub fn pending(request: OrderRequest) -> Self {
        Self {
            request,
            state: OperationState::Pending,
            outcome: None,
            error: None,
            rollback_attempts: 0,
        }
    }

    /// Records a successful execution. Ignored unless the entry is pending.
    pub fn mark_success(&mut self, outcome: OrderOutcome) {
        if self.state == OperationState::Pending {
            self.state = OperationState::Success;
            self.outcome = Some(outcome);
        }
    }

    /// Records a failed execution. Ignored unless the entry is pending.
    pub fn mark_error(&mut self, reason: impl Into<String>) {
        if self.state == OperationState::Pending {
            self.state = OperationState::Error;
            self.error = Some(reason.into());
        }
    }

    /// Marks a successful operation as reversed. Returns false if the entry
    /// was not in the `Success` state.
    pub fn mark_rolled_back(&mut self) -> bool {
        if self.state == OperationState::Success {
            self.state = OperationState::RolledBack;
            true
        } else {
            false
        }
    }

    /// Returns true if this entry has been reversed.
    #[must_use]
    pub fn is_rolled_back(&self) -> bool {
        self.state == OperationState::RolledBack
    }

    /// Returns true if this entry still needs compensation: it succeeded,
    /// has not been reversed, and is not itself a compensating order.
    #[must_use]
    pub fn needs_rollback(&self) -> bool {
        self.state.is_success() && !self.request.rollback
    }
}
