//! Results handed back to the presentation layer.
//!
//! `SubmitOutcome` is what `AppendTransaction::submit` returns once storage
//! I/O has settled. Callers pattern-match on it:
//! - `Infected` / `NotInfected` → the infection attempt was committed
//! - `InterventionRecorded` → the intervention row was committed
//! - `Rejected` → nothing was written; show the reason to the submitter

use serde::{Deserialize, Serialize};

use crate::{record::InteractionRecord, verdict::Rejection};

/// The drawn result of one infection attempt.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct InfectionOutcome {
    /// True if the uniform draw fell below `probability`.
    pub succeeded: bool,
    /// The infection probability after intervention discounts.
    pub probability: f64,
    /// Value to store in `intervention_value`: the baseline on success,
    /// absent on failure.
    pub value: Option<f64>,
}

/// The committed (or refused) result of one submission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum SubmitOutcome {
    /// The infection took hold. The record has been durably appended.
    Infected { record: InteractionRecord },

    /// The attempt was a contact only. The record has been durably appended.
    NotInfected { record: InteractionRecord },

    /// The intervention was stored with its sampled effectiveness.
    InterventionRecorded { record: InteractionRecord },

    /// Validation refused the event. The log is unchanged.
    Rejected { reason: Rejection },
}

impl SubmitOutcome {
    /// The appended record, if anything was written.
    pub fn record(&self) -> Option<&InteractionRecord> {
        match self {
            SubmitOutcome::Infected { record }
            | SubmitOutcome::NotInfected { record }
            | SubmitOutcome::InterventionRecorded { record } => Some(record),
            SubmitOutcome::Rejected { .. } => None,
        }
    }

    pub fn is_accepted(&self) -> bool {
        !matches!(self, SubmitOutcome::Rejected { .. })
    }

    /// The confirmation or refusal text shown to the submitter.
    pub fn message(&self) -> String {
        match self {
            SubmitOutcome::Infected { record } => format!(
                "Thank you for submitting your information to WMM. The user {} was infected!",
                record.audience
            ),
            SubmitOutcome::NotInfected { record } => format!(
                "Thank you for submitting your information to WMM. The user {} was *NOT* infected!",
                record.audience
            ),
            SubmitOutcome::InterventionRecorded { .. } => {
                "Thank you for submitting your information to WMM. This intervention event has been stored successfully!"
                    .to_string()
            }
            SubmitOutcome::Rejected { reason } => reason.to_string(),
        }
    }
}

/// What happened to the recipient of a notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    Infected,
    Contacted,
}

/// A request for an external mailer to tell someone about an infection
/// attempt. Emitted only after the log append has committed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationIntent {
    /// Username of the audience.
    pub username: String,
    /// Fully qualified delivery address.
    pub recipient: String,
    pub kind: NotificationKind,
}

impl NotificationIntent {
    pub fn subject(&self) -> &'static str {
        match self.kind {
            NotificationKind::Infected => "You were infected with Watermelon Meow Meow",
            NotificationKind::Contacted => "You were exposed to Watermelon Meow Meow",
        }
    }
}
