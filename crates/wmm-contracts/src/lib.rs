//! # wmm-contracts
//!
//! Shared types for the Watermelon Meow Meow outbreak game.
//!
//! All crates in the workspace import from here. No game rules live in this
//! crate: only record definitions, verdicts, outcomes, and error types.

pub mod error;
pub mod outcome;
pub mod proposal;
pub mod record;
pub mod verdict;

pub use error::{WmmError, WmmResult};
pub use outcome::{InfectionOutcome, NotificationIntent, NotificationKind, SubmitOutcome};
pub use proposal::{Proposal, SubmissionId};
pub use record::{
    EventKind, EventLog, InteractionRecord, LogSnapshot, Version, INFECTION_TYPE_SENTINEL,
    TIMESTAMP_FORMAT,
};
pub use verdict::{Field, Rejection, Verdict};
