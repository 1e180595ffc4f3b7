//! Validation verdicts.
//!
//! The validation engine consumes a `Proposal` and the current log and
//! produces a `Verdict`. A rejection is a normal, user-correctable result,
//! not an error: it is shown to the submitter verbatim and never logged as a
//! system fault.

use serde::{Deserialize, Serialize};

/// Which proposal field failed a format check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Field {
    Actor,
    Audience,
}

impl std::fmt::Display for Field {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Field::Actor => write!(f, "actor"),
            Field::Audience => write!(f, "audience"),
        }
    }
}

/// Why a proposed event was refused.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum Rejection {
    /// Actor, audience, or (for interventions) the intervention type is blank.
    MissingField,

    /// An infection names the same user as actor and audience.
    SelfTarget,

    /// The audience is the reserved seed account.
    ReservedUser { username: String },

    /// A username does not match the `letters digits [letters]` pattern.
    InvalidFormat { field: Field, value: String },

    /// The same ordered pair interacted too recently.
    Cooldown {
        actor: String,
        audience: String,
        remaining_secs: i64,
    },

    /// The actor has never been infected and so cannot infect anyone.
    ActorNotInfected { actor: String },

    /// The audience is already infected.
    AlreadyInfected { audience: String },

    /// The intervention type is not one of the offered interventions.
    UnknownIntervention { intervention_type: String },

    /// The audience already received this intervention type.
    DuplicateIntervention {
        audience: String,
        intervention_type: String,
    },

    /// Interventions cannot be recorded for someone already infected.
    TooLate { audience: String },
}

impl std::fmt::Display for Rejection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Rejection::MissingField => write!(
                f,
                "One or both of the fields is missing input. Please ensure both usernames are entered correctly."
            ),
            Rejection::SelfTarget => write!(
                f,
                "The audience and actor usernames cannot be the same. Please enter different usernames."
            ),
            Rejection::ReservedUser { username } => {
                write!(f, "The username '{username}' cannot be used as the audience.")
            }
            Rejection::InvalidFormat { field, value } => write!(
                f,
                "Invalid {field} username '{value}'. Usernames are letters followed by digits, optionally followed by letters."
            ),
            Rejection::Cooldown {
                actor,
                audience,
                remaining_secs,
            } => write!(
                f,
                "An event between {actor} and {audience} took place less than a minute ago. Try again in {remaining_secs}s."
            ),
            Rejection::ActorNotInfected { actor } => write!(
                f,
                "{actor} is not eligible to infect others as they have not been infected yet."
            ),
            Rejection::AlreadyInfected { audience } => write!(
                f,
                "{audience} has already been infected in this game. Get out there and infect more people!"
            ),
            Rejection::UnknownIntervention { intervention_type } => {
                write!(f, "'{intervention_type}' is not one of the offered interventions.")
            }
            Rejection::DuplicateIntervention { audience, .. } => {
                write!(f, "The user, {audience}, has already engaged with this intervention.")
            }
            Rejection::TooLate { audience } => {
                write!(f, "{audience} has already been infected. Interventions are too late!")
            }
        }
    }
}

/// The decision emitted by the validation engine for one proposal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Verdict {
    /// The event may be applied. Control passes to an outcome resolver.
    Accept,
    /// The event is refused and the log must not change.
    Reject(Rejection),
}

impl Verdict {
    pub fn is_accept(&self) -> bool {
        matches!(self, Verdict::Accept)
    }
}
