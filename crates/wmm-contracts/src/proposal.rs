//! Proposed events, as gathered by the presentation layer.
//!
//! A `Proposal` is what a student typed into the form. It has not been
//! validated and may be blank, malformed, or refer to people who do not exist.

use serde::{Deserialize, Serialize};

use crate::record::EventKind;

/// Unique identifier for one `submit` call.
///
/// Appears in every log line the submission produces so an operator can
/// follow a single attempt through fetch, validation, and write-back.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SubmissionId(pub uuid::Uuid);

impl SubmissionId {
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4())
    }
}

impl Default for SubmissionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for SubmissionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A proposed infection or intervention event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Proposal {
    /// Infector username, or the intervention label for interventions.
    pub actor: String,
    /// Target username.
    pub audience: String,
    pub kind: EventKind,
    /// Required for interventions, ignored for infections.
    pub intervention_type: Option<String>,
}

impl Proposal {
    /// An infection attempt by `actor` on `audience`.
    pub fn infection(actor: impl Into<String>, audience: impl Into<String>) -> Self {
        Self {
            actor: actor.into(),
            audience: audience.into(),
            kind: EventKind::Infection,
            intervention_type: None,
        }
    }

    /// An intervention of type `intervention_type` received by `audience`.
    ///
    /// The actor of an intervention row is the intervention label itself.
    pub fn intervention(intervention_type: impl Into<String>, audience: impl Into<String>) -> Self {
        let intervention_type = intervention_type.into();
        Self {
            actor: intervention_type.clone(),
            audience: audience.into(),
            kind: EventKind::Intervention,
            intervention_type: Some(intervention_type),
        }
    }

    /// Trim and lower-case usernames the way the submission form does.
    ///
    /// Intervention labels keep their case; only surrounding whitespace is
    /// removed.
    pub fn normalized(&self) -> Self {
        let actor = match self.kind {
            EventKind::Infection => self.actor.trim().to_lowercase(),
            EventKind::Intervention => self.actor.trim().to_string(),
        };
        Self {
            actor,
            audience: self.audience.trim().to_lowercase(),
            kind: self.kind,
            intervention_type: self
                .intervention_type
                .as_ref()
                .map(|t| t.trim().to_string()),
        }
    }
}
