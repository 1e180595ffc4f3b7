//! TOML-configurable validation engine.
//!
//! `RuleEngine` loads `GameRules` from a TOML string or file and implements
//! the `Validator` trait from wmm-core.
//!
//! Evaluation order, first failure wins:
//!
//! 1. Actor and audience present (and an intervention type, for interventions).
//! 2. Infections: not self-targeted, audience not reserved, both usernames
//!    well-formed (audience checked first).
//! 3. Infections: the ordered pair is out of cooldown.
//! 4. Infections: the actor is contagious.
//! 5. Infections: the audience is not already infected.
//! 6. Interventions: audience not reserved, well-formed, the type is one of
//!    the offered interventions (exact label), the audience has not received
//!    this type before, and is not already infected.

use std::path::Path;

use chrono::NaiveDateTime;
use tracing::debug;

use wmm_contracts::{
    error::{WmmError, WmmResult},
    proposal::Proposal,
    record::{EventKind, EventLog},
    verdict::{Field, Rejection, Verdict},
};
use wmm_core::traits::Validator;

use crate::{index::LogIndex, rule::GameRules, username::is_valid_username};

/// A `Validator` driven by `GameRules`.
///
/// ```rust,ignore
/// use wmm_rules::RuleEngine;
///
/// let engine = RuleEngine::from_file(Path::new("wmm.rules.toml"))?;
/// ```
#[derive(Debug, Clone, Default)]
pub struct RuleEngine {
    rules: GameRules,
}

impl RuleEngine {
    pub fn new(rules: GameRules) -> Self {
        Self { rules }
    }

    /// Parse `s` as TOML game rules.
    ///
    /// Returns `WmmError::ConfigError` if the TOML is malformed or does not
    /// match `GameRules`.
    pub fn from_toml_str(s: &str) -> WmmResult<Self> {
        let rules: GameRules = toml::from_str(s).map_err(|e| WmmError::ConfigError {
            reason: format!("failed to parse game rules TOML: {e}"),
        })?;
        rules.validate()?;
        Ok(Self { rules })
    }

    pub fn from_file(path: &Path) -> WmmResult<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| WmmError::ConfigError {
            reason: format!("failed to read rules file '{}': {e}", path.display()),
        })?;
        Self::from_toml_str(&contents)
    }

    pub fn rules(&self) -> &GameRules {
        &self.rules
    }

    fn check_infection(
        &self,
        log: &EventLog,
        actor: &str,
        audience: &str,
        now: NaiveDateTime,
    ) -> Verdict {
        if actor == audience {
            return Verdict::Reject(Rejection::SelfTarget);
        }
        if self.rules.is_reserved(audience) {
            return Verdict::Reject(Rejection::ReservedUser {
                username: audience.to_string(),
            });
        }
        if !is_valid_username(audience) {
            return Verdict::Reject(Rejection::InvalidFormat {
                field: Field::Audience,
                value: audience.to_string(),
            });
        }
        if !is_valid_username(actor) {
            return Verdict::Reject(Rejection::InvalidFormat {
                field: Field::Actor,
                value: actor.to_string(),
            });
        }

        let index = LogIndex::build(log);

        if let Some(last) = index.last_interaction(actor, audience) {
            let elapsed = (now - last).num_seconds();
            if elapsed < self.rules.cooldown_secs {
                return Verdict::Reject(Rejection::Cooldown {
                    actor: actor.to_string(),
                    audience: audience.to_string(),
                    remaining_secs: self.rules.cooldown_secs - elapsed,
                });
            }
        }

        if !index.is_contagious(actor) {
            return Verdict::Reject(Rejection::ActorNotInfected {
                actor: actor.to_string(),
            });
        }

        if index.is_infected(audience) {
            return Verdict::Reject(Rejection::AlreadyInfected {
                audience: audience.to_string(),
            });
        }

        Verdict::Accept
    }

    fn check_intervention(
        &self,
        log: &EventLog,
        audience: &str,
        intervention_type: &str,
    ) -> Verdict {
        if self.rules.is_reserved(audience) {
            return Verdict::Reject(Rejection::ReservedUser {
                username: audience.to_string(),
            });
        }
        if !is_valid_username(audience) {
            return Verdict::Reject(Rejection::InvalidFormat {
                field: Field::Audience,
                value: audience.to_string(),
            });
        }

        if !self.rules.offers_intervention(intervention_type) {
            return Verdict::Reject(Rejection::UnknownIntervention {
                intervention_type: intervention_type.to_string(),
            });
        }

        let index = LogIndex::build(log);

        if index.has_intervention(audience, intervention_type) {
            return Verdict::Reject(Rejection::DuplicateIntervention {
                audience: audience.to_string(),
                intervention_type: intervention_type.to_string(),
            });
        }
        if index.is_infected(audience) {
            return Verdict::Reject(Rejection::TooLate {
                audience: audience.to_string(),
            });
        }

        Verdict::Accept
    }
}

impl Validator for RuleEngine {
    fn validate(&self, log: &EventLog, proposal: &Proposal, now: NaiveDateTime) -> Verdict {
        let actor = proposal.actor.as_str();
        let audience = proposal.audience.as_str();

        debug!(
            kind = %proposal.kind,
            actor = %actor,
            audience = %audience,
            rows = log.len(),
            "validating proposal"
        );

        if actor.trim().is_empty() || audience.trim().is_empty() {
            return Verdict::Reject(Rejection::MissingField);
        }

        match proposal.kind {
            EventKind::Infection => self.check_infection(log, actor, audience, now),
            EventKind::Intervention => {
                match proposal
                    .intervention_type
                    .as_deref()
                    .filter(|t| !t.trim().is_empty())
                {
                    Some(intervention_type) => {
                        self.check_intervention(log, audience, intervention_type)
                    }
                    None => Verdict::Reject(Rejection::MissingField),
                }
            }
        }
    }
}
