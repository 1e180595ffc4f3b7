//! # wmm-rules
//!
//! The validation engine for the Watermelon Meow Meow game.
//!
//! ## Overview
//!
//! This crate provides [`RuleEngine`], which implements the
//! [`Validator`](wmm_core::traits::Validator) trait. Rules are checked in a
//! fixed order and the first failure becomes the rejection reason. Cooldown,
//! contagion, and intervention history are read from a [`LogIndex`] built
//! fresh from the snapshot on every call.
//!
//! ## Quick start
//!
//! ```rust,ignore
//! use wmm_rules::RuleEngine;
//!
//! let engine = RuleEngine::from_toml_str("cooldown_secs = 60")?;
//! // Pass `engine` to `wmm_core::AppendTransaction::new(...)`.
//! ```

pub mod engine;
pub mod index;
pub mod rule;
pub mod username;

pub use engine::RuleEngine;
pub use index::LogIndex;
pub use rule::{GameRules, DEFAULT_COOLDOWN_SECS, RESERVED_USERNAME};
pub use username::is_valid_username;

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use chrono::{Duration, NaiveDateTime};

    use wmm_contracts::{
        error::WmmError,
        proposal::Proposal,
        record::{EventKind, EventLog, InteractionRecord, TIMESTAMP_FORMAT},
        verdict::{Field, Rejection, Verdict},
    };
    use wmm_core::traits::Validator;

    use crate::RuleEngine;

    // ── Helpers ───────────────────────────────────────────────────────────────

    fn ts(s: &str) -> NaiveDateTime {
        NaiveDateTime::parse_from_str(s, TIMESTAMP_FORMAT).unwrap()
    }

    fn now() -> NaiveDateTime {
        ts("2025-03-01 12:00:00")
    }

    fn infection(
        actor: &str,
        audience: &str,
        success: bool,
        at: NaiveDateTime,
    ) -> InteractionRecord {
        InteractionRecord {
            actor: actor.to_string(),
            audience: audience.to_string(),
            kind: EventKind::Infection,
            success,
            intervention_value: success.then_some(0.5),
            intervention_type: "-1".to_string(),
            timestamp: at,
        }
    }

    fn intervention(
        label: &str,
        audience: &str,
        value: f64,
        at: NaiveDateTime,
    ) -> InteractionRecord {
        InteractionRecord {
            actor: label.to_string(),
            audience: audience.to_string(),
            kind: EventKind::Intervention,
            success: true,
            intervention_value: Some(value),
            intervention_type: label.to_string(),
            timestamp: at,
        }
    }

    /// `exp626` seeded `thm220` yesterday; `thm220` is the only contagious user.
    fn seeded() -> EventLog {
        vec![infection("exp626", "thm220", true, now() - Duration::days(1))].into()
    }

    fn reject(verdict: Verdict) -> Rejection {
        match verdict {
            Verdict::Reject(r) => r,
            Verdict::Accept => panic!("expected a rejection, got Accept"),
        }
    }

    // ── 1. missing fields ─────────────────────────────────────────────────────

    #[test]
    fn blank_fields_are_rejected_first() {
        let engine = RuleEngine::default();
        for p in [
            Proposal::infection("", "gms221"),
            Proposal::infection("thm220", "   "),
            Proposal::intervention("Intervention 01", ""),
        ] {
            assert_eq!(
                reject(engine.validate(&seeded(), &p, now())),
                Rejection::MissingField
            );
        }

        let mut untyped = Proposal::intervention("Intervention 01", "gms221");
        untyped.intervention_type = None;
        assert_eq!(
            reject(engine.validate(&seeded(), &untyped, now())),
            Rejection::MissingField
        );
    }

    // ── 2. infection shape checks ─────────────────────────────────────────────

    #[test]
    fn self_target_is_rejected() {
        let engine = RuleEngine::default();
        let verdict = engine.validate(&seeded(), &Proposal::infection("thm220", "thm220"), now());
        assert_eq!(reject(verdict), Rejection::SelfTarget);
    }

    #[test]
    fn reserved_audience_is_rejected_case_insensitively() {
        let engine = RuleEngine::default();
        let verdict = engine.validate(&seeded(), &Proposal::infection("thm220", "EXP626"), now());
        assert!(matches!(reject(verdict), Rejection::ReservedUser { .. }));

        let verdict = engine.validate(
            &seeded(),
            &Proposal::intervention("Intervention 01", "Exp626"),
            now(),
        );
        assert!(matches!(reject(verdict), Rejection::ReservedUser { .. }));
    }

    #[test]
    fn invalid_format_names_the_failing_field() {
        let engine = RuleEngine::default();

        let verdict = engine.validate(&seeded(), &Proposal::infection("thm220", "123abc"), now());
        assert_eq!(
            reject(verdict),
            Rejection::InvalidFormat {
                field: Field::Audience,
                value: "123abc".to_string()
            }
        );

        let verdict = engine.validate(&seeded(), &Proposal::infection("abc", "gms221"), now());
        assert_eq!(
            reject(verdict),
            Rejection::InvalidFormat {
                field: Field::Actor,
                value: "abc".to_string()
            }
        );
    }

    // ── 3. cooldown ───────────────────────────────────────────────────────────

    #[test]
    fn cooldown_blocks_the_same_pair_within_a_minute() {
        let engine = RuleEngine::default();
        let mut log = seeded();
        log.append(infection("thm220", "gms221", false, now() - Duration::seconds(59)));

        let verdict = engine.validate(&log, &Proposal::infection("thm220", "gms221"), now());
        assert_eq!(
            reject(verdict),
            Rejection::Cooldown {
                actor: "thm220".to_string(),
                audience: "gms221".to_string(),
                remaining_secs: 1,
            }
        );
    }

    /// Exactly 60 seconds elapsed is out of cooldown (exclusive bound).
    #[test]
    fn cooldown_boundary_is_exclusive() {
        let engine = RuleEngine::default();
        let mut log = seeded();
        log.append(infection("thm220", "gms221", false, now() - Duration::seconds(60)));

        let verdict = engine.validate(&log, &Proposal::infection("thm220", "gms221"), now());
        assert_eq!(verdict, Verdict::Accept);
    }

    /// Gaps longer than a day must not wrap around to a few seconds.
    #[test]
    fn cooldown_uses_total_elapsed_time() {
        let engine = RuleEngine::default();
        let mut log = seeded();
        log.append(infection(
            "thm220",
            "gms221",
            false,
            now() - Duration::days(1) - Duration::seconds(10),
        ));

        let verdict = engine.validate(&log, &Proposal::infection("thm220", "gms221"), now());
        assert_eq!(verdict, Verdict::Accept);
    }

    /// Cooldown is per ordered pair: the reverse direction is unaffected.
    #[test]
    fn cooldown_is_directional() {
        let engine = RuleEngine::default();
        let mut log = seeded();
        log.append(infection("gms221", "thm220", false, now() - Duration::seconds(5)));

        let verdict = engine.validate(&log, &Proposal::infection("thm220", "gms221"), now());
        assert_eq!(verdict, Verdict::Accept);
    }

    #[test]
    fn configured_cooldown_is_honored() {
        let engine = RuleEngine::from_toml_str("cooldown_secs = 300").unwrap();
        let mut log = seeded();
        log.append(infection("thm220", "gms221", false, now() - Duration::seconds(120)));

        let verdict = engine.validate(&log, &Proposal::infection("thm220", "gms221"), now());
        assert!(matches!(
            reject(verdict),
            Rejection::Cooldown { remaining_secs: 180, .. }
        ));
    }

    // ── 4. contagion ──────────────────────────────────────────────────────────

    #[test]
    fn uninfected_actor_cannot_infect() {
        let engine = RuleEngine::default();
        let verdict = engine.validate(&seeded(), &Proposal::infection("gms221", "abc123"), now());
        assert_eq!(
            reject(verdict),
            Rejection::ActorNotInfected {
                actor: "gms221".to_string()
            }
        );
    }

    /// A contact-only row does not make its audience contagious.
    #[test]
    fn contact_does_not_confer_contagion() {
        let engine = RuleEngine::default();
        let mut log = seeded();
        log.append(infection("thm220", "gms221", false, now() - Duration::hours(1)));

        let verdict = engine.validate(&log, &Proposal::infection("gms221", "abc123"), now());
        assert!(matches!(reject(verdict), Rejection::ActorNotInfected { .. }));
    }

    // ── 5. already infected ───────────────────────────────────────────────────

    #[test]
    fn already_infected_audience_is_rejected_regardless_of_actor() {
        let engine = RuleEngine::default();
        let mut log = seeded();
        log.append(infection("thm220", "gms221", true, now() - Duration::hours(1)));
        log.append(infection("exp626", "abc123", true, now() - Duration::hours(1)));

        for actor in ["thm220", "abc123"] {
            let verdict = engine.validate(&log, &Proposal::infection(actor, "gms221"), now());
            assert_eq!(
                reject(verdict),
                Rejection::AlreadyInfected {
                    audience: "gms221".to_string()
                }
            );
        }
    }

    #[test]
    fn valid_infection_is_accepted() {
        let engine = RuleEngine::default();
        let verdict = engine.validate(&seeded(), &Proposal::infection("thm220", "abc123d"), now());
        assert_eq!(verdict, Verdict::Accept);
    }

    // ── 6. interventions ──────────────────────────────────────────────────────

    #[test]
    fn duplicate_intervention_type_is_rejected_but_others_accepted() {
        let engine = RuleEngine::default();
        let mut log = seeded();
        log.append(intervention("Intervention 01", "gms221", 0.3, now() - Duration::hours(2)));

        let verdict = engine.validate(
            &log,
            &Proposal::intervention("Intervention 01", "gms221"),
            now(),
        );
        assert_eq!(
            reject(verdict),
            Rejection::DuplicateIntervention {
                audience: "gms221".to_string(),
                intervention_type: "Intervention 01".to_string()
            }
        );

        let verdict = engine.validate(
            &log,
            &Proposal::intervention("Intervention 02", "gms221"),
            now(),
        );
        assert_eq!(verdict, Verdict::Accept);
    }

    #[test]
    fn intervention_after_infection_is_too_late() {
        let engine = RuleEngine::default();
        let verdict = engine.validate(
            &seeded(),
            &Proposal::intervention("Intervention 01", "thm220"),
            now(),
        );
        assert_eq!(
            reject(verdict),
            Rejection::TooLate {
                audience: "thm220".to_string()
            }
        );
    }

    #[test]
    fn intervention_audience_must_be_well_formed() {
        let engine = RuleEngine::default();
        let verdict = engine.validate(
            &seeded(),
            &Proposal::intervention("Intervention 01", "abc"),
            now(),
        );
        assert!(matches!(
            reject(verdict),
            Rejection::InvalidFormat {
                field: Field::Audience,
                ..
            }
        ));
    }

    #[test]
    fn intervention_outside_the_catalogue_is_rejected() {
        let engine = RuleEngine::default();
        let mut log = seeded();
        log.append(intervention("Intervention 01", "gms221", 0.3, now() - Duration::hours(2)));

        for label in ["intervention 01", "INTERVENTION 01", "made up"] {
            let verdict = engine.validate(&log, &Proposal::intervention(label, "gms221"), now());
            assert_eq!(
                reject(verdict),
                Rejection::UnknownIntervention {
                    intervention_type: label.to_string()
                }
            );
        }
    }

    #[test]
    fn configured_catalogue_replaces_the_default_labels() {
        let engine = RuleEngine::from_toml_str(r#"interventions = ["Masks"]"#).unwrap();
        let verdict = engine.validate(&seeded(), &Proposal::intervention("Masks", "gms221"), now());
        assert_eq!(verdict, Verdict::Accept);
        let verdict = engine.validate(
            &seeded(),
            &Proposal::intervention("Intervention 01", "gms221"),
            now(),
        );
        assert!(matches!(reject(verdict), Rejection::UnknownIntervention { .. }));
    }

    /// Interventions are not subject to the pairwise cooldown.
    #[test]
    fn interventions_skip_cooldown() {
        let engine = RuleEngine::default();
        let mut log = seeded();
        log.append(intervention("Intervention 01", "gms221", 0.3, now() - Duration::seconds(5)));

        let verdict = engine.validate(
            &log,
            &Proposal::intervention("Intervention 02", "gms221"),
            now(),
        );
        assert_eq!(verdict, Verdict::Accept);
    }

    // ── Configuration ─────────────────────────────────────────────────────────

    #[test]
    fn empty_toml_yields_classroom_defaults() {
        let engine = RuleEngine::from_toml_str("").unwrap();
        assert_eq!(engine.rules().cooldown_secs, 60);
        assert!(engine.rules().is_reserved("exp626"));
        assert_eq!(engine.rules().interventions.len(), 3);
        assert!(engine.rules().offers_intervention("Intervention 02"));
    }

    #[test]
    fn malformed_toml_is_a_config_error() {
        match RuleEngine::from_toml_str("cooldown_secs = ][") {
            Err(WmmError::ConfigError { reason }) => {
                assert!(reason.contains("failed to parse game rules TOML"), "{reason}");
            }
            other => panic!("expected ConfigError, got {other:?}"),
        }
    }

    #[test]
    fn negative_cooldown_is_a_config_error() {
        assert!(matches!(
            RuleEngine::from_toml_str("cooldown_secs = -1"),
            Err(WmmError::ConfigError { .. })
        ));
    }
}
