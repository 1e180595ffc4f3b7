//! Infection outcome resolution.
//!
//! The chance that an attempt infects its audience starts at the baseline
//! and is discounted multiplicatively by every intervention the audience has
//! received:
//!
//!   p = baseline × Π (1 − vᵢ)
//!
//! where `vᵢ` are the stored effectiveness values of the audience's
//! intervention rows. Rows with no value are skipped. Contact-only infection
//! rows never discount anything.

use wmm_contracts::{outcome::InfectionOutcome, record::EventLog};
use wmm_core::traits::{InfectionResolver, RandomSource};

/// Probability that an undefended audience is infected by one attempt.
pub const INFECTION_BASELINE: f64 = 0.50;

/// The discounted infection probability for `audience`.
pub fn infection_probability(log: &EventLog, audience: &str, baseline: f64) -> f64 {
    log.interventions_for(audience)
        .filter_map(|r| r.intervention_value)
        .fold(baseline, |p, v| p * (1.0 - v))
}

/// Draws infection outcomes against a fixed baseline.
#[derive(Debug, Clone, Copy)]
pub struct BaselineInfectionResolver {
    baseline: f64,
}

impl BaselineInfectionResolver {
    pub fn new(baseline: f64) -> Self {
        Self { baseline }
    }

    pub fn baseline(&self) -> f64 {
        self.baseline
    }
}

impl Default for BaselineInfectionResolver {
    fn default() -> Self {
        Self::new(INFECTION_BASELINE)
    }
}

impl InfectionResolver for BaselineInfectionResolver {
    fn resolve(
        &self,
        log: &EventLog,
        audience: &str,
        rng: &mut dyn RandomSource,
    ) -> InfectionOutcome {
        let probability = infection_probability(log, audience, self.baseline);
        let succeeded = rng.uniform() < probability;
        InfectionOutcome {
            succeeded,
            probability,
            value: succeeded.then_some(self.baseline),
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDateTime;

    use wmm_contracts::record::{EventKind, EventLog, InteractionRecord, TIMESTAMP_FORMAT};
    use wmm_core::traits::InfectionResolver;

    use crate::random::ScriptedSource;

    use super::{infection_probability, BaselineInfectionResolver, INFECTION_BASELINE};

    fn row(
        audience: &str,
        kind: EventKind,
        success: bool,
        value: Option<f64>,
    ) -> InteractionRecord {
        InteractionRecord {
            actor: "x1".to_string(),
            audience: audience.to_string(),
            kind,
            success,
            intervention_value: value,
            intervention_type: "Intervention 01".to_string(),
            timestamp: NaiveDateTime::parse_from_str("2025-03-01 10:00:00", TIMESTAMP_FORMAT)
                .unwrap(),
        }
    }

    #[test]
    fn undefended_audience_gets_the_baseline() {
        let log = EventLog::new();
        assert_eq!(infection_probability(&log, "gms221", INFECTION_BASELINE), 0.5);
    }

    #[test]
    fn interventions_discount_multiplicatively() {
        let log: EventLog = vec![
            row("gms221", EventKind::Intervention, true, Some(0.3)),
            row("gms221", EventKind::Intervention, true, Some(0.2)),
            // Ignored: other audience, contact row, missing value.
            row("abc123", EventKind::Intervention, true, Some(0.9)),
            row("gms221", EventKind::Infection, false, None),
            row("gms221", EventKind::Intervention, true, None),
        ]
        .into();

        let p = infection_probability(&log, "gms221", INFECTION_BASELINE);
        assert!((p - 0.28).abs() < 1e-12, "expected 0.28, got {p}");
    }

    /// The draw succeeds strictly below the probability.
    #[test]
    fn pinned_draws_straddle_the_baseline() {
        let resolver = BaselineInfectionResolver::default();
        let log = EventLog::new();

        let hit = resolver.resolve(&log, "gms221", &mut ScriptedSource::new([0.49]));
        assert!(hit.succeeded);
        assert_eq!(hit.value, Some(0.5));
        assert_eq!(hit.probability, 0.5);

        let miss = resolver.resolve(&log, "gms221", &mut ScriptedSource::new([0.50]));
        assert!(!miss.succeeded);
        assert_eq!(miss.value, None);
    }

    #[test]
    fn defended_audience_resists_a_draw_the_baseline_would_pass() {
        let resolver = BaselineInfectionResolver::default();
        let log: EventLog = vec![
            row("gms221", EventKind::Intervention, true, Some(0.3)),
            row("gms221", EventKind::Intervention, true, Some(0.2)),
        ]
        .into();

        let outcome = resolver.resolve(&log, "gms221", &mut ScriptedSource::new([0.30]));
        assert!(!outcome.succeeded);
        assert!((outcome.probability - 0.28).abs() < 1e-12);
    }
}
