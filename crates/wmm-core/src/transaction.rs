//! The append transaction: the only code path that mutates the event log.
//!
//! Every submission follows the same pipeline:
//!
//!   Fetch → Validate → [Resolve] → Build record → Conditional write → Cache → Notify
//!
//! Resolvers are only reachable after the validator returns `Accept`, so a
//! rejected proposal never consumes randomness and never touches storage.
//!
//! The write-back is guarded by the version the log was fetched at. When
//! another submitter wrote in between, the store reports a conflict and the
//! whole pipeline re-runs on the fresh log, so a concurrent append is never
//! silently overwritten.

use std::sync::Mutex;

use chrono::NaiveDateTime;
use tracing::{debug, error, info, warn};

use wmm_contracts::{
    error::{WmmError, WmmResult},
    outcome::{NotificationIntent, NotificationKind, SubmitOutcome},
    proposal::{Proposal, SubmissionId},
    record::{EventKind, EventLog, InteractionRecord, LogSnapshot, INFECTION_TYPE_SENTINEL},
    verdict::Verdict,
};

use crate::traits::{
    Clock, EffectivenessSampler, EventLogStore, InfectionResolver, LocalClock, Notifier,
    NullNotifier, RandomSource, Validator,
};

/// Default number of fetch/validate/write rounds before giving up on conflicts.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// Default domain appended to usernames for notification addresses.
pub const DEFAULT_MAIL_DOMAIN: &str = "lehigh.edu";

/// Owns the event-log cache and drives submissions through the pipeline.
///
/// One transaction may be shared by many callers; all state it holds is
/// behind mutexes. The cache is a read-through copy of the last snapshot
/// this transaction fetched or wrote. It is replaced on every fetch and is
/// never consulted for validation.
pub struct AppendTransaction {
    store: Box<dyn EventLogStore>,
    validator: Box<dyn Validator>,
    infection: Box<dyn InfectionResolver>,
    sampler: Box<dyn EffectivenessSampler>,
    notifier: Box<dyn Notifier>,
    clock: Box<dyn Clock>,
    rng: Mutex<Box<dyn RandomSource>>,
    cache: Mutex<Option<LogSnapshot>>,
    max_attempts: u32,
    mail_domain: String,
}

/// A record ready to append, and how to report it once committed.
struct Applied {
    record: InteractionRecord,
    outcome: SubmitOutcome,
}

impl AppendTransaction {
    /// Create a transaction over `store` with the given rule and outcome
    /// components. Notifications default to `NullNotifier`, time to
    /// `LocalClock`.
    pub fn new(
        store: Box<dyn EventLogStore>,
        validator: Box<dyn Validator>,
        infection: Box<dyn InfectionResolver>,
        sampler: Box<dyn EffectivenessSampler>,
        rng: Box<dyn RandomSource>,
    ) -> Self {
        Self {
            store,
            validator,
            infection,
            sampler,
            notifier: Box::new(NullNotifier),
            clock: Box::new(LocalClock),
            rng: Mutex::new(rng),
            cache: Mutex::new(None),
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            mail_domain: DEFAULT_MAIL_DOMAIN.to_string(),
        }
    }

    pub fn with_notifier(mut self, notifier: Box<dyn Notifier>) -> Self {
        self.notifier = notifier;
        self
    }

    pub fn with_clock(mut self, clock: Box<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Bound the number of conflict retries. Values below 1 are treated as 1.
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts.max(1);
        self
    }

    pub fn with_mail_domain(mut self, domain: impl Into<String>) -> Self {
        self.mail_domain = domain.into();
        self
    }

    /// The last snapshot this transaction fetched or committed, if any.
    pub fn cached(&self) -> Option<LogSnapshot> {
        match self.cache.lock() {
            Ok(cache) => cache.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    /// Fetch the latest log from storage and replace the cache with it.
    pub fn refresh(&self) -> WmmResult<LogSnapshot> {
        let snapshot = self.store.fetch()?;
        self.set_cache(snapshot.clone());
        Ok(snapshot)
    }

    /// Validate `proposal` against the latest stored log and, if accepted,
    /// durably append exactly one record for it.
    ///
    /// # Pipeline
    ///
    /// 1. Fetch the latest snapshot; it replaces the cache
    /// 2. Run the validator; a rejection returns `SubmitOutcome::Rejected`
    ///    without touching storage
    /// 3. Resolve the outcome (infection draw or effectiveness sample)
    /// 4. Build one record stamped with the current local time
    /// 5. Append it to the fetched log and write back, guarded by the
    ///    fetched version
    /// 6. On conflict, go back to 1 (bounded by `max_attempts`)
    /// 7. On success, cache the written snapshot and emit a notification
    ///    intent for infection attempts
    ///
    /// # Errors
    ///
    /// Storage read and write failures, persistent write conflicts, and
    /// resolver faults. A rejection is NOT an error. When an error is
    /// returned the event must be treated as not committed.
    pub fn submit(&self, proposal: &Proposal) -> WmmResult<SubmitOutcome> {
        let submission_id = SubmissionId::new();
        let proposal = proposal.normalized();

        debug!(
            submission_id = %submission_id,
            kind = %proposal.kind,
            actor = %proposal.actor,
            audience = %proposal.audience,
            "submission starting"
        );

        let mut attempt = 0;
        loop {
            attempt += 1;

            // ── Step 1: Fetch the authoritative snapshot ─────────────────────
            let snapshot = self.refresh()?;
            let now = self.clock.now();

            // ── Step 2: Validation ───────────────────────────────────────────
            if let Verdict::Reject(reason) =
                self.validator.validate(&snapshot.log, &proposal, now)
            {
                info!(
                    submission_id = %submission_id,
                    reason = %reason,
                    "submission rejected"
                );
                return Ok(SubmitOutcome::Rejected { reason });
            }

            // ── Steps 3 & 4: Resolve and build the record ────────────────────
            let applied = self
                .apply(&snapshot.log, &proposal, now)
                .inspect_err(|e| {
                    error!(
                        submission_id = %submission_id,
                        error = %e,
                        "outcome resolution failed"
                    );
                })?;

            // ── Step 5: Conditional write-back ───────────────────────────────
            let mut next = snapshot.log.clone();
            next.append(applied.record.clone());

            match self.store.replace(&next, &snapshot.version) {
                Ok(version) => {
                    info!(
                        submission_id = %submission_id,
                        location = %self.store.location(),
                        rows = next.len(),
                        version = %version,
                        attempt,
                        "event appended"
                    );
                    self.set_cache(LogSnapshot::new(next, version));
                    self.emit_notification(&submission_id, &applied.record);
                    return Ok(applied.outcome);
                }

                // ── Step 6: Lost the race, start over on the fresh log ───────
                Err(WmmError::WriteConflict {
                    key,
                    expected,
                    found,
                }) => {
                    if attempt >= self.max_attempts {
                        warn!(
                            submission_id = %submission_id,
                            attempts = attempt,
                            "giving up after repeated write conflicts"
                        );
                        return Err(WmmError::WriteConflict {
                            key,
                            expected,
                            found,
                        });
                    }
                    warn!(
                        submission_id = %submission_id,
                        attempt,
                        expected = %expected,
                        found = %found,
                        "log changed during submission, retrying"
                    );
                }

                Err(e) => {
                    error!(
                        submission_id = %submission_id,
                        error = %e,
                        "write-back failed; event not committed"
                    );
                    return Err(e);
                }
            }
        }
    }

    /// Resolve the outcome for an accepted proposal and build its record.
    fn apply(&self, log: &EventLog, proposal: &Proposal, now: NaiveDateTime) -> WmmResult<Applied> {
        let mut rng = self.rng.lock().map_err(|e| WmmError::ConfigError {
            reason: format!("random source lock poisoned: {e}"),
        })?;

        match proposal.kind {
            EventKind::Infection => {
                let outcome = self.infection.resolve(log, &proposal.audience, rng.as_mut());
                debug!(
                    audience = %proposal.audience,
                    probability = outcome.probability,
                    succeeded = outcome.succeeded,
                    "infection drawn"
                );

                let record = InteractionRecord {
                    actor: proposal.actor.clone(),
                    audience: proposal.audience.clone(),
                    kind: EventKind::Infection,
                    success: outcome.succeeded,
                    intervention_value: outcome.value,
                    intervention_type: INFECTION_TYPE_SENTINEL.to_string(),
                    timestamp: now,
                };
                let outcome = if outcome.succeeded {
                    SubmitOutcome::Infected {
                        record: record.clone(),
                    }
                } else {
                    SubmitOutcome::NotInfected {
                        record: record.clone(),
                    }
                };
                Ok(Applied { record, outcome })
            }

            EventKind::Intervention => {
                // The validator refuses interventions without a type, so a
                // missing one here falls back to the actor label.
                let intervention_type = proposal
                    .intervention_type
                    .clone()
                    .unwrap_or_else(|| proposal.actor.clone());
                let value = self.sampler.sample(&intervention_type, rng.as_mut())?;
                debug!(
                    audience = %proposal.audience,
                    intervention_type = %intervention_type,
                    value,
                    "intervention effectiveness sampled"
                );

                let record = InteractionRecord {
                    actor: proposal.actor.clone(),
                    audience: proposal.audience.clone(),
                    kind: EventKind::Intervention,
                    success: true,
                    intervention_value: Some(value),
                    intervention_type,
                    timestamp: now,
                };
                Ok(Applied {
                    outcome: SubmitOutcome::InterventionRecorded {
                        record: record.clone(),
                    },
                    record,
                })
            }
        }
    }

    fn emit_notification(&self, submission_id: &SubmissionId, record: &InteractionRecord) {
        if record.kind != EventKind::Infection {
            return;
        }

        let intent = NotificationIntent {
            username: record.audience.clone(),
            recipient: format!("{}@{}", record.audience, self.mail_domain),
            kind: if record.success {
                NotificationKind::Infected
            } else {
                NotificationKind::Contacted
            },
        };

        if let Err(e) = self.notifier.notify(&intent) {
            warn!(
                submission_id = %submission_id,
                recipient = %intent.recipient,
                error = %e,
                "notification failed; committed event is unaffected"
            );
        }
    }

    fn set_cache(&self, snapshot: LogSnapshot) {
        match self.cache.lock() {
            Ok(mut cache) => *cache = Some(snapshot),
            Err(poisoned) => *poisoned.into_inner() = Some(snapshot),
        }
    }
}

// ── Tests ────────────────────────────────────────────────────────────────────
