//! Core trait definitions for the WMM submission pipeline.
//!
//! These traits define the seams around the append transaction:
//!
//! - `EventLogStore`:        durable home of the event log (fetch / replace)
//! - `Validator`:            pure rule check, evaluated before anything is drawn
//! - `InfectionResolver`:    turns an accepted infection into a drawn outcome
//! - `EffectivenessSampler`: draws an intervention's effectiveness value
//! - `RandomSource`:         the only source of randomness the resolvers see
//! - `Notifier`:             best-effort delivery of infection notices
//! - `Clock`:                local wall-clock time for timestamps and cooldowns
//!
//! `AppendTransaction` wires them together in order. Resolvers are never
//! called unless the validator first returns `Verdict::Accept`.

use chrono::{NaiveDateTime, Timelike};

use wmm_contracts::{
    error::WmmResult,
    outcome::{InfectionOutcome, NotificationIntent},
    proposal::Proposal,
    record::{EventLog, LogSnapshot, Version},
    verdict::Verdict,
};

/// Durable storage for the whole event log object.
///
/// The log is always read and written wholesale. `replace` is a conditional
/// write: it must fail with `WmmError::WriteConflict` if the stored object is
/// no longer at `expected`.
pub trait EventLogStore: Send + Sync {
    /// Read the latest log and the version it was read at.
    ///
    /// A log object that does not exist yet is returned as an empty log at
    /// `Version::Absent`.
    fn fetch(&self) -> WmmResult<LogSnapshot>;

    /// Replace the stored log with `log` if it is still at `expected`.
    ///
    /// Returns the version of the newly written object.
    fn replace(&self, log: &EventLog, expected: &Version) -> WmmResult<Version>;

    /// Human-readable location (bucket and key) for log lines.
    fn location(&self) -> String;
}

/// The validation engine: the gate in front of every append.
///
/// Implementations must be pure: no I/O, no randomness, no side effects.
pub trait Validator: Send + Sync {
    /// Decide whether `proposal` may be applied to `log` at time `now`.
    fn validate(&self, log: &EventLog, proposal: &Proposal, now: NaiveDateTime) -> Verdict;
}

/// A uniform / normal random source.
///
/// Production implementations draw fresh entropy; tests script the values.
pub trait RandomSource: Send {
    /// A uniform value in `[0, 1)`.
    fn uniform(&mut self) -> f64;

    /// A draw from the standard normal distribution.
    fn standard_normal(&mut self) -> f64;

    /// A uniform index in `0..len`. `len` must be non-zero.
    fn index(&mut self, len: usize) -> usize;
}

/// Computes and draws the outcome of an accepted infection attempt.
pub trait InfectionResolver: Send + Sync {
    fn resolve(
        &self,
        log: &EventLog,
        audience: &str,
        rng: &mut dyn RandomSource,
    ) -> InfectionOutcome;
}

/// Draws an effectiveness value in `[0, 1]` for an intervention type.
pub trait EffectivenessSampler: Send + Sync {
    fn sample(&self, intervention_type: &str, rng: &mut dyn RandomSource) -> WmmResult<f64>;
}

/// Delivers infection notices.
///
/// Called only after the log append has committed. A returned error is
/// logged and otherwise ignored.
pub trait Notifier: Send + Sync {
    fn notify(&self, intent: &NotificationIntent) -> WmmResult<()>;
}

/// A notifier that drops every intent.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullNotifier;

impl Notifier for NullNotifier {
    fn notify(&self, _intent: &NotificationIntent) -> WmmResult<()> {
        Ok(())
    }
}

/// A notifier that writes each intent to the log at `info` level.
///
/// Stands in for a mailer when none is configured.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn notify(&self, intent: &NotificationIntent) -> WmmResult<()> {
        tracing::info!(
            recipient = %intent.recipient,
            kind = ?intent.kind,
            subject = intent.subject(),
            "notification"
        );
        Ok(())
    }
}

/// Source of the current local time.
pub trait Clock: Send + Sync {
    /// Local wall-clock time, truncated to whole seconds.
    fn now(&self) -> NaiveDateTime;
}

/// The host's local clock.
#[derive(Debug, Default, Clone, Copy)]
pub struct LocalClock;

impl Clock for LocalClock {
    fn now(&self) -> NaiveDateTime {
        let now = chrono::Local::now().naive_local();
        now.with_nanosecond(0).unwrap_or(now)
    }
}

/// A clock that only moves when told to.
#[derive(Debug)]
pub struct FixedClock {
    now: std::sync::Mutex<NaiveDateTime>,
}

impl FixedClock {
    pub fn new(now: NaiveDateTime) -> Self {
        Self {
            now: std::sync::Mutex::new(now),
        }
    }

    /// Move the clock forward by `by`.
    pub fn advance(&self, by: chrono::Duration) {
        if let Ok(mut now) = self.now.lock() {
            *now += by;
        }
    }
}

impl Clock for FixedClock {
    fn now(&self) -> NaiveDateTime {
        match self.now.lock() {
            Ok(now) => *now,
            Err(poisoned) => *poisoned.into_inner(),
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, NaiveDateTime, Timelike};

    use super::{Clock, FixedClock, LocalClock};

    #[test]
    fn local_clock_has_whole_seconds() {
        assert_eq!(LocalClock.now().nanosecond(), 0);
    }

    #[test]
    fn fixed_clock_moves_only_when_advanced() {
        let start =
            NaiveDateTime::parse_from_str("2025-03-01 10:00:00", "%Y-%m-%d %H:%M:%S").unwrap();
        let clock = FixedClock::new(start);
        assert_eq!(clock.now(), start);
        clock.advance(Duration::seconds(61));
        assert_eq!(clock.now(), start + Duration::seconds(61));
    }
}
