//! Interaction records and the event log they form.
//!
//! One `InteractionRecord` is one row of the shared event log. The log is
//! append-only: rows are never edited or removed once written, and every
//! derived fact (who is infected, who may infect, which interventions an
//! audience has received) is recomputed from the full sequence.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// Timestamp layout used on the wire and for cooldown arithmetic.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Value stored in `intervention_type` for infection rows.
pub const INFECTION_TYPE_SENTINEL: &str = "-1";

/// Discriminates the two kinds of event a student can submit.
///
/// Stored in the `infection_intervention` column as `1` (infection) or
/// `0` (intervention).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    Infection,
    Intervention,
}

impl EventKind {
    /// The `infection_intervention` flag for this kind.
    pub fn as_flag(self) -> u8 {
        match self {
            EventKind::Infection => 1,
            EventKind::Intervention => 0,
        }
    }

    /// Inverse of [`EventKind::as_flag`]. Any non-zero flag is an infection.
    pub fn from_flag(flag: u8) -> Self {
        if flag == 0 {
            EventKind::Intervention
        } else {
            EventKind::Infection
        }
    }
}

impl std::fmt::Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EventKind::Infection => write!(f, "infection"),
            EventKind::Intervention => write!(f, "intervention"),
        }
    }
}

/// A single row of the event log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InteractionRecord {
    /// Initiator. A username for infections, the intervention label for
    /// interventions.
    pub actor: String,
    /// Recipient of the event.
    pub audience: String,
    /// Infection attempt or intervention.
    pub kind: EventKind,
    /// Infection took hold / intervention recorded. `false` marks a
    /// contact-only row (a failed infection).
    pub success: bool,
    /// Baseline probability (successful infection) or sampled effectiveness
    /// (intervention). Absent for contact-only rows.
    pub intervention_value: Option<f64>,
    /// Intervention label, or [`INFECTION_TYPE_SENTINEL`] for infection rows.
    pub intervention_type: String,
    /// Local wall-clock time of the event, second precision.
    pub timestamp: NaiveDateTime,
}

impl InteractionRecord {
    /// True for a row that infected its audience.
    pub fn is_successful_infection(&self) -> bool {
        self.kind == EventKind::Infection && self.success
    }

    /// True for an intervention row.
    pub fn is_intervention(&self) -> bool {
        self.kind == EventKind::Intervention
    }

    /// The timestamp rendered with [`TIMESTAMP_FORMAT`].
    pub fn timestamp_string(&self) -> String {
        self.timestamp.format(TIMESTAMP_FORMAT).to_string()
    }
}

/// The ordered, append-only sequence of interaction records.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EventLog {
    records: Vec<InteractionRecord>,
}

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one record at the end of the log.
    pub fn append(&mut self, record: InteractionRecord) {
        self.records.push(record);
    }

    pub fn records(&self) -> &[InteractionRecord] {
        &self.records
    }

    pub fn iter(&self) -> std::slice::Iter<'_, InteractionRecord> {
        self.records.iter()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// True if `username` has ever been successfully infected.
    ///
    /// Infected and contagious are the same predicate: anyone who was ever
    /// infected may infect others.
    pub fn is_infected(&self, username: &str) -> bool {
        self.records
            .iter()
            .any(|r| r.is_successful_infection() && r.audience == username)
    }

    /// Intervention rows whose audience is `username`, in log order.
    pub fn interventions_for<'a>(
        &'a self,
        username: &'a str,
    ) -> impl Iterator<Item = &'a InteractionRecord> + 'a {
        self.records
            .iter()
            .filter(move |r| r.is_intervention() && r.audience == username)
    }
}

impl From<Vec<InteractionRecord>> for EventLog {
    fn from(records: Vec<InteractionRecord>) -> Self {
        Self { records }
    }
}

impl FromIterator<InteractionRecord> for EventLog {
    fn from_iter<I: IntoIterator<Item = InteractionRecord>>(iter: I) -> Self {
        Self {
            records: iter.into_iter().collect(),
        }
    }
}

impl<'a> IntoIterator for &'a EventLog {
    type Item = &'a InteractionRecord;
    type IntoIter = std::slice::Iter<'a, InteractionRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.iter()
    }
}

/// Storage version of a fetched log object.
///
/// `Absent` means the object did not exist when it was read; a write guarded
/// by `Absent` only succeeds if nobody has created it in the meantime.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Version {
    Absent,
    ETag(String),
}

impl std::fmt::Display for Version {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Version::Absent => write!(f, "<absent>"),
            Version::ETag(tag) => write!(f, "{tag}"),
        }
    }
}

/// An event log as read from storage, tagged with the version it was read at.
#[derive(Debug, Clone, PartialEq)]
pub struct LogSnapshot {
    pub log: EventLog,
    pub version: Version,
}

impl LogSnapshot {
    pub fn new(log: EventLog, version: Version) -> Self {
        Self { log, version }
    }

    /// Snapshot of a log object that does not exist yet.
    pub fn absent() -> Self {
        Self {
            log: EventLog::new(),
            version: Version::Absent,
        }
    }
}
