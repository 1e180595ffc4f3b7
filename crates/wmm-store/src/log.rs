//! The event log as a single CSV object in a bucket.

use std::sync::Arc;

use chrono::NaiveDateTime;
use tracing::{debug, info};

use wmm_contracts::{
    error::{WmmError, WmmResult},
    record::{
        EventKind, EventLog, InteractionRecord, LogSnapshot, Version, INFECTION_TYPE_SENTINEL,
    },
};
use wmm_core::traits::EventLogStore;
use wmm_outcome::EffectivenessTable;
use wmm_rules::RESERVED_USERNAME;

use crate::{
    codec::{decode_effectiveness_table, decode_log, encode_log},
    object::{ObjectStore, Precondition},
};

/// Default key of the event log object.
pub const DEFAULT_LOG_KEY: &str = "interactions.csv";

/// Default key of the effectiveness table object.
pub const DEFAULT_EFFECTIVENESS_KEY: &str = "intervention_effectiveness.csv";

/// `EventLogStore` over one object in an `ObjectStore`.
///
/// The whole log is read and written on every call. The version handed out
/// by `fetch` is the object's ETag, and `replace` only writes if the object
/// still has that ETag.
#[derive(Clone)]
pub struct ObjectEventLog {
    store: Arc<dyn ObjectStore>,
    key: String,
}

impl ObjectEventLog {
    pub fn new(store: Arc<dyn ObjectStore>, key: impl Into<String>) -> Self {
        Self {
            store,
            key: key.into(),
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }
}

impl std::fmt::Debug for ObjectEventLog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ObjectEventLog")
            .field("bucket", &self.store.bucket())
            .field("key", &self.key)
            .finish()
    }
}

impl EventLogStore for ObjectEventLog {
    fn fetch(&self) -> WmmResult<LogSnapshot> {
        let Some(object) = self.store.get(&self.key)? else {
            debug!(key = %self.key, "event log does not exist yet");
            return Ok(LogSnapshot::absent());
        };
        let log = decode_log(&object.bytes)?;
        debug!(key = %self.key, rows = log.len(), etag = %object.etag, "event log fetched");
        Ok(LogSnapshot::new(log, Version::ETag(object.etag)))
    }

    fn replace(&self, log: &EventLog, expected: &Version) -> WmmResult<Version> {
        let bytes = encode_log(log)?;
        let precondition = match expected {
            Version::Absent => Precondition::IfAbsent,
            Version::ETag(tag) => Precondition::IfMatch(tag.clone()),
        };
        let tag = self.store.put(&self.key, &bytes, precondition)?;
        Ok(Version::ETag(tag))
    }

    fn location(&self) -> String {
        format!("{}/{}", self.store.bucket(), self.key)
    }
}

/// Read and parse the effectiveness table at `key`.
///
/// A missing object is a read error: the KDE sampler cannot run without it.
pub fn load_effectiveness_table(
    store: &dyn ObjectStore,
    key: &str,
) -> WmmResult<EffectivenessTable> {
    let object = store.get(key)?.ok_or_else(|| WmmError::StorageRead {
        key: key.to_string(),
        reason: "object not found".to_string(),
    })?;
    let table = decode_effectiveness_table(&object.bytes)?;
    debug!(key = %key, intervention_types = table.len(), "effectiveness table loaded");
    Ok(table)
}

/// How to start a fresh event log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeedPlan {
    /// Actor of the seed rows.
    pub sentinel: String,
    /// Users infected at the start of the game.
    pub patient_zero: Vec<String>,
    /// Overwrite an existing log instead of refusing.
    pub force: bool,
}

impl SeedPlan {
    pub fn new<I, S>(patient_zero: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            sentinel: RESERVED_USERNAME.to_string(),
            patient_zero: patient_zero.into_iter().map(Into::into).collect(),
            force: false,
        }
    }

    pub fn force(mut self, force: bool) -> Self {
        self.force = force;
        self
    }

    /// The seed rows: one successful infection from the sentinel to each
    /// patient zero, with no recorded value.
    pub fn records(&self, now: NaiveDateTime) -> EventLog {
        self.patient_zero
            .iter()
            .filter(|user| !user.trim().is_empty())
            .map(|user| InteractionRecord {
                actor: self.sentinel.clone(),
                audience: user.trim().to_lowercase(),
                kind: EventKind::Infection,
                success: true,
                intervention_value: None,
                intervention_type: INFECTION_TYPE_SENTINEL.to_string(),
                timestamp: now,
            })
            .collect()
    }
}

/// Write a fresh event log to `key` from `plan`.
///
/// Without `plan.force` the write only succeeds if no log exists yet;
/// an existing log is reported as `WriteConflict`.
pub fn seed_log(
    store: &dyn ObjectStore,
    key: &str,
    plan: &SeedPlan,
    now: NaiveDateTime,
) -> WmmResult<Version> {
    if plan.patient_zero.iter().all(|u| u.trim().is_empty()) {
        return Err(WmmError::ConfigError {
            reason: "seeding needs at least one patient zero".to_string(),
        });
    }

    let log = plan.records(now);
    let precondition = if plan.force {
        Precondition::None
    } else {
        Precondition::IfAbsent
    };
    let tag = store.put(key, &encode_log(&log)?, precondition)?;

    info!(
        key = %key,
        patient_zero = ?plan.patient_zero,
        force = plan.force,
        "event log seeded"
    );
    Ok(Version::ETag(tag))
}
