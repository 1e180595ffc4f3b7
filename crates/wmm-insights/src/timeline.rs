//! Cumulative event counts per hour.

use std::collections::BTreeMap;

use chrono::{NaiveDateTime, Timelike};

use wmm_contracts::record::{EventLog, InteractionRecord};

/// One point of a cumulative series: the hour and the running total at the
/// end of it.
pub type HourlyPoint = (NaiveDateTime, u64);

/// `ts` with minutes and seconds dropped.
pub fn floor_to_hour(ts: NaiveDateTime) -> NaiveDateTime {
    ts.date().and_hms_opt(ts.hour(), 0, 0).unwrap_or(ts)
}

/// Running totals over the hours in which at least one row occurred.
fn cumulative<'a>(rows: impl Iterator<Item = &'a InteractionRecord>) -> Vec<HourlyPoint> {
    let mut per_hour: BTreeMap<NaiveDateTime, u64> = BTreeMap::new();
    for row in rows {
        *per_hour.entry(floor_to_hour(row.timestamp)).or_default() += 1;
    }

    let mut total = 0;
    per_hour
        .into_iter()
        .map(|(hour, count)| {
            total += count;
            (hour, total)
        })
        .collect()
}

/// Cumulative successful infections, one point per hour with any.
pub fn cumulative_infections_by_hour(log: &EventLog) -> Vec<HourlyPoint> {
    cumulative(log.iter().filter(|r| r.is_successful_infection()))
}

/// Cumulative interventions, one series per intervention type.
pub fn cumulative_interventions_by_hour(log: &EventLog) -> BTreeMap<String, Vec<HourlyPoint>> {
    let mut by_type: BTreeMap<&str, Vec<&InteractionRecord>> = BTreeMap::new();
    for row in log.iter().filter(|r| r.is_intervention()) {
        if row.intervention_type.is_empty() {
            continue;
        }
        by_type.entry(&row.intervention_type).or_default().push(row);
    }

    by_type
        .into_iter()
        .map(|(kind, rows)| (kind.to_string(), cumulative(rows.into_iter())))
        .collect()
}
