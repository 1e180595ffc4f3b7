//! Headline totals for a log.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use wmm_contracts::record::{EventKind, EventLog};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Summary {
    pub rows: usize,
    /// Successful infections.
    pub infections: usize,
    /// Failed infection attempts.
    pub contacts: usize,
    pub interventions: usize,
    /// Distinct usernames: infection actors and every audience.
    pub users: usize,
    pub infected_users: usize,
    pub first_event: Option<chrono::NaiveDateTime>,
    pub last_event: Option<chrono::NaiveDateTime>,
}

impl Summary {
    pub fn from_log(log: &EventLog) -> Self {
        let mut users = BTreeSet::new();
        let mut infected = BTreeSet::new();
        let mut summary = Summary {
            rows: log.len(),
            ..Summary::default()
        };

        for row in log {
            users.insert(row.audience.as_str());
            match (row.kind, row.success) {
                (EventKind::Infection, success) => {
                    users.insert(row.actor.as_str());
                    if success {
                        summary.infections += 1;
                        infected.insert(row.audience.as_str());
                    } else {
                        summary.contacts += 1;
                    }
                }
                (EventKind::Intervention, _) => summary.interventions += 1,
            }
            summary.first_event = Some(
                summary
                    .first_event
                    .map_or(row.timestamp, |t| t.min(row.timestamp)),
            );
            summary.last_event = Some(
                summary
                    .last_event
                    .map_or(row.timestamp, |t| t.max(row.timestamp)),
            );
        }

        summary.users = users.len();
        summary.infected_users = infected.len();
        summary
    }
}
