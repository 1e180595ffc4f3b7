//! Derived lookups over the event log.
//!
//! `LogIndex` is built in one pass over a snapshot and answers the questions
//! the validation rules ask: when did this ordered pair last interact, is
//! this user infected, and has this audience already received a given
//! intervention. It borrows from the log and is rebuilt for every
//! validation, so it can never go stale.

use std::collections::{HashMap, HashSet};

use chrono::NaiveDateTime;

use wmm_contracts::record::EventLog;

#[derive(Debug, Default)]
pub struct LogIndex<'a> {
    last_pair: HashMap<(&'a str, &'a str), NaiveDateTime>,
    infected: HashSet<&'a str>,
    interventions: HashMap<&'a str, HashSet<&'a str>>,
}

impl<'a> LogIndex<'a> {
    pub fn build(log: &'a EventLog) -> Self {
        let mut index = LogIndex::default();

        for record in log {
            let pair = (record.actor.as_str(), record.audience.as_str());
            index
                .last_pair
                .entry(pair)
                .and_modify(|last| {
                    if record.timestamp > *last {
                        *last = record.timestamp;
                    }
                })
                .or_insert(record.timestamp);

            if record.is_successful_infection() {
                index.infected.insert(record.audience.as_str());
            }

            if record.is_intervention() {
                index
                    .interventions
                    .entry(record.audience.as_str())
                    .or_default()
                    .insert(record.intervention_type.as_str());
            }
        }

        index
    }

    /// Latest timestamp of any record for the ordered pair.
    pub fn last_interaction(&self, actor: &str, audience: &str) -> Option<NaiveDateTime> {
        self.last_pair.get(&(actor, audience)).copied()
    }

    /// True if `username` was ever the audience of a successful infection.
    pub fn is_infected(&self, username: &str) -> bool {
        self.infected.contains(username)
    }

    /// Anyone who was ever infected may infect others.
    pub fn is_contagious(&self, username: &str) -> bool {
        self.is_infected(username)
    }

    pub fn has_intervention(&self, audience: &str, intervention_type: &str) -> bool {
        self.interventions
            .get(audience)
            .is_some_and(|types| types.contains(intervention_type))
    }
}
