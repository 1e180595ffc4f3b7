//! The contact network: who interacted with whom, and how it went.
//!
//! Nodes are every actor and audience in the log, edges are directed
//! actor → audience and deduplicated. Node status is assigned while
//! replaying the log in order:
//!
//! - an actor takes its status from the first row it appears in;
//! - an audience takes its status from the first row it appears in, and is
//!   updated again by every later infection row that targets it.
//!
//! A successful infection row gives `Infected`, a failed one `Contacted`,
//! and an intervention row `Unexposed`.

use std::collections::{HashMap, HashSet};

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use tracing::debug;

use wmm_contracts::record::{EventKind, EventLog, InteractionRecord};

/// Display status of a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeStatus {
    Infected,
    Contacted,
    Unexposed,
}

impl NodeStatus {
    fn of(row: &InteractionRecord) -> Self {
        match (row.kind, row.success) {
            (EventKind::Infection, true) => NodeStatus::Infected,
            (EventKind::Infection, false) => NodeStatus::Contacted,
            (EventKind::Intervention, _) => NodeStatus::Unexposed,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Node {
    pub name: String,
    pub status: NodeStatus,
}

/// What the network knows about one user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserReport {
    pub username: String,
    pub status: NodeStatus,
    /// Everyone this user has an edge to, in first-interaction order.
    pub primary: Vec<String>,
    /// Everyone a primary contact has an edge to, excluding this user and
    /// without repeats.
    pub secondary: Vec<String>,
    /// Number of primary contacts.
    pub infected_count: usize,
    /// Earliest successful infection this user performed.
    pub first_infection: Option<NaiveDateTime>,
}

/// Directed contact graph rebuilt from a log.
#[derive(Debug, Clone, Default)]
pub struct ContactNetwork {
    nodes: Vec<Node>,
    index: HashMap<String, usize>,
    successors: Vec<Vec<usize>>,
    edge_count: usize,
    first_infection: HashMap<String, NaiveDateTime>,
}

impl ContactNetwork {
    pub fn build(log: &EventLog) -> Self {
        let mut net = Self::default();
        for row in log {
            let status = NodeStatus::of(row);

            let actor = match net.index.get(&row.actor) {
                Some(&i) => i,
                None => net.add_node(&row.actor, status),
            };
            let audience = match net.index.get(&row.audience) {
                Some(&i) => {
                    if row.kind == EventKind::Infection {
                        net.nodes[i].status = status;
                    }
                    i
                }
                None => net.add_node(&row.audience, status),
            };

            if !net.successors[actor].contains(&audience) {
                net.successors[actor].push(audience);
                net.edge_count += 1;
            }

            if row.is_successful_infection() {
                net.first_infection
                    .entry(row.actor.clone())
                    .and_modify(|t| *t = (*t).min(row.timestamp))
                    .or_insert(row.timestamp);
            }
        }
        debug!(nodes = net.nodes.len(), edges = net.edge_count, "contact network built");
        net
    }

    fn add_node(&mut self, name: &str, status: NodeStatus) -> usize {
        let i = self.nodes.len();
        self.nodes.push(Node {
            name: name.to_string(),
            status,
        });
        self.index.insert(name.to_string(), i);
        self.successors.push(Vec::new());
        i
    }

    /// Nodes in first-seen order.
    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn node(&self, name: &str) -> Option<&Node> {
        self.index.get(name).map(|&i| &self.nodes[i])
    }

    /// Directed edges as (from, to) names.
    pub fn edges(&self) -> impl Iterator<Item = (&str, &str)> + '_ {
        self.successors.iter().enumerate().flat_map(move |(from, tos)| {
            tos.iter()
                .map(move |&to| (self.nodes[from].name.as_str(), self.nodes[to].name.as_str()))
        })
    }

    pub fn edge_count(&self) -> usize {
        self.edge_count
    }

    pub fn successors(&self, name: &str) -> Vec<&str> {
        self.index
            .get(name)
            .map(|&i| {
                self.successors[i]
                    .iter()
                    .map(|&j| self.nodes[j].name.as_str())
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Primary and secondary contacts of `username`, or `None` if the user
    /// is not in the network.
    pub fn search(&self, username: &str) -> Option<UserReport> {
        let &me = self.index.get(username)?;

        let primary: Vec<usize> = self.successors[me].clone();
        let mut seen: HashSet<usize> = HashSet::new();
        let secondary: Vec<String> = primary
            .iter()
            .flat_map(|&p| self.successors[p].iter().copied())
            .filter(|&s| s != me && seen.insert(s))
            .map(|s| self.nodes[s].name.clone())
            .collect();

        Some(UserReport {
            username: username.to_string(),
            status: self.nodes[me].status,
            infected_count: primary.len(),
            primary: primary.iter().map(|&p| self.nodes[p].name.clone()).collect(),
            secondary,
            first_infection: self.first_infection.get(username).copied(),
        })
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDateTime;

    use wmm_contracts::record::{EventKind, EventLog, InteractionRecord, TIMESTAMP_FORMAT};

    use super::{ContactNetwork, NodeStatus};

    fn ts(s: &str) -> NaiveDateTime {
        NaiveDateTime::parse_from_str(s, TIMESTAMP_FORMAT).unwrap()
    }

    fn infection(actor: &str, audience: &str, success: bool, at: &str) -> InteractionRecord {
        InteractionRecord {
            actor: actor.to_string(),
            audience: audience.to_string(),
            kind: EventKind::Infection,
            success,
            intervention_value: success.then_some(0.5),
            intervention_type: "-1".to_string(),
            timestamp: ts(at),
        }
    }

    fn intervention(label: &str, audience: &str, at: &str) -> InteractionRecord {
        InteractionRecord {
            actor: label.to_string(),
            audience: audience.to_string(),
            kind: EventKind::Intervention,
            success: true,
            intervention_value: Some(0.3),
            intervention_type: label.to_string(),
            timestamp: ts(at),
        }
    }

    /// exp626 → thm220 → {gms221 (infected), abc123 (contact)}; gms221 → xyz789.
    fn outbreak() -> EventLog {
        vec![
            infection("exp626", "thm220", true, "2025-03-01 08:00:00"),
            intervention("Intervention 01", "abc123", "2025-03-01 08:30:00"),
            infection("thm220", "abc123", false, "2025-03-01 09:00:00"),
            infection("thm220", "gms221", true, "2025-03-01 09:30:00"),
            infection("thm220", "abc123", false, "2025-03-01 09:45:00"),
            infection("gms221", "xyz789", true, "2025-03-01 10:00:00"),
            infection("gms221", "thm220", false, "2025-03-01 10:10:00"),
        ]
        .into()
    }

    #[test]
    fn statuses_follow_replay_order() {
        let net = ContactNetwork::build(&outbreak());
        let status = |n: &str| net.node(n).unwrap().status;

        assert_eq!(status("exp626"), NodeStatus::Infected);
        assert_eq!(status("Intervention 01"), NodeStatus::Unexposed);
        // Intervention first, then overwritten by the later contact rows.
        assert_eq!(status("abc123"), NodeStatus::Contacted);
        assert_eq!(status("xyz789"), NodeStatus::Infected);
        // Audience status is overwritten by every infection row.
        assert_eq!(status("thm220"), NodeStatus::Contacted);
    }

    #[test]
    fn edges_are_directed_and_deduplicated() {
        let net = ContactNetwork::build(&outbreak());
        assert_eq!(net.edge_count(), 6);
        assert_eq!(net.successors("thm220"), ["abc123", "gms221"]);
        assert!(net.edges().any(|e| e == ("gms221", "thm220")));
        assert_eq!(net.nodes().len(), 6);
    }

    #[test]
    fn search_reports_primary_and_secondary_contacts() {
        let net = ContactNetwork::build(&outbreak());
        let report = net.search("thm220").unwrap();

        assert_eq!(report.primary, ["abc123", "gms221"]);
        // gms221 → {xyz789, thm220}; the user itself is excluded.
        assert_eq!(report.secondary, ["xyz789"]);
        assert_eq!(report.infected_count, 2);
        assert_eq!(report.first_infection, Some(ts("2025-03-01 09:30:00")));
    }

    #[test]
    fn search_for_a_user_without_infections() {
        let net = ContactNetwork::build(&outbreak());
        let report = net.search("xyz789").unwrap();
        assert!(report.primary.is_empty());
        assert_eq!(report.first_infection, None);
        assert!(net.search("nobody1").is_none());
    }

    #[test]
    fn report_serializes_for_json_output() {
        let net = ContactNetwork::build(&outbreak());
        let json = serde_json::to_value(net.search("gms221").unwrap()).unwrap();
        assert_eq!(json["status"], "infected");
        assert_eq!(json["primary"][0], "xyz789");
    }
}
