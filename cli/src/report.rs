//! Text and JSON rendering of command results.

use std::collections::BTreeMap;

use serde::Serialize;
use tracing::error;

use wmm_contracts::{outcome::SubmitOutcome, record::EventLog, record::Version};
use wmm_insights::{
    cumulative_infections_by_hour, cumulative_interventions_by_hour, ContactNetwork, HourlyPoint,
    Node, Summary,
};
use wmm_store::SeedPlan;

fn print_json<T: Serialize + ?Sized>(value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(text) => println!("{text}"),
        Err(e) => error!(error = %e, "failed to render JSON output"),
    }
}

pub fn seeded(plan: &SeedPlan, version: &Version, json: bool) {
    if json {
        print_json(&serde_json::json!({
            "patient_zero": plan.patient_zero,
            "version": version.to_string(),
        }));
        return;
    }
    println!(
        "Seeded a new event log with patient zero: {}",
        plan.patient_zero.join(", ")
    );
}

pub fn submitted(outcome: &SubmitOutcome, json: bool) {
    if json {
        print_json(outcome);
        return;
    }
    println!("{}", outcome.message());
}

pub fn interventions(labels: &[String], json: bool) {
    if json {
        print_json(labels);
        return;
    }
    for label in labels {
        println!("{label}");
    }
}

pub fn summary(log: &EventLog, json: bool) {
    let s = Summary::from_log(log);
    if json {
        print_json(&s);
        return;
    }
    println!("Rows:            {}", s.rows);
    println!("Users:           {}", s.users);
    println!("Infected users:  {}", s.infected_users);
    println!("Infections:      {}", s.infections);
    println!("Contacts:        {}", s.contacts);
    println!("Interventions:   {}", s.interventions);
    if let (Some(first), Some(last)) = (s.first_event, s.last_event) {
        println!("Span:            {first} .. {last}");
    }
}

#[derive(Serialize)]
struct Timeline {
    infections: Vec<HourlyPoint>,
    interventions: BTreeMap<String, Vec<HourlyPoint>>,
}

pub fn timeline(log: &EventLog, json: bool) {
    let t = Timeline {
        infections: cumulative_infections_by_hour(log),
        interventions: cumulative_interventions_by_hour(log),
    };
    if json {
        print_json(&t);
        return;
    }

    println!("Cumulative infections");
    if t.infections.is_empty() {
        println!("  (none yet)");
    }
    for (hour, total) in &t.infections {
        println!("  {}  {total}", hour.format("%Y-%m-%d %H:00"));
    }

    println!("Cumulative interventions");
    if t.interventions.is_empty() {
        println!("  (none yet)");
    }
    for (kind, series) in &t.interventions {
        println!("  {kind}");
        for (hour, total) in series {
            println!("    {}  {total}", hour.format("%Y-%m-%d %H:00"));
        }
    }
}

#[derive(Serialize)]
struct NetworkView<'a> {
    nodes: &'a [Node],
    edges: Vec<(&'a str, &'a str)>,
}

pub fn network(log: &EventLog, json: bool) {
    let net = ContactNetwork::build(log);
    if json {
        print_json(&NetworkView {
            nodes: net.nodes(),
            edges: net.edges().collect(),
        });
        return;
    }
    for node in net.nodes() {
        println!("{:<20} {:?}", node.name, node.status);
    }
    for (from, to) in net.edges() {
        println!("{from} -> {to}");
    }
}

/// Returns false if the user is not in the network.
pub fn search(log: &EventLog, username: &str, json: bool) -> bool {
    let Some(found) = ContactNetwork::build(log).search(username) else {
        if json {
            print_json(&serde_json::Value::Null);
        } else {
            println!("User '{username}' not found in the network.");
        }
        return false;
    };

    if json {
        print_json(&found);
        return true;
    }
    println!("User:               {} ({:?})", found.username, found.status);
    println!("Primary contacts:   {}", found.primary.join(", "));
    println!("Secondary contacts: {}", found.secondary.join(", "));
    println!("People contacted:   {}", found.infected_count);
    match found.first_infection {
        Some(t) => println!("First infection:    {t}"),
        None => println!("First infection:    No infections"),
    }
    true
}
