//! # wmm-insights
//!
//! Read-only views over an event log for the dashboards: hourly cumulative
//! counts, the contact network with per-user search, and headline totals.
//! Every function takes a log and returns plain data; nothing here reads
//! storage or draws randomness.

pub mod network;
pub mod summary;
pub mod timeline;

pub use network::{ContactNetwork, Node, NodeStatus, UserReport};
pub use summary::Summary;
pub use timeline::{
    cumulative_infections_by_hour, cumulative_interventions_by_hour, floor_to_hour, HourlyPoint,
};
