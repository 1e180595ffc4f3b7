//! Game rule configuration.
//!
//! `GameRules` is deserialized from TOML. Every field has a default matching
//! the classroom deployment, so an empty document is a valid configuration.
//!
//! Example in TOML:
//! ```toml
//! cooldown_secs = 60
//! reserved_usernames = ["exp626"]
//! interventions = ["Intervention 01", "Intervention 02", "Intervention 03"]
//! ```

use serde::{Deserialize, Serialize};

use wmm_contracts::error::{WmmError, WmmResult};

/// Minimum spacing between two events of the same ordered pair.
pub const DEFAULT_COOLDOWN_SECS: i64 = 60;

/// The seed account that starts every outbreak. It can infect but can never
/// be targeted.
pub const RESERVED_USERNAME: &str = "exp626";

fn default_cooldown_secs() -> i64 {
    DEFAULT_COOLDOWN_SECS
}

fn default_reserved_usernames() -> Vec<String> {
    vec![RESERVED_USERNAME.to_string()]
}

fn default_interventions() -> Vec<String> {
    (1..=3).map(|n| format!("Intervention {n:02}")).collect()
}

/// The tunable parts of the validation rules.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameRules {
    /// Seconds that must elapse between two events of the same ordered
    /// (actor, audience) pair. Exactly this many seconds is enough.
    #[serde(default = "default_cooldown_secs")]
    pub cooldown_secs: i64,

    /// Usernames that may never be the audience of any event. Compared
    /// case-insensitively.
    #[serde(default = "default_reserved_usernames")]
    pub reserved_usernames: Vec<String>,

    /// Intervention labels offered to students, in display order.
    #[serde(default = "default_interventions")]
    pub interventions: Vec<String>,
}

impl Default for GameRules {
    fn default() -> Self {
        Self {
            cooldown_secs: default_cooldown_secs(),
            reserved_usernames: default_reserved_usernames(),
            interventions: default_interventions(),
        }
    }
}

impl GameRules {
    /// Reject values no game can run with.
    pub fn validate(&self) -> WmmResult<()> {
        if self.cooldown_secs < 0 {
            return Err(WmmError::ConfigError {
                reason: format!("cooldown_secs must not be negative, got {}", self.cooldown_secs),
            });
        }
        if self.interventions.iter().any(|i| i.trim().is_empty()) {
            return Err(WmmError::ConfigError {
                reason: "intervention labels must not be blank".to_string(),
            });
        }
        Ok(())
    }

    /// True if `username` is reserved, ignoring case.
    pub fn is_reserved(&self, username: &str) -> bool {
        self.reserved_usernames
            .iter()
            .any(|r| r.eq_ignore_ascii_case(username))
    }

    /// True if `label` is one of the offered interventions.
    pub fn offers_intervention(&self, label: &str) -> bool {
        self.interventions.iter().any(|i| i == label)
    }
}
