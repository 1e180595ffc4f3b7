//! `wmm.toml`: where the bucket lives and how the game is tuned.
//!
//! ```toml
//! bucket_dir = "./bucket"
//! log_key = "interactions.csv"
//! effectiveness_key = "intervention_effectiveness.csv"
//! mail_domain = "lehigh.edu"
//! max_attempts = 3
//!
//! [rules]
//! cooldown_secs = 60
//!
//! [outcome]
//! baseline = 0.5
//! sampler = "kde"
//! ```
//!
//! Every key is optional. Command-line flags override the file.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use wmm_contracts::error::{WmmError, WmmResult};
use wmm_core::transaction::{DEFAULT_MAIL_DOMAIN, DEFAULT_MAX_ATTEMPTS};
use wmm_outcome::OutcomeSettings;
use wmm_rules::GameRules;
use wmm_store::{DEFAULT_EFFECTIVENESS_KEY, DEFAULT_LOG_KEY};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WmmConfig {
    pub bucket_dir: PathBuf,
    pub log_key: String,
    pub effectiveness_key: String,
    pub mail_domain: String,
    pub max_attempts: u32,
    pub rules: GameRules,
    pub outcome: OutcomeSettings,
}

impl Default for WmmConfig {
    fn default() -> Self {
        Self {
            bucket_dir: PathBuf::from("bucket"),
            log_key: DEFAULT_LOG_KEY.to_string(),
            effectiveness_key: DEFAULT_EFFECTIVENESS_KEY.to_string(),
            mail_domain: DEFAULT_MAIL_DOMAIN.to_string(),
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            rules: GameRules::default(),
            outcome: OutcomeSettings::default(),
        }
    }
}

impl WmmConfig {
    pub fn from_toml_str(s: &str) -> WmmResult<Self> {
        let config: WmmConfig = toml::from_str(s).map_err(|e| WmmError::ConfigError {
            reason: format!("failed to parse config TOML: {e}"),
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> WmmResult<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| WmmError::ConfigError {
            reason: format!("failed to read config file '{}': {e}", path.display()),
        })?;
        Self::from_toml_str(&contents)
    }

    pub fn validate(&self) -> WmmResult<()> {
        if self.log_key.trim().is_empty() || self.effectiveness_key.trim().is_empty() {
            return Err(WmmError::ConfigError {
                reason: "object keys must not be empty".to_string(),
            });
        }
        if self.max_attempts == 0 {
            return Err(WmmError::ConfigError {
                reason: "max_attempts must be at least 1".to_string(),
            });
        }
        self.rules.validate()?;
        self.outcome.validate()
    }
}
