//! Outcome configuration: the infection baseline and the sampler policy.

use serde::{Deserialize, Serialize};

use wmm_contracts::error::{WmmError, WmmResult};
use wmm_core::traits::EffectivenessSampler;

use crate::{
    infection::{BaselineInfectionResolver, INFECTION_BASELINE},
    sampler::{DeferredKdeSampler, EffectivenessTable, UniformSampler},
};

/// Which effectiveness sampler to build.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SamplerPolicy {
    Uniform,
    #[default]
    Kde,
}

/// The `[outcome]` table of the configuration file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutcomeSettings {
    pub baseline: f64,
    pub sampler: SamplerPolicy,
}

impl Default for OutcomeSettings {
    fn default() -> Self {
        Self {
            baseline: INFECTION_BASELINE,
            sampler: SamplerPolicy::default(),
        }
    }
}

impl OutcomeSettings {
    pub fn validate(&self) -> WmmResult<()> {
        if !(0.0..=1.0).contains(&self.baseline) {
            return Err(WmmError::ConfigError {
                reason: format!("outcome.baseline must be within [0, 1], got {}", self.baseline),
            });
        }
        Ok(())
    }

    pub fn infection_resolver(&self) -> BaselineInfectionResolver {
        BaselineInfectionResolver::new(self.baseline)
    }

    /// Build the configured sampler. `load_table` is only called by `Kde`,
    /// and not before the first draw.
    pub fn sampler(
        &self,
        load_table: impl Fn() -> WmmResult<EffectivenessTable> + Send + Sync + 'static,
    ) -> Box<dyn EffectivenessSampler> {
        match self.sampler {
            SamplerPolicy::Uniform => Box::new(UniformSampler),
            SamplerPolicy::Kde => Box::new(DeferredKdeSampler::new(load_table)),
        }
    }
}
