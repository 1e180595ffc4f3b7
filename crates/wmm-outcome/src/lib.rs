//! # wmm-outcome
//!
//! Outcome resolution for accepted proposals.
//!
//! - [`BaselineInfectionResolver`] draws whether an infection attempt lands,
//!   discounting the baseline by the audience's interventions.
//! - [`KdeSampler`] and [`UniformSampler`] draw an intervention's
//!   effectiveness value.
//! - [`EntropySource`], [`SeededSource`] and [`ScriptedSource`] are the
//!   random sources they draw from.
//!
//! None of this code touches storage; the transaction in wmm-core decides
//! when a resolver runs.

pub mod infection;
pub mod random;
pub mod sampler;
pub mod settings;

pub use infection::{infection_probability, BaselineInfectionResolver, INFECTION_BASELINE};
pub use random::{EntropySource, ScriptedSource, SeededSource};
pub use sampler::{
    resolve_intervention, DeferredKdeSampler, EffectivenessTable, GaussianKde, KdeSampler,
    TableLoader, UniformSampler, EFFECTIVENESS_SCALE,
};
pub use settings::{OutcomeSettings, SamplerPolicy};
