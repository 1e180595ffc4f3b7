//! Intervention effectiveness samplers.
//!
//! Two `EffectivenessSampler` implementations:
//!
//! - `UniformSampler`: one uniform draw in `[0, 1)`, ignoring the type.
//! - `KdeSampler`: a Gaussian kernel density estimate per intervention type,
//!   fitted to the observed effectiveness scores in an `EffectivenessTable`.
//! - `DeferredKdeSampler`: a `KdeSampler` whose table is loaded on the first
//!   draw, i.e. only once an intervention has been accepted.
//!
//! Scores in the table are on a 0–10 scale and are divided by 10 before
//! fitting. Every sample is clipped to `[0, 1]`.

use std::collections::BTreeMap;

use once_cell::sync::OnceCell;
use tracing::{debug, error};

use wmm_contracts::error::{WmmError, WmmResult};
use wmm_core::traits::{EffectivenessSampler, RandomSource};

/// Raw effectiveness scores are recorded out of this value.
pub const EFFECTIVENESS_SCALE: f64 = 10.0;

/// Draw an effectiveness value for `intervention_type` through `sampler`.
pub fn resolve_intervention(
    intervention_type: &str,
    sampler: &dyn EffectivenessSampler,
    rng: &mut dyn RandomSource,
) -> WmmResult<f64> {
    sampler.sample(intervention_type, rng)
}

// ── Uniform ───────────────────────────────────────────────────────────────────

/// Samples `U[0, 1)` for every intervention type.
#[derive(Debug, Default, Clone, Copy)]
pub struct UniformSampler;

impl EffectivenessSampler for UniformSampler {
    fn sample(&self, _intervention_type: &str, rng: &mut dyn RandomSource) -> WmmResult<f64> {
        Ok(rng.uniform())
    }
}

// ── Effectiveness table ───────────────────────────────────────────────────────

/// Observed effectiveness scores, one column per intervention type.
///
/// Cells may be missing; a column of only missing cells is still a known
/// type, it just cannot be sampled.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EffectivenessTable {
    columns: BTreeMap<String, Vec<Option<f64>>>,
}

impl EffectivenessTable {
    pub fn from_columns<I, K>(columns: I) -> Self
    where
        I: IntoIterator<Item = (K, Vec<Option<f64>>)>,
        K: Into<String>,
    {
        Self {
            columns: columns.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        }
    }

    pub fn column(&self, intervention_type: &str) -> Option<&[Option<f64>]> {
        self.columns.get(intervention_type).map(Vec::as_slice)
    }

    /// Column names, in sorted order.
    pub fn intervention_types(&self) -> impl Iterator<Item = &str> {
        self.columns.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
}

// ── Kernel density estimate ───────────────────────────────────────────────────

/// A one-dimensional Gaussian KDE with Scott's rule bandwidth.
#[derive(Debug, Clone, PartialEq)]
pub struct GaussianKde {
    data: Vec<f64>,
    bandwidth: f64,
}

impl GaussianKde {
    /// Fit to `data`. Returns `None` for an empty sample.
    ///
    /// The bandwidth is `σ̂ · n^(-1/5)` with `σ̂` the sample standard deviation
    /// (n − 1 denominator). One point, or points with no spread, give a zero
    /// bandwidth and the estimate collapses onto the data.
    pub fn fit(data: Vec<f64>) -> Option<Self> {
        let n = data.len();
        if n == 0 {
            return None;
        }
        let bandwidth = if n < 2 {
            0.0
        } else {
            let mean = data.iter().sum::<f64>() / n as f64;
            let var = data.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / (n - 1) as f64;
            var.sqrt() * (n as f64).powf(-0.2)
        };
        Some(Self { data, bandwidth })
    }

    pub fn bandwidth(&self) -> f64 {
        self.bandwidth
    }

    pub fn data(&self) -> &[f64] {
        &self.data
    }

    /// Pick a datum uniformly and add `N(0, h²)` noise.
    pub fn sample(&self, rng: &mut dyn RandomSource) -> f64 {
        let centre = self.data[rng.index(self.data.len())];
        if self.bandwidth == 0.0 {
            return centre;
        }
        centre + self.bandwidth * rng.standard_normal()
    }
}

/// Samples effectiveness from a per-type KDE fitted once at construction.
#[derive(Debug, Clone)]
pub struct KdeSampler {
    kernels: BTreeMap<String, Option<GaussianKde>>,
}

impl KdeSampler {
    /// Fit one kernel per column of `table`. Columns with no usable values
    /// are remembered so they can be reported as `InsufficientData`.
    pub fn new(table: &EffectivenessTable) -> Self {
        let kernels = table
            .columns
            .iter()
            .map(|(name, column)| {
                let scaled: Vec<f64> = column
                    .iter()
                    .flatten()
                    .filter(|v| v.is_finite())
                    .map(|v| v / EFFECTIVENESS_SCALE)
                    .collect();
                debug!(
                    intervention_type = %name,
                    observations = scaled.len(),
                    "fitting effectiveness kernel"
                );
                (name.clone(), GaussianKde::fit(scaled))
            })
            .collect();
        Self { kernels }
    }

    pub fn kernel(&self, intervention_type: &str) -> Option<&GaussianKde> {
        self.kernels.get(intervention_type).and_then(Option::as_ref)
    }
}

impl EffectivenessSampler for KdeSampler {
    fn sample(&self, intervention_type: &str, rng: &mut dyn RandomSource) -> WmmResult<f64> {
        let kernel = match self.kernels.get(intervention_type) {
            None => {
                error!(intervention_type, "no effectiveness column for intervention type");
                return Err(WmmError::UnknownInterventionType {
                    intervention_type: intervention_type.to_string(),
                });
            }
            Some(None) => {
                error!(intervention_type, "effectiveness column has no values");
                return Err(WmmError::InsufficientData {
                    intervention_type: intervention_type.to_string(),
                });
            }
            Some(Some(kernel)) => kernel,
        };
        Ok(kernel.sample(rng).clamp(0.0, 1.0))
    }
}

// ── Deferred ──────────────────────────────────────────────────────────────────

/// Produces the effectiveness table when a `DeferredKdeSampler` first needs it.
pub type TableLoader = Box<dyn Fn() -> WmmResult<EffectivenessTable> + Send + Sync>;

/// A `KdeSampler` fitted on first use.
///
/// A failed load is returned from that draw and retried on the next one.
pub struct DeferredKdeSampler {
    load: TableLoader,
    fitted: OnceCell<KdeSampler>,
}

impl DeferredKdeSampler {
    pub fn new(load: impl Fn() -> WmmResult<EffectivenessTable> + Send + Sync + 'static) -> Self {
        Self {
            load: Box::new(load),
            fitted: OnceCell::new(),
        }
    }

    pub fn is_fitted(&self) -> bool {
        self.fitted.get().is_some()
    }
}

impl std::fmt::Debug for DeferredKdeSampler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeferredKdeSampler")
            .field("fitted", &self.fitted.get())
            .finish_non_exhaustive()
    }
}

impl EffectivenessSampler for DeferredKdeSampler {
    fn sample(&self, intervention_type: &str, rng: &mut dyn RandomSource) -> WmmResult<f64> {
        let sampler = self
            .fitted
            .get_or_try_init(|| (self.load)().map(|table| KdeSampler::new(&table)))?;
        sampler.sample(intervention_type, rng)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use wmm_contracts::error::WmmError;
    use wmm_core::traits::EffectivenessSampler;

    use crate::random::{ScriptedSource, SeededSource};

    use super::{
        resolve_intervention, DeferredKdeSampler, EffectivenessTable, GaussianKde, KdeSampler,
        UniformSampler,
    };

    fn table() -> EffectivenessTable {
        EffectivenessTable::from_columns([
            (
                "Intervention 01",
                vec![Some(2.0), Some(4.0), None, Some(6.0), Some(8.0)],
            ),
            ("Intervention 02", vec![Some(7.0)]),
            ("Intervention 03", vec![None, None]),
        ])
    }

    // ── GaussianKde ───────────────────────────────────────────────────────────

    #[test]
    fn scott_bandwidth_uses_sample_std() {
        // mean 0.5, sample variance 0.0666.., n = 4
        let kde = GaussianKde::fit(vec![0.2, 0.4, 0.6, 0.8]).unwrap();
        let expected = (0.2f64 / 3.0).sqrt() * 4f64.powf(-0.2);
        assert!((kde.bandwidth() - expected).abs() < 1e-12);
    }

    #[test]
    fn empty_sample_has_no_kernel() {
        assert!(GaussianKde::fit(Vec::new()).is_none());
    }

    #[test]
    fn single_datum_degenerates_to_the_datum() {
        let kde = GaussianKde::fit(vec![0.7]).unwrap();
        assert_eq!(kde.bandwidth(), 0.0);
        let mut rng = ScriptedSource::default().with_normals([3.0]);
        assert_eq!(kde.sample(&mut rng), 0.7);
    }

    #[test]
    fn scripted_draw_is_datum_plus_scaled_noise() {
        let kde = GaussianKde::fit(vec![0.2, 0.4, 0.6, 0.8]).unwrap();
        let mut rng = ScriptedSource::default()
            .with_indices([2usize])
            .with_normals([1.0]);
        let s = kde.sample(&mut rng);
        assert!((s - (0.6 + kde.bandwidth())).abs() < 1e-12);
    }

    // ── KdeSampler ────────────────────────────────────────────────────────────

    #[test]
    fn kde_samples_stay_within_unit_interval() {
        let sampler = KdeSampler::new(&table());
        let mut rng = SeededSource::new(42);
        for _ in 0..2_000 {
            let v = sampler.sample("Intervention 01", &mut rng).unwrap();
            assert!((0.0..=1.0).contains(&v), "sample {v} out of range");
        }
    }

    #[test]
    fn large_noise_is_clipped() {
        let sampler = KdeSampler::new(&table());
        let mut high = ScriptedSource::default().with_normals([50.0]);
        assert_eq!(sampler.sample("Intervention 01", &mut high).unwrap(), 1.0);
        let mut low = ScriptedSource::default().with_normals([-50.0]);
        assert_eq!(sampler.sample("Intervention 01", &mut low).unwrap(), 0.0);
    }

    #[test]
    fn raw_scores_are_rescaled() {
        let sampler = KdeSampler::new(&table());
        let v = sampler
            .sample("Intervention 02", &mut ScriptedSource::default())
            .unwrap();
        assert!((v - 0.7).abs() < 1e-12);
        assert_eq!(sampler.kernel("Intervention 01").unwrap().data().len(), 4);
    }

    #[test]
    fn out_of_scale_scores_are_clipped_only_when_drawn() {
        let table =
            EffectivenessTable::from_columns([("Intervention 01", vec![Some(12.0), Some(6.0)])]);
        let sampler = KdeSampler::new(&table);
        assert_eq!(sampler.kernel("Intervention 01").unwrap().data(), &[1.2, 0.6]);

        let mut rng = ScriptedSource::default().with_indices([0usize]).with_normals([0.0]);
        assert_eq!(sampler.sample("Intervention 01", &mut rng).unwrap(), 1.0);
    }

    #[test]
    fn unknown_type_is_an_error() {
        let sampler = KdeSampler::new(&table());
        let err = sampler
            .sample("Intervention 09", &mut ScriptedSource::default())
            .unwrap_err();
        assert!(matches!(err, WmmError::UnknownInterventionType { .. }));
        assert!(err.is_resolver_fault());
    }

    #[test]
    fn all_missing_column_is_insufficient_data() {
        let sampler = KdeSampler::new(&table());
        let err = sampler
            .sample("Intervention 03", &mut ScriptedSource::default())
            .unwrap_err();
        assert!(matches!(err, WmmError::InsufficientData { .. }));
    }

    // ── DeferredKdeSampler ────────────────────────────────────────────────────

    #[test]
    fn deferred_sampler_fits_once_on_first_draw() {
        let loads = Arc::new(AtomicUsize::new(0));
        let counter = loads.clone();
        let sampler = DeferredKdeSampler::new(move || {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(table())
        });
        assert!(!sampler.is_fitted());
        assert_eq!(loads.load(Ordering::SeqCst), 0);

        for _ in 0..3 {
            let v = sampler
                .sample("Intervention 02", &mut ScriptedSource::default())
                .unwrap();
            assert!((v - 0.7).abs() < 1e-12);
        }
        assert!(sampler.is_fitted());
        assert_eq!(loads.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn deferred_load_failure_is_surfaced_and_retried() {
        let sampler = DeferredKdeSampler::new(|| {
            Err(WmmError::StorageRead {
                key: "eff.csv".to_string(),
                reason: "object not found".to_string(),
            })
        });
        for _ in 0..2 {
            let err = sampler
                .sample("Intervention 01", &mut ScriptedSource::default())
                .unwrap_err();
            assert!(matches!(err, WmmError::StorageRead { .. }));
        }
        assert!(!sampler.is_fitted());
    }

    // ── Uniform ───────────────────────────────────────────────────────────────

    #[test]
    fn uniform_sampler_passes_the_draw_through() {
        let mut rng = ScriptedSource::new([0.42]);
        let v = resolve_intervention("anything", &UniformSampler, &mut rng).unwrap();
        assert_eq!(v, 0.42);
    }

    #[test]
    fn table_lists_types_in_order() {
        let binding = table();
        let names: Vec<&str> = binding.intervention_types().collect();
        assert_eq!(names, ["Intervention 01", "Intervention 02", "Intervention 03"]);
    }
}
