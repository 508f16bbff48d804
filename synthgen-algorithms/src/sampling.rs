//! Bounded rejection sampling of positions
//!
//! Candidates are drawn from a [`BoundingRegion`] (uniformly, or from a normal
//! distribution around a reference point) and kept only when an
//! [`EnclosureTest`] accepts them. The number of candidates evaluated is capped,
//! so a volume much smaller than its bounding box yields a short result instead
//! of an endless loop.

use crate::enclosure::EnclosureTest;
use rand::Rng;
use rand_distr::{Distribution as _, Normal};
use serde::{Deserialize, Serialize};
use synthgen_core::{Axis, BoundingRegion, Error, Point3f, Result};
use tracing::{debug, warn};

/// Default standard deviation of normal sampling as a fraction of the axis range
pub const DEFAULT_SIGMA_FRACTION: f32 = 1.0 / 3.0;

/// Redraws allowed per axis before a normal draw falls back to a uniform one
pub const MAX_AXIS_REDRAWS: usize = 1000;

/// Candidate distribution
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Distribution {
    #[default]
    Uniform,
    Normal,
}

/// What to do when the attempt budget runs out before `count` points are accepted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExhaustionPolicy {
    /// Return the points accepted so far
    #[default]
    Degrade,
    /// Fail with [`Error::SamplingExhausted`]
    Fail,
}

/// Attempt budget and failure handling shared by every sampling call of a run
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SamplingConfig {
    /// Candidates allowed per requested point
    pub attempts_per_point: usize,
    /// Lower bound on the attempt budget of a request
    pub min_attempts: usize,
    pub policy: ExhaustionPolicy,
    pub sigma_fraction: f32,
}

impl SamplingConfig {
    /// Attempt budget for a request of `count` points
    pub fn max_attempts(&self, count: usize) -> usize {
        count
            .saturating_mul(self.attempts_per_point)
            .max(self.min_attempts)
    }

    pub fn sampler(&self) -> BoundedSampler {
        BoundedSampler::new(self.policy)
    }
}

impl Default for SamplingConfig {
    fn default() -> Self {
        Self {
            attempts_per_point: 100,
            min_attempts: 500,
            policy: ExhaustionPolicy::Degrade,
            sigma_fraction: DEFAULT_SIGMA_FRACTION,
        }
    }
}

/// One sampling job
#[derive(Debug, Clone, PartialEq)]
pub struct SampleRequest {
    pub distribution: Distribution,
    /// Mean of normal sampling; ignored for uniform sampling
    pub reference_point: Point3f,
    pub region: BoundingRegion,
    pub count: usize,
    /// Upper bound on candidates passed to the enclosure test
    pub max_attempts: usize,
    pub sigma_fraction: f32,
}

impl SampleRequest {
    pub fn uniform(region: BoundingRegion, count: usize, max_attempts: usize) -> Self {
        Self {
            distribution: Distribution::Uniform,
            reference_point: region.center(),
            region,
            count,
            max_attempts,
            sigma_fraction: DEFAULT_SIGMA_FRACTION,
        }
    }

    pub fn normal(
        region: BoundingRegion,
        reference_point: Point3f,
        count: usize,
        max_attempts: usize,
    ) -> Self {
        Self {
            distribution: Distribution::Normal,
            reference_point,
            region,
            count,
            max_attempts,
            sigma_fraction: DEFAULT_SIGMA_FRACTION,
        }
    }

    pub fn with_sigma_fraction(mut self, sigma_fraction: f32) -> Self {
        self.sigma_fraction = sigma_fraction;
        self
    }
}

/// Accepted points and the number of candidates it took to find them
#[derive(Debug, Clone, PartialEq)]
pub struct SampleOutcome {
    pub points: Vec<Point3f>,
    pub attempts: usize,
}

/// Rejection sampler with a configurable exhaustion policy
#[derive(Debug, Clone, Copy, Default)]
pub struct BoundedSampler {
    pub policy: ExhaustionPolicy,
}

impl BoundedSampler {
    pub fn new(policy: ExhaustionPolicy) -> Self {
        Self { policy }
    }

    /// Draw up to `request.count` points inside `request.region` that `enclosure` accepts
    ///
    /// # Example
    /// ```rust
    /// use rand::{rngs::StdRng, SeedableRng};
    /// use synthgen_algorithms::{AlwaysInside, BoundedSampler, SampleRequest};
    /// use synthgen_core::BoundingRegion;
    ///
    /// fn main() -> synthgen_core::Result<()> {
    ///     let region = BoundingRegion::from_ranges([[0.0, 10.0], [0.0, 10.0], [0.0, 10.0]])?;
    ///     let mut rng = StdRng::seed_from_u64(7);
    ///     let points = BoundedSampler::default()
    ///         .sample_points(&SampleRequest::uniform(region, 5, 500), &AlwaysInside, &mut rng)?;
    ///     assert_eq!(points.len(), 5);
    ///     Ok(())
    /// }
    /// ```
    pub fn sample<E, R>(
        &self,
        request: &SampleRequest,
        enclosure: &E,
        rng: &mut R,
    ) -> Result<SampleOutcome>
    where
        E: EnclosureTest + ?Sized,
        R: Rng + ?Sized,
    {
        if request.count == 0 {
            return Ok(SampleOutcome { points: Vec::new(), attempts: 0 });
        }

        let axes = AxisSamplers::new(request)?;
        let mut points = Vec::with_capacity(request.count.min(request.max_attempts));
        let mut attempts = 0;

        while points.len() < request.count && attempts < request.max_attempts {
            let candidate = axes.draw(rng);
            attempts += 1;
            if enclosure.encloses(&candidate) {
                points.push(candidate);
            }
        }

        if points.len() < request.count {
            match self.policy {
                ExhaustionPolicy::Fail => {
                    return Err(Error::SamplingExhausted {
                        requested: request.count,
                        accepted: points.len(),
                        attempts,
                    });
                }
                ExhaustionPolicy::Degrade => {
                    warn!(
                        requested = request.count,
                        accepted = points.len(),
                        attempts,
                        "Attempt budget exhausted, returning fewer points"
                    );
                }
            }
        } else {
            debug!(count = points.len(), attempts, "Sampling complete");
        }

        Ok(SampleOutcome { points, attempts })
    }

    /// Like [`BoundedSampler::sample`], keeping only the points
    pub fn sample_points<E, R>(
        &self,
        request: &SampleRequest,
        enclosure: &E,
        rng: &mut R,
    ) -> Result<Vec<Point3f>>
    where
        E: EnclosureTest + ?Sized,
        R: Rng + ?Sized,
    {
        self.sample(request, enclosure, rng).map(|outcome| outcome.points)
    }
}

/// Per-axis candidate generator for one request
enum AxisSampler {
    Uniform { lo: f32, hi: f32 },
    Normal { lo: f32, hi: f32, normal: Normal<f32> },
}

impl AxisSampler {
    fn draw<R: Rng + ?Sized>(&self, rng: &mut R) -> f32 {
        match self {
            AxisSampler::Uniform { lo, hi } => rng.gen_range(*lo..=*hi),
            AxisSampler::Normal { lo, hi, normal } => {
                // Redraw rather than clamp, so the bounds do not collect probability mass
                for _ in 0..MAX_AXIS_REDRAWS {
                    let value = normal.sample(rng);
                    if value >= *lo && value <= *hi {
                        return value;
                    }
                }
                rng.gen_range(*lo..=*hi)
            }
        }
    }
}

struct AxisSamplers([AxisSampler; 3]);

impl AxisSamplers {
    fn new(request: &SampleRequest) -> Result<Self> {
        let build = |axis: Axis| -> Result<AxisSampler> {
            let (lo, hi) = request.region.axis_range(axis);
            match request.distribution {
                Distribution::Uniform => Ok(AxisSampler::Uniform { lo, hi }),
                Distribution::Normal => {
                    if lo == hi {
                        return Err(Error::Configuration(format!(
                            "normal sampling needs a non-degenerate region, {:?} range is [{}, {}]",
                            axis, lo, hi
                        )));
                    }
                    if !(request.sigma_fraction.is_finite() && request.sigma_fraction > 0.0) {
                        return Err(Error::Configuration(format!(
                            "sigma fraction must be positive, got {}",
                            request.sigma_fraction
                        )));
                    }
                    let mean = request.reference_point[axis.index()];
                    let sigma = (hi - lo) * request.sigma_fraction;
                    let normal = Normal::new(mean, sigma)
                        .map_err(|e| Error::Configuration(format!("normal distribution: {}", e)))?;
                    Ok(AxisSampler::Normal { lo, hi, normal })
                }
            }
        };
        Ok(Self([build(Axis::X)?, build(Axis::Y)?, build(Axis::Z)?]))
    }

    fn draw<R: Rng + ?Sized>(&self, rng: &mut R) -> Point3f {
        let [x, y, z] = &self.0;
        Point3f::new(x.draw(rng), y.draw(rng), z.draw(rng))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::enclosure::AlwaysInside;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::cell::Cell;

    fn cube_region(size: f32) -> BoundingRegion {
        BoundingRegion::from_ranges([[0.0, size], [0.0, size], [0.0, size]]).unwrap()
    }

    #[test]
    fn test_uniform_always_inside_returns_exact_count() {
        let mut rng = StdRng::seed_from_u64(1);
        let request = SampleRequest::uniform(cube_region(10.0), 5, 500);
        let outcome = BoundedSampler::default().sample(&request, &AlwaysInside, &mut rng).unwrap();
        assert_eq!(outcome.points.len(), 5);
        assert_eq!(outcome.attempts, 5);
        for p in &outcome.points {
            for v in [p.x, p.y, p.z] {
                assert!((0.0..=10.0).contains(&v));
            }
        }
    }

    #[test]
    fn test_uniform_points_stay_in_region() {
        let mut rng = StdRng::seed_from_u64(2);
        let region = BoundingRegion::from_ranges([[-3.0, -1.0], [5.0, 5.5], [0.0, 100.0]]).unwrap();
        let points = BoundedSampler::default()
            .sample_points(&SampleRequest::uniform(region, 1000, 1000), &AlwaysInside, &mut rng)
            .unwrap();
        assert_eq!(points.len(), 1000);
        assert!(points.iter().all(|p| region.contains(p)));
    }

    #[test]
    fn test_normal_points_stay_in_region_with_far_reference() {
        let mut rng = StdRng::seed_from_u64(3);
        let region = cube_region(1.0);
        // A reference far outside the box exercises the bounded redraw path
        let request = SampleRequest::normal(region, Point3f::new(50.0, -50.0, 0.5), 200, 200)
            .with_sigma_fraction(0.01);
        let points = BoundedSampler::default()
            .sample_points(&request, &AlwaysInside, &mut rng)
            .unwrap();
        assert_eq!(points.len(), 200);
        assert!(points.iter().all(|p| region.contains(p)));
    }

    #[test]
    fn test_normal_clusters_around_reference() {
        let mut rng = StdRng::seed_from_u64(4);
        let region = cube_region(10.0);
        let request = SampleRequest::normal(region, Point3f::new(2.0, 2.0, 2.0), 2000, 2000)
            .with_sigma_fraction(0.05);
        let points = BoundedSampler::default()
            .sample_points(&request, &AlwaysInside, &mut rng)
            .unwrap();
        let mean_x = points.iter().map(|p| p.x).sum::<f32>() / points.len() as f32;
        assert!((mean_x - 2.0).abs() < 0.2, "mean x was {}", mean_x);
    }

    #[test]
    fn test_zero_count_is_empty() {
        let mut rng = StdRng::seed_from_u64(5);
        // Even a degenerate region is fine when nothing is requested
        let region = BoundingRegion::from_ranges([[1.0, 1.0], [0.0, 1.0], [0.0, 1.0]]).unwrap();
        let request = SampleRequest::normal(region, Point3f::origin(), 0, 10);
        let outcome = BoundedSampler::default().sample(&request, &AlwaysInside, &mut rng).unwrap();
        assert!(outcome.points.is_empty());
        assert_eq!(outcome.attempts, 0);
    }

    #[test]
    fn test_attempts_never_exceed_budget() {
        let mut rng = StdRng::seed_from_u64(6);
        let evaluations = Cell::new(0usize);
        let half = |p: &Point3f| {
            evaluations.set(evaluations.get() + 1);
            p.x < 5.0
        };
        let request = SampleRequest::uniform(cube_region(10.0), 50, 20);
        let outcome = BoundedSampler::default().sample(&request, &half, &mut rng).unwrap();
        assert_eq!(evaluations.get(), 20);
        assert_eq!(outcome.attempts, 20);
        assert!(outcome.points.len() <= 20);
    }

    #[test]
    fn test_never_accepting_predicate_degrades_to_empty() {
        let mut rng = StdRng::seed_from_u64(7);
        let never = |_: &Point3f| false;
        let request = SampleRequest::uniform(cube_region(1.0), 3, 100);
        let outcome = BoundedSampler::default().sample(&request, &never, &mut rng).unwrap();
        assert!(outcome.points.is_empty());
        assert_eq!(outcome.attempts, 100);
    }

    #[test]
    fn test_fail_policy_reports_exhaustion() {
        let mut rng = StdRng::seed_from_u64(8);
        let never = |_: &Point3f| false;
        let request = SampleRequest::uniform(cube_region(1.0), 3, 100);
        let result = BoundedSampler::new(ExhaustionPolicy::Fail).sample(&request, &never, &mut rng);
        match result {
            Err(Error::SamplingExhausted { requested, accepted, attempts }) => {
                assert_eq!((requested, accepted, attempts), (3, 0, 100));
            }
            other => panic!("expected exhaustion, got {:?}", other),
        }
    }

    #[test]
    fn test_degenerate_region_rejected_for_normal() {
        let mut rng = StdRng::seed_from_u64(9);
        let region = BoundingRegion::from_ranges([[0.0, 1.0], [0.0, 1.0], [2.0, 2.0]]).unwrap();
        let request = SampleRequest::normal(region, Point3f::new(0.5, 0.5, 2.0), 4, 100);
        let result = BoundedSampler::default().sample(&request, &AlwaysInside, &mut rng);
        assert!(matches!(result, Err(Error::Configuration(_))));
    }

    #[test]
    fn test_degenerate_region_allowed_for_uniform() {
        let mut rng = StdRng::seed_from_u64(10);
        let region = BoundingRegion::from_ranges([[0.0, 1.0], [0.0, 1.0], [2.0, 2.0]]).unwrap();
        let points = BoundedSampler::default()
            .sample_points(&SampleRequest::uniform(region, 4, 100), &AlwaysInside, &mut rng)
            .unwrap();
        assert!(points.iter().all(|p| p.z == 2.0));
    }

    #[test]
    fn test_config_attempt_budget() {
        let config = SamplingConfig::default();
        assert_eq!(config.max_attempts(0), 500);
        assert_eq!(config.max_attempts(3), 500);
        assert_eq!(config.max_attempts(20), 2000);
    }

    #[test]
    fn test_seeded_runs_repeat() {
        let request = SampleRequest::uniform(cube_region(3.0), 10, 10);
        let a = BoundedSampler::default()
            .sample_points(&request, &AlwaysInside, &mut StdRng::seed_from_u64(11))
            .unwrap();
        let b = BoundedSampler::default()
            .sample_points(&request, &AlwaysInside, &mut StdRng::seed_from_u64(11))
            .unwrap();
        assert_eq!(a, b);
    }
}
