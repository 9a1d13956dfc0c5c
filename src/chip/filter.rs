//! Quality-based vertex filtering.
//!
//! A vertex's *quality* is the fraction of its Gabriel neighbors that share its
//! cluster. Vertices deep inside a class score 1.0; vertices sitting in the other
//! class's territory score low. Each cluster gets an adaptive threshold
//!
//! ```text
//! threshold = mean(q) - tolerance * std(q)
//! ```
//!
//! and every vertex with `q < threshold` is removed from its cluster. The mean and
//! (population) standard deviation are accumulated online with Welford's update.
//!
//! One pass is the canonical behavior. With [`QualityFilter::with_max_passes`] the
//! pass is repeated, with qualities recomputed over surviving neighbors only, until
//! a pass removes nothing or the budget runs out.

use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use super::dataset::{Dataset, VertexId};
use crate::error::{Error, Result};

/// Online (Welford) accumulator for a cluster's vertex qualities.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct QualityStats {
    count: usize,
    sum: f64,
    mean: f64,
    m2: f64,
}

impl QualityStats {
    /// Empty accumulator.
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold one quality value into the running statistics.
    pub fn push(&mut self, q: f64) {
        self.sum += q;
        self.count += 1;
        let delta = q - self.mean;
        self.mean += delta / self.count as f64;
        self.m2 += delta * (q - self.mean);
    }

    /// Number of values seen.
    pub fn count(&self) -> usize {
        self.count
    }

    /// Sum of values seen.
    pub fn sum(&self) -> f64 {
        self.sum
    }

    /// Running mean (0 when empty).
    pub fn mean(&self) -> f64 {
        self.mean
    }

    /// Running sum of squared deviations from the mean.
    pub fn m2(&self) -> f64 {
        self.m2
    }

    /// Population standard deviation, `sqrt(M2 / count)`; 0 until two values are seen.
    pub fn std_dev(&self) -> f64 {
        if self.count > 1 {
            (self.m2.max(0.0) / self.count as f64).sqrt()
        } else {
            0.0
        }
    }

    /// `mean - tolerance * std_dev`.
    pub fn threshold(&self, tolerance: f64) -> f64 {
        self.mean - tolerance * self.std_dev()
    }
}

impl Extend<f64> for QualityStats {
    fn extend<I: IntoIterator<Item = f64>>(&mut self, iter: I) {
        for q in iter {
            self.push(q);
        }
    }
}

impl FromIterator<f64> for QualityStats {
    fn from_iter<I: IntoIterator<Item = f64>>(iter: I) -> Self {
        let mut stats = Self::new();
        stats.extend(iter);
        stats
    }
}

/// Outcome of [`QualityFilter::apply`].
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FilterReport {
    /// Removed vertex ids, in removal order (pass by pass, ascending within a pass).
    pub removed: Vec<VertexId>,
    /// Number of passes executed.
    pub passes: usize,
}

/// Removes vertices whose neighborhood purity falls below their cluster's threshold.
#[derive(Debug, Clone)]
pub struct QualityFilter {
    tolerance: f64,
    max_passes: usize,
}

impl QualityFilter {
    /// Default deviation multiplier.
    pub const DEFAULT_TOLERANCE: f64 = 1.0;

    /// Single-pass filter with the given deviation multiplier.
    pub fn new(tolerance: f64) -> Self {
        Self {
            tolerance,
            max_passes: 1,
        }
    }

    /// Set the deviation multiplier.
    pub fn with_tolerance(mut self, tolerance: f64) -> Self {
        self.tolerance = tolerance;
        self
    }

    /// Repeat the pass up to `max_passes` times, stopping early once nothing is removed.
    pub fn with_max_passes(mut self, max_passes: usize) -> Self {
        self.max_passes = max_passes;
        self
    }

    fn validate(&self) -> Result<()> {
        if !self.tolerance.is_finite() || self.tolerance < 0.0 {
            return Err(Error::InvalidParameter {
                name: "tolerance",
                message: "must be finite and non-negative",
            });
        }
        if self.max_passes == 0 {
            return Err(Error::InvalidParameter {
                name: "filter_passes",
                message: "must be at least 1",
            });
        }
        Ok(())
    }

    /// Filter `dataset` in place. The adjacency lists must already be populated.
    pub fn apply(&self, dataset: &mut Dataset) -> Result<FilterReport> {
        self.validate()?;

        let mut report = FilterReport::default();
        while report.passes < self.max_passes {
            let removed = self.pass(dataset);
            report.passes += 1;
            debug!(
                pass = report.passes,
                removed = removed.len(),
                "quality filter pass"
            );
            let done = removed.is_empty();
            report.removed.extend(removed);
            if done {
                break;
            }
        }
        Ok(report)
    }

    fn pass(&self, dataset: &mut Dataset) -> Vec<VertexId> {
        let active: Vec<bool> = (0..dataset.len()).map(|i| dataset.is_active(i)).collect();
        let qualities: Vec<f64> = dataset
            .vertices()
            .iter()
            .map(|v| {
                let mut degree = 0usize;
                let mut same = 0usize;
                for a in v.adjacency().iter().filter(|a| active[a.neighbor]) {
                    degree += 1;
                    if dataset.vertices()[a.neighbor].cluster() == v.cluster() {
                        same += 1;
                    }
                }
                if degree == 0 {
                    0.0
                } else {
                    same as f64 / degree as f64
                }
            })
            .collect();

        let (vertices, clusters) = dataset.parts_mut();
        for (v, &q) in vertices.iter_mut().zip(&qualities) {
            if active[v.id()] {
                v.quality = q;
            }
        }

        let mut removed = Vec::new();
        for cluster in clusters.values_mut() {
            if cluster.is_empty() {
                continue;
            }

            let stats: QualityStats = cluster.members.iter().map(|&id| qualities[id]).collect();
            let threshold = stats.threshold(self.tolerance);
            trace!(
                cluster = %cluster.id(),
                count = stats.count(),
                mean = stats.mean(),
                std_dev = stats.std_dev(),
                threshold,
                "cluster quality"
            );
            cluster.stats = stats;
            cluster.threshold = threshold;

            let dropped: Vec<VertexId> = cluster
                .members
                .iter()
                .copied()
                .filter(|&id| qualities[id] < threshold)
                .collect();
            for id in &dropped {
                cluster.members.remove(id);
            }
            removed.extend(dropped);
        }
        removed.sort_unstable();
        removed
    }
}

impl Default for QualityFilter {
    fn default() -> Self {
        Self::new(Self::DEFAULT_TOLERANCE)
    }
}
