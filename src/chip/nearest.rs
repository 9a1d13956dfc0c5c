//! Nearest-support-vertex classification.
//!
//! A baseline that skips hyperplanes entirely: the *support vertices* are the
//! endpoints of the surviving boundary edges, and a query takes the cluster of the
//! nearest one. Unlike the gated ensemble it handles any number of clusters and
//! needs no polarity calibration.

use std::collections::BTreeSet;

use super::dataset::{ClusterId, Dataset, VertexId};
use super::geometry::{check_dims, squared_distance};
use super::traits::Classifier;
use crate::error::{Error, Result};

/// Nearest-support-vertex classifier.
#[derive(Clone, Debug, PartialEq)]
pub struct NearestSupport {
    support: Vec<(Vec<f32>, ClusterId)>,
}

impl NearestSupport {
    /// Use explicit `(coordinates, cluster)` support points.
    pub fn new(support: Vec<(Vec<f32>, ClusterId)>) -> Result<Self> {
        let (first, _) = support.first().ok_or(Error::EmptyInput)?;
        let dim = first.len();
        for (coordinates, _) in &support[1..] {
            check_dims(dim, coordinates.len())?;
        }
        Ok(Self { support })
    }

    /// Collect the endpoints of `dataset`'s surviving boundary edges.
    ///
    /// The graph must be built (and usually filtered) first.
    pub fn from_dataset(dataset: &Dataset) -> Result<Self> {
        let ids: BTreeSet<VertexId> = dataset
            .boundary_edges()
            .into_iter()
            .flat_map(|e| [e.lo(), e.hi()])
            .collect();
        let support = ids
            .into_iter()
            .filter_map(|id| dataset.vertex(id))
            .map(|v| (v.coordinates().to_vec(), v.cluster().clone()))
            .collect();
        Self::new(support)
    }

    /// Support points, in vertex id order when built from a dataset.
    pub fn support(&self) -> &[(Vec<f32>, ClusterId)] {
        &self.support
    }

    /// Cluster of the nearest support point (first one on ties).
    pub fn nearest(&self, x: &[f32]) -> Result<&ClusterId> {
        let (first, _) = self.support.first().ok_or(Error::EmptyInput)?;
        check_dims(first.len(), x.len())?;
        self.support
            .iter()
            .map(|(c, id)| (id, squared_distance(x, c)))
            .min_by(|(_, a), (_, b)| a.total_cmp(b))
            .map(|(id, _)| id)
            .ok_or(Error::EmptyInput)
    }
}

impl Classifier for NearestSupport {
    fn predict(&self, x: &[f32]) -> Result<ClusterId> {
        self.nearest(x).cloned()
    }
}
