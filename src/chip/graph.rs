//! Gabriel graph construction.
//!
//! # The Gabriel Graph (Gabriel & Sokal, 1969)
//!
//! Two points `p` and `q` are Gabriel neighbors iff no third point lies strictly
//! inside the hypersphere whose diameter is the segment `pq`. With squared
//! distances this reduces to a test with no square roots:
//!
//! ```text
//! edge(i, j)  <=>  for all k != i, j:  d²(i, k) + d²(j, k) >= d²(i, j)
//! ```
//!
//! Points exactly on the sphere (`=`) keep the edge by default. For lattice-like
//! data, where many points are co-circular (the corners of a square, for example),
//! [`GabrielGraph::exclude_cocircular`] makes those points block the edge instead.
//!
//! ## Complexity
//!
//! - **Time**: O(n³) for the all-pairs test.
//! - **Space**: O(n + e) for the adjacency lists.
//!
//! With the `parallel` feature the outer pair loop runs on the rayon pool. Each row
//! produces its own edge list, and rows are merged in index order, so the output is
//! identical to the serial path.

#[cfg(feature = "parallel")]
use rayon::prelude::*;
use tracing::debug;

use super::dataset::{Dataset, Edge, VertexId};
use super::geometry::squared_distance;

/// Gabriel graph builder.
#[derive(Debug, Clone, Default)]
pub struct GabrielGraph {
    exclude_cocircular: bool,
}

impl GabrielGraph {
    /// Create a builder that keeps co-circular ties.
    pub fn new() -> Self {
        Self::default()
    }

    /// Treat points lying exactly on the diametral sphere as blocking the edge.
    pub fn exclude_cocircular(mut self, exclude: bool) -> Self {
        self.exclude_cocircular = exclude;
        self
    }

    /// Whether the pair `(i, j)` passes the Gabriel test against every other point.
    fn is_edge<P: AsRef<[f32]>>(&self, points: &[P], i: usize, j: usize) -> bool {
        let pi = points[i].as_ref();
        let pj = points[j].as_ref();
        let dij = squared_distance(pi, pj);

        points
            .iter()
            .enumerate()
            .filter(|&(k, _)| k != i && k != j)
            .all(|(_, pk)| {
                let pk = pk.as_ref();
                let through_k = squared_distance(pi, pk) + squared_distance(pj, pk);
                if self.exclude_cocircular {
                    dij < through_k
                } else {
                    dij <= through_k
                }
            })
    }

    fn row<P: AsRef<[f32]>>(&self, points: &[P], i: usize) -> Vec<Edge> {
        (i + 1..points.len())
            .filter(|&j| self.is_edge(points, i, j))
            .map(|j| Edge::new(i, j))
            .collect()
    }

    /// Compute all Gabriel edges over `points`, sorted by `(lo, hi)`.
    #[cfg(not(feature = "parallel"))]
    pub fn edges<P: AsRef<[f32]>>(&self, points: &[P]) -> Vec<Edge> {
        (0..points.len())
            .flat_map(|i| self.row(points, i))
            .collect()
    }

    /// Compute all Gabriel edges over `points`, sorted by `(lo, hi)`.
    #[cfg(feature = "parallel")]
    pub fn edges<P: AsRef<[f32]> + Sync>(&self, points: &[P]) -> Vec<Edge> {
        (0..points.len())
            .into_par_iter()
            .flat_map_iter(|i| self.row(points, i))
            .collect()
    }

    /// Populate the adjacency lists of `dataset`'s active vertices.
    ///
    /// Any previous adjacency is discarded, and vertices removed by filtering neither
    /// get edges nor block them. Returns the number of edges.
    pub fn build(&self, dataset: &mut Dataset) -> usize {
        let (ids, points): (Vec<VertexId>, Vec<&[f32]>) = dataset
            .vertices()
            .iter()
            .filter(|v| dataset.is_active(v.id()))
            .map(|v| (v.id(), v.coordinates()))
            .unzip();
        let edges: Vec<Edge> = self
            .edges(&points)
            .into_iter()
            .map(|e| Edge::new(ids[e.lo()], ids[e.hi()]))
            .collect();

        dataset.clear_adjacency();
        for &edge in &edges {
            dataset.connect(edge);
        }

        let boundary = dataset
            .vertices()
            .iter()
            .flat_map(|v| v.adjacency())
            .filter(|a| a.boundary)
            .count()
            / 2;
        debug!(
            vertices = dataset.len(),
            edges = edges.len(),
            boundary,
            "built gabriel graph"
        );
        edges.len()
    }
}

/// Gabriel edges over `points` with the default (tie-keeping) policy.
#[cfg(not(feature = "parallel"))]
pub fn gabriel_edges<P: AsRef<[f32]>>(points: &[P]) -> Vec<Edge> {
    GabrielGraph::new().edges(points)
}

/// Gabriel edges over `points` with the default (tie-keeping) policy.
#[cfg(feature = "parallel")]
pub fn gabriel_edges<P: AsRef<[f32]> + Sync>(points: &[P]) -> Vec<Edge> {
    GabrielGraph::new().edges(points)
}

/// Populate `dataset`'s adjacency lists with the default policy.
pub fn build_gabriel_graph(dataset: &mut Dataset) -> usize {
    GabrielGraph::new().build(dataset)
}
