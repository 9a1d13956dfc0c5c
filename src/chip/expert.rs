//! Experts: linear separators derived from boundary edges.
//!
//! Every surviving boundary edge `(v1, v2)` yields one hyperplane. All strategies
//! share the midpoint `m = (v1 + v2) / 2`; they differ in the normal and the bias:
//!
//! | Strategy            | normal      | bias                          |
//! |---------------------|-------------|-------------------------------|
//! | `PlainDifference`   | `v1 - v2`   | `<m, normal>`                 |
//! | `MidpointAnchored`  | `m - v2`    | `<(m + v2) / 2, normal>`      |
//! | `SymmetricSum`      | `v1 + v2`   | `<m, normal>`                 |
//!
//! An expert's margin for a point `x` is `<x, normal> - bias`. For
//! `PlainDifference` this is positive on `v1`'s side of the perpendicular bisector.

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::dataset::{Dataset, Edge};
use super::geometry::{check_dims, dot, midpoint};
use crate::error::{Error, Result};

/// Identifier of an expert within a model.
pub type ExpertId = usize;

/// How an expert's normal vector and bias are derived from its edge.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExpertStrategy {
    /// Perpendicular bisector of the edge.
    #[default]
    PlainDifference,
    /// Half-length normal with the plane shifted toward the second endpoint.
    MidpointAnchored,
    /// Normal along the sum of the endpoints.
    SymmetricSum,
}

impl ExpertStrategy {
    fn normal_and_bias(self, c1: &[f32], c2: &[f32], mid: &[f32]) -> (Vec<f32>, f64) {
        match self {
            Self::PlainDifference => {
                let normal: Vec<f32> = c1.iter().zip(c2).map(|(a, b)| a - b).collect();
                let bias = dot(mid, &normal);
                (normal, bias)
            }
            Self::MidpointAnchored => {
                let normal: Vec<f32> = mid.iter().zip(c2).map(|(m, b)| m - b).collect();
                let anchor = midpoint(mid, c2);
                let bias = dot(&anchor, &normal);
                (normal, bias)
            }
            Self::SymmetricSum => {
                let normal: Vec<f32> = c1.iter().zip(c2).map(|(a, b)| a + b).collect();
                let bias = dot(mid, &normal);
                (normal, bias)
            }
        }
    }
}

/// A separating hyperplane. Immutable once built.
///
/// Deserialization goes through [`Expert::new`], so a loaded expert has the same
/// dimensionality guarantees as a constructed one.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawExpert")]
pub struct Expert {
    id: ExpertId,
    edge: Option<Edge>,
    midpoint: Vec<f32>,
    normal: Vec<f32>,
    bias: f64,
}

#[derive(Deserialize)]
struct RawExpert {
    id: ExpertId,
    #[serde(default)]
    edge: Option<Edge>,
    midpoint: Vec<f32>,
    normal: Vec<f32>,
    bias: f64,
}

impl TryFrom<RawExpert> for Expert {
    type Error = Error;

    fn try_from(raw: RawExpert) -> Result<Self> {
        let mut expert = Self::new(raw.id, raw.midpoint, raw.normal, raw.bias)?;
        expert.edge = raw.edge;
        Ok(expert)
    }
}

impl Expert {
    /// Build an expert from explicit parts, with no source edge.
    pub fn new(id: ExpertId, midpoint: Vec<f32>, normal: Vec<f32>, bias: f64) -> Result<Self> {
        check_dims(midpoint.len(), normal.len())?;
        if midpoint.is_empty() {
            return Err(Error::InvalidParameter {
                name: "dimension",
                message: "must be at least 1",
            });
        }
        Ok(Self {
            id,
            edge: None,
            midpoint,
            normal,
            bias,
        })
    }

    /// Build an expert from the endpoint coordinates of `edge`.
    ///
    /// `c1` and `c2` are `v1` and `v2` in the module-level table.
    pub fn from_edge(
        id: ExpertId,
        edge: Edge,
        c1: &[f32],
        c2: &[f32],
        strategy: ExpertStrategy,
    ) -> Result<Self> {
        check_dims(c1.len(), c2.len())?;
        let mid = midpoint(c1, c2);
        let (normal, bias) = strategy.normal_and_bias(c1, c2, &mid);
        Ok(Self {
            id,
            edge: Some(edge),
            midpoint: mid,
            normal,
            bias,
        })
    }

    /// Expert id.
    pub fn id(&self) -> ExpertId {
        self.id
    }

    /// Source edge, if the expert was derived from the graph.
    pub fn edge(&self) -> Option<Edge> {
        self.edge
    }

    /// Midpoint of the source edge.
    pub fn midpoint(&self) -> &[f32] {
        &self.midpoint
    }

    /// Normal vector.
    pub fn normal(&self) -> &[f32] {
        &self.normal
    }

    /// Bias.
    pub fn bias(&self) -> f64 {
        self.bias
    }

    /// Dimensionality.
    pub fn dim(&self) -> usize {
        self.normal.len()
    }

    /// Signed margin `<x, normal> - bias`.
    #[inline]
    pub fn margin(&self, x: &[f32]) -> f64 {
        dot(x, &self.normal) - self.bias
    }
}

/// Turns a filtered dataset's boundary edges into experts.
#[derive(Debug, Clone, Copy, Default)]
pub struct ExpertFactory {
    strategy: ExpertStrategy,
}

impl ExpertFactory {
    /// Factory using `strategy` for every expert.
    pub fn new(strategy: ExpertStrategy) -> Self {
        Self { strategy }
    }

    /// One expert per surviving boundary edge, with ids assigned in edge order.
    ///
    /// Each expert is oriented from the endpoint whose cluster id sorts first, so with
    /// two clusters every margin is positive on the same cluster's side.
    pub fn build(&self, dataset: &Dataset) -> Result<Vec<Expert>> {
        let experts = dataset
            .boundary_edges()
            .into_iter()
            .enumerate()
            .filter_map(|(id, edge)| {
                dataset.endpoints(edge).map(|(a, b)| {
                    let (v1, v2) = if a.cluster() <= b.cluster() { (a, b) } else { (b, a) };
                    Expert::from_edge(id, edge, v1.coordinates(), v2.coordinates(), self.strategy)
                })
            })
            .collect::<Result<Vec<_>>>()?;

        debug!(
            experts = experts.len(),
            strategy = ?self.strategy,
            "derived experts"
        );
        Ok(experts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chip::dataset::ClusterId;
    use crate::chip::filter::QualityFilter;
    use crate::chip::graph::build_gabriel_graph;

    const C1: [f32; 2] = [2.0, 4.0];
    const C2: [f32; 2] = [0.0, 0.0];

    fn build(strategy: ExpertStrategy) -> Expert {
        Expert::from_edge(0, Edge::new(0, 1), &C1, &C2, strategy).unwrap()
    }

    #[test]
    fn test_plain_difference() {
        let e = build(ExpertStrategy::PlainDifference);
        assert_eq!(e.midpoint(), &[1.0, 2.0]);
        assert_eq!(e.normal(), &[2.0, 4.0]);
        assert_eq!(e.bias(), 10.0);
        // Positive on c1's side, negative on c2's, zero on the bisector.
        assert!(e.margin(&C1) > 0.0);
        assert!(e.margin(&C2) < 0.0);
        assert_eq!(e.margin(&[1.0, 2.0]), 0.0);
    }

    #[test]
    fn test_midpoint_anchored() {
        let e = build(ExpertStrategy::MidpointAnchored);
        assert_eq!(e.normal(), &[1.0, 2.0]);
        // anchor = (0.5, 1.0)
        assert_eq!(e.bias(), 2.5);
        assert_eq!(e.margin(&[0.5, 1.0]), 0.0);
    }

    #[test]
    fn test_symmetric_sum() {
        let e = build(ExpertStrategy::SymmetricSum);
        assert_eq!(e.normal(), &[2.0, 4.0]);
        assert_eq!(e.bias(), 10.0);
    }

    #[test]
    fn test_dimension_mismatch_is_fatal() {
        let err = Expert::from_edge(
            0,
            Edge::new(0, 1),
            &[1.0, 2.0],
            &[1.0],
            ExpertStrategy::default(),
        );
        assert!(matches!(err, Err(Error::DimensionMismatch { .. })));
        assert!(Expert::new(1, vec![0.0, 0.0], vec![1.0], 0.0).is_err());
        assert!(Expert::new(1, vec![], vec![], 0.0).is_err());
    }

    #[test]
    fn test_external_expert_has_no_edge() {
        let e = Expert::new(3, vec![0.0, 0.0], vec![1.0, 0.0], 0.5).unwrap();
        assert_eq!(e.edge(), None);
        assert_eq!(e.id(), 3);
        assert_eq!(e.margin(&[2.0, 9.0]), 1.5);
    }

    #[test]
    fn test_factory_builds_one_expert_per_boundary_edge() {
        let data = vec![vec![0.0, 0.0], vec![0.0, 1.0], vec![5.0, 0.0], vec![5.0, 1.0]];
        let labels: Vec<ClusterId> = ["A", "A", "B", "B"].into_iter().map(Into::into).collect();
        let mut ds = Dataset::new(&data, &labels).unwrap();
        build_gabriel_graph(&mut ds);
        QualityFilter::default().apply(&mut ds).unwrap();

        let experts = ExpertFactory::default().build(&ds).unwrap();
        let edges = ds.boundary_edges();
        for e in &experts {
            assert!(e.margin(&[0.0, 0.5]) > 0.0);
            assert!(e.margin(&[5.0, 0.5]) < 0.0);
        }
        assert_eq!(experts.len(), edges.len());
        for (i, (expert, edge)) in experts.iter().zip(&edges).enumerate() {
            assert_eq!(expert.id(), i);
            assert_eq!(expert.edge(), Some(*edge));
            let (v1, v2) = ds.endpoints(*edge).unwrap();
            for k in 0..2 {
                let expected = (v1.coordinates()[k] + v2.coordinates()[k]) / 2.0;
                assert!((expert.midpoint()[k] - expected).abs() <= f32::EPSILON);
            }
        }
    }
}
