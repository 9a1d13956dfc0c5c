//! Gated ensemble classification over experts.
//!
//! ## Soft gating
//!
//! Every expert votes with its signed margin, weighted by how close the query is to
//! the expert's midpoint:
//!
//! ```text
//! d_l = ||x - m_l||²          D = max_l d_l
//! w_l = exp(-d_l / D) / Σ_k exp(-d_k / D)
//! decision = sign( Σ_l w_l (<x, n_l> - b_l) )
//! ```
//!
//! If `D == 0` (the query sits on every midpoint) a tiny positive `D` is substituted;
//! if the weights cannot be normalized they fall back to uniform `1/L`.
//!
//! ## Hard gating
//!
//! Only the expert with the nearest midpoint votes.
//!
//! A zero decision value resolves to `+1` (see [`Polarity::from_decision`]).

use serde::{Deserialize, Serialize};
use tracing::trace;

use super::bimap::{ClusterIdBimap, Polarity};
use super::dataset::ClusterId;
use super::expert::Expert;
use super::geometry::{check_dims, squared_distance_f64};
use crate::error::{Error, Result};

/// Substitute for the maximum squared distance when every distance is zero.
pub const MIN_MAX_DISTANCE: f64 = 1e-8;

/// How expert margins are combined into one decision.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Gating {
    /// Distance-weighted vote over all experts.
    #[default]
    Soft,
    /// The nearest expert alone decides.
    Hard,
}

/// A set of experts plus the rule that combines them.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawGatingClassifier")]
pub struct GatingClassifier {
    experts: Vec<Expert>,
    gating: Gating,
}

#[derive(Deserialize)]
struct RawGatingClassifier {
    experts: Vec<Expert>,
    #[serde(default)]
    gating: Gating,
}

impl TryFrom<RawGatingClassifier> for GatingClassifier {
    type Error = Error;

    fn try_from(raw: RawGatingClassifier) -> Result<Self> {
        Self::new(raw.experts, raw.gating)
    }
}

impl GatingClassifier {
    /// Wrap `experts`; they must all share one dimensionality.
    pub fn new(experts: Vec<Expert>, gating: Gating) -> Result<Self> {
        if let Some(first) = experts.first() {
            for e in &experts[1..] {
                check_dims(first.dim(), e.dim())?;
            }
        }
        Ok(Self { experts, gating })
    }

    /// The experts, in id order as trained.
    pub fn experts(&self) -> &[Expert] {
        &self.experts
    }

    /// Combination rule.
    pub fn gating(&self) -> Gating {
        self.gating
    }

    pub(crate) fn into_parts(self) -> (Vec<Expert>, Gating) {
        (self.experts, self.gating)
    }

    /// Same experts, different combination rule.
    pub fn with_gating(mut self, gating: Gating) -> Self {
        self.gating = gating;
        self
    }

    fn check_query(&self, x: &[f32]) -> Result<()> {
        let first = self.experts.first().ok_or(Error::NoExperts)?;
        check_dims(first.dim(), x.len())
    }

    /// Normalized soft-gating weights for `x`, one per expert.
    pub fn weights(&self, x: &[f32]) -> Result<Vec<f64>> {
        self.check_query(x)?;

        let distances: Vec<f64> = self
            .experts
            .iter()
            .map(|e| squared_distance_f64(x, e.midpoint()))
            .collect();
        let mut max_d = distances.iter().copied().fold(0.0, f64::max);
        if max_d <= 0.0 || !max_d.is_finite() {
            trace!(max_d, "degenerate max distance; substituting epsilon");
            max_d = MIN_MAX_DISTANCE;
        }

        let mut weights: Vec<f64> = distances.iter().map(|d| (-d / max_d).exp()).collect();
        let sum: f64 = weights.iter().sum();
        if sum > 0.0 && sum.is_finite() {
            for w in &mut weights {
                *w /= sum;
            }
        } else {
            trace!(sum, "weights not normalizable; using uniform weights");
            let uniform = 1.0 / weights.len() as f64;
            weights.iter_mut().for_each(|w| *w = uniform);
        }
        Ok(weights)
    }

    /// The expert whose midpoint is nearest to `x` (first one on ties).
    pub fn nearest_expert(&self, x: &[f32]) -> Result<&Expert> {
        self.check_query(x)?;
        self.experts
            .iter()
            .map(|e| (e, squared_distance_f64(x, e.midpoint())))
            .min_by(|(_, a), (_, b)| a.total_cmp(b))
            .map(|(e, _)| e)
            .ok_or(Error::NoExperts)
    }

    /// Uncalibrated decision value; its sign is the binary decision.
    pub fn decision_value(&self, x: &[f32]) -> Result<f64> {
        match self.gating {
            Gating::Soft => {
                let weights = self.weights(x)?;
                Ok(self
                    .experts
                    .iter()
                    .zip(&weights)
                    .map(|(e, w)| w * e.margin(x))
                    .sum())
            }
            Gating::Hard => Ok(self.nearest_expert(x)?.margin(x)),
        }
    }

    /// Uncalibrated binary decision.
    pub fn decide(&self, x: &[f32]) -> Result<Polarity> {
        self.decision_value(x).map(Polarity::from_decision)
    }

    /// Resolve the decision for `x` to a concrete cluster id.
    pub fn classify<'a>(&self, x: &[f32], bimap: &'a ClusterIdBimap) -> Result<&'a ClusterId> {
        Ok(bimap.get(self.decide(x)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chip::dataset::Edge;
    use crate::chip::expert::ExpertStrategy;

    fn expert(id: usize, c1: &[f32], c2: &[f32]) -> Expert {
        Expert::from_edge(id, Edge::new(2 * id, 2 * id + 1), c1, c2, ExpertStrategy::PlainDifference)
            .unwrap()
    }

    /// Two vertical separators: one near the origin, one far away.
    fn classifier(gating: Gating) -> GatingClassifier {
        GatingClassifier::new(
            vec![
                expert(0, &[-1.0, 0.0], &[1.0, 0.0]),
                expert(1, &[99.0, 0.0], &[101.0, 0.0]),
            ],
            gating,
        )
        .unwrap()
    }

    #[test]
    fn test_weights_sum_to_one_and_favor_nearby_experts() {
        let clf = classifier(Gating::Soft);
        let w = clf.weights(&[0.0, 0.0]).unwrap();
        assert!((w.iter().sum::<f64>() - 1.0).abs() < 1e-12);
        assert!(w[0] > w[1]);
        // d = [0, D]: exp(0) : exp(-1)
        assert!((w[0] / w[1] - std::f64::consts::E).abs() < 1e-9);
    }

    #[test]
    fn test_zero_max_distance_falls_back_to_uniform() {
        let clf = GatingClassifier::new(
            vec![
                expert(0, &[-1.0, 0.0], &[1.0, 0.0]),
                expert(1, &[0.0, 1.0], &[0.0, -1.0]),
            ],
            Gating::Soft,
        )
        .unwrap();
        let w = clf.weights(&[0.0, 0.0]).unwrap();
        assert_eq!(w, vec![0.5, 0.5]);
    }

    #[test]
    fn test_soft_and_hard_can_disagree() {
        // Near the origin expert but on the far side of the distant one's plane.
        let soft = classifier(Gating::Soft);
        let hard = classifier(Gating::Hard);
        let x = [2.0, 0.0];

        assert_eq!(hard.nearest_expert(&x).unwrap().id(), 0);
        assert_eq!(hard.decide(&x).unwrap(), Polarity::Negative);
        // Expert 1's margin (+196) outweighs expert 0's (-4) despite its smaller weight.
        assert!(soft.decision_value(&x).unwrap() > 0.0);
        assert_eq!(soft.decide(&x).unwrap(), Polarity::Positive);
    }

    #[test]
    fn test_zero_decision_resolves_positive() {
        let clf = GatingClassifier::new(vec![expert(0, &[1.0], &[-1.0])], Gating::Hard).unwrap();
        assert_eq!(clf.decision_value(&[0.0]).unwrap(), 0.0);
        assert_eq!(clf.decide(&[0.0]).unwrap(), Polarity::Positive);
    }

    #[test]
    fn test_classify_through_bimap() {
        let bimap = ClusterIdBimap::new(ClusterId::from("left"), ClusterId::from("right")).unwrap();
        let clf = classifier(Gating::Hard);
        assert_eq!(clf.classify(&[-3.0, 0.0], &bimap).unwrap(), &ClusterId::from("left"));
        assert_eq!(clf.classify(&[3.0, 0.0], &bimap).unwrap(), &ClusterId::from("right"));
    }

    #[test]
    fn test_errors() {
        let empty = GatingClassifier::new(Vec::new(), Gating::Soft).unwrap();
        assert!(matches!(empty.decide(&[0.0]), Err(Error::NoExperts)));

        let clf = classifier(Gating::Soft);
        assert!(matches!(
            clf.decide(&[0.0]),
            Err(Error::DimensionMismatch {
                expected: 2,
                found: 1
            })
        ));

        let mixed = GatingClassifier::new(
            vec![expert(0, &[1.0], &[0.0]), expert(1, &[1.0, 1.0], &[0.0, 0.0])],
            Gating::Soft,
        );
        assert!(mixed.is_err());
    }

    #[test]
    fn test_decisions_are_deterministic() {
        let clf = classifier(Gating::Soft);
        let x = [0.3, -7.25];
        assert_eq!(
            clf.decision_value(&x).unwrap().to_bits(),
            clf.decision_value(&x).unwrap().to_bits()
        );
    }
}
