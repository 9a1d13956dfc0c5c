//! Training pipeline and the trained model.
//!
//! `Chip::fit` runs the four stages in order:
//!
//! 1. Gabriel graph over all labeled points
//! 2. quality filter (drops vertices whose neighborhood disagrees with their label)
//! 3. Gabriel graph again, over the survivors only
//! 4. one expert per surviving boundary edge
//! 5. bimap calibration by reference-vertex majority vote
//!
//! Step 3 matters: the filter tends to remove exactly the vertices that carried the
//! first graph's boundary edges, and the second one reconnects what is left across
//! the cleaned-up boundary. [`Chip::with_rebuild_graph`] turns it off.
//!
//! The result is a [`ChipModel`], which only needs the experts and the bimap to
//! classify new points.

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::bimap::{ClusterIdBimap, Polarity};
use super::dataset::{ClusterId, Dataset};
use super::expert::{Expert, ExpertFactory, ExpertStrategy};
use super::filter::QualityFilter;
use super::gating::{Gating, GatingClassifier};
use super::graph::GabrielGraph;
use super::traits::Classifier;
use crate::error::{Error, Result};

/// Training parameters.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChipParams {
    /// Deviation multiplier for the per-cluster quality threshold.
    pub tolerance: f64,

    /// Maximum number of filter passes; 1 is the canonical single pass.
    pub filter_passes: usize,

    /// How experts derive their normal and bias.
    pub strategy: ExpertStrategy,

    /// How expert margins are combined.
    pub gating: Gating,

    /// Reference vertices per cluster used to calibrate the bimap.
    pub reference_vertices: usize,

    /// Optional RNG seed for reference-vertex sampling.
    pub seed: Option<u64>,

    /// Points exactly on a diametral sphere block the Gabriel edge.
    pub exclude_cocircular: bool,

    /// Recompute the graph over surviving vertices before deriving experts.
    pub rebuild_graph: bool,
}

impl Default for ChipParams {
    fn default() -> Self {
        Self {
            tolerance: QualityFilter::DEFAULT_TOLERANCE,
            filter_passes: 1,
            strategy: ExpertStrategy::default(),
            gating: Gating::default(),
            reference_vertices: 16,
            seed: None,
            exclude_cocircular: false,
            rebuild_graph: true,
        }
    }
}

/// Gabriel-graph hyperplane classifier trainer.
#[derive(Debug, Clone, Default)]
pub struct Chip {
    params: ChipParams,
}

impl Chip {
    /// Trainer with default parameters.
    pub fn new() -> Self {
        Self::default()
    }

    /// Trainer with explicit parameters.
    pub fn with_params(params: ChipParams) -> Self {
        Self { params }
    }

    /// Current parameters.
    pub fn params(&self) -> &ChipParams {
        &self.params
    }

    /// Set the filter tolerance.
    pub fn with_tolerance(mut self, tolerance: f64) -> Self {
        self.params.tolerance = tolerance;
        self
    }

    /// Set the maximum number of filter passes.
    pub fn with_filter_passes(mut self, passes: usize) -> Self {
        self.params.filter_passes = passes;
        self
    }

    /// Set the expert construction strategy.
    pub fn with_strategy(mut self, strategy: ExpertStrategy) -> Self {
        self.params.strategy = strategy;
        self
    }

    /// Set the gating rule.
    pub fn with_gating(mut self, gating: Gating) -> Self {
        self.params.gating = gating;
        self
    }

    /// Set the number of reference vertices per cluster.
    pub fn with_reference_vertices(mut self, n: usize) -> Self {
        self.params.reference_vertices = n;
        self
    }

    /// Set the RNG seed.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.params.seed = Some(seed);
        self
    }

    /// Set the co-circular tie policy of the graph builder.
    pub fn with_exclude_cocircular(mut self, exclude: bool) -> Self {
        self.params.exclude_cocircular = exclude;
        self
    }

    /// Whether to recompute the graph after filtering.
    pub fn with_rebuild_graph(mut self, rebuild: bool) -> Self {
        self.params.rebuild_graph = rebuild;
        self
    }

    fn validate(&self) -> Result<()> {
        let p = &self.params;
        if !p.tolerance.is_finite() || p.tolerance < 0.0 {
            return Err(Error::InvalidParameter {
                name: "tolerance",
                message: "must be finite and non-negative",
            });
        }
        if p.filter_passes == 0 {
            return Err(Error::InvalidParameter {
                name: "filter_passes",
                message: "must be at least 1",
            });
        }
        if p.reference_vertices == 0 {
            return Err(Error::InvalidParameter {
                name: "reference_vertices",
                message: "must be at least 1",
            });
        }
        Ok(())
    }

    /// Train on parallel slices of points and labels.
    pub fn fit(&self, data: &[Vec<f32>], labels: &[ClusterId]) -> Result<ChipModel> {
        self.validate()?;
        if data.is_empty() {
            return Err(Error::EmptyInput);
        }
        let mut dataset = Dataset::new(data, labels)?;
        self.fit_dataset(&mut dataset)
    }

    /// Train on a dataset in place.
    ///
    /// On return `dataset` holds the Gabriel graph and the filtered cluster membership,
    /// which is what [`NearestSupport::from_dataset`](super::NearestSupport::from_dataset)
    /// consumes.
    pub fn fit_dataset(&self, dataset: &mut Dataset) -> Result<ChipModel> {
        self.validate()?;
        if dataset.is_empty() {
            return Err(Error::EmptyInput);
        }
        let n_clusters = dataset.clusters().len();
        if n_clusters < 2 {
            return Err(Error::NotBijective(format!(
                "training data has {n_clusters} cluster(s), need at least two"
            )));
        }

        let p = &self.params;
        let graph = GabrielGraph::new().exclude_cocircular(p.exclude_cocircular);
        graph.build(dataset);
        let report = QualityFilter::new(p.tolerance)
            .with_max_passes(p.filter_passes)
            .apply(dataset)?;
        if p.rebuild_graph && !report.removed.is_empty() {
            graph.build(dataset);
        }

        let experts = ExpertFactory::new(p.strategy).build(dataset)?;
        if experts.is_empty() {
            return Err(Error::NoExperts);
        }

        let classifier = GatingClassifier::new(experts, p.gating)?;
        let bimap = ClusterIdBimap::calibrate(dataset, p.reference_vertices, p.seed, |x| {
            classifier.decide(x)
        })?;

        debug!(
            vertices = dataset.len(),
            removed = report.removed.len(),
            experts = classifier.experts().len(),
            "trained model"
        );
        Ok(ChipModel { classifier, bimap })
    }
}

/// A trained classifier: experts, gating rule, and the polarity-to-cluster bimap.
///
/// Loading a serialized model re-runs the checks of [`ChipModel::from_parts`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawChipModel")]
pub struct ChipModel {
    classifier: GatingClassifier,
    bimap: ClusterIdBimap,
}

#[derive(Deserialize)]
struct RawChipModel {
    classifier: GatingClassifier,
    bimap: ClusterIdBimap,
}

impl TryFrom<RawChipModel> for ChipModel {
    type Error = Error;

    fn try_from(raw: RawChipModel) -> Result<Self> {
        let (experts, gating) = raw.classifier.into_parts();
        Self::from_parts(experts, raw.bimap, gating)
    }
}

impl ChipModel {
    /// Assemble a model from externally supplied parts.
    pub fn from_parts(experts: Vec<Expert>, bimap: ClusterIdBimap, gating: Gating) -> Result<Self> {
        if experts.is_empty() {
            return Err(Error::NoExperts);
        }
        Ok(Self {
            classifier: GatingClassifier::new(experts, gating)?,
            bimap,
        })
    }

    /// Experts, in id order.
    pub fn experts(&self) -> &[Expert] {
        self.classifier.experts()
    }

    /// Polarity-to-cluster mapping.
    pub fn bimap(&self) -> &ClusterIdBimap {
        &self.bimap
    }

    /// Gating rule.
    pub fn gating(&self) -> Gating {
        self.classifier.gating()
    }

    /// Underlying gated ensemble.
    pub fn classifier(&self) -> &GatingClassifier {
        &self.classifier
    }

    /// Same experts and bimap, different gating rule.
    pub fn with_gating(mut self, gating: Gating) -> Self {
        self.classifier = self.classifier.with_gating(gating);
        self
    }

    /// Uncalibrated binary decision for `x`.
    pub fn decide(&self, x: &[f32]) -> Result<Polarity> {
        self.classifier.decide(x)
    }
}

impl Classifier for ChipModel {
    fn predict(&self, x: &[f32]) -> Result<ClusterId> {
        self.classifier.classify(x, &self.bimap).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_blobs() -> (Vec<Vec<f32>>, Vec<ClusterId>) {
        let data = vec![vec![0.0, 0.0], vec![0.0, 1.0], vec![5.0, 0.0], vec![5.0, 1.0]];
        let labels = ["A", "A", "B", "B"].into_iter().map(Into::into).collect();
        (data, labels)
    }

    #[test]
    fn test_fit_and_predict() {
        let (data, labels) = two_blobs();
        let model = Chip::new().fit(&data, &labels).unwrap();
        assert_eq!(model.bimap().len(), 2);
        assert_eq!(model.predict(&[0.0, 0.5]).unwrap(), ClusterId::from("A"));
        assert_eq!(model.predict(&[5.0, 0.5]).unwrap(), ClusterId::from("B"));
    }

    #[test]
    fn test_every_strategy_and_gating_trains() {
        let (data, labels) = two_blobs();
        for strategy in [
            ExpertStrategy::PlainDifference,
            ExpertStrategy::MidpointAnchored,
            ExpertStrategy::SymmetricSum,
        ] {
            for gating in [Gating::Soft, Gating::Hard] {
                let model = Chip::new()
                    .with_strategy(strategy)
                    .with_gating(gating)
                    .fit(&data, &labels);
                assert!(model.is_ok(), "{strategy:?}/{gating:?}: {model:?}");
            }
        }
    }

    #[test]
    fn test_single_cluster_is_fatal() {
        let data = vec![vec![0.0], vec![1.0], vec![2.0]];
        let labels = vec![ClusterId::from(1); 3];
        assert!(matches!(
            Chip::new().fit(&data, &labels),
            Err(Error::NotBijective(_))
        ));
    }

    #[test]
    fn test_rebuild_reconnects_survivors() {
        // Two 4x4 integer lattices facing each other across x = 3..5. The facing
        // columns score below their clusters' thresholds and are filtered out.
        let mut data = Vec::new();
        let mut labels = Vec::new();
        for x in 0..4 {
            for y in 0..4 {
                data.push(vec![x as f32, y as f32]);
                labels.push(ClusterId::from("L"));
                data.push(vec![8.0 - x as f32, y as f32]);
                labels.push(ClusterId::from("R"));
            }
        }
        let chip = Chip::new().with_exclude_cocircular(true);

        let mut rebuilt = Dataset::new(&data, &labels).unwrap();
        let model = chip.fit_dataset(&mut rebuilt).unwrap();
        assert_eq!(model.experts().len(), 4);
        for edge in rebuilt.boundary_edges() {
            let (a, b) = rebuilt.endpoints(edge).unwrap();
            assert_eq!(a.coordinates()[0], 2.0);
            assert_eq!(b.coordinates()[0], 6.0);
        }
        assert_eq!(model.predict(&[0.0, 1.0]).unwrap(), ClusterId::from("L"));
        assert_eq!(model.predict(&[8.0, 1.0]).unwrap(), ClusterId::from("R"));

        let mut stale = Dataset::new(&data, &labels).unwrap();
        assert!(matches!(
            chip.with_rebuild_graph(false).fit_dataset(&mut stale),
            Err(Error::NoExperts)
        ));
    }

    #[test]
    fn test_invalid_params() {
        let (data, labels) = two_blobs();
        assert!(Chip::new().with_tolerance(-0.5).fit(&data, &labels).is_err());
        assert!(Chip::new().with_filter_passes(0).fit(&data, &labels).is_err());
        assert!(Chip::new().with_reference_vertices(0).fit(&data, &labels).is_err());
        assert!(matches!(Chip::new().fit(&[], &[]), Err(Error::EmptyInput)));
    }

    #[test]
    fn test_params_from_partial_json() {
        let params: ChipParams =
            serde_json::from_str(r#"{"tolerance": 0.5, "strategy": "midpoint_anchored", "gating": "hard"}"#)
                .unwrap();
        assert_eq!(params.tolerance, 0.5);
        assert_eq!(params.strategy, ExpertStrategy::MidpointAnchored);
        assert_eq!(params.gating, Gating::Hard);
        assert_eq!(params.reference_vertices, 16);
        assert_eq!(params.filter_passes, 1);
        assert!(params.rebuild_graph);
    }

    #[test]
    fn test_model_serde_round_trip() {
        let (data, labels) = two_blobs();
        let model = Chip::new().with_seed(5).fit(&data, &labels).unwrap();

        let json = serde_json::to_string(&model).unwrap();
        let loaded: ChipModel = serde_json::from_str(&json).unwrap();
        assert_eq!(loaded, model);
        assert_eq!(loaded.predict(&[0.0, 0.5]).unwrap(), ClusterId::from("A"));
    }

    #[test]
    fn test_malformed_models_are_rejected() {
        let expert = r#"{"id": 0, "midpoint": [0.0, 0.0], "normal": [1.0, 0.0], "bias": 0.0}"#;
        let bimap = r#"{"positive": "a", "negative": "b"}"#;
        let model = |experts: &str, bimap: &str| {
            format!(r#"{{"classifier": {{"experts": [{experts}], "gating": "soft"}}, "bimap": {bimap}}}"#)
        };

        let ok: ChipModel = serde_json::from_str(&model(expert, bimap)).unwrap();
        assert_eq!(ok.predict(&[1.0, 0.0]).unwrap(), ClusterId::from("a"));

        // Same cluster on both polarities.
        let same = r#"{"positive": "a", "negative": "a"}"#;
        assert!(serde_json::from_str::<ChipModel>(&model(expert, same)).is_err());
        assert!(serde_json::from_str::<ClusterIdBimap>(same).is_err());

        // Experts of different dimensionality.
        let short = r#"{"id": 1, "midpoint": [0.0], "normal": [1.0], "bias": 0.0}"#;
        let mixed = format!("{expert}, {short}");
        assert!(serde_json::from_str::<ChipModel>(&model(&mixed, bimap)).is_err());

        // Midpoint and normal disagree.
        let ragged = r#"{"id": 0, "midpoint": [0.0, 0.0], "normal": [1.0], "bias": 0.0}"#;
        assert!(serde_json::from_str::<ChipModel>(&model(ragged, bimap)).is_err());
        assert!(serde_json::from_str::<Expert>(ragged).is_err());

        // No experts at all.
        assert!(serde_json::from_str::<ChipModel>(&model("", bimap)).is_err());
    }

    #[test]
    fn test_from_parts() {
        let expert = Expert::new(0, vec![0.0], vec![1.0], 0.0).unwrap();
        let bimap = ClusterIdBimap::new(ClusterId::from("pos"), ClusterId::from("neg")).unwrap();
        let model = ChipModel::from_parts(vec![expert], bimap.clone(), Gating::Soft).unwrap();
        assert_eq!(model.predict(&[2.0]).unwrap(), ClusterId::from("pos"));
        assert_eq!(model.predict(&[-2.0]).unwrap(), ClusterId::from("neg"));
        assert!(matches!(
            ChipModel::from_parts(Vec::new(), bimap, Gating::Soft),
            Err(Error::NoExperts)
        ));
    }
}
