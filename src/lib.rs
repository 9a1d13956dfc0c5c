//! Gabriel-graph hyperplane ensembles.
//!
//! `hyperchip` trains a geometric classifier over labeled dense vectors. The primary
//! public API is under [`chip`], which provides:
//! - Gabriel proximity graph construction with boundary (support) edge tagging
//! - quality-based vertex filtering with per-cluster adaptive thresholds
//! - separating hyperplanes ("experts") derived from surviving boundary edges
//! - soft and hard gating over the experts, plus a nearest-support-vertex classifier

#![forbid(unsafe_code)]

pub mod chip;
pub mod error;

pub use chip::{
    accuracy, build_gabriel_graph, gabriel_edges, squared_distance, Chip, ChipModel, ChipParams,
    Classifier, Cluster, ClusterId, ClusterIdBimap, Dataset, Edge, Expert, ExpertFactory,
    ExpertStrategy, FilterReport, GabrielGraph, Gating, GatingClassifier, NearestSupport,
    Polarity, QualityFilter, QualityStats, Vertex, VertexId,
};
pub use error::{Error, Result};
